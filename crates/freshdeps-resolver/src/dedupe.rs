use std::collections::{BTreeSet, HashMap};

use freshdeps_core::{DedupedPackage, ResolvedPackage};
use semver::Version;

/// Which ancestor of a duplicate counts as the package that introduced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Provenance {
    /// The direct parent of the edge.
    #[default]
    Nearest,
    /// The root dependency the edge was reached through.
    Origin,
}

pub fn dedupe(packages: Vec<ResolvedPackage>) -> Vec<DedupedPackage> {
    dedupe_with(packages, Provenance::Nearest)
}

pub fn dedupe_with(packages: Vec<ResolvedPackage>, provenance: Provenance) -> Vec<DedupedPackage> {
    merge_duplicates(packages.into_iter().map(DedupedPackage::from), provenance)
}

/// Collapses records sharing a name and version. The first record of a group
/// is kept as its representative. Groups of one are returned unchanged, so
/// merging an already merged list is a no-op.
pub fn merge_duplicates<I>(packages: I, provenance: Provenance) -> Vec<DedupedPackage>
where
    I: IntoIterator<Item = DedupedPackage>,
{
    let mut index: HashMap<(String, Version), usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for package in packages {
        let sources = introduced_by(&package, provenance);
        let key = (package.package.name.clone(), package.package.version.clone());
        match index.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.members += 1;
                group.sources.extend(sources);
            }
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    representative: package,
                    members: 1,
                    sources,
                });
            }
        }
    }

    groups.into_iter().map(Group::finish).collect()
}

struct Group {
    representative: DedupedPackage,
    members: usize,
    sources: BTreeSet<String>,
}

impl Group {
    fn finish(self) -> DedupedPackage {
        let Group {
            mut representative,
            members,
            sources,
        } = self;
        if members > 1 {
            representative.contributors = if sources.len() > 1 {
                sources
            } else {
                BTreeSet::new()
            };
        }
        representative
    }
}

fn introduced_by(package: &DedupedPackage, provenance: Provenance) -> BTreeSet<String> {
    if package.is_shared() {
        return package.contributors.clone();
    }
    let ancestors = &package.package.ancestors;
    let source = match provenance {
        Provenance::Nearest => ancestors.nearest(),
        Provenance::Origin => ancestors.origin(),
    };
    source.map(str::to_string).into_iter().collect()
}
