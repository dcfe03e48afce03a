use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use semver::Version;

use crate::chain::AncestorChain;

/// One processed dependency edge. The same name and version shows up once per
/// ancestor path that reached it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Version,
    pub published: DateTime<Utc>,
    pub ancestors: AncestorChain,
}

impl ResolvedPackage {
    pub fn key(&self) -> (&str, &Version) {
        (&self.name, &self.version)
    }
}

/// A resolved package after duplicates were merged. `contributors` lists the
/// distinct ancestors that independently pulled this exact version in, and is
/// empty unless at least two did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupedPackage {
    pub package: ResolvedPackage,
    pub contributors: BTreeSet<String>,
}

impl DedupedPackage {
    pub fn is_shared(&self) -> bool {
        !self.contributors.is_empty()
    }
}

impl From<ResolvedPackage> for DedupedPackage {
    fn from(package: ResolvedPackage) -> Self {
        Self {
            package,
            contributors: BTreeSet::new(),
        }
    }
}
