use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::manifest::DependencyRanges;

/// Dependency declarations of one published version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionDependencies {
    pub dependencies: DependencyRanges,
    pub dev_dependencies: DependencyRanges,
}

impl VersionDependencies {
    pub fn ranges(&self, include_dev: bool) -> DependencyRanges {
        let mut ranges = self.dependencies.clone();
        if include_dev {
            ranges.extend(
                self.dev_dependencies
                    .iter()
                    .map(|(name, range)| (name.clone(), range.clone())),
            );
        }
        ranges
    }
}

/// Registry metadata narrowed to what resolution reads: publish instants and
/// per-version dependency tables. Everything else in a registry document is
/// dropped while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub time_by_version: BTreeMap<String, DateTime<Utc>>,
    pub versions: BTreeMap<String, VersionDependencies>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_version(
        mut self,
        version: &str,
        published: DateTime<Utc>,
        dependencies: VersionDependencies,
    ) -> Self {
        self.time_by_version.insert(version.to_string(), published);
        self.versions.insert(version.to_string(), dependencies);
        self
    }

    pub fn candidate_versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn published_at(&self, version: &str) -> Option<DateTime<Utc>> {
        self.time_by_version.get(version).copied()
    }

    pub fn dependencies_of(&self, version: &str) -> Option<&VersionDependencies> {
        self.versions.get(version)
    }
}
