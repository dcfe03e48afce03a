use freshdeps_core::{AncestorChain, ResolvedPackage};
use freshdeps_registry::RegistryError;
use thiserror::Error;

/// Why a dependency edge contributed nothing to the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("metadata unavailable: {0}")]
    MetadataUnavailable(RegistryError),
    #[error("no published version satisfies the range")]
    NoSatisfyingVersion,
    #[error("registry has no publish time for version {version}")]
    MissingPublishTime { version: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEdge {
    pub name: String,
    pub range: String,
    pub ancestors: AncestorChain,
    pub reason: SkipReason,
}

/// Everything one resolution call produced: a record for every edge that
/// resolved, and the reason for every edge that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub packages: Vec<ResolvedPackage>,
    pub skipped: Vec<SkippedEdge>,
}

impl Resolution {
    pub fn absorb(&mut self, other: Resolution) {
        self.packages.extend(other.packages);
        self.skipped.extend(other.skipped);
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.skipped.is_empty()
    }
}
