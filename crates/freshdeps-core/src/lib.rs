mod chain;
mod manifest;
mod metadata;
mod package;

pub use chain::AncestorChain;
pub use manifest::{DependencyRanges, ManifestError, ProjectManifest};
pub use metadata::{PackageMetadata, VersionDependencies};
pub use package::{DedupedPackage, ResolvedPackage};
