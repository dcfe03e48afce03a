use std::sync::Arc;

use chrono::{DateTime, Utc};
use freshdeps_core::{AncestorChain, DependencyRanges, ResolvedPackage};
use freshdeps_registry::MetadataCache;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use semver::Version;

use crate::range::max_satisfying;
use crate::types::{Resolution, SkipReason, SkippedEdge};

/// Expands declared dependency ranges into resolved package records by
/// walking the registry graph. Every edge of one level is resolved
/// concurrently; the shared throttler inside the cache is the only bound on
/// outstanding fetches.
pub struct Resolver {
    cache: Arc<MetadataCache>,
    transitive_dev_dependencies: bool,
}

struct Selection {
    version: Version,
    published: DateTime<Utc>,
    children: DependencyRanges,
}

impl Resolver {
    pub fn new(cache: Arc<MetadataCache>) -> Self {
        Self {
            cache,
            transitive_dev_dependencies: false,
        }
    }

    /// Also follow the devDependencies of resolved packages. Off by default,
    /// which matches what package managers install.
    pub fn with_transitive_dev_dependencies(mut self, enabled: bool) -> Self {
        self.transitive_dev_dependencies = enabled;
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub async fn resolve(&self, ranges: &DependencyRanges) -> Vec<ResolvedPackage> {
        self.resolve_detailed(ranges).await.packages
    }

    pub async fn resolve_detailed(&self, ranges: &DependencyRanges) -> Resolution {
        self.resolve_from(ranges.clone(), AncestorChain::root())
            .await
    }

    /// Resolves `ranges` as the dependencies of the last package in
    /// `ancestors`. Edges naming a package already on the chain are expected
    /// to have been filtered out by the caller.
    pub fn resolve_from(
        &self,
        ranges: DependencyRanges,
        ancestors: AncestorChain,
    ) -> BoxFuture<'_, Resolution> {
        async move {
            let edges = ranges
                .into_iter()
                .map(|(name, range)| self.resolve_edge(name, range, ancestors.clone()));

            let mut resolution = Resolution::default();
            for edge in join_all(edges).await {
                resolution.absorb(edge);
            }
            resolution
        }
        .boxed()
    }

    async fn resolve_edge(
        &self,
        name: String,
        range: String,
        ancestors: AncestorChain,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        let selection = match self.select(&name, &range).await {
            Ok(selection) => selection,
            Err(reason) => {
                log::debug!("skipping {name}@{range} (from [{ancestors}]): {reason}");
                resolution.skipped.push(SkippedEdge {
                    name,
                    range,
                    ancestors,
                    reason,
                });
                return resolution;
            }
        };

        let branch = ancestors.child(&name);
        let children: DependencyRanges = selection
            .children
            .into_iter()
            .filter(|(child, _)| !branch.contains(child))
            .collect();

        resolution.packages.push(ResolvedPackage {
            name,
            version: selection.version,
            published: selection.published,
            ancestors,
        });

        if !children.is_empty() {
            resolution.absorb(self.resolve_from(children, branch).await);
        }
        resolution
    }

    async fn select(&self, name: &str, range: &str) -> Result<Selection, SkipReason> {
        let metadata = self
            .cache
            .fetch_outcome(name)
            .await
            .map_err(SkipReason::MetadataUnavailable)?;

        let (key, version) = max_satisfying(metadata.candidate_versions(), range)
            .ok_or(SkipReason::NoSatisfyingVersion)?;
        let published = metadata
            .published_at(key)
            .ok_or_else(|| SkipReason::MissingPublishTime {
                version: key.to_string(),
            })?;
        let children = metadata
            .dependencies_of(key)
            .map(|declared| declared.ranges(self.transitive_dev_dependencies))
            .unwrap_or_default();

        Ok(Selection {
            version,
            published,
            children,
        })
    }
}
