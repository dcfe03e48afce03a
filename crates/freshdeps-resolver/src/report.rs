use freshdeps_core::DedupedPackage;

pub const DEFAULT_DISPLAY_LENGTH: usize = 20;

/// Most recently published first; ties fall back to name, then newest version.
pub fn sort_by_recency(packages: &mut [DedupedPackage]) {
    packages.sort_by(|a, b| {
        b.package
            .published
            .cmp(&a.package.published)
            .then_with(|| a.package.name.cmp(&b.package.name))
            .then_with(|| b.package.version.cmp(&a.package.version))
    });
}

/// The listing handed to a renderer: sorted by recency and cut to the display
/// length, remembering how many entries were left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub packages: Vec<DedupedPackage>,
    pub hidden: usize,
}

impl Report {
    pub fn new(mut packages: Vec<DedupedPackage>, limit: usize) -> Self {
        sort_by_recency(&mut packages);
        let hidden = packages.len().saturating_sub(limit);
        packages.truncate(limit);
        Self { packages, hidden }
    }

    pub fn is_truncated(&self) -> bool {
        self.hidden > 0
    }
}
