mod dedupe;
mod range;
mod report;
mod resolve;
mod types;

pub use dedupe::{dedupe, dedupe_with, merge_duplicates, Provenance};
pub use range::{max_satisfying, NpmRange};
pub use report::{sort_by_recency, Report, DEFAULT_DISPLAY_LENGTH};
pub use resolve::Resolver;
pub use types::{Resolution, SkipReason, SkippedEdge};
