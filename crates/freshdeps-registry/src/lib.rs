mod cache;
mod client;
mod error;
mod throttle;

pub use cache::{FetchOutcome, MetadataCache};
pub use client::{parse_package_metadata, HttpRegistry, RegistryApi, DEFAULT_REGISTRY_URL};
pub use error::{RegistryError, ThrottlerError};
pub use throttle::{Throttler, DEFAULT_CONCURRENCY};

#[cfg(test)]
mod tests;
