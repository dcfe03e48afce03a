use thiserror::Error;

/// Failure of a single registry lookup. Cloneable so one cached failure can be
/// handed to every requester of the same package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("package '{name}' was not found in the registry")]
    NotFound { name: String },
    #[error("registry returned status {status} for package '{name}'")]
    Status { name: String, status: u16 },
    #[error("failed to fetch package '{name}': {message}")]
    Network { name: String, message: String },
    #[error("failed to parse registry metadata for package '{name}': {message}")]
    Parse { name: String, message: String },
}

impl RegistryError {
    pub fn package(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::Status { name, .. }
            | Self::Network { name, .. }
            | Self::Parse { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ThrottlerError {
    #[error("concurrency ceiling must be at least 1")]
    ZeroCeiling,
}
