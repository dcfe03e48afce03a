use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Package name to npm range string, e.g. `"left-pad" -> "^1.3.0"`.
pub type DependencyRanges = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest file {} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read manifest file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse manifest {origin}: {detail}")]
    Parse {
        origin: String,
        detail: serde_json::Error,
    },
}

/// The subset of a `package.json` that seeds resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default, deserialize_with = "nullable_ranges")]
    pub dependencies: DependencyRanges,
    #[serde(default, deserialize_with = "nullable_ranges")]
    pub dev_dependencies: DependencyRanges,
}

impl ProjectManifest {
    pub fn from_json_str(input: &str) -> Result<Self, ManifestError> {
        parse_manifest(input, "<input>")
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ManifestError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ManifestError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        parse_manifest(&content, &path.display().to_string())
    }

    /// Ranges the root resolution call starts from. Dev ranges win on a name
    /// clash, mirroring how npm merges the two tables.
    pub fn root_ranges(&self, include_dev: bool) -> DependencyRanges {
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

fn parse_manifest(input: &str, origin: &str) -> Result<ProjectManifest, ManifestError> {
    let value: serde_json::Value =
        serde_json::from_str(input).map_err(|detail| ManifestError::Parse {
            origin: origin.to_string(),
            detail,
        })?;
    if !value.is_object() {
        return Err(ManifestError::Parse {
            origin: origin.to_string(),
            detail: <serde_json::Error as serde::de::Error>::custom(
                "manifest root must be a JSON object",
            ),
        });
    }
    serde_json::from_value(value).map_err(|detail| ManifestError::Parse {
        origin: origin.to_string(),
        detail,
    })
}

fn nullable_ranges<'de, D>(deserializer: D) -> Result<DependencyRanges, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DependencyRanges>::deserialize(deserializer)?.unwrap_or_default())
}
