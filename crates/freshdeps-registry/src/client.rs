use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freshdeps_core::{DependencyRanges, PackageMetadata, VersionDependencies};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};

use crate::error::RegistryError;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";

/// Source of per-package registry metadata.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError>;
}

/// Fetches `GET <base><name>` from an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("freshdeps/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scoped names keep their `@` but the separating slash is escaped, which
    /// is the form the npm registry routes on.
    pub fn package_url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name.replace('/', "%2F"))
    }
}

#[async_trait]
impl RegistryApi for HttpRegistry {
    async fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        let url = self.package_url(name);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| RegistryError::Network {
                name: name.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| RegistryError::Network {
                name: name.to_string(),
                message: err.to_string(),
            })?;
        parse_package_metadata(name, &body)
    }
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default, deserialize_with = "lenient_times")]
    time: BTreeMap<String, DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    versions: BTreeMap<String, RegistryVersion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryVersion {
    #[serde(default, deserialize_with = "lenient_ranges")]
    dependencies: DependencyRanges,
    #[serde(default, deserialize_with = "lenient_ranges")]
    dev_dependencies: DependencyRanges,
}

/// Narrows a registry document to publish times and dependency tables. Fields
/// not listed on the private document types are skipped by the deserializer
/// without being buffered.
pub fn parse_package_metadata(name: &str, body: &[u8]) -> Result<PackageMetadata, RegistryError> {
    let document: RegistryDocument =
        serde_json::from_slice(body).map_err(|err| RegistryError::Parse {
            name: name.to_string(),
            message: err.to_string(),
        })?;

    let versions: BTreeMap<String, VersionDependencies> = document
        .versions
        .into_iter()
        .map(|(version, declared)| {
            (
                version,
                VersionDependencies {
                    dependencies: declared.dependencies,
                    dev_dependencies: declared.dev_dependencies,
                },
            )
        })
        .collect();
    let time_by_version = document
        .time
        .into_iter()
        .filter(|(version, _)| versions.contains_key(version))
        .collect();

    Ok(PackageMetadata {
        name: name.to_string(),
        time_by_version,
        versions,
    })
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// `time` also carries `created`, `modified` and, for unpublished packages, a
// nested object; only string timestamps that parse are kept.
fn lenient_times<'de, D>(deserializer: D) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_json::Value> = nullable(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            let stamp = value.as_str()?;
            let parsed = DateTime::parse_from_rfc3339(stamp).ok()?;
            Some((key, parsed.with_timezone(&Utc)))
        })
        .collect())
}

// Old packages occasionally publish dependency tables as arrays or with
// non-string values; those entries carry no usable range.
fn lenient_ranges<'de, D>(deserializer: D) -> Result<DependencyRanges, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(entries)) = raw else {
        return Ok(DependencyRanges::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(name, range)| match range {
            serde_json::Value::String(range) => Some((name, range)),
            _ => None,
        })
        .collect())
}
