use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use freshdeps_core::{PackageMetadata, VersionDependencies};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::*;

const LEFT_PAD_DOCUMENT: &str = r#"{
  "_id": "left-pad",
  "name": "left-pad",
  "description": "String left pad",
  "dist-tags": { "latest": "1.3.0" },
  "readme": "a very long readme that nobody needs",
  "time": {
    "created": "2014-03-01T00:00:00.000Z",
    "modified": "2018-04-09T00:00:00.000Z",
    "1.0.0": "2014-03-01T00:00:00.000Z",
    "1.3.0": "2018-04-09T00:00:00.000Z",
    "0.0.1": "not a timestamp"
  },
  "versions": {
    "1.0.0": { "name": "left-pad", "version": "1.0.0" },
    "1.3.0": {
      "name": "left-pad",
      "version": "1.3.0",
      "dependencies": { "pad-core": "^2.0.0", "broken": 7 },
      "devDependencies": { "tape": "*" },
      "dist": { "tarball": "https://example.test/left-pad-1.3.0.tgz" }
    },
    "0.0.1": { "dependencies": ["legacy-array-form"] }
  }
}"#;

#[test]
fn parse_package_metadata_keeps_only_times_and_dependency_tables() {
    let metadata = parse_package_metadata("left-pad", LEFT_PAD_DOCUMENT.as_bytes())
        .expect("document should parse");

    assert_eq!(metadata.name, "left-pad");
    assert_eq!(
        metadata.candidate_versions().collect::<Vec<_>>(),
        ["0.0.1", "1.0.0", "1.3.0"]
    );
    assert_eq!(
        metadata.published_at("1.3.0"),
        Some(Utc.with_ymd_and_hms(2018, 4, 9, 0, 0, 0).unwrap())
    );
    assert_eq!(metadata.published_at("0.0.1"), None);
    assert!(!metadata.time_by_version.contains_key("created"));
    assert!(!metadata.time_by_version.contains_key("modified"));

    let latest = metadata.dependencies_of("1.3.0").expect("version exists");
    assert_eq!(
        latest.dependencies.get("pad-core").map(String::as_str),
        Some("^2.0.0")
    );
    assert!(!latest.dependencies.contains_key("broken"));
    assert_eq!(
        latest.dev_dependencies.get("tape").map(String::as_str),
        Some("*")
    );

    let legacy = metadata.dependencies_of("0.0.1").expect("version exists");
    assert!(legacy.dependencies.is_empty());
    assert_eq!(
        metadata.dependencies_of("1.0.0"),
        Some(&VersionDependencies::default())
    );
}

#[test]
fn parse_package_metadata_defaults_missing_sections_to_empty() {
    let metadata =
        parse_package_metadata("ghost", br#"{ "name": "ghost" }"#).expect("document should parse");
    assert!(metadata.versions.is_empty());
    assert!(metadata.time_by_version.is_empty());

    let metadata = parse_package_metadata("ghost", br#"{ "time": null, "versions": null }"#)
        .expect("document should parse");
    assert!(metadata.versions.is_empty());
}

#[test]
fn parse_package_metadata_rejects_invalid_json() {
    let err = parse_package_metadata("broken", b"<html>502 Bad Gateway</html>")
        .expect_err("html body must fail");
    assert!(matches!(err, RegistryError::Parse { .. }));
    assert_eq!(err.package(), "broken");
}

#[test]
fn parse_package_metadata_rejects_unexpected_shape() {
    let err = parse_package_metadata("odd", br#"{ "versions": { "1.0.0": "nope" } }"#)
        .expect_err("non-object version entry must fail");
    assert!(matches!(err, RegistryError::Parse { .. }));
}

#[test]
fn package_url_escapes_scoped_names() {
    let registry = HttpRegistry::with_client("https://registry.example.test", reqwest::Client::new());
    assert_eq!(registry.base_url(), "https://registry.example.test/");
    assert_eq!(
        registry.package_url("left-pad"),
        "https://registry.example.test/left-pad"
    );
    assert_eq!(
        registry.package_url("@types/node"),
        "https://registry.example.test/@types%2Fnode"
    );
}

#[tokio::test]
async fn http_registry_fetches_and_narrows_document() {
    let (base_url, server) = serve_once("200 OK", LEFT_PAD_DOCUMENT.to_string()).await;
    let registry = HttpRegistry::with_client(&base_url, local_client());

    let metadata = registry
        .package_metadata("left-pad")
        .await
        .expect("fetch should succeed");
    assert_eq!(metadata.versions.len(), 3);

    let request = server.await.expect("server task");
    assert!(
        request.starts_with("GET /left-pad HTTP/1.1"),
        "unexpected request: {request}"
    );
}

#[tokio::test]
async fn http_registry_maps_404_to_not_found() {
    let (base_url, server) = serve_once("404 Not Found", r#"{"error":"Not found"}"#.to_string()).await;
    let registry = HttpRegistry::with_client(&base_url, local_client());

    let err = registry
        .package_metadata("missing")
        .await
        .expect_err("404 must fail");
    assert_eq!(
        err,
        RegistryError::NotFound {
            name: "missing".to_string()
        }
    );
    let _ = server.await;
}

#[tokio::test]
async fn http_registry_maps_other_failures_to_status() {
    let (base_url, server) = serve_once("503 Service Unavailable", String::new()).await;
    let registry = HttpRegistry::with_client(&base_url, local_client());

    let err = registry
        .package_metadata("flaky")
        .await
        .expect_err("503 must fail");
    assert_eq!(
        err,
        RegistryError::Status {
            name: "flaky".to_string(),
            status: 503
        }
    );
    let _ = server.await;
}

#[tokio::test]
async fn http_registry_reports_connection_failures_as_network_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let registry = HttpRegistry::with_client(&format!("http://{addr}/"), local_client());
    let err = registry
        .package_metadata("offline")
        .await
        .expect_err("closed port must fail");
    assert!(matches!(err, RegistryError::Network { .. }));
}

#[test]
fn throttler_rejects_zero_ceiling() {
    let err = Throttler::new(0).expect_err("zero ceiling must be rejected");
    assert_eq!(err, ThrottlerError::ZeroCeiling);
    assert_eq!(Throttler::default().ceiling(), DEFAULT_CONCURRENCY);
}

#[tokio::test]
async fn throttler_never_exceeds_ceiling() {
    let throttler = Throttler::new(3).expect("valid ceiling");
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let (running, peak, throttler) = (&running, &peak, &throttler);

    let tasks = (0..20).map(|index| {
        throttler.submit(move || async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            assert!(throttler.in_flight() <= throttler.ceiling());
            tokio::time::sleep(Duration::from_millis(1 + (index % 3))).await;
            running.fetch_sub(1, Ordering::SeqCst);
            index
        })
    });
    let results = futures::future::join_all(tasks).await;

    assert_eq!(results, (0..20).collect::<Vec<_>>());
    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(throttler.in_flight(), 0);
    assert_eq!(throttler.dispatched(), 20);
}

#[tokio::test]
async fn throttler_dispatches_in_submission_order() {
    let throttler = Throttler::new(1).expect("valid ceiling");
    let started = Mutex::new(Vec::new());

    let tasks = (0..5).map(|index| {
        let started = &started;
        throttler.submit(move || async move {
            started.lock().push(index);
            tokio::task::yield_now().await;
        })
    });
    futures::future::join_all(tasks).await;

    assert_eq!(*started.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn throttler_keeps_dispatching_after_failures() {
    let throttler = Throttler::new(2).expect("valid ceiling");

    let tasks = (0..6).map(|index| {
        throttler.submit(move || async move {
            tokio::task::yield_now().await;
            if index % 2 == 0 {
                Err(format!("task {index} failed"))
            } else {
                Ok(index)
            }
        })
    });
    let results = futures::future::join_all(tasks).await;

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 3);
    assert_eq!(results[0], Err("task 0 failed".to_string()));
    assert_eq!(results[5], Ok(5));
    assert_eq!(throttler.in_flight(), 0);
}

#[tokio::test]
async fn cache_collapses_concurrent_requests_for_one_name() {
    let registry = Arc::new(CountingRegistry::with_package("a"));
    let cache = test_cache(registry.clone(), 5);

    let lookups = (0..10).map(|_| cache.get_or_fetch("a"));
    let results = futures::future::join_all(lookups).await;

    assert!(results.iter().all(Option::is_some));
    assert_eq!(registry.calls_for("a"), 1);
    assert_eq!(cache.requested(), 1);

    let first = results[0].clone().expect("metadata");
    let last = results[9].clone().expect("metadata");
    assert!(Arc::ptr_eq(&first, &last));
}

#[tokio::test]
async fn cache_remembers_failures_without_retrying() {
    let registry = Arc::new(CountingRegistry::with_package("a"));
    let cache = test_cache(registry.clone(), 2);

    assert!(cache.get_or_fetch("missing").await.is_none());
    let outcome = cache.fetch_outcome("missing").await;
    assert_eq!(
        outcome.expect_err("failure must be cached"),
        RegistryError::NotFound {
            name: "missing".to_string()
        }
    );
    assert_eq!(registry.calls_for("missing"), 1);

    assert!(cache.get_or_fetch("a").await.is_some());
    let failures = cache.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "missing");
}

#[tokio::test]
async fn cache_routes_fetches_through_throttler() {
    let registry = Arc::new(CountingRegistry::with_packages(["a", "b", "c", "d"]));
    let cache = test_cache(registry.clone(), 2);

    let lookups = ["a", "b", "c", "d", "a", "c"].map(|name| cache.get_or_fetch(name));
    futures::future::join_all(lookups).await;

    assert_eq!(cache.throttler().dispatched(), 4);
    assert!(registry.peak_concurrency() <= 2);
    assert_eq!(registry.total_calls(), 4);
}

struct CountingRegistry {
    packages: BTreeMap<String, PackageMetadata>,
    calls: Mutex<BTreeMap<String, usize>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingRegistry {
    fn with_package(name: &str) -> Self {
        Self::with_packages([name])
    }

    fn with_packages<const N: usize>(names: [&str; N]) -> Self {
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let packages = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    PackageMetadata::new(*name).with_version(
                        "1.0.0",
                        published,
                        VersionDependencies::default(),
                    ),
                )
            })
            .collect();
        Self {
            packages,
            calls: Mutex::new(BTreeMap::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or_default()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryApi for CountingRegistry {
    async fn package_metadata(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        *self.calls.lock().entry(name.to_string()).or_default() += 1;
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }
}

fn test_cache(registry: Arc<CountingRegistry>, ceiling: usize) -> MetadataCache {
    let throttler = Throttler::new(ceiling).expect("valid ceiling");
    MetadataCache::new(registry, Arc::new(throttler))
}

fn local_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build")
}

async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut chunk = [0_u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = socket.read(&mut chunk).await.expect("read request");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket
            .write_all(response.as_bytes())
            .await
            .expect("write response");
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}/"), server)
}
