//! Content-addressed on-disk cache of DMR documents.
//!
//! Each dataset's DMR is fetched from `<dataset_url>.dmr.xml` at most once and
//! stored under the lowercase hex SHA-256 of that URL. Lookups for the same
//! key are serialised through a per-key lock; lookups for different datasets
//! run in parallel.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use wcs_common::{WcsError, WcsResult, XmlElement};

/// Suffix appended to a dataset URL to address its DMR.
pub const DMR_SUFFIX: &str = ".dmr.xml";

/// Errors from fetching a DMR document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl From<FetchError> for WcsError {
    fn from(err: FetchError) -> Self {
        WcsError::NotFound(format!("Unable to retrieve dataset metadata: {}", err))
    }
}

/// Retrieves raw DMR documents.
#[async_trait]
pub trait DmrFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetches DMR documents over HTTP(S). No retries.
pub struct HttpDmrFetcher {
    client: Client,
}

impl HttpDmrFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DmrFetcher for HttpDmrFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        info!(size = body.len(), "Fetched DMR");
        Ok(body)
    }
}

/// Registry of in-flight per-key locks.
///
/// Entries exist only while some task holds or waits for the key.
#[derive(Default)]
struct KeyedLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        KeyGuard {
            registry: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct KeyGuard<'a> {
    registry: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the key first so the map holds the only reference when idle.
        drop(self.guard.take());

        let mut locks = self
            .registry
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&self.key) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}

/// Cache statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// On-disk DMR cache.
pub struct DmrCache {
    cache_dir: PathBuf,
    fetcher: Arc<dyn DmrFetcher>,
    locks: KeyedLocks,
    stats: std::sync::Mutex<CacheStats>,
}

impl DmrCache {
    pub fn new(cache_dir: impl Into<PathBuf>, fetcher: Arc<dyn DmrFetcher>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            fetcher,
            locks: KeyedLocks::default(),
            stats: std::sync::Mutex::new(CacheStats::default()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The URL of a dataset's DMR document.
    pub fn dmr_url(dataset_url: &str) -> String {
        format!("{}{}", dataset_url, DMR_SUFFIX)
    }

    /// Lowercase hex SHA-256 of the DMR URL.
    pub fn cache_key(dmr_url: &str) -> String {
        hex::encode(Sha256::digest(dmr_url.as_bytes()))
    }

    /// Where the DMR for `dataset_url` is (or would be) cached.
    pub fn cache_path(&self, dataset_url: &str) -> PathBuf {
        self.cache_dir
            .join(Self::cache_key(&Self::dmr_url(dataset_url)))
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Number of keys currently locked or waited on.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    /// The DMR for `dataset_url`, with its root `name` set to `coverage_id`.
    #[instrument(skip(self))]
    pub async fn get(&self, coverage_id: &str, dataset_url: &str) -> WcsResult<XmlElement> {
        let url = Self::dmr_url(dataset_url);
        let key = Self::cache_key(&url);
        let path = self.cache_dir.join(&key);

        let _guard = self.locks.lock(&key).await;

        let mut dmr = match tokio::fs::read(&path).await {
            Ok(body) => {
                self.record(|s| s.hits += 1);
                debug!(key = %key, "DMR cache hit");
                match decode_dmr(&body) {
                    Ok(dmr) => dmr,
                    Err(reason) => {
                        warn!(path = %path.display(), error = %reason, "Removing unreadable cached DMR");
                        self.record(|s| s.evictions += 1);
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            warn!(path = %path.display(), error = %e, "Failed to remove cached DMR");
                        }
                        return Err(WcsError::NotFound(format!(
                            "Cached metadata for coverage '{}' is unreadable",
                            coverage_id
                        )));
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.record(|s| s.misses += 1);
                self.fetch_and_store(&url, &path, coverage_id).await?
            }
            Err(err) => {
                return Err(WcsError::Internal(format!(
                    "Failed to read cached DMR {}: {}",
                    path.display(),
                    err
                )))
            }
        };

        dmr.set_attribute("name", coverage_id);
        Ok(dmr)
    }

    async fn fetch_and_store(
        &self,
        url: &str,
        path: &Path,
        coverage_id: &str,
    ) -> WcsResult<XmlElement> {
        info!(url = %url, "DMR cache miss, fetching");
        let body = self.fetcher.fetch(url).await?;

        // Only DMR documents are cached.
        let dmr = decode_dmr(&body).map_err(|reason| {
            WcsError::NotFound(format!(
                "Metadata for coverage '{}' from {} is not a DMR document: {}",
                coverage_id, url, reason
            ))
        })?;

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(path, &body).await?;
        debug!(path = %path.display(), "Stored DMR");
        Ok(dmr)
    }
}

/// Parse a raw DMR body. Bytes that are not UTF-8 are replaced, on both the
/// fetch and the cache read path.
fn decode_dmr(body: &[u8]) -> Result<XmlElement, String> {
    let dmr = XmlElement::parse(&String::from_utf8_lossy(body)).map_err(|err| err.to_string())?;
    if dmr.name != "Dataset" {
        return Err(format!("root element is '{}', not 'Dataset'", dmr.name));
    }
    Ok(dmr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_utils::fixtures::{coverage, dmr};

    struct CountingFetcher {
        body: &'static [u8],
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(body: &'static str) -> Arc<Self> {
            Self::from_bytes(body.as_bytes())
        }

        fn from_bytes(body: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DmrFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Bytes::from_static(self.body))
        }
    }

    #[test]
    fn test_cache_key_is_sha256_of_dmr_url() {
        let key = DmrCache::cache_key(&DmrCache::dmr_url("http://h/d.nc"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(key, hex::encode(Sha256::digest(b"http://h/d.nc.dmr.xml")));
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(dmr::SST_DMR);
        let cache = DmrCache::new(dir.path(), fetcher.clone());

        let first = cache.get("a", coverage::DATASET_URL).await.unwrap();
        let second = cache.get("b", coverage::DATASET_URL).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.attribute("name"), Some("a"));
        assert_eq!(second.attribute("name"), Some("b"));
        assert!(cache.cache_path(coverage::DATASET_URL).exists());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_same_key_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(dmr::SST_DMR);
        let cache = Arc::new(DmrCache::new(dir.path(), fetcher.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .get(&format!("cov{}", i), coverage::DATASET_URL)
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_each_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(dmr::BARE_DMR);
        let cache = DmrCache::new(dir.path(), fetcher.clone());

        cache.get("x", "http://h/one.nc").await.unwrap();
        cache.get("y", "http://h/two.nc").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(dmr::SST_DMR);
        let cache = DmrCache::new(dir.path(), fetcher.clone());
        let path = cache.cache_path(coverage::DATASET_URL);
        std::fs::write(&path, "<Dataset><unclosed></Dataset>").unwrap();

        let err = cache.get("c", coverage::DATASET_URL).await.unwrap_err();
        assert!(matches!(err, WcsError::NotFound(_)));
        assert!(!path.exists());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        // The next lookup refetches.
        cache.get("c", coverage::DATASET_URL).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_fetch_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DmrCache::new(dir.path(), CountingFetcher::new("not xml <"));

        assert!(matches!(
            cache.get("c", "http://h/bad.nc").await,
            Err(WcsError::NotFound(_))
        ));
        assert!(!cache.cache_path("http://h/bad.nc").exists());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(HttpDmrFetcher::new(None).unwrap());
        let cache = DmrCache::new(dir.path(), fetcher);

        assert!(matches!(
            cache.get("c", "ftp://h/data.nc").await,
            Err(WcsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_utf8_dmr_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::from_bytes(
            b"<Dataset name=\"latin1.nc\"><Attribute name=\"title\"><Value>M\xE9t</Value></Attribute></Dataset>",
        );
        let cache = DmrCache::new(dir.path(), fetcher.clone());

        for id in ["first", "second", "third"] {
            let dmr = cache.get(id, "http://h/latin1.nc").await.unwrap();
            assert_eq!(dmr.name, "Dataset");
            assert_eq!(dmr.attribute("name"), Some(id));
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_error_document_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(
            r#"<Error httpcode="404"><Message>No such file</Message></Error>"#,
        );
        let cache = DmrCache::new(dir.path(), fetcher.clone());

        for _ in 0..2 {
            assert!(matches!(
                cache.get("c", "http://h/gone.nc").await,
                Err(WcsError::NotFound(_))
            ));
        }
        assert!(!cache.cache_path("http://h/gone.nc").exists());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_non_dmr_document_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DmrCache::new(dir.path(), CountingFetcher::new(dmr::BARE_DMR));
        let path = cache.cache_path("http://h/old.nc");
        std::fs::write(&path, r#"<Error httpcode="500"/>"#).unwrap();

        assert!(matches!(
            cache.get("c", "http://h/old.nc").await,
            Err(WcsError::NotFound(_))
        ));
        assert!(!path.exists());
        assert_eq!(cache.stats().evictions, 1);
    }
}
