//! Descriptor cache.
//!
//! Remote descriptors are mirrored into a local directory, one file per URL.
//! The cached file's modification time holds the server's `Last-Modified`
//! value, and every later fetch revalidates with `If-Modified-Since`. A
//! `304 Not Modified` serves the cached file without a body transfer.
//!
//! `file:` URLs are served in place and never copied.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use filetime::FileTime;
use reqwest::blocking::Client;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::sources::metadata::MetadataStore;
use crate::util::config::NetConfig;
use crate::util::fs::{ensure_dir, temp_file_beside};
use crate::util::hash::cache_file_name;

const DEFAULT_USER_AGENT: &str = concat!("p2resolve/", env!("CARGO_PKG_VERSION"));

/// Where and how descriptors are cached.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding cached files and their metadata.
    pub root_dir: PathBuf,

    /// Serve the stale cached file when revalidation fails for any reason
    /// other than a definitive 404.
    pub allow_stale_on_error: bool,
}

impl CacheConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        CacheConfig {
            root_dir: root_dir.into(),
            allow_stale_on_error: true,
        }
    }
}

/// Errors fetching a descriptor.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: Url, status: u16 },

    #[error("cache I/O error for {url}: {source}")]
    Io {
        url: Url,
        #[source]
        source: io::Error,
    },

    #[error("{url} is not cached and offline mode is enabled")]
    Offline { url: Url },
}

/// How a cached file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOrigin {
    /// A fresh body was downloaded.
    Downloaded,
    /// The server confirmed the cached copy is current.
    NotModified,
    /// Revalidation failed and the cached copy was served anyway.
    Stale,
    /// Offline mode served the cached copy without contacting the server.
    Offline,
    /// A `file:` URL served in place.
    Local,
}

impl fmt::Display for CacheOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheOrigin::Downloaded => "downloaded",
            CacheOrigin::NotModified => "not modified",
            CacheOrigin::Stale => "stale",
            CacheOrigin::Offline => "offline",
            CacheOrigin::Local => "local",
        };
        f.write_str(s)
    }
}

/// A readable local copy of a remote descriptor.
#[derive(Debug, Clone)]
pub struct CachedFile {
    url: Url,
    path: PathBuf,
    modified: Option<SystemTime>,
    origin: CacheOrigin,
}

impl CachedFile {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Server modification time, if the server reported one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn origin(&self) -> CacheOrigin {
        self.origin
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Result of a fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Cached(CachedFile),
    NotFound,
}

impl FetchOutcome {
    pub fn into_cached(self) -> Option<CachedFile> {
        match self {
            FetchOutcome::Cached(file) => Some(file),
            FetchOutcome::NotFound => None,
        }
    }
}

/// URL-keyed local mirror with conditional revalidation.
pub struct DescriptorCache {
    config: CacheConfig,
    offline: bool,
    client: Client,
    stores: RwLock<HashMap<String, Arc<MetadataStore>>>,
}

impl DescriptorCache {
    /// Create a cache. The root directory is created on first write.
    pub fn new(config: CacheConfig, net: &NetConfig) -> Result<Self, FetchError> {
        let user_agent = net
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let client = Client::builder()
            .timeout(net.timeout.map(Duration::from_secs))
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;

        Ok(DescriptorCache {
            config,
            offline: net.offline,
            client,
            stores: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Local file that mirrors `url`.
    pub fn cache_path(&self, url: &Url) -> PathBuf {
        self.config.root_dir.join(cache_file_name(url))
    }

    /// Metadata file attached to `url`.
    pub fn metadata_path(&self, url: &Url) -> PathBuf {
        self.config
            .root_dir
            .join(format!("{}.meta.json", cache_file_name(url)))
    }

    /// Fetch `url`, revalidating any cached copy.
    pub fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        if url.scheme() == "file" {
            return Ok(self.fetch_local(url));
        }

        let path = self.cache_path(url);
        let cached = cached_mtime(&path);

        if self.offline {
            return match cached {
                Some(modified) => {
                    tracing::debug!("offline: serving cached {}", url);
                    Ok(FetchOutcome::Cached(self.cached_file(url, path, modified, CacheOrigin::Offline)))
                }
                None => Err(FetchError::Offline { url: url.clone() }),
            };
        }

        let mut request = self.client.get(url.clone());
        if let Some(modified) = cached.filter(|m| *m != UNIX_EPOCH) {
            request = request.header(IF_MODIFIED_SINCE, format_http_date(modified));
        }

        tracing::debug!("GET {}", url);
        let response = match request.send() {
            Ok(response) => response,
            Err(source) => {
                return self.fallback(url, path, cached, FetchError::Transport {
                    url: url.clone(),
                    source,
                })
            }
        };

        match response.status() {
            StatusCode::NOT_MODIFIED => match cached {
                Some(modified) => {
                    tracing::debug!("{} not modified", url);
                    Ok(FetchOutcome::Cached(self.cached_file(url, path, modified, CacheOrigin::NotModified)))
                }
                None => Err(FetchError::Status {
                    url: url.clone(),
                    status: StatusCode::NOT_MODIFIED.as_u16(),
                }),
            },
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                tracing::debug!("{} not found", url);
                if cached.is_some() {
                    match fs::remove_file(&path) {
                        Ok(()) => tracing::debug!("removed {}", path.display()),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => tracing::debug!("cannot remove {}: {}", path.display(), e),
                    }
                }
                Ok(FetchOutcome::NotFound)
            }
            status if status.is_success() => {
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_http_date);

                match self.store_body(&path, response, last_modified) {
                    Ok(()) => {
                        tracing::info!("Downloaded {}", url);
                        Ok(FetchOutcome::Cached(self.cached_file(
                            url,
                            path,
                            last_modified.unwrap_or(UNIX_EPOCH),
                            CacheOrigin::Downloaded,
                        )))
                    }
                    Err(source) => self.fallback(url, path, cached, FetchError::Io {
                        url: url.clone(),
                        source,
                    }),
                }
            }
            status => self.fallback(url, path, cached, FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            }),
        }
    }

    /// Metadata store for `url`, materialized at most once per cache.
    pub fn metadata(&self, url: &Url) -> Arc<MetadataStore> {
        let key = url.as_str().to_string();

        {
            let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
            if let Some(store) = stores.get(&key) {
                return Arc::clone(store);
            }
        }

        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        // Double-check after acquiring the write lock
        if let Some(store) = stores.get(&key) {
            return Arc::clone(store);
        }

        let store = Arc::new(MetadataStore::open(self.metadata_path(url)));
        stores.insert(key, Arc::clone(&store));
        store
    }

    /// Drop the cached copy and metadata of `url`.
    pub fn forget(&self, url: &Url) -> io::Result<()> {
        for path in [self.cache_path(url), self.metadata_path(url)] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        stores.remove(url.as_str());
        Ok(())
    }

    fn fetch_local(&self, url: &Url) -> FetchOutcome {
        let Ok(path) = url.to_file_path() else {
            tracing::warn!("cannot map {} to a local path", url);
            return FetchOutcome::NotFound;
        };

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                let modified = meta.modified().unwrap_or(UNIX_EPOCH);
                FetchOutcome::Cached(self.cached_file(url, path, modified, CacheOrigin::Local))
            }
            _ => FetchOutcome::NotFound,
        }
    }

    fn store_body(
        &self,
        path: &Path,
        mut body: impl Read,
        last_modified: Option<SystemTime>,
    ) -> io::Result<()> {
        ensure_dir(&self.config.root_dir)?;
        let mut tmp = temp_file_beside(path)?;
        io::copy(&mut body, &mut tmp)?;
        let file = tmp.persist(path).map_err(|e| e.error)?;
        drop(file);

        let mtime = last_modified.unwrap_or(UNIX_EPOCH);
        filetime::set_file_mtime(path, FileTime::from_system_time(mtime))
    }

    fn fallback(
        &self,
        url: &Url,
        path: PathBuf,
        cached: Option<SystemTime>,
        error: FetchError,
    ) -> Result<FetchOutcome, FetchError> {
        match cached {
            Some(modified) if self.config.allow_stale_on_error => {
                tracing::warn!("{}; serving stale cached copy", error);
                Ok(FetchOutcome::Cached(self.cached_file(url, path, modified, CacheOrigin::Stale)))
            }
            _ => Err(error),
        }
    }

    fn cached_file(&self, url: &Url, path: PathBuf, modified: SystemTime, origin: CacheOrigin) -> CachedFile {
        CachedFile {
            url: url.clone(),
            path,
            modified: (modified != UNIX_EPOCH).then_some(modified),
            origin,
        }
    }
}

impl fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("config", &self.config)
            .field("offline", &self.offline)
            .finish()
    }
}

fn cached_mtime(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    Some(meta.modified().unwrap_or(UNIX_EPOCH))
}

/// Format a time as an RFC 7231 HTTP date.
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Parse an HTTP date header.
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}
