//! Derived-data side-store for a capture archive.
//!
//! Expensive metric series are cached per archive under a metric key (`diffsums`,
//! `checkerboard_percents`, ...). The store is a whole-document read-modify-write: there is no
//! locking, so two writers on the same archive must be serialized by the caller.
//!
//! Each document records the size and modification time of the archive it was computed from.
//! If the archive is regenerated in place, the mismatch is logged and the old document is
//! treated as empty instead of being served.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::UNIX_EPOCH,
};

use anyhow::Context as _;

use crate::{
    archive::store::FrameStore,
    foundation::error::{FramecapError, FramecapResult},
};

/// Suffix appended to the archive path to name its side-store file.
pub const CACHE_SUFFIX: &str = ".cache";

pub fn cache_path_for(archive: &Path) -> PathBuf {
    let mut s = archive.as_os_str().to_owned();
    s.push(CACHE_SUFFIX);
    PathBuf::from(s)
}

/// Identity of the archive bytes a cache document was computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArchiveFingerprint {
    pub len: u64,
    pub modified_secs: u64,
    pub modified_nanos: u32,
}

impl ArchiveFingerprint {
    /// `None` when the archive is not a readable file (e.g. in-memory test identities).
    pub fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        let modified = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
        Some(Self {
            len: meta.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheDocument {
    #[serde(default)]
    pub archive: Option<ArchiveFingerprint>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Vec<f64>>,
}

/// Where cache documents live.
pub trait CacheBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored for `archive` yet.
    fn load(&self, archive: &Path) -> FramecapResult<Option<CacheDocument>>;
    fn store(&self, archive: &Path, doc: &CacheDocument) -> FramecapResult<()>;
    fn clear(&self, archive: &Path) -> FramecapResult<()>;
}

/// JSON file next to the archive (`<archive>.cache`).
#[derive(Clone, Copy, Debug, Default)]
pub struct FileCacheBackend;

impl CacheBackend for FileCacheBackend {
    fn load(&self, archive: &Path) -> FramecapResult<Option<CacheDocument>> {
        let path = cache_path_for(archive);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read cache '{}'", path.display()))
                    .into());
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| FramecapError::serde(format!("cache '{}': {e}", path.display())))
    }

    fn store(&self, archive: &Path, doc: &CacheDocument) -> FramecapResult<()> {
        let path = cache_path_for(archive);
        let bytes = serde_json::to_vec(doc).map_err(|e| FramecapError::serde(e.to_string()))?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes).with_context(|| format!("write cache '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("replace cache '{}'", path.display()))?;
        Ok(())
    }

    fn clear(&self, archive: &Path) -> FramecapResult<()> {
        let path = cache_path_for(archive);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("remove cache '{}'", path.display()))
                .into()),
        }
    }
}

/// Process-local backend, mainly for tests. Counts writes so callers can assert on recomputes.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    docs: Mutex<HashMap<PathBuf, CacheDocument>>,
    writes: AtomicUsize,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful [`CacheBackend::store`] calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn docs(&self) -> FramecapResult<std::sync::MutexGuard<'_, HashMap<PathBuf, CacheDocument>>> {
        self.docs
            .lock()
            .map_err(|_| FramecapError::validation("memory cache poisoned"))
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn load(&self, archive: &Path) -> FramecapResult<Option<CacheDocument>> {
        Ok(self.docs()?.get(archive).cloned())
    }

    fn store(&self, archive: &Path, doc: &CacheDocument) -> FramecapResult<()> {
        self.docs()?.insert(archive.to_path_buf(), doc.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self, archive: &Path) -> FramecapResult<()> {
        self.docs()?.remove(archive);
        Ok(())
    }
}

/// Metric cache bound to one archive.
#[derive(Clone)]
pub struct AnalysisCache {
    archive: PathBuf,
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

impl AnalysisCache {
    /// File-backed cache next to the store's archive.
    pub fn for_store(store: &FrameStore) -> Self {
        Self::with_backend(store.path(), Arc::new(FileCacheBackend))
    }

    pub fn with_backend(archive: impl Into<PathBuf>, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            archive: archive.into(),
            backend,
        }
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn get(&self, key: &str) -> Option<Vec<f64>> {
        self.load_document().metrics.remove(key)
    }

    /// Return the series cached under `key`, computing and persisting it on a miss.
    ///
    /// A missing, unreadable or stale side-store behaves like an empty one. Failing to persist a
    /// freshly computed series is logged; the series is still returned.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> FramecapResult<Vec<f64>>
    where
        F: FnOnce() -> FramecapResult<Vec<f64>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, archive = %self.archive.display(), "analysis cache hit");
            return Ok(hit);
        }

        tracing::debug!(key, archive = %self.archive.display(), "analysis cache miss");
        let value = compute()?;

        let mut doc = self.load_document();
        doc.archive = ArchiveFingerprint::of(&self.archive);
        doc.metrics.insert(key.to_string(), value.clone());
        if let Err(e) = self.backend.store(&self.archive, &doc) {
            tracing::warn!(key, error = %e, "failed to persist analysis cache");
        }
        Ok(value)
    }

    /// Drop every cached metric for this archive.
    pub fn clear(&self) -> FramecapResult<()> {
        self.backend.clear(&self.archive)
    }

    fn load_document(&self) -> CacheDocument {
        let doc = match self.backend.load(&self.archive) {
            Ok(Some(doc)) => doc,
            Ok(None) => return CacheDocument::default(),
            Err(e) => {
                tracing::warn!(archive = %self.archive.display(), error = %e, "ignoring unreadable analysis cache");
                return CacheDocument::default();
            }
        };

        let current = ArchiveFingerprint::of(&self.archive);
        match (doc.archive, current) {
            (Some(cached), Some(current)) if cached != current => {
                tracing::warn!(archive = %self.archive.display(), "analysis cache is stale; recomputing");
                CacheDocument::default()
            }
            _ => doc,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/cache.rs"]
mod tests;
