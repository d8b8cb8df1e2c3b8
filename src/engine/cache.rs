// On-disk asset cache keyed by host + path stem, one live file per validator.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempPath;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::STAGING_SUBDIR;
use crate::error::CacheError;
use crate::source::locator::{cache_file_name, validator_from_file_name, AssetLocator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub validator: String,
    pub path: PathBuf,
}

/// Sole writer of the cache directory.
///
/// No locking: two concurrent stores for the same key can race. The asset
/// registry's one-load-per-name rule is what keeps that from happening.
pub struct CacheStore {
    root: PathBuf,
    capacity_bytes: u64,
}

impl CacheStore {
    /// Open the store at `root`. Leftovers in the staging directory from an
    /// earlier run (interrupted downloads, payloads that could not be moved
    /// into place) are deleted.
    pub fn new(root: impl Into<PathBuf>, capacity_bytes: u64) -> Self {
        let store = Self {
            root: root.into(),
            capacity_bytes,
        };
        store.purge_staging();
        store
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory for in-flight downloads, on the same filesystem as
    /// the entries so `store` can rename instead of copy.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_SUBDIR)
    }

    /// Find the cached file for `locator`.
    ///
    /// A missing or unreadable directory is a cold start, not an error. If a
    /// degraded cache holds several validators for the key, the most recently
    /// written one wins.
    pub fn lookup(&self, locator: &AssetLocator) -> Option<CacheEntry> {
        let entries = match self.entries_for(locator) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("cache lookup miss for {}: {}", locator.url, e);
                return None;
            }
        };
        if entries.len() > 1 {
            warn!(
                "cache key for {} holds {} validators, using newest",
                locator.url,
                entries.len()
            );
        }
        entries
            .into_iter()
            .max_by_key(|(_, modified)| *modified)
            .map(|(entry, _)| entry)
    }

    /// Move a completed download into place as `<validator>-<file name>`.
    ///
    /// Files for any other validator under the same key are removed first.
    /// The move is a rename, so readers see either the old file or the whole
    /// new one.
    pub fn store(
        &self,
        locator: &AssetLocator,
        validator: &str,
        body: TempPath,
    ) -> Result<PathBuf, CacheError> {
        let dir = self.root.join(locator.cache_key()?);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        self.remove_stale(locator, validator);

        let dest = dir.join(cache_file_name(validator, locator.file_name()?));
        body.persist(&dest).map_err(|source| CacheError::Persist {
            dest: dest.clone(),
            source,
        })?;
        debug!("cached {} as {}", locator.url, dest.display());

        self.trim_to_capacity(&dest);
        Ok(dest)
    }

    /// Delete every entry for `locator` whose validator differs from `keep`.
    /// Returns how many files were removed.
    pub fn remove_stale(&self, locator: &AssetLocator, keep: &str) -> usize {
        let Ok(entries) = self.entries_for(locator) else {
            return 0;
        };
        let mut removed = 0;
        for (entry, _) in entries {
            if entry.validator == keep {
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    debug!("removed stale cache entry {}", entry.path.display());
                    removed += 1;
                }
                Err(e) => warn!(
                    "failed to remove stale cache entry {}: {}",
                    entry.path.display(),
                    e
                ),
            }
        }
        removed
    }

    /// Remove every file left in the staging directory. Returns how many
    /// were deleted.
    pub fn purge_staging(&self) -> usize {
        let staging = self.staging_dir();
        let Ok(read) = fs::read_dir(&staging) else {
            return 0;
        };
        let mut removed = 0;
        for item in read.flatten() {
            let path = item.path();
            if !item.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("failed to remove staged file {}: {}", path.display(), e),
            }
        }
        if removed > 0 {
            info!("removed {} leftover staged files from {}", removed, staging.display());
        }
        removed
    }

    /// Total size of cached entries, staging excluded.
    pub fn usage_bytes(&self) -> u64 {
        self.cached_files().iter().map(|f| f.len).sum()
    }

    /// Evict least recently written entries until the cache fits its budget.
    /// `protect` is never evicted. Returns the number of bytes freed.
    pub fn trim_to_capacity(&self, protect: &Path) -> u64 {
        let mut files = self.cached_files();
        let mut usage: u64 = files.iter().map(|f| f.len).sum();
        if usage <= self.capacity_bytes {
            return 0;
        }

        files.sort_by_key(|f| f.modified);
        let mut freed = 0u64;
        for file in files {
            if usage <= self.capacity_bytes {
                break;
            }
            if file.path == protect {
                continue;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    usage -= file.len;
                    freed += file.len;
                }
                Err(e) => warn!("cache eviction failed for {}: {}", file.path.display(), e),
            }
        }
        info!(
            "cache trimmed: freed={} usage={} capacity={}",
            freed, usage, self.capacity_bytes
        );
        freed
    }

    fn entries_for(
        &self,
        locator: &AssetLocator,
    ) -> Result<Vec<(CacheEntry, SystemTime)>, CacheError> {
        let dir = self.root.join(locator.cache_key()?);
        let file_name = locator.file_name()?;
        let read = fs::read_dir(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let mut entries = Vec::new();
        for item in read.flatten() {
            let Ok(meta) = item.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let name = item.file_name();
            let Some(validator) = name
                .to_str()
                .and_then(|n| validator_from_file_name(n, file_name))
            else {
                continue;
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((
                CacheEntry {
                    validator,
                    path: item.path(),
                },
                modified,
            ));
        }
        Ok(entries)
    }

    fn cached_files(&self) -> Vec<CachedFile> {
        let staging = self.staging_dir();
        WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.path() != staging)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                Some(CachedFile {
                    path: e.into_path(),
                    len: meta.len(),
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                })
            })
            .collect()
    }
}

struct CachedFile {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}
