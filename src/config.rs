use std::path::PathBuf;

use serde::Deserialize;

/// Directory under `cache_dir` that holds validated asset files.
pub const CACHE_SUBDIR: &str = "ar-assets";

/// Directory under the cache root where in-progress downloads are staged.
/// Lives on the same filesystem so the final move is a rename.
pub const STAGING_SUBDIR: &str = ".staging";

/// Uniform scale applied when neither the command nor the asset defaults set one.
pub const DEFAULT_SCALE: f32 = 1.0;

/// Default on-disk budget for cached assets (400 MB).
pub const DEFAULT_DISK_CAPACITY_BYTES: u64 = 400 * 1024 * 1024;

/// Top-level configuration for the AR scene engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application-support directory; the asset cache is created beneath it.
    pub cache_dir: PathBuf,
    /// Upper bound for all cached asset files together.
    pub disk_capacity_bytes: u64,
    /// Per-request timeout for asset downloads.
    pub request_timeout_secs: u64,
    /// Capacity of the scene event inbox.
    pub inbox_capacity: usize,
}

impl EngineConfig {
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Root of the validated asset cache.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.join(CACHE_SUBDIR)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir(),
            disk_capacity_bytes: DEFAULT_DISK_CAPACITY_BYTES,
            request_timeout_secs: 60,
            inbox_capacity: 256,
        }
    }
}
