// Conditional fetch against the asset cache: reuse on 304, replace on 200.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cache::CacheStore;
use super::stats::PipelineStats;
use crate::error::{CacheError, FetchError};
use crate::source::locator::{normalize_validator, AssetLocator};
use crate::source::traits::{AssetTransport, ConditionalRequest, TransportResponse};

/// Single-attempt download pipeline. No retries and no backoff; the asset
/// registry decides whether a failed name is ever requested again.
pub struct DownloadPipeline {
    transport: Arc<dyn AssetTransport>,
    cache: Arc<CacheStore>,
    stats: Arc<PipelineStats>,
}

impl DownloadPipeline {
    pub fn new(
        transport: Arc<dyn AssetTransport>,
        cache: Arc<CacheStore>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            transport,
            cache,
            stats,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Resolve `locator` to a local file, revalidating any cached copy.
    pub async fn fetch(&self, locator: &AssetLocator) -> Result<PathBuf, FetchError> {
        self.stats.begin_fetch();
        let result = self.fetch_once(locator).await;
        self.stats.end_fetch();

        if let Err(e) = &result {
            self.stats.record_failure();
            warn!("fetch {} ({}) failed: {}", locator.name, locator.url, e);
        }
        result
    }

    async fn fetch_once(&self, locator: &AssetLocator) -> Result<PathBuf, FetchError> {
        let cached = self.cache.lookup(locator);
        let request = ConditionalRequest {
            url: locator.url.clone(),
            if_none_match: cached.as_ref().map(|entry| entry.validator.clone()),
            staging_dir: self.cache.staging_dir(),
        };

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(FetchError::Transport)?;

        match response {
            TransportResponse::NotModified => {
                let entry = cached.ok_or_else(|| FetchError::StaleNotModified(locator.url.to_string()))?;
                self.stats.record_revalidated();
                debug!(
                    "{} not modified, reusing {}",
                    locator.name,
                    entry.path.display()
                );
                Ok(entry.path)
            }
            TransportResponse::Status(code) => Err(FetchError::Status(code)),
            TransportResponse::Payload {
                validator,
                body,
                len,
            } => {
                // Dropping `body` on the error path deletes the staged file.
                let validator = validator
                    .as_deref()
                    .and_then(normalize_validator)
                    .ok_or(FetchError::MissingValidator)?;

                if let Some(previous) = cached.as_ref().filter(|c| c.validator != validator) {
                    debug!(
                        "{} validator changed {} -> {}",
                        locator.name, previous.validator, validator
                    );
                    self.cache.remove_stale(locator, &validator);
                }

                let path = match self.cache.store(locator, &validator, body) {
                    Ok(path) => path,
                    Err(CacheError::Persist { dest, source }) => {
                        warn!(
                            "could not move {} into cache at {}: {}; using staged copy",
                            locator.name,
                            dest.display(),
                            source.error
                        );
                        source.path.keep().map_err(|e| {
                            FetchError::Cache(CacheError::Persist { dest, source: e })
                        })?
                    }
                    Err(e) => return Err(e.into()),
                };

                self.stats.record_downloaded(len);
                info!(
                    "downloaded {} ({} bytes) -> {}",
                    locator.name,
                    len,
                    path.display()
                );
                Ok(path)
            }
        }
    }
}
