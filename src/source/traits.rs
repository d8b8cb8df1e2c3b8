use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use tempfile::TempPath;

/// One GET, optionally conditional on a cached validator.
#[derive(Debug, Clone)]
pub struct ConditionalRequest {
    pub url: Url,
    /// Bare validator token of the cached copy, sent as `If-None-Match`.
    pub if_none_match: Option<String>,
    /// Where the transport stages the response body.
    pub staging_dir: PathBuf,
}

#[derive(Debug)]
pub enum TransportResponse {
    /// 304: the cached copy is still current.
    NotModified,
    /// 200 with a fully written body. Dropping `body` deletes the staged file.
    Payload {
        validator: Option<String>,
        body: TempPath,
        len: u64,
    },
    /// Anything else.
    Status(u16),
}

/// Black-box request/response executor. TLS, pooling and redirects are the
/// implementation's business.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    async fn execute(&self, request: ConditionalRequest) -> Result<TransportResponse>;
}
