use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use super::traits::{AssetTransport, ConditionalRequest, TransportResponse};

/// reqwest-backed transport. Bodies are streamed into a named temp file in
/// the request's staging directory so a half-received payload is never
/// visible under its final name.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("failed to build http client: {}", e))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetTransport for HttpTransport {
    async fn execute(&self, request: ConditionalRequest) -> Result<TransportResponse> {
        let mut req = self.client.get(request.url.clone());
        if let Some(validator) = &request.if_none_match {
            req = req.header(header::IF_NONE_MATCH, format!("\"{}\"", validator));
        }

        let mut resp = req.send().await?;
        let status = resp.status();
        debug!(
            "http asset status={} url={} conditional={}",
            status.as_u16(),
            request.url,
            request.if_none_match.is_some()
        );

        if status == StatusCode::NOT_MODIFIED {
            return Ok(TransportResponse::NotModified);
        }
        if status != StatusCode::OK {
            warn!("http asset failed status={} url={}", status.as_u16(), request.url);
            return Ok(TransportResponse::Status(status.as_u16()));
        }

        let validator = resp
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        std::fs::create_dir_all(&request.staging_dir)?;
        let mut staged = tempfile::Builder::new()
            .prefix("download-")
            .tempfile_in(&request.staging_dir)?;

        let mut len = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            staged.write_all(&chunk)?;
            len += chunk.len() as u64;
        }
        let staged = tokio::task::spawn_blocking(move || {
            staged.as_file().sync_all().map(|()| staged)
        })
        .await??;

        Ok(TransportResponse::Payload {
            validator,
            body: staged.into_temp_path(),
            len,
        })
    }
}
