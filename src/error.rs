// Error kinds that callers branch on. Internal plumbing uses anyhow.

use std::path::PathBuf;

use thiserror::Error;

/// Why a single download pipeline invocation failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("HTTP 200 without an ETag; asset can never be revalidated")]
    MissingValidator,

    #[error("304 Not Modified but no cached file for {0}")]
    StaleNotModified(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move payload into {dest}: {source}")]
    Persist {
        dest: PathBuf,
        #[source]
        source: tempfile::PathPersistError,
    },

    #[error("locator has no usable file name: {0}")]
    BadLocator(String),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reasons an inbound command is rejected at the dispatch boundary.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("command is not a JSON object")]
    NotAnObject,

    #[error("command has no `action` field")]
    MissingAction,

    #[error("unrecognized action `{0}`")]
    UnknownAction(String),

    #[error("`{action}` command is missing `{field}`")]
    MissingField {
        action: &'static str,
        field: String,
    },

    #[error("asset `{name}` has an invalid url `{url}`")]
    InvalidLocator { name: String, url: String },

    #[error("malformed `{action}` payload: {message}")]
    Payload {
        action: &'static str,
        message: String,
    },
}
