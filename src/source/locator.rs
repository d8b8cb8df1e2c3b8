// Remote asset identity: logical name, URL, and the cache key derived from it.

use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Url;

use crate::error::CacheError;

/// Characters that may not appear verbatim in a cache file name.
const FILE_NAME_UNSAFE: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'|')
    .add(b'%');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocator {
    pub name: String,
    pub url: Url,
}

impl AssetLocator {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
        }
    }

    /// Parse `raw` as an http(s) URL with a host and a non-empty last path segment.
    pub fn parse(name: impl Into<String>, raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        let locator = Self::new(name, url);
        locator.file_name().ok()?;
        Some(locator)
    }

    /// Last path segment, e.g. `shoe.usdz`.
    pub fn file_name(&self) -> Result<&str, CacheError> {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .ok_or_else(|| CacheError::BadLocator(self.url.to_string()))
    }

    /// Cache key relative to the store root: host, then the path with the
    /// extension of the last segment removed.
    ///
    /// `https://cdn.test/models/shoe.usdz` maps to `cdn.test/models/shoe`.
    pub fn cache_key(&self) -> Result<PathBuf, CacheError> {
        let host = self
            .url
            .host_str()
            .ok_or_else(|| CacheError::BadLocator(self.url.to_string()))?;
        let file_name = self.file_name()?;
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        let mut key = PathBuf::from(host);
        if let Some(segments) = self.url.path_segments() {
            let segments: Vec<&str> = segments.collect();
            for segment in &segments[..segments.len().saturating_sub(1)] {
                if !segment.is_empty() && *segment != "." && *segment != ".." {
                    key.push(segment);
                }
            }
        }
        key.push(stem);
        Ok(key)
    }
}

/// Reduce an ETag header value to its bare token: `W/"abc"`, `"abc"` and
/// `abc` all become `abc`. Returns `None` for an empty validator.
pub fn normalize_validator(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    let bare = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

/// `<validator>-<file name>`, with file-system hostile validator bytes escaped.
pub fn cache_file_name(validator: &str, file_name: &str) -> String {
    format!(
        "{}-{}",
        utf8_percent_encode(validator, FILE_NAME_UNSAFE),
        file_name
    )
}

/// Inverse of [`cache_file_name`] for a known original file name.
pub fn validator_from_file_name(entry_name: &str, file_name: &str) -> Option<String> {
    let encoded = entry_name.strip_suffix(file_name)?.strip_suffix('-')?;
    if encoded.is_empty() {
        return None;
    }
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_host_and_path_stem() {
        let loc = AssetLocator::parse("shoe", "https://cdn.test/models/shoe.usdz").unwrap();
        assert_eq!(loc.file_name().unwrap(), "shoe.usdz");
        assert_eq!(
            loc.cache_key().unwrap(),
            PathBuf::from("cdn.test").join("models").join("shoe")
        );
    }

    #[test]
    fn test_parse_rejects_unusable_urls() {
        assert!(AssetLocator::parse("a", "not a url").is_none());
        assert!(AssetLocator::parse("a", "ftp://cdn.test/a.usdz").is_none());
        assert!(AssetLocator::parse("a", "https://cdn.test/").is_none());
    }

    #[test]
    fn test_normalize_validator() {
        assert_eq!(normalize_validator("\"abc\"").as_deref(), Some("abc"));
        assert_eq!(normalize_validator("W/\"abc\"").as_deref(), Some("abc"));
        assert_eq!(normalize_validator(" abc ").as_deref(), Some("abc"));
        assert_eq!(normalize_validator("\"\""), None);
        // Case-sensitive: no folding.
        assert_eq!(normalize_validator("\"ABC\"").as_deref(), Some("ABC"));
    }

    #[test]
    fn test_file_name_round_trips_unsafe_validator() {
        let name = cache_file_name("v1/2:x", "shoe.usdz");
        assert!(!name.contains('/'));
        assert_eq!(
            validator_from_file_name(&name, "shoe.usdz").as_deref(),
            Some("v1/2:x")
        );
        assert_eq!(validator_from_file_name("other.usdz", "shoe.usdz"), None);
        assert_eq!(validator_from_file_name("-shoe.usdz", "shoe.usdz"), None);
    }
}
