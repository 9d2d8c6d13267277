//! Site root: where probed and fetched paths resolve.
//!
//! Discovery works on site-relative paths (`assets/img/impressions/1.jpg`),
//! exactly the strings a page uses in `src`. The root decides how those paths
//! are reached: over HTTP(S) against a served site, or straight from a local
//! directory (the "opened from disk" case).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid site URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{url} answered {status}")]
    Status { url: String, status: u16 },
    #[error("path {0:?} escapes the site root")]
    OutsideRoot(String),
}

/// Where the site lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteRoot {
    Dir(PathBuf),
    /// Always ends with `/` so relative joins stay under it.
    Url(Url),
}

impl SiteRoot {
    /// Interpret a CLI `--site` value.
    ///
    /// `http(s)://` values are served sites, `file://` URLs and everything
    /// else are local directories.
    pub fn parse(source: &str) -> Result<Self, SiteError> {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let mut url = Url::parse(trimmed)?;
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(Self::Url(url));
        }
        if trimmed.starts_with("file://") {
            let url = Url::parse(trimmed)?;
            let path = url
                .to_file_path()
                .map_err(|_| SiteError::OutsideRoot(trimmed.to_string()))?;
            return Ok(Self::Dir(path));
        }
        Ok(Self::Dir(PathBuf::from(trimmed)))
    }

    /// Absolute URL of a site-relative path (URL roots only).
    pub fn resolve(&self, rel: &str) -> Option<Url> {
        match self {
            Self::Url(root) => root.join(rel.trim_start_matches('/')).ok(),
            Self::Dir(_) => None,
        }
    }

    /// Filesystem path of a site-relative path (directory roots only).
    ///
    /// Paths containing `..` components are refused.
    pub fn local_path(&self, rel: &str) -> Option<PathBuf> {
        match self {
            Self::Dir(root) => {
                let rel = rel.trim_start_matches('/');
                if rel.split('/').any(|seg| seg == "..") {
                    return None;
                }
                Some(root.join(rel))
            }
            Self::Url(_) => None,
        }
    }

    /// Read a site-relative text resource.
    pub async fn read_text(&self, rel: &str, timeout: Duration) -> Result<String, SiteError> {
        match self {
            Self::Dir(_) => {
                let path = self
                    .local_path(rel)
                    .ok_or_else(|| SiteError::OutsideRoot(rel.to_string()))?;
                Ok(tokio::fs::read_to_string(path).await?)
            }
            Self::Url(_) => {
                let url = self
                    .resolve(rel)
                    .ok_or_else(|| SiteError::OutsideRoot(rel.to_string()))?;
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                let response = client.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SiteError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Ok(response.text().await?)
            }
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Dir(path) => path.display().to_string(),
            Self::Url(url) => url.to_string(),
        }
    }
}

/// Normalize a site-relative base directory.
///
/// Trims whitespace, drops a leading `./` or `/`, collapses repeated slashes
/// and guarantees exactly one trailing `/` on a non-empty base. Two spellings
/// of the same directory normalize to the same string, so they share a memo
/// entry.
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let segments: Vec<&str> = trimmed
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        return String::new();
    }
    format!("{}/", segments.join("/"))
}

/// Join a normalized base and a filename.
pub fn join(base: &str, filename: &str) -> String {
    format!("{}{}", normalize_base(base), filename)
}
