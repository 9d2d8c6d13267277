//! Existence probing.
//!
//! A probe answers one question: is there an image at this site-relative
//! path? It never fails. A missing file, a 404, a refused connection, a
//! timeout and a body that is not an image all come back as `false`.
//!
//! ## Strategies
//!
//! | Strategy | HTTP root | Directory root |
//! |---|---|---|
//! | **Head** (lightweight) | `HEAD` request, success status | file metadata says regular file |
//! | **Load** (fallback) | `GET`, body decodes as an image | file header decodes as an image |
//!
//! With [`ProbeStrategy::Auto`] an HTTP prober sends a single `HEAD` to the
//! site root the first time it is used. Servers that refuse the method
//! (405/501) or connections that fail switch the session to **Load**;
//! anything else, a 404 included, proves `HEAD` works. The choice is cached
//! inside the prober for the rest of the session; there is no process-wide
//! flag.

use crate::config::{ProbeConfig, ProbeStrategy};
use crate::site::SiteRoot;
use reqwest::StatusCode;
use std::io::Cursor;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use url::Url;

/// Bytes read from a local file to decide whether it is an image.
const HEADER_BYTES: usize = 64 * 1024;

/// Existence check for one site-relative path.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn exists(&self, path: &str) -> bool;
}

#[async_trait::async_trait]
impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    async fn exists(&self, path: &str) -> bool {
        (**self).exists(path).await
    }
}

/// The concrete check a session settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Head,
    Load,
}

/// Whether `bytes` start with a decodable image header.
///
/// Reads dimensions only; the pixel data is never decoded.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .filter(|reader| reader.format().is_some())
        .and_then(|reader| reader.into_dimensions().ok())
        .is_some()
}

/// Prober for sites served over HTTP(S).
pub struct HttpProber {
    client: reqwest::Client,
    root: Url,
    strategy: ProbeStrategy,
    kind: OnceCell<ProbeKind>,
}

impl HttpProber {
    pub fn new(root: Url, config: &ProbeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|err| {
                log::warn!("falling back to a default HTTP client: {err}");
                reqwest::Client::new()
            });
        Self {
            client,
            root,
            strategy: config.strategy,
            kind: OnceCell::new(),
        }
    }

    /// The strategy in effect, running the capability probe on first use.
    pub async fn kind(&self) -> ProbeKind {
        *self.kind.get_or_init(|| self.select_kind()).await
    }

    async fn select_kind(&self) -> ProbeKind {
        let kind = match self.strategy {
            ProbeStrategy::Head => ProbeKind::Head,
            ProbeStrategy::Load => ProbeKind::Load,
            ProbeStrategy::Auto => match self.client.head(self.root.clone()).send().await {
                Ok(response)
                    if matches!(
                        response.status(),
                        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                    ) =>
                {
                    ProbeKind::Load
                }
                Ok(_) => ProbeKind::Head,
                Err(err) => {
                    log::debug!("HEAD capability probe failed: {err}");
                    ProbeKind::Load
                }
            },
        };
        log::debug!("probe strategy for {}: {:?}", self.root, kind);
        kind
    }

    async fn head(&self, url: Url) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn load(&self, url: Url) -> bool {
        let mut response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => return false,
        };
        // Only the header is decoded; the rest of the body is never read.
        let mut header = Vec::with_capacity(HEADER_BYTES);
        while header.len() < HEADER_BYTES {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = HEADER_BYTES - header.len();
                    header.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                Ok(None) => break,
                Err(_) => return false,
            }
        }
        looks_like_image(&header)
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn exists(&self, path: &str) -> bool {
        let Ok(url) = self.root.join(path.trim_start_matches('/')) else {
            return false;
        };
        let hit = match self.kind().await {
            ProbeKind::Head => self.head(url).await,
            ProbeKind::Load => self.load(url).await,
        };
        log::debug!("probe {path}: {}", if hit { "hit" } else { "miss" });
        hit
    }
}

/// Prober for sites read straight from a local directory.
pub struct FsProber {
    root: SiteRoot,
    kind: ProbeKind,
}

impl FsProber {
    pub fn new(root: PathBuf, strategy: ProbeStrategy) -> Self {
        let kind = match strategy {
            ProbeStrategy::Load => ProbeKind::Load,
            ProbeStrategy::Auto | ProbeStrategy::Head => ProbeKind::Head,
        };
        Self {
            root: SiteRoot::Dir(root),
            kind,
        }
    }

    async fn load(path: PathBuf) -> bool {
        let Ok(file) = tokio::fs::File::open(path).await else {
            return false;
        };
        let mut header = Vec::with_capacity(HEADER_BYTES);
        match file.take(HEADER_BYTES as u64).read_to_end(&mut header).await {
            Ok(_) => looks_like_image(&header),
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl Prober for FsProber {
    async fn exists(&self, path: &str) -> bool {
        let Some(local) = self.root.local_path(path) else {
            return false;
        };
        let hit = match self.kind {
            ProbeKind::Head => tokio::fs::metadata(&local)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            ProbeKind::Load => Self::load(local).await,
        };
        log::debug!("probe {path}: {}", if hit { "hit" } else { "miss" });
        hit
    }
}

/// Build the prober matching a site root.
pub fn prober_for(root: &SiteRoot, config: &ProbeConfig) -> Box<dyn Prober> {
    match root {
        SiteRoot::Dir(dir) => Box::new(FsProber::new(dir.clone(), config.strategy)),
        SiteRoot::Url(url) => Box::new(HttpProber::new(url.clone(), config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::png_bytes;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn png_is_an_image() {
        assert!(looks_like_image(&png_bytes()));
    }

    #[test]
    fn html_is_not_an_image() {
        assert!(!looks_like_image(b"<!DOCTYPE html><html></html>"));
        assert!(!looks_like_image(b""));
    }

    #[test]
    fn truncated_png_is_not_an_image() {
        let bytes = png_bytes();
        assert!(!looks_like_image(&bytes[..8]));
    }

    #[tokio::test]
    async fn fs_head_checks_regular_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("img/sub")).unwrap();
        fs::write(tmp.path().join("img/1.jpg"), b"not really a jpeg").unwrap();

        let prober = FsProber::new(tmp.path().to_path_buf(), ProbeStrategy::Auto);
        assert!(prober.exists("img/1.jpg").await);
        assert!(!prober.exists("img/2.jpg").await);
        // Directories are not resources
        assert!(!prober.exists("img/sub").await);
    }

    #[tokio::test]
    async fn fs_load_requires_decodable_image() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("real.png"), png_bytes()).unwrap();
        fs::write(tmp.path().join("fake.png"), b"oops").unwrap();

        let prober = FsProber::new(tmp.path().to_path_buf(), ProbeStrategy::Load);
        assert!(prober.exists("real.png").await);
        assert!(!prober.exists("fake.png").await);
    }

    #[tokio::test]
    async fn fs_probe_never_leaves_root() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        fs::create_dir_all(&site).unwrap();
        fs::write(tmp.path().join("secret.jpg"), b"x").unwrap();

        let prober = FsProber::new(site, ProbeStrategy::Head);
        assert!(!prober.exists("../secret.jpg").await);
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_false() {
        // Port 9 (discard) on localhost is closed in test environments
        let root = Url::parse("http://127.0.0.1:9/").unwrap();
        let config = ProbeConfig {
            strategy: ProbeStrategy::Auto,
            timeout_ms: 500,
        };
        let prober = HttpProber::new(root, &config);
        assert!(!prober.exists("a.jpg").await);
        assert_eq!(prober.kind().await, ProbeKind::Load);
    }

    #[tokio::test]
    async fn forced_strategy_skips_capability_probe() {
        let root = Url::parse("http://127.0.0.1:9/").unwrap();
        let config = ProbeConfig {
            strategy: ProbeStrategy::Head,
            timeout_ms: 500,
        };
        let prober = HttpProber::new(root, &config);
        assert_eq!(prober.kind().await, ProbeKind::Head);
    }
}
