//! Optional gallery manifest.
//!
//! A site may publish a JSON list of galleries next to its images:
//!
//! ```json
//! {
//!   "galleries": [
//!     { "id": "coast", "title": "Coast", "count": 12, "pattern": "coast-{i}.jpg" },
//!     { "id": "night-walks", "description": "Long exposures, **tripod** only." }
//!   ]
//! }
//! ```
//!
//! Galleries with both `count` and `pattern` have an exact image list and are
//! never probed. The others are discovered like the banner, each under
//! `<galleries.base><id>/`.
//!
//! The manifest is optional. A missing or malformed file is logged and
//! treated as "no galleries"; it never fails a run.

use crate::pattern::GalleryPattern;
use crate::site::{self, SiteRoot};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryManifest {
    #[serde(default)]
    pub galleries: Vec<GallerySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GallerySpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    /// Markdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GallerySpec {
    /// Title, or the id with separators turned into spaces.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => self.id.replace(['-', '_'], " "),
        }
    }

    pub fn start(&self) -> u32 {
        self.start.unwrap_or(1)
    }

    /// Directory of this gallery under the galleries base.
    pub fn base(&self, galleries_base: &str) -> String {
        site::normalize_base(&format!("{}{}", site::normalize_base(galleries_base), self.id))
    }

    /// The exact image list, when `count` and a valid `pattern` are both given.
    ///
    /// At most `limit` paths are listed, and the list ends early rather than
    /// wrap past the largest index.
    pub fn exact_urls(&self, galleries_base: &str, limit: usize) -> Option<Vec<String>> {
        let count = self.count?;
        let pattern = match GalleryPattern::parse(self.pattern.as_deref()?) {
            Ok(pattern) => pattern,
            Err(err) => {
                log::warn!("gallery {}: ignoring pattern: {err}", self.id);
                return None;
            }
        };
        let base = self.base(galleries_base);
        let start = self.start();
        let listed = (count as usize).min(limit);
        if listed < count as usize {
            log::warn!("gallery {}: listing {listed} of {count} image(s)", self.id);
        }
        Some(
            (0..count)
                .map_while(|offset| start.checked_add(offset))
                .take(listed)
                .map(|i| site::join(&base, &pattern.filename(i)))
                .collect(),
        )
    }
}

impl GalleryManifest {
    pub fn find(&self, id: &str) -> Option<&GallerySpec> {
        self.galleries.iter().find(|g| g.id == id)
    }
}

/// Fetch and parse the manifest. Any failure is logged and yields `None`.
pub async fn load_manifest(root: &SiteRoot, path: &str) -> Option<GalleryManifest> {
    let text = match root.read_text(path, FETCH_TIMEOUT).await {
        Ok(text) => text,
        Err(err) => {
            log::warn!("gallery manifest {path} unavailable: {err}");
            return None;
        }
    };
    match serde_json::from_str::<GalleryManifest>(&text) {
        Ok(manifest) => {
            log::info!(
                "loaded gallery manifest {path} ({} galleries)",
                manifest.galleries.len()
            );
            Some(manifest)
        }
        Err(err) => {
            log::warn!("gallery manifest {path} is malformed: {err}");
            None
        }
    }
}

/// The `id` parameter of a page query string (`?id=coast`).
pub fn gallery_id_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec(id: &str) -> GallerySpec {
        GallerySpec {
            id: id.into(),
            title: None,
            count: None,
            pattern: None,
            start: None,
            description: None,
        }
    }

    #[test]
    fn parses_sparse_entries() {
        let manifest: GalleryManifest = serde_json::from_str(
            r#"{"galleries":[{"id":"coast","count":3,"pattern":"c-{i}.jpg"},{"id":"night"}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.galleries.len(), 2);
        assert_eq!(manifest.galleries[0].count, Some(3));
        assert_eq!(manifest.galleries[1].title, None);
    }

    #[test]
    fn display_title_falls_back_to_id() {
        assert_eq!(spec("night-walks_2").display_title(), "night walks 2");
        let titled = GallerySpec {
            title: Some("Night Walks".into()),
            ..spec("night")
        };
        assert_eq!(titled.display_title(), "Night Walks");
    }

    #[test]
    fn exact_urls_need_count_and_pattern() {
        let base = "assets/img/galleries/";
        assert_eq!(spec("coast").exact_urls(base, 100), None);

        let exact = GallerySpec {
            count: Some(3),
            pattern: Some("coast-{i}.jpg".into()),
            start: Some(4),
            ..spec("coast")
        };
        assert_eq!(
            exact.exact_urls(base, 100).unwrap(),
            vec![
                "assets/img/galleries/coast/coast-4.jpg",
                "assets/img/galleries/coast/coast-5.jpg",
                "assets/img/galleries/coast/coast-6.jpg",
            ]
        );
    }

    #[test]
    fn exact_urls_stop_at_largest_index() {
        let edge = GallerySpec {
            count: Some(3),
            pattern: Some("e-{i}.jpg".into()),
            start: Some(u32::MAX - 1),
            ..spec("edge")
        };
        assert_eq!(
            edge.exact_urls("g/", 100).unwrap(),
            vec![
                format!("g/edge/e-{}.jpg", u32::MAX - 1),
                format!("g/edge/e-{}.jpg", u32::MAX),
            ]
        );
    }

    #[test]
    fn exact_urls_are_capped_at_limit() {
        let huge = GallerySpec {
            count: Some(4_000_000_000),
            pattern: Some("h-{i}.jpg".into()),
            ..spec("huge")
        };
        let urls = huge.exact_urls("g/", 100).unwrap();
        assert_eq!(urls.len(), 100);
        assert_eq!(urls[99], "g/huge/h-100.jpg");
    }

    #[test]
    fn bad_pattern_disables_exact_list() {
        let broken = GallerySpec {
            count: Some(3),
            pattern: Some("no-placeholder.jpg".into()),
            ..spec("coast")
        };
        assert_eq!(broken.exact_urls("g/", 100), None);
    }

    #[test]
    fn find_by_id() {
        let manifest = GalleryManifest {
            galleries: vec![spec("a"), spec("b")],
        };
        assert_eq!(manifest.find("b").map(|g| g.id.as_str()), Some("b"));
        assert!(manifest.find("c").is_none());
    }

    #[test]
    fn query_id_extraction() {
        assert_eq!(gallery_id_from_query("?id=coast"), Some("coast".into()));
        assert_eq!(
            gallery_id_from_query("view=grid&id=night%20walks"),
            Some("night walks".into())
        );
        assert_eq!(gallery_id_from_query("?id="), None);
        assert_eq!(gallery_id_from_query(""), None);
    }

    #[tokio::test]
    async fn load_from_local_site() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("g")).unwrap();
        fs::write(
            tmp.path().join("g/manifest.json"),
            r#"{"galleries":[{"id":"coast"}]}"#,
        )
        .unwrap();
        let root = SiteRoot::Dir(tmp.path().to_path_buf());

        let manifest = load_manifest(&root, "g/manifest.json").await.unwrap();
        assert_eq!(manifest.galleries[0].id, "coast");
    }

    #[tokio::test]
    async fn missing_or_malformed_manifest_is_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();
        let root = SiteRoot::Dir(tmp.path().to_path_buf());

        assert!(load_manifest(&root, "missing.json").await.is_none());
        assert!(load_manifest(&root, "bad.json").await.is_none());
    }
}
