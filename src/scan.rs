//! Local asset audit.
//!
//! Discovery only ever sees what it probes. On a local site we can also list
//! the directory and compare, which answers "why is this image not in my
//! banner?":
//!
//! ```text
//! assets/img/impressions/
//! ├── impression-1.jpg      reachable
//! ├── impression-2.jpg      reachable
//! ├── impression-9.jpg      unreached: gap after 2 is longer than miss_limit
//! ├── 3.png                 unreached: naming drifted past the narrowed combo
//! └── cover.jpg             unrecognized: matches no template
//! ```
//!
//! Only files with one of the configured extensions are considered; anything
//! else in the directory (a manifest, a README) is not an asset.

use crate::pattern::{Combo, Template};
use crate::site;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// An image file in the asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFile {
    pub name: String,
    /// Index and combo, when the name matches a template and an extension.
    #[serde(skip)]
    pub matched: Option<(u32, Combo)>,
}

impl AssetFile {
    pub fn index(&self) -> Option<u32> {
        self.matched.map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Site-relative paths discovery returned.
    pub reachable: Vec<String>,
    /// Files that follow the naming scheme but were not discovered, by index.
    pub unreached: Vec<AssetFile>,
    /// Image files that match no template.
    pub unrecognized: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.unreached.is_empty() && self.unrecognized.is_empty()
    }
}

/// Match a filename against the naming scheme.
fn classify(name: &str, templates: &[Template], extensions: &[String]) -> Option<Option<(u32, Combo)>> {
    let (stem, ext) = name.rsplit_once('.')?;
    let extension = extensions.iter().position(|e| e == ext)?;
    let matched = templates
        .iter()
        .enumerate()
        .find_map(|(template, t)| t.match_stem(stem).map(|i| (i, Combo { template, extension })));
    Some(matched)
}

/// List the image files directly inside `dir`, sorted by name.
pub fn scan_assets(
    dir: &Path,
    templates: &[Template],
    extensions: &[String],
) -> Result<Vec<AssetFile>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    let mut assets = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if let Some(matched) = classify(&name, templates, extensions) {
            assets.push(AssetFile { name, matched });
        }
    }
    assets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(assets)
}

/// Compare the files on disk with what discovery returned for `base`.
pub fn audit(assets: &[AssetFile], discovered: &[String], base: &str) -> AuditReport {
    let found: HashSet<&str> = discovered.iter().map(String::as_str).collect();
    let mut report = AuditReport {
        reachable: discovered.to_vec(),
        ..Default::default()
    };
    for asset in assets {
        if found.contains(site::join(base, &asset.name).as_str()) {
            continue;
        }
        match asset.matched {
            Some(_) => report.unreached.push(asset.clone()),
            None => report.unrecognized.push(asset.name.clone()),
        }
    }
    report
        .unreached
        .sort_by(|a, b| a.index().cmp(&b.index()).then_with(|| a.name.cmp(&b.name)));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::parse_templates;
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = "assets/img/impressions/";

    fn naming() -> (Vec<Template>, Vec<String>) {
        (
            parse_templates(&["impression-{i}", "{i}"]).unwrap(),
            vec!["jpg".into(), "png".into()],
        )
    }

    fn setup(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for f in files {
            fs::write(tmp.path().join(f), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/impression-4.jpg"), b"x").unwrap();
        tmp
    }

    #[test]
    fn scan_lists_images_only() {
        let tmp = setup(&["impression-1.jpg", "3.png", "notes.txt", ".hidden.jpg"]);
        let (templates, extensions) = naming();
        let assets = scan_assets(tmp.path(), &templates, &extensions).unwrap();

        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["3.png", "impression-1.jpg"]);
        assert_eq!(assets[0].index(), Some(3));
        assert_eq!(
            assets[1].matched,
            Some((
                1,
                Combo {
                    template: 0,
                    extension: 0
                }
            ))
        );
    }

    #[test]
    fn unmatched_names_have_no_index() {
        let tmp = setup(&["cover.jpg", "impression-01.jpg"]);
        let (templates, extensions) = naming();
        let assets = scan_assets(tmp.path(), &templates, &extensions).unwrap();
        assert!(assets.iter().all(|a| a.matched.is_none()));
    }

    #[test]
    fn scan_missing_dir_is_error() {
        let (templates, extensions) = naming();
        let result = scan_assets(Path::new("/nonexistent/impressions"), &templates, &extensions);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn audit_splits_files() {
        let tmp = setup(&[
            "impression-1.jpg",
            "impression-2.jpg",
            "impression-9.jpg",
            "3.png",
            "cover.jpg",
        ]);
        let (templates, extensions) = naming();
        let assets = scan_assets(tmp.path(), &templates, &extensions).unwrap();
        let discovered = vec![
            format!("{BASE}impression-1.jpg"),
            format!("{BASE}impression-2.jpg"),
        ];

        let report = audit(&assets, &discovered, BASE);
        assert_eq!(report.reachable.len(), 2);
        let unreached: Vec<&str> = report.unreached.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(unreached, vec!["3.png", "impression-9.jpg"]);
        assert_eq!(report.unrecognized, vec!["cover.jpg"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn fully_discovered_directory_is_clean() {
        let tmp = setup(&["impression-1.jpg"]);
        let (templates, extensions) = naming();
        let assets = scan_assets(tmp.path(), &templates, &extensions).unwrap();
        let report = audit(&assets, &[format!("{BASE}impression-1.jpg")], BASE);
        assert!(report.is_clean());
    }
}
