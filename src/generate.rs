//! HTML output.
//!
//! Renders the markup a page needs around the discovered images and writes
//! it next to the site.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── impressions.html          # Banner fragment + lightbox (if any images)
//! ├── impressions.css           # Banner, lightbox, header and card styles
//! ├── gallery-links.html        # Links to every gallery (if any)
//! └── galleries/
//!     ├── coast.html            # One page per manifest gallery
//!     └── ...
//! ```
//!
//! ## Banner fragment
//!
//! The track holds the image list twice. Every image carries its position
//! in the track as `data-index`, which is what [`crate::banner::Banner::pointer_up`]
//! receives as its click target. The second copy is hidden from assistive
//! technology since it only exists for the wraparound.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/). All interpolated paths, titles and
//! ids are escaped. Gallery descriptions are markdown, rendered with
//! pulldown-cmark; HTML embedded in a description is escaped as text.

use crate::config::{self, SiteConfig};
use crate::manifest::GallerySpec;
use crate::page::{self, ids};
use crate::session::ResolvedGallery;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Event, Parser, html as md_html};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const CSS_STATIC: &str = include_str!("../static/impressions.css");

/// What [`generate`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateSummary {
    pub output_dir: PathBuf,
    /// Banner image count; 0 means no banner fragment was written.
    pub banner_images: usize,
    /// `(id, image count)` per gallery page.
    pub galleries: Vec<(String, usize)>,
    pub files: Vec<PathBuf>,
}

pub fn generate(
    output_dir: &Path,
    banner: &[String],
    galleries: &[ResolvedGallery],
    config: &SiteConfig,
) -> Result<GenerateSummary, GenerateError> {
    fs::create_dir_all(output_dir)?;
    let mut summary = GenerateSummary {
        output_dir: output_dir.to_path_buf(),
        banner_images: banner.len(),
        ..Default::default()
    };
    let mut write = |rel: &str, contents: String| -> Result<(), GenerateError> {
        let path = output_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        log::debug!("wrote {}", path.display());
        summary.files.push(PathBuf::from(rel));
        Ok(())
    };

    let css = format!(
        "{}\n\n{}",
        config::generate_banner_css(&config.banner),
        CSS_STATIC
    );
    write("impressions.css", css)?;

    if let Some(track) = render_banner(banner) {
        let fragment = html! {
            (track)
            (render_lightbox())
        };
        write("impressions.html", fragment.into_string())?;
    } else {
        log::info!("no banner images, skipping impressions.html");
    }

    let year = page::current_year();
    let specs: Vec<&GallerySpec> = galleries.iter().map(|g| &g.spec).collect();
    for (gallery, name) in galleries.iter().zip(page_names(&specs)) {
        let markup = render_gallery_page(&gallery.spec, &gallery.images, year);
        write(&format!("galleries/{name}.html"), markup.into_string())?;
    }

    if !galleries.is_empty() {
        write(
            "gallery-links.html",
            render_gallery_links(&specs).into_string(),
        )?;
    }

    summary.galleries = galleries
        .iter()
        .map(|g| (g.spec.id.clone(), g.images.len()))
        .collect();
    Ok(summary)
}

/// File stem for a gallery page. Ids come from a remote manifest, so
/// anything but a plain name is flattened.
fn page_name(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// One distinct page name per gallery, in order. Ids that flatten to a
/// name already taken get a numeric suffix.
fn page_names(galleries: &[&GallerySpec]) -> Vec<String> {
    let mut taken = HashSet::new();
    galleries
        .iter()
        .map(|gallery| {
            let base = page_name(&gallery.id);
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}-{n}");
                n += 1;
            }
            if name != base {
                log::warn!(
                    "gallery {:?}: page {base}.html is taken, writing {name}.html",
                    gallery.id
                );
            }
            name
        })
        .collect()
}

/// Markdown to HTML. Raw HTML in the source is shown as text, never emitted.
fn render_markdown(source: &str) -> String {
    let parser = Parser::new(source).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

// ============================================================================
// HTML Components
// ============================================================================

/// The looping banner track, or nothing for an empty list.
pub fn render_banner(images: &[String]) -> Option<Markup> {
    if images.is_empty() {
        return None;
    }
    let n = images.len();
    Some(html! {
        div id=(ids::TRACK) class="impressions-track" {
            @for (i, src) in images.iter().enumerate() {
                img src=(src) alt="" data-index=(i) loading="lazy" draggable="false";
            }
            @for (i, src) in images.iter().enumerate() {
                img src=(src) alt="" data-index=(n + i) aria-hidden="true" loading="lazy" draggable="false";
            }
        }
    })
}

/// The enlarge overlay. Hidden until an image is clicked.
pub fn render_lightbox() -> Markup {
    html! {
        div id=(ids::LIGHTBOX) class="lightbox" role="dialog" aria-modal="true" hidden {
            button.lightbox-close type="button" aria-label="Close" { "×" }
            img.lightbox-image alt="";
        }
    }
}

pub fn render_gallery_page(gallery: &GallerySpec, images: &[String], year: i32) -> Markup {
    let title = gallery.display_title();
    // Pages live one level down, in galleries/
    let up = |path: &str| format!("../{}", path.trim_start_matches('/'));

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href="../impressions.css";
            }
            body {
                header {
                    a href="../index.html" { "Home" }
                }
                main.gallery-page {
                    h1 id=(ids::GALLERY_TITLE) { (title) }
                    @if let Some(description) = &gallery.description {
                        div id=(ids::GALLERY_DESCRIPTION) {
                            (PreEscaped(render_markdown(description)))
                        }
                    }
                    div id=(ids::GALLERY_GRID) {
                        @for (i, src) in images.iter().enumerate() {
                            a class=(ids::CARD_CLASS) href=(up(src)) {
                                img src=(up(src)) alt={ (title) " " (i + 1) } loading="lazy";
                            }
                        }
                    }
                }
                footer {
                    "© " span id=(ids::YEAR) { (year) }
                }
                (render_lightbox())
            }
        }
    }
}

pub fn render_gallery_links(galleries: &[&GallerySpec]) -> Markup {
    html! {
        nav id=(ids::GALLERY_LINKS) {
            ul {
                @for (gallery, name) in galleries.iter().zip(page_names(galleries)) {
                    li {
                        a href={ "galleries/" (name) ".html" } {
                            (gallery.display_title())
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
