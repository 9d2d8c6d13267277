//! CLI output formatting.
//!
//! Every entity leads with a 3-digit positional index; paths and details
//! follow on indented context lines.
//!
//! # Output Format
//!
//! ## Discover
//!
//! ```text
//! Banner (2 images)
//! 001 impression-1.webp
//!     Source: assets/img/impressions/impression-1.webp
//! 002 impression-2.webp
//!     Source: assets/img/impressions/impression-2.webp
//! ```
//!
//! ## Galleries
//!
//! ```text
//! Galleries
//! 001 Coast (2 images)
//!     Source: assets/img/galleries/coast/
//!     Description: Shot at dawn.
//!     001 coast-1.jpg
//!     002 coast-2.jpg
//! ```
//!
//! ## Build
//!
//! ```text
//! Banner (5 images) → impressions.html
//! 001 Coast (2 images) → galleries/coast.html
//! Gallery links → gallery-links.html
//! Styles → impressions.css
//!
//! Generated banner with 5 images, 1 gallery page in dist
//! ```
//!
//! ## Check
//!
//! ```text
//! Reachable (2 images)
//! Unreached
//! 001 impression-9.jpg (index 9)
//! Unrecognized
//! 001 cover.jpg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::discover::{DiscoveryEvent, StopReason};
use crate::generate::GenerateSummary;
use crate::scan::AuditReport;
use crate::session::ResolvedGallery;
use crate::site;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn count(n: usize) -> String {
    match n {
        0 => "no images".to_string(),
        1 => "1 image".to_string(),
        n => format!("{n} images"),
    }
}

/// Last path segment of a site-relative path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn describe_stop(stop: &StopReason) -> String {
    match stop {
        StopReason::TargetReached => "target count reached".to_string(),
        StopReason::MissLimit { at } => format!("miss limit reached at index {at}"),
        StopReason::Exhausted => "max index reached".to_string(),
    }
}

// ============================================================================
// Discover
// ============================================================================

pub fn format_discovery_output(label: &str, images: &[String]) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", label, count(images.len()))];
    for (i, path) in images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), file_name(path)));
        lines.push(format!("{}Source: {}", indent(1), path));
    }
    lines
}

pub fn print_discovery_output(label: &str, images: &[String]) {
    for line in format_discovery_output(label, images) {
        println!("{}", line);
    }
}

/// Format one progress event. Individual probes are left to debug logging.
pub fn format_discovery_event(event: &DiscoveryEvent) -> Vec<String> {
    match event {
        DiscoveryEvent::Probed { .. } => Vec::new(),
        DiscoveryEvent::Found { index, path } => {
            vec![format!("{}found {} (index {})", indent(1), path, index)]
        }
        DiscoveryEvent::Narrowed {
            template,
            extension,
        } => vec![format!(
            "{}narrowed to {}.{}",
            indent(1),
            template,
            extension
        )],
        DiscoveryEvent::Stopped(stop) => {
            vec![format!("{}stopped: {}", indent(1), describe_stop(stop))]
        }
    }
}

pub fn print_discovery_event(event: &DiscoveryEvent) {
    for line in format_discovery_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Galleries
// ============================================================================

pub fn format_galleries_output(galleries: &[ResolvedGallery], base: &str) -> Vec<String> {
    let mut lines = vec!["Galleries".to_string()];
    if galleries.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
        return lines;
    }
    for (i, gallery) in galleries.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            gallery.spec.display_title(),
            count(gallery.images.len())
        ));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            gallery.spec.base(base)
        ));
        if let Some(desc) = &gallery.spec.description {
            let first_line = desc.lines().next().unwrap_or_default();
            lines.push(format!(
                "{}Description: {}",
                indent(1),
                truncate_desc(first_line, 60)
            ));
        }
        for (j, path) in gallery.images.iter().enumerate() {
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_index(j + 1),
                file_name(path)
            ));
        }
    }
    lines
}

pub fn print_galleries_output(galleries: &[ResolvedGallery], base: &str) {
    for line in format_galleries_output(galleries, base) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_generate_output(summary: &GenerateSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.banner_images > 0 {
        lines.push(format!(
            "Banner ({}) → impressions.html",
            count(summary.banner_images)
        ));
    } else {
        lines.push("Banner (no images) → skipped".to_string());
    }
    for (i, (id, n)) in summary.galleries.iter().enumerate() {
        let page = summary
            .files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .find(|f| f.starts_with("galleries/") && f.ends_with(&format!("{id}.html")))
            .unwrap_or_else(|| format!("galleries/{id}.html"));
        lines.push(format!(
            "{} {} ({}) → {}",
            format_index(i + 1),
            id,
            count(*n),
            page
        ));
    }
    if !summary.galleries.is_empty() {
        lines.push("Gallery links → gallery-links.html".to_string());
    }
    lines.push("Styles → impressions.css".to_string());

    lines.push(String::new());
    let pages = summary.galleries.len();
    lines.push(format!(
        "Generated banner with {}, {} gallery {} in {}",
        count(summary.banner_images),
        pages,
        if pages == 1 { "page" } else { "pages" },
        summary.output_dir.display()
    ));
    lines
}

pub fn print_generate_output(summary: &GenerateSummary) {
    for line in format_generate_output(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_audit_output(report: &AuditReport, base: &str) -> Vec<String> {
    let mut lines = vec![format!("Reachable ({})", count(report.reachable.len()))];
    if report.is_clean() {
        lines.push(format!(
            "{}every image in {} is discovered",
            indent(1),
            site::normalize_base(base)
        ));
        return lines;
    }
    if !report.unreached.is_empty() {
        lines.push("Unreached".to_string());
        for (i, asset) in report.unreached.iter().enumerate() {
            match asset.index() {
                Some(index) => lines.push(format!(
                    "{} {} (index {})",
                    format_index(i + 1),
                    asset.name,
                    index
                )),
                None => lines.push(format!("{} {}", format_index(i + 1), asset.name)),
            }
        }
    }
    if !report.unrecognized.is_empty() {
        lines.push("Unrecognized".to_string());
        for (i, name) in report.unrecognized.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), name));
        }
    }
    lines
}

pub fn print_audit_output(report: &AuditReport, base: &str) {
    for line in format_audit_output(report, base) {
        println!("{}", line);
    }
}
