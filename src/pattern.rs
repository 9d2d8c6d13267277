//! Candidate filename generation.
//!
//! Real deployments name their images inconsistently: `impression-3.webp`
//! next to `4.jpg`, zero-padded `img-007.png`, and so on. A [`Template`] is a
//! filename stem with an index placeholder; discovery tries the bounded
//! product of templates × extensions for every index.
//!
//! ## Placeholders
//!
//! - `{i}` → the index as-is: `impression-{i}` → `impression-7`
//! - `{i:N}` → zero-padded to N digits: `img-{i:03}` → `img-007`
//!
//! ## Candidate order
//!
//! Extension-major: for each extension, every template is tried before
//! moving to the next extension. With the default templates this yields
//! `impression-1.jpg`, `1.jpg`, `impression-1.jpeg`, `1.jpeg`, ...

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PatternError {
    #[error("template {0:?} has no {{i}} placeholder")]
    NoPlaceholder(String),
    #[error("template {0:?} has an invalid padding width")]
    BadPadding(String),
    #[error("pattern {0:?} has no file extension")]
    NoExtension(String),
}

/// A filename stem with a single index placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    prefix: String,
    suffix: String,
    /// Zero-pad width; 0 means no padding.
    width: usize,
}

impl Template {
    /// Parse a template such as `impression-{i}` or `img-{i:03}`.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let start = source
            .find("{i")
            .ok_or_else(|| PatternError::NoPlaceholder(source.to_string()))?;
        let rest = &source[start + 2..];
        let close = rest
            .find('}')
            .ok_or_else(|| PatternError::NoPlaceholder(source.to_string()))?;
        let spec = &rest[..close];
        let width = match spec.strip_prefix(':') {
            Some(digits) => digits
                .parse::<usize>()
                .map_err(|_| PatternError::BadPadding(source.to_string()))?,
            None if spec.is_empty() => 0,
            None => return Err(PatternError::NoPlaceholder(source.to_string())),
        };
        Ok(Self {
            prefix: source[..start].to_string(),
            suffix: rest[close + 1..].to_string(),
            width,
        })
    }

    /// Render the stem for index `i`.
    pub fn render(&self, i: u32) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            i,
            self.suffix,
            width = self.width
        )
    }

    /// Inverse of [`render`](Self::render): the index encoded in `stem`, if
    /// the stem was produced by this template.
    pub fn match_stem(&self, stem: &str) -> Option<u32> {
        let digits = stem
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if self.width == 0 && digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        if self.width > 0 && digits.len() < self.width {
            return None;
        }
        let i: u32 = digits.parse().ok()?;
        (self.render(i) == stem).then_some(i)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.width == 0 {
            write!(f, "{}{{i}}{}", self.prefix, self.suffix)
        } else {
            write!(f, "{}{{i:0{}}}{}", self.prefix, self.width, self.suffix)
        }
    }
}

/// Parse a list of template strings, failing on the first invalid one.
pub fn parse_templates<S: AsRef<str>>(sources: &[S]) -> Result<Vec<Template>, PatternError> {
    sources.iter().map(|s| Template::parse(s.as_ref())).collect()
}

/// A template/extension pair, by position in the plan's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    pub template: usize,
    pub extension: usize,
}

/// One candidate filename for an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub filename: String,
    pub combo: Combo,
}

/// Filename for a single template/extension pair.
pub fn filename(template: &Template, extension: &str, i: u32) -> String {
    format!("{}.{}", template.render(i), extension)
}

/// All candidate filenames for index `i`, extension-major.
pub fn candidates<E: AsRef<str>>(templates: &[Template], extensions: &[E], i: u32) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(templates.len() * extensions.len());
    for (e, ext) in extensions.iter().enumerate() {
        for (t, template) in templates.iter().enumerate() {
            out.push(Candidate {
                filename: filename(template, ext.as_ref(), i),
                combo: Combo {
                    template: t,
                    extension: e,
                },
            });
        }
    }
    out
}

/// A manifest filename pattern: template plus a fixed extension, e.g.
/// `photo-{i}.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPattern {
    pub template: Template,
    pub extension: String,
}

impl GalleryPattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let (stem, ext) = source
            .rsplit_once('.')
            .filter(|(_, ext)| !ext.is_empty() && !ext.contains('}'))
            .ok_or_else(|| PatternError::NoExtension(source.to_string()))?;
        Ok(Self {
            template: Template::parse(stem)?,
            extension: ext.to_string(),
        })
    }

    pub fn filename(&self, i: u32) -> String {
        filename(&self.template, &self.extension, i)
    }
}
