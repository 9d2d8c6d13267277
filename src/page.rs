//! Page glue around the banner: header state on scroll, card reveal, the
//! lazy-start gate for discovery and the footer year.
//!
//! Everything here is a small state machine fed by explicit calls, in the
//! same way as [`crate::banner`].

use crate::config::PageConfig;
use chrono::{Datelike, Local, TimeZone};
use std::collections::BTreeSet;

/// Element ids and selectors the generated markup and the page agree on.
pub mod ids {
    pub const TRACK: &str = "impressions-track";
    pub const YEAR: &str = "year";
    pub const LIGHTBOX: &str = "lightbox";
    pub const GALLERY_GRID: &str = "gallery-grid";
    pub const GALLERY_TITLE: &str = "gallery-title";
    pub const GALLERY_DESCRIPTION: &str = "gallery-description";
    pub const GALLERY_LINKS: &str = "gallery-links";
    pub const HEADER_TAG: &str = "header";
    pub const CARD_CLASS: &str = "card";
    pub const SCROLLED_CLASS: &str = "scrolled";
    pub const REVEAL_CLASS: &str = "reveal";
}

/// Change to apply to the header's `scrolled` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassChange {
    Add,
    Remove,
    Unchanged,
}

/// Header `scrolled` class, updated at most once per animation frame.
#[derive(Debug, Clone)]
pub struct HeaderState {
    threshold: f64,
    ticking: bool,
    scrolled: bool,
}

impl HeaderState {
    /// Starts with one frame requested, for pages that open already scrolled.
    pub fn new(threshold: f64) -> Self {
        let mut state = Self {
            threshold,
            ticking: false,
            scrolled: false,
        };
        state.on_scroll();
        state
    }

    pub fn from_config(config: &PageConfig) -> Self {
        Self::new(config.header_scroll_threshold)
    }

    /// Returns `true` when a frame must be requested.
    pub fn on_scroll(&mut self) -> bool {
        if self.ticking {
            return false;
        }
        self.ticking = true;
        true
    }

    pub fn on_frame(&mut self, scroll_y: f64) -> ClassChange {
        if !self.ticking {
            return ClassChange::Unchanged;
        }
        self.ticking = false;
        let scrolled = scroll_y > self.threshold;
        if scrolled == self.scrolled {
            return ClassChange::Unchanged;
        }
        self.scrolled = scrolled;
        if scrolled {
            ClassChange::Add
        } else {
            ClassChange::Remove
        }
    }

    pub fn is_scrolled(&self) -> bool {
        self.scrolled
    }

    pub fn frame_pending(&self) -> bool {
        self.ticking
    }
}

/// Reveals each card once, the first time enough of it is visible.
#[derive(Debug, Clone)]
pub struct RevealTracker {
    threshold: f64,
    observed: BTreeSet<usize>,
}

impl RevealTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            observed: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &PageConfig) -> Self {
        Self::new(config.reveal_threshold)
    }

    /// Observe cards `0..count`.
    pub fn observe(&mut self, count: usize) {
        self.observed.extend(0..count);
    }

    /// Returns `true` if `card` must be revealed now. A revealed card is no
    /// longer observed.
    pub fn on_intersection(&mut self, card: usize, ratio: f64) -> bool {
        if ratio < self.threshold || ratio <= 0.0 {
            return false;
        }
        self.observed.remove(&card)
    }

    pub fn is_observing(&self, card: usize) -> bool {
        self.observed.contains(&card)
    }

    pub fn pending(&self) -> usize {
        self.observed.len()
    }
}

/// Opens once the banner comes within `margin` pixels of the viewport.
#[derive(Debug, Clone)]
pub struct LazyGate {
    margin: f64,
    open: bool,
}

impl LazyGate {
    pub fn new(margin: f64) -> Self {
        Self {
            margin,
            open: false,
        }
    }

    pub fn from_config(config: &PageConfig) -> Self {
        Self::new(config.lazy_margin)
    }

    /// `top` is the banner's top edge relative to the viewport.
    pub fn check(&mut self, top: f64, viewport_height: f64) -> bool {
        if !self.open && top - viewport_height <= self.margin {
            self.open = true;
        }
        self.open
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

pub fn footer_year<Tz: TimeZone>(now: &chrono::DateTime<Tz>) -> i32 {
    now.year()
}

pub fn current_year() -> i32 {
    footer_year(&Local::now())
}
