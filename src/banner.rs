//! Banner interaction model.
//!
//! The banner is a horizontally looping strip built from a discovery result.
//! The list is mounted twice in a row so the strip can wrap seamlessly: once
//! the scroll offset reaches the end of the first copy (the *midpoint* of the
//! track) it jumps back by exactly one copy's width, which looks identical.
//!
//! This module holds the state behind that strip. Page events become method
//! calls:
//!
//! | Event | Call |
//! |---|---|
//! | animation frame | [`Banner::frame`] |
//! | pointer down / move / up | [`Banner::pointer_down`], [`Banner::pointer_move`], [`Banner::pointer_up`] |
//! | pointer cancel / leave | [`Banner::pointer_cancel`], [`Banner::pointer_leave`] |
//! | wheel | [`Banner::wheel`] |
//! | layout | [`Banner::set_track_width`] |
//!
//! Times are offsets from page start, so tests drive the clock directly.
//!
//! ## Gestures
//!
//! A pointer-down to pointer-up sequence is a **drag** when the pointer ever
//! moved at least `drag_threshold` pixels from where it started, and a
//! **click** otherwise. Only clicks on an image enlarge it.
//!
//! ## Enlarging
//!
//! The enlarge target is owned by the banner, not shared page state. It is
//! either an in-page [`Lightbox`] or an [`Opener`] that creates a new browsing
//! context. A blocked popup falls back to navigating the current context.

use crate::config::{BannerConfig, EnlargeMode};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BannerSettings {
    /// Pixels per animation frame.
    pub speed: f64,
    pub drag_threshold: f64,
    pub resume_delay: Duration,
}

impl BannerSettings {
    pub fn from_config(config: &BannerConfig) -> Self {
        Self {
            speed: config.speed,
            drag_threshold: config.drag_threshold,
            resume_delay: Duration::from_millis(config.resume_delay_ms),
        }
    }
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self::from_config(&BannerConfig::default())
    }
}

// ============================================================================
// Enlarge targets
// ============================================================================

/// Keys the lightbox reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// In-page overlay showing one image.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Lightbox {
    current: Option<String>,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, url: &str) {
        self.current = Some(url.to_string());
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Returns whether the key was handled.
    pub fn key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape if self.is_open() => {
                self.close();
                true
            }
            _ => false,
        }
    }

    /// A click on the backdrop outside the image.
    pub fn backdrop_click(&mut self) {
        self.close();
    }
}

/// Handle to a browsing context created by an [`Opener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextHandle(pub u64);

/// Creates browsing contexts.
pub trait Opener {
    /// Open `url` in a new context. `None` means the request was blocked.
    fn open(&mut self, url: &str) -> Option<ContextHandle>;
    /// Load `url` in the current context.
    fn navigate(&mut self, url: &str);
}

pub enum EnlargeTarget {
    Overlay(Lightbox),
    NewContext(Box<dyn Opener>),
}

impl EnlargeTarget {
    /// Overlay mode gets a fresh lightbox; new-context mode needs an opener.
    pub fn for_mode(mode: EnlargeMode, opener: impl FnOnce() -> Box<dyn Opener>) -> Self {
        match mode {
            EnlargeMode::Overlay => EnlargeTarget::Overlay(Lightbox::new()),
            EnlargeMode::NewContext => EnlargeTarget::NewContext(opener()),
        }
    }
}

/// What a click ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enlarged {
    Overlay(String),
    NewContext { url: String, handle: ContextHandle },
    /// The new context was blocked; the current one navigated instead.
    Navigated(String),
}

// ============================================================================
// Banner
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BannerState {
    pub auto_scroll: bool,
    pub offset: f64,
    pub dragging: bool,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    start_x: f64,
    start_offset: f64,
    max_displacement: f64,
}

pub struct Banner {
    images: Vec<String>,
    settings: BannerSettings,
    enlarge: EnlargeTarget,
    track_width: f64,
    offset: f64,
    auto_scroll: bool,
    resume_at: Option<Duration>,
    gesture: Option<Gesture>,
}

impl Banner {
    /// Mount a banner. Nothing is mounted for an empty list.
    pub fn mount(
        images: Vec<String>,
        settings: BannerSettings,
        enlarge: EnlargeTarget,
    ) -> Option<Self> {
        if images.is_empty() {
            return None;
        }
        Some(Self {
            images,
            settings,
            enlarge,
            track_width: 0.0,
            offset: 0.0,
            auto_scroll: true,
            resume_at: None,
            gesture: None,
        })
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// The mounted sequence: the list, then the list again.
    pub fn track(&self) -> Vec<&str> {
        self.images
            .iter()
            .chain(self.images.iter())
            .map(String::as_str)
            .collect()
    }

    /// Measured width of the whole (doubled) track.
    pub fn set_track_width(&mut self, width: f64) {
        self.track_width = width.max(0.0);
        self.offset = self.wrap(self.offset);
    }

    pub fn midpoint(&self) -> f64 {
        self.track_width / 2.0
    }

    pub fn state(&self) -> BannerState {
        BannerState {
            auto_scroll: self.auto_scroll,
            offset: self.offset,
            dragging: self.gesture.is_some(),
        }
    }

    pub fn lightbox(&self) -> Option<&Lightbox> {
        match &self.enlarge {
            EnlargeTarget::Overlay(lightbox) => Some(lightbox),
            EnlargeTarget::NewContext(_) => None,
        }
    }

    pub fn lightbox_mut(&mut self) -> Option<&mut Lightbox> {
        match &mut self.enlarge {
            EnlargeTarget::Overlay(lightbox) => Some(lightbox),
            EnlargeTarget::NewContext(_) => None,
        }
    }

    /// Keep an offset within `[0, midpoint)`. No wrapping before layout.
    fn wrap(&self, offset: f64) -> f64 {
        let mid = self.midpoint();
        if mid <= 0.0 {
            return offset;
        }
        offset.rem_euclid(mid)
    }

    fn schedule_resume(&mut self, now: Duration) {
        self.resume_at = Some(now + self.settings.resume_delay);
    }

    pub fn frame(&mut self, now: Duration) {
        if self.gesture.is_none() && self.resume_at.is_some_and(|at| now >= at) {
            self.auto_scroll = true;
            self.resume_at = None;
        }
        if self.auto_scroll && self.gesture.is_none() {
            self.offset = self.wrap(self.offset + self.settings.speed);
        }
    }

    pub fn pointer_down(&mut self, x: f64) {
        self.auto_scroll = false;
        self.resume_at = None;
        self.gesture = Some(Gesture {
            start_x: x,
            start_offset: self.offset,
            max_displacement: 0.0,
        });
    }

    pub fn pointer_move(&mut self, x: f64) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let delta = x - gesture.start_x;
        gesture.max_displacement = gesture.max_displacement.max(delta.abs());
        let target = gesture.start_offset - delta;
        self.offset = self.wrap(target);
    }

    /// End a gesture. `target` is the track position of the image under the
    /// pointer, if any.
    pub fn pointer_up(
        &mut self,
        x: f64,
        now: Duration,
        target: Option<usize>,
    ) -> Option<Enlarged> {
        self.pointer_move(x);
        let gesture = self.gesture.take()?;
        self.schedule_resume(now);
        if gesture.max_displacement >= self.settings.drag_threshold {
            return None;
        }
        let url = self.images[target? % self.images.len()].clone();
        Some(self.enlarge(url))
    }

    pub fn pointer_cancel(&mut self, now: Duration) {
        if self.gesture.take().is_some() {
            self.schedule_resume(now);
        }
    }

    pub fn pointer_leave(&mut self, now: Duration) {
        self.pointer_cancel(now);
    }

    pub fn wheel(&mut self, delta: f64, now: Duration) {
        self.auto_scroll = false;
        self.offset = self.wrap(self.offset + delta);
        if self.gesture.is_none() {
            self.schedule_resume(now);
        }
    }

    fn enlarge(&mut self, url: String) -> Enlarged {
        match &mut self.enlarge {
            EnlargeTarget::Overlay(lightbox) => {
                lightbox.show(&url);
                Enlarged::Overlay(url)
            }
            EnlargeTarget::NewContext(opener) => match opener.open(&url) {
                Some(handle) => Enlarged::NewContext { url, handle },
                None => {
                    opener.navigate(&url);
                    Enlarged::Navigated(url)
                }
            },
        }
    }
}
