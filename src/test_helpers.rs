//! Shared test utilities.
//!
//! Provides an in-memory prober that records every probe, an advanceable
//! clock for memo expiry, and a tiny valid image for decode checks.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let prober = FakeProber::with_paths(&["img/impression-1.webp"]);
//! let clock = ManualClock::at(1_000);
//! clock.advance_ms(500);
//! ```

use crate::memo::Clock;
use crate::probe::Prober;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =========================================================================
// FakeProber
// =========================================================================

/// Prober backed by a fixed set of existing paths.
#[derive(Default)]
pub struct FakeProber {
    existing: HashSet<String>,
    delays: HashMap<String, Duration>,
    probes: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn with_paths(paths: &[&str]) -> Self {
        Self {
            existing: paths.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    /// `base` + `impression-{i}.{ext}` for every index in `range`.
    pub fn contiguous(base: &str, ext: &str, range: std::ops::RangeInclusive<u32>) -> Self {
        let paths: Vec<String> = range
            .map(|i| format!("{base}impression-{i}.{ext}"))
            .collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        Self::with_paths(&refs)
    }

    /// Delay the answer for one path, to force out-of-order completion.
    pub fn delay(mut self, path: &str, by: Duration) -> Self {
        self.delays.insert(path.to_string(), by);
        self
    }

    /// Every probed path, in probe order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Prober for FakeProber {
    async fn exists(&self, path: &str) -> bool {
        self.probes.lock().unwrap().push(path.to_string());
        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.existing.contains(path)
    }
}

// =========================================================================
// ManualClock
// =========================================================================

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.advance_ms(by.as_millis() as i64);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// =========================================================================
// Fixtures
// =========================================================================

/// A 2×2 PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::new(2, 2);
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
