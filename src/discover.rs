//! Sequential image discovery.
//!
//! Turns a base directory into an ordered list of confirmed image paths by
//! probing candidate filenames for increasing indices.
//!
//! ## Walk
//!
//! ```text
//! for i in start..=max_index:
//!     for candidate in candidates(i):      # extension-major
//!         if exists(candidate): record, reset misses, next i
//!     misses += 1
//! ```
//!
//! The walk stops when:
//!
//! - **TargetReached**: `target_count` images were found;
//! - **Exhausted**: `max_index` was passed;
//! - **MissLimit**: `miss_limit` consecutive indices missed *after* at least
//!   one hit. A miss run before the first hit never stops the walk; a set
//!   that starts at index 12 is still found, and an empty directory is
//!   walked all the way to `max_index`.
//!
//! ## Narrowing
//!
//! A uniformly named set (`impression-1.webp`, `impression-2.webp`, ...)
//! would otherwise cost `templates × extensions` probes per index. With
//! `narrow` on, the template/extension of the first hit becomes the only
//! candidate for every following index.
//!
//! ## Batch variant
//!
//! [`discover_batch`] keeps `batch_size` indices in flight and joins them.
//! Completion order does not matter: results are read back in index order
//! and the same stop rules are applied, so both variants agree on uniformly
//! named sets.

use crate::config::DiscoveryConfig;
use crate::pattern::{self, Candidate, Combo, PatternError, Template};
use crate::probe::Prober;
use crate::site;
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::mpsc::Sender;

/// Parameters of one discovery walk.
#[derive(Debug, Clone)]
pub struct DiscoverPlan {
    pub templates: Vec<Template>,
    pub extensions: Vec<String>,
    pub start: u32,
    pub max_index: u32,
    pub miss_limit: u32,
    pub target_count: usize,
    pub narrow: bool,
}

impl DiscoverPlan {
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, PatternError> {
        Ok(Self {
            templates: pattern::parse_templates(&config.templates)?,
            extensions: config.extensions.clone(),
            start: config.start,
            max_index: config.max_index,
            miss_limit: config.miss_limit,
            target_count: config.target_count,
            narrow: config.narrow,
        })
    }

    /// Same limits, different naming scheme (used for galleries with a
    /// manifest `pattern`).
    pub fn with_naming(&self, templates: Vec<Template>, extensions: Vec<String>) -> Self {
        Self {
            templates,
            extensions,
            ..self.clone()
        }
    }

    /// Same window length, moved to begin at `start`.
    pub fn starting_at(mut self, start: u32) -> Self {
        let span = self.max_index.saturating_sub(self.start);
        self.start = start;
        self.max_index = start.saturating_add(span);
        self
    }

    fn candidates(&self, i: u32, narrowed: Option<Combo>) -> Vec<Candidate> {
        match narrowed {
            Some(combo) => vec![Candidate {
                filename: pattern::filename(
                    &self.templates[combo.template],
                    &self.extensions[combo.extension],
                    i,
                ),
                combo,
            }],
            None => pattern::candidates(&self.templates, &self.extensions, i),
        }
    }
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    MissLimit { at: u32 },
    Exhausted,
}

/// Progress of a walk, for CLI display.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    Probed { path: String, hit: bool },
    Found { index: u32, path: String },
    Narrowed { template: String, extension: String },
    Stopped(StopReason),
}

/// Result of a walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    /// Confirmed paths in ascending index order, without duplicates.
    pub images: Vec<String>,
    pub stop: StopReason,
    pub probes: u32,
}

/// Shared bookkeeping for both variants.
struct Walk<'a> {
    plan: &'a DiscoverPlan,
    progress: Option<&'a Sender<DiscoveryEvent>>,
    images: Vec<String>,
    seen: HashSet<String>,
    misses: u32,
    narrowed: Option<Combo>,
    probes: u32,
}

impl<'a> Walk<'a> {
    fn new(plan: &'a DiscoverPlan, progress: Option<&'a Sender<DiscoveryEvent>>) -> Self {
        Self {
            plan,
            progress,
            images: Vec::new(),
            seen: HashSet::new(),
            misses: 0,
            narrowed: None,
            probes: 0,
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Some(tx) = self.progress {
            let _ = tx.send(event);
        }
    }

    fn probed(&mut self, path: &str, hit: bool) {
        self.probes += 1;
        self.emit(DiscoveryEvent::Probed {
            path: path.to_string(),
            hit,
        });
    }

    /// Record the outcome of index `i`. Returns the stop reason if the walk
    /// must end here.
    fn settle(&mut self, i: u32, hit: Option<(String, Combo)>) -> Option<StopReason> {
        match hit {
            Some((path, combo)) if self.seen.insert(path.clone()) => {
                self.misses = 0;
                self.emit(DiscoveryEvent::Found {
                    index: i,
                    path: path.clone(),
                });
                self.images.push(path);
                if self.plan.narrow && self.narrowed.is_none() {
                    self.narrowed = Some(combo);
                    self.emit(DiscoveryEvent::Narrowed {
                        template: self.plan.templates[combo.template].to_string(),
                        extension: self.plan.extensions[combo.extension].clone(),
                    });
                }
                if self.images.len() >= self.plan.target_count {
                    return Some(StopReason::TargetReached);
                }
            }
            _ => {
                self.misses += 1;
                if !self.images.is_empty() && self.misses >= self.plan.miss_limit {
                    return Some(StopReason::MissLimit { at: i });
                }
            }
        }
        None
    }

    fn finish(self, stop: StopReason) -> Discovery {
        self.emit(DiscoveryEvent::Stopped(stop));
        log::info!(
            "discovered {} image(s) with {} probe(s), stopped: {:?}",
            self.images.len(),
            self.probes,
            stop
        );
        Discovery {
            images: self.images,
            stop,
            probes: self.probes,
        }
    }
}

/// Walk indices one probe at a time.
pub async fn discover(
    prober: &dyn Prober,
    base: &str,
    plan: &DiscoverPlan,
    progress: Option<&Sender<DiscoveryEvent>>,
) -> Discovery {
    let base = site::normalize_base(base);
    let mut walk = Walk::new(plan, progress);
    if plan.target_count == 0 {
        return walk.finish(StopReason::TargetReached);
    }

    for i in plan.start..=plan.max_index {
        let mut hit = None;
        for candidate in plan.candidates(i, walk.narrowed) {
            let path = format!("{base}{}", candidate.filename);
            let found = prober.exists(&path).await;
            walk.probed(&path, found);
            if found {
                hit = Some((path, candidate.combo));
                break;
            }
        }
        if let Some(stop) = walk.settle(i, hit) {
            return walk.finish(stop);
        }
    }
    walk.finish(StopReason::Exhausted)
}

/// First existing candidate for one index, probing candidates in order.
async fn first_existing(
    prober: &dyn Prober,
    base: &str,
    candidates: Vec<Candidate>,
) -> (Vec<(String, bool)>, Option<(String, Combo)>) {
    let mut probed = Vec::new();
    for candidate in candidates {
        let path = format!("{base}{}", candidate.filename);
        let found = prober.exists(&path).await;
        probed.push((path.clone(), found));
        if found {
            return (probed, Some((path, candidate.combo)));
        }
    }
    (probed, None)
}

/// Walk indices `batch_size` at a time, joining each batch.
///
/// Every probe a batch issued is counted, including those past the index
/// where the walk stops. A `batch_size` of 0 or 1 degrades to [`discover`].
pub async fn discover_batch(
    prober: &dyn Prober,
    base: &str,
    plan: &DiscoverPlan,
    batch_size: usize,
    progress: Option<&Sender<DiscoveryEvent>>,
) -> Discovery {
    if batch_size <= 1 {
        return discover(prober, base, plan, progress).await;
    }
    let base = site::normalize_base(base);
    let mut walk = Walk::new(plan, progress);
    if plan.target_count == 0 {
        return walk.finish(StopReason::TargetReached);
    }

    let span = u32::try_from(batch_size - 1).unwrap_or(u32::MAX);
    let mut next = plan.start;
    while next <= plan.max_index {
        let last = next.saturating_add(span).min(plan.max_index);
        let narrowed = walk.narrowed;
        let base_ref = base.as_str();
        let batch = join_all(
            (next..=last).map(|i| first_existing(prober, base_ref, plan.candidates(i, narrowed))),
        )
        .await;

        for (path, found) in batch.iter().flat_map(|(probed, _)| probed) {
            walk.probed(path, *found);
        }
        for (i, (_, hit)) in (next..=last).zip(batch) {
            // Hits that disagree with a combo narrowed earlier in this batch
            // would not have been probed by the sequential walk.
            let hit = hit.filter(|(_, combo)| walk.narrowed.is_none_or(|n| n == *combo));
            if let Some(stop) = walk.settle(i, hit) {
                return walk.finish(stop);
            }
        }
        match last.checked_add(1) {
            Some(n) => next = n,
            None => break,
        }
    }
    walk.finish(StopReason::Exhausted)
}
