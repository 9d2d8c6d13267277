//! # Impressions
//!
//! Finds the images of a static site by probing for them, remembers what it
//! found, and produces the markup for a looping image banner and optional
//! gallery pages.
//!
//! A site does not list its banner images anywhere. They live under a base
//! directory with predictable names (`impression-1.webp`, `2.jpg`, ...) and
//! are found by asking "does this exist?" for increasing indices until the
//! sequence clearly ended.
//!
//! # Pipeline
//!
//! ```text
//! 1. Probe      candidate path  →  exists?            (HEAD, or load + decode)
//! 2. Discover   base directory  →  ordered image list (stop rules, narrowing)
//! 3. Memo       image list      →  memo.json          (expiring, versioned keys)
//! 4. Generate   image lists     →  dist/              (banner, gallery pages)
//! ```
//!
//! The interactive half of the page (banner auto-advance, drag, wheel,
//! click-to-enlarge, header state, card reveal) is modelled by owned state
//! machines in [`banner`] and [`page`], driven by explicit event calls.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, stock defaults, merging, validation, CSS variables |
//! | [`pattern`] | Filename templates (`impression-{i}`), candidate generation, manifest patterns |
//! | [`site`] | Site root: local directory or HTTP(S) origin, path normalization |
//! | [`probe`] | Existence probing with a per-session strategy (HEAD or load) |
//! | [`discover`] | Sequential and batched discovery with stop rules and narrowing |
//! | [`memo`] | Expiring, versioned memo over a key/value store |
//! | [`manifest`] | Optional gallery manifest |
//! | [`session`] | "Memo or discover" for the banner and every gallery |
//! | [`banner`] | Banner interaction state, lightbox, new-context opener |
//! | [`page`] | Header scroll state, card reveal, lazy-start gate, DOM ids |
//! | [`generate`] | HTML output with Maud |
//! | [`scan`] | Local asset audit: files discovery does not reach |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `simplelog` setup |
//!
//! # Design Decisions
//!
//! ## Probing Never Fails
//!
//! A missing image is the normal way for discovery to end, so a probe
//! returns `bool`, never `Result`. Network errors, timeouts, 404s and bodies
//! that do not decode as images are all misses.
//!
//! ## No Early Stop Before the First Hit
//!
//! The consecutive-miss limit only applies once something was found. A set
//! that starts at index 12 is still found; the price is that an empty
//! directory is walked all the way to `max_index`. The memo stores empty
//! results with a short lifetime so that walk is not repeated on every run.
//!
//! ## Single-Threaded Runtime
//!
//! Probes are futures on a current-thread tokio runtime. The batch variant
//! keeps several probes in flight and joins them; results are still read in
//! index order, so completion order never changes the outcome.
//!
//! ## Versioned Memo Keys
//!
//! Memo keys end in `:v<N>`. Changing the stored shape bumps `N`, and old
//! entries are simply never read again.

pub mod banner;
pub mod config;
pub mod discover;
pub mod generate;
pub mod logging;
pub mod manifest;
pub mod memo;
pub mod output;
pub mod page;
pub mod pattern;
pub mod probe;
pub mod scan;
pub mod session;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;
