//! Time-bounded memo of discovery results.
//!
//! Discovery costs up to `max_index × templates × extensions` requests. The
//! memo stores each result under a key derived from the base path so the
//! next run (or the next page view) can skip probing entirely.
//!
//! # Design
//!
//! ## Storage
//!
//! Entries go through the [`MemoStore`] trait: a plain string key/value
//! store, the same shape as browser local storage. [`FileStore`] persists
//! the map as JSON at `<cache-dir>/memo.json`; [`MemoryStore`] lives only
//! for the session (used by `--no-cache` and tests).
//!
//! ## Entry shape
//!
//! ```json
//! { "expiresAt": 1718000000000, "value": ["assets/img/impressions/impression-1.webp"] }
//! ```
//!
//! `expiresAt` is absolute (epoch milliseconds, `now + ttl` at write time).
//! A read after that instant sees nothing. A value that does not parse into
//! the expected shape (older format, foreign data under the same key, a
//! hand-edited file) is also treated as absent; it never reaches the caller
//! as an error.
//!
//! ## Keys
//!
//! `impressions:<hash>:v<MEMO_VERSION>`, where `<hash>` is the first 16 hex
//! characters of SHA-256 over the normalized base path (plus the gallery id
//! for gallery lookups). Bumping [`MEMO_VERSION`] orphans every existing
//! entry, so a format change can never be misread.
//!
//! ## Lifetimes
//!
//! Non-empty results live for a long time (a week by default). Empty
//! results live for minutes, so a deployment whose images were missing at
//! first heals quickly once they appear.

use crate::config::MemoConfig;
use crate::site::normalize_base;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the memo file within the cache directory.
const STORE_FILENAME: &str = "memo.json";

/// Version suffix of every memo key.
pub const MEMO_VERSION: u32 = 2;

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// String key/value storage.
pub trait MemoStore: Send {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: String);
}

/// Session-only store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// JSON-file store in a cache directory. Every write is flushed to disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store in `cache_dir`. A missing or unreadable file yields an
    /// empty store.
    pub fn open(cache_dir: &Path) -> Self {
        let path = cache_dir.join(STORE_FILENAME);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                log::warn!("ignoring corrupt memo file {}: {err}", path.display());
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)
    }
}

impl MemoStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        if let Err(err) = self.save() {
            log::warn!("could not persist memo to {}: {err}", self.path.display());
        }
    }
}

/// Resolve the memo file path for a cache directory.
pub fn store_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(STORE_FILENAME)
}

/// Stored entry: absolute expiry plus the memoized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoEntry<T> {
    pub expires_at: i64,
    pub value: T,
}

/// Outcome of a memo read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fresh(T),
    /// An entry exists but is past its expiry.
    Expired,
    /// No entry, or one that does not parse.
    Absent,
}

/// Memo key for a base path, optionally scoped to one gallery.
pub fn memo_key(base: &str, gallery: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_base(base).as_bytes());
    if let Some(id) = gallery {
        hasher.update(b"\0");
        hasher.update(id.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("impressions:{}:v{}", &digest[..16], MEMO_VERSION)
}

/// Entry lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoPolicy {
    pub ttl: Duration,
    pub empty_ttl: Duration,
}

impl MemoPolicy {
    pub fn from_config(config: &MemoConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_hours.saturating_mul(3600)),
            empty_ttl: Duration::from_secs(config.empty_ttl_minutes.saturating_mul(60)),
        }
    }

    /// Lifetime for a discovery result: short when nothing was found.
    pub fn ttl_for(&self, images: &[String]) -> Duration {
        if images.is_empty() {
            self.empty_ttl
        } else {
            self.ttl
        }
    }
}

impl Default for MemoPolicy {
    fn default() -> Self {
        Self::from_config(&MemoConfig::default())
    }
}

/// Typed, expiring view over a [`MemoStore`].
pub struct Memo {
    store: Box<dyn MemoStore>,
    clock: Box<dyn Clock>,
    policy: MemoPolicy,
}

impl Memo {
    pub fn new(store: Box<dyn MemoStore>, clock: Box<dyn Clock>, policy: MemoPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// A memo that forgets everything when the session ends.
    pub fn in_memory(policy: MemoPolicy) -> Self {
        Self::new(Box::new(MemoryStore::new()), Box::new(SystemClock), policy)
    }

    pub fn policy(&self) -> &MemoPolicy {
        &self.policy
    }

    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let Some(raw) = self.store.read(key) else {
            return Lookup::Absent;
        };
        let entry: MemoEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("memo entry {key} is malformed: {err}");
                return Lookup::Absent;
            }
        };
        if self.clock.now_ms() > entry.expires_at {
            Lookup::Expired
        } else {
            Lookup::Fresh(entry.value)
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.lookup(key) {
            Lookup::Fresh(value) => Some(value),
            Lookup::Expired | Lookup::Absent => None,
        }
    }

    /// Store `value` until `now + ttl`, replacing any previous entry.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T, ttl: Duration) {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = MemoEntry {
            expires_at: self.clock.now_ms().saturating_add(ttl_ms),
            value,
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.write(key, raw),
            Err(err) => log::warn!("could not encode memo entry {key}: {err}"),
        }
    }
}

/// Summary of memo performance for a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoStats {
    pub hits: u32,
    pub stale: u32,
    pub misses: u32,
}

impl MemoStats {
    pub fn record<T>(&mut self, lookup: &Lookup<T>) {
        match lookup {
            Lookup::Fresh(_) => self.hits += 1,
            Lookup::Expired => self.stale += 1,
            Lookup::Absent => self.misses += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.stale + self.misses
    }
}

impl fmt::Display for MemoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let discovered = self.stale + self.misses;
        if self.hits == 0 {
            write!(f, "{} discovered", discovered)
        } else if self.stale > 0 {
            write!(
                f,
                "{} cached, {} refreshed, {} discovered ({} total)",
                self.hits,
                self.stale,
                self.misses,
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} discovered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ManualClock;
    use std::fs;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn memo_with_clock(clock: &ManualClock) -> Memo {
        Memo::new(
            Box::new(MemoryStore::new()),
            Box::new(clock.clone()),
            MemoPolicy::default(),
        )
    }

    fn urls(n: u32) -> Vec<String> {
        (1..=n).map(|i| format!("img/impression-{i}.webp")).collect()
    }

    // =========================================================================
    // get / put
    // =========================================================================

    #[test]
    fn put_then_get_roundtrips() {
        let clock = ManualClock::at(1_000);
        let mut memo = memo_with_clock(&clock);
        memo.put("k", &urls(3), HOUR);
        assert_eq!(memo.get::<Vec<String>>("k"), Some(urls(3)));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let clock = ManualClock::at(1_000);
        let mut memo = memo_with_clock(&clock);
        memo.put("k", &urls(2), HOUR);

        clock.advance(HOUR);
        // Exactly at expiry the entry still counts
        assert_eq!(memo.get::<Vec<String>>("k"), Some(urls(2)));

        clock.advance_ms(1);
        assert_eq!(memo.get::<Vec<String>>("k"), None);
        assert_eq!(memo.lookup::<Vec<String>>("k"), Lookup::Expired);
    }

    #[test]
    fn stale_entry_is_overwritten() {
        let clock = ManualClock::at(0);
        let mut memo = memo_with_clock(&clock);
        memo.put("k", &urls(1), HOUR);
        clock.advance(HOUR * 2);
        assert_eq!(memo.lookup::<Vec<String>>("k"), Lookup::Expired);

        memo.put("k", &urls(4), HOUR);
        assert_eq!(memo.get::<Vec<String>>("k"), Some(urls(4)));
    }

    #[test]
    fn missing_key_is_absent() {
        let memo = memo_with_clock(&ManualClock::at(0));
        assert_eq!(memo.lookup::<Vec<String>>("nope"), Lookup::Absent);
    }

    #[test]
    fn malformed_entry_is_absent() {
        let mut store = MemoryStore::new();
        store.write("garbage", "not json".into());
        store.write("wrong-shape", r#"{"expires":1,"val":[]}"#.into());
        store.write("wrong-type", r#"{"expiresAt":99999999999999,"value":42}"#.into());
        let memo = Memo::new(
            Box::new(store),
            Box::new(ManualClock::at(0)),
            MemoPolicy::default(),
        );
        assert_eq!(memo.lookup::<Vec<String>>("garbage"), Lookup::Absent);
        assert_eq!(memo.lookup::<Vec<String>>("wrong-shape"), Lookup::Absent);
        assert_eq!(memo.lookup::<Vec<String>>("wrong-type"), Lookup::Absent);
    }

    #[test]
    fn entry_json_uses_expires_at_and_value() {
        let clock = ManualClock::at(5);
        let mut memo = Memo::new(
            Box::new(MemoryStore::new()),
            Box::new(clock),
            MemoPolicy::default(),
        );
        memo.put("k", &vec!["a.jpg".to_string()], Duration::from_millis(10));
        let raw = memo.store.read("k").unwrap();
        assert_eq!(raw, r#"{"expiresAt":15,"value":["a.jpg"]}"#);
    }

    // =========================================================================
    // Policy
    // =========================================================================

    #[test]
    fn empty_results_get_short_ttl() {
        let policy = MemoPolicy::default();
        assert_eq!(policy.ttl_for(&[]), Duration::from_secs(10 * 60));
        assert_eq!(policy.ttl_for(&urls(1)), Duration::from_secs(7 * 24 * 3600));
        assert!(policy.ttl_for(&[]) < policy.ttl_for(&urls(1)));
    }

    #[test]
    fn huge_ttl_saturates() {
        let policy = MemoPolicy::from_config(&MemoConfig {
            ttl_hours: u64::MAX / 1000,
            empty_ttl_minutes: u64::MAX,
        });
        assert_eq!(policy.ttl, Duration::from_secs(u64::MAX));
        assert_eq!(policy.empty_ttl, Duration::from_secs(u64::MAX));

        let clock = ManualClock::at(1_000);
        let mut memo = Memo::new(Box::new(MemoryStore::new()), Box::new(clock), policy);
        memo.put("k", &urls(1), policy.ttl);
        assert_eq!(memo.get::<Vec<String>>("k"), Some(urls(1)));
    }

    // =========================================================================
    // Keys
    // =========================================================================

    #[test]
    fn key_is_versioned_and_deterministic() {
        let k1 = memo_key("assets/img/impressions/", None);
        let k2 = memo_key("assets/img/impressions/", None);
        assert_eq!(k1, k2);
        assert!(k1.starts_with("impressions:"));
        assert!(k1.ends_with(&format!(":v{MEMO_VERSION}")));
    }

    #[test]
    fn key_normalizes_base() {
        assert_eq!(
            memo_key("./assets/img/impressions", None),
            memo_key("assets/img/impressions/", None)
        );
    }

    #[test]
    fn key_varies_with_base_and_gallery() {
        let banner = memo_key("assets/img/", None);
        assert_ne!(banner, memo_key("assets/other/", None));
        assert_ne!(banner, memo_key("assets/img/", Some("travel")));
        assert_ne!(
            memo_key("assets/img/", Some("travel")),
            memo_key("assets/img/", Some("street"))
        );
    }

    // =========================================================================
    // FileStore
    // =========================================================================

    #[test]
    fn file_store_persists_across_open() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::open(tmp.path());
        store.write("a", "1".into());

        let reopened = FileStore::open(tmp.path());
        assert_eq!(reopened.read("a"), Some("1".to_string()));
        assert!(store_path(tmp.path()).exists());
    }

    #[test]
    fn file_store_creates_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/cache");
        let mut store = FileStore::open(&dir);
        store.write("a", "1".into());
        assert!(dir.join(STORE_FILENAME).exists());
    }

    #[test]
    fn file_store_corrupt_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(STORE_FILENAME), "{{{").unwrap();
        let store = FileStore::open(tmp.path());
        assert_eq!(store.read("a"), None);
    }

    #[test]
    fn memo_over_file_store_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let clock = ManualClock::at(0);
        {
            let mut memo = Memo::new(
                Box::new(FileStore::open(tmp.path())),
                Box::new(clock.clone()),
                MemoPolicy::default(),
            );
            memo.put("k", &urls(2), HOUR);
        }
        let memo = Memo::new(
            Box::new(FileStore::open(tmp.path())),
            Box::new(clock),
            MemoPolicy::default(),
        );
        assert_eq!(memo.get::<Vec<String>>("k"), Some(urls(2)));
    }

    // =========================================================================
    // MemoStats
    // =========================================================================

    #[test]
    fn stats_display_no_hits() {
        let mut s = MemoStats::default();
        s.record::<()>(&Lookup::Absent);
        s.record::<()>(&Lookup::Expired);
        assert_eq!(s.to_string(), "2 discovered");
    }

    #[test]
    fn stats_display_with_hits() {
        let mut s = MemoStats::default();
        s.record(&Lookup::Fresh(()));
        s.record::<()>(&Lookup::Absent);
        assert_eq!(s.to_string(), "1 cached, 1 discovered (2 total)");
    }

    #[test]
    fn stats_display_with_refresh() {
        let s = MemoStats {
            hits: 2,
            stale: 1,
            misses: 1,
        };
        assert_eq!(s.to_string(), "2 cached, 1 refreshed, 1 discovered (4 total)");
    }
}
