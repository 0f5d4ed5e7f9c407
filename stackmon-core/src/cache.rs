//! TTL-bounded cache of recent-log error counts.
//!
//! A log scan shells out and reads text, which is too expensive to
//! repeat on a sub-second refresh cadence; scan results are reused per
//! container for a fixed window. The cache is an explicit object owned
//! by the snapshot builder, with the clock passed in as plain seconds
//! so tests can drive it synthetically.

use std::collections::BTreeMap;
use std::future::Future;

/// Reuse window for a cached scan, seconds.
pub const SCAN_WINDOW_SECS: f64 = 10.0;
/// Log lines fetched per scan.
pub const SCAN_TAIL_LINES: u32 = 80;
/// Lookback passed to the log CLI.
pub const SCAN_LOOKBACK: &str = "45s";

/// Result of one log scan. Disabled scanning never reaches the cache,
/// so it has no variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    Count(u64),
    Failed,
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    at: f64,
    outcome: ScanOutcome,
}

/// Scan results keyed by container id. Entries are only ever
/// overwritten, never purged; containers that disappear leave stale
/// entries behind, bounded by how many containers the stack ever ran.
#[derive(Debug)]
pub struct ErrorCountCache {
    window: f64,
    entries: BTreeMap<String, CacheEntry>,
}

impl ErrorCountCache {
    pub fn new() -> Self {
        Self::with_window(SCAN_WINDOW_SECS)
    }

    pub fn with_window(window: f64) -> Self {
        Self {
            window,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached outcome if it is still inside the reuse window.
    pub fn cached(&self, container_id: &str, now: f64) -> Option<ScanOutcome> {
        self.entries
            .get(container_id)
            .filter(|e| now - e.at < self.window)
            .map(|e| e.outcome)
    }

    /// Record a scan outcome. A write older than the held entry is
    /// dropped, so an abandoned refresh can never back-date a key.
    pub fn store(&mut self, container_id: &str, now: f64, outcome: ScanOutcome) {
        if let Some(existing) = self.entries.get(container_id) {
            if existing.at > now {
                return;
            }
        }
        self.entries
            .insert(container_id.to_string(), CacheEntry { at: now, outcome });
    }

    /// Return the cached outcome when fresh; otherwise run `scan`,
    /// record its outcome (failures included), and return it.
    pub async fn get_or_refresh<F, Fut>(
        &mut self,
        container_id: &str,
        now: f64,
        scan: F,
    ) -> ScanOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ScanOutcome>,
    {
        if let Some(hit) = self.cached(container_id, now) {
            return hit;
        }
        let outcome = scan().await;
        self.store(container_id, now, outcome);
        outcome
    }
}

impl Default for ErrorCountCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Count lines that look like errors: `ERROR`, `CRIT`, or `FATAL` in
/// any case, anywhere in the line.
pub fn count_error_lines(text: &str) -> u64 {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("error") || lower.contains("crit") || lower.contains("fatal")
        })
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_hit_returns_cached_value() {
        let mut cache = ErrorCountCache::new();
        let first = cache
            .get_or_refresh("c1", 100.0, || async { ScanOutcome::Count(3) })
            .await;
        assert_eq!(first, ScanOutcome::Count(3));

        // Inside the window the scan must not run again.
        let hit = cache
            .get_or_refresh("c1", 109.9, || async {
                panic!("scan ran inside the window")
            })
            .await;
        assert_eq!(hit, ScanOutcome::Count(3));
    }

    #[tokio::test]
    async fn test_failures_are_cached_too() {
        let mut cache = ErrorCountCache::new();
        cache
            .get_or_refresh("c1", 0.0, || async { ScanOutcome::Failed })
            .await;
        let hit = cache
            .get_or_refresh("c1", 5.0, || async { ScanOutcome::Count(0) })
            .await;
        assert_eq!(hit, ScanOutcome::Failed);
    }

    #[tokio::test]
    async fn test_expired_entry_rescans() {
        let mut cache = ErrorCountCache::new();
        cache
            .get_or_refresh("c1", 0.0, || async { ScanOutcome::Count(1) })
            .await;
        let refreshed = cache
            .get_or_refresh("c1", 10.0, || async { ScanOutcome::Count(9) })
            .await;
        assert_eq!(refreshed, ScanOutcome::Count(9));
        assert_eq!(cache.cached("c1", 10.0), Some(ScanOutcome::Count(9)));
    }

    #[test]
    fn test_store_never_backdates() {
        let mut cache = ErrorCountCache::new();
        cache.store("c1", 50.0, ScanOutcome::Count(4));
        cache.store("c1", 20.0, ScanOutcome::Count(99));
        assert_eq!(cache.cached("c1", 50.0), Some(ScanOutcome::Count(4)));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut cache = ErrorCountCache::new();
        cache.store("c1", 0.0, ScanOutcome::Count(1));
        cache.store("c2", 0.0, ScanOutcome::Failed);
        assert_eq!(cache.cached("c1", 1.0), Some(ScanOutcome::Count(1)));
        assert_eq!(cache.cached("c2", 1.0), Some(ScanOutcome::Failed));
        assert_eq!(cache.cached("c3", 1.0), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_count_error_lines() {
        let text = "INFO ok\nERROR boom\nerror again\nCRITICAL: disk\nFatal: oom\nwarn only\n";
        assert_eq!(count_error_lines(text), 4);
        assert_eq!(count_error_lines(""), 0);
        assert_eq!(count_error_lines("all\nquiet\n"), 0);
    }
}
