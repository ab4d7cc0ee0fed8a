//! Per-tab unread counters.

use std::collections::HashMap;

use crate::message::TabId;
use crate::settings::{Settings, SettingsError, SettingsStore};

/// Tracks how many messages arrived on each tab while it was not active.
///
/// The in-memory map is authoritative; [`persist`](UnreadTracker::persist)
/// pushes it to the client-scoped setting after a batch of mutations, and a
/// stale read on the next load simply under-counts instead of failing.
#[derive(Debug, Clone, Default)]
pub struct UnreadTracker {
    counts: HashMap<TabId, u32>,
}

impl UnreadTracker {
    pub fn new() -> UnreadTracker {
        UnreadTracker::default()
    }

    /// Restore counters from the settings store.
    pub fn load<S: SettingsStore>(settings: &Settings<S>) -> UnreadTracker {
        UnreadTracker {
            counts: settings.unread_counts(),
        }
    }

    pub fn count(&self, tab_id: &str) -> u32 {
        self.counts.get(tab_id).copied().unwrap_or(0)
    }

    /// Increment a tab's counter by one. Returns the new count.
    pub fn increase(&mut self, tab_id: &str) -> u32 {
        let count = self.counts.entry(tab_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Clear a tab's counter (removes the entry). Returns true when there
    /// was a non-zero count to clear.
    pub fn reset(&mut self, tab_id: &str) -> bool {
        self.counts.remove(tab_id).is_some_and(|c| c > 0)
    }

    /// Drop every counter, e.g. when the tab configuration changed.
    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn persist<S: SettingsStore>(&self, settings: &mut Settings<S>) -> Result<(), SettingsError> {
        settings.save_unread_counts(&self.counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    #[test]
    fn test_counts_start_at_zero() {
        let tracker = UnreadTracker::new();
        assert_eq!(tracker.count("t1"), 0);
    }

    #[test]
    fn test_increase_is_monotonic() {
        let mut tracker = UnreadTracker::new();
        for expected in 1..=5 {
            assert_eq!(tracker.increase("t1"), expected);
        }
        assert_eq!(tracker.count("t1"), 5);
        assert_eq!(tracker.count("t2"), 0);
    }

    #[test]
    fn test_reset_clears_to_zero() {
        let mut tracker = UnreadTracker::new();
        tracker.increase("t1");
        tracker.increase("t1");

        assert!(tracker.reset("t1"));
        assert_eq!(tracker.count("t1"), 0);

        // Resetting an absent entry is a no-op.
        assert!(!tracker.reset("t1"));
    }

    #[test]
    fn test_persist_and_load() {
        let mut store = MemorySettings::new();
        let mut tracker = UnreadTracker::new();
        tracker.increase("t1");
        tracker.increase("t1");
        tracker.increase("t2");

        tracker.persist(&mut Settings::new(&mut store)).unwrap();
        let restored = UnreadTracker::load(&Settings::new(&mut store));

        assert_eq!(restored.count("t1"), 2);
        assert_eq!(restored.count("t2"), 1);
    }

    #[test]
    fn test_clear() {
        let mut tracker = UnreadTracker::new();
        tracker.increase("t1");
        tracker.clear();
        assert_eq!(tracker.count("t1"), 0);
    }
}
