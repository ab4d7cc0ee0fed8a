//! Pagination cursors over the lazily-loaded message history.
//!
//! Two cursor maps: the oldest message in the entire history that a tab can
//! see (global), and the oldest message actually materialized in a given
//! window's log for that tab (per window, since every popout may have loaded
//! a different amount of history). Comparing the two tells whether a "load
//! more" fetch would bring anything new into the filtered view. Neither map
//! is persisted; both are rebuilt on demand.

use std::collections::HashMap;

use crate::filter::is_visible_in_tab;
use crate::message::{ChatMessage, MessageId, TabId, WindowId};
use crate::tab::Tab;

/// Fraction of the scrollable height that counts as "near the top".
const TOP_THRESHOLD: f64 = 0.05;

/// Scroll geometry of a window's chat log, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Distance from the top of the scrollable content, in pixels.
    pub scroll_top: f64,
    /// Total scrollable content height, in pixels.
    pub scroll_height: f64,
}

impl ScrollMetrics {
    /// Whether the view is scrolled within the threshold of the top.
    pub fn near_top(&self) -> bool {
        self.scroll_top <= self.scroll_height * TOP_THRESHOLD
    }
}

/// Cached cursor value: computed, and either found or known-absent.
type Cursor = Option<MessageId>;

#[derive(Debug, Clone, Default)]
pub struct PaginationTracker {
    oldest: HashMap<TabId, Cursor>,
    oldest_load: HashMap<WindowId, HashMap<TabId, Cursor>>,
}

impl PaginationTracker {
    pub fn new() -> PaginationTracker {
        PaginationTracker::default()
    }

    /// The oldest message in the full history visible on a tab.
    ///
    /// `history` is the complete in-memory message list in ascending
    /// timestamp order. The scan result is cached until invalidated.
    pub fn oldest_message(
        &mut self,
        tab_id: &str,
        tabs: &[Tab],
        history: &[ChatMessage],
        orphan_fallback: bool,
    ) -> Option<MessageId> {
        if let Some(cached) = self.oldest.get(tab_id) {
            return cached.clone();
        }
        let cursor = history
            .iter()
            .find(|m| is_visible_in_tab(m, tabs, tab_id, orphan_fallback))
            .map(|m| m.id.clone());
        self.oldest.insert(tab_id.to_string(), cursor.clone());
        cursor
    }

    /// The oldest message materialized in one window's log that is visible
    /// on a tab. `rendered` is that window's message list in document order
    /// (chronological).
    pub fn oldest_load_message(
        &mut self,
        window: &str,
        tab_id: &str,
        tabs: &[Tab],
        rendered: &[ChatMessage],
        orphan_fallback: bool,
    ) -> Option<MessageId> {
        let per_tab = self.oldest_load.entry(window.to_string()).or_default();
        if let Some(cached) = per_tab.get(tab_id) {
            return cached.clone();
        }
        let cursor = rendered
            .iter()
            .find(|m| is_visible_in_tab(m, tabs, tab_id, orphan_fallback))
            .map(|m| m.id.clone());
        per_tab.insert(tab_id.to_string(), cursor.clone());
        cursor
    }

    /// Fast path for a freshly created message: when a tab's global cursor
    /// was computed as "no visible message", the new arrival is by
    /// construction the tab's first (and oldest) one, no rescan needed.
    pub fn note_created(&mut self, tab_id: &str, message_id: &MessageId) {
        if let Some(cursor) = self.oldest.get_mut(tab_id) {
            if cursor.is_none() {
                *cursor = Some(message_id.clone());
            }
        }
        for per_tab in self.oldest_load.values_mut() {
            if let Some(cursor) = per_tab.get_mut(tab_id) {
                if cursor.is_none() {
                    *cursor = Some(message_id.clone());
                }
            }
        }
    }

    /// Drop a tab's cursors so the next read rescans. Used when a message
    /// was updated or deleted, which can change which message is the
    /// visible oldest one.
    pub fn invalidate_tab(&mut self, tab_id: &str) {
        self.oldest.remove(tab_id);
        for per_tab in self.oldest_load.values_mut() {
            per_tab.remove(tab_id);
        }
    }

    /// Drop everything, e.g. after a tab-configuration change.
    pub fn invalidate_all(&mut self) {
        self.oldest.clear();
        self.oldest_load.clear();
    }

    /// Drop a window's local cursors. Also used when a window loads more
    /// history, since its materialized slice changed.
    pub fn invalidate_window(&mut self, window: &str) {
        self.oldest_load.remove(window);
    }

    /// Whether more history should be fetched for a tab in a window: there
    /// is a visible oldest message globally, it is not yet materialized in
    /// this window, and the user is scrolled near the top.
    pub fn is_loadable(
        &mut self,
        window: &str,
        tab_id: &str,
        tabs: &[Tab],
        history: &[ChatMessage],
        rendered: &[ChatMessage],
        scroll: ScrollMetrics,
        orphan_fallback: bool,
    ) -> bool {
        let Some(oldest) = self.oldest_message(tab_id, tabs, history, orphan_fallback) else {
            return false;
        };
        let loaded = self.oldest_load_message(window, tab_id, tabs, rendered, orphan_fallback);
        loaded.as_ref() != Some(&oldest) && scroll.near_top()
    }
}
