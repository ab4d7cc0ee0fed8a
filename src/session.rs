//! The per-session view controller.
//!
//! A [`ChatTabsSession`] is the explicit context object the embedding layer
//! owns, replacing ambient module state: it tracks the active filter, every
//! open chat window, the unread and pagination trackers, and turns host
//! lifecycle events into [`ViewEvent`] signals. The host glue decides how to
//! react to a signal (re-render the tab bar, re-apply per-message
//! visibility, fetch a history batch); the core never touches the DOM.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::debounce::Debouncer;
use crate::filter::visible_tabs_with_overlay;
use crate::message::{ChatMessage, MessageStyle, MessageType, TabId, UserId, WindowId};
use crate::pagination::{PaginationTracker, ScrollMetrics};
use crate::settings::{Settings, SettingsStore};
use crate::tab::{default_tab, find_tab, new_tab_id, Tab};
use crate::unread::UnreadTracker;

/// Delay for coalescing loadability checks across scroll/resize/mutation
/// bursts.
const LOADABLE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Resolves user ids for whisper-tab labels.
pub trait UserDirectory {
    fn user_name(&self, id: &str) -> Option<String>;
    fn is_gm(&self, id: &str) -> bool;
}

/// Refresh signals emitted by the routing core, consumed by the embedding
/// UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Re-render the tab bar (labels, active marker, unread badges).
    RefreshTabBar,
    /// Re-apply per-message visibility in one window.
    ApplyFilter { window: WindowId },
    /// Scroll one window's log to the bottom.
    ScrollToBottom { window: WindowId },
    /// Run the (debounced) loadability check for every open window.
    CheckLoadable,
    /// Surface the "load more" affordance in a window.
    ShowLoadMore { window: WindowId, tab: TabId },
    /// Ask the host to fetch another batch of history for a window.
    LoadBatch {
        window: WindowId,
        tab: TabId,
        batch_size: u32,
    },
}

#[derive(Debug)]
struct WindowState {
    loadable_check: Debouncer,
}

impl WindowState {
    fn new() -> WindowState {
        WindowState {
            loadable_check: Debouncer::new(LOADABLE_DEBOUNCE),
        }
    }
}

/// Routing and filter state for one embedding of the plugin.
///
/// The active filter is session-wide: whichever window switched last wins,
/// and every window converges to the same filtered view (the per-window
/// state is the pagination/load tracking).
#[derive(Debug)]
pub struct ChatTabsSession {
    active_filter: Option<TabId>,
    windows: BTreeMap<WindowId, WindowState>,
    unread: UnreadTracker,
    pagination: PaginationTracker,
}

impl Default for ChatTabsSession {
    fn default() -> Self {
        ChatTabsSession::new()
    }
}

impl ChatTabsSession {
    pub fn new() -> ChatTabsSession {
        ChatTabsSession {
            active_filter: None,
            windows: BTreeMap::new(),
            unread: UnreadTracker::new(),
            pagination: PaginationTracker::new(),
        }
    }

    /// First-run setup: seed the tab configuration if absent, restore unread
    /// counters, and activate the default tab.
    pub fn initialize<S: SettingsStore>(&mut self, store: &mut S) -> Vec<ViewEvent> {
        let mut settings = Settings::new(store);
        if let Err(err) = settings.ensure_seeded() {
            log::warn!("could not seed tab configuration: {err}");
        }
        self.unread = UnreadTracker::load(&settings);
        let tabs = settings.tabs();
        self.active_filter = default_tab(&tabs).map(|t| t.id.clone());
        self.full_refresh()
    }

    pub fn active_filter(&self) -> Option<&TabId> {
        self.active_filter.as_ref()
    }

    pub fn unread_count(&self, tab_id: &str) -> u32 {
        self.unread.count(tab_id)
    }

    /// Start tracking an open window (main sidebar log or popout).
    pub fn track_window(&mut self, window: &str) {
        self.windows
            .entry(window.to_string())
            .or_insert_with(WindowState::new);
    }

    /// Stop tracking a closed window and drop its cursors.
    pub fn forget_window(&mut self, window: &str) {
        self.windows.remove(window);
        self.pagination.invalidate_window(window);
    }

    pub fn tracked_windows(&self) -> impl Iterator<Item = &WindowId> {
        self.windows.keys()
    }

    /// Pre-create hook: stamp the active tab onto the draft and apply the
    /// active tab's OOC coercion. Must run before the host persists the
    /// message; the stamp is immutable afterwards.
    pub fn stamp_new_message(&self, draft: &mut ChatMessage, tabs: &[Tab]) {
        draft.source_tab = self.active_filter.clone();

        let Some(active) = self.active_filter.as_deref() else {
            return;
        };
        if let Some(tab) = find_tab(tabs, active) {
            if tab.force_ooc && !draft.is_whisper() && draft.message_type() == MessageType::Ic {
                draft.style = MessageStyle::OutOfCharacter;
            }
        }
    }

    /// Activate another tab in response to a click in some window.
    pub fn switch_tab<S: SettingsStore>(
        &mut self,
        window: &str,
        new_tab: &str,
        store: &mut S,
    ) -> Vec<ViewEvent> {
        if self.active_filter.as_deref() == Some(new_tab) {
            return Vec::new();
        }
        let mut settings = Settings::new(store);
        let tabs = settings.tabs();
        if find_tab(&tabs, new_tab).is_none() {
            log::warn!("ignoring switch to unknown tab `{new_tab}`");
            return Vec::new();
        }

        self.active_filter = Some(new_tab.to_string());
        self.unread.reset(new_tab);
        if let Err(err) = self.unread.persist(&mut settings) {
            log::warn!("could not persist unread counters: {err}");
        }
        self.pagination.invalidate_window(window);

        let mut events = self.full_refresh();
        events.push(ViewEvent::ScrollToBottom {
            window: window.to_string(),
        });
        events.push(ViewEvent::CheckLoadable);
        events
    }

    /// Route a newly created (already persisted) message.
    pub fn on_message_created<S: SettingsStore>(
        &mut self,
        message: &ChatMessage,
        store: &mut S,
        users: &dyn UserDirectory,
    ) -> Vec<ViewEvent> {
        let mut tabs_changed = false;
        if let Some(tab) = self.maybe_create_whisper_tab(message, store, users) {
            log::debug!("created whisper tab `{}` for message {}", tab.id, message.id);
            tabs_changed = true;
            // Routing rules changed: cached cursors are stale.
            self.pagination.invalidate_all();
        }

        let mut settings = Settings::new(store);
        let tabs = settings.tabs();
        let orphan_fallback = settings.orphans_on_default();
        let visible = visible_tabs_with_overlay(message, &tabs, orphan_fallback);

        let mut counted = false;
        for tab_id in &visible {
            self.pagination.note_created(tab_id, &message.id);
            if self.active_filter.as_ref() != Some(tab_id) {
                self.unread.increase(tab_id);
                counted = true;
            }
        }
        if counted {
            if let Err(err) = self.unread.persist(&mut settings) {
                log::warn!("could not persist unread counters: {err}");
            }
        }

        let mut events = Vec::new();
        if counted || tabs_changed {
            events.push(ViewEvent::RefreshTabBar);
        }
        for window in self.windows.keys() {
            events.push(ViewEvent::ApplyFilter {
                window: window.clone(),
            });
        }
        events.push(ViewEvent::CheckLoadable);
        events
    }

    /// A message changed in place: the active tab's oldest-visible cursor
    /// may have moved.
    pub fn on_message_updated(&mut self) -> Vec<ViewEvent> {
        self.invalidate_active_cursors()
    }

    /// A message was removed from the history.
    pub fn on_message_deleted(&mut self) -> Vec<ViewEvent> {
        self.invalidate_active_cursors()
    }

    /// The tab configuration setting changed (settings UI, another client,
    /// or auto-whisper creation elsewhere): unread counters and cursors are
    /// stale in bulk, and the active filter may name a deleted tab.
    pub fn on_tabs_changed<S: SettingsStore>(&mut self, store: &mut S) -> Vec<ViewEvent> {
        let mut settings = Settings::new(store);
        let tabs = settings.tabs();

        self.unread.clear();
        if let Err(err) = self.unread.persist(&mut settings) {
            log::warn!("could not persist unread counters: {err}");
        }
        self.pagination.invalidate_all();

        let still_exists = self
            .active_filter
            .as_deref()
            .is_some_and(|active| find_tab(&tabs, active).is_some());
        if !still_exists {
            self.active_filter = default_tab(&tabs).map(|t| t.id.clone());
        }

        let mut events = self.full_refresh();
        events.push(ViewEvent::CheckLoadable);
        events
    }

    /// A window materialized more history; its local cursors are stale.
    pub fn on_window_history_loaded(&mut self, window: &str) -> Vec<ViewEvent> {
        self.pagination.invalidate_window(window);
        vec![
            ViewEvent::ApplyFilter {
                window: window.to_string(),
            },
            ViewEvent::CheckLoadable,
        ]
    }

    /// Note a raw scroll/resize/DOM-mutation event for a window. The actual
    /// check runs on a later [`poll_loadable`](Self::poll_loadable) once the
    /// burst has settled.
    pub fn request_loadable_check(&mut self, window: &str, now: Instant) {
        if let Some(state) = self.windows.get_mut(window) {
            state.loadable_check.trigger(now);
        }
    }

    /// Evaluate the debounced loadability decision for one window.
    ///
    /// `history` is the full ascending message history, `rendered` the slice
    /// materialized in this window. Emits a fetch request when auto-load is
    /// on, otherwise the "load more" affordance.
    pub fn poll_loadable<S: SettingsStore>(
        &mut self,
        window: &str,
        now: Instant,
        store: &mut S,
        history: &[ChatMessage],
        rendered: &[ChatMessage],
        scroll: ScrollMetrics,
    ) -> Option<ViewEvent> {
        let state = self.windows.get_mut(window)?;
        if !state.loadable_check.fire(now) {
            return None;
        }
        let tab_id = self.active_filter.clone()?;

        let settings = Settings::new(store);
        let tabs = settings.tabs();
        let orphan_fallback = settings.orphans_on_default();

        let loadable = self.pagination.is_loadable(
            window,
            &tab_id,
            &tabs,
            history,
            rendered,
            scroll,
            orphan_fallback,
        );
        if !loadable {
            return None;
        }

        if settings.auto_load_messages() {
            Some(ViewEvent::LoadBatch {
                window: window.to_string(),
                tab: tab_id,
                batch_size: settings.load_batch_size(),
            })
        } else {
            Some(ViewEvent::ShowLoadMore {
                window: window.to_string(),
                tab: tab_id,
            })
        }
    }

    /// Synthesize a whisper tab for a GM-involving private message with no
    /// matching tab. Re-reads the configuration immediately before the
    /// insert so a duplicate trigger finds the tab already present and
    /// backs off.
    fn maybe_create_whisper_tab<S: SettingsStore>(
        &mut self,
        message: &ChatMessage,
        store: &mut S,
        users: &dyn UserDirectory,
    ) -> Option<Tab> {
        let mut settings = Settings::new(store);
        if !settings.auto_whisper_tab() || !message.is_whisper() {
            return None;
        }

        let group = message.whisper_group();
        if !group.iter().any(|id| users.is_gm(id)) {
            return None;
        }

        // Idempotence check against the freshest configuration.
        let mut tabs = settings.tabs();
        if tabs
            .iter()
            .any(|t| t.is_whisper_tab && t.whisper_targets == group)
        {
            return None;
        }

        let tab = Tab {
            id: new_tab_id(),
            label: whisper_tab_label(&group, users),
            show_all_messages: false,
            is_whisper_tab: true,
            whisper_targets: group,
            force_ooc: false,
            force: Default::default(),
        };
        tabs.push(tab.clone());
        if let Err(err) = settings.save_tabs(&tabs) {
            log::warn!("could not persist auto-created whisper tab: {err}");
            return None;
        }
        Some(tab)
    }

    fn invalidate_active_cursors(&mut self) -> Vec<ViewEvent> {
        if let Some(active) = self.active_filter.clone() {
            self.pagination.invalidate_tab(&active);
        }
        vec![ViewEvent::CheckLoadable]
    }

    fn full_refresh(&self) -> Vec<ViewEvent> {
        let mut events = vec![ViewEvent::RefreshTabBar];
        for window in self.windows.keys() {
            events.push(ViewEvent::ApplyFilter {
                window: window.clone(),
            });
        }
        events
    }
}

/// Label for a synthesized whisper tab: participant names, with all-GM
/// groups collapsed to "GM"/"GMs".
fn whisper_tab_label(group: &std::collections::BTreeSet<UserId>, users: &dyn UserDirectory) -> String {
    let non_gms: Vec<&UserId> = group.iter().filter(|id| !users.is_gm(id)).collect();
    if non_gms.is_empty() {
        return if group.len() > 1 { "GMs" } else { "GM" }.to_string();
    }
    non_gms
        .iter()
        .map(|id| users.user_name(id).unwrap_or_else(|| (*id).clone()))
        .collect::<Vec<String>>()
        .join(", ")
}
