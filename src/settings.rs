//! Host settings store collaborator and typed accessors.
//!
//! The host persists settings as string/boolean/number/object values under
//! string keys, world-scoped (shared) or client-scoped (per-user). The core
//! only sees the narrow [`SettingsStore`] trait; every read fails soft to a
//! default so a stale or mangled value can never take the filter down.

use std::collections::HashMap;

use serde_json::Value;

use crate::message::TabId;
use crate::tab::{parse_tab_list, seed_tabs, serialize_tab_list, Tab};

/// Persistence scope of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    /// Shared across all users.
    World,
    /// Per-user.
    Client,
}

/// Setting keys, matching the persisted layout.
pub mod keys {
    /// Serialized ordered tab list (world, JSON string).
    pub const TABS: &str = "tabs";
    /// Unread counters, tab id -> count (client, object).
    pub const UNREAD_TABS: &str = "unreadTabs";
    /// Synthesize whisper tabs for GM whispers (world, bool).
    pub const AUTO_WHISPER_TAB: &str = "autoWhisperTab";
    /// Show orphaned/sourceless messages on the default tab (world, bool).
    pub const ORPHANS_ON_DEFAULT: &str = "showAloneMessageToDefaultTab";
    /// Render unread badges on the tab bar (client, bool).
    pub const DISPLAY_UNREAD_COUNT: &str = "display-unread-count";
    /// Fetch older history automatically when scrolled near the top
    /// (client, bool); off means a "load more" affordance instead.
    pub const AUTO_LOAD_MESSAGES: &str = "auto-load-messages";
    /// How many messages one history fetch asks for (client, number).
    pub const LOAD_BATCH_SIZE: &str = "load-batch-size";
}

/// Scope a key should be registered under with the host settings backend.
pub fn scope_of(key: &str) -> SettingScope {
    match key {
        keys::TABS | keys::AUTO_WHISPER_TAB | keys::ORPHANS_ON_DEFAULT => SettingScope::World,
        _ => SettingScope::Client,
    }
}

/// Write failure surfaced by a host settings backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to write setting `{key}`: {reason}")]
pub struct SettingsError {
    pub key: String,
    pub reason: String,
}

/// The host settings collaborator.
///
/// Host writes are asynchronous round-trips; a store implementation is
/// expected to make a write visible to subsequent `get` calls once `set`
/// returns, but callers tolerate stale reads by falling back to defaults.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
}

/// In-memory [`SettingsStore`], used in tests and by embedders that buffer
/// writes themselves.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, Value>,
}

impl MemorySettings {
    pub fn new() -> MemorySettings {
        MemorySettings::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

const LOAD_BATCH_MIN: u32 = 50;
const LOAD_BATCH_MAX: u32 = 500;
const LOAD_BATCH_DEFAULT: u32 = 100;

/// Typed accessors over a [`SettingsStore`].
pub struct Settings<'a, S: SettingsStore> {
    store: &'a mut S,
}

impl<'a, S: SettingsStore> Settings<'a, S> {
    pub fn new(store: &'a mut S) -> Settings<'a, S> {
        Settings { store }
    }

    /// Write the seed tab configuration if none exists yet (first run).
    pub fn ensure_seeded(&mut self) -> Result<(), SettingsError> {
        if self.store.get(keys::TABS).is_none() {
            self.save_tabs(&seed_tabs())?;
        }
        Ok(())
    }

    /// The configured tab list. Fails soft: a missing, mistyped or
    /// unparseable value yields an empty list.
    pub fn tabs(&self) -> Vec<Tab> {
        match self.store.get(keys::TABS) {
            Some(Value::String(raw)) => parse_tab_list(&raw),
            Some(other) => {
                log::warn!("tab configuration has unexpected type {other:?}");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn save_tabs(&mut self, tabs: &[Tab]) -> Result<(), SettingsError> {
        self.store
            .set(keys::TABS, Value::String(serialize_tab_list(tabs)))
    }

    /// Unread counters; anything unexpected degrades to all-zero.
    pub fn unread_counts(&self) -> HashMap<TabId, u32> {
        match self.store.get(keys::UNREAD_TABS) {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => HashMap::new(),
        }
    }

    pub fn save_unread_counts(&mut self, counts: &HashMap<TabId, u32>) -> Result<(), SettingsError> {
        let value = serde_json::to_value(counts).unwrap_or_else(|_| Value::Object(Default::default()));
        self.store.set(keys::UNREAD_TABS, value)
    }

    pub fn auto_whisper_tab(&self) -> bool {
        self.bool_setting(keys::AUTO_WHISPER_TAB, true)
    }

    pub fn orphans_on_default(&self) -> bool {
        self.bool_setting(keys::ORPHANS_ON_DEFAULT, false)
    }

    pub fn display_unread_count(&self) -> bool {
        self.bool_setting(keys::DISPLAY_UNREAD_COUNT, false)
    }

    pub fn auto_load_messages(&self) -> bool {
        self.bool_setting(keys::AUTO_LOAD_MESSAGES, true)
    }

    /// Batch size for history fetches, clamped to the supported range.
    pub fn load_batch_size(&self) -> u32 {
        let raw = match self.store.get(keys::LOAD_BATCH_SIZE) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(LOAD_BATCH_DEFAULT as u64) as u32,
            _ => LOAD_BATCH_DEFAULT,
        };
        raw.clamp(LOAD_BATCH_MIN, LOAD_BATCH_MAX)
    }

    fn bool_setting(&self, key: &str, default: bool) -> bool {
        match self.store.get(key) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                log::warn!("setting `{key}` has unexpected type {other:?}");
                default
            }
            None => default,
        }
    }
}
