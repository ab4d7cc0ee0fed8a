//! Message routing and filter-state core for a multi-tab chat log.
//!
//! The host application owns the DOM, the message store, the settings
//! backend, and the render lifecycle. This crate decides which configured
//! tab every chat message belongs to, tracks per-tab unread counters and
//! per-window pagination cursors, and emits explicit
//! [`ViewEvent`](session::ViewEvent) refresh signals for the embedding UI
//! glue to act on.

pub mod debounce;
pub mod filter;
pub mod message;
pub mod pagination;
pub mod session;
pub mod settings;
pub mod tab;
pub mod unread;

pub use debounce::Debouncer;
pub use filter::{is_visible_in_tab, visible_tabs, visible_tabs_with_overlay};
pub use message::{ChatMessage, MessageId, MessageStyle, MessageType, TabId, UserId, WindowId};
pub use pagination::{PaginationTracker, ScrollMetrics};
pub use session::{ChatTabsSession, UserDirectory, ViewEvent};
pub use settings::{scope_of, MemorySettings, SettingScope, Settings, SettingsError, SettingsStore};
pub use tab::{ForceAction, ForceRules, Tab, TabConfigError};
pub use unread::UnreadTracker;
