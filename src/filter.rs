//! The message filter engine: pure routing decisions, no host access.

use std::collections::BTreeSet;

use crate::message::{ChatMessage, TabId};
use crate::tab::{default_tab, ForceAction, Tab};

/// Compute the set of tabs a message belongs to, in strict precedence order:
///
/// 1. Whisper messages route to the whisper tabs whose target set is exactly
///    the message's whisper group; any match short-circuits the rest.
/// 2. A tab claiming the message's type with a `Move` rule takes the message
///    exclusively.
/// 3. Otherwise the message shows on its recorded source tab; with a stale or
///    absent source it shows on the default tab only when `orphan_fallback`
///    is enabled.
/// 4. Tabs with a `Duplicate` rule for the type are added on top.
///
/// The show-all overlay is deliberately not part of this set; see
/// [`is_visible_in_tab`] and [`visible_tabs_with_overlay`].
pub fn visible_tabs(
    message: &ChatMessage,
    tabs: &[Tab],
    orphan_fallback: bool,
) -> BTreeSet<TabId> {
    let mut visible = BTreeSet::new();
    if tabs.is_empty() {
        return visible;
    }

    let message_type = message.message_type();

    if message.is_whisper() {
        let group = message.whisper_group();
        let matching: Vec<&Tab> = tabs
            .iter()
            .filter(|t| t.is_whisper_tab && t.whisper_targets == group)
            .collect();
        if !matching.is_empty() {
            return matching.into_iter().map(|t| t.id.clone()).collect();
        }
        // No matching whisper tab: fall through to the ordinary rules.
    }

    if let Some(mover) = tabs
        .iter()
        .find(|t| !t.is_whisper_tab && t.force.get(message_type) == ForceAction::Move)
    {
        visible.insert(mover.id.clone());
        return visible;
    }

    match &message.source_tab {
        Some(source) if tabs.iter().any(|t| &t.id == source) => {
            visible.insert(source.clone());
        }
        source => {
            if source.is_some() {
                log::debug!("message {} has a stale source tab", message.id);
            }
            if orphan_fallback {
                if let Some(default) = default_tab(tabs) {
                    visible.insert(default.id.clone());
                }
            }
        }
    }

    for tab in tabs {
        if !tab.is_whisper_tab && tab.force.get(message_type) == ForceAction::Duplicate {
            visible.insert(tab.id.clone());
        }
    }

    visible
}

/// Whether the show-all overlay makes a message visible on a tab: show-all
/// tabs see every message except whispers, unless the tab is itself a
/// whisper tab.
fn show_all_applies(message: &ChatMessage, tab: &Tab) -> bool {
    tab.show_all_messages && (!message.is_whisper() || tab.is_whisper_tab)
}

/// Whether a message is visible on a given tab.
///
/// Zero configured tabs is the no-filtering escape hatch: everything is
/// visible in every tab context.
pub fn is_visible_in_tab(
    message: &ChatMessage,
    tabs: &[Tab],
    tab_id: &str,
    orphan_fallback: bool,
) -> bool {
    if tabs.is_empty() {
        return true;
    }
    if let Some(tab) = tabs.iter().find(|t| t.id == tab_id) {
        if show_all_applies(message, tab) {
            return true;
        }
    }
    visible_tabs(message, tabs, orphan_fallback).contains(tab_id)
}

/// The base visible-set plus every tab picked up by the show-all overlay.
/// Unread accounting uses this union so counters and rendered filtering
/// never disagree.
pub fn visible_tabs_with_overlay(
    message: &ChatMessage,
    tabs: &[Tab],
    orphan_fallback: bool,
) -> BTreeSet<TabId> {
    let mut visible = visible_tabs(message, tabs, orphan_fallback);
    for tab in tabs {
        if show_all_applies(message, tab) {
            visible.insert(tab.id.clone());
        }
    }
    visible
}
