//! Tab configuration records and list mutation operations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{MessageType, TabId, UserId};

/// Per-type routing override for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceAction {
    #[default]
    None,
    /// The tab claims the type exclusively.
    Move,
    /// The tab additionally shows the type.
    Duplicate,
}

/// The `force` mapping: one [`ForceAction`] per message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceRules {
    pub ic: ForceAction,
    pub ooc: ForceAction,
    pub roll: ForceAction,
    pub other: ForceAction,
}

impl ForceRules {
    pub fn get(&self, message_type: MessageType) -> ForceAction {
        match message_type {
            MessageType::Ic => self.ic,
            MessageType::Ooc => self.ooc,
            MessageType::Roll => self.roll,
            MessageType::Other => self.other,
        }
    }

    pub fn set(&mut self, message_type: MessageType, action: ForceAction) {
        match message_type {
            MessageType::Ic => self.ic = action,
            MessageType::Ooc => self.ooc = action,
            MessageType::Roll => self.roll = action,
            MessageType::Other => self.other = action,
        }
    }
}

/// A configured chat tab.
///
/// The list is an ordered sequence; the tab at index 0 is the default tab.
/// Serialized with the persisted camelCase key shape, with defaults on every
/// optional field so partial records from older configs still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub label: String,
    #[serde(default)]
    pub show_all_messages: bool,
    #[serde(default)]
    pub is_whisper_tab: bool,
    #[serde(default)]
    pub whisper_targets: BTreeSet<UserId>,
    #[serde(default, rename = "forceOOC")]
    pub force_ooc: bool,
    #[serde(default)]
    pub force: ForceRules,
}

impl Tab {
    /// A plain tab with no routing overrides.
    pub fn new(label: &str) -> Tab {
        Tab {
            id: new_tab_id(),
            label: label.to_string(),
            show_all_messages: false,
            is_whisper_tab: false,
            whisper_targets: BTreeSet::new(),
            force_ooc: false,
            force: ForceRules::default(),
        }
    }
}

/// Errors rejected at the tab-list edit boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabConfigError {
    #[error("the default tab cannot be deleted")]
    CannotDeleteDefault,
    #[error("a tab with id `{0}` already exists")]
    DuplicateId(TabId),
    #[error("no tab with id `{0}`")]
    UnknownTab(TabId),
    #[error("tab label cannot be empty")]
    EmptyLabel,
}

/// Generate a fresh tab id.
pub fn new_tab_id() -> TabId {
    format!("tab-{}", Uuid::new_v4().simple())
}

/// Parse the persisted tab list, entry by entry.
///
/// Fails soft: an unparseable string or non-array value yields an empty
/// list ("no tabs configured" means "show everything unfiltered"), and
/// malformed entries or entries without a label are skipped.
pub fn parse_tab_list(raw: &str) -> Vec<Tab> {
    let entries: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(entries)) => entries,
        Ok(_) => {
            log::warn!("tab configuration is not an array, treating as empty");
            return Vec::new();
        }
        Err(err) => {
            log::warn!("unparseable tab configuration, treating as empty: {err}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Tab>(entry).ok())
        .filter(|tab| !tab.label.is_empty())
        .collect()
}

/// Serialize the tab list to its persisted string form.
pub fn serialize_tab_list(tabs: &[Tab]) -> String {
    serde_json::to_string(tabs).unwrap_or_else(|_| "[]".to_string())
}

/// The seed configuration written on first run: a default tab, a tab
/// claiming rolls, and a tab that coerces new messages to OOC.
pub fn seed_tabs() -> Vec<Tab> {
    let mut rolls = Tab::new("Rolls");
    rolls.force.roll = ForceAction::Move;

    let mut sub = Tab::new("Sub");
    sub.force_ooc = true;

    vec![Tab::new("Main"), rolls, sub]
}

/// The default tab is positional: index 0.
pub fn default_tab(tabs: &[Tab]) -> Option<&Tab> {
    tabs.first()
}

pub fn find_tab<'a>(tabs: &'a [Tab], id: &str) -> Option<&'a Tab> {
    tabs.iter().find(|t| t.id == id)
}

fn position(tabs: &[Tab], id: &str) -> Result<usize, TabConfigError> {
    tabs.iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TabConfigError::UnknownTab(id.to_string()))
}

/// Append a new tab with a label unique among the existing ones
/// ("New Tab", "New Tab 2", ...). Returns the new tab's id.
pub fn add_tab(tabs: &mut Vec<Tab>, base_label: &str) -> TabId {
    let existing: BTreeSet<&str> = tabs.iter().map(|t| t.label.as_str()).collect();

    let mut label = base_label.to_string();
    let mut counter = 2;
    while existing.contains(label.as_str()) {
        label = format!("{base_label} {counter}");
        counter += 1;
    }

    let tab = Tab::new(&label);
    let id = tab.id.clone();
    tabs.push(tab);
    id
}

/// Remove a tab. The default tab (index 0) is refused.
pub fn delete_tab(tabs: &mut Vec<Tab>, id: &str) -> Result<Tab, TabConfigError> {
    let index = position(tabs, id)?;
    if index == 0 {
        return Err(TabConfigError::CannotDeleteDefault);
    }
    Ok(tabs.remove(index))
}

pub fn rename_tab(tabs: &mut [Tab], id: &str, label: &str) -> Result<(), TabConfigError> {
    if label.is_empty() {
        return Err(TabConfigError::EmptyLabel);
    }
    let index = position(tabs, id)?;
    tabs[index].label = label.to_string();
    Ok(())
}

/// Change a tab's id. Collisions with an existing id are refused with no
/// partial write.
pub fn change_tab_id(tabs: &mut [Tab], old_id: &str, new_id: &str) -> Result<(), TabConfigError> {
    if old_id == new_id {
        return Ok(());
    }
    if tabs.iter().any(|t| t.id == new_id) {
        return Err(TabConfigError::DuplicateId(new_id.to_string()));
    }
    let index = position(tabs, old_id)?;
    tabs[index].id = new_id.to_string();
    Ok(())
}

/// Reorder a tab to `new_index` (clamped). Index 0 stays the default tab
/// by position, so reordering can change which tab is the default.
pub fn move_tab(tabs: &mut Vec<Tab>, id: &str, new_index: usize) -> Result<(), TabConfigError> {
    let index = position(tabs, id)?;
    let tab = tabs.remove(index);
    let new_index = new_index.min(tabs.len());
    tabs.insert(new_index, tab);
    Ok(())
}

/// Set a force rule. Assigning `Move` for a type clears any other tab's
/// `Move` for that type, keeping the at-most-one-mover invariant.
pub fn set_force(
    tabs: &mut [Tab],
    id: &str,
    message_type: MessageType,
    action: ForceAction,
) -> Result<(), TabConfigError> {
    let index = position(tabs, id)?;
    if action == ForceAction::Move {
        for tab in tabs.iter_mut() {
            if tab.force.get(message_type) == ForceAction::Move {
                tab.force.set(message_type, ForceAction::None);
            }
        }
    }
    tabs[index].force.set(message_type, action);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_list_full_record() {
        let raw = r#"[{
            "id": "tab-1",
            "label": "Main",
            "isDefault": true,
            "showAllMessages": false,
            "forceOOC": false,
            "force": {"ic": "none", "ooc": "none", "roll": "move", "other": "none"},
            "isWhisperTab": false,
            "whisperTargets": []
        }]"#;

        let tabs = parse_tab_list(raw);
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].id, "tab-1");
        assert_eq!(tabs[0].force.roll, ForceAction::Move);
        assert_eq!(tabs[0].force.ic, ForceAction::None);
    }

    #[test]
    fn test_parse_tab_list_partial_record() {
        let tabs = parse_tab_list(r#"[{"id": "tab-1", "label": "Main"}]"#);
        assert_eq!(tabs.len(), 1);
        assert!(!tabs[0].show_all_messages);
        assert!(!tabs[0].is_whisper_tab);
        assert!(tabs[0].whisper_targets.is_empty());
        assert_eq!(tabs[0].force, ForceRules::default());
    }

    #[test]
    fn test_parse_tab_list_fails_soft() {
        assert!(parse_tab_list("not json").is_empty());
        assert!(parse_tab_list("{\"id\": \"x\"}").is_empty());
        assert!(parse_tab_list("42").is_empty());
    }

    #[test]
    fn test_parse_tab_list_skips_malformed_entries() {
        let raw = r#"[
            {"id": "tab-1", "label": "Main"},
            {"id": "tab-2"},
            {"id": "tab-3", "label": ""},
            "garbage",
            {"id": "tab-4", "label": "Rolls"}
        ]"#;

        let tabs = parse_tab_list(raw);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].id, "tab-1");
        assert_eq!(tabs[1].id, "tab-4");
    }

    #[test]
    fn test_serialization_round_trip() {
        let tabs = seed_tabs();
        let raw = serialize_tab_list(&tabs);
        assert_eq!(parse_tab_list(&raw), tabs);
    }

    #[test]
    fn test_seed_shape() {
        let tabs = seed_tabs();
        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs[0].label, "Main");
        assert_eq!(tabs[1].force.roll, ForceAction::Move);
        assert!(tabs[2].force_ooc);
        assert!(tabs.iter().all(|t| t.id.starts_with("tab-")));
    }

    #[test]
    fn test_add_tab_unique_labels() {
        let mut tabs = Vec::new();
        add_tab(&mut tabs, "New Tab");
        add_tab(&mut tabs, "New Tab");
        add_tab(&mut tabs, "New Tab");

        let labels: Vec<&str> = tabs.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["New Tab", "New Tab 2", "New Tab 3"]);

        let ids: BTreeSet<&String> = tabs.iter().map(|t| &t.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_delete_default_tab_rejected() {
        let mut tabs = seed_tabs();
        let default_id = tabs[0].id.clone();

        let result = delete_tab(&mut tabs, &default_id);

        assert_eq!(result, Err(TabConfigError::CannotDeleteDefault));
        assert_eq!(tabs.len(), 3);
    }

    #[test]
    fn test_delete_other_tab() {
        let mut tabs = seed_tabs();
        let roll_id = tabs[1].id.clone();

        let removed = delete_tab(&mut tabs, &roll_id).unwrap();

        assert_eq!(removed.id, roll_id);
        assert_eq!(tabs.len(), 2);
    }

    #[test]
    fn test_delete_unknown_tab() {
        let mut tabs = seed_tabs();
        assert_eq!(
            delete_tab(&mut tabs, "nope"),
            Err(TabConfigError::UnknownTab("nope".to_string()))
        );
    }

    #[test]
    fn test_change_tab_id_collision_rejected() {
        let mut tabs = seed_tabs();
        let first = tabs[0].id.clone();
        let second = tabs[1].id.clone();

        let result = change_tab_id(&mut tabs, &second, &first);

        assert_eq!(result, Err(TabConfigError::DuplicateId(first)));
        assert_eq!(tabs[1].id, second);
    }

    #[test]
    fn test_change_tab_id() {
        let mut tabs = seed_tabs();
        let old = tabs[1].id.clone();
        change_tab_id(&mut tabs, &old, "tab-custom").unwrap();
        assert_eq!(tabs[1].id, "tab-custom");
    }

    #[test]
    fn test_rename_tab_empty_label_rejected() {
        let mut tabs = seed_tabs();
        let id = tabs[0].id.clone();
        assert_eq!(rename_tab(&mut tabs, &id, ""), Err(TabConfigError::EmptyLabel));
    }

    #[test]
    fn test_move_tab_changes_default() {
        let mut tabs = seed_tabs();
        let roll_id = tabs[1].id.clone();

        move_tab(&mut tabs, &roll_id, 0).unwrap();

        assert_eq!(default_tab(&tabs).unwrap().id, roll_id);
        assert_eq!(tabs.len(), 3);
    }

    #[test]
    fn test_move_tab_clamps_index() {
        let mut tabs = seed_tabs();
        let main_id = tabs[0].id.clone();

        move_tab(&mut tabs, &main_id, 99).unwrap();

        assert_eq!(tabs[2].id, main_id);
    }

    #[test]
    fn test_set_force_move_is_exclusive() {
        let mut tabs = seed_tabs();
        let main_id = tabs[0].id.clone();

        // Rolls currently claims the roll type; claiming it from Main must
        // release the old claim.
        set_force(&mut tabs, &main_id, MessageType::Roll, ForceAction::Move).unwrap();

        assert_eq!(tabs[0].force.roll, ForceAction::Move);
        assert_eq!(tabs[1].force.roll, ForceAction::None);
    }

    #[test]
    fn test_set_force_duplicate_stacks() {
        let mut tabs = seed_tabs();
        let main_id = tabs[0].id.clone();
        let sub_id = tabs[2].id.clone();

        set_force(&mut tabs, &main_id, MessageType::Ooc, ForceAction::Duplicate).unwrap();
        set_force(&mut tabs, &sub_id, MessageType::Ooc, ForceAction::Duplicate).unwrap();

        assert_eq!(tabs[0].force.ooc, ForceAction::Duplicate);
        assert_eq!(tabs[2].force.ooc, ForceAction::Duplicate);
    }
}
