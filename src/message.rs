//! Read-only view over host chat messages.

use serde::{Deserialize, Serialize};

/// Stable identifier of a configured tab.
pub type TabId = String;
/// Host-assigned message identifier.
pub type MessageId = String;
/// Host user identifier.
pub type UserId = String;
/// Identifier of an open chat window (main sidebar log or a popout).
pub type WindowId = String;

/// Style classification the host stores on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStyle {
    InCharacter,
    OutOfCharacter,
    Emote,
    Whisper,
    Other,
}

/// Routing type of a message. Classification is total and mutually
/// exclusive: the roll flag wins over any style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Ic,
    Ooc,
    Roll,
    Other,
}

/// The slice of a host chat message the routing core reads.
///
/// The host owns the message store; the embedding layer builds these views
/// from host records. `source_tab` is the single flag this crate writes,
/// stamped in the pre-create hook and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Milliseconds since epoch, host clock.
    pub timestamp: f64,
    pub style: MessageStyle,
    pub is_roll: bool,
    pub author: UserId,
    /// Private-recipient list; empty for public messages.
    pub whisper_to: Vec<UserId>,
    /// Id of the tab that was active when the message was created.
    pub source_tab: Option<TabId>,
}

impl ChatMessage {
    /// Classify into exactly one routing type.
    pub fn message_type(&self) -> MessageType {
        if self.is_roll {
            MessageType::Roll
        } else {
            match self.style {
                MessageStyle::InCharacter => MessageType::Ic,
                MessageStyle::OutOfCharacter => MessageType::Ooc,
                _ => MessageType::Other,
            }
        }
    }

    /// True when the message has a non-empty private-recipient list.
    pub fn is_whisper(&self) -> bool {
        !self.whisper_to.is_empty()
    }

    /// The whisper group: author plus every recipient, deduplicated.
    pub fn whisper_group(&self) -> std::collections::BTreeSet<UserId> {
        let mut group: std::collections::BTreeSet<UserId> =
            self.whisper_to.iter().cloned().collect();
        group.insert(self.author.clone());
        group
    }
}
