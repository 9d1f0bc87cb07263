//! Chat text rules: classification, mention stripping, payload extraction.
//!
//! The remote console pushes chat as single lines of text, e.g.
//!
//! ```text
//! (Global) Raider: anyone at the airfield?
//! (Side) Medic: need bandages
//! RCon admin #0: (Global) Big Brother: restart in 5
//! (Global) alice-discord: hi from the chat channel
//! ```
//!
//! The last line is an echo: the bridge itself said it on behalf of a
//! platform user. Relaying it back to the platform would create a loop, so
//! the `-discord` suffix marks it as platform-originated.

use serde::{Deserialize, Serialize};

/// Marker the server puts in front of global chat.
pub const GLOBAL_MARKER: &str = "(Global)";

/// Suffix appended to platform display names when relaying to the server.
pub const PLATFORM_ECHO_SUFFIX: &str = "-discord";

const SIDE_MARKER: &str = "(Side)";
const ADMIN_PREFIX: &str = "RCon admin";

/// Characters that trigger pings on the chat platform.
const MENTION_TRIGGERS: &[char] = &['@'];

/// Which in-game chat a message was said in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatCategory {
    Global,
    Side,
    /// Remote-console admin notices (`RCon admin #0: ...`).
    Admin,
    Unclassified,
}

/// Which plane the text originally came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatOrigin {
    Server,
    /// Text the bridge relayed from the platform and the server echoed.
    Platform,
}

/// A classified line of server chat.
///
/// Produced once per inbound line and consumed once by the relay router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The text with mention triggers removed.
    pub text: String,
    pub category: ChatCategory,
    pub origin: ChatOrigin,
}

impl ChatMessage {
    /// Cleans and classifies a raw line pushed by the server.
    pub fn from_server(raw: &str) -> Self {
        let text = strip_mentions(raw);
        let category = classify(&text);
        let origin = if text.contains(PLATFORM_ECHO_SUFFIX) {
            ChatOrigin::Platform
        } else {
            ChatOrigin::Server
        };
        Self {
            text,
            category,
            origin,
        }
    }

    /// Whether this message should be mirrored into the bridge channel.
    ///
    /// Only global chat said in game qualifies. Admin notices and echoes
    /// of platform messages stay in the debug channel.
    pub fn is_bridgeable(&self) -> bool {
        self.category == ChatCategory::Global && self.origin == ChatOrigin::Server
    }

    /// The part of a global message after the last `(Global) ` marker.
    ///
    /// `"(Global) PlayerX: hello"` yields `"PlayerX: hello"`. Returns
    /// `None` when there is no marker followed by a space.
    pub fn global_payload(&self) -> Option<&str> {
        let marker = format!("{GLOBAL_MARKER} ");
        self.text
            .rfind(&marker)
            .map(|at| &self.text[at + marker.len()..])
    }
}

/// Removes characters that would ping users on the chat platform.
pub fn strip_mentions(raw: &str) -> String {
    raw.chars()
        .filter(|c| !MENTION_TRIGGERS.contains(c))
        .collect()
}

fn classify(text: &str) -> ChatCategory {
    if text.contains(GLOBAL_MARKER) {
        ChatCategory::Global
    } else if text.contains(SIDE_MARKER) {
        ChatCategory::Side
    } else if text.starts_with(ADMIN_PREFIX) {
        ChatCategory::Admin
    } else {
        ChatCategory::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_message_is_classified_and_bridgeable() {
        let msg = ChatMessage::from_server("(Global) PlayerX: hello");
        assert_eq!(msg.category, ChatCategory::Global);
        assert_eq!(msg.origin, ChatOrigin::Server);
        assert!(msg.is_bridgeable());
        assert_eq!(msg.global_payload(), Some("PlayerX: hello"));
    }

    #[test]
    fn test_side_message_is_not_bridgeable() {
        let msg = ChatMessage::from_server("(Side) Medic: need bandages");
        assert_eq!(msg.category, ChatCategory::Side);
        assert!(!msg.is_bridgeable());
    }

    #[test]
    fn test_platform_echo_is_not_bridgeable() {
        let msg = ChatMessage::from_server("(Global) alice-discord: hi");
        assert_eq!(msg.category, ChatCategory::Global);
        assert_eq!(msg.origin, ChatOrigin::Platform);
        assert!(!msg.is_bridgeable());
    }

    #[test]
    fn test_admin_notice_with_global_marker_keeps_latest_payload() {
        // Admin global chat carries both prefixes; the payload is what
        // follows the last marker.
        let msg =
            ChatMessage::from_server("RCon admin #0: (Global) Big Brother: restart");
        assert_eq!(msg.global_payload(), Some("Big Brother: restart"));
    }

    #[test]
    fn test_admin_notice_without_chat_marker() {
        let msg = ChatMessage::from_server("RCon admin #1 (203.0.113.9:2306) logged in");
        assert_eq!(msg.category, ChatCategory::Admin);
        assert!(!msg.is_bridgeable());
    }

    #[test]
    fn test_connect_notice_is_unclassified() {
        let msg = ChatMessage::from_server("Player #3 Raider (198.51.100.4:2304) connected");
        assert_eq!(msg.category, ChatCategory::Unclassified);
        assert_eq!(msg.global_payload(), None);
    }

    #[test]
    fn test_mentions_are_stripped() {
        let msg = ChatMessage::from_server("(Global) Troll: @everyone @here");
        assert_eq!(msg.text, "(Global) Troll: everyone here");
        assert_eq!(strip_mentions("a@b"), "ab");
    }

    #[test]
    fn test_marker_without_space_has_no_payload() {
        let msg = ChatMessage::from_server("(Global)");
        assert_eq!(msg.category, ChatCategory::Global);
        assert_eq!(msg.global_payload(), None);
    }
}
