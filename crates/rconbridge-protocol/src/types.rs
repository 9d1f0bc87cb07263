//! Identity and record types shared across the bridge.
//!
//! Identifiers come from the chat platform (snowflakes). Records come from
//! the remote console and are plain snapshots: once fetched they are never
//! updated, because the live server state can change at any moment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Declares a snowflake newtype.
///
/// Each id is a `u64` underneath, but wrapping it means a `ChannelId` can
/// never be passed where a `UserId` is expected. `#[serde(transparent)]`
/// keeps the JSON form a plain integer, which is what the persisted
/// config file stores.
macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        /// Parses a raw id (`1234`) or a platform mention (`<#1234>`,
        /// `<@1234>`, `<@!1234>`).
        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .trim_start_matches(['#', '@', '!', '&']);
                trimmed
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| ProtocolError::InvalidId(s.to_string()))
            }
        }
    };
}

snowflake!(
    /// A chat-platform guild (server). One bridge exists per guild.
    GuildId
);
snowflake!(
    /// A text channel on the chat platform.
    ChannelId
);
snowflake!(
    /// A chat-platform user.
    UserId
);
snowflake!(
    /// A single posted message. Reactions are correlated through it.
    MessageId
);

// ---------------------------------------------------------------------------
// PlayerRecord
// ---------------------------------------------------------------------------

/// One connected player, as reported by the remote console.
///
/// - `id` is the server slot (`#` column). It identifies the player only
///   for the lifetime of their connection and is what `kick` takes.
/// - `guid` is the stable player id. It survives reconnects and is what
///   bans are issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Server slot number.
    pub id: u32,
    /// Remote address as `ip:port`.
    pub address: String,
    /// Last measured ping in milliseconds.
    pub ping: u32,
    /// Stable player id (GUID).
    pub guid: String,
    /// Whether the server verified the GUID (`(OK)` vs `(?)`).
    pub verified: bool,
    /// Display name.
    pub name: String,
    /// Player is still in the lobby and not yet in game.
    pub lobby: bool,
}

impl PlayerRecord {
    /// The IP part of [`address`](Self::address), without the port.
    pub fn ip(&self) -> &str {
        self.address
            .rsplit_once(':')
            .map_or(self.address.as_str(), |(ip, _)| ip)
    }
}

impl fmt::Display for PlayerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.name, self.guid)
    }
}

// ---------------------------------------------------------------------------
// AdminRecord / BanRecord
// ---------------------------------------------------------------------------

/// A remote-console admin currently logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub id: u32,
    pub address: String,
}

/// One entry of the server's ban list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    /// Position in the ban list (used by `removeBan`).
    pub id: u32,
    /// The banned GUID or IP address.
    pub target: String,
    /// Minutes until the ban expires. `None` means permanent.
    pub minutes_left: Option<u64>,
    pub reason: String,
}

impl BanRecord {
    pub fn is_permanent(&self) -> bool {
        self.minutes_left.is_none()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn raider() -> PlayerRecord {
        PlayerRecord {
            id: 7,
            address: "198.51.100.4:2304".into(),
            ping: 47,
            guid: "0123456789abcdef0123456789abcdef".into(),
            verified: true,
            name: "Raider".into(),
            lobby: false,
        }
    }

    #[test]
    fn test_channel_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ChannelId(1111)).unwrap();
        assert_eq!(json, "1111");
    }

    #[test]
    fn test_guild_id_deserializes_from_plain_number() {
        let id: GuildId = serde_json::from_str("42").unwrap();
        assert_eq!(id, GuildId(42));
    }

    #[test]
    fn test_id_display_is_raw_number() {
        assert_eq!(UserId(9).to_string(), "9");
        assert_eq!(MessageId(10).to_string(), "10");
    }

    #[test]
    fn test_id_parses_raw_number() {
        assert_eq!("2222".parse::<ChannelId>().unwrap(), ChannelId(2222));
    }

    #[test]
    fn test_id_parses_mentions() {
        assert_eq!("<#1111>".parse::<ChannelId>().unwrap(), ChannelId(1111));
        assert_eq!("<@55>".parse::<UserId>().unwrap(), UserId(55));
        assert_eq!("<@!55>".parse::<UserId>().unwrap(), UserId(55));
    }

    #[test]
    fn test_id_rejects_garbage() {
        let err = "general".parse::<ChannelId>().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidId(s) if s == "general"));
    }

    #[test]
    fn test_player_ip_strips_port() {
        assert_eq!(raider().ip(), "198.51.100.4");
    }

    #[test]
    fn test_player_ip_without_port() {
        let mut player = raider();
        player.address = "198.51.100.4".into();
        assert_eq!(player.ip(), "198.51.100.4");
    }

    #[test]
    fn test_player_display() {
        assert_eq!(
            raider().to_string(),
            "#7 Raider (0123456789abcdef0123456789abcdef)"
        );
    }

    #[test]
    fn test_ban_permanence() {
        let ban = BanRecord {
            id: 0,
            target: "abc".into(),
            minutes_left: None,
            reason: "cheating".into(),
        };
        assert!(ban.is_permanent());
        let temp = BanRecord {
            minutes_left: Some(30),
            ..ban
        };
        assert!(!temp.is_permanent());
    }
}
