//! Prefix command parsing.
//!
//! Turns a platform message like `)initialize-bridge 203.0.113.5 2302 "my
//! password" #bridge #moderation` into a [`Command`]. Arguments are split
//! on whitespace; double quotes group words into one argument. Everything
//! is validated here, before the application touches the config store.

use rconbridge_protocol::{ChannelId, GuildId};
use rconbridge_relay::BridgeConfig;

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `initialize-bridge` (alias `isc`).
    InitializeBridge(BridgeSetup),
    Reconnect,
    Kick,
    Ban,
    Status,
}

impl Command {
    /// The canonical command name, for logs. Never includes arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeBridge(_) => "initialize-bridge",
            Self::Reconnect => "reconnect",
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Status => "status",
        }
    }
}

/// Arguments of `initialize-bridge`. The debug channel is wherever the
/// command was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSetup {
    pub host: String,
    pub rcon_port: u16,
    pub rcon_password: String,
    pub bridge_channel: ChannelId,
    pub moderation_channel: ChannelId,
}

impl BridgeSetup {
    pub fn into_config(self, guild_id: GuildId, debug_channel: ChannelId) -> BridgeConfig {
        BridgeConfig::new(
            guild_id,
            self.host,
            self.rcon_port,
            self.rcon_password,
            self.bridge_channel,
            debug_channel,
            self.moderation_channel,
        )
    }
}

/// Why a prefixed message is not a runnable command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    Unknown(String),

    /// Wrong argument count or an argument of the wrong shape. Carries the
    /// usage line, without the prefix.
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unterminated quote")]
    UnterminatedQuote,
}

const INITIALIZE_USAGE: &str =
    "initialize-bridge <host> <port> <password> <bridge-channel> <moderation-channel>";

/// Parses `content` as a command.
///
/// `None` if the message does not start with `prefix` (an ordinary chat
/// message).
pub fn parse(prefix: &str, content: &str) -> Option<Result<Command, CommandError>> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    Some(parse_body(rest))
}

fn parse_body(body: &str) -> Result<Command, CommandError> {
    let args = split_arguments(body)?;
    let Some((name, args)) = args.split_first() else {
        return Err(CommandError::Unknown(String::new()));
    };

    match name.to_ascii_lowercase().as_str() {
        "initialize-bridge" | "isc" => parse_setup(args).map(Command::InitializeBridge),
        "reconnect" => Ok(Command::Reconnect),
        "kick" => Ok(Command::Kick),
        "ban" => Ok(Command::Ban),
        "status" => Ok(Command::Status),
        _ => Err(CommandError::Unknown(name.clone())),
    }
}

fn parse_setup(args: &[String]) -> Result<BridgeSetup, CommandError> {
    let usage = CommandError::Usage(INITIALIZE_USAGE);
    let [host, port, password, bridge, moderation] = args else {
        return Err(usage);
    };

    let rcon_port = match port.parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => return Err(usage),
    };
    let bridge_channel: ChannelId = bridge.parse().map_err(|_| usage.clone())?;
    let moderation_channel: ChannelId = moderation.parse().map_err(|_| usage.clone())?;
    if host.is_empty() || password.is_empty() {
        return Err(usage);
    }

    Ok(BridgeSetup {
        host: host.clone(),
        rcon_port,
        rcon_password: password.clone(),
        bridge_channel,
        moderation_channel,
    })
}

/// Splits on whitespace, keeping `"quoted words"` together.
///
/// Quotes may appear mid-word (`pass"word with"spaces` is one argument).
/// `""` yields an empty argument.
pub fn split_arguments(input: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(CommandError::UnterminatedQuote);
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Splitting --------------------------------------------------------

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_arguments("  kick   now ").unwrap(),
            vec!["kick", "now"]
        );
    }

    #[test]
    fn test_split_keeps_quoted_words_together() {
        assert_eq!(
            split_arguments(r#"isc host 1 "my secret pw" 2 3"#).unwrap(),
            vec!["isc", "host", "1", "my secret pw", "2", "3"]
        );
    }

    #[test]
    fn test_split_quote_inside_word() {
        assert_eq!(
            split_arguments(r#"pa"ss wo"rd x"#).unwrap(),
            vec!["pass word", "x"]
        );
    }

    #[test]
    fn test_split_empty_quotes_is_empty_argument() {
        assert_eq!(split_arguments(r#"a "" b"#).unwrap(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_split_unterminated_quote() {
        assert_eq!(
            split_arguments(r#"a "b c"#),
            Err(CommandError::UnterminatedQuote)
        );
    }

    // -- Parsing ----------------------------------------------------------

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse(")", "hello there"), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse(")", ")reconnect"), Some(Ok(Command::Reconnect)));
        assert_eq!(parse(")", ")kick"), Some(Ok(Command::Kick)));
        assert_eq!(parse(")", ")BAN"), Some(Ok(Command::Ban)));
        assert_eq!(parse(")", ")status"), Some(Ok(Command::Status)));
    }

    #[test]
    fn test_name_hides_arguments() {
        let Some(Ok(command)) = parse(")", ")isc host 2302 hunter2 1 2") else {
            panic!("expected a command");
        };
        assert_eq!(command.name(), "initialize-bridge");
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(parse("!rb ", "!rb status"), Some(Ok(Command::Status)));
        assert_eq!(parse("!rb ", ")status"), None);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse(")", ")dance"),
            Some(Err(CommandError::Unknown("dance".into())))
        );
        assert_eq!(
            parse(")", ")"),
            Some(Err(CommandError::Unknown(String::new())))
        );
    }

    #[test]
    fn test_initialize_bridge_builds_config() {
        let Some(Ok(Command::InitializeBridge(setup))) = parse(
            ")",
            r#")initialize-bridge 203.0.113.5 9999 "pw" 1111 2222"#,
        ) else {
            panic!("expected initialize-bridge");
        };

        let config = setup.into_config(GuildId(42), ChannelId(3333));

        assert_eq!(config.server_address(), "203.0.113.5:9999");
        assert_eq!(config.rcon_password, "pw");
        assert_eq!(config.bridge_channel, ChannelId(1111));
        assert_eq!(config.moderation_channel, ChannelId(2222));
        assert_eq!(config.debug_channel, ChannelId(3333));
        assert_eq!(config.guild_id, GuildId(42));
    }

    #[test]
    fn test_isc_alias_accepts_channel_mentions() {
        let parsed = parse(")", ")isc example.org 2302 secret <#1111> <#2222>");
        let Some(Ok(Command::InitializeBridge(setup))) = parsed else {
            panic!("expected initialize-bridge, got {parsed:?}");
        };
        assert_eq!(setup.bridge_channel, ChannelId(1111));
        assert_eq!(setup.moderation_channel, ChannelId(2222));
    }

    #[test]
    fn test_initialize_bridge_rejects_bad_arguments() {
        let usage = Some(Err(CommandError::Usage(INITIALIZE_USAGE)));
        // Too few, too many.
        assert_eq!(parse(")", ")isc host 2302 pw 1111"), usage);
        assert_eq!(parse(")", ")isc host 2302 pw 1111 2222 3333"), usage);
        // Port not a number, out of range, zero.
        assert_eq!(parse(")", ")isc host port pw 1111 2222"), usage);
        assert_eq!(parse(")", ")isc host 70000 pw 1111 2222"), usage);
        assert_eq!(parse(")", ")isc host 0 pw 1111 2222"), usage);
        // Channels not ids.
        assert_eq!(parse(")", ")isc host 2302 pw bridge 2222"), usage);
        assert_eq!(parse(")", ")isc host 2302 pw 1111 #mods"), usage);
        // Empty password.
        assert_eq!(parse(")", r#")isc host 2302 "" 1111 2222"#), usage);
    }
}
