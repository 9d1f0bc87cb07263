//! Parsers for BattlEye's tabular command output.
//!
//! The server answers `players`, `admins`, and `bans` with human-readable
//! tables. Header, separator, and summary lines never start with a number,
//! so every line whose first column is not a slot number is skipped.

use rconbridge_protocol::{AdminRecord, BanRecord, PlayerRecord};

const LOBBY_SUFFIX: &str = " (Lobby)";

/// Parses the output of the `players` command.
///
/// ```text
/// Players on server:
/// [#] [IP Address]:[Port] [Ping] [GUID] [Name]
/// --------------------------------------------------
/// 0   198.51.100.4:2304     47   0123456789abcdef0123456789abcdef(OK) Raider
/// 1   198.51.100.9:2304     -1   -                                     Newbie (Lobby)
/// (2 players in total)
/// ```
pub fn parse_players(output: &str) -> Vec<PlayerRecord> {
    output.lines().filter_map(parse_player_line).collect()
}

fn parse_player_line(line: &str) -> Option<PlayerRecord> {
    let (id, rest) = next_column(line)?;
    let id = id.parse::<u32>().ok()?;
    let (address, rest) = next_column(rest)?;
    let (ping, rest) = next_column(rest)?;
    let (guid, rest) = next_column(rest)?;

    let (guid, verified) = match guid.split_once('(') {
        Some((guid, status)) => (guid, status.starts_with("OK")),
        None => (guid, false),
    };

    let name = rest.trim();
    let (name, lobby) = match name.strip_suffix(LOBBY_SUFFIX) {
        Some(name) => (name, true),
        None => (name, false),
    };

    Some(PlayerRecord {
        id,
        address: address.to_string(),
        // Lobby players report a ping of -1.
        ping: ping.parse().unwrap_or(0),
        guid: guid.to_string(),
        verified,
        name: name.to_string(),
        lobby,
    })
}

/// Parses the output of the `admins` command.
pub fn parse_admins(output: &str) -> Vec<AdminRecord> {
    output
        .lines()
        .filter_map(|line| {
            let (id, rest) = next_column(line)?;
            let id = id.parse::<u32>().ok()?;
            let (address, _) = next_column(rest)?;
            Some(AdminRecord {
                id,
                address: address.to_string(),
            })
        })
        .collect()
}

/// Parses the output of the `bans` command (both GUID and IP sections).
///
/// The minutes column is `perm` for permanent bans.
pub fn parse_bans(output: &str) -> Vec<BanRecord> {
    output
        .lines()
        .filter_map(|line| {
            let (id, rest) = next_column(line)?;
            let id = id.parse::<u32>().ok()?;
            let (target, rest) = next_column(rest)?;
            let (minutes, rest) = next_column(rest)?;
            let minutes_left = if minutes.eq_ignore_ascii_case("perm") {
                None
            } else {
                Some(minutes.parse::<u64>().unwrap_or(0))
            };
            Some(BanRecord {
                id,
                target: target.to_string(),
                minutes_left,
                reason: rest.trim().to_string(),
            })
        })
        .collect()
}

/// Splits off the first whitespace-delimited column.
fn next_column(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], &s[at..]),
        None => (s, ""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYERS: &str = "Players on server:\n\
        [#] [IP Address]:[Port] [Ping] [GUID] [Name]\n\
        --------------------------------------------------\n\
        0   198.51.100.4:2304     47   0123456789abcdef0123456789abcdef(OK) Raider\n\
        7   198.51.100.7:2304     63   fedcba9876543210fedcba9876543210(?) Sir Lags A Lot\n\
        9   198.51.100.9:2304     -1   -  Newbie (Lobby)\n\
        (3 players in total)";

    #[test]
    fn test_parse_players_skips_headers_and_totals() {
        let players = parse_players(PLAYERS);
        assert_eq!(players.len(), 3);
        assert_eq!(players[0].id, 0);
        assert_eq!(players[0].name, "Raider");
        assert_eq!(players[0].guid, "0123456789abcdef0123456789abcdef");
        assert!(players[0].verified);
        assert_eq!(players[0].ping, 47);
    }

    #[test]
    fn test_parse_players_keeps_spaces_in_names() {
        let players = parse_players(PLAYERS);
        assert_eq!(players[1].id, 7);
        assert_eq!(players[1].name, "Sir Lags A Lot");
        assert!(!players[1].verified);
    }

    #[test]
    fn test_parse_players_marks_lobby() {
        let players = parse_players(PLAYERS);
        assert_eq!(players[2].name, "Newbie");
        assert!(players[2].lobby);
        assert_eq!(players[2].ping, 0);
    }

    #[test]
    fn test_parse_players_empty_server() {
        let out = "Players on server:\n[#] [IP Address]:[Port] [Ping] [GUID] [Name]\n---\n(0 players in total)";
        assert!(parse_players(out).is_empty());
    }

    #[test]
    fn test_parse_admins() {
        let out = "Connected RCon admins:\n[#] [IP Address]:[Port]\n-----\n0 203.0.113.9:2306\n1 203.0.113.10:2306";
        let admins = parse_admins(out);
        assert_eq!(admins.len(), 2);
        assert_eq!(admins[1].address, "203.0.113.10:2306");
    }

    #[test]
    fn test_parse_bans_both_sections() {
        let out = "GUID Bans:\n\
            [#] [GUID] [Minutes left] [Reason]\n\
            ----------------------------------------\n\
            0  0123456789abcdef0123456789abcdef perm Cheating\n\
            1  fedcba9876543210fedcba9876543210 120 Toxic chat\n\
            \n\
            IP Bans:\n\
            [#] [IP Address] [Minutes left] [Reason]\n\
            ----------------------------------------------\n\
            2  203.0.113.7 perm VPN";
        let bans = parse_bans(out);
        assert_eq!(bans.len(), 3);
        assert!(bans[0].is_permanent());
        assert_eq!(bans[1].minutes_left, Some(120));
        assert_eq!(bans[1].reason, "Toxic chat");
        assert_eq!(bans[2].target, "203.0.113.7");
    }
}
