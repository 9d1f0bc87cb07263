//! BattlEye RCon datagram codec.
//!
//! Every datagram has the same frame:
//!
//! ```text
//! ┌──────┬────────────────┬──────┬──────┬─────────────┐
//! │ "BE" │ CRC32 (LE, 4B) │ 0xFF │ type │ payload ... │
//! └──────┴────────────────┴──────┴──────┴─────────────┘
//!              └─ checksum of everything from 0xFF on
//! ```
//!
//! | type | client → server        | server → client                      |
//! |------|------------------------|--------------------------------------|
//! | 0x00 | login (password)       | login result (1 = ok, 0 = rejected)  |
//! | 0x01 | command (seq, text)    | command reply (seq, [multipart], text)|
//! | 0x02 | ack of server message  | server message (seq, text)           |
//!
//! An empty command is the keepalive. Long replies are split into parts,
//! each prefixed with `0x00, total, index`.

use crate::TransportError;

const HEADER: &[u8; 2] = b"BE";
const MARKER: u8 = 0xFF;
const FRAME_LEN: usize = 8;

const TYPE_LOGIN: u8 = 0x00;
const TYPE_COMMAND: u8 = 0x01;
const TYPE_SERVER_MESSAGE: u8 = 0x02;

/// Header of one part of a multi-part command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub total: u8,
    pub index: u8,
}

/// Datagrams the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    Login { password: String },
    Command { seq: u8, command: String },
    /// Acknowledges a [`ServerPacket::Message`] with the same sequence.
    Ack { seq: u8 },
}

/// Datagrams the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerPacket {
    Login { ok: bool },
    Reply {
        seq: u8,
        part: Option<Part>,
        body: Vec<u8>,
    },
    Message { seq: u8, text: String },
}

impl ClientPacket {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Login { password } => frame(TYPE_LOGIN, password.as_bytes()),
            Self::Command { seq, command } => {
                let mut payload = Vec::with_capacity(1 + command.len());
                payload.push(*seq);
                payload.extend_from_slice(command.as_bytes());
                frame(TYPE_COMMAND, &payload)
            }
            Self::Ack { seq } => frame(TYPE_SERVER_MESSAGE, &[*seq]),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, TransportError> {
        let (kind, payload) = unframe(data)?;
        match kind {
            TYPE_LOGIN => Ok(Self::Login {
                password: String::from_utf8_lossy(payload).into_owned(),
            }),
            TYPE_COMMAND => {
                let (&seq, rest) = payload
                    .split_first()
                    .ok_or_else(|| invalid("command without sequence"))?;
                Ok(Self::Command {
                    seq,
                    command: String::from_utf8_lossy(rest).into_owned(),
                })
            }
            TYPE_SERVER_MESSAGE => {
                let &seq = payload
                    .first()
                    .ok_or_else(|| invalid("ack without sequence"))?;
                Ok(Self::Ack { seq })
            }
            other => Err(invalid(&format!("unknown packet type {other:#04x}"))),
        }
    }
}

impl ServerPacket {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Login { ok } => frame(TYPE_LOGIN, &[u8::from(*ok)]),
            Self::Reply { seq, part, body } => {
                let mut payload = Vec::with_capacity(4 + body.len());
                payload.push(*seq);
                if let Some(part) = part {
                    payload.extend_from_slice(&[0x00, part.total, part.index]);
                }
                payload.extend_from_slice(body);
                frame(TYPE_COMMAND, &payload)
            }
            Self::Message { seq, text } => {
                let mut payload = Vec::with_capacity(1 + text.len());
                payload.push(*seq);
                payload.extend_from_slice(text.as_bytes());
                frame(TYPE_SERVER_MESSAGE, &payload)
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, TransportError> {
        let (kind, payload) = unframe(data)?;
        match kind {
            TYPE_LOGIN => {
                let &result = payload
                    .first()
                    .ok_or_else(|| invalid("login reply without result"))?;
                Ok(Self::Login { ok: result == 0x01 })
            }
            TYPE_COMMAND => {
                let (&seq, rest) = payload
                    .split_first()
                    .ok_or_else(|| invalid("reply without sequence"))?;
                // Command output is text, so a leading NUL can only be
                // the multi-part header.
                if let [0x00, total, index, body @ ..] = rest {
                    if *total == 0 || index >= total {
                        return Err(invalid("multi-part index out of range"));
                    }
                    return Ok(Self::Reply {
                        seq,
                        part: Some(Part {
                            total: *total,
                            index: *index,
                        }),
                        body: body.to_vec(),
                    });
                }
                Ok(Self::Reply {
                    seq,
                    part: None,
                    body: rest.to_vec(),
                })
            }
            TYPE_SERVER_MESSAGE => {
                let (&seq, rest) = payload
                    .split_first()
                    .ok_or_else(|| invalid("message without sequence"))?;
                Ok(Self::Message {
                    seq,
                    text: String::from_utf8_lossy(rest).into_owned(),
                })
            }
            other => Err(invalid(&format!("unknown packet type {other:#04x}"))),
        }
    }
}

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + payload.len());
    body.push(MARKER);
    body.push(kind);
    body.extend_from_slice(payload);

    let crc = crc32fast::hash(&body);
    let mut out = Vec::with_capacity(6 + body.len());
    out.extend_from_slice(HEADER);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Validates the frame and returns `(type, payload)`.
fn unframe(data: &[u8]) -> Result<(u8, &[u8]), TransportError> {
    if data.len() < FRAME_LEN {
        return Err(invalid("datagram shorter than header"));
    }
    if &data[..2] != HEADER {
        return Err(invalid("missing BE header"));
    }
    let expected = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);
    let body = &data[6..];
    if crc32fast::hash(body) != expected {
        return Err(invalid("checksum mismatch"));
    }
    if body[0] != MARKER {
        return Err(invalid("missing 0xFF marker"));
    }
    Ok((body[1], &body[2..]))
}

fn invalid(reason: &str) -> TransportError {
    TransportError::InvalidPacket(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive_is_empty_command() {
        let bytes = ClientPacket::Command {
            seq: 3,
            command: String::new(),
        }
        .encode();
        // "BE" + crc + 0xFF + type + seq
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[..2], b"BE");
        assert_eq!(&bytes[6..], &[0xFF, 0x01, 0x03]);
    }

    #[test]
    fn test_crc_covers_marker_and_payload() {
        let bytes = ClientPacket::Login {
            password: "pw".into(),
        }
        .encode();
        let crc = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        assert_eq!(crc, crc32fast::hash(&[0xFF, 0x00, b'p', b'w']));
    }

    #[test]
    fn test_login_reply_decodes_result() {
        let ok = ServerPacket::decode(&ServerPacket::Login { ok: true }.encode()).unwrap();
        assert_eq!(ok, ServerPacket::Login { ok: true });
        let rejected = ServerPacket::decode(&frame(TYPE_LOGIN, &[0x00])).unwrap();
        assert_eq!(rejected, ServerPacket::Login { ok: false });
    }

    #[test]
    fn test_multipart_reply_header_is_parsed() {
        let raw = frame(TYPE_COMMAND, &[9, 0x00, 3, 1, b'h', b'i']);
        let packet = ServerPacket::decode(&raw).unwrap();
        assert_eq!(
            packet,
            ServerPacket::Reply {
                seq: 9,
                part: Some(Part { total: 3, index: 1 }),
                body: b"hi".to_vec(),
            }
        );
    }

    #[test]
    fn test_multipart_index_out_of_range_is_rejected() {
        let raw = frame(TYPE_COMMAND, &[9, 0x00, 2, 2]);
        assert!(ServerPacket::decode(&raw).is_err());
    }

    #[test]
    fn test_server_message_decodes_text() {
        let raw = frame(TYPE_SERVER_MESSAGE, b"\x04(Global) Raider: hi");
        let packet = ServerPacket::decode(&raw).unwrap();
        assert_eq!(
            packet,
            ServerPacket::Message {
                seq: 4,
                text: "(Global) Raider: hi".into(),
            }
        );
    }

    #[test]
    fn test_ack_echoes_sequence() {
        let bytes = ClientPacket::Ack { seq: 4 }.encode();
        assert_eq!(&bytes[6..], &[0xFF, 0x02, 0x04]);
        assert_eq!(ClientPacket::decode(&bytes).unwrap(), ClientPacket::Ack { seq: 4 });
    }

    #[test]
    fn test_corrupted_checksum_is_rejected() {
        let mut bytes = ServerPacket::Login { ok: true }.encode();
        bytes[2] ^= 0xAA;
        let err = ServerPacket::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_short_and_foreign_datagrams_are_rejected() {
        assert!(ServerPacket::decode(b"BE").is_err());
        assert!(ServerPacket::decode(b"XX\0\0\0\0\xFF\0\x01").is_err());
    }
}
