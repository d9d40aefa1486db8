// Binary packet codec.
//
// Every field is written at an explicit width, big-endian, in declaration
// order. Strings are a u8 length prefix followed by UTF-8 bytes; lists are a
// u8 count followed by the elements. There is no reflection and no schema —
// the encoder and decoder are written field by field so the wire layout is
// visible in the code.
//
// `decode` is total over arbitrary input: any malformed payload comes back
// as a `DecodeError`, never a panic. Trailing bytes after a payload are an
// error too — a well-formed peer never produces them.

use std::fmt;

use crate::packet::{Packet, PlayerEntry, kind};
use crate::types::{HEADER_SIZE, MAX_CHAT_LEN, MAX_NAME_LEN, MAX_PACKET_SIZE, PlayerId};

/// Why a payload failed to decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The kind tag matches no known packet.
    UnknownKind(u16),
    /// The payload ended before the packet's fields did.
    Truncated,
    /// A string field was not valid UTF-8 or exceeded its length cap.
    BadText,
    /// Bytes were left over after all fields were read.
    TrailingBytes,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownKind(tag) => write!(f, "unknown packet kind 0x{tag:04x}"),
            DecodeError::Truncated => write!(f, "payload truncated"),
            DecodeError::BadText => write!(f, "bad string field"),
            DecodeError::TrailingBytes => write!(f, "trailing bytes after payload"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Payload reader
// ---------------------------------------------------------------------------

struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Truncated)?;
        if end > self.buf.len() {
            return Err(DecodeError::Truncated);
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// u8 length prefix, then UTF-8 bytes, capped at `max` bytes.
    fn string(&mut self, max: usize) -> Result<String, DecodeError> {
        let len = self.u8()? as usize;
        if len > max {
            return Err(DecodeError::BadText);
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::BadText)
    }

    fn finish(self) -> Result<(), DecodeError> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes)
        }
    }
}

// ---------------------------------------------------------------------------
// Payload writer
// ---------------------------------------------------------------------------

fn put_string(out: &mut Vec<u8>, text: &str, max: usize) {
    // Encoding truncates at the cap; decoders reject anything longer.
    let bytes = truncated(text, max);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

/// Longest prefix of `text` that fits in `max` bytes on a char boundary.
fn truncated(text: &str, max: usize) -> &[u8] {
    if text.len() <= max {
        return text.as_bytes();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text.as_bytes()[..end]
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Encode a packet into a complete frame: header, then payload.
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut payload = Vec::new();
    match packet {
        Packet::Login { version, name } => {
            payload.extend_from_slice(&version.to_be_bytes());
            put_string(&mut payload, name, MAX_NAME_LEN);
        }
        Packet::Welcome { id } => payload.push(id.0),
        Packet::JoinDenied { reason } => payload.push(*reason),
        Packet::Roster { players } => {
            payload.push(players.len().min(u8::MAX as usize) as u8);
            for entry in players.iter().take(u8::MAX as usize) {
                payload.push(entry.id.0);
                put_string(&mut payload, &entry.name, MAX_NAME_LEN);
            }
        }
        Packet::PlayerJoined { id, name } => {
            payload.push(id.0);
            put_string(&mut payload, name, MAX_NAME_LEN);
        }
        Packet::PlayerLeft { id } => payload.push(id.0),
        Packet::EnterRoom { id } => payload.push(id.0),
        Packet::LeaveRoom { id } => payload.push(id.0),
        Packet::Logout { id } => payload.push(id.0),
        Packet::Chat { id, text } => {
            payload.push(id.0);
            put_string(&mut payload, text, MAX_CHAT_LEN);
        }
        Packet::SelectCursor { id, index } => {
            payload.push(id.0);
            payload.push(*index);
        }
        Packet::ConfirmCharacter { id, index } => {
            payload.push(id.0);
            payload.push(*index);
        }
        Packet::GameReady { id } => payload.push(id.0),
        Packet::ScheduleStart { countdown_ticks } => {
            payload.extend_from_slice(&countdown_ticks.to_be_bytes());
        }
        Packet::GameStart => {}
        Packet::SpawnGroup {
            axis,
            satellite,
            column,
        } => {
            payload.push(*axis);
            payload.push(*satellite);
            payload.push(*column);
        }
        Packet::BlockMove { dir } => payload.push(*dir),
        Packet::BlockRotate { dir } => payload.push(*dir),
        Packet::BlockFall { fast } => payload.push(*fast),
        Packet::BlockPush => {}
        Packet::BlockSettle {
            axis_x,
            axis_y,
            satellite_x,
            satellite_y,
        } => {
            payload.push(*axis_x);
            payload.push(*axis_y);
            payload.push(*satellite_x);
            payload.push(*satellite_y);
        }
        Packet::Combo { depth, garbage } => {
            payload.extend_from_slice(&depth.to_be_bytes());
            payload.extend_from_slice(&garbage.to_be_bytes());
        }
        Packet::Attack { amount } => payload.extend_from_slice(&amount.to_be_bytes()),
        Packet::Defend { amount } => payload.extend_from_slice(&amount.to_be_bytes()),
        Packet::AddIce { columns } => {
            payload.push(columns.len().min(u8::MAX as usize) as u8);
            payload.extend(columns.iter().take(u8::MAX as usize));
        }
        Packet::Lose { id } => payload.push(id.0),
        Packet::Restart => {}
    }

    let total = HEADER_SIZE + payload.len();
    // A frame over the size cap would be discarded by the receiver as a
    // framing violation; no packet should get near it.
    debug_assert!(
        total <= MAX_PACKET_SIZE as usize,
        "encoded frame of kind {:#06x} is {total} bytes",
        packet.kind()
    );
    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&(total as u32).to_be_bytes());
    frame.extend_from_slice(&packet.kind().to_be_bytes());
    frame.extend_from_slice(&payload);
    frame
}

/// Decode a payload against its kind tag.
pub fn decode(tag: u16, payload: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = PayloadReader::new(payload);
    let packet = match tag {
        kind::LOGIN => Packet::Login {
            version: r.u16()?,
            name: r.string(MAX_NAME_LEN)?,
        },
        kind::WELCOME => Packet::Welcome {
            id: PlayerId(r.u8()?),
        },
        kind::JOIN_DENIED => Packet::JoinDenied { reason: r.u8()? },
        kind::ROSTER => {
            let count = r.u8()?;
            let mut players = Vec::with_capacity(count as usize);
            for _ in 0..count {
                players.push(PlayerEntry {
                    id: PlayerId(r.u8()?),
                    name: r.string(MAX_NAME_LEN)?,
                });
            }
            Packet::Roster { players }
        }
        kind::PLAYER_JOINED => Packet::PlayerJoined {
            id: PlayerId(r.u8()?),
            name: r.string(MAX_NAME_LEN)?,
        },
        kind::PLAYER_LEFT => Packet::PlayerLeft {
            id: PlayerId(r.u8()?),
        },
        kind::ENTER_ROOM => Packet::EnterRoom {
            id: PlayerId(r.u8()?),
        },
        kind::LEAVE_ROOM => Packet::LeaveRoom {
            id: PlayerId(r.u8()?),
        },
        kind::LOGOUT => Packet::Logout {
            id: PlayerId(r.u8()?),
        },
        kind::CHAT => Packet::Chat {
            id: PlayerId(r.u8()?),
            text: r.string(MAX_CHAT_LEN)?,
        },
        kind::SELECT_CURSOR => Packet::SelectCursor {
            id: PlayerId(r.u8()?),
            index: r.u8()?,
        },
        kind::CONFIRM_CHARACTER => Packet::ConfirmCharacter {
            id: PlayerId(r.u8()?),
            index: r.u8()?,
        },
        kind::GAME_READY => Packet::GameReady {
            id: PlayerId(r.u8()?),
        },
        kind::SCHEDULE_START => Packet::ScheduleStart {
            countdown_ticks: r.u32()?,
        },
        kind::GAME_START => Packet::GameStart,
        kind::SPAWN_GROUP => Packet::SpawnGroup {
            axis: r.u8()?,
            satellite: r.u8()?,
            column: r.u8()?,
        },
        kind::BLOCK_MOVE => Packet::BlockMove { dir: r.u8()? },
        kind::BLOCK_ROTATE => Packet::BlockRotate { dir: r.u8()? },
        kind::BLOCK_FALL => Packet::BlockFall { fast: r.u8()? },
        kind::BLOCK_PUSH => Packet::BlockPush,
        kind::BLOCK_SETTLE => Packet::BlockSettle {
            axis_x: r.u8()?,
            axis_y: r.u8()?,
            satellite_x: r.u8()?,
            satellite_y: r.u8()?,
        },
        kind::COMBO => Packet::Combo {
            depth: r.u16()?,
            garbage: r.u16()?,
        },
        kind::ATTACK => Packet::Attack { amount: r.u16()? },
        kind::DEFEND => Packet::Defend { amount: r.u16()? },
        kind::ADD_ICE => {
            let count = r.u8()?;
            let columns = r.take(count as usize)?.to_vec();
            Packet::AddIce { columns }
        }
        kind::LOSE => Packet::Lose {
            id: PlayerId(r.u8()?),
        },
        kind::RESTART => Packet::Restart,
        other => return Err(DecodeError::UnknownKind(other)),
    };
    r.finish()?;
    Ok(packet)
}

/// Decode a complete frame (header plus payload) as produced by `encode` or
/// handed out by the frame buffer.
pub fn decode_frame(frame: &[u8]) -> Result<Packet, DecodeError> {
    if frame.len() < HEADER_SIZE {
        return Err(DecodeError::Truncated);
    }
    let size = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let tag = u16::from_be_bytes([frame[4], frame[5]]);
    if (size as usize) < HEADER_SIZE || size > MAX_PACKET_SIZE || size as usize != frame.len() {
        return Err(DecodeError::Truncated);
    }
    decode(tag, &frame[HEADER_SIZE..])
}
