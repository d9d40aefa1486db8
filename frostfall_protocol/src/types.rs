// Core wire-level types and limits.

use std::fmt;

/// Protocol version carried in `Login`. Bumped on any wire format change;
/// the server denies mismatched clients.
pub const PROTOCOL_VERSION: u16 = 1;

/// Byte length of the frame header: u32 total frame size + u16 packet kind,
/// both big-endian.
pub const HEADER_SIZE: usize = 6;

/// Maximum allowed total frame size. Every packet in this protocol is small
/// and fixed-shape; a larger declared size is a framing violation, not a big
/// packet.
pub const MAX_PACKET_SIZE: u32 = 512;

/// Maximum player name length in bytes.
pub const MAX_NAME_LEN: usize = 16;

/// Maximum chat text length in bytes.
pub const MAX_CHAT_LEN: usize = 64;

/// Server-assigned player identifier, unique per connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}
