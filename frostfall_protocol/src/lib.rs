// frostfall_protocol — wire protocol for two-player matches.
//
// This crate defines the packet set, the binary codec, and the frame
// reassembly used by the game server (`frostfall_net`) and its clients to
// communicate over TCP. It is shared between both sides and has no
// dependency on the sim crate.
//
// Module overview:
// - `types.rs`:   `PlayerId`, the protocol version, and wire size limits.
// - `packet.rs`:  The `Packet` enum — every message in both directions, with
//                 fixed 16-bit kind tags grouped into bands by concern.
// - `codec.rs`:   Field-by-field big-endian encode/decode, total over
//                 arbitrary input.
// - `framing.rs`: `FrameBuffer` stream reassembly plus blocking read/write
//                 helpers. Header is a u32 total size and u16 kind tag.
//
// Design decisions:
// - **Explicit binary layout.** Every field width is written out in the
//   codec; there is no derive-based serialization to drift out of sync with
//   the documented wire format.
// - **Raw integers at the boundary.** Packets carry directions, block kinds,
//   and cells as plain `u8` — the net layer converts to sim enums and treats
//   a bad byte as a no-op logic fault.
// - **No async runtime.** `std::io::Read`/`Write` framing, compatible with
//   blocking TCP streams and buffered wrappers.

pub mod codec;
pub mod framing;
pub mod packet;
pub mod types;

pub use codec::{DecodeError, decode, decode_frame, encode};
pub use framing::{FrameBuffer, FrameStep, read_frame, write_packet};
pub use packet::{Packet, PlayerEntry, deny_reason, kind};
pub use types::{
    HEADER_SIZE, MAX_CHAT_LEN, MAX_NAME_LEN, MAX_PACKET_SIZE, PROTOCOL_VERSION, PlayerId,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode, reassemble through a FrameBuffer, decode, compare.
    fn roundtrip(packet: &Packet) {
        let wire = encode(packet);
        let mut buffer = FrameBuffer::new();
        buffer.extend(&wire);
        let FrameStep::Frame(frame) = buffer.next_frame() else {
            panic!("no frame for {packet:?}");
        };
        assert_eq!(decode_frame(&frame).as_ref(), Ok(packet));
    }

    #[test]
    fn roundtrip_login() {
        roundtrip(&Packet::Login {
            version: PROTOCOL_VERSION,
            name: "frosty".into(),
        });
    }

    #[test]
    fn roundtrip_welcome() {
        roundtrip(&Packet::Welcome { id: PlayerId(1) });
    }

    #[test]
    fn roundtrip_join_denied() {
        roundtrip(&Packet::JoinDenied {
            reason: deny_reason::SESSION_FULL,
        });
    }

    #[test]
    fn roundtrip_roster() {
        roundtrip(&Packet::Roster {
            players: vec![
                PlayerEntry {
                    id: PlayerId(0),
                    name: "host".into(),
                },
                PlayerEntry {
                    id: PlayerId(1),
                    name: "guest".into(),
                },
            ],
        });
        roundtrip(&Packet::Roster { players: vec![] });
    }

    #[test]
    fn roundtrip_membership() {
        roundtrip(&Packet::PlayerJoined {
            id: PlayerId(2),
            name: "latecomer".into(),
        });
        roundtrip(&Packet::PlayerLeft { id: PlayerId(2) });
        roundtrip(&Packet::EnterRoom { id: PlayerId(0) });
        roundtrip(&Packet::LeaveRoom { id: PlayerId(0) });
        roundtrip(&Packet::Logout { id: PlayerId(1) });
    }

    #[test]
    fn roundtrip_chat() {
        roundtrip(&Packet::Chat {
            id: PlayerId(0),
            text: "good luck, have fun".into(),
        });
    }

    #[test]
    fn roundtrip_character_select() {
        roundtrip(&Packet::SelectCursor {
            id: PlayerId(1),
            index: 3,
        });
        roundtrip(&Packet::ConfirmCharacter {
            id: PlayerId(1),
            index: 3,
        });
    }

    #[test]
    fn roundtrip_match_setup() {
        roundtrip(&Packet::GameReady { id: PlayerId(0) });
        roundtrip(&Packet::ScheduleStart {
            countdown_ticks: 90,
        });
        roundtrip(&Packet::GameStart);
        roundtrip(&Packet::SpawnGroup {
            axis: 0,
            satellite: 4,
            column: 2,
        });
    }

    #[test]
    fn roundtrip_block_actions() {
        roundtrip(&Packet::BlockMove { dir: 1 });
        roundtrip(&Packet::BlockRotate { dir: 0 });
        roundtrip(&Packet::BlockFall { fast: 1 });
        roundtrip(&Packet::BlockPush);
        roundtrip(&Packet::BlockSettle {
            axis_x: 2,
            axis_y: 12,
            satellite_x: 2,
            satellite_y: 11,
        });
    }

    #[test]
    fn roundtrip_economy() {
        roundtrip(&Packet::Combo {
            depth: 3,
            garbage: 7,
        });
        roundtrip(&Packet::Attack { amount: 5 });
        roundtrip(&Packet::Defend { amount: 2 });
        roundtrip(&Packet::AddIce {
            columns: vec![0, 3, 5, 1],
        });
        roundtrip(&Packet::AddIce { columns: vec![] });
    }

    #[test]
    fn roundtrip_match_end() {
        roundtrip(&Packet::Lose { id: PlayerId(1) });
        roundtrip(&Packet::Restart);
    }
}
