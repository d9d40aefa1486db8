// Packet dispatch onto the opponent mirror.
//
// Translates the raw bytes carried by gameplay packets back into sim types
// and applies them to the `RemotePlayer`. A byte outside its enum range is a
// logic fault from a misbehaving peer, not an I/O error, so it is logged and
// dropped rather than killing the connection.
//
// Economy packets are split: `Attack` targets the local board and `Combo` /
// `Defend` are informational, so the session handles those itself before
// calling in here.

use frostfall_protocol::packet::Packet;
use frostfall_sim::player::RemotePlayer;
use frostfall_sim::types::{BlockKind, Cell, MoveDir, RotateDir};

/// Apply one gameplay packet from the opponent to its mirror. Returns false
/// if the packet is not a mirror packet (or carried an invalid byte).
pub fn apply_to_mirror(remote: &mut RemotePlayer, packet: &Packet) -> bool {
    match packet {
        Packet::SpawnGroup {
            axis,
            satellite,
            column,
        } => {
            let (Some(axis), Some(satellite)) =
                (BlockKind::from_wire(*axis), BlockKind::from_wire(*satellite))
            else {
                log_fault("spawn with unknown block kind");
                return false;
            };
            remote.apply_spawn(axis, satellite, i32::from(*column));
            true
        }
        Packet::BlockMove { dir } => {
            let Some(dir) = MoveDir::from_wire(*dir) else {
                log_fault("move with unknown direction");
                return false;
            };
            remote.apply_move(dir);
            true
        }
        Packet::BlockRotate { dir } => {
            let Some(dir) = RotateDir::from_wire(*dir) else {
                log_fault("rotate with unknown direction");
                return false;
            };
            remote.apply_rotate(dir);
            true
        }
        Packet::BlockFall { fast } => {
            remote.apply_fast(*fast != 0);
            true
        }
        Packet::BlockPush => {
            remote.apply_push();
            true
        }
        Packet::BlockSettle {
            axis_x,
            axis_y,
            satellite_x,
            satellite_y,
        } => {
            let axis = Cell {
                x: i32::from(*axis_x),
                y: i32::from(*axis_y),
            };
            let satellite = Cell {
                x: i32::from(*satellite_x),
                y: i32::from(*satellite_y),
            };
            remote.apply_settle(axis, satellite);
            true
        }
        Packet::AddIce { columns } => {
            let columns = columns.iter().map(|&c| i32::from(c)).collect();
            remote.apply_add_ice(columns);
            true
        }
        Packet::Lose { .. } => {
            remote.apply_lose();
            true
        }
        _ => false,
    }
}

fn log_fault(what: &str) {
    eprintln!("[dispatch] dropping packet: {what}");
}

#[cfg(test)]
mod tests {
    use frostfall_sim::config::GameConfig;
    use frostfall_sim::types::GamePhase;

    use super::*;

    fn mirror() -> RemotePlayer {
        let mut remote = RemotePlayer::new(GameConfig::default());
        remote.start();
        remote
    }

    #[test]
    fn spawn_then_move_tracks_the_group() {
        let mut remote = mirror();
        assert!(apply_to_mirror(
            &mut remote,
            &Packet::SpawnGroup {
                axis: 0,
                satellite: 1,
                column: 2,
            }
        ));
        assert!(apply_to_mirror(&mut remote, &Packet::BlockMove { dir: 0 }));
        let group = remote.core.falling.as_ref().expect("group should be falling");
        assert_eq!(group.axis_cell.x, 1);
    }

    #[test]
    fn unknown_block_kind_is_dropped() {
        let mut remote = mirror();
        assert!(!apply_to_mirror(
            &mut remote,
            &Packet::SpawnGroup {
                axis: 9,
                satellite: 1,
                column: 2,
            }
        ));
        assert!(remote.core.falling.is_none());
    }

    #[test]
    fn unknown_direction_is_dropped() {
        let mut remote = mirror();
        apply_to_mirror(
            &mut remote,
            &Packet::SpawnGroup {
                axis: 0,
                satellite: 1,
                column: 2,
            },
        );
        assert!(!apply_to_mirror(&mut remote, &Packet::BlockMove { dir: 7 }));
        let group = remote
            .core
            .falling
            .as_ref()
            .expect("group should still be falling");
        assert_eq!(group.axis_cell.x, 2);
    }

    #[test]
    fn lose_ends_the_mirror_game() {
        let mut remote = mirror();
        assert!(apply_to_mirror(
            &mut remote,
            &Packet::Lose {
                id: frostfall_protocol::PlayerId(1)
            }
        ));
        assert_eq!(remote.core.phase, GamePhase::GameOver);
    }

    #[test]
    fn non_mirror_packets_are_refused() {
        let mut remote = mirror();
        assert!(!apply_to_mirror(&mut remote, &Packet::GameStart));
        assert!(!apply_to_mirror(&mut remote, &Packet::Attack { amount: 3 }));
    }
}
