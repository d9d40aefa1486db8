// End-to-end integration tests for the multiplayer pipeline.
//
// Each test starts a real server, connects real sessions, and verifies the
// full path: host → join → ready → countdown → inputs → packets → the
// opponent's mirror reproducing the same board.
//
// These tests exercise the same code paths as the live game (GameSession,
// NetClient, the packet codec) — the only test-specific code is the
// co-ticking harness in `multiplayer_tests`.

use frostfall_net::session::ClientStage;
use frostfall_sim::player::PlayerInput;
use frostfall_sim::types::{BlockKind, Cell, MoveDir, RotateDir};
use multiplayer_tests::{TestMatch, count_kind, first_draw, plant, HOST_SEED};

/// Two players connect; each learns the other's name from the roster or the
/// join announcement.
#[test]
fn lobby_join_and_roster() {
    let pair = TestMatch::connect();
    assert_eq!(pair.host.opponent().map(|(_, n)| n.to_string()), Some("guest".into()));
    assert_eq!(pair.guest.opponent().map(|(_, n)| n.to_string()), Some("host".into()));
    assert!(pair.host.local_id() < pair.guest.local_id());
}

/// Readiness from both sides runs the countdown and starts the match
/// everywhere: both local boards spawn, and each mirror picks up the
/// opponent's opening spawn.
#[test]
fn ready_flow_starts_the_match_everywhere() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    assert_eq!(pair.host.stage(), ClientStage::Game);
    assert_eq!(pair.guest.stage(), ClientStage::Game);
    assert!(pair.host.local.core.falling.is_some());
    assert!(pair.guest.local.core.falling.is_some());
    pair.run_until("mirrors to pick up the opening spawns", |host, guest| {
        host.remote.core.falling.is_some() && guest.remote.core.falling.is_some()
    });

    // The mirror shows the same kinds the opponent drew.
    let (axis, satellite) = first_draw(HOST_SEED);
    let mirrored = pair.guest.remote.core.falling.as_ref().unwrap();
    let host_arena = &pair.guest.remote.core.arena;
    assert_eq!(host_arena.get(mirrored.axis).map(|b| b.kind), Some(axis));
    assert_eq!(
        host_arena.get(mirrored.satellite).map(|b| b.kind),
        Some(satellite)
    );
}

/// A stream of inputs lands on the mirror in order, and only on the mirror:
/// the opponent's own board never echoes them back.
#[test]
fn inputs_mirror_without_echo() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    pair.host.handle_input(PlayerInput::Move(MoveDir::Left));
    pair.host.handle_input(PlayerInput::Move(MoveDir::Left));
    pair.host.handle_input(PlayerInput::Rotate(RotateDir::Clockwise));
    let local = pair.host.local.core.falling.as_ref().unwrap();
    let (expect_x, expect_rotation) = (local.axis_cell.x, local.rotation);
    assert_eq!(expect_x, 0);

    pair.run_until("the mirror to replay the inputs", |_, guest| {
        guest
            .remote
            .core
            .falling
            .as_ref()
            .is_some_and(|g| g.axis_cell.x == expect_x && g.rotation == expect_rotation)
    });
    // The guest's own group is untouched.
    let guest_own = pair.guest.local.core.falling.as_ref().unwrap();
    assert_eq!(guest_own.axis_cell.x, 2);
}

/// Hard-dropped groups settle at the authoritative cells on both sides;
/// after each settle the mirror's stationary board matches the original
/// exactly.
#[test]
fn settled_boards_stay_identical() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    for drop in 1..=3 {
        pair.host.handle_input(PlayerInput::Push);
        pair.run_until("the mirror to catch up after a settle", |host, guest| {
            host.local.core.falling.is_some()
                && !host.local.core.snapshot().is_empty()
                && guest.remote.core.snapshot() == host.local.core.snapshot()
        });
        assert!(
            !pair.host.local.core.snapshot().is_empty(),
            "board should hold blocks after drop {drop}"
        );
    }
}

/// A seeded four-group clears on the first drop: the attacker scores, the
/// forwarded ice crosses the wire, and the defender books it as pending
/// debt. Conservation holds on every copy of the economy.
#[test]
fn first_clear_attacks_across_the_wire() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    // Complete the axis block's group along the bottom row on the host's
    // board and on the guest's mirror of it.
    let (axis, _) = first_draw(HOST_SEED);
    for x in 3..6 {
        let cell = Cell { x, y: 12 };
        plant(&mut pair.host.local.core, cell, axis);
        plant(&mut pair.guest.remote.core, cell, axis);
    }

    pair.host.handle_input(PlayerInput::Push);
    pair.run_until("the attack to reach the guest", |_, guest| {
        guest.local.core.score.pending_ice > 0
    });

    let sent = pair.host.local.core.score.total_sent;
    assert!(sent >= 5, "a first clear at margin 8 sends at least 5, sent {sent}");
    assert_eq!(pair.guest.local.core.score.pending_ice, sent);
    // The host's mirror of the guest carries the same debt for display.
    assert_eq!(pair.host.remote.core.score.pending_ice, sent);
    assert!(pair.host.local.core.score.score >= 40);

    pair.run_until("the mirror to replay the clear", |host, guest| {
        guest.remote.core.score.score == host.local.core.score.score
    });
}

/// Pending debt turns into ice rows once the defender's group settles, and
/// the attacker's mirror drops the same ice in the same columns.
#[test]
fn pending_debt_falls_as_ice_on_both_copies() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    let (axis, _) = first_draw(HOST_SEED);
    for x in 3..6 {
        let cell = Cell { x, y: 12 };
        plant(&mut pair.host.local.core, cell, axis);
        plant(&mut pair.guest.remote.core, cell, axis);
    }
    pair.host.handle_input(PlayerInput::Push);
    pair.run_until("the attack to reach the guest", |_, guest| {
        guest.local.core.score.pending_ice > 0
    });
    let owed = pair.guest.local.core.score.pending_ice as usize;

    // Settle the guest's group; the debt materializes before its next spawn.
    pair.guest.handle_input(PlayerInput::Push);
    pair.run_until("ice to land on the guest's board", |_, guest| {
        count_kind(&guest.local.core, BlockKind::Ice) == owed
    });
    pair.run_until("ice to land on the host's mirror", |host, _| {
        count_kind(&host.remote.core, BlockKind::Ice) == owed
    });
    assert_eq!(pair.guest.local.core.score.pending_ice, 0);
}

/// The guest vanishing mid-game sends the host back to the room with no
/// opponent.
#[test]
fn disconnect_mid_game_returns_host_to_room() {
    let mut pair = TestMatch::connect();
    pair.begin_match();

    let TestMatch { mut host, guest } = pair;
    drop(guest);

    let deadline = std::time::Instant::now() + multiplayer_tests::POLL_TIMEOUT;
    while host.stage() != ClientStage::Room || host.opponent().is_some() {
        assert!(
            std::time::Instant::now() < deadline,
            "host never saw the disconnect"
        );
        host.tick(multiplayer_tests::DT);
        std::thread::sleep(multiplayer_tests::POLL_INTERVAL);
    }
}
