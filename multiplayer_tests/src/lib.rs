// Test harness for multiplayer integration tests.
//
// Wraps two real `GameSession`s (one hosting the server in-process, one
// joining over TCP) and co-ticks them so tests can drive a full match:
// host → join → ready → countdown → inputs → packets → mirrored boards.
//
// The only test-specific code here is the co-ticking loop and the board
// seeding helper. All networking and sim logic uses the same code paths as
// the real game.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::thread;
use std::time::{Duration, Instant};

use frostfall_net::session::{ClientStage, GameSession};
use frostfall_sim::block::Block;
use frostfall_sim::config::GameConfig;
use frostfall_sim::player::PlayerCore;
use frostfall_sim::prng::GameRng;
use frostfall_sim::types::{BlockKind, BlockState, Cell, MATCHABLE_KINDS};

/// Timeout for any blocking wait; generous for slow debug builds.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(15);

/// Wall-clock pause between co-ticks, to let reader threads run.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sim seconds per tick.
pub const DT: f32 = 1.0 / 60.0;

pub const HOST_SEED: u64 = 0xF057;
pub const GUEST_SEED: u64 = 0xCE11;

/// A hosting session and a guest session wired through a real server.
pub struct TestMatch {
    pub host: GameSession,
    pub guest: GameSession,
}

impl TestMatch {
    /// Start a server on a random port and connect both players.
    pub fn connect() -> Self {
        let (host, addr) = GameSession::host("host", GameConfig::default(), HOST_SEED, 0)
            .expect("hosting failed");
        let guest = GameSession::join(addr, "guest", GameConfig::default(), GUEST_SEED)
            .expect("joining failed");
        let mut pair = Self { host, guest };
        pair.run_until("host to see the guest", |host, _| host.opponent().is_some());
        pair
    }

    /// Tick both sessions until `check` passes, panicking on timeout.
    pub fn run_until<F>(&mut self, what: &str, mut check: F)
    where
        F: FnMut(&GameSession, &GameSession) -> bool,
    {
        let deadline = Instant::now() + POLL_TIMEOUT;
        while !check(&self.host, &self.guest) {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            self.host.tick(DT);
            self.guest.tick(DT);
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Tick both sessions a fixed number of times.
    pub fn run_ticks(&mut self, count: u32) {
        for _ in 0..count {
            self.host.tick(DT);
            self.guest.tick(DT);
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Ready both players and run through the countdown into the match.
    pub fn begin_match(&mut self) {
        self.host.mark_ready();
        self.guest.mark_ready();
        self.run_until("both players to reach the game", |host, guest| {
            host.stage() == ClientStage::Game && guest.stage() == ClientStage::Game
        });
    }
}

/// The first (axis, satellite) kinds a board with this seed will draw.
/// Mirrors the draw order of the live spawn path.
pub fn first_draw(seed: u64) -> (BlockKind, BlockKind) {
    let mut rng = GameRng::new(seed);
    let axis = BlockKind::from_draw(rng.below(MATCHABLE_KINDS));
    let satellite = BlockKind::from_draw(rng.below(MATCHABLE_KINDS));
    (axis, satellite)
}

/// Drop a stationary block straight onto a board, bypassing the fall. Used
/// to seed positions that would take many simulated seconds to build up.
pub fn plant(core: &mut PlayerCore, cell: Cell, kind: BlockKind) {
    let id = core
        .arena
        .insert(Block::new(kind, cell, BlockState::Stationary));
    core.board.place(cell, id, &mut core.arena);
}

/// Count stationary blocks of one kind on a board.
pub fn count_kind(core: &PlayerCore, kind: BlockKind) -> usize {
    core.snapshot()
        .iter()
        .filter(|(_, k)| *k == kind)
        .count()
}
