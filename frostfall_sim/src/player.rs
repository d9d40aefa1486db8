// Player phase machine and the Local/Remote split.
//
// `PlayerCore` owns one board and drives the deterministic part of a match:
// falling-group descent, gravity, shatter timers, ice drops, and the match
// scan once everything is at rest. It knows nothing about scoring decisions
// or the network.
//
// Two specializations wrap the core:
// - `LocalPlayer` is authoritative for its own board. It owns the PRNG, turns
//   player input into moves, resolves the economy on every cleared wave, and
//   reports every originated action as a `PlayerAction` for broadcast.
// - `RemotePlayer` mirrors the opponent. It never draws randomness and never
//   lands its own falling group — spawn kinds, ice columns, and landing cells
//   all arrive over the wire via the `apply_*` methods. Everything downstream
//   of a landing (gravity, matches, shatter) replays deterministically from
//   the same board state.
//
// **Critical constraint: mirroring.** Any behavior added here must either be
// a pure function of board state (safe on both sides) or originate on the
// Local side and cross the wire as an action. A mirror that invents state
// diverges silently.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockArena};
use crate::board::BoardGrid;
use crate::config::GameConfig;
use crate::falling::FallingGroup;
use crate::gravity;
use crate::match_engine::{self, MatchResult};
use crate::prng::GameRng;
use crate::score::ScoreState;
use crate::types::{
    BOARD_WIDTH, BlockKind, BlockState, Cell, GamePhase, MATCHABLE_KINDS, MoveDir, RotateDir,
};

// ---------------------------------------------------------------------------
// Inputs and broadcast actions
// ---------------------------------------------------------------------------

/// Raw player input, fed to `LocalPlayer::handle_input`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerInput {
    Move(MoveDir),
    Rotate(RotateDir),
    FastFall(bool),
    Push,
}

/// An action originated by the Local player, to be broadcast to the peer.
/// The network layer encodes these into packets; the peer's `RemotePlayer`
/// replays them.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerAction {
    Spawn {
        axis: BlockKind,
        satellite: BlockKind,
        column: i32,
    },
    Move(MoveDir),
    Rotate(RotateDir),
    FastFall(bool),
    Push,
    /// Authoritative landing cells for the falling group.
    Settle { axis: Cell, satellite: Cell },
    /// A wave cleared at this chain depth, producing this much raw ice.
    Combo { depth: u32, garbage: u32 },
    /// Portion of produced ice spent cancelling our own pending debt.
    Defend(u32),
    /// Portion of produced ice sent at the opponent.
    Attack(u32),
    /// Ice drop order for our own board, column by column.
    AddIce { columns: Vec<i32> },
    Lose,
}

/// What one core tick observed.
#[derive(Clone, Debug)]
enum CoreEvent {
    /// The falling group landed at these cells (authoritative side only).
    Landed { axis: Cell, satellite: Cell },
    /// The board settled and the scan found these groups.
    WaveCleared(MatchResult),
    /// The board settled with nothing left to clear.
    Settled,
}

// ---------------------------------------------------------------------------
// PlayerCore
// ---------------------------------------------------------------------------

/// One board's deterministic state machine, shared by both sides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerCore {
    pub config: GameConfig,
    pub board: BoardGrid,
    pub arena: BlockArena,
    pub falling: Option<FallingGroup>,
    pub score: ScoreState,
    pub phase: GamePhase,
    /// Match clock in seconds; feeds the margin table.
    pub elapsed: f32,
    /// Authoritative boards land their own falling group; mirrors hold at
    /// the obstruction and wait for the settle report.
    authoritative: bool,
    ice_queue: VecDeque<i32>,
    ice_timer: f32,
    /// Something moved or vanished since the last match scan.
    needs_scan: bool,
}

impl PlayerCore {
    fn new(config: GameConfig, authoritative: bool) -> Self {
        Self {
            config,
            board: BoardGrid::new(),
            arena: BlockArena::new(),
            falling: None,
            score: ScoreState::new(),
            phase: GamePhase::Standing,
            elapsed: 0.0,
            authoritative,
            ice_queue: VecDeque::new(),
            ice_timer: 0.0,
            needs_scan: false,
        }
    }

    fn start(&mut self) {
        self.phase = GamePhase::Playing;
        self.elapsed = 0.0;
    }

    fn reset(&mut self) {
        self.board.clear();
        self.arena.clear();
        self.falling = None;
        self.score = ScoreState::new();
        self.phase = GamePhase::Standing;
        self.elapsed = 0.0;
        self.ice_queue.clear();
        self.ice_timer = 0.0;
        self.needs_scan = false;
    }

    /// Spawn a new falling group. Returns `false` when the spawn cells are
    /// blocked — the board has toppled.
    fn spawn_group(&mut self, axis_kind: BlockKind, satellite_kind: BlockKind, column: i32) -> bool {
        let axis_cell = Cell::new(column, 1);
        let satellite_cell = Cell::new(column, 0);
        if !self.board.is_free(axis_cell) || !self.board.is_free(satellite_cell) {
            self.phase = GamePhase::GameOver;
            return false;
        }
        let axis = self
            .arena
            .insert(Block::new(axis_kind, axis_cell, BlockState::Playing));
        let satellite =
            self.arena
                .insert(Block::new(satellite_kind, satellite_cell, BlockState::Playing));
        self.falling = Some(FallingGroup::spawn(axis, satellite, column));
        self.score.reset_combo();
        self.phase = GamePhase::Playing;
        true
    }

    fn queue_ice(&mut self, columns: Vec<i32>) {
        if columns.is_empty() {
            return;
        }
        self.ice_queue.extend(columns);
        self.ice_timer = 0.0;
        self.phase = GamePhase::IceBlocking;
    }

    /// Advance the board by `dt` seconds.
    fn update(&mut self, dt: f32) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        if matches!(self.phase, GamePhase::Standing | GamePhase::GameOver) {
            return events;
        }
        self.elapsed += dt;

        self.tick_timers(dt);
        self.tick_ice(dt);

        if let Some(mut group) = self.falling.take() {
            if self.authoritative {
                if group.update(&mut self.board, &mut self.arena, &self.config.fall, dt) {
                    self.needs_scan = true;
                    events.push(CoreEvent::Landed {
                        axis: group.axis_cell,
                        satellite: group.satellite_cell(),
                    });
                } else {
                    self.falling = Some(group);
                }
            } else {
                group.update_held(&self.board, &mut self.arena, &self.config.fall, dt);
                self.falling = Some(group);
            }
        }

        let settled = gravity::run(&mut self.board, &mut self.arena, &self.config.gravity, dt);
        if !settled.is_empty() {
            self.needs_scan = true;
        }

        if self.needs_scan && self.is_quiescent() {
            self.needs_scan = false;
            let result = match_engine::find_matches(&self.board, &self.arena);
            if result.is_empty() {
                self.phase = GamePhase::Playing;
                events.push(CoreEvent::Settled);
            } else {
                self.begin_shatter(&result);
                self.phase = GamePhase::Shattering;
                events.push(CoreEvent::WaveCleared(result));
            }
        }
        events
    }

    /// No falling group, no queued ice, and every block at rest.
    fn is_quiescent(&self) -> bool {
        self.falling.is_none()
            && self.ice_queue.is_empty()
            && !self.arena.any_in_state(BlockState::DownMoving)
            && !self.arena.any_in_state(BlockState::Destroying)
            && !self.arena.any_in_state(BlockState::Effecting)
    }

    fn begin_shatter(&mut self, result: &MatchResult) {
        for group in &result.groups {
            for &id in &group.members {
                if let Some(block) = self.arena.get_mut(id) {
                    block.state = BlockState::Destroying;
                    block.state_timer = self.config.timing.shatter_duration;
                }
            }
        }
        for &id in &result.melted {
            if let Some(block) = self.arena.get_mut(id) {
                block.state = BlockState::Effecting;
                block.state_timer = self.config.timing.melt_duration;
            }
        }
    }

    /// Count down `Effecting` and `Destroying` timers and sweep finished
    /// blocks off the board, waking the column above each vacated cell.
    fn tick_timers(&mut self, dt: f32) {
        for id in self.arena.ids() {
            let Some(block) = self.arena.get_mut(id) else {
                continue;
            };
            match block.state {
                BlockState::Effecting => {
                    block.state_timer -= dt;
                    if block.state_timer <= 0.0 {
                        block.state = BlockState::Destroying;
                        block.state_timer = self.config.timing.shatter_duration;
                    }
                }
                BlockState::Destroying => {
                    block.state_timer -= dt;
                    if block.state_timer <= 0.0 {
                        block.state = BlockState::PlayOut;
                    }
                }
                _ => {}
            }
        }
        self.sweep_played_out();
    }

    fn sweep_played_out(&mut self) {
        let mut removed = Vec::new();
        for id in self.arena.ids() {
            let Some(block) = self.arena.get(id) else {
                continue;
            };
            if block.state != BlockState::PlayOut {
                continue;
            }
            let cell = block.cell;
            self.board.remove(cell);
            self.arena.remove(id);
            removed.push(cell);
        }
        for cell in &removed {
            // Wake the contiguous stationary run above the vacated cell.
            for y in (0..cell.y).rev() {
                let above = Cell::new(cell.x, y);
                let Some(id) = self.board.get(above) else {
                    break;
                };
                if let Some(block) = self.arena.get_mut(id) {
                    if block.state == BlockState::Stationary {
                        block.state = BlockState::DownMoving;
                    }
                }
            }
            self.board.recompute_adjacency(*cell, &mut self.arena);
        }
        if !removed.is_empty() {
            self.needs_scan = true;
        }
    }

    /// Release queued ice from the top of the board, one row per interval.
    fn tick_ice(&mut self, dt: f32) {
        if self.ice_queue.is_empty() {
            return;
        }
        self.ice_timer += dt;
        while self.ice_timer >= self.config.timing.ice_row_interval && !self.ice_queue.is_empty() {
            self.ice_timer -= self.config.timing.ice_row_interval;
            for _ in 0..BOARD_WIDTH {
                let Some(column) = self.ice_queue.pop_front() else {
                    break;
                };
                let cell = Cell::new(column, 0);
                if !self.board.is_free(cell) {
                    // Column full to the brim: the ice block is lost.
                    continue;
                }
                let id = self
                    .arena
                    .insert(Block::new(BlockKind::Ice, cell, BlockState::DownMoving));
                self.board.place(cell, id, &mut self.arena);
            }
        }
    }

    /// Stationary board contents, sorted by cell. Two mirrored boards must
    /// produce identical snapshots once both are at rest.
    pub fn snapshot(&self) -> Vec<(Cell, BlockKind)> {
        let mut cells: Vec<(Cell, BlockKind)> = self
            .arena
            .iter()
            .filter(|(_, b)| b.state == BlockState::Stationary)
            .map(|(_, b)| (b.cell, b.kind))
            .collect();
        cells.sort();
        cells
    }
}

// ---------------------------------------------------------------------------
// LocalPlayer
// ---------------------------------------------------------------------------

/// The authoritative side of a board. Owns the PRNG and originates every
/// action, pushing them into the caller's action buffer for broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalPlayer {
    pub core: PlayerCore,
    rng: GameRng,
}

impl LocalPlayer {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self {
            core: PlayerCore::new(config, true),
            rng: GameRng::new(seed),
        }
    }

    /// Begin the match: start the clock and spawn the first group.
    pub fn start(&mut self, actions: &mut Vec<PlayerAction>) {
        self.core.start();
        self.spawn(actions);
    }

    pub fn restart(&mut self) {
        self.core.reset();
    }

    fn spawn(&mut self, actions: &mut Vec<PlayerAction>) {
        let axis = BlockKind::from_draw(self.rng.below(MATCHABLE_KINDS));
        let satellite = BlockKind::from_draw(self.rng.below(MATCHABLE_KINDS));
        let column = self.core.config.fall.spawn_column;
        if self.core.spawn_group(axis, satellite, column) {
            actions.push(PlayerAction::Spawn {
                axis,
                satellite,
                column,
            });
        } else {
            actions.push(PlayerAction::Lose);
        }
    }

    /// Apply one player input. Refused inputs (blocked moves, rotations into
    /// walls) produce no action — the peer only hears about what happened.
    pub fn handle_input(&mut self, input: PlayerInput, actions: &mut Vec<PlayerAction>) {
        if self.core.phase != GamePhase::Playing {
            return;
        }
        match input {
            PlayerInput::Move(dir) => {
                if let Some(group) = &mut self.core.falling {
                    if group.try_move(&self.core.board, &mut self.core.arena, dir) {
                        actions.push(PlayerAction::Move(dir));
                    }
                }
            }
            PlayerInput::Rotate(dir) => {
                if let Some(group) = &mut self.core.falling {
                    if group.try_rotate(&self.core.board, &mut self.core.arena, dir) {
                        actions.push(PlayerAction::Rotate(dir));
                    }
                }
            }
            PlayerInput::FastFall(on) => {
                if let Some(group) = &mut self.core.falling {
                    group.set_fast(on);
                    actions.push(PlayerAction::FastFall(on));
                }
            }
            PlayerInput::Push => {
                if let Some(mut group) = self.core.falling.take() {
                    group.push_down(&mut self.core.board, &mut self.core.arena);
                    actions.push(PlayerAction::Push);
                    actions.push(PlayerAction::Settle {
                        axis: group.axis_cell,
                        satellite: group.satellite_cell(),
                    });
                    self.core.needs_scan = true;
                }
            }
        }
    }

    /// Advance the board and translate everything that happened into
    /// broadcast actions.
    pub fn update(&mut self, dt: f32, actions: &mut Vec<PlayerAction>) {
        for event in self.core.update(dt) {
            match event {
                CoreEvent::Landed { axis, satellite } => {
                    actions.push(PlayerAction::Settle { axis, satellite });
                }
                CoreEvent::WaveCleared(result) => {
                    let elapsed = self.core.elapsed as u32;
                    let report = self.core.score.resolve_clear(
                        &result.groups,
                        elapsed,
                        &self.core.config.economy,
                    );
                    actions.push(PlayerAction::Combo {
                        depth: report.combo_depth,
                        garbage: report.garbage,
                    });
                    let split = self.core.score.offset_attack(report.garbage);
                    if split.defended > 0 {
                        actions.push(PlayerAction::Defend(split.defended));
                    }
                    if split.forwarded > 0 {
                        actions.push(PlayerAction::Attack(split.forwarded));
                    }
                }
                CoreEvent::Settled => {
                    if self.core.score.pending_ice > 0 {
                        let owed = self.core.score.take_pending();
                        let columns = self.draw_ice_columns(owed);
                        self.core.queue_ice(columns.clone());
                        actions.push(PlayerAction::AddIce { columns });
                    } else {
                        self.spawn(actions);
                    }
                }
            }
        }
    }

    /// Book an attack from the opponent as pending debt.
    pub fn receive_attack(&mut self, amount: u32) {
        self.core
            .score
            .receive_attack(amount, &self.core.config.economy);
    }

    /// Column order for dropping `count` ice blocks: complete shuffled rows,
    /// with the remainder row taking a prefix of its own shuffle.
    fn draw_ice_columns(&mut self, count: u32) -> Vec<i32> {
        let mut columns = Vec::with_capacity(count as usize);
        let mut remaining = count as usize;
        while remaining > 0 {
            let mut row: Vec<i32> = (0..BOARD_WIDTH).collect();
            self.rng.shuffle(&mut row);
            let take = remaining.min(BOARD_WIDTH as usize);
            columns.extend(row.into_iter().take(take));
            remaining -= take;
        }
        columns
    }
}

// ---------------------------------------------------------------------------
// RemotePlayer
// ---------------------------------------------------------------------------

/// The mirror of the opponent's board. Replays reported actions; everything
/// downstream of a landing resolves through the same deterministic core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemotePlayer {
    pub core: PlayerCore,
}

impl RemotePlayer {
    pub fn new(config: GameConfig) -> Self {
        Self {
            core: PlayerCore::new(config, false),
        }
    }

    pub fn start(&mut self) {
        self.core.start();
    }

    pub fn restart(&mut self) {
        self.core.reset();
    }

    /// Advance the mirror. Cleared waves run the same economy the opponent
    /// ran locally, keeping score and pending debt in step for display.
    pub fn update(&mut self, dt: f32) {
        for event in self.core.update(dt) {
            if let CoreEvent::WaveCleared(result) = event {
                let elapsed = self.core.elapsed as u32;
                let report = self.core.score.resolve_clear(
                    &result.groups,
                    elapsed,
                    &self.core.config.economy,
                );
                self.core.score.offset_attack(report.garbage);
            }
            // Landed cannot occur on a mirror; Settled means we wait for
            // the opponent's next spawn or ice report.
        }
    }

    pub fn apply_spawn(&mut self, axis: BlockKind, satellite: BlockKind, column: i32) {
        self.core.spawn_group(axis, satellite, column);
    }

    pub fn apply_move(&mut self, dir: MoveDir) {
        if let Some(group) = &mut self.core.falling {
            group.try_move(&self.core.board, &mut self.core.arena, dir);
        }
    }

    pub fn apply_rotate(&mut self, dir: RotateDir) {
        if let Some(group) = &mut self.core.falling {
            group.try_rotate(&self.core.board, &mut self.core.arena, dir);
        }
    }

    pub fn apply_fast(&mut self, on: bool) {
        if let Some(group) = &mut self.core.falling {
            group.set_fast(on);
        }
    }

    pub fn apply_push(&mut self) {
        if let Some(group) = &mut self.core.falling {
            group.hold_at_bottom(&self.core.board, &mut self.core.arena);
        }
    }

    /// Land the falling group at the opponent's reported cells. These cells
    /// are authoritative; local descent progress is discarded.
    pub fn apply_settle(&mut self, axis: Cell, satellite: Cell) {
        let Some(group) = self.core.falling.take() else {
            return;
        };
        for (id, cell) in [(group.axis, axis), (group.satellite, satellite)] {
            if let Some(block) = self.core.arena.get_mut(id) {
                block.state = BlockState::DownMoving;
                block.velocity = 0.0;
                block.y_offset = 0.0;
            }
            self.core.board.place(cell, id, &mut self.core.arena);
        }
        self.core.needs_scan = true;
    }

    /// Queue the opponent's reported ice drop. The opponent consumed its
    /// pending debt to produce this, so drain the mirror's copy too.
    pub fn apply_add_ice(&mut self, columns: Vec<i32>) {
        self.core.score.take_pending();
        self.core.queue_ice(columns);
    }

    /// Book an attack headed for the opponent as its pending debt.
    pub fn receive_attack(&mut self, amount: u32) {
        self.core
            .score
            .receive_attack(amount, &self.core.config.economy);
    }

    pub fn apply_lose(&mut self) {
        self.core.phase = GamePhase::GameOver;
    }
}
