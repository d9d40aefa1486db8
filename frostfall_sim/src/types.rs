// Core types shared across the simulation.
//
// Defines board coordinates (`Cell`), the block kind/state enums, the
// per-player phase machine states, and the direction enums used by both the
// falling-group logic and the wire layer. All types derive `Serialize` and
// `Deserialize` for board snapshots (the integration tests compare mirrored
// boards as JSON).
//
// Wire encoding: the enums that cross the network carry explicit
// `to_wire`/`from_wire` u8 conversions. `from_wire` is fallible — a bad byte
// from the peer is a logic fault and must become a no-op, never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board width in cells. Columns are indexed 0 (leftmost) to 5.
pub const BOARD_WIDTH: i32 = 6;

/// Board height in cells. Row 0 is the top (spawn) row, row 12 the floor.
pub const BOARD_HEIGHT: i32 = 13;

/// A connected group must have at least this many members to clear.
pub const MIN_MATCH_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A board cell position. `x` is the column (grows rightward), `y` the row
/// (grows downward — gravity increases `y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell in the given direction.
    pub fn neighbor(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The four cardinal directions, in adjacency-bitmask bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

/// All four directions in fixed scan order. Match-engine probes and
/// adjacency recomputes iterate this array so both mirrors agree.
pub const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
];

impl Direction {
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Bit position in a block's adjacency bitmask.
    pub fn bit(self) -> u8 {
        match self {
            Direction::Up => 1 << 0,
            Direction::Right => 1 << 1,
            Direction::Down => 1 << 2,
            Direction::Left => 1 << 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Block kinds and states
// ---------------------------------------------------------------------------

/// The material of a block. The five gem kinds match; `Ice` is the
/// garbage/interrupt block — it never matches, and only melts when a cleared
/// group is directly adjacent to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Ruby,
    Sapphire,
    Emerald,
    Topaz,
    Amethyst,
    Ice,
}

/// Number of matchable (non-ice) kinds; the spawn draw is `0..MATCHABLE_KINDS`.
pub const MATCHABLE_KINDS: usize = 5;

impl BlockKind {
    pub fn is_matchable(self) -> bool {
        self != BlockKind::Ice
    }

    /// Matchable kind by draw index. Out-of-range indices wrap, so any PRNG
    /// draw in `0..MATCHABLE_KINDS` is valid.
    pub fn from_draw(index: usize) -> Self {
        match index % MATCHABLE_KINDS {
            0 => BlockKind::Ruby,
            1 => BlockKind::Sapphire,
            2 => BlockKind::Emerald,
            3 => BlockKind::Topaz,
            _ => BlockKind::Amethyst,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            BlockKind::Ruby => 0,
            BlockKind::Sapphire => 1,
            BlockKind::Emerald => 2,
            BlockKind::Topaz => 3,
            BlockKind::Amethyst => 4,
            BlockKind::Ice => 5,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BlockKind::Ruby),
            1 => Some(BlockKind::Sapphire),
            2 => Some(BlockKind::Emerald),
            3 => Some(BlockKind::Topaz),
            4 => Some(BlockKind::Amethyst),
            5 => Some(BlockKind::Ice),
            _ => None,
        }
    }
}

/// Physical sub-state of a block.
///
/// `Stationary` is the only state the match engine considers. Transitions
/// within one update tick are one-directional:
/// `Playing -> Stationary | DownMoving`, `DownMoving -> Stationary`,
/// `Stationary -> Destroying`, `Effecting -> Destroying -> PlayOut`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    /// Member of the active falling group, under player control.
    Playing,
    /// Ice melting because a cleared group touched it.
    Effecting,
    /// At rest in its board cell.
    Stationary,
    /// Clearing; counts down the shatter timer.
    Destroying,
    /// Falling freely under gravity.
    DownMoving,
    /// Finished clearing, awaiting removal from arena and board.
    PlayOut,
}

// ---------------------------------------------------------------------------
// Block handles
// ---------------------------------------------------------------------------

/// Handle into the `BlockArena`. The board stores these, never references —
/// a stale handle after removal simply resolves to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

// ---------------------------------------------------------------------------
// Player phases and input directions
// ---------------------------------------------------------------------------

/// Per-player phase machine. Exactly one phase is active at a time and
/// transitions are one-directional per update tick:
/// `Standing -> Playing -> Shattering -> (IceBlocking | Playing) -> GameOver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Standing,
    Playing,
    Shattering,
    IceBlocking,
    GameOver,
}

/// Horizontal move input for the falling group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDir {
    Left,
    Right,
}

impl MoveDir {
    pub fn dx(self) -> i32 {
        match self {
            MoveDir::Left => -1,
            MoveDir::Right => 1,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            MoveDir::Left => 0,
            MoveDir::Right => 1,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(MoveDir::Left),
            1 => Some(MoveDir::Right),
            _ => None,
        }
    }
}

/// Rotation input for the falling group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDir {
    Clockwise,
    CounterClockwise,
}

impl RotateDir {
    pub fn to_wire(self) -> u8 {
        match self {
            RotateDir::Clockwise => 0,
            RotateDir::CounterClockwise => 1,
        }
    }

    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(RotateDir::Clockwise),
            1 => Some(RotateDir::CounterClockwise),
            _ => None,
        }
    }
}
