// The active falling group — the two-block piece under player control.
//
// A group is an axis block and a satellite block orbiting it in one of four
// rotation steps (0 = above, 1 = right, 2 = below, 3 = left). While airborne
// the pair lives only in the arena (state `Playing`), never in the board
// grid, so board scans stay oblivious to it.
//
// Descent is constant-velocity and whole-cell, like the gravity pass: the
// fractional progress accumulates in `y_offset` and the axis advances one row
// at a time. When the group can no longer descend it lands: both blocks are
// placed into the grid as `DownMoving` and handed to gravity, which settles
// the supported one immediately and lets an unsupported satellite drop free.
//
// Moves and rotations are all-or-nothing: if either destination cell is out
// of bounds or occupied the input is simply refused, never clipped.

use serde::{Deserialize, Serialize};

use crate::block::BlockArena;
use crate::board::BoardGrid;
use crate::config::FallParams;
use crate::types::{BOARD_HEIGHT, BlockId, BlockState, Cell, MoveDir, RotateDir};

/// Number of rotation steps the satellite can occupy around the axis.
pub const ROTATION_STEPS: u8 = 4;

/// The player-controlled pair of blocks currently descending.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallingGroup {
    pub axis: BlockId,
    pub satellite: BlockId,
    pub axis_cell: Cell,
    /// Satellite position: 0 = above the axis, 1 = right, 2 = below, 3 = left.
    pub rotation: u8,
    /// Fractional descent progress below `axis_cell`, in `[0, 1)` cells.
    pub y_offset: f32,
    /// Fast-fall held.
    pub fast: bool,
}

impl FallingGroup {
    /// Spawn a group with the axis in row 1 of the given column and the
    /// satellite directly above it.
    pub fn spawn(axis: BlockId, satellite: BlockId, column: i32) -> Self {
        Self {
            axis,
            satellite,
            axis_cell: Cell::new(column, 1),
            rotation: 0,
            y_offset: 0.0,
            fast: false,
        }
    }

    pub fn satellite_cell(&self) -> Cell {
        satellite_at(self.axis_cell, self.rotation)
    }

    /// Shift the group one column left or right. Refused (returns `false`)
    /// if either destination cell is out of bounds or occupied.
    pub fn try_move(&mut self, board: &BoardGrid, arena: &mut BlockArena, dir: MoveDir) -> bool {
        let axis_to = Cell::new(self.axis_cell.x + dir.dx(), self.axis_cell.y);
        let satellite_to = satellite_at(axis_to, self.rotation);
        if !cell_open(board, axis_to) || !cell_open(board, satellite_to) {
            return false;
        }
        self.axis_cell = axis_to;
        self.sync_block_cells(arena);
        true
    }

    /// Step the satellite one rotation around the axis. Refused if the new
    /// satellite cell is out of bounds or occupied.
    pub fn try_rotate(
        &mut self,
        board: &BoardGrid,
        arena: &mut BlockArena,
        dir: RotateDir,
    ) -> bool {
        let rotation = match dir {
            RotateDir::Clockwise => (self.rotation + 1) % ROTATION_STEPS,
            RotateDir::CounterClockwise => (self.rotation + ROTATION_STEPS - 1) % ROTATION_STEPS,
        };
        let satellite_to = satellite_at(self.axis_cell, rotation);
        if !cell_open(board, satellite_to) {
            return false;
        }
        self.rotation = rotation;
        self.sync_block_cells(arena);
        true
    }

    pub fn set_fast(&mut self, fast: bool) {
        self.fast = fast;
    }

    /// Advance descent by `dt` seconds. Returns `true` when the group landed
    /// this tick; the blocks are then in the grid as `DownMoving` and the
    /// group must be discarded.
    pub fn update(
        &mut self,
        board: &mut BoardGrid,
        arena: &mut BlockArena,
        params: &FallParams,
        dt: f32,
    ) -> bool {
        let velocity = if self.fast {
            params.base_velocity * params.fast_multiplier
        } else {
            params.base_velocity
        };
        self.y_offset += velocity * dt;
        while self.y_offset >= 1.0 {
            self.y_offset -= 1.0;
            if self.can_descend(board) {
                self.axis_cell = Cell::new(self.axis_cell.x, self.axis_cell.y + 1);
                self.sync_block_cells(arena);
            } else {
                self.land(board, arena);
                return true;
            }
        }
        false
    }

    /// Advance descent like `update` but never land. Used by the remote
    /// mirror, whose landing cells arrive over the wire: the group descends
    /// to the obstruction and holds there until the settle report comes in.
    pub fn update_held(
        &mut self,
        board: &BoardGrid,
        arena: &mut BlockArena,
        params: &FallParams,
        dt: f32,
    ) {
        let velocity = if self.fast {
            params.base_velocity * params.fast_multiplier
        } else {
            params.base_velocity
        };
        self.y_offset += velocity * dt;
        while self.y_offset >= 1.0 {
            if self.can_descend(board) {
                self.y_offset -= 1.0;
                self.axis_cell = Cell::new(self.axis_cell.x, self.axis_cell.y + 1);
            } else {
                self.y_offset = 0.0;
                break;
            }
        }
        self.sync_block_cells(arena);
    }

    /// Slide down to the first obstruction without landing. The mirror's
    /// response to the opponent's hard drop.
    pub fn hold_at_bottom(&mut self, board: &BoardGrid, arena: &mut BlockArena) {
        while self.can_descend(board) {
            self.axis_cell = Cell::new(self.axis_cell.x, self.axis_cell.y + 1);
        }
        self.y_offset = 0.0;
        self.sync_block_cells(arena);
    }

    /// Drop straight down to the first obstruction and land immediately.
    pub fn push_down(&mut self, board: &mut BoardGrid, arena: &mut BlockArena) {
        while self.can_descend(board) {
            self.axis_cell = Cell::new(self.axis_cell.x, self.axis_cell.y + 1);
        }
        self.sync_block_cells(arena);
        self.land(board, arena);
    }

    fn can_descend(&self, board: &BoardGrid) -> bool {
        let satellite = self.satellite_cell();
        for cell in [self.axis_cell, satellite] {
            let below = Cell::new(cell.x, cell.y + 1);
            if below == self.axis_cell || below == satellite {
                continue; // the group does not block itself
            }
            if below.y >= BOARD_HEIGHT || !board.is_free(below) {
                return false;
            }
        }
        true
    }

    /// Place both blocks into the grid as `DownMoving` for gravity to settle.
    fn land(&self, board: &mut BoardGrid, arena: &mut BlockArena) {
        for (id, cell) in [(self.axis, self.axis_cell), (self.satellite, self.satellite_cell())] {
            if let Some(block) = arena.get_mut(id) {
                block.state = BlockState::DownMoving;
                block.velocity = 0.0;
                block.y_offset = 0.0;
            }
            board.place(cell, id, arena);
        }
    }

    fn sync_block_cells(&self, arena: &mut BlockArena) {
        let satellite = self.satellite_cell();
        if let Some(block) = arena.get_mut(self.axis) {
            block.cell = self.axis_cell;
            block.y_offset = self.y_offset;
        }
        if let Some(block) = arena.get_mut(self.satellite) {
            block.cell = satellite;
            block.y_offset = self.y_offset;
        }
    }
}

fn satellite_at(axis: Cell, rotation: u8) -> Cell {
    match rotation % ROTATION_STEPS {
        0 => Cell::new(axis.x, axis.y - 1),
        1 => Cell::new(axis.x + 1, axis.y),
        2 => Cell::new(axis.x, axis.y + 1),
        _ => Cell::new(axis.x - 1, axis.y),
    }
}

/// In bounds and unoccupied.
fn cell_open(board: &BoardGrid, cell: Cell) -> bool {
    BoardGrid::in_bounds(cell) && board.is_free(cell)
}
