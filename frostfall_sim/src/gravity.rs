// Free-fall pass for loose blocks.
//
// After a clear (or an ice drop) the blocks left hanging are marked
// `DownMoving` and this pass carries them down. Columns are processed
// bottom-first so a falling stack keeps its order: the lowest block lands or
// advances before the one above it checks its own support.
//
// Descent is whole-cell: velocity integrates into `y_offset` and the block
// relocates one grid cell at a time once a full cell of progress has
// accumulated. A block resting on the floor or on a stationary block settles
// immediately; one resting on another faller waits for it.
//
// Settling turns the block `Stationary`, zeroes its motion, recomputes
// adjacency, and reports the cell — the caller feeds settled cells to the
// match engine.

use crate::block::BlockArena;
use crate::board::BoardGrid;
use crate::config::GravityParams;
use crate::types::{BOARD_HEIGHT, BOARD_WIDTH, BlockState, Cell, Direction};

/// Advance every `DownMoving` block by `dt` seconds. Returns the cells of
/// blocks that settled this tick, in column-major bottom-first order.
pub fn run(
    board: &mut BoardGrid,
    arena: &mut BlockArena,
    params: &GravityParams,
    dt: f32,
) -> Vec<Cell> {
    let mut settled = Vec::new();
    for x in 0..BOARD_WIDTH {
        for y in (0..BOARD_HEIGHT).rev() {
            let cell = Cell::new(x, y);
            let Some(id) = board.get(cell) else {
                continue;
            };
            let Some(block) = arena.get(id) else {
                continue;
            };
            if block.state != BlockState::DownMoving {
                continue;
            }

            // Supported (by a settled block or the floor): land in place.
            // A still-falling block below is not support; this block waits
            // behind it instead.
            if supported(board, arena, cell) {
                settle(board, arena, cell, &mut settled);
                continue;
            }

            // Acceleration scales with how deep the block currently is.
            let accel = params.acceleration * (1.0 + params.depth_factor * y as f32);
            let mut current = cell;
            {
                let Some(block) = arena.get_mut(id) else {
                    continue;
                };
                block.velocity = (block.velocity + accel * dt).min(params.max_velocity);
                block.y_offset += block.velocity * dt;
            }

            // Whole-cell descent: move down one cell per accumulated cell of
            // progress, stopping at the first obstruction.
            loop {
                let offset = match arena.get(id) {
                    Some(block) => block.y_offset,
                    None => break,
                };
                if offset < 1.0 {
                    break;
                }
                if supported(board, arena, current) {
                    settle(board, arena, current, &mut settled);
                    break;
                }
                let below = current.neighbor(Direction::Down);
                if !board.is_free(below) {
                    // A slower faller is in the way; keep the accumulated
                    // offset and try again next tick.
                    break;
                }
                board.relocate(current, below, arena);
                current = below;
                if let Some(block) = arena.get_mut(id) {
                    block.y_offset -= 1.0;
                }
            }
        }
    }
    settled
}

/// True if the cell directly below is the floor or a stationary block.
fn supported(board: &BoardGrid, arena: &BlockArena, cell: Cell) -> bool {
    if cell.y + 1 >= BOARD_HEIGHT {
        return true;
    }
    board
        .get(cell.neighbor(Direction::Down))
        .and_then(|id| arena.get(id))
        .is_some_and(|block| block.state == BlockState::Stationary)
}

fn settle(board: &BoardGrid, arena: &mut BlockArena, cell: Cell, settled: &mut Vec<Cell>) {
    let Some(id) = board.get(cell) else {
        return;
    };
    if let Some(block) = arena.get_mut(id) {
        block.state = BlockState::Stationary;
        block.velocity = 0.0;
        block.y_offset = 0.0;
    }
    board.recompute_adjacency(cell, arena);
    settled.push(cell);
}
