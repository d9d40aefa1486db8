// Fixed board grid of block handles.
//
// The board is stored as a flat `Vec<Option<BlockId>>` indexed by
// `x + y * BOARD_WIDTH`, giving O(1) cell access. Out-of-bounds reads return
// `None`; out-of-bounds writes are no-ops — an out-of-range board index is a
// logic fault and must never be fatal.
//
// `place`/`remove`/`relocate` keep the cell invariant: a cell holds at most
// one block, and that block's stored coordinates always equal the cell that
// holds it. The adjacency bitmask (rendering aid) is recomputed here whenever
// a same-kind neighbor becomes stationary.

use serde::{Deserialize, Serialize};

use crate::block::BlockArena;
use crate::types::{BOARD_HEIGHT, BOARD_WIDTH, BlockId, BlockState, Cell, DIRECTIONS};

/// Fixed 6x13 grid of block handles for one player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardGrid {
    cells: Vec<Option<BlockId>>,
}

impl Default for BoardGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![None; (BOARD_WIDTH * BOARD_HEIGHT) as usize],
        }
    }

    pub fn in_bounds(cell: Cell) -> bool {
        cell.x >= 0 && cell.x < BOARD_WIDTH && cell.y >= 0 && cell.y < BOARD_HEIGHT
    }

    fn index(cell: Cell) -> Option<usize> {
        if Self::in_bounds(cell) {
            Some((cell.x + cell.y * BOARD_WIDTH) as usize)
        } else {
            None
        }
    }

    /// Read a cell. Returns `None` for empty or out-of-bounds cells.
    pub fn get(&self, cell: Cell) -> Option<BlockId> {
        Self::index(cell).and_then(|i| self.cells[i])
    }

    /// True if the cell is inside the board and holds no block.
    pub fn is_free(&self, cell: Cell) -> bool {
        Self::index(cell).is_some_and(|i| self.cells[i].is_none())
    }

    /// Place a block into a cell and update the block's stored coordinates.
    /// No-op if the cell is out of bounds or already occupied.
    pub fn place(&mut self, cell: Cell, id: BlockId, arena: &mut BlockArena) {
        let Some(index) = Self::index(cell) else {
            return;
        };
        if self.cells[index].is_some() {
            return;
        }
        self.cells[index] = Some(id);
        if let Some(block) = arena.get_mut(id) {
            block.cell = cell;
        }
    }

    /// Clear a cell. Returns the handle that was there, if any.
    pub fn remove(&mut self, cell: Cell) -> Option<BlockId> {
        let index = Self::index(cell)?;
        self.cells[index].take()
    }

    /// Move a block from one cell to another, updating its coordinates.
    /// No-op if the source is empty or the destination is occupied.
    pub fn relocate(&mut self, from: Cell, to: Cell, arena: &mut BlockArena) {
        if !self.is_free(to) {
            return;
        }
        if let Some(id) = self.remove(from) {
            self.place(to, id, arena);
        }
    }

    /// The row of the topmost occupied cell in a column, or `BOARD_HEIGHT`
    /// for an empty column.
    pub fn column_top(&self, x: i32) -> i32 {
        for y in 0..BOARD_HEIGHT {
            if self.get(Cell::new(x, y)).is_some() {
                return y;
            }
        }
        BOARD_HEIGHT
    }

    /// The row of the first *stationary* block strictly below `y` in column
    /// `x`, or `BOARD_HEIGHT` when the column is clear down to the floor.
    pub fn stationary_below(&self, arena: &BlockArena, x: i32, y: i32) -> i32 {
        for row in (y + 1)..BOARD_HEIGHT {
            if let Some(id) = self.get(Cell::new(x, row)) {
                if arena.get(id).is_some_and(|b| b.state == BlockState::Stationary) {
                    return row;
                }
            }
        }
        BOARD_HEIGHT
    }

    /// Recompute the adjacency bitmask for the block at `cell` and its
    /// same-kind stationary neighbors. Called whenever a block settles or a
    /// cell is cleared.
    pub fn recompute_adjacency(&self, cell: Cell, arena: &mut BlockArena) {
        self.recompute_one(cell, arena);
        for dir in DIRECTIONS {
            self.recompute_one(cell.neighbor(dir), arena);
        }
    }

    fn recompute_one(&self, cell: Cell, arena: &mut BlockArena) {
        let Some(id) = self.get(cell) else {
            return;
        };
        let Some(block) = arena.get(id) else {
            return;
        };
        if block.state != BlockState::Stationary {
            return;
        }
        let kind = block.kind;
        let mut mask = 0u8;
        for dir in DIRECTIONS {
            if let Some(neighbor_id) = self.get(cell.neighbor(dir)) {
                if let Some(neighbor) = arena.get(neighbor_id) {
                    if neighbor.kind == kind && neighbor.state == BlockState::Stationary {
                        mask |= dir.bit();
                    }
                }
            }
        }
        if let Some(block) = arena.get_mut(id) {
            block.adjacency = mask;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::types::{BlockKind, Direction};

    fn place_new(
        board: &mut BoardGrid,
        arena: &mut BlockArena,
        kind: BlockKind,
        cell: Cell,
    ) -> BlockId {
        let id = arena.insert(Block::new(kind, cell, BlockState::Stationary));
        board.place(cell, id, arena);
        id
    }

    #[test]
    fn out_of_bounds_read_is_none() {
        let board = BoardGrid::new();
        assert_eq!(board.get(Cell::new(-1, 0)), None);
        assert_eq!(board.get(Cell::new(0, -1)), None);
        assert_eq!(board.get(Cell::new(BOARD_WIDTH, 0)), None);
        assert_eq!(board.get(Cell::new(0, BOARD_HEIGHT)), None);
    }

    #[test]
    fn out_of_bounds_write_is_noop() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let id = arena.insert(Block::new(
            BlockKind::Ruby,
            Cell::new(0, 0),
            BlockState::Stationary,
        ));
        // Should not panic, should not change anything.
        board.place(Cell::new(-1, 5), id, &mut arena);
        board.place(Cell::new(2, 99), id, &mut arena);
        assert_eq!(board.get(Cell::new(-1, 5)), None);
    }

    #[test]
    fn place_updates_block_coordinates() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let id = arena.insert(Block::new(
            BlockKind::Ruby,
            Cell::new(0, 0),
            BlockState::Stationary,
        ));
        board.place(Cell::new(4, 10), id, &mut arena);
        assert_eq!(board.get(Cell::new(4, 10)), Some(id));
        assert_eq!(arena.get(id).unwrap().cell, Cell::new(4, 10));
    }

    #[test]
    fn place_into_occupied_cell_is_noop() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let first = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(2, 2));
        let second = arena.insert(Block::new(
            BlockKind::Sapphire,
            Cell::new(0, 0),
            BlockState::Stationary,
        ));
        board.place(Cell::new(2, 2), second, &mut arena);
        assert_eq!(board.get(Cell::new(2, 2)), Some(first));
        // Second block keeps its own coordinates.
        assert_eq!(arena.get(second).unwrap().cell, Cell::new(0, 0));
    }

    #[test]
    fn relocate_moves_handle_and_coordinates() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let id = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(1, 1));
        board.relocate(Cell::new(1, 1), Cell::new(1, 2), &mut arena);
        assert_eq!(board.get(Cell::new(1, 1)), None);
        assert_eq!(board.get(Cell::new(1, 2)), Some(id));
        assert_eq!(arena.get(id).unwrap().cell, Cell::new(1, 2));
    }

    #[test]
    fn column_top_and_stationary_below() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        assert_eq!(board.column_top(3), BOARD_HEIGHT);
        assert_eq!(board.stationary_below(&arena, 3, 0), BOARD_HEIGHT);

        place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(3, 9));
        assert_eq!(board.column_top(3), 9);
        assert_eq!(board.stationary_below(&arena, 3, 0), 9);
        // Below the block itself, the column is clear.
        assert_eq!(board.stationary_below(&arena, 3, 9), BOARD_HEIGHT);
    }

    #[test]
    fn stationary_below_ignores_falling_blocks() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let id = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(2, 8));
        arena.get_mut(id).unwrap().state = BlockState::DownMoving;
        assert_eq!(board.stationary_below(&arena, 2, 0), BOARD_HEIGHT);
    }

    #[test]
    fn adjacency_set_on_both_sides() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let left = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(2, 12));
        let right = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(3, 12));
        board.recompute_adjacency(Cell::new(3, 12), &mut arena);

        assert_eq!(arena.get(left).unwrap().adjacency, Direction::Right.bit());
        assert_eq!(arena.get(right).unwrap().adjacency, Direction::Left.bit());
    }

    #[test]
    fn adjacency_ignores_different_kinds() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let left = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(2, 12));
        place_new(&mut board, &mut arena, BlockKind::Sapphire, Cell::new(3, 12));
        board.recompute_adjacency(Cell::new(3, 12), &mut arena);
        assert_eq!(arena.get(left).unwrap().adjacency, 0);
    }

    #[test]
    fn adjacency_cleared_after_neighbor_removed() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        let left = place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(2, 12));
        place_new(&mut board, &mut arena, BlockKind::Ruby, Cell::new(3, 12));
        board.recompute_adjacency(Cell::new(3, 12), &mut arena);
        assert_ne!(arena.get(left).unwrap().adjacency, 0);

        board.remove(Cell::new(3, 12));
        board.recompute_adjacency(Cell::new(3, 12), &mut arena);
        assert_eq!(arena.get(left).unwrap().adjacency, 0);
    }
}
