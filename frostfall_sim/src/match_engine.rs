// Connected-component match finder.
//
// Scans a settled board in fixed row-major order (top row first) and
// flood-fills same-kind groups of `Stationary` matchable blocks. Probes never
// look back the direction they arrived from. A probe that comes up short of
// `MIN_MATCH_SIZE` unmarks its members so a later seed can re-explore them.
//
// The scan order and the probe direction order are both fixed so that the
// Local board and its Remote mirror always report identical groups.
//
// Ice never joins a group. Any stationary ice directly adjacent to a cleared
// group is reported in `melted` — the caller transitions it to `Effecting`.

use smallvec::SmallVec;

use crate::block::BlockArena;
use crate::board::BoardGrid;
use crate::types::{
    BOARD_HEIGHT, BOARD_WIDTH, BlockId, BlockKind, BlockState, Cell, DIRECTIONS, Direction,
    MIN_MATCH_SIZE,
};

/// One cleared group of same-kind blocks.
#[derive(Clone, Debug)]
pub struct MatchGroup {
    pub kind: BlockKind,
    pub members: SmallVec<[BlockId; 8]>,
}

/// Everything one scan of the board found.
#[derive(Clone, Debug, Default)]
pub struct MatchResult {
    pub groups: Vec<MatchGroup>,
    /// Stationary ice blocks adjacent to at least one cleared group.
    pub melted: Vec<BlockId>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total blocks cleared across all groups, not counting melted ice.
    pub fn cleared_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

/// Scan the whole board for match groups.
pub fn find_matches(board: &BoardGrid, arena: &BlockArena) -> MatchResult {
    let mut visited = [false; (BOARD_WIDTH * BOARD_HEIGHT) as usize];
    let mut result = MatchResult::default();

    for y in 0..BOARD_HEIGHT {
        for x in 0..BOARD_WIDTH {
            let seed = Cell::new(x, y);
            if visited[flat(seed)] {
                continue;
            }
            let Some(kind) = matchable_kind(board, arena, seed) else {
                continue;
            };
            let mut members = SmallVec::new();
            probe(board, arena, seed, None, kind, &mut visited, &mut members);
            if members.len() >= MIN_MATCH_SIZE {
                result.groups.push(MatchGroup { kind, members });
            } else {
                // Short probe: release the cells for later seeds.
                for &id in &members {
                    if let Some(block) = arena.get(id) {
                        visited[flat(block.cell)] = false;
                    }
                }
            }
        }
    }

    result.melted = melted_ice(board, arena, &result.groups);
    result
}

/// Depth-first flood fill from `cell`, skipping the direction we came from.
fn probe(
    board: &BoardGrid,
    arena: &BlockArena,
    cell: Cell,
    arrived_from: Option<Direction>,
    kind: BlockKind,
    visited: &mut [bool; (BOARD_WIDTH * BOARD_HEIGHT) as usize],
    members: &mut SmallVec<[BlockId; 8]>,
) {
    let Some(id) = board.get(cell) else {
        return;
    };
    visited[flat(cell)] = true;
    members.push(id);
    for dir in DIRECTIONS {
        if arrived_from == Some(dir) {
            continue;
        }
        let next = cell.neighbor(dir);
        if !BoardGrid::in_bounds(next) || visited[flat(next)] {
            continue;
        }
        if matchable_kind(board, arena, next) == Some(kind) {
            probe(board, arena, next, Some(dir.opposite()), kind, visited, members);
        }
    }
}

/// The kind at `cell` if it holds a stationary, matchable block.
fn matchable_kind(board: &BoardGrid, arena: &BlockArena, cell: Cell) -> Option<BlockKind> {
    let block = arena.get(board.get(cell)?)?;
    if block.state == BlockState::Stationary && block.kind.is_matchable() {
        Some(block.kind)
    } else {
        None
    }
}

/// Stationary ice adjacent to any group member, deduplicated, in group order.
fn melted_ice(board: &BoardGrid, arena: &BlockArena, groups: &[MatchGroup]) -> Vec<BlockId> {
    let mut melted = Vec::new();
    for group in groups {
        for &id in &group.members {
            let Some(block) = arena.get(id) else {
                continue;
            };
            for dir in DIRECTIONS {
                let cell = block.cell.neighbor(dir);
                let Some(neighbor_id) = board.get(cell) else {
                    continue;
                };
                let Some(neighbor) = arena.get(neighbor_id) else {
                    continue;
                };
                if neighbor.kind == BlockKind::Ice
                    && neighbor.state == BlockState::Stationary
                    && !melted.contains(&neighbor_id)
                {
                    melted.push(neighbor_id);
                }
            }
        }
    }
    melted
}

fn flat(cell: Cell) -> usize {
    (cell.x + cell.y * BOARD_WIDTH) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn put(
        board: &mut BoardGrid,
        arena: &mut BlockArena,
        kind: BlockKind,
        x: i32,
        y: i32,
    ) -> BlockId {
        let cell = Cell::new(x, y);
        let id = arena.insert(Block::new(kind, cell, BlockState::Stationary));
        board.place(cell, id, arena);
        id
    }

    #[test]
    fn square_of_four_matches() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for (x, y) in [(1, 11), (2, 11), (1, 12), (2, 12)] {
            put(&mut board, &mut arena, BlockKind::Ruby, x, y);
        }
        let result = find_matches(&board, &arena);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].kind, BlockKind::Ruby);
        assert_eq!(result.groups[0].members.len(), 4);
        assert!(result.melted.is_empty());
    }

    #[test]
    fn three_in_a_row_does_not_match() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for x in 0..3 {
            put(&mut board, &mut arena, BlockKind::Emerald, x, 12);
        }
        assert!(find_matches(&board, &arena).is_empty());
    }

    #[test]
    fn diagonal_does_not_connect() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        // Two diagonal dominoes of the same kind: 4 blocks, no 4-group.
        for (x, y) in [(0, 12), (1, 12), (1, 11), (2, 11)] {
            put(&mut board, &mut arena, BlockKind::Topaz, x, y);
        }
        // This zig-zag IS connected orthogonally, so it does match.
        assert_eq!(find_matches(&board, &arena).groups.len(), 1);

        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for (x, y) in [(0, 12), (1, 11), (2, 12), (3, 11)] {
            put(&mut board, &mut arena, BlockKind::Topaz, x, y);
        }
        assert!(find_matches(&board, &arena).is_empty());
    }

    #[test]
    fn two_separate_groups_in_one_scan() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for y in 9..13 {
            put(&mut board, &mut arena, BlockKind::Ruby, 0, y);
        }
        for y in 9..13 {
            put(&mut board, &mut arena, BlockKind::Sapphire, 5, y);
        }
        let result = find_matches(&board, &arena);
        assert_eq!(result.groups.len(), 2);
        // Row-major scan: column 0 group is found first.
        assert_eq!(result.groups[0].kind, BlockKind::Ruby);
        assert_eq!(result.groups[1].kind, BlockKind::Sapphire);
    }

    #[test]
    fn ice_never_joins_a_group() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for x in 0..3 {
            put(&mut board, &mut arena, BlockKind::Ruby, x, 12);
        }
        put(&mut board, &mut arena, BlockKind::Ice, 3, 12);
        assert!(find_matches(&board, &arena).is_empty());
    }

    #[test]
    fn adjacent_ice_is_reported_melted() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for y in 9..13 {
            put(&mut board, &mut arena, BlockKind::Ruby, 2, y);
        }
        let ice = put(&mut board, &mut arena, BlockKind::Ice, 3, 12);
        let far_ice = put(&mut board, &mut arena, BlockKind::Ice, 5, 12);

        let result = find_matches(&board, &arena);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.melted, vec![ice]);
        assert_ne!(result.melted, vec![far_ice]);
    }

    #[test]
    fn ice_melted_once_even_with_two_group_neighbors() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        // Ice wedged between two members of the same column group.
        for y in 8..12 {
            put(&mut board, &mut arena, BlockKind::Ruby, 1, y);
        }
        let ice = put(&mut board, &mut arena, BlockKind::Ice, 2, 9);
        put(&mut board, &mut arena, BlockKind::Ruby, 2, 8);
        put(&mut board, &mut arena, BlockKind::Ruby, 2, 10);

        let result = find_matches(&board, &arena);
        let count = result.melted.iter().filter(|&&id| id == ice).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn non_stationary_blocks_excluded() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for x in 0..3 {
            put(&mut board, &mut arena, BlockKind::Ruby, x, 12);
        }
        let falling = put(&mut board, &mut arena, BlockKind::Ruby, 3, 12);
        arena.get_mut(falling).unwrap().state = BlockState::DownMoving;
        assert!(find_matches(&board, &arena).is_empty());
    }

    #[test]
    fn cleared_count_sums_all_groups() {
        let mut board = BoardGrid::new();
        let mut arena = BlockArena::new();
        for y in 9..13 {
            put(&mut board, &mut arena, BlockKind::Ruby, 0, y);
        }
        for y in 8..13 {
            put(&mut board, &mut arena, BlockKind::Amethyst, 3, y);
        }
        let result = find_matches(&board, &arena);
        assert_eq!(result.cleared_count(), 9);
    }
}
