// Block data and arena storage.
//
// Blocks live in a `BlockArena` — a slab of slots addressed by `BlockId`
// handles with a free list for slot reuse. The board grid and the falling
// group store handles, never references, so removing a block can never leave
// a dangling pointer behind: a stale handle resolves to `None`.
//
// A block's `cell` field is authoritative only together with the board — the
// board's `place`/`remove` operations keep the two in agreement (a cell holds
// at most one block and that block's stored coordinates match the cell).

use serde::{Deserialize, Serialize};

use crate::types::{BlockId, BlockKind, BlockState, Cell};

/// One block on (or above) a player's board.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub cell: Cell,
    pub state: BlockState,
    /// Seconds remaining in a timed state (`Effecting`, `Destroying`).
    pub state_timer: f32,
    /// Downward velocity in cells/second while `DownMoving`.
    pub velocity: f32,
    /// Fractional fall progress below `cell`, in `[0, 1)` cells.
    pub y_offset: f32,
    /// Same-kind stationary neighbor bitmask (see `Direction::bit`).
    /// Rendering aid only — never consulted by the match engine.
    pub adjacency: u8,
}

impl Block {
    pub fn new(kind: BlockKind, cell: Cell, state: BlockState) -> Self {
        Self {
            kind,
            cell,
            state,
            state_timer: 0.0,
            velocity: 0.0,
            y_offset: 0.0,
            adjacency: 0,
        }
    }
}

/// Slab storage for blocks, addressed by `BlockId` handles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockArena {
    slots: Vec<Option<Block>>,
    free: Vec<u32>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block, reusing a freed slot when available.
    pub fn insert(&mut self, block: Block) -> BlockId {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(block);
            BlockId(index)
        } else {
            self.slots.push(Some(block));
            BlockId((self.slots.len() - 1) as u32)
        }
    }

    /// Remove a block. Returns `None` for stale or never-issued handles.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let slot = self.slots.get_mut(id.0 as usize)?;
        let block = slot.take()?;
        self.free.push(id.0);
        Some(block)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate live blocks in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (BlockId(i as u32), b)))
    }

    /// Live block handles in handle order. Collected up front so callers can
    /// mutate the arena while walking the list.
    pub fn ids(&self) -> Vec<BlockId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// True if any live block is in the given state.
    pub fn any_in_state(&self, state: BlockState) -> bool {
        self.iter().any(|(_, b)| b.state == state)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}
