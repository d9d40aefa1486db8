// frostfall_sim — pure Rust simulation library for the Frostfall puzzle game.
//
// This crate contains all game logic for one player's board: the block state
// machine, the falling-group physics, the connected-component match engine,
// and the score/ice economy. It has zero networking or rendering dependencies
// and can be tested and run headless.
//
// Module overview:
// - `types.rs`:        BlockKind, BlockState, Cell, GamePhase, direction enums, BlockId.
// - `block.rs`:        Block data + BlockArena (handle-indexed slab storage).
// - `board.rs`:        Fixed 6x13 BoardGrid of block handles, adjacency bookkeeping.
// - `falling.rs`:      FallingGroup — the active two-block piece with rotation.
// - `gravity.rs`:      DownMoving physics pass (depth-keyed acceleration, AABB landing).
// - `match_engine.rs`: Flood-fill connected-component finder over a settled board.
// - `score.rs`:        Combo/link/kind bonus tables, margin conversion, attack offset.
// - `player.rs`:       PlayerCore phase machine + LocalPlayer / RemotePlayer.
// - `config.rs`:       GameConfig — all tunable parameters, loaded from JSON.
// - `prng.rs`:         xoshiro256++ PRNG for piece-kind and ice-column draws.
//
// The companion crates `frostfall_protocol` and `frostfall_net` carry this
// library's actions over the wire. That boundary is enforced at the compiler
// level — this crate cannot depend on sockets, frame timing, or packets.
//
// **Critical constraint: mirroring.** Every match lives twice: as an
// authoritative Local simulation and as a Remote mirror on the peer that only
// replays reported actions. Both specializations share `PlayerCore` so the
// same inputs always produce the same board. All randomness comes from a
// seeded PRNG owned by the Local player; the mirror never draws randomness.

pub mod block;
pub mod board;
pub mod config;
pub mod falling;
pub mod gravity;
pub mod match_engine;
pub mod player;
pub mod prng;
pub mod score;
pub mod types;
