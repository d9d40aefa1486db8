// frostfall_net — TCP networking for two-player matches.
//
// A match is two mirrored simulations kept in step by the packet stream
// defined in `frostfall_protocol`. This crate provides both transports (an
// in-process server for a hosting player, a plain client for a guest) and
// the `GameSession` controller that drives a local board and the opponent's
// mirror from the same tick loop.
//
// Module overview:
// - `registry.rs`:  Connected players and their write halves; join
//                   sequencing and frame fan-out.
// - `server.rs`:    Listener, accept loop, per-connection reader threads.
// - `client.rs`:    Blocking handshake, background reader, non-blocking
//                   `poll`.
// - `dispatch.rs`:  Gameplay packets onto the `RemotePlayer` mirror.
// - `scheduler.rs`: Tick-ordered task list for countdowns.
// - `session.rs`:   `GameSession` — the whole client state machine.

pub mod client;
pub mod dispatch;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;

pub use client::{ClientEvent, JoinInfo, NetClient};
pub use registry::PlayerRegistry;
pub use scheduler::TaskList;
pub use server::{ServerConfig, ServerEvent, ServerHandle, start_server};
pub use session::{ClientStage, GameSession, MatchOutcome};
