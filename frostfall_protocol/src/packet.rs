// Packet definitions.
//
// One enum covers every message both directions. Each variant has a fixed
// 16-bit kind tag, grouped into bands by concern: 0x01xx session membership,
// 0x02xx chat, 0x03xx character select, 0x04xx match setup and spawns,
// 0x05xx falling-group actions, 0x06xx the garbage economy, 0x07xx match end.
//
// Payload fields are raw wire integers (directions and block kinds as `u8`),
// deliberately free of simulation types — the net layer converts at the
// boundary and treats a bad byte as a logic fault, not a crash.

use crate::types::PlayerId;

/// One entry in the session roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub name: String,
}

/// Why a login was denied.
pub mod deny_reason {
    pub const SESSION_FULL: u8 = 1;
    pub const BAD_VERSION: u8 = 2;
    pub const BAD_NAME: u8 = 3;
}

/// Every message that crosses the wire, in both directions.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    // --- session membership (0x01xx) ---
    Login { version: u16, name: String },
    Welcome { id: PlayerId },
    JoinDenied { reason: u8 },
    Roster { players: Vec<PlayerEntry> },
    PlayerJoined { id: PlayerId, name: String },
    PlayerLeft { id: PlayerId },
    EnterRoom { id: PlayerId },
    LeaveRoom { id: PlayerId },
    Logout { id: PlayerId },

    // --- chat (0x02xx) ---
    Chat { id: PlayerId, text: String },

    // --- character select (0x03xx) ---
    SelectCursor { id: PlayerId, index: u8 },
    ConfirmCharacter { id: PlayerId, index: u8 },

    // --- match setup (0x04xx) ---
    GameReady { id: PlayerId },
    ScheduleStart { countdown_ticks: u32 },
    GameStart,
    SpawnGroup { axis: u8, satellite: u8, column: u8 },

    // --- falling-group actions (0x05xx) ---
    BlockMove { dir: u8 },
    BlockRotate { dir: u8 },
    BlockFall { fast: u8 },
    BlockPush,
    BlockSettle { axis_x: u8, axis_y: u8, satellite_x: u8, satellite_y: u8 },

    // --- garbage economy (0x06xx) ---
    Combo { depth: u16, garbage: u16 },
    Attack { amount: u16 },
    Defend { amount: u16 },
    AddIce { columns: Vec<u8> },

    // --- match end (0x07xx) ---
    Lose { id: PlayerId },
    Restart,
}

pub mod kind {
    pub const LOGIN: u16 = 0x0101;
    pub const WELCOME: u16 = 0x0102;
    pub const JOIN_DENIED: u16 = 0x0103;
    pub const ROSTER: u16 = 0x0104;
    pub const PLAYER_JOINED: u16 = 0x0105;
    pub const PLAYER_LEFT: u16 = 0x0106;
    pub const ENTER_ROOM: u16 = 0x0107;
    pub const LEAVE_ROOM: u16 = 0x0108;
    pub const LOGOUT: u16 = 0x0109;

    pub const CHAT: u16 = 0x0201;

    pub const SELECT_CURSOR: u16 = 0x0301;
    pub const CONFIRM_CHARACTER: u16 = 0x0302;

    pub const GAME_READY: u16 = 0x0401;
    pub const SCHEDULE_START: u16 = 0x0402;
    pub const GAME_START: u16 = 0x0403;
    pub const SPAWN_GROUP: u16 = 0x0404;

    pub const BLOCK_MOVE: u16 = 0x0501;
    pub const BLOCK_ROTATE: u16 = 0x0502;
    pub const BLOCK_FALL: u16 = 0x0503;
    pub const BLOCK_PUSH: u16 = 0x0504;
    pub const BLOCK_SETTLE: u16 = 0x0505;

    pub const COMBO: u16 = 0x0601;
    pub const ATTACK: u16 = 0x0602;
    pub const DEFEND: u16 = 0x0603;
    pub const ADD_ICE: u16 = 0x0604;

    pub const LOSE: u16 = 0x0701;
    pub const RESTART: u16 = 0x0702;
}

impl Packet {
    /// The 16-bit kind tag written into the frame header.
    pub fn kind(&self) -> u16 {
        match self {
            Packet::Login { .. } => kind::LOGIN,
            Packet::Welcome { .. } => kind::WELCOME,
            Packet::JoinDenied { .. } => kind::JOIN_DENIED,
            Packet::Roster { .. } => kind::ROSTER,
            Packet::PlayerJoined { .. } => kind::PLAYER_JOINED,
            Packet::PlayerLeft { .. } => kind::PLAYER_LEFT,
            Packet::EnterRoom { .. } => kind::ENTER_ROOM,
            Packet::LeaveRoom { .. } => kind::LEAVE_ROOM,
            Packet::Logout { .. } => kind::LOGOUT,
            Packet::Chat { .. } => kind::CHAT,
            Packet::SelectCursor { .. } => kind::SELECT_CURSOR,
            Packet::ConfirmCharacter { .. } => kind::CONFIRM_CHARACTER,
            Packet::GameReady { .. } => kind::GAME_READY,
            Packet::ScheduleStart { .. } => kind::SCHEDULE_START,
            Packet::GameStart => kind::GAME_START,
            Packet::SpawnGroup { .. } => kind::SPAWN_GROUP,
            Packet::BlockMove { .. } => kind::BLOCK_MOVE,
            Packet::BlockRotate { .. } => kind::BLOCK_ROTATE,
            Packet::BlockFall { .. } => kind::BLOCK_FALL,
            Packet::BlockPush => kind::BLOCK_PUSH,
            Packet::BlockSettle { .. } => kind::BLOCK_SETTLE,
            Packet::Combo { .. } => kind::COMBO,
            Packet::Attack { .. } => kind::ATTACK,
            Packet::Defend { .. } => kind::DEFEND,
            Packet::AddIce { .. } => kind::ADD_ICE,
            Packet::Lose { .. } => kind::LOSE,
            Packet::Restart => kind::RESTART,
        }
    }
}
