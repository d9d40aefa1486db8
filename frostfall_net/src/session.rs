// A running two-player session.
//
// `GameSession` owns both boards: the authoritative `LocalPlayer` and the
// opponent's `RemotePlayer` mirror. It pumps the network each tick, applies
// opponent packets, and broadcasts everything the local board originates.
//
// Hosting and joining differ only in transport. A host runs the server
// in-process and occupies registry slot 0, receiving guest packets through
// the server's event channel; a guest is a plain `NetClient`. Either way
// exactly one peer is the opponent.
//
// Match start is driven by whichever player holds the lowest ID (the "room
// master", always the host when there is one). Once both players have sent
// `GameReady`, the master announces `ScheduleStart` with a tick countdown
// and, when it expires, sends `GameStart` and starts its own board. The
// guest starts on receipt of `GameStart`, so neither side plays before the
// other has committed.

use std::net::SocketAddr;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};

use frostfall_protocol::packet::Packet;
use frostfall_protocol::types::PlayerId;
use frostfall_sim::config::GameConfig;
use frostfall_sim::player::{LocalPlayer, PlayerAction, PlayerInput, RemotePlayer};

use crate::client::{ClientEvent, NetClient};
use crate::dispatch;
use crate::registry::{PlayerRegistry, lock_registry};
use crate::scheduler::TaskList;
use crate::server::{ServerConfig, ServerEvent, ServerHandle, start_server};

/// Where the client is in its life cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientStage {
    /// Not connected; the session must be rebuilt to play again.
    Login,
    /// Connected, waiting for an opponent and readiness.
    Room,
    /// Both players present, picking characters.
    CharacterSelect,
    /// A match is running (or just ended, until a restart).
    Game,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Won,
    Lost,
}

#[derive(Debug)]
enum SessionTask {
    BeginMatch,
}

enum SessionLink {
    Host {
        // Kept alive for the lifetime of the session.
        _handle: ServerHandle,
        events: Receiver<ServerEvent>,
        registry: Arc<Mutex<PlayerRegistry>>,
    },
    Guest {
        client: NetClient,
    },
}

pub struct GameSession {
    pub local: LocalPlayer,
    pub remote: RemotePlayer,
    link: SessionLink,
    local_id: PlayerId,
    opponent: Option<(PlayerId, String)>,
    stage: ClientStage,
    tasks: TaskList<SessionTask>,
    ready: bool,
    opponent_ready: bool,
    pub own_character: Option<u8>,
    pub opponent_character: Option<u8>,
    outcome: Option<MatchOutcome>,
    /// Ticks until the match starts, for a countdown display.
    countdown: Option<u32>,
    pub chat_log: Vec<(PlayerId, String)>,
    actions: Vec<PlayerAction>,
}

impl GameSession {
    /// Start a server in-process and take the first seat.
    pub fn host(
        name: &str,
        config: GameConfig,
        seed: u64,
        port: u16,
    ) -> std::io::Result<(Self, SocketAddr)> {
        let (handle, addr, events) = start_server(ServerConfig {
            port,
            max_players: 2,
        })?;
        let registry = handle.registry();
        let local_id = lock_registry(&registry).reserve_host(name);
        let mut session = Self::build(
            config,
            seed,
            SessionLink::Host {
                _handle: handle,
                events,
                registry,
            },
            local_id,
            None,
        );
        session.send(&Packet::EnterRoom { id: local_id });
        Ok((session, addr))
    }

    /// Join someone else's server.
    pub fn join(
        addr: SocketAddr,
        name: &str,
        config: GameConfig,
        seed: u64,
    ) -> Result<Self, String> {
        let (client, info) = NetClient::connect(addr, name)?;
        let opponent = info
            .roster
            .into_iter()
            .find(|entry| entry.id != info.id)
            .map(|entry| (entry.id, entry.name));
        let mut session = Self::build(
            config,
            seed,
            SessionLink::Guest { client },
            info.id,
            opponent,
        );
        session.send(&Packet::EnterRoom { id: session.local_id });
        Ok(session)
    }

    fn build(
        config: GameConfig,
        seed: u64,
        link: SessionLink,
        local_id: PlayerId,
        opponent: Option<(PlayerId, String)>,
    ) -> Self {
        Self {
            local: LocalPlayer::new(config.clone(), seed),
            remote: RemotePlayer::new(config),
            link,
            local_id,
            opponent,
            stage: ClientStage::Room,
            tasks: TaskList::new(),
            ready: false,
            opponent_ready: false,
            own_character: None,
            opponent_character: None,
            outcome: None,
            countdown: None,
            chat_log: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    pub fn stage(&self) -> ClientStage {
        self.stage
    }

    pub fn opponent(&self) -> Option<(PlayerId, &str)> {
        self.opponent.as_ref().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    /// The lowest connected ID drives the start sequence.
    fn is_master(&self) -> bool {
        match &self.opponent {
            Some((opponent_id, _)) => self.local_id < *opponent_id,
            None => true,
        }
    }

    // --- lobby actions -----------------------------------------------------

    pub fn chat(&mut self, text: &str) {
        self.chat_log.push((self.local_id, text.to_string()));
        self.send(&Packet::Chat {
            id: self.local_id,
            text: text.to_string(),
        });
    }

    pub fn select_cursor(&mut self, index: u8) {
        if self.stage_to_character_select() {
            // Moving into character select leaves the room and withdraws
            // any readiness declared there.
            self.ready = false;
            self.send(&Packet::LeaveRoom { id: self.local_id });
        }
        self.send(&Packet::SelectCursor {
            id: self.local_id,
            index,
        });
    }

    pub fn confirm_character(&mut self, index: u8) {
        self.own_character = Some(index);
        self.send(&Packet::ConfirmCharacter {
            id: self.local_id,
            index,
        });
    }

    /// Declare readiness. The match starts once both players have done this.
    pub fn mark_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.send(&Packet::GameReady { id: self.local_id });
        self.maybe_schedule_start();
    }

    /// Ask for a rematch after a finished game.
    pub fn request_restart(&mut self) {
        if self.stage == ClientStage::Game && self.outcome.is_some() {
            self.send(&Packet::Restart);
            self.reset_match();
        }
    }

    // --- per-tick driving --------------------------------------------------

    /// Forward one input to the local board and broadcast whatever it did.
    pub fn handle_input(&mut self, input: PlayerInput) {
        let mut actions = std::mem::take(&mut self.actions);
        self.local.handle_input(input, &mut actions);
        for action in actions.drain(..) {
            self.dispatch_action(action);
        }
        self.actions = actions;
    }

    /// Advance the whole session by one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        for packet in self.pump_network() {
            self.handle_packet(packet);
        }

        let due = self.tasks.advance();
        for task in due {
            match task {
                SessionTask::BeginMatch => {
                    self.send(&Packet::GameStart);
                    self.begin_match();
                }
            }
        }
        if let Some(left) = &mut self.countdown {
            *left = left.saturating_sub(1);
        }

        if self.stage == ClientStage::Game {
            let mut actions = std::mem::take(&mut self.actions);
            self.local.update(dt, &mut actions);
            for action in actions.drain(..) {
                self.dispatch_action(action);
            }
            self.actions = actions;
            self.remote.update(dt);
        }
    }

    // --- internals ---------------------------------------------------------

    fn pump_network(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        match &mut self.link {
            SessionLink::Host { events, .. } => loop {
                match events.try_recv() {
                    Ok(ServerEvent::Joined { id, name }) => {
                        self.opponent = Some((id, name));
                    }
                    Ok(ServerEvent::PacketFrom { packet, .. }) => packets.push(packet),
                    Ok(ServerEvent::Left { id }) => {
                        if self.opponent.as_ref().is_some_and(|(o, _)| *o == id) {
                            packets.push(Packet::PlayerLeft { id });
                        }
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            },
            SessionLink::Guest { client } => {
                for event in client.poll() {
                    match event {
                        ClientEvent::Packet(packet) => packets.push(packet),
                        ClientEvent::ConnectionLost(reason) => {
                            eprintln!("[session] connection lost: {reason}");
                            self.stage = ClientStage::Login;
                            self.opponent = None;
                            return packets;
                        }
                    }
                }
            }
        }
        packets
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::PlayerJoined { id, name } => {
                self.opponent = Some((id, name));
            }
            Packet::PlayerLeft { id } | Packet::Logout { id } => {
                if self.opponent.as_ref().is_some_and(|(o, _)| *o == id) {
                    self.opponent_left();
                }
            }
            Packet::Chat { id, text } => {
                self.chat_log.push((id, text));
            }
            Packet::EnterRoom { .. } => {
                // Presence announcement; the roster already carries identity.
            }
            Packet::LeaveRoom { .. } => {
                // Backing out of the room withdraws readiness and cancels a
                // start that was already scheduled.
                self.opponent_ready = false;
                if self.stage != ClientStage::Game {
                    self.tasks.clear();
                    self.countdown = None;
                }
            }
            Packet::SelectCursor { .. } => {
                self.stage_to_character_select();
            }
            Packet::ConfirmCharacter { index, .. } => {
                self.opponent_character = Some(index);
            }
            Packet::GameReady { .. } => {
                self.opponent_ready = true;
                self.maybe_schedule_start();
            }
            Packet::ScheduleStart { countdown_ticks } => {
                self.countdown = Some(countdown_ticks);
            }
            Packet::GameStart => {
                self.begin_match();
            }
            Packet::Restart => {
                self.reset_match();
            }
            Packet::Attack { amount } => {
                self.local.receive_attack(u32::from(amount));
            }
            Packet::Combo { .. } | Packet::Defend { .. } => {
                // Informational; the mirror reproduces the opponent's
                // economy from its own board.
            }
            Packet::Lose { .. } => {
                self.remote.apply_lose();
                if self.outcome.is_none() {
                    self.outcome = Some(MatchOutcome::Won);
                }
            }
            other => {
                if self.stage == ClientStage::Game {
                    dispatch::apply_to_mirror(&mut self.remote, &other);
                }
            }
        }
    }

    fn maybe_schedule_start(&mut self) {
        if !self.is_master()
            || !self.ready
            || !self.opponent_ready
            || self.stage == ClientStage::Game
            || !self.tasks.is_empty()
        {
            return;
        }
        let countdown_ticks = self.local.core.config.timing.countdown_ticks;
        self.send(&Packet::ScheduleStart { countdown_ticks });
        self.countdown = Some(countdown_ticks);
        self.tasks
            .schedule_in(u64::from(countdown_ticks), SessionTask::BeginMatch);
    }

    fn stage_to_character_select(&mut self) -> bool {
        if self.stage == ClientStage::Room {
            self.stage = ClientStage::CharacterSelect;
            return true;
        }
        false
    }

    fn begin_match(&mut self) {
        if self.stage == ClientStage::Game {
            return;
        }
        self.stage = ClientStage::Game;
        self.outcome = None;
        self.countdown = None;
        self.remote.start();
        let mut actions = std::mem::take(&mut self.actions);
        self.local.start(&mut actions);
        for action in actions.drain(..) {
            self.dispatch_action(action);
        }
        self.actions = actions;
    }

    fn reset_match(&mut self) {
        self.local.restart();
        self.remote.restart();
        self.tasks.clear();
        self.ready = false;
        self.opponent_ready = false;
        self.outcome = None;
        self.countdown = None;
        self.stage = ClientStage::Room;
    }

    fn opponent_left(&mut self) {
        self.opponent = None;
        self.reset_match();
    }

    /// Translate a local board action into its packet (plus any local side
    /// effect) and put it on the wire.
    fn dispatch_action(&mut self, action: PlayerAction) {
        let packet = match action {
            PlayerAction::Spawn {
                axis,
                satellite,
                column,
            } => Packet::SpawnGroup {
                axis: axis.to_wire(),
                satellite: satellite.to_wire(),
                column: column as u8,
            },
            PlayerAction::Move(dir) => Packet::BlockMove { dir: dir.to_wire() },
            PlayerAction::Rotate(dir) => Packet::BlockRotate { dir: dir.to_wire() },
            PlayerAction::FastFall(on) => Packet::BlockFall { fast: u8::from(on) },
            PlayerAction::Push => Packet::BlockPush,
            PlayerAction::Settle { axis, satellite } => Packet::BlockSettle {
                axis_x: axis.x as u8,
                axis_y: axis.y as u8,
                satellite_x: satellite.x as u8,
                satellite_y: satellite.y as u8,
            },
            PlayerAction::Combo { depth, garbage } => Packet::Combo {
                depth: depth as u16,
                garbage: garbage as u16,
            },
            PlayerAction::Defend(amount) => Packet::Defend {
                amount: amount as u16,
            },
            PlayerAction::Attack(amount) => {
                // The opponent mirror carries our attack as its pending debt
                // so both displays agree before the wire round trip.
                self.remote.receive_attack(amount);
                Packet::Attack {
                    amount: amount as u16,
                }
            }
            PlayerAction::AddIce { columns } => Packet::AddIce {
                columns: columns.iter().map(|&c| c as u8).collect(),
            },
            PlayerAction::Lose => {
                self.outcome = Some(MatchOutcome::Lost);
                Packet::Lose { id: self.local_id }
            }
        };
        self.send(&packet);
    }

    fn send(&mut self, packet: &Packet) {
        match &mut self.link {
            SessionLink::Host { registry, .. } => {
                lock_registry(registry).broadcast(packet);
            }
            SessionLink::Guest { client } => {
                if let Err(err) = client.send(packet) {
                    eprintln!("[session] send failed: {err}");
                    self.stage = ClientStage::Login;
                }
            }
        }
    }
}
