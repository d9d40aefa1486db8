// Match server.
//
// `start_server` binds a TCP listener and spawns the accept thread. Each
// accepted connection gets a 5 second window to send `Login`; a valid login
// seats the player in the shared `PlayerRegistry` and spawns a dedicated
// reader thread for the connection. Reader threads decode frames, fan them
// out to the other players, and report everything up a channel so a hosting
// player (or the headless binary) can observe the session.
//
// Binding port 0 picks a free port, which is what the tests do.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use frostfall_protocol::codec::{DecodeError, decode_frame};
use frostfall_protocol::packet::{Packet, kind};
use frostfall_protocol::types::PlayerId;
use frostfall_protocol::{read_frame, write_packet};

use crate::registry::{PlayerRegistry, lock_registry};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the server reports to its owner.
#[derive(Debug)]
pub enum ServerEvent {
    /// A guest completed the login handshake.
    Joined { id: PlayerId, name: String },
    /// A decoded packet arrived from a guest. It has already been forwarded
    /// to the other connected players.
    PacketFrom { id: PlayerId, packet: Packet },
    /// A guest disconnected or violated the protocol.
    Left { id: PlayerId },
}

pub struct ServerConfig {
    /// Port to listen on; 0 lets the OS pick.
    pub port: u16,
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            max_players: 2,
        }
    }
}

/// Keeps the server alive; dropping or calling `stop` shuts it down.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    registry: Arc<Mutex<PlayerRegistry>>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Shared registry, for sending packets to guests.
    pub fn registry(&self) -> Arc<Mutex<PlayerRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Bind, spawn the accept thread, and return the handle, the bound address,
/// and the event channel.
pub fn start_server(
    config: ServerConfig,
) -> std::io::Result<(ServerHandle, SocketAddr, Receiver<ServerEvent>)> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let registry = Arc::new(Mutex::new(PlayerRegistry::new(config.max_players)));
    let keep_running = Arc::new(AtomicBool::new(true));
    let (events_tx, events_rx) = channel();

    let thread = {
        let registry = Arc::clone(&registry);
        let keep_running = Arc::clone(&keep_running);
        thread::Builder::new()
            .name("frostfall-accept".to_string())
            .spawn(move || accept_loop(listener, registry, events_tx, keep_running))?
    };

    let handle = ServerHandle {
        keep_running,
        registry,
        thread: Some(thread),
    };
    Ok((handle, addr, events_rx))
}

fn accept_loop(
    listener: TcpListener,
    registry: Arc<Mutex<PlayerRegistry>>,
    events_tx: Sender<ServerEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let registry = Arc::clone(&registry);
                let events_tx = events_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("frostfall-conn-{peer}"))
                    .spawn(move || handle_connection(stream, registry, events_tx));
                if let Err(err) = spawned {
                    eprintln!("[server] could not spawn connection thread: {err}");
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                eprintln!("[server] accept failed: {err}");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

/// Handshake, then run the reader loop until the connection dies.
fn handle_connection(
    stream: TcpStream,
    registry: Arc<Mutex<PlayerRegistry>>,
    events_tx: Sender<ServerEvent>,
) {
    let id = match handshake(&stream, &registry) {
        Ok((id, name)) => {
            let _ = events_tx.send(ServerEvent::Joined { id, name });
            id
        }
        Err(err) => {
            eprintln!("[server] login rejected: {err}");
            return;
        }
    };

    reader_loop(&stream, id, &registry, &events_tx);

    lock_registry(&registry).remove_player(id);
    let _ = events_tx.send(ServerEvent::Left { id });
}

fn handshake(
    stream: &TcpStream,
    registry: &Arc<Mutex<PlayerRegistry>>,
) -> Result<(PlayerId, String), String> {
    stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(|err| format!("set_read_timeout: {err}"))?;
    stream
        .set_nodelay(true)
        .map_err(|err| format!("set_nodelay: {err}"))?;

    let mut reader = BufReader::new(
        stream
            .try_clone()
            .map_err(|err| format!("try_clone: {err}"))?,
    );
    let frame = read_frame(&mut reader).map_err(|err| format!("reading login: {err}"))?;
    let packet = decode_frame(&frame).map_err(|err| format!("decoding login: {err}"))?;
    let Packet::Login { version, name } = packet else {
        return Err(format!("expected login, got kind {:#06x}", packet.kind()));
    };

    let writer = stream
        .try_clone()
        .map_err(|err| format!("try_clone: {err}"))?;
    let admitted = lock_registry(registry).add_player(name.clone(), version, writer);
    match admitted {
        Ok(id) => {
            stream
                .set_read_timeout(None)
                .map_err(|err| format!("clear read timeout: {err}"))?;
            Ok((id, name))
        }
        Err(reason) => {
            // Best effort; the stream closes either way.
            let mut stream = stream;
            let _ = write_packet(&mut stream, &Packet::JoinDenied { reason });
            Err(format!("denied with reason {reason}"))
        }
    }
}

fn reader_loop(
    stream: &TcpStream,
    id: PlayerId,
    registry: &Arc<Mutex<PlayerRegistry>>,
    events_tx: &Sender<ServerEvent>,
) {
    let Ok(clone) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(clone);
    loop {
        let frame = match read_frame(&mut reader) {
            Ok(frame) => frame,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::UnexpectedEof {
                    eprintln!("[server] read from {id} failed: {err}");
                }
                return;
            }
        };
        let packet = match decode_frame(&frame) {
            Ok(packet) => packet,
            // An unknown kind is dropped; the frame boundary is still intact.
            Err(err @ DecodeError::UnknownKind(_)) => {
                eprintln!("[server] dropping frame from {id}: {err}");
                continue;
            }
            Err(err) => {
                eprintln!("[server] bad frame from {id}: {err}");
                return;
            }
        };
        if packet.kind() == kind::LOGIN {
            // A second login is a protocol violation.
            eprintln!("[server] duplicate login from {id}");
            return;
        }

        let is_logout = matches!(packet, Packet::Logout { .. });
        lock_registry(registry).forward_frame(id, &frame);
        if events_tx
            .send(ServerEvent::PacketFrom { id, packet })
            .is_err()
        {
            return;
        }
        if is_logout {
            return;
        }
    }
}
