// Client-side connection.
//
// `NetClient::connect` performs the login handshake synchronously (so the
// caller knows immediately whether it got in and under what ID), then hands
// the read half to a background thread that decodes frames into an mpsc
// channel. `poll` drains that channel without blocking; call it once per
// tick.

use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread;
use std::time::Duration;

use frostfall_protocol::codec::{DecodeError, decode_frame};
use frostfall_protocol::packet::{Packet, PlayerEntry};
use frostfall_protocol::types::{PROTOCOL_VERSION, PlayerId};
use frostfall_protocol::{read_frame, write_packet};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the server told us when we joined.
#[derive(Clone, Debug)]
pub struct JoinInfo {
    pub id: PlayerId,
    pub roster: Vec<PlayerEntry>,
}

/// Something the reader thread pulled off the wire.
#[derive(Debug)]
pub enum ClientEvent {
    Packet(Packet),
    /// The connection is gone; no more packets will arrive.
    ConnectionLost(String),
}

pub struct NetClient {
    stream: TcpStream,
    inbox: Receiver<ClientEvent>,
    id: PlayerId,
}

impl NetClient {
    /// Connect, log in, and wait for the welcome sequence. Errors are
    /// strings meant for the player ("server full", connection refused, ..).
    pub fn connect<A: ToSocketAddrs>(addr: A, name: &str) -> Result<(Self, JoinInfo), String> {
        let stream = TcpStream::connect(addr).map_err(|err| format!("connect: {err}"))?;
        stream
            .set_nodelay(true)
            .map_err(|err| format!("set_nodelay: {err}"))?;
        stream
            .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
            .map_err(|err| format!("set_read_timeout: {err}"))?;

        let mut writer = stream.try_clone().map_err(|err| format!("clone: {err}"))?;
        write_packet(
            &mut writer,
            &Packet::Login {
                version: PROTOCOL_VERSION,
                name: name.into(),
            },
        )
        .map_err(|err| format!("sending login: {err}"))?;

        let mut reader =
            BufReader::new(stream.try_clone().map_err(|err| format!("clone: {err}"))?);
        let id = match recv_packet(&mut reader)? {
            Packet::Welcome { id } => id,
            Packet::JoinDenied { reason } => return Err(deny_message(reason).to_string()),
            other => return Err(format!("unexpected reply kind {:#06x}", other.kind())),
        };
        let Packet::Roster { players } = recv_packet(&mut reader)? else {
            return Err("expected roster after welcome".to_string());
        };

        stream
            .set_read_timeout(None)
            .map_err(|err| format!("clear read timeout: {err}"))?;

        let (inbox_tx, inbox_rx) = channel();
        thread::Builder::new()
            .name("frostfall-client-reader".to_string())
            .spawn(move || {
                loop {
                    let frame = match read_frame(&mut reader) {
                        Ok(frame) => frame,
                        Err(err) => {
                            let _ = inbox_tx.send(ClientEvent::ConnectionLost(err.to_string()));
                            return;
                        }
                    };
                    match decode_frame(&frame) {
                        Ok(packet) => {
                            if inbox_tx.send(ClientEvent::Packet(packet)).is_err() {
                                return;
                            }
                        }
                        // An unknown kind is dropped; the frame boundary is
                        // still intact.
                        Err(err @ DecodeError::UnknownKind(_)) => {
                            eprintln!("[client] dropping frame: {err}");
                        }
                        Err(err) => {
                            let _ = inbox_tx.send(ClientEvent::ConnectionLost(err.to_string()));
                            return;
                        }
                    }
                }
            })
            .map_err(|err| format!("spawning reader: {err}"))?;

        let client = Self {
            stream,
            inbox: inbox_rx,
            id,
        };
        let info = JoinInfo {
            id,
            roster: players,
        };
        Ok((client, info))
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Send one packet to the server.
    pub fn send(&mut self, packet: &Packet) -> Result<(), String> {
        write_packet(&mut self.stream, packet).map_err(|err| format!("send: {err}"))
    }

    /// Drain everything the reader thread has queued.
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Reader thread reported ConnectionLost before exiting,
                    // or never started; either way nothing more is coming.
                    break;
                }
            }
        }
        events
    }

    /// Announce departure and shut the socket down.
    pub fn disconnect(mut self) {
        let _ = self.send(&Packet::Logout { id: self.id });
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

fn recv_packet(reader: &mut BufReader<TcpStream>) -> Result<Packet, String> {
    let frame = read_frame(reader).map_err(|err| format!("reading reply: {err}"))?;
    decode_frame(&frame).map_err(|err| format!("decoding reply: {err}"))
}

fn deny_message(reason: u8) -> &'static str {
    use frostfall_protocol::deny_reason;
    match reason {
        deny_reason::SESSION_FULL => "server is full",
        deny_reason::BAD_VERSION => "protocol version mismatch",
        deny_reason::BAD_NAME => "name rejected",
        _ => "join denied",
    }
}
