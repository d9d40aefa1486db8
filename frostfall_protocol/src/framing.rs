// Frame accumulation and transport helpers.
//
// TCP hands the reader arbitrary byte runs: half a header, three packets at
// once, a packet split across reads. `FrameBuffer` reassembles those runs
// into complete frames (header plus payload) without blocking.
//
// A declared total size outside `[HEADER_SIZE, MAX_PACKET_SIZE]` is a
// protocol violation. There is no way to resynchronize a byte stream after
// one, so the buffer is cleared wholesale and the caller should drop the
// connection.
//
// `write_packet` and `read_frame` are the blocking companions for the
// threaded reader/writer loops in the net crate.

use std::io::{self, Read, Write};

use crate::codec;
use crate::packet::Packet;
use crate::types::{HEADER_SIZE, MAX_PACKET_SIZE};

/// One step of frame extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameStep {
    /// A complete frame: header plus payload, ready for `decode_frame`.
    Frame(Vec<u8>),
    /// Not enough bytes buffered yet.
    Incomplete,
    /// The header declared an impossible total size. The buffer has been
    /// cleared; the connection is unrecoverable.
    Violation { declared: u32 },
}

/// Reassembles a TCP byte stream into protocol frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Try to extract the next complete frame. Call repeatedly until it
    /// returns `Incomplete`.
    pub fn next_frame(&mut self) -> FrameStep {
        if self.buf.len() < HEADER_SIZE {
            return FrameStep::Incomplete;
        }
        let declared = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        if (declared as usize) < HEADER_SIZE || declared > MAX_PACKET_SIZE {
            self.buf.clear();
            return FrameStep::Violation { declared };
        }
        if self.buf.len() < declared as usize {
            return FrameStep::Incomplete;
        }
        let frame = self.buf.drain(..declared as usize).collect();
        FrameStep::Frame(frame)
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Encode and write one packet, flushing so it leaves immediately.
pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> io::Result<()> {
    writer.write_all(&codec::encode(packet))?;
    writer.flush()
}

/// Blocking read of one complete frame: header, then the rest of the
/// declared total size. Returns `InvalidData` for an impossible declaration
/// and `UnexpectedEof` if the stream closes mid-frame.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if (declared as usize) < HEADER_SIZE || declared > MAX_PACKET_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("declared frame of {declared} bytes (max {MAX_PACKET_SIZE})"),
        ));
    }
    let mut frame = vec![0u8; declared as usize];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..])?;
    Ok(frame)
}
