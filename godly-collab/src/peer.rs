//! Server-side bookkeeping for one connected peer: its socket, identity, and
//! the framing buffer that turns a byte stream into discrete messages.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use crate::profile::Profile;
use crate::wire::{self, DecodedFrame};

const INBOUND_BUFFER_LEN: usize = 4096;

/// One slot in the server's peers table.
pub struct Peer {
    socket: TcpStream,
    pub profile: Profile,
    pub last_presence: Option<crate::presence::Presence>,
    pub connected: bool,
    buf: [u8; INBOUND_BUFFER_LEN],
    write_pos: usize,
}

/// Why a peer's connection ended. `Closed` covers both clean EOF and the
/// buffer overflowing with undecodable garbage — either way the peer is
/// removed, not the server.
#[derive(Debug)]
pub enum PeerError {
    Closed,
    Io(io::Error),
}

impl Peer {
    #[must_use]
    pub fn new(socket: TcpStream) -> Self {
        Self {
            socket,
            profile: Profile::new(0, "", 0),
            last_presence: None,
            connected: true,
            buf: [0u8; INBOUND_BUFFER_LEN],
            write_pos: 0,
        }
    }

    /// Writes a pre-framed message, best-effort. A short write or
    /// `WouldBlock` is dropped silently: presence is self-healing, and join
    /// replies are idempotent enough to not need a retry queue here.
    pub fn send(&mut self, frame: &[u8]) {
        match self.socket.write(frame) {
            Ok(n) if n == frame.len() => {}
            Ok(_) => log::debug!("collab: short write to peer, frame dropped"),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => log::debug!("collab: write error to peer: {e}"),
        }
    }

    /// Attempts one non-blocking read, then decodes as many complete frames
    /// as are now buffered, shifting any residual partial frame to the
    /// front. Returns the decoded `(type, payload)` pairs in arrival order.
    ///
    /// `Err(PeerError::Closed)` on EOF; `Err(PeerError::Io)` on any other
    /// read error besides `WouldBlock`. Both mean the caller should remove
    /// this peer.
    pub fn pump(&mut self) -> Result<Vec<(u8, Vec<u8>)>, PeerError> {
        match self.socket.read(&mut self.buf[self.write_pos..]) {
            Ok(0) => return Err(PeerError::Closed),
            Ok(n) => self.write_pos += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(PeerError::Io(e)),
        }

        let mut messages = Vec::new();
        let mut offset = 0;
        loop {
            let Some(DecodedFrame { msg_type, payload, consumed }) =
                wire::try_decode_frame(&self.buf[offset..self.write_pos])
            else {
                break;
            };
            if payload.len() <= wire::MAX_PAYLOAD {
                messages.push((msg_type, payload.to_vec()));
            } else {
                log::debug!("collab: dropping oversized frame from peer, type={msg_type}");
            }
            offset += consumed;
        }

        if offset > 0 {
            self.buf.copy_within(offset..self.write_pos, 0);
            self.write_pos -= offset;
        }
        if self.write_pos == self.buf.len() {
            log::warn!("collab: peer inbound buffer full with no decodable frame, dropping peer");
            return Err(PeerError::Closed);
        }

        Ok(messages)
    }
}
