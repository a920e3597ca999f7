//! Compact binary framing for the collab protocol: `[1-byte type][2-byte
//! big-endian length][N-byte payload]`. No relay, no handshake beyond the
//! message plane itself — framing is the entire transport contract.

/// Largest payload any defined message type carries. Buffers are sized
/// against this, not against the frame's own length field.
pub const MAX_PAYLOAD: usize = 512;

pub const TYPE_JOIN: u8 = 0x01;
pub const TYPE_WELCOME: u8 = 0x02;
pub const TYPE_PEER_JOINED: u8 = 0x03;
pub const TYPE_PEER_LEFT: u8 = 0x04;
pub const TYPE_PRESENCE: u8 = 0x10;

const HEADER_LEN: usize = 3;

/// Encodes one frame: type byte, then payload length as big-endian `u16`,
/// then the payload itself. Panics if `payload.len() > u16::MAX` — callers
/// never construct payloads anywhere near that size.
#[must_use]
pub fn encode_frame(msg_type: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= u16::MAX as usize, "collab payload too large to frame");
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.push(msg_type);
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// A single decoded frame, and how many bytes of `buf` it consumed.
pub struct DecodedFrame<'a> {
    pub msg_type: u8,
    pub payload: &'a [u8],
    pub consumed: usize,
}

/// Attempts to decode one complete frame from the front of `buf`.
///
/// Returns `None` if fewer than a full frame's worth of bytes are buffered
/// yet — this is not an error; the caller is expected to wait for more
/// bytes to arrive on the socket. A length field claiming a payload larger
/// than [`MAX_PAYLOAD`] is treated the same way a malformed type is: dropped
/// by the caller after skipping past it, not torn down as a connection
/// error.
#[must_use]
pub fn try_decode_frame(buf: &[u8]) -> Option<DecodedFrame<'_>> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let msg_type = buf[0];
    let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
    let total = HEADER_LEN + len;
    if buf.len() < total {
        return None;
    }
    Some(DecodedFrame { msg_type, payload: &buf[HEADER_LEN..total], consumed: total })
}
