//! Identity record exchanged on join, fixed at exactly 38 bytes on the wire:
//! `[peer_id][name_len][32-byte name padding][4-byte color]`.

/// Peer id reserved for "not yet connected" on a fresh client, and for the
/// host on the server side.
pub const UNASSIGNED_PEER_ID: u8 = 0;

pub const WIRE_LEN: usize = 38;
const NAME_CAPACITY: usize = 32;

/// A peer's display identity: name, 24-bit color, and the id the server
/// assigns on join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub peer_id: u8,
    pub name: String,
    /// 24-bit RGB, packed into the low 3 bytes of a `u32`.
    pub color: u32,
}

impl Profile {
    #[must_use]
    pub fn new(peer_id: u8, name: impl Into<String>, color: u32) -> Self {
        let mut name = name.into();
        if name.len() > NAME_CAPACITY {
            // `name.len()` is a byte offset but not necessarily a char
            // boundary; walk back to the last one at or before the cut
            // point so we never split a multi-byte codepoint.
            let boundary = (0..=NAME_CAPACITY).rev().find(|&i| name.is_char_boundary(i)).unwrap();
            name.truncate(boundary);
        }
        Self { peer_id, name, color }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        out[0] = self.peer_id;
        let name_bytes = self.name.as_bytes();
        let name_len = name_bytes.len().min(NAME_CAPACITY);
        out[1] = name_len as u8;
        out[2..2 + name_len].copy_from_slice(&name_bytes[..name_len]);
        out[34..38].copy_from_slice(&self.color.to_be_bytes());
        out
    }

    /// Decodes a profile from an exactly-38-byte slice. `None` if the
    /// declared name length doesn't fit the padding, or the slice is the
    /// wrong size, or the name bytes aren't valid UTF-8.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != WIRE_LEN {
            return None;
        }
        let peer_id = bytes[0];
        let name_len = bytes[1] as usize;
        if name_len > NAME_CAPACITY {
            return None;
        }
        let name = std::str::from_utf8(&bytes[2..2 + name_len]).ok()?.to_string();
        let color = u32::from_be_bytes(bytes[34..38].try_into().unwrap());
        Some(Self { peer_id, name, color })
    }
}
