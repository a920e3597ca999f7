//! Cursor/mode/file presence, broadcast roughly once per animation frame.
//! Wire form is 12 fixed bytes followed by `file_name_len` name bytes.

const FIXED_LEN: usize = 12;
const FILE_NAME_CAPACITY: usize = 256;

/// Editor mode as reported by the host application. Unknown values decode to
/// `None` rather than erroring — presence is best-effort and self-healing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Normal,
    Insert,
    Visual,
    Command,
    Replace,
}

impl EditorMode {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EditorMode::Normal => 0,
            EditorMode::Insert => 1,
            EditorMode::Visual => 2,
            EditorMode::Command => 3,
            EditorMode::Replace => 4,
        }
    }

    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(EditorMode::Normal),
            1 => Some(EditorMode::Insert),
            2 => Some(EditorMode::Visual),
            3 => Some(EditorMode::Command),
            4 => Some(EditorMode::Replace),
            _ => None,
        }
    }
}

/// One peer's cursor position, mode, and open file, as of its last update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub peer_id: u8,
    /// 1-based row, as delivered by the host editor.
    pub row: u16,
    /// 1-based virtual column, as delivered by the host editor.
    pub col: u16,
    pub mode: EditorMode,
    pub file_name: String,
}

impl Presence {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let name_bytes = self.file_name.as_bytes();
        let name_len = name_bytes.len().min(FILE_NAME_CAPACITY);
        let mut out = Vec::with_capacity(FIXED_LEN + name_len);
        out.push(self.peer_id);
        out.push(self.mode.to_byte());
        out.extend_from_slice(&self.row.to_be_bytes());
        out.extend_from_slice(&self.col.to_be_bytes());
        out.extend_from_slice(&(name_len as u16).to_be_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved, rounds the fixed part to 12 bytes
        out.extend_from_slice(&name_bytes[..name_len]);
        out
    }

    /// Decodes a presence record. `None` if the slice is shorter than the
    /// fixed header, the declared name length doesn't match the remaining
    /// bytes, the mode byte is unrecognized, or the name isn't valid UTF-8.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < FIXED_LEN {
            return None;
        }
        let peer_id = bytes[0];
        let mode = EditorMode::from_byte(bytes[1])?;
        let row = u16::from_be_bytes([bytes[2], bytes[3]]);
        let col = u16::from_be_bytes([bytes[4], bytes[5]]);
        let name_len = u16::from_be_bytes([bytes[6], bytes[7]]) as usize;
        if name_len > FILE_NAME_CAPACITY || bytes.len() != FIXED_LEN + name_len {
            return None;
        }
        let file_name = std::str::from_utf8(&bytes[FIXED_LEN..]).ok()?.to_string();
        Some(Self { peer_id, row, col, mode, file_name })
    }
}
