//! GPU-ready snapshot of one grid row: a foreground glyph list plus a
//! fixed-length background color strip.

use crate::glyph::Glyph;

/// Packed 24-bit RGB background color for one cell.
pub type BgColor = u32;

/// A single ring slot: a snapshot of one grid row at the moment it was
/// copied in by [`crate::engine::ScrollEngine::flush`].
///
/// `bg_cells.len() == columns` always holds. After [`ScrollbackRow::clear`],
/// `valid` is `false`, `bg_cells` is zeroed, and `fg` is empty but its
/// backing allocation is retained for reuse.
#[derive(Debug, Clone)]
pub struct ScrollbackRow {
    fg: Vec<Glyph>,
    bg_cells: Vec<BgColor>,
    columns: u16,
    valid: bool,
}

impl ScrollbackRow {
    /// Creates an invalid, zeroed row sized to `columns`.
    #[must_use]
    pub fn new(columns: u16) -> Self {
        Self {
            fg: Vec::new(),
            bg_cells: vec![0; columns as usize],
            columns,
            valid: false,
        }
    }

    #[must_use]
    pub fn columns(&self) -> u16 {
        self.columns
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn fg(&self) -> &[Glyph] {
        &self.fg
    }

    #[must_use]
    pub fn bg_cells(&self) -> &[BgColor] {
        &self.bg_cells
    }

    /// Overwrites this row's contents from a grid snapshot, marking it
    /// valid. `bg` must have exactly `self.columns()` entries.
    pub fn snapshot_from(&mut self, bg: &[BgColor], fg: impl IntoIterator<Item = Glyph>) {
        debug_assert_eq!(bg.len(), self.columns as usize);
        self.bg_cells.clear();
        self.bg_cells.extend_from_slice(bg);
        self.fg.clear();
        self.fg.extend(fg);
        self.valid = true;
    }

    /// Clears contents but keeps the `fg` allocation for reuse. `bg_cells`
    /// is zeroed in place (its length, the column count, never changes).
    pub fn clear(&mut self) {
        self.fg.clear();
        self.bg_cells.iter_mut().for_each(|c| *c = 0);
        self.valid = false;
    }
}
