//! Neovide-style smooth-scroll animation engine over a row-based cell grid.
//!
//! The terminal emulator owns parsing, the live cell grid, and the render
//! loop; this crate only owns the scrollback ring, the spring that drives
//! the animation, and the populate/restore bracket that splices animated
//! content into the grid immediately before a GPU upload.

pub mod engine;
pub mod glyph;
pub mod grid;
pub mod osc;
pub mod ring;
pub mod row;
pub mod spring;

pub use engine::{ResizeError, ScrollEngine};
pub use glyph::{Glyph, StyleBits};
pub use grid::{CellGrid, RendererUniforms, ScrollRegion};
pub use osc::{parse_scroll_region, ScrollRegionRequest};
pub use ring::RingBuffer;
pub use row::{BgColor, ScrollbackRow};
pub use spring::Spring;
