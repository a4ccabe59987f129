mod core;

pub use self::core::{BoxLines, Cell, CellBuffer, Frame, Surface, draw_box, glyph};
pub(crate) use self::core::CONTINUATION;
