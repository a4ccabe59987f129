use unicode_width::UnicodeWidthChar;

use crate::geometry::{Rect, Size};
use crate::style::Style;

/// Box-drawing glyphs used by window borders and rules.
pub mod glyph {
    pub const HLINE: char = '─';
    pub const VLINE: char = '│';
    pub const TOP_LEFT: char = '┌';
    pub const TOP_RIGHT: char = '┐';
    pub const BOTTOM_LEFT: char = '└';
    pub const BOTTOM_RIGHT: char = '┘';
    pub const TEE_DOWN: char = '┬';
    pub const TEE_UP: char = '┴';
    pub const TEE_RIGHT: char = '├';
    pub const TEE_LEFT: char = '┤';
    pub const CROSS: char = '┼';

    pub const DOUBLE_HLINE: char = '═';
    pub const DOUBLE_VLINE: char = '║';
    pub const DOUBLE_TOP_LEFT: char = '╔';
    pub const DOUBLE_TOP_RIGHT: char = '╗';
    pub const DOUBLE_BOTTOM_LEFT: char = '╚';
    pub const DOUBLE_BOTTOM_RIGHT: char = '╝';
}

/// Marker stored in the cell shadowed by a wide glyph to its left.
pub(crate) const CONTINUATION: char = '\0';

/// One styled character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: Style::DEFAULT,
        }
    }
}

fn glyph_width(ch: char) -> u16 {
    UnicodeWidthChar::width(ch).unwrap_or(0) as u16
}

/// Drawing target contract shared by window buffers, the compositor screen,
/// and translated child frames.
///
/// Every write clips silently at the surface bounds: a widget that overflows
/// draws a partial result, never an error, so one widget's overflow cannot
/// corrupt or abort a frame.
pub trait Surface {
    fn size(&self) -> Size;

    /// Write a single glyph. Out-of-bounds writes are absorbed.
    fn put_glyph(&mut self, x: u16, y: u16, ch: char, style: Style);

    /// Write a run of text, advancing by display width. Wide glyphs occupy
    /// two cells; a wide glyph whose trailing half would cross the right
    /// edge is dropped entirely.
    fn write_text(&mut self, x: u16, y: u16, text: &str, style: Style) {
        let width = self.size().width;
        let mut cx = x;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let w = glyph_width(ch);
            if w == 0 {
                continue;
            }
            if cx >= width || (w == 2 && cx.saturating_add(1) >= width) {
                break;
            }
            self.put_glyph(cx, y, ch, style);
            cx = cx.saturating_add(w);
        }
    }

    /// Horizontal rule of `len` repeated glyphs.
    fn write_hrule(&mut self, x: u16, y: u16, len: u16, ch: char, style: Style) {
        for i in 0..len {
            self.put_glyph(x.saturating_add(i), y, ch, style);
        }
    }

    /// Vertical rule of `len` repeated glyphs.
    fn write_vrule(&mut self, x: u16, y: u16, len: u16, ch: char, style: Style) {
        for i in 0..len {
            self.put_glyph(x, y.saturating_add(i), ch, style);
        }
    }

    /// Fill a region with one glyph.
    fn fill(&mut self, rect: Rect, ch: char, style: Style) {
        for dy in 0..rect.height {
            for dx in 0..rect.width {
                self.put_glyph(
                    rect.x.saturating_add(dx),
                    rect.y.saturating_add(dy),
                    ch,
                    style,
                );
            }
        }
    }
}

/// Retained grid of styled cells.
///
/// Serves both as each window's backing store and as the compositor's
/// screen buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellBuffer {
    size: Size,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.width as usize * size.height as usize],
        }
    }

    /// Reset every cell to the default blank.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::default());
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(&self.cells[self.index(x, y)])
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    fn set(&mut self, x: u16, y: u16, ch: char, style: Style) {
        let idx = self.index(x, y);
        self.cells[idx] = Cell { ch, style };
    }

    /// Break any wide-glyph pair overlapping column `x` so a later write
    /// cannot leave an orphaned half on the row.
    fn heal(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        let ch = self.cells[idx].ch;
        if ch == CONTINUATION {
            if x > 0 {
                let lead = self.index(x - 1, y);
                self.cells[lead].ch = ' ';
            }
        } else if glyph_width(ch) == 2 && x + 1 < self.size.width {
            let tail = self.index(x + 1, y);
            if self.cells[tail].ch == CONTINUATION {
                self.cells[tail].ch = ' ';
            }
        }
    }

    /// Row contents as text, for assertions and frame capture. Continuation
    /// cells occupy no columns and are skipped.
    pub fn row_text(&self, y: u16) -> String {
        let mut out = String::new();
        if y >= self.size.height {
            return out;
        }
        for x in 0..self.size.width {
            let ch = self.cells[self.index(x, y)].ch;
            if ch != CONTINUATION {
                out.push(ch);
            }
        }
        out
    }

    /// Copy `src` onto this buffer with its top-left at `(at_x, at_y)`,
    /// clipping at the edges.
    pub fn blit_from(&mut self, src: &CellBuffer, at_x: u16, at_y: u16) {
        for sy in 0..src.size.height {
            let dy = at_y.saturating_add(sy);
            if dy >= self.size.height {
                break;
            }
            for sx in 0..src.size.width {
                let dx = at_x.saturating_add(sx);
                if dx >= self.size.width {
                    break;
                }
                let cell = src.cells[src.index(sx, sy)];
                let mut ch = cell.ch;
                // A wide lead whose tail would clip degrades to a blank.
                if glyph_width(ch) == 2 && dx + 1 >= self.size.width {
                    ch = ' ';
                }
                self.heal(dx, dy);
                self.set(dx, dy, ch, cell.style);
            }
        }
    }
}

impl Surface for CellBuffer {
    fn size(&self) -> Size {
        self.size
    }

    fn put_glyph(&mut self, x: u16, y: u16, ch: char, style: Style) {
        if x >= self.size.width || y >= self.size.height {
            return;
        }
        let w = glyph_width(ch);
        if w == 0 {
            return;
        }
        if w == 2 && x + 1 >= self.size.width {
            return;
        }
        self.heal(x, y);
        if w == 2 {
            self.heal(x + 1, y);
            self.set(x, y, ch, style);
            self.set(x + 1, y, CONTINUATION, style);
        } else {
            self.set(x, y, ch, style);
        }
    }
}

/// Line sets available to [`draw_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxLines {
    Single,
    Double,
}

/// Draw a rectangular box along the edges of `rect`. Rectangles thinner
/// than two cells in either direction are skipped.
pub fn draw_box(surface: &mut dyn Surface, rect: Rect, lines: BoxLines, style: Style) {
    if rect.width < 2 || rect.height < 2 {
        return;
    }
    let (h, v, tl, tr, bl, br) = match lines {
        BoxLines::Single => (
            glyph::HLINE,
            glyph::VLINE,
            glyph::TOP_LEFT,
            glyph::TOP_RIGHT,
            glyph::BOTTOM_LEFT,
            glyph::BOTTOM_RIGHT,
        ),
        BoxLines::Double => (
            glyph::DOUBLE_HLINE,
            glyph::DOUBLE_VLINE,
            glyph::DOUBLE_TOP_LEFT,
            glyph::DOUBLE_TOP_RIGHT,
            glyph::DOUBLE_BOTTOM_LEFT,
            glyph::DOUBLE_BOTTOM_RIGHT,
        ),
    };
    let right = rect.x + rect.width - 1;
    let bottom = rect.y + rect.height - 1;
    surface.write_hrule(rect.x + 1, rect.y, rect.width - 2, h, style);
    surface.write_hrule(rect.x + 1, bottom, rect.width - 2, h, style);
    surface.write_vrule(rect.x, rect.y + 1, rect.height - 2, v, style);
    surface.write_vrule(right, rect.y + 1, rect.height - 2, v, style);
    surface.put_glyph(rect.x, rect.y, tl, style);
    surface.put_glyph(right, rect.y, tr, style);
    surface.put_glyph(rect.x, bottom, bl, style);
    surface.put_glyph(right, bottom, br, style);
}

/// Borrowing surface adapter translating child coordinates by an offset and
/// clipping to a sub-rectangle. Containers and windows paint children
/// through it so child code never sees parent coordinates.
pub struct Frame<'a> {
    target: &'a mut dyn Surface,
    origin_x: u16,
    origin_y: u16,
    clip: Size,
}

impl<'a> Frame<'a> {
    pub fn new(target: &'a mut dyn Surface, region: Rect) -> Self {
        Self {
            target,
            origin_x: region.x,
            origin_y: region.y,
            clip: region.size(),
        }
    }
}

impl Surface for Frame<'_> {
    fn size(&self) -> Size {
        self.clip
    }

    fn put_glyph(&mut self, x: u16, y: u16, ch: char, style: Style) {
        if x >= self.clip.width || y >= self.clip.height {
            return;
        }
        if glyph_width(ch) == 2 && x + 1 >= self.clip.width {
            return;
        }
        self.target.put_glyph(
            self.origin_x.saturating_add(x),
            self.origin_y.saturating_add(y),
            ch,
            style,
        );
    }
}
