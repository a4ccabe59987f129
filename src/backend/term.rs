use std::io::{self, Write};
use std::time::Duration;

use crossterm::QueueableCommand;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{
    Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::style::Attribute;
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};

use crate::error::Result;
use crate::geometry::Size;
use crate::style::{self, Style, TextAttr};
use crate::surface::{CONTINUATION, CellBuffer, Surface};

use super::{Backend, InputEvent, map_event};

/// Crossterm-backed terminal: raw mode, alternate screen, mouse capture,
/// and row-diffed presentation.
///
/// `present` hashes each row of the composited buffer and rewrites only the
/// rows whose hash changed since the previous frame, as one queued batch
/// with a single flush.
pub struct TermBackend<W: Write> {
    out: W,
    fallback: Size,
    row_hashes: Vec<Option<blake3::Hash>>,
    hashed_size: Option<Size>,
}

impl TermBackend<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TermBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            fallback: Size::new(80, 24),
            row_hashes: Vec::new(),
            hashed_size: None,
        }
    }

    fn emit_row(&mut self, screen: &CellBuffer, y: u16) -> Result<()> {
        self.out.queue(MoveTo(0, y))?;
        let mut run = String::new();
        let mut run_style: Option<Style> = None;
        for x in 0..screen.size().width {
            let Some(cell) = screen.cell(x, y) else {
                continue;
            };
            if cell.ch == CONTINUATION {
                continue;
            }
            if run_style != Some(cell.style) {
                self.flush_run(&mut run, run_style)?;
                run_style = Some(cell.style);
            }
            run.push(cell.ch);
        }
        self.flush_run(&mut run, run_style)?;
        Ok(())
    }

    fn flush_run(&mut self, run: &mut String, style: Option<Style>) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let style = style.unwrap_or_default();
        let (fg, bg, attr) = style::key_of(style);
        self.out.queue(SetAttribute(Attribute::Reset))?;
        self.out.queue(SetForegroundColor(fg))?;
        self.out.queue(SetBackgroundColor(bg))?;
        if attr != TextAttr::Normal {
            self.out.queue(SetAttribute(attr.attribute()))?;
        }
        self.out.queue(Print(run.as_str()))?;
        run.clear();
        Ok(())
    }
}

fn row_hash(screen: &CellBuffer, y: u16) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for x in 0..screen.size().width {
        if let Some(cell) = screen.cell(x, y) {
            hasher.update(&(cell.ch as u32).to_le_bytes());
            hasher.update(&cell.style.0.to_le_bytes());
        }
    }
    hasher.finalize()
}

impl<W: Write> Backend for TermBackend<W> {
    fn size(&self) -> Size {
        crossterm::terminal::size()
            .map(|(width, height)| Size::new(width, height))
            .unwrap_or(self.fallback)
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        let mut wait = timeout;
        loop {
            if !event::poll(wait)? {
                return Ok(None);
            }
            match map_event(event::read()?) {
                Some(mapped) => return Ok(Some(mapped)),
                // Undecodable input is dropped; keep draining.
                None => wait = Duration::ZERO,
            }
        }
    }

    fn present(&mut self, screen: &CellBuffer) -> Result<()> {
        let size = screen.size();
        if self.hashed_size != Some(size) {
            self.hashed_size = Some(size);
            self.row_hashes.clear();
            self.row_hashes.resize(size.height as usize, None);
            self.out.queue(Clear(ClearType::All))?;
        }

        for y in 0..size.height {
            let hash = row_hash(screen, y);
            if self.row_hashes[y as usize] == Some(hash) {
                continue;
            }
            self.row_hashes[y as usize] = Some(hash);
            self.emit_row(screen, y)?;
        }

        self.out.queue(SetAttribute(Attribute::Reset))?;
        self.out.queue(ResetColor)?;
        self.out.flush()?;
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        self.out.queue(EnterAlternateScreen)?;
        self.out.queue(EnableMouseCapture)?;
        self.out.queue(Hide)?;
        self.out.queue(Clear(ClearType::All))?;
        self.out.flush()?;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.out.queue(Show)?;
        self.out.queue(DisableMouseCapture)?;
        self.out.queue(LeaveAlternateScreen)?;
        self.out.flush()?;
        disable_raw_mode()?;
        Ok(())
    }
}
