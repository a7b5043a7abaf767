//! Terminal renderer using crossterm
//!
//! [`Renderer`] is a [`Surface`]: the engine draws into its cell buffer and
//! `present` writes only the cells that changed since the last frame.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, SetCursorStyle, Show},
    queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen},
};
use unicode_width::UnicodeWidthChar;

use crate::core::term::{AttrFlags, CursorInfo, CursorShape, Style, Surface};

/// A cell in the render buffer
#[derive(Clone, Debug, PartialEq)]
struct RenderCell {
    text: String,
    style: Style,
}

impl Default for RenderCell {
    fn default() -> Self {
        Self {
            text: " ".to_string(),
            style: Style::default(),
        }
    }
}

impl RenderCell {
    fn width(&self) -> u16 {
        self.text
            .chars()
            .next()
            .and_then(UnicodeWidthChar::width)
            .unwrap_or(1)
            .max(1) as u16
    }
}

/// Terminal renderer
pub struct Renderer {
    cols: u16,
    rows: u16,
    cells: Vec<RenderCell>,
    /// What is on screen now; `None` forces a full repaint
    shown: Option<Vec<RenderCell>>,
    initialized: bool,
}

impl Renderer {
    pub fn new(cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![RenderCell::default(); cols as usize * rows as usize],
            shown: None,
            initialized: false,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        queue!(
            stdout,
            EnterAlternateScreen,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        stdout.flush()?;
        self.initialized = true;
        self.shown = None;
        Ok(())
    }

    /// Restore the host terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        queue!(
            stdout,
            ResetColor,
            SetAttribute(Attribute::Reset),
            SetCursorStyle::DefaultUserShape,
            Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        stdout.flush()?;
        terminal::disable_raw_mode()
    }

    /// Resize the buffer; the next frame repaints everything
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self.cells = vec![RenderCell::default(); self.cols as usize * self.rows as usize];
        self.shown = None;
    }

    /// Write the frame to stdout
    pub fn present(&mut self, cursor: CursorInfo) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = io::BufWriter::with_capacity(65536, stdout.lock());
        self.present_to(&mut out, cursor)?;
        out.flush()
    }

    /// Write changed cells and the cursor to `out`
    pub fn present_to<W: Write>(&mut self, out: &mut W, cursor: CursorInfo) -> io::Result<()> {
        // Begin synchronized update
        write!(out, "\x1b[?2026h")?;
        queue!(out, Hide)?;
        if self.shown.is_none() {
            queue!(out, SetAttribute(Attribute::Reset), ResetColor, Clear(ClearType::All))?;
        }

        let cols = self.cols as usize;
        let mut current: Option<&Style> = None;
        let mut next_pos: Option<(u16, u16)> = None;
        for y in 0..self.rows {
            let mut x = 0u16;
            while x < self.cols {
                let idx = y as usize * cols + x as usize;
                let cell = &self.cells[idx];
                let width = cell.width();
                if x + width > self.cols {
                    break;
                }
                let unchanged = self
                    .shown
                    .as_ref()
                    .is_some_and(|shown| shown[idx] == *cell);
                if !unchanged {
                    if next_pos != Some((x, y)) {
                        queue!(out, MoveTo(x, y))?;
                    }
                    if current != Some(&cell.style) {
                        Self::apply_style(out, &cell.style)?;
                        current = Some(&cell.style);
                    }
                    queue!(out, Print(&cell.text))?;
                    next_pos = Some((x + width, y));
                }
                x += width;
            }
        }
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;

        if cursor.visible {
            queue!(
                out,
                MoveTo(cursor.col, cursor.row),
                Self::cursor_style(cursor.shape),
                Show
            )?;
        }

        // End synchronized update
        write!(out, "\x1b[?2026l")?;
        self.shown = Some(self.cells.clone());
        Ok(())
    }

    fn cursor_style(shape: CursorShape) -> SetCursorStyle {
        match shape {
            CursorShape::Default => SetCursorStyle::DefaultUserShape,
            CursorShape::BlinkingBlock => SetCursorStyle::BlinkingBlock,
            CursorShape::SteadyBlock => SetCursorStyle::SteadyBlock,
            CursorShape::BlinkingUnderline => SetCursorStyle::BlinkingUnderScore,
            CursorShape::SteadyUnderline => SetCursorStyle::SteadyUnderScore,
            CursorShape::BlinkingBar => SetCursorStyle::BlinkingBar,
            CursorShape::SteadyBar => SetCursorStyle::SteadyBar,
        }
    }

    /// Apply cell attributes
    fn apply_style<W: Write>(out: &mut W, style: &Style) -> io::Result<()> {
        queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;

        let flags = style.flags;
        let attrs = [
            (AttrFlags::BOLD, Attribute::Bold),
            (AttrFlags::DIM, Attribute::Dim),
            (AttrFlags::ITALIC, Attribute::Italic),
            (AttrFlags::UNDERLINE, Attribute::Underlined),
            (AttrFlags::BLINK, Attribute::SlowBlink),
            (AttrFlags::INVERSE, Attribute::Reverse),
            (AttrFlags::HIDDEN, Attribute::Hidden),
            (AttrFlags::STRIKETHROUGH, Attribute::CrossedOut),
        ];
        for (flag, attr) in attrs {
            if flags.contains(flag) {
                queue!(out, SetAttribute(attr))?;
            }
        }

        let fg = style.fg.to_crossterm();
        if fg != crossterm::style::Color::Reset {
            queue!(out, SetForegroundColor(fg))?;
        }
        let bg = style.bg.to_crossterm();
        if bg != crossterm::style::Color::Reset {
            queue!(out, SetBackgroundColor(bg))?;
        }
        Ok(())
    }

    /// Get terminal size
    pub fn host_size() -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Surface for Renderer {
    fn set_cell(&mut self, x: u16, y: u16, ch: char, combining: &[char], style: &Style) {
        if x >= self.cols || y >= self.rows {
            return;
        }
        let idx = y as usize * self.cols as usize + x as usize;
        let cell = &mut self.cells[idx];
        cell.text.clear();
        cell.text.push(ch);
        cell.text.extend(combining);
        if cell.style != *style {
            cell.style = style.clone();
        }
        // The covered column must repaint once the wide glyph goes away
        if cell.width() == 2 && x + 1 < self.cols {
            self.cells[idx + 1].text.clear();
        }
    }

    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
