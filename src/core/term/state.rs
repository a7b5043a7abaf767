//! Terminal engine state
//!
//! [`Terminal`] owns both screens, the cursor, modes, margins and scrollback,
//! and implements the grid operations that decoded sequences map onto (see
//! `dispatch.rs` for the mapping itself).

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use super::charset::Charsets;
use super::grid::{Cell, Row, Screen, Scrollback};
use super::style::Style;

bitflags! {
    /// Terminal mode set
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modes: u32 {
        /// LNM (20)
        const LINEFEED_NEWLINE = 1 << 0;
        /// IRM (4)
        const INSERT           = 1 << 1;
        /// DECCKM (?1)
        const CURSOR_KEYS      = 1 << 2;
        /// DECOM (?6)
        const ORIGIN           = 1 << 3;
        /// DECAWM (?7)
        const AUTOWRAP         = 1 << 4;
        /// DECTCEM (?25)
        const CURSOR_VISIBLE   = 1 << 5;
        const ALT_SCREEN       = 1 << 6;
        /// ?2004
        const BRACKETED_PASTE  = 1 << 7;
        /// DECKPAM / DECKPNM
        const KEYPAD_APP       = 1 << 8;
        /// ?9
        const MOUSE_X10        = 1 << 9;
        /// ?1000
        const MOUSE_BUTTONS    = 1 << 10;
        /// ?1002
        const MOUSE_DRAG       = 1 << 11;
        /// ?1003
        const MOUSE_MOTION     = 1 << 12;
        /// ?1005
        const MOUSE_UTF8       = 1 << 13;
        /// ?1006
        const MOUSE_SGR        = 1 << 14;

        const MOUSE_TRACKING = Self::MOUSE_X10.bits()
            | Self::MOUSE_BUTTONS.bits()
            | Self::MOUSE_DRAG.bits()
            | Self::MOUSE_MOTION.bits();
        const MOUSE = Self::MOUSE_TRACKING.bits()
            | Self::MOUSE_UTF8.bits()
            | Self::MOUSE_SGR.bits();
    }
}

/// Cursor shape
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorShape {
    #[default]
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorShape {
    /// Create from DECSCUSR parameter
    pub fn from_decscusr(n: u16) -> Self {
        match n {
            1 => CursorShape::BlinkingBlock,
            2 => CursorShape::SteadyBlock,
            3 => CursorShape::BlinkingUnderline,
            4 => CursorShape::SteadyUnderline,
            5 => CursorShape::BlinkingBar,
            6 => CursorShape::SteadyBar,
            _ => CursorShape::Default,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Cursor {
    pub row: u16,
    pub col: u16,
    pub style: Style,
    pub shape: CursorShape,
}

/// Public view of the cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorInfo {
    pub row: u16,
    pub col: u16,
    pub shape: CursorShape,
    pub visible: bool,
}

/// DECSC snapshot
#[derive(Clone, Debug)]
struct SavedCursor {
    row: u16,
    col: u16,
    style: Style,
    autowrap: bool,
    origin: bool,
    charsets: Charsets,
}

/// Which grid is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActiveScreen {
    #[default]
    Primary,
    Alternate,
}

/// Reply owed to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Cursor position report: ESC [ row ; col R (1-based)
    CursorPosition(u16, u16),
    /// Status report: terminal OK
    StatusOk,
    /// Primary device attributes, carrying the configured answerback
    DeviceAttributes(String),
    SecondaryDeviceAttributes,
}

impl Response {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::CursorPosition(row, col) => format!("\x1b[{};{}R", row, col).into_bytes(),
            Response::StatusOk => b"\x1b[0n".to_vec(),
            Response::DeviceAttributes(answer) => answer.as_bytes().to_vec(),
            Response::SecondaryDeviceAttributes => b"\x1b[>1;10;0c".to_vec(),
        }
    }
}

/// Engine-side events for the session's notification queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    TitleChanged(String),
    Bell,
    MouseModeChanged(Modes),
}

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    pub scrollback_limit: usize,
    pub tab_width: u16,
    /// Honour OSC 8 hyperlinks
    pub hyperlinks: bool,
    /// Reply to primary device attribute queries
    pub answerback: String,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            scrollback_limit: 10000,
            tab_width: 8,
            hyperlinks: true,
            answerback: "\x1b[?62;22c".to_string(),
        }
    }
}

/// Rendering target for [`Terminal::draw`]
pub trait Surface {
    fn set_cell(&mut self, x: u16, y: u16, ch: char, combining: &[char], style: &Style);
    fn size(&self) -> (u16, u16);
}

/// Terminal engine
pub struct Terminal {
    cols: u16,
    rows: u16,
    primary: Screen,
    alternate: Screen,
    active: ActiveScreen,
    scrollback: Scrollback,
    pub(crate) cursor: Cursor,
    saved_primary: Option<SavedCursor>,
    saved_alternate: Option<SavedCursor>,
    /// Scrolling region, 0-indexed and inclusive
    pub(crate) margin_top: u16,
    pub(crate) margin_bottom: u16,
    pub(crate) modes: Modes,
    pub(crate) charsets: Charsets,
    tab_stops: Vec<bool>,
    pending_wrap: bool,
    last_printed: Option<char>,
    title: String,
    /// Rows scrolled back from the live view
    view_offset: usize,
    lines_scrolled: u64,
    dirty: bool,
    redraw_posted: bool,
    pub(crate) options: TerminalOptions,
    responses: Vec<Response>,
    events: Vec<TermEvent>,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_options(cols, rows, TerminalOptions::default())
    }

    pub fn with_options(cols: u16, rows: u16, options: TerminalOptions) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            primary: Screen::new(cols, rows),
            alternate: Screen::new(cols, rows),
            active: ActiveScreen::Primary,
            scrollback: Scrollback::new(options.scrollback_limit),
            cursor: Cursor::default(),
            saved_primary: None,
            saved_alternate: None,
            margin_top: 0,
            margin_bottom: rows - 1,
            modes: Modes::AUTOWRAP | Modes::CURSOR_VISIBLE,
            charsets: Charsets::default(),
            tab_stops: default_tab_stops(cols, options.tab_width),
            pending_wrap: false,
            last_printed: None,
            title: String::new(),
            view_offset: 0,
            lines_scrolled: 0,
            dirty: false,
            redraw_posted: false,
            options,
            responses: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn modes(&self) -> Modes {
        self.modes
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn active_screen(&self) -> ActiveScreen {
        self.active
    }

    pub fn is_alternate(&self) -> bool {
        self.active == ActiveScreen::Alternate
    }

    pub fn cursor(&self) -> CursorInfo {
        CursorInfo {
            row: self.cursor.row,
            col: self.cursor.col,
            shape: self.cursor.shape,
            visible: self.modes.contains(Modes::CURSOR_VISIBLE),
        }
    }

    /// Current style applied to printed characters
    pub fn style(&self) -> &Style {
        &self.cursor.style
    }

    pub fn pending_wrap(&self) -> bool {
        self.pending_wrap
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn screen(&self) -> &Screen {
        match self.active {
            ActiveScreen::Primary => &self.primary,
            ActiveScreen::Alternate => &self.alternate,
        }
    }

    fn screen_mut(&mut self) -> &mut Screen {
        match self.active {
            ActiveScreen::Primary => &mut self.primary,
            ActiveScreen::Alternate => &mut self.alternate,
        }
    }

    /// Active screen text, one line per row
    pub fn text(&self) -> String {
        self.screen()
            .rows
            .iter()
            .map(Row::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cursor and margin state, for fault reports
    pub fn diagnostics(&self) -> String {
        format!(
            "size={}x{} cursor=({},{}) pending_wrap={} margins=({},{}) screen={:?}",
            self.cols,
            self.rows,
            self.cursor.row,
            self.cursor.col,
            self.pending_wrap,
            self.margin_top,
            self.margin_bottom,
            self.active,
        )
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True once per dirty period, so callers post one redraw per batch
    pub fn take_redraw(&mut self) -> bool {
        if self.dirty && !self.redraw_posted {
            self.redraw_posted = true;
            return true;
        }
        false
    }

    pub fn take_responses(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.responses)
    }

    pub fn take_events(&mut self) -> Vec<TermEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn respond(&mut self, response: Response) {
        self.responses.push(response);
    }

    pub(crate) fn emit(&mut self, event: TermEvent) {
        self.events.push(event);
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.title = title.to_string();
            self.emit(TermEvent::TitleChanged(self.title.clone()));
        }
    }

    /// Style for cells vacated by erase, insert, delete and scroll
    fn blank_style(&self) -> Style {
        Style {
            link: None,
            ..self.cursor.style.clone()
        }
    }

    // ---- printing ----

    /// Put a character at the cursor position
    pub fn print(&mut self, c: char) {
        let c = self.charsets.translate(c);
        self.last_printed = Some(c);
        self.put_char(c);
    }

    /// Repeat the last printed character (REP)
    pub fn repeat_last(&mut self, n: u16) {
        if let Some(c) = self.last_printed {
            for _ in 0..n {
                self.put_char(c);
            }
        }
    }

    fn put_char(&mut self, c: char) {
        self.dirty = true;
        let width = c.width().unwrap_or(0).min(2) as u16;
        if width == 0 {
            self.append_combining(c);
            return;
        }

        let autowrap = self.modes.contains(Modes::AUTOWRAP);
        if self.pending_wrap && autowrap {
            self.wrap_line();
        }
        self.pending_wrap = false;

        let cols = self.cols;
        if width == 2 && self.cursor.col + 1 >= cols {
            if cols < 2 {
                return;
            }
            if autowrap {
                self.pad_last_column();
                self.wrap_line();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        if self.modes.contains(Modes::INSERT) {
            let style = self.blank_style();
            insert_blanks(&mut self.screen_mut().rows[row], col, width as usize, &style);
        }

        self.clear_wide_at(row, col);
        if width == 2 {
            self.clear_wide_at(row, col + 1);
        }

        let style = self.cursor.style.clone();
        let screen = self.screen_mut();
        if let Some(cell) = screen.cell_mut(row, col) {
            let wrapped = cell.wrapped;
            *cell = Cell {
                ch: c,
                combining: Vec::new(),
                width: width as u8,
                style: style.clone(),
                wrapped,
                pad: false,
            };
        }
        if width == 2 {
            if let Some(cell) = screen.cell_mut(row, col + 1) {
                let wrapped = cell.wrapped;
                *cell = Cell::continuation(&style);
                cell.wrapped = wrapped;
            }
        }

        let next = self.cursor.col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.pending_wrap = autowrap;
        } else {
            self.cursor.col = next;
        }
    }

    fn append_combining(&mut self, c: char) {
        let row = self.cursor.row as usize;
        let mut col = self.cursor.col as usize;
        if !self.pending_wrap {
            if col == 0 {
                return;
            }
            col -= 1;
        }
        let screen = self.screen_mut();
        if col > 0 && screen.cell(row, col).map_or(false, Cell::is_continuation) {
            col -= 1;
        }
        if let Some(cell) = screen.cell_mut(row, col) {
            cell.combining.push(c);
        }
    }

    /// Blank the last column of the cursor row ahead of an early wide wrap
    fn pad_last_column(&mut self) {
        let row = self.cursor.row as usize;
        let col = self.cols as usize - 1;
        self.clear_wide_at(row, col);
        let style = self.blank_style();
        if let Some(cell) = self.screen_mut().cell_mut(row, col) {
            *cell = Cell {
                pad: true,
                ..Cell::blank(&style)
            };
        }
    }

    /// Mark the row wrapped and continue on the next line
    fn wrap_line(&mut self) {
        let row = self.cursor.row as usize;
        if let Some(r) = self.screen_mut().rows.get_mut(row) {
            r.set_wrapped(true);
        }
        self.cursor.col = 0;
        self.index();
    }

    /// Blank out both halves of a wide character touching `col`
    fn clear_wide_at(&mut self, row: usize, col: usize) {
        let style = self.blank_style();
        let screen = self.screen_mut();
        let Some(r) = screen.rows.get_mut(row) else {
            return;
        };
        let len = r.cells.len();
        if col >= len {
            return;
        }
        if r.cells[col].is_continuation() && col > 0 {
            r.cells[col - 1] = Cell::blank(&style);
        }
        if r.cells[col].width == 2 && col + 1 < len {
            r.cells[col + 1] = Cell::blank(&style);
        }
    }

    // ---- C0 controls ----

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.pending_wrap = false;
    }

    pub fn backspace(&mut self) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_sub(1);
    }

    /// Line feed, honouring new-line mode
    pub fn linefeed(&mut self) {
        self.index();
        if self.modes.contains(Modes::LINEFEED_NEWLINE) {
            self.cursor.col = 0;
        }
    }

    /// Move down one row, scrolling at the bottom margin
    pub fn index(&mut self) {
        self.pending_wrap = false;
        if self.cursor.row == self.margin_bottom {
            self.scroll_up(1);
        } else if self.cursor.row + 1 < self.rows {
            self.cursor.row += 1;
        }
        self.dirty = true;
    }

    /// Move up one row, scrolling at the top margin
    pub fn reverse_index(&mut self) {
        self.pending_wrap = false;
        if self.cursor.row == self.margin_top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
        self.dirty = true;
    }

    pub fn next_line(&mut self) {
        self.index();
        self.cursor.col = 0;
    }

    pub fn horizontal_tab(&mut self, n: u16) {
        self.pending_wrap = false;
        let last = self.cols - 1;
        for _ in 0..n.max(1) {
            let from = self.cursor.col as usize + 1;
            self.cursor.col = self.tab_stops[from.min(self.tab_stops.len())..]
                .iter()
                .position(|&stop| stop)
                .map_or(last, |i| (from + i) as u16)
                .min(last);
        }
    }

    pub fn backward_tab(&mut self, n: u16) {
        self.pending_wrap = false;
        for _ in 0..n.max(1) {
            let col = self.cursor.col as usize;
            self.cursor.col = self.tab_stops[..col]
                .iter()
                .rposition(|&stop| stop)
                .unwrap_or(0) as u16;
        }
    }

    pub fn set_tab_stop(&mut self) {
        if let Some(stop) = self.tab_stops.get_mut(self.cursor.col as usize) {
            *stop = true;
        }
    }

    /// TBC: 0 clears the stop at the cursor, 3 clears all
    pub fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => {
                if let Some(stop) = self.tab_stops.get_mut(self.cursor.col as usize) {
                    *stop = false;
                }
            }
            3 => self.tab_stops.iter_mut().for_each(|s| *s = false),
            _ => tracing::debug!("Unknown TBC mode: {}", mode),
        }
    }

    // ---- cursor motion ----

    pub fn cursor_up(&mut self, n: u16) {
        self.pending_wrap = false;
        let limit = if self.cursor.row >= self.margin_top { self.margin_top } else { 0 };
        self.cursor.row = self.cursor.row.saturating_sub(n).max(limit);
    }

    pub fn cursor_down(&mut self, n: u16) {
        self.pending_wrap = false;
        let limit = if self.cursor.row <= self.margin_bottom {
            self.margin_bottom
        } else {
            self.rows - 1
        };
        self.cursor.row = self.cursor.row.saturating_add(n).min(limit);
    }

    pub fn cursor_forward(&mut self, n: u16) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_add(n).min(self.cols - 1);
    }

    pub fn cursor_backward(&mut self, n: u16) {
        self.pending_wrap = false;
        self.cursor.col = self.cursor.col.saturating_sub(n);
    }

    /// Absolute position, 0-based. Rows are relative to the scrolling region
    /// in origin mode.
    pub fn cursor_position(&mut self, row: u16, col: u16) {
        self.pending_wrap = false;
        self.cursor.row = if self.modes.contains(Modes::ORIGIN) {
            row.saturating_add(self.margin_top).min(self.margin_bottom)
        } else {
            row.min(self.rows - 1)
        };
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn set_column(&mut self, col: u16) {
        self.pending_wrap = false;
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn set_row(&mut self, row: u16) {
        let col = self.cursor.col;
        self.cursor_position(row, col);
    }

    /// Row for position reports, relative to the region in origin mode
    pub(crate) fn report_row(&self) -> u16 {
        if self.modes.contains(Modes::ORIGIN) {
            self.cursor.row.saturating_sub(self.margin_top)
        } else {
            self.cursor.row
        }
    }

    // ---- erasing ----

    /// Blank cells `from..to` of `row`, splitting any wide character at
    /// either edge
    fn erase_cells(&mut self, row: usize, from: usize, to: usize) {
        let style = self.blank_style();
        let Some(r) = self.screen_mut().rows.get_mut(row) else {
            return;
        };
        let len = r.cells.len();
        let to = to.min(len);
        if from >= to {
            return;
        }
        if from > 0 && r.cells[from].is_continuation() {
            r.cells[from - 1] = Cell::blank(&style);
        }
        if to < len && r.cells[to].is_continuation() {
            r.cells[to] = Cell::blank(&style);
        }
        for cell in &mut r.cells[from..to] {
            *cell = Cell::blank(&style);
        }
        self.dirty = true;
    }

    /// ED: 0 to end, 1 to start, 2 whole screen, 3 whole screen and
    /// scrollback. The cursor never moves.
    pub fn erase_in_display(&mut self, mode: u16) {
        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        let cols = self.cols as usize;
        let rows = self.rows as usize;
        match mode {
            0 => {
                self.erase_cells(row, col, cols);
                for r in row + 1..rows {
                    self.erase_cells(r, 0, cols);
                }
            }
            1 => {
                for r in 0..row {
                    self.erase_cells(r, 0, cols);
                }
                self.erase_cells(row, 0, col + 1);
            }
            2 | 3 => {
                let style = self.blank_style();
                self.screen_mut().clear(&style);
                if mode == 3 {
                    self.scrollback.clear();
                    self.view_offset = 0;
                }
            }
            _ => tracing::debug!("Unknown ED mode: {}", mode),
        }
        self.dirty = true;
    }

    /// EL: 0 to end, 1 to start, 2 whole line
    pub fn erase_in_line(&mut self, mode: u16) {
        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        let cols = self.cols as usize;
        match mode {
            0 => self.erase_cells(row, col, cols),
            1 => self.erase_cells(row, 0, col + 1),
            2 => self.erase_cells(row, 0, cols),
            _ => tracing::debug!("Unknown EL mode: {}", mode),
        }
    }

    /// ECH
    pub fn erase_chars(&mut self, n: u16) {
        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        self.erase_cells(row, col, col + n.max(1) as usize);
    }

    // ---- insert / delete ----

    /// ICH
    pub fn insert_chars(&mut self, n: u16) {
        self.pending_wrap = false;
        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        self.clear_wide_at(row, col);
        let style = self.blank_style();
        if let Some(r) = self.screen_mut().rows.get_mut(row) {
            insert_blanks(r, col, n.max(1) as usize, &style);
        }
        self.dirty = true;
    }

    /// DCH
    pub fn delete_chars(&mut self, n: u16) {
        self.pending_wrap = false;
        let row = self.cursor.row as usize;
        let col = self.cursor.col as usize;
        self.clear_wide_at(row, col);
        let style = self.blank_style();
        if let Some(r) = self.screen_mut().rows.get_mut(row) {
            let len = r.cells.len();
            let n = (n.max(1) as usize).min(len - col);
            r.cells.drain(col..col + n);
            r.cells.extend((0..n).map(|_| Cell::blank(&style)));
            if r.cells[col].is_continuation() {
                r.cells[col] = Cell::blank(&style);
            }
        }
        self.dirty = true;
    }

    fn cursor_in_region(&self) -> bool {
        self.cursor.row >= self.margin_top && self.cursor.row <= self.margin_bottom
    }

    /// IL
    pub fn insert_lines(&mut self, n: u16) {
        if !self.cursor_in_region() {
            return;
        }
        let style = self.blank_style();
        let (row, bottom) = (self.cursor.row as usize, self.margin_bottom as usize);
        self.screen_mut().scroll_down(row, bottom, n.max(1) as usize, &style);
        self.carriage_return();
        self.dirty = true;
    }

    /// DL
    pub fn delete_lines(&mut self, n: u16) {
        if !self.cursor_in_region() {
            return;
        }
        let style = self.blank_style();
        let (row, bottom) = (self.cursor.row as usize, self.margin_bottom as usize);
        self.screen_mut().scroll_up(row, bottom, n.max(1) as usize, &style);
        self.carriage_return();
        self.dirty = true;
    }

    // ---- scrolling ----

    /// Scroll the region up by `n` rows. Rows leaving a full-height region
    /// of the primary screen go to scrollback.
    pub fn scroll_up(&mut self, n: u16) {
        let top = self.margin_top as usize;
        let bottom = self.margin_bottom as usize;
        let style = self.blank_style();
        let full = top == 0 && bottom + 1 == self.rows as usize;
        let primary = !self.is_alternate();
        let removed = self.screen_mut().scroll_up(top, bottom, n as usize, &style);
        self.lines_scrolled += removed.len() as u64;
        if primary && full {
            for row in removed {
                self.scrollback.push(row);
                if self.view_offset > 0 {
                    self.view_offset = (self.view_offset + 1).min(self.scrollback.len());
                }
            }
        }
        self.dirty = true;
    }

    /// Scroll the region down by `n` rows
    pub fn scroll_down(&mut self, n: u16) {
        let top = self.margin_top as usize;
        let bottom = self.margin_bottom as usize;
        let style = self.blank_style();
        self.screen_mut().scroll_down(top, bottom, n as usize, &style);
        self.dirty = true;
    }

    /// DECSTBM with 0-based inclusive bounds. Homes the cursor.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let last = self.rows - 1;
        let mut top = top.min(last);
        let mut bottom = bottom.min(last);
        if bottom <= top {
            if top < last {
                bottom = top + 1;
            } else {
                top = last.saturating_sub(1);
                bottom = last;
            }
        }
        self.margin_top = top;
        self.margin_bottom = bottom;
        self.cursor_position(0, 0);
    }

    fn reset_scroll_region(&mut self) {
        self.margin_top = 0;
        self.margin_bottom = self.rows - 1;
    }

    // ---- save / restore ----

    fn snapshot(&self) -> SavedCursor {
        SavedCursor {
            row: self.cursor.row,
            col: self.cursor.col,
            style: self.cursor.style.clone(),
            autowrap: self.modes.contains(Modes::AUTOWRAP),
            origin: self.modes.contains(Modes::ORIGIN),
            charsets: self.charsets.clone(),
        }
    }

    /// DECSC, into the slot of the active screen
    pub fn save_cursor(&mut self) {
        let saved = Some(self.snapshot());
        match self.active {
            ActiveScreen::Primary => self.saved_primary = saved,
            ActiveScreen::Alternate => self.saved_alternate = saved,
        }
    }

    /// DECRC. With nothing saved the cursor goes home with a plain style.
    pub fn restore_cursor(&mut self) {
        let saved = match self.active {
            ActiveScreen::Primary => self.saved_primary.clone(),
            ActiveScreen::Alternate => self.saved_alternate.clone(),
        };
        self.pending_wrap = false;
        match saved {
            Some(s) => {
                self.cursor.row = s.row.min(self.rows - 1);
                self.cursor.col = s.col.min(self.cols - 1);
                self.cursor.style = s.style;
                self.modes.set(Modes::AUTOWRAP, s.autowrap);
                self.modes.set(Modes::ORIGIN, s.origin);
                self.charsets = s.charsets;
            }
            None => {
                self.cursor.row = 0;
                self.cursor.col = 0;
                self.cursor.style.reset();
                self.modes.remove(Modes::ORIGIN);
                self.charsets = Charsets::default();
            }
        }
    }

    // ---- alternate screen ----

    /// Switch to the alternate grid. `save` snapshots the cursor first
    /// (1049); `clear` blanks the alternate grid on entry.
    pub fn enter_alternate(&mut self, save: bool, clear: bool) {
        if self.is_alternate() {
            return;
        }
        if save {
            self.save_cursor();
        }
        self.active = ActiveScreen::Alternate;
        self.modes.insert(Modes::ALT_SCREEN);
        if clear {
            let style = self.blank_style();
            self.alternate.clear(&style);
        }
        self.pending_wrap = false;
        self.dirty = true;
    }

    /// Return to the primary grid. `clear` erases the alternate grid first;
    /// `restore` restores the primary cursor snapshot afterwards.
    pub fn exit_alternate(&mut self, clear: bool, restore: bool) {
        if !self.is_alternate() {
            return;
        }
        if clear {
            self.erase_in_display(2);
        }
        self.active = ActiveScreen::Primary;
        self.modes.remove(Modes::ALT_SCREEN);
        if restore {
            self.restore_cursor();
        }
        self.pending_wrap = false;
        self.dirty = true;
    }

    // ---- modes ----

    /// SM / RM
    pub fn set_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            4 => self.modes.set(Modes::INSERT, enable),
            20 => self.modes.set(Modes::LINEFEED_NEWLINE, enable),
            _ => tracing::debug!("Unknown mode: {} = {}", mode, enable),
        }
    }

    /// DECSET / DECRST
    pub fn set_private_mode(&mut self, mode: u16, enable: bool) {
        let mouse_before = self.modes & Modes::MOUSE;
        match mode {
            1 => self.modes.set(Modes::CURSOR_KEYS, enable),
            6 => {
                self.modes.set(Modes::ORIGIN, enable);
                self.cursor_position(0, 0);
            }
            7 => {
                self.modes.set(Modes::AUTOWRAP, enable);
                if !enable {
                    self.pending_wrap = false;
                }
            }
            25 => {
                self.modes.set(Modes::CURSOR_VISIBLE, enable);
                self.dirty = true;
            }
            9 => self.modes.set(Modes::MOUSE_X10, enable),
            1000 => self.modes.set(Modes::MOUSE_BUTTONS, enable),
            1002 => self.modes.set(Modes::MOUSE_DRAG, enable),
            1003 => self.modes.set(Modes::MOUSE_MOTION, enable),
            1005 => self.modes.set(Modes::MOUSE_UTF8, enable),
            1006 => self.modes.set(Modes::MOUSE_SGR, enable),
            47 => {
                if enable {
                    self.enter_alternate(false, false);
                } else {
                    self.exit_alternate(false, false);
                }
            }
            1047 => {
                if enable {
                    self.enter_alternate(false, false);
                } else {
                    self.exit_alternate(true, false);
                }
            }
            1048 => {
                if enable {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.enter_alternate(true, true);
                } else {
                    self.exit_alternate(true, true);
                }
            }
            2004 => self.modes.set(Modes::BRACKETED_PASTE, enable),
            _ => tracing::debug!("Unknown private mode: {} = {}", mode, enable),
        }
        let mouse_after = self.modes & Modes::MOUSE;
        if mouse_after != mouse_before {
            self.emit(TermEvent::MouseModeChanged(mouse_after));
        }
    }

    /// RIS: everything but size, options, title and scrollback
    pub fn full_reset(&mut self) {
        let mouse_was = self.modes & Modes::MOUSE;
        self.primary = Screen::new(self.cols, self.rows);
        self.alternate = Screen::new(self.cols, self.rows);
        self.active = ActiveScreen::Primary;
        self.cursor = Cursor::default();
        self.saved_primary = None;
        self.saved_alternate = None;
        self.reset_scroll_region();
        self.modes = Modes::AUTOWRAP | Modes::CURSOR_VISIBLE;
        self.charsets = Charsets::default();
        self.tab_stops = default_tab_stops(self.cols, self.options.tab_width);
        self.pending_wrap = false;
        self.last_printed = None;
        self.view_offset = 0;
        self.dirty = true;
        if !mouse_was.is_empty() {
            self.emit(TermEvent::MouseModeChanged(Modes::empty()));
        }
    }

    /// DECALN: fill the screen with 'E'
    pub fn screen_alignment(&mut self) {
        self.reset_scroll_region();
        let screen = self.screen_mut();
        for row in &mut screen.rows {
            for cell in &mut row.cells {
                *cell = Cell {
                    ch: 'E',
                    ..Cell::default()
                };
            }
        }
        self.cursor_position(0, 0);
        self.dirty = true;
    }

    // ---- scrollback view ----

    pub fn scroll_view_up(&mut self, n: usize) {
        if self.is_alternate() {
            return;
        }
        self.view_offset = (self.view_offset + n).min(self.scrollback.len());
        self.dirty = true;
    }

    pub fn scroll_view_down(&mut self, n: usize) {
        self.view_offset = self.view_offset.saturating_sub(n);
        self.dirty = true;
    }

    pub fn scroll_view_reset(&mut self) {
        if self.view_offset != 0 {
            self.view_offset = 0;
            self.dirty = true;
        }
    }

    pub fn is_scrolling(&self) -> bool {
        self.view_offset > 0
    }

    /// Whether there is history to scroll through
    pub fn scrollable(&self) -> bool {
        !self.is_alternate() && !self.scrollback.is_empty()
    }

    /// Row shown at visible line `y`, taking the scrollback view into account
    pub fn visible_row(&self, y: usize) -> Option<&Row> {
        if self.view_offset == 0 || self.is_alternate() {
            return self.screen().rows.get(y);
        }
        let history = self.scrollback.len();
        let index = history - self.view_offset + y;
        if index < history {
            self.scrollback.get(index)
        } else {
            self.primary.rows.get(index - history)
        }
    }

    // ---- drawing ----

    /// Paint the visible rows onto `surface` and clear the dirty flag
    pub fn draw(&mut self, surface: &mut dyn Surface) {
        let (width, height) = surface.size();
        for y in 0..self.rows.min(height) {
            let Some(row) = self.visible_row(y as usize) else {
                continue;
            };
            for (x, cell) in row.cells.iter().enumerate().take(width as usize) {
                if cell.is_continuation() {
                    continue;
                }
                surface.set_cell(x as u16, y, cell.ch, &cell.combining, &cell.style);
            }
        }
        self.dirty = false;
        self.redraw_posted = false;
    }

    /// Bytes to send for pasted text
    pub fn paste_bytes(&self, text: &str) -> Vec<u8> {
        if self.modes.contains(Modes::BRACKETED_PASTE) {
            let mut out = b"\x1b[200~".to_vec();
            out.extend_from_slice(text.as_bytes());
            out.extend_from_slice(b"\x1b[201~");
            out
        } else {
            text.as_bytes().to_vec()
        }
    }

    // ---- resize ----

    /// Resize both grids. The primary grid is rebuilt by replaying its rows
    /// up to the cursor through the print path, so wide characters and soft
    /// wraps reflow to the new width. Rows below the cursor are dropped.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cols && rows == self.rows {
            return;
        }
        let full_region = self.margin_top == 0 && self.margin_bottom + 1 == self.rows;
        let (old_top, old_bottom) = (self.margin_top, self.margin_bottom);

        let old = std::mem::replace(&mut self.primary, Screen::new(cols, rows));
        self.alternate = Screen::new(cols, rows);
        self.cols = cols;
        self.rows = rows;
        self.tab_stops = default_tab_stops(cols, self.options.tab_width);
        self.scrollback.resize_rows(cols);
        self.view_offset = 0;
        self.reset_scroll_region();

        let on_alt = self.is_alternate();
        let anchor = if on_alt {
            self.saved_primary.as_ref().map(|s| (s.row as usize, s.col as usize))
        } else {
            Some((self.cursor.row as usize, self.cursor.col as usize))
        };
        let anchor = anchor.unwrap_or_else(|| {
            let last = old.rows.iter().rposition(|r| r.content_len() > 0).unwrap_or(0);
            (last, old.rows[last].content_len())
        });

        let alt_cursor = (self.cursor.row, self.cursor.col);
        let (row, col) = self.reflow(&old, anchor);

        if on_alt {
            self.cursor.row = alt_cursor.0.min(rows - 1);
            self.cursor.col = alt_cursor.1.min(cols - 1);
            if let Some(saved) = self.saved_primary.as_mut() {
                saved.row = row;
                saved.col = col;
            }
        } else {
            self.cursor.row = row;
            self.cursor.col = col;
        }
        if let Some(saved) = self.saved_alternate.as_mut() {
            saved.row = saved.row.min(rows - 1);
            saved.col = saved.col.min(cols - 1);
        }

        if !full_region {
            let top = old_top.min(rows - 1);
            let bottom = old_bottom.min(rows - 1);
            if bottom > top {
                self.margin_top = top;
                self.margin_bottom = bottom;
            }
        }
        self.dirty = true;
    }

    /// Replay `old` into the (fresh) primary grid up to `anchor`, returning
    /// where the anchor cell landed
    fn reflow(&mut self, old: &Screen, anchor: (usize, usize)) -> (u16, u16) {
        let active = std::mem::replace(&mut self.active, ActiveScreen::Primary);
        let modes = self.modes;
        let charsets = std::mem::take(&mut self.charsets);
        let style = self.cursor.style.clone();
        self.modes.insert(Modes::AUTOWRAP);
        self.modes.remove(Modes::INSERT | Modes::ORIGIN);
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.pending_wrap = false;

        let (anchor_row, anchor_col) = anchor;
        let mut landed = (0u16, 0u16);
        let mut scrolled_at_landing = self.lines_scrolled;

        for (r, row) in old.rows.iter().enumerate().take(anchor_row + 1) {
            let is_anchor_row = r == anchor_row;
            let len = if is_anchor_row {
                row.content_len().max(anchor_col.min(row.len()))
            } else if row.is_wrapped() {
                row.len()
            } else {
                row.content_len()
            };
            for (c, cell) in row.cells.iter().enumerate().take(len) {
                if is_anchor_row && c == anchor_col {
                    landed = self.landing_position();
                    scrolled_at_landing = self.lines_scrolled;
                }
                if cell.is_continuation() || cell.pad {
                    continue;
                }
                self.cursor.style = cell.style.clone();
                self.put_char(cell.ch);
                for &mark in &cell.combining {
                    self.put_char(mark);
                }
            }
            if is_anchor_row {
                if anchor_col >= len {
                    landed = self.landing_position();
                    scrolled_at_landing = self.lines_scrolled;
                }
            } else if !row.is_wrapped() {
                self.carriage_return();
                self.index();
            }
        }

        let shift = (self.lines_scrolled - scrolled_at_landing) as u16;
        landed.0 = landed.0.saturating_sub(shift);

        self.active = active;
        self.modes = modes;
        self.charsets = charsets;
        self.cursor.style = style;
        self.pending_wrap = false;
        landed
    }

    /// Where the next printed cell would go
    fn landing_position(&mut self) -> (u16, u16) {
        if self.pending_wrap {
            self.wrap_line();
            self.pending_wrap = false;
        }
        (self.cursor.row, self.cursor.col)
    }
}

/// Shift cells at and after `col` right by `n`; overflow is discarded
fn insert_blanks(row: &mut Row, col: usize, n: usize, style: &Style) {
    let len = row.cells.len();
    if col >= len {
        return;
    }
    let n = n.min(len - col);
    row.cells.splice(col..col, (0..n).map(|_| Cell::blank(style)));
    row.cells.truncate(len);
    if let Some(last) = row.cells.last_mut() {
        if last.width == 2 {
            *last = Cell::blank(style);
        }
    }
}

fn default_tab_stops(cols: u16, width: u16) -> Vec<bool> {
    let width = width.max(1) as usize;
    (0..cols as usize).map(|c| c > 0 && c % width == 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::style::Color;

    fn print_str(term: &mut Terminal, s: &str) {
        for c in s.chars() {
            term.print(c);
        }
    }

    #[test]
    fn test_linefeed_modes() {
        let mut term = Terminal::new(2, 2);
        print_str(&mut term, "vt");
        assert_eq!(term.text(), "vt\n  ");

        term.linefeed();
        assert_eq!((term.cursor().row, term.cursor().col), (1, 1));

        term.set_mode(20, true);
        term.cursor_position(0, 1);
        term.linefeed();
        assert_eq!((term.cursor().row, term.cursor().col), (1, 0));
    }

    #[test]
    fn test_insert_mode() {
        let mut term = Terminal::new(4, 1);
        print_str(&mut term, "vt");
        term.backspace();
        term.backspace();
        assert_eq!(term.cursor().col, 0);
        assert_eq!(term.text(), "vt  ");

        term.set_mode(4, true);
        term.print('i');
        assert_eq!(term.text(), "ivt ");
    }

    #[test]
    fn test_pending_wrap() {
        let mut term = Terminal::new(3, 2);
        print_str(&mut term, "abc");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 2));
        assert!(term.pending_wrap());

        term.print('d');
        assert_eq!(term.text(), "abc\nd  ");
        assert_eq!((term.cursor().row, term.cursor().col), (1, 1));
        assert!(term.screen().rows[0].is_wrapped());
    }

    #[test]
    fn test_wrap_scrolls_into_scrollback() {
        let mut term = Terminal::new(2, 1);
        print_str(&mut term, "abc");
        assert_eq!(term.text(), "c ");
        assert_eq!(term.scrollback().len(), 1);
        assert_eq!(term.scrollback().get(0).map(Row::text), Some("ab".to_string()));
    }

    #[test]
    fn test_print_advances_one_column() {
        let mut term = Terminal::new(10, 1);
        for (i, c) in "hello".chars().enumerate() {
            term.print(c);
            assert_eq!(term.cursor().col as usize, i + 1);
            assert_eq!(term.screen().rows[0].cells[i].ch, c);
        }
    }

    #[test]
    fn test_no_autowrap_overwrites_last_column() {
        let mut term = Terminal::new(3, 2);
        term.set_private_mode(7, false);
        print_str(&mut term, "abcde");
        assert_eq!(term.text(), "abe\n   ");
    }

    #[test]
    fn test_wide_char() {
        let mut term = Terminal::new(4, 2);
        print_str(&mut term, "a漢");
        assert_eq!(term.cursor().col, 3);
        assert!(term.screen().rows[0].cells[2].is_continuation());
        // Wide char at the last column wraps first
        print_str(&mut term, "字");
        assert_eq!(term.text(), "a漢 \n字  ");
    }

    #[test]
    fn test_combining_mark() {
        let mut term = Terminal::new(4, 1);
        print_str(&mut term, "e\u{301}x");
        assert_eq!(term.screen().rows[0].cells[0].combining, vec!['\u{301}']);
        assert_eq!(term.cursor().col, 2);
    }

    #[test]
    fn test_scroll_up_region_uses_current_style() {
        let mut term = Terminal::new(1, 5);
        for (i, c) in "abcde".chars().enumerate() {
            term.cursor_position(i as u16, 0);
            term.print(c);
        }
        term.set_scroll_region(1, 3);
        term.cursor.style.bg = Color::Normal(2);
        term.scroll_up(2);
        assert_eq!(term.text(), "a\nd\n \n \ne");
        assert_eq!(term.screen().rows[2].cells[0].style.bg, Color::Normal(2));
        assert_eq!(term.screen().rows[3].cells[0].style.bg, Color::Normal(2));
        assert_eq!(term.screen().rows[4].cells[0].style.bg, Color::Unset);
        // Partial regions never feed scrollback
        assert_eq!(term.scrollback().len(), 0);
    }

    #[test]
    fn test_set_scroll_region_clamps_and_homes() {
        let mut term = Terminal::new(5, 5);
        term.cursor_position(3, 3);
        term.set_scroll_region(3, 1);
        assert_eq!((term.margin_top, term.margin_bottom), (3, 4));
        assert_eq!((term.cursor().row, term.cursor().col), (0, 0));

        term.set_private_mode(6, true);
        term.set_scroll_region(1, 3);
        assert_eq!(term.cursor().row, 1);
        term.cursor_position(10, 0);
        assert_eq!(term.cursor().row, 3);
    }

    #[test]
    fn test_erase_keeps_cursor() {
        let mut term = Terminal::new(3, 2);
        print_str(&mut term, "abcde");
        term.cursor_position(0, 1);
        term.erase_in_display(2);
        assert_eq!(term.text(), "   \n   ");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 1));
    }

    #[test]
    fn test_erase_in_line() {
        let mut term = Terminal::new(4, 1);
        print_str(&mut term, "abc");
        term.cursor_position(0, 1);
        term.erase_in_line(0);
        assert_eq!(term.text(), "a   ");
        print_str(&mut term, "xy");
        term.cursor_position(0, 1);
        term.erase_in_line(1);
        assert_eq!(term.text(), "  y ");
    }

    #[test]
    fn test_insert_delete_lines() {
        let mut term = Terminal::new(1, 3);
        for (i, c) in "abc".chars().enumerate() {
            term.cursor_position(i as u16, 0);
            term.print(c);
        }
        term.cursor_position(1, 0);
        term.insert_lines(1);
        assert_eq!(term.text(), "a\n \nb");
        term.delete_lines(2);
        assert_eq!(term.text(), "a\n \n ");
    }

    #[test]
    fn test_delete_chars() {
        let mut term = Terminal::new(5, 1);
        print_str(&mut term, "abcde");
        term.cursor_position(0, 1);
        term.delete_chars(2);
        assert_eq!(term.text(), "ade  ");
    }

    #[test]
    fn test_tabs() {
        let mut term = Terminal::new(20, 1);
        term.horizontal_tab(1);
        assert_eq!(term.cursor().col, 8);
        term.horizontal_tab(2);
        assert_eq!(term.cursor().col, 19);
        term.backward_tab(1);
        assert_eq!(term.cursor().col, 16);
        term.clear_tab_stop(3);
        term.horizontal_tab(1);
        assert_eq!(term.cursor().col, 19);
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut term = Terminal::new(10, 5);
        term.cursor_position(2, 3);
        term.cursor.style.fg = Color::Normal(1);
        term.save_cursor();
        term.cursor_position(4, 4);
        term.cursor.style.fg = Color::Unset;
        term.set_private_mode(7, false);
        term.restore_cursor();
        assert_eq!((term.cursor().row, term.cursor().col), (2, 3));
        assert_eq!(term.style().fg, Color::Normal(1));
        assert!(term.modes().contains(Modes::AUTOWRAP));
    }

    #[test]
    fn test_alternate_screen() {
        let mut term = Terminal::new(3, 2);
        print_str(&mut term, "ab");
        term.set_private_mode(1049, true);
        assert!(term.is_alternate());
        assert_eq!(term.text(), "   \n   ");
        term.cursor_position(1, 0);
        print_str(&mut term, "zz");

        term.set_private_mode(1049, false);
        assert!(!term.is_alternate());
        assert_eq!(term.text(), "ab \n   ");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 2));

        // Leaving when not entered changes nothing
        term.set_private_mode(1049, false);
        assert_eq!((term.cursor().row, term.cursor().col), (0, 2));
    }

    #[test]
    fn test_alternate_screen_has_no_scrollback() {
        let mut term = Terminal::new(2, 1);
        term.set_private_mode(1049, true);
        print_str(&mut term, "abcdef");
        assert_eq!(term.scrollback().len(), 0);
    }

    #[test]
    fn test_mouse_mode_event() {
        let mut term = Terminal::new(2, 1);
        term.set_private_mode(1000, true);
        term.set_private_mode(1006, true);
        term.set_private_mode(1006, true);
        assert_eq!(
            term.take_events(),
            vec![
                TermEvent::MouseModeChanged(Modes::MOUSE_BUTTONS),
                TermEvent::MouseModeChanged(Modes::MOUSE_BUTTONS | Modes::MOUSE_SGR),
            ]
        );
    }

    #[test]
    fn test_resize_reflows_wrapped_rows() {
        let mut term = Terminal::new(4, 3);
        print_str(&mut term, "abcdef");
        assert_eq!(term.text(), "abcd\nef  \n    ");

        term.resize(8, 3);
        assert_eq!(term.text(), "abcdef  \n        \n        ");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 6));

        term.resize(3, 3);
        assert_eq!(term.text(), "abc\ndef\n   ");
        assert_eq!((term.cursor().row, term.cursor().col), (2, 0));
    }

    #[test]
    fn test_resize_drops_wide_wrap_padding() {
        let mut term = Terminal::new(4, 3);
        print_str(&mut term, "abc漢");
        assert_eq!(term.text(), "abc \n漢  \n    ");
        assert!(term.screen().rows[0].cells[3].pad);

        term.resize(10, 3);
        assert_eq!(term.screen().rows[0].text(), "abc漢     ");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 5));
        assert!(term.screen().rows[0].cells.iter().all(|c| !c.pad));
    }

    #[test]
    fn test_resize_keeps_hard_newlines() {
        let mut term = Terminal::new(4, 3);
        print_str(&mut term, "ab");
        term.carriage_return();
        term.linefeed();
        print_str(&mut term, "cd");
        term.resize(6, 2);
        assert_eq!(term.text(), "ab    \ncd    ");
        assert_eq!((term.cursor().row, term.cursor().col), (1, 2));
    }

    #[test]
    fn test_resize_region_reset_only_when_full() {
        let mut term = Terminal::new(4, 4);
        term.resize(4, 6);
        assert_eq!((term.margin_top, term.margin_bottom), (0, 5));

        term.set_scroll_region(1, 2);
        term.resize(4, 8);
        assert_eq!((term.margin_top, term.margin_bottom), (1, 2));
    }

    #[test]
    fn test_scroll_view() {
        let mut term = Terminal::new(1, 2);
        for c in "abcd".chars() {
            term.print(c);
            term.carriage_return();
            term.linefeed();
        }
        assert!(term.scrollable());
        term.scroll_view_up(10);
        assert!(term.is_scrolling());
        assert_eq!(term.visible_row(0).map(Row::text), Some("a".to_string()));
        term.scroll_view_reset();
        assert_eq!(term.visible_row(0).map(Row::text), Some("d".to_string()));
    }

    #[test]
    fn test_redraw_is_coalesced() {
        struct Null;
        impl Surface for Null {
            fn set_cell(&mut self, _: u16, _: u16, _: char, _: &[char], _: &Style) {}
            fn size(&self) -> (u16, u16) {
                (80, 24)
            }
        }

        let mut term = Terminal::new(4, 1);
        term.print('a');
        assert!(term.take_redraw());
        term.print('b');
        assert!(!term.take_redraw());
        term.draw(&mut Null);
        assert!(!term.is_dirty());
        term.print('c');
        assert!(term.take_redraw());
    }
}
