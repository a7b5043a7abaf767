//! Cell grid, screens and scrollback
//!
//! ```text
//! Screen ── rows: Vec<Row> ── cells: Vec<Cell>
//! Scrollback ── VecDeque<Row> (oldest first, bounded)
//! ```

use std::collections::VecDeque;

use super::style::Style;

/// A single cell
///
/// A wide character occupies a width-2 cell followed by a width-0
/// continuation cell. The last cell of a row carries `wrapped` when the
/// text continued onto the next row by autowrap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub combining: Vec<char>,
    pub width: u8,
    pub style: Style,
    pub wrapped: bool,
    /// Blank left in the last column when a wide character wrapped early
    pub pad: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            combining: Vec::new(),
            width: 1,
            style: Style::default(),
            wrapped: false,
            pad: false,
        }
    }
}

impl Cell {
    pub fn blank(style: &Style) -> Self {
        Self {
            style: style.clone(),
            ..Self::default()
        }
    }

    pub fn continuation(style: &Style) -> Self {
        Self {
            width: 0,
            style: style.clone(),
            ..Self::default()
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Base character followed by its combining marks
    pub fn push_text(&self, out: &mut String) {
        out.push(self.ch);
        out.extend(self.combining.iter());
    }
}

/// A single row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: u16, style: &Style) -> Self {
        Self {
            cells: vec![Cell::blank(style); cols as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the row's text continues on the next row
    pub fn is_wrapped(&self) -> bool {
        self.cells.last().map_or(false, |c| c.wrapped)
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        if let Some(last) = self.cells.last_mut() {
            last.wrapped = wrapped;
        }
    }

    pub fn resize(&mut self, cols: u16) {
        self.cells.resize(cols as usize, Cell::default());
    }

    pub fn clear(&mut self, style: &Style) {
        for cell in &mut self.cells {
            *cell = Cell::blank(style);
        }
    }

    /// Number of cells up to the last one that is not a default blank
    pub fn content_len(&self) -> usize {
        let plain = Style::default();
        self.cells
            .iter()
            .rposition(|c| c.ch != ' ' || c.width != 1 || !c.combining.is_empty() || c.style != plain)
            .map_or(0, |i| i + 1)
    }

    /// Row text, continuation cells skipped
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            if !cell.is_continuation() {
                cell.push_text(&mut out);
            }
        }
        out
    }
}

/// A fixed-size grid of rows
#[derive(Clone, Debug)]
pub struct Screen {
    pub rows: Vec<Row>,
    cols: u16,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols, &Style::default())).collect(),
            cols,
        }
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn height(&self) -> u16 {
        self.rows.len() as u16
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Scroll rows `top..=bottom` up by `n`, filling the bottom with blank
    /// rows. The rows scrolled off are returned, oldest first.
    pub fn scroll_up(&mut self, top: usize, bottom: usize, n: usize, style: &Style) -> Vec<Row> {
        if top > bottom || bottom >= self.rows.len() {
            return Vec::new();
        }
        let n = n.min(bottom - top + 1);
        let removed: Vec<Row> = self.rows.drain(top..top + n).collect();
        let fill = (0..n).map(|_| Row::new(self.cols, style));
        let at = bottom + 1 - n;
        self.rows.splice(at..at, fill);
        removed
    }

    /// Scroll rows `top..=bottom` down by `n`, filling the top with blank rows
    pub fn scroll_down(&mut self, top: usize, bottom: usize, n: usize, style: &Style) {
        if top > bottom || bottom >= self.rows.len() {
            return;
        }
        let n = n.min(bottom - top + 1);
        self.rows.drain(bottom + 1 - n..=bottom);
        let fill = (0..n).map(|_| Row::new(self.cols, style));
        self.rows.splice(top..top, fill);
    }

    pub fn clear(&mut self, style: &Style) {
        for row in &mut self.rows {
            row.clear(style);
        }
    }
}

/// Bounded history of rows scrolled off the primary screen
#[derive(Clone, Debug)]
pub struct Scrollback {
    rows: VecDeque<Row>,
    limit: usize,
}

impl Scrollback {
    pub fn new(limit: usize) -> Self {
        Self {
            rows: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, row: Row) {
        if self.limit == 0 {
            return;
        }
        if self.rows.len() >= self.limit {
            self.rows.pop_front();
        }
        self.rows.push_back(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn resize_rows(&mut self, cols: u16) {
        for row in &mut self.rows {
            row.resize(cols);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::style::Color;

    fn screen_with_lines(lines: &[&str]) -> Screen {
        let cols = lines[0].len() as u16;
        let mut screen = Screen::new(cols, lines.len() as u16);
        for (row, line) in lines.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                screen.rows[row].cells[col].ch = ch;
            }
        }
        screen
    }

    fn texts(screen: &Screen) -> Vec<String> {
        screen.rows.iter().map(Row::text).collect()
    }

    #[test]
    fn test_scroll_up_region() {
        let mut screen = screen_with_lines(&["a", "b", "c", "d", "e"]);
        let style = Style {
            bg: Color::Normal(4),
            ..Style::default()
        };
        let removed = screen.scroll_up(1, 3, 2, &style);
        assert_eq!(removed.iter().map(Row::text).collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(texts(&screen), vec!["a", "d", " ", " ", "e"]);
        assert_eq!(screen.rows[2].cells[0].style, style);
        assert_eq!(screen.rows[3].cells[0].style, style);
        assert_eq!(screen.rows[4].cells[0].style, Style::default());
    }

    #[test]
    fn test_scroll_down_region() {
        let mut screen = screen_with_lines(&["a", "b", "c", "d"]);
        screen.scroll_down(0, 2, 1, &Style::default());
        assert_eq!(texts(&screen), vec![" ", "a", "b", "d"]);
    }

    #[test]
    fn test_scroll_more_than_region() {
        let mut screen = screen_with_lines(&["a", "b", "c"]);
        screen.scroll_up(0, 2, 10, &Style::default());
        assert_eq!(texts(&screen), vec![" ", " ", " "]);
    }

    #[test]
    fn test_scrollback_limit() {
        let mut sb = Scrollback::new(2);
        for line in ["1", "2", "3"] {
            sb.push(screen_with_lines(&[line]).rows.remove(0));
        }
        assert_eq!(sb.len(), 2);
        assert_eq!(sb.get(0).map(Row::text), Some("2".to_string()));
    }

    #[test]
    fn test_content_len() {
        let screen = screen_with_lines(&["ab  "]);
        assert_eq!(screen.rows[0].content_len(), 2);
    }
}
