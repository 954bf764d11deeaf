//! `vt100`-backed [`TerminalEngine`].
//!
//! The parser maintains the full grid plus scrollback; absolute-line
//! access works by temporarily adjusting the screen's scrollback offset
//! and restoring it afterwards, the same trick used to probe total
//! scrollback depth.

use vt100::Parser;

use super::{CellColor, TerminalEngine};

/// Scrollback depth for engine instances.
pub const DEFAULT_SCROLLBACK_LINES: usize = 5000;

/// Terminal engine backed by an in-process `vt100::Parser`.
pub struct Vt100Engine {
    parser: Parser,
    scrollback_lines: usize,
    selection: Option<(usize, u16, u16)>,
    on_input: Option<Box<dyn FnMut(&str)>>,
}

impl Vt100Engine {
    /// Create an engine with the given grid size and default scrollback.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self::with_scrollback(cols, rows, DEFAULT_SCROLLBACK_LINES)
    }

    /// Create an engine with an explicit scrollback depth.
    #[must_use]
    pub fn with_scrollback(cols: u16, rows: u16, scrollback_lines: usize) -> Self {
        Self {
            parser: Parser::new(rows, cols, scrollback_lines),
            scrollback_lines,
            selection: None,
            on_input: None,
        }
    }

    /// Total scrollback depth currently held by the parser.
    fn total_scrollback(&mut self) -> usize {
        let screen = self.parser.screen_mut();
        let saved = screen.scrollback();
        screen.set_scrollback(usize::MAX);
        let total = screen.scrollback();
        screen.set_scrollback(saved);
        total
    }

    /// Read one visible row at the given scrollback offset.
    fn row_at_offset(&mut self, offset: usize, visible_row: usize) -> Option<String> {
        let saved = self.parser.screen().scrollback();
        self.parser.screen_mut().set_scrollback(offset);
        let cols = self.parser.screen().size().1;
        let text = self.parser.screen().rows(0, cols).nth(visible_row);
        self.parser.screen_mut().set_scrollback(saved);
        text
    }
}

impl std::fmt::Debug for Vt100Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (rows, cols) = self.parser.screen().size();
        f.debug_struct("Vt100Engine")
            .field("cols", &cols)
            .field("rows", &rows)
            .field("has_selection", &self.selection.is_some())
            .finish_non_exhaustive()
    }
}

impl TerminalEngine for Vt100Engine {
    fn write(&mut self, data: &[u8]) {
        self.parser.process(data);
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.parser.screen_mut().set_size(rows, cols);
    }

    fn cols(&self) -> u16 {
        self.parser.screen().size().1
    }

    fn rows(&self) -> u16 {
        self.parser.screen().size().0
    }

    fn cursor_position(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }

    fn clear(&mut self) {
        // vt100 ignores CSI 3 J, so a fresh parser is the reliable way to
        // drop both the screen and the scrollback.
        let (rows, cols) = self.parser.screen().size();
        self.parser = Parser::new(rows, cols, self.scrollback_lines);
        self.selection = None;
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn buffer_line_count(&mut self) -> usize {
        let rows = self.parser.screen().size().0 as usize;
        self.total_scrollback() + rows
    }

    fn line_text(&mut self, row: usize) -> Option<String> {
        let scrollback = self.total_scrollback();
        let rows = self.parser.screen().size().0 as usize;
        if row >= scrollback + rows {
            return None;
        }
        if row < scrollback {
            self.row_at_offset(scrollback - row, 0)
        } else {
            self.row_at_offset(0, row - scrollback)
        }
    }

    fn cell_fg(&self, row: u16, col: u16) -> Option<CellColor> {
        let cell = self.parser.screen().cell(row, col)?;
        Some(match cell.fgcolor() {
            vt100::Color::Default => CellColor::Default,
            vt100::Color::Idx(i) => CellColor::Indexed(i),
            vt100::Color::Rgb(r, g, b) => CellColor::Rgb(r, g, b),
        })
    }

    fn scroll_to_row(&mut self, row: usize) {
        let scrollback = self.total_scrollback();
        let offset = scrollback.saturating_sub(row);
        self.parser.screen_mut().set_scrollback(offset);
    }

    fn viewport_top(&mut self) -> usize {
        let scrollback = self.total_scrollback();
        scrollback - self.parser.screen().scrollback()
    }

    fn select(&mut self, row: usize, start_col: u16, len: u16) {
        self.selection = Some((row, start_col, len));
    }

    fn selection_text(&mut self) -> Option<String> {
        let (row, start_col, len) = self.selection?;
        let line = self.line_text(row)?;
        let text: String = line
            .chars()
            .skip(start_col as usize)
            .take(len as usize)
            .collect();
        Some(text)
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    fn set_on_input(&mut self, callback: Option<Box<dyn FnMut(&str)>>) {
        self.on_input = callback;
    }

    fn feed_input(&mut self, data: &str) {
        if let Some(mut callback) = self.on_input.take() {
            callback(data);
            self.on_input = Some(callback);
        }
    }

    fn bell_count(&self) -> usize {
        self.parser.screen().audible_bell_count()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_back() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.write(b"hello world\r\nsecond line");
        assert_eq!(engine.line_text(0).as_deref(), Some("hello world"));
        assert_eq!(engine.line_text(1).as_deref(), Some("second line"));
    }

    #[test]
    fn test_resize_changes_dimensions() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.resize(120, 40);
        assert_eq!(engine.cols(), 120);
        assert_eq!(engine.rows(), 40);
    }

    #[test]
    fn test_scrollback_lines_are_addressable() {
        let mut engine = Vt100Engine::new(80, 5);
        for i in 0..20 {
            engine.write(format!("line {i}\r\n").as_bytes());
        }
        // 20 writes into a 5-row grid: the earliest lines are in scrollback
        assert_eq!(engine.line_text(0).as_deref(), Some("line 0"));
        assert_eq!(engine.line_text(15).as_deref(), Some("line 15"));
        assert!(engine.buffer_line_count() >= 20);
    }

    #[test]
    fn test_line_text_past_buffer_is_none() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.write(b"x");
        assert!(engine.line_text(10_000).is_none());
    }

    #[test]
    fn test_cursor_position_tracks_cup() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.write(b"\x1b[5;10H");
        assert_eq!(engine.cursor_position(), (4, 9));
    }

    #[test]
    fn test_sgr_color_readable_from_cell() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.write(b"ab\x1b[32mcd\x1b[0m");
        assert_eq!(engine.cell_fg(0, 0), Some(CellColor::Default));
        assert_eq!(engine.cell_fg(0, 2), Some(CellColor::Indexed(2)));
    }

    #[test]
    fn test_clear_drops_screen_and_scrollback() {
        let mut engine = Vt100Engine::new(80, 5);
        for i in 0..20 {
            engine.write(format!("line {i}\r\n").as_bytes());
        }
        engine.clear();
        assert_eq!(engine.buffer_line_count(), 5);
        assert_eq!(engine.line_text(0).as_deref(), Some(""));
    }

    #[test]
    fn test_scroll_to_row_and_viewport_top() {
        let mut engine = Vt100Engine::new(80, 5);
        for i in 0..30 {
            engine.write(format!("line {i}\r\n").as_bytes());
        }
        engine.scroll_to_row(10);
        assert_eq!(engine.viewport_top(), 10);
        engine.scroll_to_row(0);
        assert_eq!(engine.viewport_top(), 0);
        // Scrolling past the end clamps to the live screen
        engine.scroll_to_row(usize::MAX);
        let top = engine.viewport_top();
        assert!(top <= engine.buffer_line_count());
    }

    #[test]
    fn test_selection_round_trip() {
        let mut engine = Vt100Engine::new(80, 24);
        engine.write(b"select me");
        engine.select(0, 7, 2);
        assert!(engine.has_selection());
        assert_eq!(engine.selection_text().as_deref(), Some("me"));
        engine.clear_selection();
        assert!(!engine.has_selection());
        assert!(engine.selection_text().is_none());
    }

    #[test]
    fn test_input_feedback_callback() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut engine = Vt100Engine::new(80, 24);
        let captured = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&captured);
        engine.set_on_input(Some(Box::new(move |data| {
            sink.borrow_mut().push(data.to_string());
        })));
        engine.feed_input("x");
        engine.feed_input("\x1b[A");
        assert_eq!(*captured.borrow(), vec!["x".to_string(), "\x1b[A".to_string()]);

        engine.set_on_input(None);
        engine.feed_input("dropped");
        assert_eq!(captured.borrow().len(), 2);
    }

    #[test]
    fn test_bell_count_increments() {
        let mut engine = Vt100Engine::new(80, 24);
        assert_eq!(engine.bell_count(), 0);
        engine.write(b"ding\x07");
        assert_eq!(engine.bell_count(), 1);
        engine.write(b"\x07\x07");
        assert_eq!(engine.bell_count(), 3);
    }
}
