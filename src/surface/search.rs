//! Search across the full terminal buffer.
//!
//! The overlay scans every buffered line, scrollback included and not
//! just the viewport, case-insensitively, recording every (possibly
//! overlapping) occurrence. Navigation wraps circularly; activating a
//! match scrolls its row to the center of the viewport and selects the
//! matched span when it lands inside the visible rows.

use crate::engine::TerminalEngine;

/// One occurrence of the query in the buffer. Columns are character
/// positions within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Absolute buffer row.
    pub row: usize,
    /// First matched column.
    pub start_col: usize,
    /// Exclusive end column.
    pub end_col: usize,
}

/// Result of activating a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivatedMatch {
    /// The match that was activated.
    pub matched: SearchMatch,
    /// Row relative to the viewport top after scrolling.
    pub viewport_row: usize,
    /// Whether the span was visibly selected (it fell inside the
    /// viewport after the scroll).
    pub selected: bool,
}

/// Search overlay state for one surface.
#[derive(Debug, Default)]
pub struct BufferSearch {
    query: String,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
    open: bool,
}

impl BufferSearch {
    /// Fresh, closed overlay with no query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the overlay (the find shortcut landed).
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the overlay and drop the match state.
    pub fn close(&mut self) {
        self.open = false;
        self.matches.clear();
        self.current = None;
        self.query.clear();
    }

    /// True while the overlay is showing.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// All matches for the current query.
    #[must_use]
    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// Index of the current match, if any.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Re-scan the whole buffer for a new query.
    pub fn set_query(&mut self, engine: &mut dyn TerminalEngine, query: &str) {
        self.query = query.to_string();
        self.matches.clear();
        self.current = None;
        if query.is_empty() {
            return;
        }

        let needle: Vec<char> = query.to_lowercase().chars().collect();
        let total = engine.buffer_line_count();
        for row in 0..total {
            let Some(line) = engine.line_text(row) else {
                continue;
            };
            let haystack: Vec<char> = line.to_lowercase().chars().collect();
            if haystack.len() < needle.len() {
                continue;
            }
            // Overlapping matches: advance one column at a time.
            for start in 0..=(haystack.len() - needle.len()) {
                if haystack[start..start + needle.len()] == needle[..] {
                    self.matches.push(SearchMatch {
                        row,
                        start_col: start,
                        end_col: start + needle.len(),
                    });
                }
            }
        }
        if !self.matches.is_empty() {
            self.current = Some(0);
        }
    }

    /// Step to the next match, wrapping past the end.
    pub fn next(&mut self) -> Option<SearchMatch> {
        let current = self.current?;
        let next = (current + 1) % self.matches.len();
        self.current = Some(next);
        Some(self.matches[next])
    }

    /// Step to the previous match, wrapping past the start.
    pub fn prev(&mut self) -> Option<SearchMatch> {
        let current = self.current?;
        let prev = (current + self.matches.len() - 1) % self.matches.len();
        self.current = Some(prev);
        Some(self.matches[prev])
    }

    /// Scroll the current match's row to the viewport center and select
    /// the span if it ends up visible.
    pub fn activate_current(&mut self, engine: &mut dyn TerminalEngine) -> Option<ActivatedMatch> {
        let matched = self.matches[self.current?];
        let rows = engine.rows() as usize;

        let target_top = matched.row.saturating_sub(rows / 2);
        engine.scroll_to_row(target_top);

        let viewport_top = engine.viewport_top();
        let viewport_row = matched.row.saturating_sub(viewport_top);
        let selected = matched.row >= viewport_top && viewport_row < rows;
        if selected {
            engine.select(
                matched.row,
                matched.start_col as u16,
                (matched.end_col - matched.start_col) as u16,
            );
        }
        Some(ActivatedMatch {
            matched,
            viewport_row,
            selected,
        })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Vt100Engine;

    fn engine_with_lines(lines: &[&str], rows: u16) -> Vt100Engine {
        let mut engine = Vt100Engine::new(80, rows);
        for line in lines {
            engine.write(line.as_bytes());
            engine.write(b"\r\n");
        }
        engine
    }

    #[test]
    fn test_case_insensitive_matching() {
        let mut engine = engine_with_lines(&["Hello World", "HELLO again"], 24);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "hello");
        assert_eq!(search.matches().len(), 2);
        assert_eq!(search.matches()[0], SearchMatch { row: 0, start_col: 0, end_col: 5 });
        assert_eq!(search.matches()[1].row, 1);
    }

    #[test]
    fn test_overlapping_occurrences_are_all_found() {
        let mut engine = engine_with_lines(&["aaa"], 24);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "aa");
        let cols: Vec<usize> = search.matches().iter().map(|m| m.start_col).collect();
        assert_eq!(cols, vec![0, 1]);
    }

    #[test]
    fn test_scrollback_lines_are_searched() {
        let lines: Vec<String> = (0..40).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        // 5-row grid: most lines live in scrollback
        let mut engine = engine_with_lines(&refs, 5);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "line 2");
        // "line 2" plus "line 20".."line 29"
        assert_eq!(search.matches().len(), 11);
        assert_eq!(search.matches()[0].row, 2);
    }

    #[test]
    fn test_navigation_wraps_circularly() {
        let mut engine = engine_with_lines(&["x", "x", "x"], 24);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "x");
        assert_eq!(search.current_index(), Some(0));
        search.next();
        search.next();
        assert_eq!(search.current_index(), Some(2));
        search.next();
        assert_eq!(search.current_index(), Some(0), "next wraps to start");
        search.prev();
        assert_eq!(search.current_index(), Some(2), "prev wraps to end");
    }

    #[test]
    fn test_empty_query_clears_matches() {
        let mut engine = engine_with_lines(&["abc"], 24);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "a");
        assert_eq!(search.matches().len(), 1);
        search.set_query(&mut engine, "");
        assert!(search.matches().is_empty());
        assert_eq!(search.current_index(), None);
        assert!(search.next().is_none());
    }

    #[test]
    fn test_activation_centers_and_selects() {
        let lines: Vec<String> = (0..60)
            .map(|i| if i == 30 { "needle here".into() } else { format!("row {i}") })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut engine = engine_with_lines(&refs, 10);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "needle");

        let activated = search.activate_current(&mut engine).expect("a match");
        assert_eq!(activated.matched.row, 30);
        // Centered: the match sits mid-viewport
        assert_eq!(engine.viewport_top(), 25);
        assert_eq!(activated.viewport_row, 5);
        assert!(activated.selected);
        assert_eq!(engine.selection_text().as_deref(), Some("needle"));
    }

    #[test]
    fn test_activation_near_buffer_top_clamps() {
        let mut engine = engine_with_lines(&["target", "b", "c"], 10);
        let mut search = BufferSearch::new();
        search.set_query(&mut engine, "target");
        let activated = search.activate_current(&mut engine).expect("a match");
        assert_eq!(activated.viewport_row, 0);
        assert!(activated.selected);
    }

    #[test]
    fn test_overlay_open_close_lifecycle() {
        let mut engine = engine_with_lines(&["abc"], 24);
        let mut search = BufferSearch::new();
        assert!(!search.is_open());
        search.open();
        assert!(search.is_open());
        search.set_query(&mut engine, "abc");
        search.close();
        assert!(!search.is_open());
        assert!(search.matches().is_empty());
        assert_eq!(search.query(), "");
    }
}
