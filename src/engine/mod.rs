//! Terminal-engine abstraction.
//!
//! The rendering engine (WASM/WebGL in the shipped surface, `vt100` in
//! this crate's own harness and tests) is an external collaborator. The
//! session and surface layers only ever see [`TerminalEngine`]; swapping
//! the backing is a one-line change at construction.
//!
//! Capability detection happens exactly once, at initialization, via
//! [`EngineCapabilities::detect`]: the engine is exercised against the
//! required operation set and a strongly-typed report comes back. Callers
//! that need the full surface check [`EngineCapabilities::require_core`]
//! and fail fast with a descriptive error instead of threading optional
//! lookups through every call site.

mod vt100;

pub use self::vt100::Vt100Engine;

use anyhow::{bail, Result};
use std::cell::Cell as StdCell;
use std::rc::Rc;

/// A cell's foreground/background color, decoupled from any backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellColor {
    /// Default palette color.
    Default,
    /// Indexed palette color (16/256-color modes).
    Indexed(u8),
    /// Direct 24-bit color.
    Rgb(u8, u8, u8),
}

/// The operations the session and surface layers require of a terminal
/// engine. Mirrors the embedded engine's observable API: byte ingestion,
/// grid management, buffer/cell access, selection, and the input-feedback
/// callback that turns synthesized keystrokes into data events.
pub trait TerminalEngine {
    /// Feed raw output bytes into the emulator.
    fn write(&mut self, data: &[u8]);

    /// Change the grid dimensions.
    fn resize(&mut self, cols: u16, rows: u16);

    /// Current grid width.
    fn cols(&self) -> u16;
    /// Current grid height.
    fn rows(&self) -> u16;

    /// Cursor position as `(row, col)` on the visible screen.
    fn cursor_position(&self) -> (u16, u16);

    /// Wipe the screen and scrollback.
    fn clear(&mut self);
    /// Wipe everything and drop modes back to their defaults.
    fn reset(&mut self);

    /// Total buffered lines: scrollback plus the visible screen.
    fn buffer_line_count(&mut self) -> usize;

    /// Plain text of an absolute buffer line (0 = oldest buffered line),
    /// or `None` past the end of the buffer.
    fn line_text(&mut self, row: usize) -> Option<String>;

    /// Foreground color of a visible-screen cell.
    fn cell_fg(&self, row: u16, col: u16) -> Option<CellColor>;

    /// Scroll so the given absolute buffer line becomes the top visible
    /// row (clamped to the available scrollback).
    fn scroll_to_row(&mut self, row: usize);

    /// Absolute buffer line currently at the top of the viewport.
    fn viewport_top(&mut self) -> usize;

    /// Select `len` cells on an absolute buffer line starting at
    /// `start_col`.
    fn select(&mut self, row: usize, start_col: u16, len: u16);
    /// Text of the current selection, if any.
    fn selection_text(&mut self) -> Option<String>;
    /// Drop the current selection.
    fn clear_selection(&mut self);
    /// True while a selection is active.
    fn has_selection(&self) -> bool;

    /// Register the data callback fired by [`feed_input`](Self::feed_input).
    fn set_on_input(&mut self, callback: Option<Box<dyn FnMut(&str)>>);
    /// Synthesize user input, echoing it through the registered callback
    /// exactly as a real keystroke would.
    fn feed_input(&mut self, data: &str);

    /// Number of BEL characters processed so far.
    fn bell_count(&self) -> usize;
}

/// One-shot capability report for a terminal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCapabilities {
    /// Written text can be read back out of the buffer.
    pub buffer_access: bool,
    /// SGR sequences change readable cell colors.
    pub cell_colors: bool,
    /// `resize` changes the reported grid dimensions.
    pub resize: bool,
    /// Synthesized input reaches the registered data callback.
    pub input_feedback: bool,
    /// Select/read/clear selection operations work.
    pub selection: bool,
}

impl EngineCapabilities {
    /// Exercise `engine` against the required operation set. The engine is
    /// reset afterwards; run this before any real content is written.
    pub fn detect(engine: &mut dyn TerminalEngine) -> Self {
        engine.reset();

        engine.write(b"captest\x1b[31mred\x1b[0m");
        let line = engine.line_text(0).unwrap_or_default();
        let buffer_access = line.starts_with("captest");
        let cell_colors = matches!(
            engine.cell_fg(0, 7),
            Some(CellColor::Indexed(_) | CellColor::Rgb(..))
        );

        let before = (engine.cols(), engine.rows());
        engine.resize(before.0 + 1, before.1);
        let resize = engine.cols() == before.0 + 1;
        engine.resize(before.0, before.1);

        let echoed = Rc::new(StdCell::new(false));
        let flag = Rc::clone(&echoed);
        engine.set_on_input(Some(Box::new(move |data| {
            if data == "x" {
                flag.set(true);
            }
        })));
        engine.feed_input("x");
        engine.set_on_input(None);
        let input_feedback = echoed.get();

        engine.select(0, 0, 3);
        let selection = engine.has_selection()
            && engine.selection_text().as_deref() == Some("cap");
        engine.clear_selection();

        engine.reset();

        Self {
            buffer_access,
            cell_colors,
            resize,
            input_feedback,
            selection,
        }
    }

    /// Fail fast unless the operations the surface controller depends on
    /// are all present.
    pub fn require_core(&self) -> Result<()> {
        if !self.buffer_access {
            bail!("terminal engine does not expose buffer line access");
        }
        if !self.resize {
            bail!("terminal engine does not honor resize");
        }
        if !self.input_feedback {
            bail!("terminal engine does not echo synthesized input");
        }
        Ok(())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
