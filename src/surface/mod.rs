//! Surface-side terminal controller.
//!
//! One [`SurfaceController`] runs inside each session's surface. It owns
//! the terminal-engine instance, bridges engine events to the message
//! protocol, and layers on the behavior the engine itself does not
//! provide: link detection with host-validated existence, full-buffer
//! search, keybinding arbitration, theme/font hot-reload, debounced
//! resize, scrollback persistence, and drag-and-drop quoting.
//!
//! ```text
//! HostMessage ──► handle_message ──► engine.write / options merge / …
//! key events  ──► on_key ──► consume | bubble | terminal default
//! engine input callback ──► SurfaceMessage::Input ──► host
//! ticks ──► debounced refit, pending-check expiry, periodic persist
//! ```
//!
//! The controller is deliberately clock-driven: callers feed it `Instant`s
//! through [`observe_resize`](SurfaceController::observe_resize) and
//! [`tick`](SurfaceController::tick), which keeps the debounce and
//! persistence schedules testable without timers.

pub mod keys;
pub mod links;
pub mod search;

use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::engine::{EngineCapabilities, TerminalEngine};
use crate::host::{HostLink, PersistedState, SurfaceStore};
use crate::paths::{quote_shell_path, resolve_path};
use crate::protocol::{DisplaySettings, HostMessage, SessionId, SurfaceMessage, ThemeColors};
use self::keys::{decide, KeyDecision, KeyPress};
use self::links::{LinkCheck, LinkDetector};
use self::search::{ActivatedMatch, BufferSearch};

/// Quiet period before a container resize is applied. The engine's
/// fit/resize path is not safe to call at drag-resize frequency.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Interval between scrollback persistence snapshots.
pub const PERSIST_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on persisted scrollback lines.
pub const SCROLLBACK_PERSIST_CAP: usize = 5000;

/// The engine's live options object: current font settings and theme.
/// Updates merge into this; the renderer reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminalOptions {
    /// Font family/size.
    pub settings: DisplaySettings,
    /// Color theme.
    pub theme: ThemeColors,
}

/// Per-session client logic living inside the surface.
pub struct SurfaceController {
    session_id: SessionId,
    engine: Box<dyn TerminalEngine>,
    link: Rc<dyn HostLink>,
    store: Box<dyn SurfaceStore>,
    fit: Box<dyn FnMut() -> (u16, u16)>,
    options: TerminalOptions,
    search: BufferSearch,
    links: LinkDetector,
    current_cwd: Option<String>,
    is_mac: bool,
    is_windows: bool,
    resize_deadline: Option<Instant>,
    last_persist: Instant,
    last_bell_count: usize,
}

impl std::fmt::Debug for SurfaceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceController")
            .field("session_id", &self.session_id)
            .field("current_cwd", &self.current_cwd)
            .field("search_open", &self.search.is_open())
            .finish_non_exhaustive()
    }
}

impl SurfaceController {
    /// Build the controller: verify engine capabilities, replay any
    /// persisted scrollback, wire the input callback, measure the
    /// viewport, and report readiness to the host.
    ///
    /// `fit` is the external measure step (the fit addon analog): it
    /// returns the column/row count the container currently supports.
    ///
    /// # Errors
    ///
    /// Fails fast if the engine is missing a required capability.
    pub fn new(
        session_id: SessionId,
        mut engine: Box<dyn TerminalEngine>,
        link: Rc<dyn HostLink>,
        store: Box<dyn SurfaceStore>,
        mut fit: Box<dyn FnMut() -> (u16, u16)>,
        is_mac: bool,
        is_windows: bool,
        now: Instant,
    ) -> Result<Self> {
        EngineCapabilities::detect(engine.as_mut()).require_core()?;

        let mut current_cwd = None;
        if let Some(state) = store.load() {
            current_cwd = state.current_cwd;
            if !state.scrollback_content.is_empty() {
                for line in &state.scrollback_content {
                    engine.write(format!("\x1b[2m{line}\x1b[0m\r\n").as_bytes());
                }
                engine.write(b"\x1b[90m[session restored]\x1b[0m\r\n");
            }
        }

        let input_link = Rc::clone(&link);
        engine.set_on_input(Some(Box::new(move |data| {
            input_link.post(SurfaceMessage::Input {
                session_id,
                data: data.to_string(),
            });
        })));

        // Measure before announcing readiness so the host's first resize
        // matches what the container can actually show.
        let (cols, rows) = fit();
        engine.resize(cols, rows);
        link.post(SurfaceMessage::Ready {
            session_id,
            cols,
            rows,
        });

        let last_bell_count = engine.bell_count();
        Ok(Self {
            session_id,
            engine,
            link,
            store,
            fit,
            options: TerminalOptions::default(),
            search: BufferSearch::new(),
            links: LinkDetector::new(),
            current_cwd,
            is_mac,
            is_windows,
            resize_deadline: None,
            last_persist: now,
            last_bell_count,
        })
    }

    /// The engine's live options object.
    #[must_use]
    pub fn options(&self) -> &TerminalOptions {
        &self.options
    }

    /// Working directory as last reported by the host.
    #[must_use]
    pub fn current_cwd(&self) -> Option<&str> {
        self.current_cwd.as_deref()
    }

    /// Direct engine access for rendering layers.
    pub fn engine_mut(&mut self) -> &mut dyn TerminalEngine {
        self.engine.as_mut()
    }

    /// Handle one host message. Dispatch is exhaustive; protocol drift
    /// breaks the build here rather than silently at runtime.
    pub fn handle_message(&mut self, message: HostMessage, now: Instant) {
        match message {
            HostMessage::Data { data, .. } => {
                self.engine.write(data.as_bytes());
                self.notice_bell();
                self.detect_links_on_cursor_line(now);
            }
            HostMessage::Exit { exit_code, .. } => {
                let banner =
                    format!("\r\n\x1b[90m[Process exited with code {exit_code}]\x1b[0m\r\n");
                self.engine.write(banner.as_bytes());
            }
            HostMessage::Resize { cols, rows, .. } => {
                self.engine.resize(cols, rows);
            }
            HostMessage::SettingsUpdate { settings, .. } => {
                if settings.font_family.is_some() {
                    self.options.settings.font_family = settings.font_family;
                }
                if settings.font_size.is_some() {
                    self.options.settings.font_size = settings.font_size;
                }
                // A font change moves the cell metrics: re-measure and let
                // the host resize the PTY to match.
                self.refit();
            }
            HostMessage::ThemeUpdate { theme, .. } => {
                self.options.theme.overlay(&theme);
            }
            HostMessage::CwdUpdate { cwd, .. } => {
                self.current_cwd = Some(cwd);
            }
            HostMessage::FileExistsResult { request_id, exists } => {
                if let Some(path) = self.links.resolve(&request_id, exists) {
                    log::debug!("file check resolved: {path} exists={exists}");
                }
            }
        }
    }

    /// Arbitration for one key event. Opens the search overlay when the
    /// find shortcut is consumed.
    pub fn on_key(&mut self, press: &KeyPress) -> KeyDecision {
        let decision = decide(press, self.is_mac, self.engine.has_selection());
        if decision == KeyDecision::ConsumeForSearch {
            self.search.open();
        }
        decision
    }

    /// Search overlay state.
    #[must_use]
    pub fn search(&self) -> &BufferSearch {
        &self.search
    }

    /// Update the search query and jump to the first match.
    pub fn set_search_query(&mut self, query: &str) -> Option<ActivatedMatch> {
        self.search.set_query(self.engine.as_mut(), query);
        self.search.activate_current(self.engine.as_mut())
    }

    /// Advance to the next match (wrapping) and activate it.
    pub fn search_next(&mut self) -> Option<ActivatedMatch> {
        self.search.next()?;
        self.search.activate_current(self.engine.as_mut())
    }

    /// Step back to the previous match (wrapping) and activate it.
    pub fn search_prev(&mut self) -> Option<ActivatedMatch> {
        self.search.prev()?;
        self.search.activate_current(self.engine.as_mut())
    }

    /// Close the search overlay.
    pub fn close_search(&mut self) {
        self.search.close();
        self.engine.clear_selection();
    }

    /// A link was clicked. Returns true if the click was handled (a
    /// message was posted); plain clicks fall through.
    pub fn on_link_click(&mut self, text: &str, modifier_held: bool) -> bool {
        match links::activate(
            self.session_id,
            text,
            self.current_cwd.as_deref(),
            modifier_held,
        ) {
            Some(message) => {
                self.link.post(message);
                true
            }
            None => false,
        }
    }

    /// The container changed size; start (or restart) the quiet period.
    pub fn observe_resize(&mut self, now: Instant) {
        self.resize_deadline = Some(now + RESIZE_DEBOUNCE);
    }

    /// Drive time-based work: the resize debounce, pending file-check
    /// expiry, and periodic scrollback persistence.
    pub fn tick(&mut self, now: Instant) {
        if self.resize_deadline.is_some_and(|deadline| now >= deadline) {
            self.resize_deadline = None;
            self.refit();
        }
        self.links.expire(now);
        if now.duration_since(self.last_persist) >= PERSIST_INTERVAL {
            self.persist(now);
        }
    }

    /// The surface went hidden; take a persistence snapshot now.
    pub fn on_hidden(&mut self, now: Instant) {
        self.persist(now);
    }

    /// Filesystem entries were dropped onto the terminal: shell-quote
    /// each path and insert the batch as if typed.
    pub fn handle_drop(&mut self, paths: &[String]) {
        if paths.is_empty() {
            return;
        }
        let quoted: Vec<String> = paths
            .iter()
            .map(|p| quote_shell_path(p, self.is_windows))
            .collect();
        self.link.post(SurfaceMessage::Input {
            session_id: self.session_id,
            data: quoted.join(" "),
        });
    }

    fn refit(&mut self) {
        let (cols, rows) = (self.fit)();
        self.engine.resize(cols, rows);
        self.link.post(SurfaceMessage::Resize {
            session_id: self.session_id,
            cols,
            rows,
        });
    }

    fn notice_bell(&mut self) {
        let count = self.engine.bell_count();
        if count > self.last_bell_count {
            self.last_bell_count = count;
            self.link.post(SurfaceMessage::Bell {
                session_id: self.session_id,
            });
        }
    }

    /// Scan the line under the cursor for path tokens and kick off
    /// existence checks for any that aren't already cached or in flight.
    fn detect_links_on_cursor_line(&mut self, now: Instant) {
        let rows = self.engine.rows() as usize;
        let total = self.engine.buffer_line_count();
        let (cursor_row, _) = self.engine.cursor_position();
        let absolute = total.saturating_sub(rows) + cursor_row as usize;
        let Some(line) = self.engine.line_text(absolute) else {
            return;
        };
        for matched in links::scan_line(&line) {
            let resolved = resolve_path(&matched.path, self.current_cwd.as_deref());
            if let LinkCheck::Request(message) =
                self.links.check(self.session_id, &resolved, now)
            {
                self.link.post(message);
            }
        }
    }

    fn persist(&mut self, now: Instant) {
        self.last_persist = now;
        let total = self.engine.buffer_line_count();
        let start = total.saturating_sub(SCROLLBACK_PERSIST_CAP);
        let mut lines: Vec<String> = (start..total)
            .filter_map(|row| self.engine.line_text(row))
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        self.store.save(&PersistedState {
            current_cwd: self.current_cwd.clone(),
            scrollback_content: lines,
        });
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
