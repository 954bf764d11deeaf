//! Session lifecycle and message routing.
//!
//! [`SessionManager`] owns every live terminal session: the pairing of a
//! PTY process (via [`PtyService`]) with a UI surface. It runs a
//! single-threaded event loop; everything that happens to a session
//! (surface messages, process output, timeouts) arrives as a
//! [`SessionEvent`] and is dispatched synchronously:
//!
//! ```text
//!            create ──► surface created ──► PTY spawned ──► ready timeout armed
//!                                                │
//! surface Ready(cols,rows) ──► resize ──► settings/theme push ──► queue flush
//!                                                │
//!     PTY data ──► OSC 7 scan ──► queue (not ready) / forward (ready)
//!                                                │
//!  exit / error / timeout / surface closed ──► teardown (idempotent)
//! ```
//!
//! Per-session state is strictly `spawning → ready=false → ready=true →
//! destroyed`; `destroyed` is terminal. Teardown removes the session from
//! the live map *before* any cleanup so re-entrant triggers (the surface's
//! own close event firing during dispose) find nothing to do.

pub mod osc;

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::{resolve_config, SessionConfig};
use crate::host::{HostNotifier, Surface, SurfaceFactory, Workspace};
use crate::protocol::{DisplaySettings, HostMessage, SessionId, SurfaceMessage, ThemeColors};
use crate::pty::{PtyHandlers, PtyService};

/// Maximum output chunks buffered while a surface is not yet ready.
/// Beyond this, further chunks are dropped (drop-newest) so a stalled
/// surface cannot grow host memory without bound.
pub const MAX_DATA_QUEUE_SIZE: usize = 100;

/// How long a surface gets to report readiness before the session is
/// abandoned.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between a process exit and session teardown, long enough for the
/// user to read the exit banner.
pub const EXIT_CLOSE_DELAY: Duration = Duration::from_millis(1500);

/// URL schemes allowed through [`SurfaceMessage::OpenUrl`]. Anything else
/// (`file:`, `command:`, `javascript:`, editor-internal schemes) is
/// dropped to keep terminal output from smuggling URI-scheme payloads
/// into the host's generic opener.
pub const ALLOWED_URL_SCHEMES: [&str; 7] =
    ["http", "https", "mailto", "ftp", "ssh", "git", "tel"];

/// True if `url` carries a well-formed scheme on the allow-list.
#[must_use]
pub fn is_allowed_url(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_shape = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_shape
        && ALLOWED_URL_SCHEMES
            .iter()
            .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
}

/// Everything that can happen to the session manager, in one closed enum.
#[derive(Debug)]
pub enum SessionEvent {
    /// A message arrived from a surface.
    Surface(SurfaceMessage),
    /// A surface was closed by the user.
    SurfaceClosed(SessionId),
    /// The PTY produced output.
    PtyData(SessionId, String),
    /// The PTY process exited.
    PtyExit(SessionId, i32),
    /// The PTY process failed at runtime (already killed by the wrapper).
    PtyError(SessionId, String),
    /// The readiness deadline passed.
    ReadyTimeout(SessionId),
    /// The post-exit grace delay elapsed.
    ExitGraceElapsed(SessionId),
}

struct Session {
    surface: Box<dyn Surface>,
    ready: bool,
    data_queue: VecDeque<String>,
    current_cwd: Option<String>,
    ready_timeout: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ready", &self.ready)
            .field("queued", &self.data_queue.len())
            .field("current_cwd", &self.current_cwd)
            .finish_non_exhaustive()
    }
}

/// Owns the live session set and routes between PTYs and surfaces.
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    pty: PtyService,
    surfaces: Box<dyn SurfaceFactory>,
    notifier: Box<dyn HostNotifier>,
    workspace: Box<dyn Workspace>,
    display_settings: DisplaySettings,
    theme: Option<ThemeColors>,
    events_tx: UnboundedSender<SessionEvent>,
    exit_when_idle: bool,
    next_id: u64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager. `events_tx` is the sender side of the channel the
    /// caller will drive [`run`](Self::run) with; the manager clones it
    /// into PTY callbacks and timer tasks.
    pub fn new(
        surfaces: Box<dyn SurfaceFactory>,
        notifier: Box<dyn HostNotifier>,
        workspace: Box<dyn Workspace>,
        display_settings: DisplaySettings,
        events_tx: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            pty: PtyService::new(),
            surfaces,
            notifier,
            workspace,
            display_settings,
            theme: None,
            events_tx,
            exit_when_idle: false,
            next_id: 1,
        }
    }

    /// Make [`run`](Self::run) return once the live set drains to empty.
    /// Used by the CLI, which hosts exactly one session.
    pub fn set_exit_when_idle(&mut self, exit_when_idle: bool) {
        self.exit_when_idle = exit_when_idle;
    }

    /// Record the theme snapshot pushed to surfaces on readiness and
    /// broadcast the change to every ready session.
    pub fn update_theme(&mut self, theme: ThemeColors) {
        self.theme = Some(theme.clone());
        for (id, session) in &self.sessions {
            if session.ready {
                session.surface.post(&HostMessage::ThemeUpdate {
                    session_id: *id,
                    theme: theme.clone(),
                });
            }
        }
    }

    /// Record new display settings and broadcast to ready sessions.
    pub fn update_display_settings(&mut self, settings: DisplaySettings) {
        self.display_settings = settings.clone();
        for (id, session) in &self.sessions {
            if session.ready {
                session.surface.post(&HostMessage::SettingsUpdate {
                    session_id: *id,
                    settings: settings.clone(),
                });
            }
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// True while `id` is in the live set.
    #[must_use]
    pub fn is_live(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Readiness flag for a live session.
    #[must_use]
    pub fn is_ready(&self, id: SessionId) -> bool {
        self.sessions.get(&id).is_some_and(|s| s.ready)
    }

    /// Number of chunks queued for a not-yet-ready session.
    #[must_use]
    pub fn queued_chunks(&self, id: SessionId) -> usize {
        self.sessions.get(&id).map_or(0, |s| s.data_queue.len())
    }

    /// Last working directory scraped from the session's output.
    #[must_use]
    pub fn current_cwd(&self, id: SessionId) -> Option<String> {
        self.sessions.get(&id).and_then(|s| s.current_cwd.clone())
    }

    /// Create a new session: surface first, then the PTY spawn, then the
    /// readiness timer. Returns `None` (with an error notification shown
    /// and no state left behind) if either step fails.
    pub fn create_session(&mut self, config: &SessionConfig) -> Option<SessionId> {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        let surface = match self.surfaces.create(id) {
            Ok(surface) => surface,
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to create terminal surface: {e:#}"));
                return None;
            }
        };

        self.sessions.insert(
            id,
            Session {
                surface,
                ready: false,
                data_queue: VecDeque::new(),
                current_cwd: None,
                ready_timeout: None,
            },
        );

        let resolved = resolve_config(config);
        let handlers = self.pty_handlers(id);
        if let Err(e) = self.pty.spawn(id, &resolved, handlers) {
            self.notifier
                .error(&format!("Failed to start terminal: {e:#}"));
            if let Some(session) = self.sessions.remove(&id) {
                session.surface.dispose();
            }
            return None;
        }

        let timeout_tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(READY_TIMEOUT).await;
            let _ = timeout_tx.send(SessionEvent::ReadyTimeout(id));
        });
        if let Some(session) = self.sessions.get_mut(&id) {
            session.ready_timeout = Some(handle);
        }

        log::info!("created session {id}");
        Some(id)
    }

    fn pty_handlers(&self, id: SessionId) -> PtyHandlers {
        let data_tx = self.events_tx.clone();
        let exit_tx = self.events_tx.clone();
        let error_tx = self.events_tx.clone();
        PtyHandlers {
            on_data: Box::new(move |data| {
                let _ = data_tx.send(SessionEvent::PtyData(id, data));
            }),
            on_exit: Box::new(move |code| {
                let _ = exit_tx.send(SessionEvent::PtyExit(id, code));
            }),
            on_error: Box::new(move |message| {
                let _ = error_tx.send(SessionEvent::PtyError(id, message));
            }),
        }
    }

    /// Drive the manager until the channel closes (or, with
    /// [`set_exit_when_idle`](Self::set_exit_when_idle), until the live
    /// set drains).
    pub async fn run(&mut self, mut events: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
            if self.exit_when_idle && self.sessions.is_empty() {
                break;
            }
        }
    }

    /// Dispatch one event. Every arm tolerates stale ids so a message
    /// racing a teardown can never corrupt the live set.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Surface(message) => self.handle_surface_message(message),
            SessionEvent::SurfaceClosed(id) => self.destroy_session(id),
            SessionEvent::PtyData(id, data) => self.handle_pty_data(id, &data),
            SessionEvent::PtyExit(id, code) => self.handle_pty_exit(id, code),
            SessionEvent::PtyError(id, message) => self.handle_pty_error(id, &message),
            SessionEvent::ReadyTimeout(id) => self.handle_ready_timeout(id),
            SessionEvent::ExitGraceElapsed(id) => self.destroy_session(id),
        }
    }

    fn handle_surface_message(&mut self, message: SurfaceMessage) {
        match message {
            SurfaceMessage::Ready {
                session_id,
                cols,
                rows,
            } => self.handle_ready(session_id, cols, rows),
            SurfaceMessage::Input { session_id, data } => {
                // Verbatim passthrough, control sequences included.
                self.pty.write(session_id, &data);
            }
            SurfaceMessage::Resize {
                session_id,
                cols,
                rows,
            } => self.pty.resize(session_id, cols, rows),
            SurfaceMessage::OpenUrl { url, .. } => self.handle_open_url(&url),
            SurfaceMessage::OpenFile {
                path, line, column, ..
            } => self.workspace.open_file(&path, line, column),
            SurfaceMessage::CheckFileExists {
                session_id,
                request_id,
                path,
            } => self.handle_check_file_exists(session_id, &request_id, &path),
            SurfaceMessage::Bell { session_id } => {
                log::debug!("bell from {session_id}");
            }
        }
    }

    fn handle_ready(&mut self, id: SessionId, cols: u16, rows: u16) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if session.ready {
            log::debug!("duplicate ready from {id}, ignoring");
            return;
        }
        if let Some(handle) = session.ready_timeout.take() {
            handle.abort();
        }

        self.pty.resize(id, cols, rows);

        session.surface.post(&HostMessage::SettingsUpdate {
            session_id: id,
            settings: self.display_settings.clone(),
        });
        if let Some(theme) = &self.theme {
            session.surface.post(&HostMessage::ThemeUpdate {
                session_id: id,
                theme: theme.clone(),
            });
        }
        if let Some(cwd) = &session.current_cwd {
            session.surface.post(&HostMessage::CwdUpdate {
                session_id: id,
                cwd: cwd.clone(),
            });
        }

        for data in session.data_queue.drain(..) {
            session.surface.post(&HostMessage::Data {
                session_id: id,
                data,
            });
        }
        session.ready = true;
        log::info!("session {id} ready at {cols}x{rows}");
    }

    fn handle_pty_data(&mut self, id: SessionId, data: &str) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        // The cwd update and the data delivery derive from the same chunk;
        // record first so queued data never outruns the tracked directory.
        if let Some(cwd) = osc::scan_cwd(data.as_bytes()) {
            if session.current_cwd.as_deref() != Some(cwd.as_str()) {
                session.current_cwd = Some(cwd.clone());
                if session.ready {
                    session.surface.post(&HostMessage::CwdUpdate {
                        session_id: id,
                        cwd,
                    });
                }
            }
        }

        if session.ready {
            session.surface.post(&HostMessage::Data {
                session_id: id,
                data: data.to_string(),
            });
        } else if session.data_queue.len() < MAX_DATA_QUEUE_SIZE {
            session.data_queue.push_back(data.to_string());
        } else {
            log::trace!("dropping output chunk for {id}: pre-ready queue full");
        }
    }

    fn handle_open_url(&mut self, url: &str) {
        if is_allowed_url(url) {
            self.workspace.open_external(url);
        } else {
            log::warn!("blocked URL with disallowed scheme: {url}");
        }
    }

    fn handle_check_file_exists(&mut self, id: SessionId, request_id: &str, path: &str) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        let exists = self.workspace.file_exists(path);
        session.surface.post(&HostMessage::FileExistsResult {
            request_id: request_id.to_string(),
            exists,
        });
    }

    fn handle_pty_exit(&mut self, id: SessionId, exit_code: i32) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        session.surface.post(&HostMessage::Exit {
            session_id: id,
            exit_code,
        });

        let grace_tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(EXIT_CLOSE_DELAY).await;
            let _ = grace_tx.send(SessionEvent::ExitGraceElapsed(id));
        });
        log::info!("session {id} process exited with code {exit_code}");
    }

    fn handle_pty_error(&mut self, id: SessionId, message: &str) {
        if !self.sessions.contains_key(&id) {
            return;
        }
        self.notifier.error(&format!("Terminal error: {message}"));
        self.destroy_session(id);
    }

    fn handle_ready_timeout(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        if session.ready {
            return;
        }
        self.notifier
            .error("Terminal failed to initialize (timeout)");
        self.destroy_session(id);
    }

    /// Tear a session down. Idempotent: unknown ids return immediately.
    pub fn destroy_session(&mut self, id: SessionId) {
        // Remove from the live set first so the surface's own close event,
        // if dispose triggers it, finds nothing and no-ops.
        let Some(mut session) = self.sessions.remove(&id) else {
            return;
        };
        if let Some(handle) = session.ready_timeout.take() {
            handle.abort();
        }
        self.pty.kill(id);
        session.surface.dispose();
        log::info!("session {id} destroyed");
    }

    /// Tear down every session and the PTY service. Called once at host
    /// deactivation.
    pub fn dispose(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.destroy_session(id);
        }
        self.pty.dispose();
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
