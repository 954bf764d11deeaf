//! termdock - embedded terminal sessions for panel surfaces.
//!
//! This crate pairs OS pseudo-terminal processes with sandboxed UI
//! surfaces and routes a typed message protocol between them, plus a
//! feasibility-probe and throughput-benchmark harness for the terminal
//! engine the surfaces render with.
//!
//! # Architecture
//!
//! ```text
//! Host environment (commands, config, notifications)
//!        │
//!        ▼
//! SessionManager ──► PtyService ──► shell process
//!   │  ▲                               │
//!   │  └── SurfaceMessage (ready/input/resize/open-url/…)
//!   ▼
//! Surface ──► SurfaceController ──► TerminalEngine (vt100-backed here)
//!              links · search · keys · theme · persistence
//! ```
//!
//! The host environment, the engine's renderer, and the OS PTY are
//! external collaborators behind narrow traits; everything else is this
//! crate.
//!
//! # Modules
//!
//! - [`session`] - session lifecycle state machine and message routing
//! - [`pty`] - pseudo-terminal process ownership
//! - [`protocol`] - the typed message protocol between host and surface
//! - [`surface`] - surface-side controller (links, search, keys, themes)
//! - [`engine`] - terminal-engine abstraction and the vt100 backing
//! - [`bench`] - write-throughput benchmark harness
//! - [`probe`] - engine feasibility probes
//! - [`demo`] - matrix-rain throughput demo
//! - [`config`] - session/display configuration resolution
//! - [`host`] - host-environment boundary traits
//! - [`cache`] / [`paths`] - link-detection support utilities

pub mod bench;
pub mod cache;
pub mod config;
pub mod demo;
pub mod engine;
pub mod host;
pub mod paths;
pub mod probe;
pub mod protocol;
pub mod pty;
pub mod session;
pub mod surface;

pub use config::{resolve_config, resolve_display_settings, SessionConfig};
pub use engine::{TerminalEngine, Vt100Engine};
pub use protocol::{DisplaySettings, HostMessage, SessionId, SurfaceMessage, ThemeColors};
pub use pty::PtyService;
pub use session::{SessionEvent, SessionManager};
pub use surface::SurfaceController;
