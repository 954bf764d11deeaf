//! Typed message protocol between the session host and its surfaces.
//!
//! Every session pairs a host-side entry (process handle, data queue) with
//! a sandboxed surface (the rendering/interaction context). The two sides
//! talk exclusively through these two closed enums, JSON-encoded with a
//! `type` tag:
//!
//! ```text
//! Surface ──SurfaceMessage──► SessionManager ──► PtyService ──► process
//! Surface ◄──HostMessage──── SessionManager ◄──────────────── process
//! ```
//!
//! Dispatch on both sides is an exhaustive `match`; adding a variant is a
//! compile error until every handler accounts for it, which is the point.

use serde::{Deserialize, Serialize};

/// Opaque session identifier, unique for the process lifetime.
///
/// Allocated from a monotonic counter by the session manager; never reused
/// while a session with the same id is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "term-{}", self.0)
    }
}

/// Font settings pushed to a surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    /// Font family name; `None` leaves the surface's current value alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size in points; `None` leaves the surface's current value alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
}

macro_rules! theme_colors {
    ($($field:ident),+ $(,)?) => {
        /// Terminal color theme. Every field is optional; a message carrying
        /// a partial theme only overwrites the fields it names.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct ThemeColors {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<String>,
            )+
        }

        impl ThemeColors {
            /// Merge `incoming` into `self`, overwriting only the fields
            /// `incoming` actually carries. `None` fields never clobber
            /// existing values.
            pub fn overlay(&mut self, incoming: &ThemeColors) {
                $(
                    if let Some(v) = &incoming.$field {
                        self.$field = Some(v.clone());
                    }
                )+
            }
        }
    };
}

theme_colors!(
    foreground,
    background,
    cursor,
    cursor_accent,
    selection_background,
    selection_foreground,
    black,
    red,
    green,
    yellow,
    blue,
    magenta,
    cyan,
    white,
    bright_black,
    bright_red,
    bright_green,
    bright_yellow,
    bright_blue,
    bright_magenta,
    bright_cyan,
    bright_white,
);

/// Messages a surface sends to the session host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SurfaceMessage {
    /// The surface has measured its dimensions and registered its message
    /// handler. Gates the flush of any queued output. Expected once per
    /// session; a duplicate is accepted as a no-op.
    Ready {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    /// User keystrokes, forwarded verbatim to the process (control
    /// sequences included, no interpretation on the way through).
    Input { session_id: SessionId, data: String },
    /// The surface re-measured itself and wants the process resized.
    Resize {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    /// Request to open a URL externally. Subject to the host's scheme
    /// allow-list; disallowed schemes are logged and dropped.
    OpenUrl { session_id: SessionId, url: String },
    /// Request to open a file in the host editor at an optional position.
    OpenFile {
        session_id: SessionId,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },
    /// Ask whether a path exists on disk. Answered by
    /// [`HostMessage::FileExistsResult`] with the same `request_id`.
    CheckFileExists {
        session_id: SessionId,
        request_id: String,
        path: String,
    },
    /// The terminal rang its bell.
    Bell { session_id: SessionId },
}

impl SurfaceMessage {
    /// The session this message concerns.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Ready { session_id, .. }
            | Self::Input { session_id, .. }
            | Self::Resize { session_id, .. }
            | Self::OpenUrl { session_id, .. }
            | Self::OpenFile { session_id, .. }
            | Self::CheckFileExists { session_id, .. }
            | Self::Bell { session_id } => *session_id,
        }
    }
}

/// Messages the session host sends to a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HostMessage {
    /// Process output for the surface to render.
    Data { session_id: SessionId, data: String },
    /// The process terminated. The surface shows an exit banner; the host
    /// tears the session down after a short grace delay.
    Exit {
        session_id: SessionId,
        exit_code: i32,
    },
    /// Host-initiated resize of the surface's terminal grid.
    Resize {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    /// Font settings changed.
    SettingsUpdate {
        session_id: SessionId,
        settings: DisplaySettings,
    },
    /// Theme colors changed (possibly partially).
    ThemeUpdate {
        session_id: SessionId,
        theme: ThemeColors,
    },
    /// The tracked working directory changed (scraped from OSC 7).
    CwdUpdate { session_id: SessionId, cwd: String },
    /// Answer to [`SurfaceMessage::CheckFileExists`].
    FileExistsResult { request_id: String, exists: bool },
}

// ─── Tests ─────────────────────────────────────────────────────────────────
