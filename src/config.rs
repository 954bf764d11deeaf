//! Session configuration and platform defaulting.
//!
//! A session request may leave everything unset; the gaps are filled at
//! spawn time from the environment: shell from `$SHELL` (or `%COMSPEC%` on
//! Windows), working directory from the home directory, grid size 80×24.
//! Display settings resolve through a priority chain over an injectable
//! settings source so the host's configuration store stays mockable.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::protocol::DisplaySettings;

/// Fallback grid width when neither the request nor the surface has
/// measured anything yet.
pub const DEFAULT_COLS: u16 = 80;
/// Fallback grid height.
pub const DEFAULT_ROWS: u16 = 24;

/// Requested configuration for a new session. All fields optional;
/// [`resolve_config`] fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shell executable to spawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Working directory for the process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Initial column count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    /// Initial row count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
}

/// Fully-defaulted spawn parameters.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Shell executable.
    pub shell: String,
    /// Working directory.
    pub cwd: PathBuf,
    /// Environment overrides.
    pub env: HashMap<String, String>,
    /// Initial column count.
    pub cols: u16,
    /// Initial row count.
    pub rows: u16,
}

/// Platform default shell: `%COMSPEC%` / `cmd.exe` on Windows, `$SHELL` /
/// `/bin/bash` elsewhere.
#[must_use]
pub fn default_shell() -> String {
    if cfg!(windows) {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string())
    }
}

/// Fill every gap in a session request with platform defaults.
///
/// Working directory falls back to the home directory, then the process
/// cwd, then `/` if even that is unavailable.
#[must_use]
pub fn resolve_config(config: &SessionConfig) -> ResolvedConfig {
    let cwd = config
        .cwd
        .clone()
        .or_else(dirs::home_dir)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("/"));

    ResolvedConfig {
        shell: config.shell.clone().unwrap_or_else(default_shell),
        cwd,
        env: config.env.clone(),
        cols: config.cols.unwrap_or(DEFAULT_COLS),
        rows: config.rows.unwrap_or(DEFAULT_ROWS),
    }
}

/// Read access to the host's configuration store.
///
/// The host editor owns configuration; this trait is the narrow slice the
/// session layer needs, and what tests mock.
pub trait SettingsSource {
    /// Look up `key` in configuration `section`, as a string.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Look up `key` in configuration `section`, as a number.
    fn get_number(&self, section: &str, key: &str) -> Option<u16>;
}

/// Resolve display settings through the priority chain
/// `termdock.*` > `editor.*` > built-in defaults (`monospace`, 15).
#[must_use]
pub fn resolve_display_settings(source: &dyn SettingsSource) -> DisplaySettings {
    let font_family = source
        .get_string("termdock", "fontFamily")
        .or_else(|| source.get_string("editor", "fontFamily"))
        .unwrap_or_else(|| "monospace".to_string());
    let font_size = source
        .get_number("termdock", "fontSize")
        .or_else(|| source.get_number("editor", "fontSize"))
        .unwrap_or(15);

    DisplaySettings {
        font_family: Some(font_family),
        font_size: Some(font_size),
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
