//! Host-environment boundary.
//!
//! The editor UI, its notification popups, its configuration store, and
//! the surface panels it creates are external collaborators. These traits
//! are the entire contract the session layer has with them; tests use
//! recording fakes, the CLI uses the std-backed implementations below.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::{HostMessage, SessionId, SurfaceMessage};

/// User-facing notifications (error popups and the like).
pub trait HostNotifier: Send {
    /// Show an error notification.
    fn error(&self, message: &str);
}

/// Host-side workspace operations: file stats, opening files and URLs.
pub trait Workspace: Send {
    /// True if `path` exists on disk.
    fn file_exists(&self, path: &str) -> bool;
    /// Open a file in the host editor, optionally at a line/column.
    fn open_file(&self, path: &str, line: Option<u32>, column: Option<u32>);
    /// Open a URL in the external handler. Callers are responsible for
    /// scheme validation before this point.
    fn open_external(&self, url: &str);
    /// Root folder of the current workspace, if any.
    fn workspace_root(&self) -> Option<PathBuf>;
}

/// One session's UI surface, owned exclusively by its session entry.
pub trait Surface: Send {
    /// Deliver a message to the surface. Fire-and-forget; a surface that
    /// has gone away swallows the message.
    fn post(&self, message: &HostMessage);
    /// Tear the surface down. The surface's own close event may fire
    /// afterwards; session teardown tolerates that.
    fn dispose(&self);
}

/// Creates one surface per session.
pub trait SurfaceFactory: Send {
    /// Create the surface for `id`. Surface-originated events (messages,
    /// close) are expected to be routed back into the session manager's
    /// event channel by the host wiring.
    fn create(&mut self, id: SessionId) -> Result<Box<dyn Surface>>;
}

/// Surface-local persisted state, best-effort across surface recreation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Last known working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_cwd: Option<String>,
    /// Most recent buffered lines, capped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scrollback_content: Vec<String>,
}

/// Storage slot for [`PersistedState`] (the surface host's state bag).
pub trait SurfaceStore {
    /// Load the persisted state, if any.
    fn load(&self) -> Option<PersistedState>;
    /// Replace the persisted state.
    fn save(&mut self, state: &PersistedState);
}

/// The surface controller's channel back to the session host.
pub trait HostLink {
    /// Post a message to the host. Fire-and-forget.
    fn post(&self, message: SurfaceMessage);
}

/// Resolve the working directory for an "open terminal here" command.
///
/// A directory is used as-is; a file resolves to its parent; a missing
/// path (or no location at all) falls back to the workspace root, leaving
/// the final home-directory fallback to spawn-time config resolution.
#[must_use]
pub fn resolve_command_cwd(
    location: Option<&Path>,
    workspace: &dyn Workspace,
) -> Option<PathBuf> {
    let Some(path) = location else {
        return workspace.workspace_root();
    };
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Some(path.to_path_buf()),
        Ok(_) => path.parent().map(Path::to_path_buf),
        Err(_) => workspace.workspace_root(),
    }
}

// ─── Std-backed implementations ────────────────────────────────────────────

/// Notifier that routes errors to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl HostNotifier for LogNotifier {
    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// Workspace backed by the local filesystem; open requests are logged
/// because the CLI has no editor to hand them to.
#[derive(Debug, Default)]
pub struct FsWorkspace {
    /// Optional workspace root for cwd fallbacks.
    pub root: Option<PathBuf>,
}

impl Workspace for FsWorkspace {
    fn file_exists(&self, path: &str) -> bool {
        std::fs::metadata(path).is_ok()
    }

    fn open_file(&self, path: &str, line: Option<u32>, column: Option<u32>) {
        log::info!(
            "open-file request: {path}:{}:{}",
            line.unwrap_or(1),
            column.unwrap_or(1)
        );
    }

    fn open_external(&self, url: &str) {
        log::info!("open-url request: {url}");
    }

    fn workspace_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

/// In-memory [`SurfaceStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Option<PersistedState>,
}

impl SurfaceStore for MemoryStore {
    fn load(&self) -> Option<PersistedState> {
        self.state.clone()
    }

    fn save(&mut self, state: &PersistedState) {
        self.state = Some(state.clone());
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_command_cwd_directory_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace { root: None };
        let resolved = resolve_command_cwd(Some(dir.path()), &ws);
        assert_eq!(resolved.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_resolve_command_cwd_file_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "x").unwrap();
        let ws = FsWorkspace { root: None };
        let resolved = resolve_command_cwd(Some(&file), &ws);
        assert_eq!(resolved.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_resolve_command_cwd_missing_path_falls_back_to_root() {
        let ws = FsWorkspace {
            root: Some(PathBuf::from("/workspace")),
        };
        let resolved = resolve_command_cwd(Some(Path::new("/no/such/entry")), &ws);
        assert_eq!(resolved, Some(PathBuf::from("/workspace")));
    }

    #[test]
    fn test_resolve_command_cwd_no_location_uses_root() {
        let ws = FsWorkspace {
            root: Some(PathBuf::from("/workspace")),
        };
        assert_eq!(
            resolve_command_cwd(None, &ws),
            Some(PathBuf::from("/workspace"))
        );
        let bare = FsWorkspace { root: None };
        assert_eq!(resolve_command_cwd(None, &bare), None);
    }

    #[test]
    fn test_persisted_state_round_trips_through_json() {
        let state = PersistedState {
            current_cwd: Some("/repo".into()),
            scrollback_content: vec!["$ ls".into(), "src".into()],
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: PersistedState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::default();
        assert!(store.load().is_none());
        let state = PersistedState {
            current_cwd: Some("/x".into()),
            scrollback_content: vec![],
        };
        store.save(&state);
        assert_eq!(store.load(), Some(state));
    }
}
