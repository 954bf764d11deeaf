//! Pseudo-terminal process management.
//!
//! [`PtyService`] owns every live PTY, keyed by session id, and is the only
//! component that touches native process handles. Each spawn starts a
//! dedicated reader thread that translates the process byte stream into
//! the caller's [`PtyHandlers`] callbacks:
//!
//! ```text
//! PtyService::spawn ──► portable-pty ──► child process
//!        │                   │
//!        │             reader thread ──► on_data(chunk)
//!        │                   └─────────► on_exit(code) / on_error(msg)
//!        └── write / resize / kill by session id
//! ```
//!
//! Spawn failures come back synchronously as `Err`; nothing crosses this
//! boundary as a panic. Runtime failures are reported through `on_error`
//! exactly once, after the wrapper has already killed the process, so the
//! error handler may assume the process is gone.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use crate::config::ResolvedConfig;
use crate::protocol::SessionId;

/// Callbacks a PTY session reports through.
///
/// All three are invoked from the session's reader thread; implementors
/// typically forward into an event channel.
pub struct PtyHandlers {
    /// Output bytes arrived (lossily decoded, like the embedded engine's
    /// string-based data events).
    pub on_data: Box<dyn Fn(String) + Send + Sync>,
    /// The process terminated with the given exit code.
    pub on_exit: Box<dyn Fn(i32) + Send + Sync>,
    /// The process failed at runtime. The process has already been killed
    /// when this fires.
    pub on_error: Box<dyn Fn(String) + Send + Sync>,
}

impl std::fmt::Debug for PtyHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandlers").finish_non_exhaustive()
    }
}

struct PtyInstance {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
}

impl std::fmt::Debug for PtyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyInstance").finish_non_exhaustive()
    }
}

/// Owns every live PTY process, addressed only by session id.
#[derive(Debug, Default)]
pub struct PtyService {
    instances: HashMap<SessionId, PtyInstance>,
}

impl PtyService {
    /// Create an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live PTY instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if no PTY instances are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Spawn a shell for `id` and start its reader thread.
    ///
    /// # Errors
    ///
    /// Returns an error (and registers nothing) if the PTY cannot be
    /// opened or the shell cannot be spawned.
    pub fn spawn(
        &mut self,
        id: SessionId,
        config: &ResolvedConfig,
        handlers: PtyHandlers,
    ) -> Result<()> {
        let pty_system = native_pty_system();
        let size = PtySize {
            rows: config.rows,
            cols: config.cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        let pair = pty_system.openpty(size).context("failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&config.shell);
        cmd.cwd(&config.cwd);
        if !config.env.contains_key("TERM") {
            cmd.env("TERM", "xterm-256color");
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("failed to spawn shell '{}'", config.shell))?;
        // The slave end lives on inside the child; drop our copy so the
        // master sees EOF when the process exits.
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .context("failed to open PTY writer")?;
        let reader = pair
            .master
            .try_clone_reader()
            .context("failed to open PTY reader")?;

        let child = Arc::new(Mutex::new(child));
        spawn_reader_thread(id, reader, Arc::clone(&child), handlers);

        self.instances.insert(
            id,
            PtyInstance {
                master: pair.master,
                writer,
                child,
            },
        );
        log::info!("spawned PTY for {id} ({})", config.shell);
        Ok(())
    }

    /// Forward input to the process. No-op for unknown ids.
    pub fn write(&mut self, id: SessionId, data: &str) {
        if let Some(instance) = self.instances.get_mut(&id) {
            if let Err(e) = instance
                .writer
                .write_all(data.as_bytes())
                .and_then(|()| instance.writer.flush())
            {
                log::warn!("PTY write failed for {id}: {e}");
            }
        }
    }

    /// Request a size change from the OS PTY. No-op for unknown ids.
    pub fn resize(&mut self, id: SessionId, cols: u16, rows: u16) {
        if let Some(instance) = self.instances.get(&id) {
            let size = PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            };
            if let Err(e) = instance.master.resize(size) {
                log::warn!("PTY resize failed for {id}: {e}");
            }
        }
    }

    /// Terminate the process and drop the instance. Idempotent: calling
    /// this for an unknown or already-dead id is a no-op.
    pub fn kill(&mut self, id: SessionId) {
        if let Some(instance) = self.instances.remove(&id) {
            if let Ok(mut child) = instance.child.lock() {
                // Reaping is left to the reader thread, which unblocks once
                // the process dies.
                let _ = child.kill();
            }
            log::info!("killed PTY for {id}");
        }
    }

    /// Kill every live instance. Called once at host teardown.
    pub fn dispose(&mut self) {
        let ids: Vec<SessionId> = self.instances.keys().copied().collect();
        for id in ids {
            self.kill(id);
        }
        self.instances.clear();
    }
}

/// Read PTY output until the process goes away, classifying the ending.
///
/// A read error does not necessarily mean failure: on Linux the master
/// side reports `EIO` once the process exits, which is the normal end of
/// a session. The thread therefore tries to reap an exit status first and
/// only reports `on_error` when the process is genuinely still alive.
fn spawn_reader_thread(
    id: SessionId,
    mut reader: Box<dyn Read + Send>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    handlers: PtyHandlers,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        log::debug!("PTY reader thread started for {id}");
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    let code = wait_for_exit(&child);
                    (handlers.on_exit)(code.unwrap_or(-1));
                    break;
                }
                Ok(n) => {
                    (handlers.on_data)(String::from_utf8_lossy(&buf[..n]).into_owned());
                }
                Err(e) => {
                    if let Some(code) = try_reap(&child) {
                        (handlers.on_exit)(code);
                    } else {
                        // Process still alive after a read failure: kill it
                        // before reporting, per the wrapper contract.
                        if let Ok(mut guard) = child.lock() {
                            let _ = guard.kill();
                            let _ = guard.wait();
                        }
                        (handlers.on_error)(format!("PTY read error: {e}"));
                    }
                    break;
                }
            }
        }
        log::debug!("PTY reader thread exiting for {id}");
    })
}

/// Block until the child's exit status is available.
fn wait_for_exit(child: &Arc<Mutex<Box<dyn Child + Send + Sync>>>) -> Option<i32> {
    let mut guard = child.lock().ok()?;
    guard.wait().ok().map(|status| status.exit_code() as i32)
}

/// Poll briefly for an exit status without committing to a blocking wait.
fn try_reap(child: &Arc<Mutex<Box<dyn Child + Send + Sync>>>) -> Option<i32> {
    for _ in 0..10 {
        {
            let mut guard = child.lock().ok()?;
            if let Ok(Some(status)) = guard.try_wait() {
                return Some(status.exit_code() as i32);
            }
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::mpsc;

    fn test_config(shell: &str) -> ResolvedConfig {
        ResolvedConfig {
            shell: shell.to_string(),
            cwd: std::env::temp_dir(),
            env: HashMap::new(),
            cols: 80,
            rows: 24,
        }
    }

    fn channel_handlers() -> (PtyHandlers, mpsc::Receiver<PtyTestEvent>) {
        let (tx, rx) = mpsc::channel();
        let data_tx = tx.clone();
        let exit_tx = tx.clone();
        let handlers = PtyHandlers {
            on_data: Box::new(move |d| {
                let _ = data_tx.send(PtyTestEvent::Data(d));
            }),
            on_exit: Box::new(move |c| {
                let _ = exit_tx.send(PtyTestEvent::Exit(c));
            }),
            on_error: Box::new(move |e| {
                let _ = tx.send(PtyTestEvent::Error(e));
            }),
        };
        (handlers, rx)
    }

    #[derive(Debug)]
    enum PtyTestEvent {
        Data(String),
        Exit(i32),
        Error(String),
    }

    #[test]
    fn test_unknown_id_operations_are_noops() {
        let mut service = PtyService::new();
        let id = SessionId(99);
        service.write(id, "ignored");
        service.resize(id, 100, 30);
        service.kill(id);
        service.kill(id);
        assert!(service.is_empty());
    }

    #[test]
    fn test_spawn_invalid_shell_reports_error_and_registers_nothing() {
        let mut service = PtyService::new();
        let config = test_config("/definitely/not/a/shell");
        let (handlers, _rx) = channel_handlers();
        let result = service.spawn(SessionId(1), &config, handlers);
        assert!(result.is_err());
        assert!(service.is_empty());
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("/definitely/not/a/shell"));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_echo_emits_data_then_exit() {
        let mut service = PtyService::new();
        let mut config = test_config("/bin/sh");
        config.env.insert("PS1".into(), "$ ".into());
        let (handlers, rx) = channel_handlers();
        service
            .spawn(SessionId(1), &config, handlers)
            .expect("spawn /bin/sh");
        assert_eq!(service.len(), 1);

        service.write(SessionId(1), "echo pty-round-trip\n");
        service.write(SessionId(1), "exit 3\n");

        let mut saw_output = false;
        let mut exit_code = None;
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_secs(10)) {
                Ok(PtyTestEvent::Data(d)) => {
                    if d.contains("pty-round-trip") {
                        saw_output = true;
                    }
                }
                Ok(PtyTestEvent::Exit(code)) => {
                    exit_code = Some(code);
                    break;
                }
                Ok(PtyTestEvent::Error(e)) => panic!("unexpected PTY error: {e}"),
                Err(_) => break,
            }
        }
        assert!(saw_output, "shell output should round-trip");
        assert_eq!(exit_code, Some(3));

        // The instance is still registered until the owner kills it
        service.kill(SessionId(1));
        assert!(service.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_kill_terminates_live_process() {
        let mut service = PtyService::new();
        let config = test_config("/bin/cat");
        let (handlers, rx) = channel_handlers();
        service
            .spawn(SessionId(2), &config, handlers)
            .expect("spawn /bin/cat");

        service.kill(SessionId(2));
        assert!(service.is_empty());

        // The reader thread notices the death and reports an exit; the
        // owner has already dropped the session so the event is moot, but
        // it must not be an error.
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_secs(10)) {
                Ok(PtyTestEvent::Exit(_)) => return,
                Ok(PtyTestEvent::Data(_)) => continue,
                Ok(PtyTestEvent::Error(e)) => panic!("kill produced error: {e}"),
                Err(_) => break,
            }
        }
        panic!("expected an exit event after kill");
    }

    #[test]
    fn test_dispose_on_empty_service_is_safe() {
        let mut service = PtyService::new();
        service.dispose();
        assert!(service.is_empty());
    }
}
