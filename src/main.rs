//! termdock CLI - probe, benchmark, and drive embedded terminal
//! sessions from a real terminal. See the `termdock` library for the
//! core functionality.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use termdock::bench::{run_throughput, ProcStatusProbe};
use termdock::demo::{MatrixConfig, MatrixRain};
use termdock::host::{FsWorkspace, LogNotifier, Surface, SurfaceFactory};
use termdock::probe::{run_all, LoopbackTransport};
use termdock::protocol::{HostMessage, SessionId, SurfaceMessage};
use termdock::{
    DisplaySettings, SessionConfig, SessionEvent, SessionManager, Vt100Engine,
};

/// mimalloc outperforms the system allocator under the bursty
/// allocation profile of PTY chunk routing.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "termdock", version, about = "Embedded terminal sessions and engine probes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every engine probe and print the JSON report.
    Probe {
        /// Workload size for the throughput probe, MiB.
        #[arg(long, default_value_t = 10)]
        size_mib: usize,
    },
    /// Run only the throughput benchmark.
    Bench {
        /// Workload size, MiB.
        #[arg(long, default_value_t = 10)]
        size_mib: usize,
    },
    /// Run the matrix-rain demo through the engine and report metrics.
    Matrix {
        /// Number of frames to render.
        #[arg(long, default_value_t = 600)]
        frames: u64,
        /// Speed scale, 1-10.
        #[arg(long, default_value_t = 5)]
        speed: u8,
        /// Fraction of columns active, 0.0-1.0.
        #[arg(long, default_value_t = 0.4)]
        density: f64,
    },
    /// Open an interactive session piped through the session manager.
    Run {
        /// Shell to spawn (defaults to the platform shell).
        #[arg(long)]
        shell: Option<String>,
        /// Working directory (defaults to the home directory).
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Probe { size_mib } => cmd_probe(size_mib),
        Command::Bench { size_mib } => cmd_bench(size_mib),
        Command::Matrix {
            frames,
            speed,
            density,
        } => cmd_matrix(frames, speed, density),
        Command::Run { shell, cwd } => cmd_run(shell, cwd),
    }
}

fn cmd_probe(size_mib: usize) -> Result<()> {
    let mut engine = Vt100Engine::new(80, 24);
    let mut transport = LoopbackTransport;
    let report = run_all(&mut engine, &mut transport, &ProcStatusProbe, size_mib);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_bench(size_mib: usize) -> Result<()> {
    let mut engine = Vt100Engine::new(80, 24);
    let report = run_throughput(&mut engine, &ProcStatusProbe, size_mib);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.passes_threshold {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_matrix(frames: u64, speed: u8, density: f64) -> Result<()> {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
    let mut engine = Vt100Engine::new(cols, rows);
    let mut rain = MatrixRain::new(MatrixConfig { speed, density });
    rain.start(&mut engine);

    let mut last = Instant::now();
    for _ in 0..frames {
        std::thread::sleep(Duration::from_millis(16));
        let now = Instant::now();
        rain.frame(&mut engine, now.duration_since(last).as_secs_f64());
        last = now;
    }
    rain.stop(&mut engine);

    println!("{}", serde_json::to_string_pretty(&rain.metrics())?);
    Ok(())
}

// ─── Interactive run ───────────────────────────────────────────────────────

/// Surface that renders to the invoking terminal: data goes straight to
/// stdout, everything else is host-side bookkeeping the CLI ignores.
#[derive(Debug, Default)]
struct StdioSurface;

impl Surface for StdioSurface {
    fn post(&self, message: &HostMessage) {
        match message {
            HostMessage::Data { data, .. } => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(data.as_bytes());
                let _ = out.flush();
            }
            HostMessage::Exit { exit_code, .. } => {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "\r\n\x1b[90m[Process exited with code {exit_code}]\x1b[0m\r\n");
                let _ = out.flush();
            }
            _ => {}
        }
    }

    fn dispose(&self) {}
}

#[derive(Debug, Default)]
struct StdioSurfaceFactory;

impl SurfaceFactory for StdioSurfaceFactory {
    fn create(&mut self, _id: SessionId) -> Result<Box<dyn Surface>> {
        Ok(Box::new(StdioSurface))
    }
}

fn cmd_run(shell: Option<String>, cwd: Option<PathBuf>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        crossterm::terminal::enable_raw_mode().context("failed to enter raw mode")?;
        scopeguard::defer! {
            let _ = crossterm::terminal::disable_raw_mode();
        }

        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut manager = SessionManager::new(
            Box::new(StdioSurfaceFactory),
            Box::new(LogNotifier),
            Box::new(FsWorkspace::default()),
            DisplaySettings::default(),
            events_tx.clone(),
        );
        manager.set_exit_when_idle(true);

        let config = SessionConfig {
            shell,
            cwd,
            ..SessionConfig::default()
        };
        let Some(id) = manager.create_session(&config) else {
            anyhow::bail!("failed to create terminal session");
        };

        // The invoking terminal is the surface: report its measured size
        // as the readiness handshake.
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let _ = events_tx.send(SessionEvent::Surface(SurfaceMessage::Ready {
            session_id: id,
            cols,
            rows,
        }));

        // Forward stdin keystrokes verbatim.
        let input_tx = events_tx.clone();
        std::thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let data = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if input_tx
                            .send(SessionEvent::Surface(SurfaceMessage::Input {
                                session_id: id,
                                data,
                            }))
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        manager.run(events_rx).await;
        manager.dispose();
        Ok(())
    })
}
