//! Matrix-rain demo.
//!
//! Falling-character animation used to showcase sustained write
//! throughput: every frame funnels cursor-addressed, color-heavy output
//! through the same engine write path the benchmark measures. Frame
//! pacing is caller-driven: [`MatrixRain::frame`] takes the elapsed
//! seconds, so the animation is testable without a clock.

use rand::Rng;

use crate::engine::TerminalEngine;

/// Katakana plus digits and symbols for the classic look.
const MATRIX_CHARS: &str =
    "ｱｲｳｴｵｶｷｸｹｺｻｼｽｾｿﾀﾁﾂﾃﾄﾅﾆﾇﾈﾉﾊﾋﾌﾍﾎﾏﾐﾑﾒﾓﾔﾕﾖﾗﾘﾙﾚﾛﾜﾝ0123456789$#@&%";

/// Bright green for the head of a trail (256-color index).
const GREEN_BRIGHT: u8 = 46;
/// Progressively dimmer greens for the trail.
const GREEN_SHADES: [u8; 4] = [40, 34, 28, 22];

/// Animation tuning.
#[derive(Debug, Clone, Copy)]
pub struct MatrixConfig {
    /// Speed scale, 1–10.
    pub speed: u8,
    /// Fraction of columns active at start, 0.0–1.0.
    pub density: f64,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            speed: 5,
            density: 0.4,
        }
    }
}

/// Rolling animation metrics over one-second windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixMetrics {
    /// Write throughput, MiB/s.
    pub mib_per_sec: f64,
    /// Frames per second.
    pub fps: f64,
    /// Characters written per second.
    pub chars_per_sec: f64,
    /// Total frames rendered since start.
    pub frames_rendered: u64,
}

struct MatrixColumn {
    x: u16,
    y: f64,
    speed: f64,
    length: usize,
    chars: Vec<char>,
    active: bool,
}

/// The animation engine.
pub struct MatrixRain {
    columns: Vec<MatrixColumn>,
    config: MatrixConfig,
    running: bool,
    bytes_written: u64,
    frames_rendered: u64,
    window_seconds: f64,
    window_bytes: u64,
    window_frames: u64,
    metrics: MatrixMetrics,
}

impl std::fmt::Debug for MatrixRain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixRain")
            .field("columns", &self.columns.len())
            .field("running", &self.running)
            .field("frames_rendered", &self.frames_rendered)
            .finish_non_exhaustive()
    }
}

impl MatrixRain {
    /// Create a stopped animation.
    #[must_use]
    pub fn new(config: MatrixConfig) -> Self {
        Self {
            columns: Vec::new(),
            config: MatrixConfig {
                speed: config.speed.clamp(1, 10),
                density: config.density.clamp(0.0, 1.0),
            },
            running: false,
            bytes_written: 0,
            frames_rendered: 0,
            window_seconds: 0.0,
            window_bytes: 0,
            window_frames: 0,
            metrics: MatrixMetrics::default(),
        }
    }

    /// Whether the animation is running.
    #[must_use]
    pub fn running(&self) -> bool {
        self.running
    }

    /// Current rolling metrics.
    #[must_use]
    pub fn metrics(&self) -> MatrixMetrics {
        MatrixMetrics {
            frames_rendered: self.frames_rendered,
            ..self.metrics
        }
    }

    /// Rows per second at the configured speed scale.
    fn base_speed(&self) -> f64 {
        5.0 + f64::from(self.config.speed - 1) * 10.5
    }

    fn random_char(rng: &mut impl Rng) -> char {
        let chars: Vec<char> = MATRIX_CHARS.chars().collect();
        chars[rng.random_range(0..chars.len())]
    }

    fn make_column(&self, x: u16, rows: u16, rng: &mut impl Rng) -> MatrixColumn {
        let active = rng.random_range(0.0..1.0) < self.config.density;
        let length = rng.random_range(5..20);
        MatrixColumn {
            x,
            y: if active {
                -rng.random_range(0.0..f64::from(rows))
            } else {
                -999.0
            },
            speed: self.base_speed() * (0.5 + rng.random_range(0.0..1.0)),
            length,
            chars: (0..length).map(|_| Self::random_char(rng)).collect(),
            active,
        }
    }

    /// Start the animation: clear the screen, hide the cursor, seed the
    /// columns from the engine's current width.
    pub fn start(&mut self, engine: &mut dyn TerminalEngine) {
        if self.running {
            return;
        }
        self.running = true;
        self.bytes_written = 0;
        self.frames_rendered = 0;
        self.window_seconds = 0.0;
        self.window_bytes = 0;
        self.window_frames = 0;
        self.metrics = MatrixMetrics::default();

        engine.write(b"\x1b[2J\x1b[H\x1b[?25l");

        let mut rng = rand::rng();
        let rows = engine.rows();
        self.columns = (0..engine.cols())
            .map(|x| self.make_column(x, rows, &mut rng))
            .collect();
    }

    /// Stop the animation and restore the cursor.
    pub fn stop(&mut self, engine: &mut dyn TerminalEngine) {
        if !self.running {
            return;
        }
        self.running = false;
        engine.write(b"\x1b[?25h\x1b[0m");
    }

    /// Render one frame after `delta_seconds` of animation time.
    pub fn frame(&mut self, engine: &mut dyn TerminalEngine, delta_seconds: f64) {
        if !self.running {
            return;
        }
        let rows = i64::from(engine.rows());
        let mut rng = rand::rng();
        let mut output = String::new();
        let base_speed = self.base_speed();

        for col in &mut self.columns {
            if !col.active {
                if rng.random_range(0.0..1.0) < 0.02 {
                    col.active = true;
                    col.y = 0.0;
                    col.speed = base_speed * (0.5 + rng.random_range(0.0..1.0));
                    for c in &mut col.chars {
                        *c = Self::random_char(&mut rng);
                    }
                }
                continue;
            }

            col.y += col.speed * delta_seconds;

            // Mutate the head character now and then
            if rng.random_range(0.0..1.0) < 0.3 {
                if let Some(head) = col.chars.first_mut() {
                    *head = Self::random_char(&mut rng);
                }
            }

            let head_row = col.y.floor() as i64;
            for (i, ch) in col.chars.iter().enumerate() {
                let row = head_row - i as i64;
                if row < 0 || row >= rows {
                    continue;
                }
                output.push_str(&format!("\x1b[{};{}H", row + 1, col.x + 1));
                if i == 0 {
                    output.push_str(&format!("\x1b[38;5;{GREEN_BRIGHT}m"));
                } else {
                    let shade = GREEN_SHADES[(i - 1).min(GREEN_SHADES.len() - 1)];
                    output.push_str(&format!("\x1b[38;5;{shade}m"));
                }
                output.push(*ch);
            }

            // Erase one row above the tail
            let tail_row = head_row - col.chars.len() as i64;
            if tail_row >= 0 && tail_row < rows {
                output.push_str(&format!("\x1b[{};{}H ", tail_row + 1, col.x + 1));
            }

            // Recycle columns that fell off the bottom
            if head_row - col.length as i64 > rows {
                col.active = false;
                col.y = -999.0;
            }
        }

        if !output.is_empty() {
            engine.write(output.as_bytes());
            self.bytes_written += output.len() as u64;
            self.window_bytes += output.len() as u64;
        }
        self.frames_rendered += 1;
        self.window_frames += 1;
        self.window_seconds += delta_seconds;

        if self.window_seconds >= 1.0 {
            self.metrics = MatrixMetrics {
                mib_per_sec: self.window_bytes as f64 / (1024.0 * 1024.0) / self.window_seconds,
                fps: self.window_frames as f64 / self.window_seconds,
                chars_per_sec: self.window_bytes as f64 / self.window_seconds,
                frames_rendered: self.frames_rendered,
            };
            self.window_seconds = 0.0;
            self.window_bytes = 0;
            self.window_frames = 0;
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Vt100Engine;

    #[test]
    fn test_start_seeds_one_column_per_grid_column() {
        let mut engine = Vt100Engine::new(40, 12);
        let mut rain = MatrixRain::new(MatrixConfig::default());
        rain.start(&mut engine);
        assert!(rain.running());
        assert_eq!(rain.columns.len(), 40);
    }

    #[test]
    fn test_frames_advance_and_write_output() {
        let mut engine = Vt100Engine::new(40, 12);
        let mut rain = MatrixRain::new(MatrixConfig {
            speed: 8,
            density: 1.0,
        });
        rain.start(&mut engine);
        for _ in 0..30 {
            rain.frame(&mut engine, 1.0 / 60.0);
        }
        let metrics = rain.metrics();
        assert_eq!(metrics.frames_rendered, 30);
        assert!(rain.bytes_written > 0, "full density must draw something");
    }

    #[test]
    fn test_metrics_window_rolls_over_after_a_second() {
        let mut engine = Vt100Engine::new(20, 8);
        let mut rain = MatrixRain::new(MatrixConfig {
            speed: 5,
            density: 1.0,
        });
        rain.start(&mut engine);
        for _ in 0..11 {
            rain.frame(&mut engine, 0.1);
        }
        let metrics = rain.metrics();
        assert!(metrics.fps > 0.0);
        assert!(metrics.mib_per_sec >= 0.0);
    }

    #[test]
    fn test_stop_is_idempotent_and_halts_frames() {
        let mut engine = Vt100Engine::new(20, 8);
        let mut rain = MatrixRain::new(MatrixConfig::default());
        rain.start(&mut engine);
        rain.stop(&mut engine);
        rain.stop(&mut engine);
        assert!(!rain.running());
        let before = rain.frames_rendered;
        rain.frame(&mut engine, 0.1);
        assert_eq!(rain.frames_rendered, before);
    }

    #[test]
    fn test_config_is_clamped() {
        let rain = MatrixRain::new(MatrixConfig {
            speed: 200,
            density: 7.0,
        });
        assert_eq!(rain.config.speed, 10);
        assert!((rain.config.density - 1.0).abs() < f64::EPSILON);
    }
}
