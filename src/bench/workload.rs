//! Throughput workload generators.
//!
//! Each generator produces ~4 KiB chunks summing to the requested total.
//! Chunks are built from complete *units* (a run of plain characters, a
//! full SGR color code plus its literal text, or a full cursor-move plus
//! erase), so a chunk boundary can never split an escape sequence. The
//! write loop measures the engine, not the engine's escape-sequence
//! reassembly under torn input.

use rand::Rng;

/// Target chunk size.
pub const CHUNK_SIZE: usize = 4096;

/// Default workload total.
pub const DEFAULT_WORKLOAD_MIB: usize = 10;

/// A generated workload: chunks plus their exact byte total.
#[derive(Debug)]
pub struct Workload {
    /// Workload label for logs/reports.
    pub name: &'static str,
    /// The chunks, in write order.
    pub chunks: Vec<Vec<u8>>,
    /// Sum of all chunk lengths.
    pub total_bytes: usize,
}

const PLAIN_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789 ";

/// Random printable ASCII in exact [`CHUNK_SIZE`] chunks.
#[must_use]
pub fn plain_text(size_mib: usize) -> Workload {
    let target = size_mib * 1024 * 1024;
    let mut rng = rand::rng();
    let mut chunks = Vec::new();
    let mut total_bytes = 0;
    while total_bytes < target {
        let chunk: Vec<u8> = (0..CHUNK_SIZE)
            .map(|_| PLAIN_CHARS[rng.random_range(0..PLAIN_CHARS.len())])
            .collect();
        total_bytes += chunk.len();
        chunks.push(chunk);
    }
    Workload {
        name: "plain",
        chunks,
        total_bytes,
    }
}

/// SGR color codes cycled through the color-heavy workload. Each is
/// exactly 5 bytes (the last resets to the default foreground) so every
/// unit is the same size.
const SGR_COLORS: [&[u8; 5]; 7] = [
    b"\x1b[31m", // red
    b"\x1b[32m", // green
    b"\x1b[33m", // yellow
    b"\x1b[34m", // blue
    b"\x1b[35m", // magenta
    b"\x1b[36m", // cyan
    b"\x1b[39m", // default foreground
];

/// Color-change-heavy data: repeating 9-byte units of a 5-byte SGR code
/// followed by 4 literal characters.
#[must_use]
pub fn sgr_heavy(size_mib: usize) -> Workload {
    let target = size_mib * 1024 * 1024;
    const UNIT_SIZE: usize = 9; // color (5) + "Text" (4)
    const UNITS_PER_CHUNK: usize = CHUNK_SIZE / UNIT_SIZE;

    let mut chunks = Vec::new();
    let mut total_bytes = 0;
    while total_bytes < target {
        let mut chunk = Vec::with_capacity(UNITS_PER_CHUNK * UNIT_SIZE);
        for i in 0..UNITS_PER_CHUNK {
            chunk.extend_from_slice(SGR_COLORS[i % SGR_COLORS.len()].as_slice());
            chunk.extend_from_slice(b"Text");
        }
        total_bytes += chunk.len();
        chunks.push(chunk);
    }
    Workload {
        name: "sgr",
        chunks,
        total_bytes,
    }
}

/// Cursor-movement-heavy data: repeating units of absolute positioning,
/// one character, and erase-to-end-of-line.
#[must_use]
pub fn cursor_heavy(size_mib: usize) -> Workload {
    let target = size_mib * 1024 * 1024;
    const UNITS_PER_CHUNK: usize = 300; // ~12 bytes each, just under CHUNK_SIZE

    let mut chunks = Vec::new();
    let mut total_bytes = 0;
    while total_bytes < target {
        let mut chunk = Vec::with_capacity(UNITS_PER_CHUNK * 12);
        for i in 0..UNITS_PER_CHUNK {
            let row = (i % 20) + 1;
            let col = (i % 60) + 1;
            chunk.extend_from_slice(format!("\x1b[{row};{col}HX\x1b[K").as_bytes());
        }
        total_bytes += chunk.len();
        chunks.push(chunk);
    }
    Workload {
        name: "cursor",
        chunks,
        total_bytes,
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk a chunk unit-by-unit and confirm it parses completely: every
    /// escape sequence that starts inside the chunk terminates inside it.
    fn ends_on_unit_boundary(chunk: &[u8]) -> bool {
        let mut i = 0;
        while i < chunk.len() {
            if chunk[i] == 0x1b {
                // CSI ... final byte in @..~
                let Some(rest) = chunk.get(i + 1..) else {
                    return false;
                };
                if rest.first() != Some(&b'[') {
                    return false;
                }
                let mut j = i + 2;
                loop {
                    match chunk.get(j) {
                        None => return false,
                        Some(b) if (0x40..=0x7e).contains(b) => break,
                        Some(_) => j += 1,
                    }
                }
                i = j + 1;
            } else {
                i += 1;
            }
        }
        true
    }

    #[test]
    fn test_plain_text_size_and_shape() {
        let workload = plain_text(1);
        assert!(workload.total_bytes >= 1024 * 1024);
        assert_eq!(
            workload.total_bytes,
            workload.chunks.iter().map(Vec::len).sum::<usize>()
        );
        for chunk in &workload.chunks {
            assert_eq!(chunk.len(), CHUNK_SIZE);
            assert!(chunk.iter().all(|b| *b != 0x1b), "plain text has no escapes");
            assert!(chunk.iter().all(u8::is_ascii));
        }
    }

    #[test]
    fn test_sgr_chunks_never_split_sequences() {
        let workload = sgr_heavy(1);
        assert!(workload.total_bytes >= 1024 * 1024);
        for chunk in &workload.chunks {
            assert_eq!(chunk.len() % 9, 0, "whole 9-byte units only");
            assert!(chunk.ends_with(b"Text"), "chunk ends on a unit boundary");
            assert!(ends_on_unit_boundary(chunk));
        }
    }

    #[test]
    fn test_cursor_chunks_never_split_sequences() {
        let workload = cursor_heavy(1);
        assert!(workload.total_bytes >= 1024 * 1024);
        for chunk in &workload.chunks {
            assert_eq!(chunk.first(), Some(&0x1b), "unit starts the chunk");
            assert!(chunk.ends_with(b"\x1b[K"), "erase closes the last unit");
            assert!(ends_on_unit_boundary(chunk));
        }
    }

    #[test]
    fn test_chunk_boundaries_across_concatenation() {
        // Boundary positions within the concatenated stream must never
        // land inside a known-length control sequence.
        for workload in [sgr_heavy(1), cursor_heavy(1)] {
            for chunk in &workload.chunks {
                assert!(
                    ends_on_unit_boundary(chunk),
                    "{} chunk tore an escape sequence",
                    workload.name
                );
            }
        }
    }
}
