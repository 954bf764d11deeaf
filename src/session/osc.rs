//! OSC 7 working-directory scraping.
//!
//! Shells configured for it report their current working directory by
//! emitting `ESC ] 7 ; file://host/path` terminated by BEL or ST. The
//! session manager scans every output chunk with [`scan_cwd`] and records
//! the result; this module is the entire pattern, kept apart from the
//! forwarding path so it can be tested on raw byte strings.

use percent_encoding::percent_decode_str;
use url::Url;

const OSC7_PREFIX: &[u8] = b"\x1b]7;";
const BEL: u8 = 0x07;

/// Extract the working directory from the *last* OSC 7 sequence in a
/// chunk, or `None` if the chunk carries no complete, well-formed report.
///
/// A sequence split across chunks is not reassembled; shells emit the
/// report atomically per prompt, so a torn sequence is simply skipped and
/// the next prompt repairs the tracked value.
#[must_use]
pub fn scan_cwd(chunk: &[u8]) -> Option<String> {
    let mut result = None;
    let mut i = 0;
    while i + OSC7_PREFIX.len() <= chunk.len() {
        if !chunk[i..].starts_with(OSC7_PREFIX) {
            i += 1;
            continue;
        }
        let body_start = i + OSC7_PREFIX.len();
        let Some((body_end, seq_end)) = find_terminator(chunk, body_start) else {
            // Unterminated sequence at the tail of the chunk
            break;
        };
        if let Ok(body) = std::str::from_utf8(&chunk[body_start..body_end]) {
            if let Some(path) = parse_file_url(body) {
                result = Some(path);
            }
        }
        i = seq_end;
    }
    result
}

/// Find the end of an OSC body starting at `from`: BEL or ST (`ESC \`).
/// Returns `(body_end, index_after_terminator)`.
fn find_terminator(chunk: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < chunk.len() {
        match chunk[i] {
            BEL => return Some((i, i + 1)),
            0x1b if chunk.get(i + 1) == Some(&b'\\') => return Some((i, i + 2)),
            _ => i += 1,
        }
    }
    None
}

/// Decode a `file://host/path` URL body into a plain path.
fn parse_file_url(body: &str) -> Option<String> {
    let url = Url::parse(body).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    let decoded = percent_decode_str(url.path()).decode_utf8().ok()?;
    // file://host/C:/dir arrives with a leading slash before the drive
    let path = decoded
        .strip_prefix('/')
        .filter(|rest| {
            let mut chars = rest.chars();
            matches!((chars.next(), chars.next()), (Some(c), Some(':')) if c.is_ascii_alphabetic())
        })
        .unwrap_or(&decoded);
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

// ─── Tests ─────────────────────────────────────────────────────────────────
