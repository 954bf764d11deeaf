//! File-path link detection and validation.
//!
//! Rendered lines are scanned for path tokens (with optional `:line:col`
//! or `(line,col)` suffixes). A token becomes a clickable link only after
//! the host confirms the file exists; that confirmation is an async round
//! trip correlated by request id, memoized in the TTL cache, and timed
//! out to "does not exist" so a silent host only ever suppresses a link.
//!
//! Activation is gated on a modifier click (ctrl/cmd), matching
//! conventional terminal behavior: plain clicks never navigate.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::cache::TtlCache;
use crate::paths::resolve_path;
use crate::protocol::{SessionId, SurfaceMessage};

/// How long a file-existence round trip may stay unanswered before it
/// resolves to "does not exist".
pub const FILE_CHECK_TIMEOUT: Duration = Duration::from_millis(2000);

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"((?:[a-zA-Z]:)?(?:\.{0,2}[\\/])?[\w.\\/-]+\.[A-Za-z0-9]+)(?:[:(](\d+)(?:[,:](\d+))?[\])]?)?",
        )
        .expect("path pattern is valid")
    })
}

/// A path token found in a rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The captured path token, before resolution.
    pub path: String,
    /// Line number from a `:line` / `(line` suffix.
    pub line: Option<u32>,
    /// Column number from a `:col` / `,col` suffix.
    pub column: Option<u32>,
    /// Byte span of the whole match within the scanned line.
    pub start: usize,
    /// Exclusive end of the span.
    pub end: usize,
}

/// Scan one rendered line for path tokens.
#[must_use]
pub fn scan_line(line: &str) -> Vec<PathMatch> {
    path_pattern()
        .captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.get(1)?.as_str();
            Some(PathMatch {
                path: path.to_string(),
                line: caps.get(2).and_then(|m| m.as_str().parse().ok()),
                column: caps.get(3).and_then(|m| m.as_str().parse().ok()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Match a clicked token in full. Unlike [`scan_line`] this anchors both
/// ends, so trailing garbage disqualifies the token.
#[must_use]
pub fn match_path_token(token: &str) -> Option<PathMatch> {
    let caps = path_pattern().captures(token)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != token.len() {
        return None;
    }
    Some(PathMatch {
        path: caps.get(1)?.as_str().to_string(),
        line: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        column: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        start: 0,
        end: token.len(),
    })
}

/// Outcome of asking the detector about a path.
#[derive(Debug, PartialEq)]
pub enum LinkCheck {
    /// Cached answer, no round trip needed.
    Known(bool),
    /// A round trip is needed; post this message to the host.
    Request(SurfaceMessage),
    /// A round trip for this path is already in flight.
    Pending,
}

struct PendingCheck {
    path: String,
    deadline: Instant,
}

/// Tracks in-flight existence checks and their memoized answers.
pub struct LinkDetector {
    cache: TtlCache,
    pending: HashMap<String, PendingCheck>,
    next_request: u64,
}

impl std::fmt::Debug for LinkDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkDetector")
            .field("cache", &self.cache)
            .field("pending", &self.pending.len())
            .field("next_request", &self.next_request)
            .finish()
    }
}

impl Default for LinkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDetector {
    /// Detector with default cache sizing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: TtlCache::with_defaults(),
            pending: HashMap::new(),
            next_request: 0,
        }
    }

    /// Ask whether `path` exists, going to the cache first, then to an
    /// in-flight request, then to a fresh round trip.
    pub fn check(&mut self, session_id: SessionId, path: &str, now: Instant) -> LinkCheck {
        if let Some(exists) = self.cache.get(path) {
            return LinkCheck::Known(exists);
        }
        if self.pending.values().any(|p| p.path == path) {
            return LinkCheck::Pending;
        }
        let request_id = format!("req-{}", self.next_request);
        self.next_request += 1;
        self.pending.insert(
            request_id.clone(),
            PendingCheck {
                path: path.to_string(),
                deadline: now + FILE_CHECK_TIMEOUT,
            },
        );
        LinkCheck::Request(SurfaceMessage::CheckFileExists {
            session_id,
            request_id,
            path: path.to_string(),
        })
    }

    /// Record the host's answer. Returns the path the request was for, or
    /// `None` if the request already timed out (late answers are dropped;
    /// the timeout path cached `false` and that stands until the TTL).
    pub fn resolve(&mut self, request_id: &str, exists: bool) -> Option<String> {
        let pending = self.pending.remove(request_id)?;
        self.cache.set(&pending.path, exists);
        Some(pending.path)
    }

    /// Time out overdue requests, caching `false` for each. Returns how
    /// many were expired.
    pub fn expire(&mut self, now: Instant) -> usize {
        let overdue: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now >= p.deadline)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &overdue {
            if let Some(pending) = self.pending.remove(id) {
                self.cache.set(&pending.path, false);
            }
        }
        overdue.len()
    }

    /// Cached verdict for a path, if it hasn't expired.
    pub fn cached(&mut self, path: &str) -> Option<bool> {
        self.cache.get(path)
    }

    /// Number of in-flight requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Turn a modifier-click on a link into the message to post: an
/// `OpenFile` for path tokens (resolved against the tracked cwd), an
/// `OpenUrl` for everything else. Plain clicks return `None`.
#[must_use]
pub fn activate(
    session_id: SessionId,
    text: &str,
    cwd: Option<&str>,
    modifier_held: bool,
) -> Option<SurfaceMessage> {
    if !modifier_held {
        return None;
    }
    if let Some(matched) = match_path_token(text) {
        let path = resolve_path(&matched.path, cwd);
        return Some(SurfaceMessage::OpenFile {
            session_id,
            path,
            line: matched.line,
            column: matched.column,
        });
    }
    Some(SurfaceMessage::OpenUrl {
        session_id,
        url: text.to_string(),
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_plain_path() {
        let matches = scan_line("error in src/main.rs while compiling");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "src/main.rs");
        assert_eq!(matches[0].line, None);
    }

    #[test]
    fn test_scan_captures_line_and_column_suffix() {
        let matches = scan_line("src/lib.rs:42:7: warning");
        assert_eq!(matches[0].path, "src/lib.rs");
        assert_eq!(matches[0].line, Some(42));
        assert_eq!(matches[0].column, Some(7));

        let paren = scan_line("at Object.fn (dist/app.js(10,3))");
        assert!(paren
            .iter()
            .any(|m| m.path == "dist/app.js" && m.line == Some(10) && m.column == Some(3)));
    }

    #[test]
    fn test_scan_handles_absolute_and_drive_paths() {
        let matches = scan_line("see /var/log/app.log and C:\\logs\\app.txt");
        assert!(matches.iter().any(|m| m.path == "/var/log/app.log"));
        assert!(matches.iter().any(|m| m.path == "C:\\logs\\app.txt"));
    }

    #[test]
    fn test_match_path_token_is_anchored() {
        assert!(match_path_token("src/main.rs:3").is_some());
        assert!(match_path_token("https://example.com/a.rs").is_none());
    }

    #[test]
    fn test_check_goes_to_cache_then_pending_then_request() {
        let mut detector = LinkDetector::new();
        let now = Instant::now();
        let id = SessionId(1);

        let first = detector.check(id, "/repo/a.rs", now);
        let LinkCheck::Request(SurfaceMessage::CheckFileExists { request_id, path, .. }) = first
        else {
            panic!("expected a request, got {first:?}");
        };
        assert_eq!(path, "/repo/a.rs");

        // Same path again while in flight
        assert_eq!(detector.check(id, "/repo/a.rs", now), LinkCheck::Pending);

        // Host answers; the verdict is cached
        assert_eq!(
            detector.resolve(&request_id, true).as_deref(),
            Some("/repo/a.rs")
        );
        assert_eq!(detector.check(id, "/repo/a.rs", now), LinkCheck::Known(true));
        assert_eq!(detector.pending_count(), 0);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut detector = LinkDetector::new();
        let now = Instant::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            match detector.check(SessionId(1), &format!("/p{i}.rs"), now) {
                LinkCheck::Request(SurfaceMessage::CheckFileExists { request_id, .. }) => {
                    ids.push(request_id);
                }
                other => panic!("expected request, got {other:?}"),
            }
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_timeout_resolves_to_absent() {
        let mut detector = LinkDetector::new();
        let now = Instant::now();
        let LinkCheck::Request(SurfaceMessage::CheckFileExists { request_id, .. }) =
            detector.check(SessionId(1), "/slow.rs", now)
        else {
            panic!("expected request");
        };

        assert_eq!(detector.expire(now + FILE_CHECK_TIMEOUT), 1);
        assert_eq!(detector.pending_count(), 0);
        assert_eq!(detector.cached("/slow.rs"), Some(false));

        // A late answer is dropped, not resurrected
        assert_eq!(detector.resolve(&request_id, true), None);
        assert_eq!(detector.cached("/slow.rs"), Some(false));
    }

    #[test]
    fn test_expire_leaves_fresh_requests_alone() {
        let mut detector = LinkDetector::new();
        let now = Instant::now();
        let _ = detector.check(SessionId(1), "/fresh.rs", now);
        assert_eq!(detector.expire(now + Duration::from_millis(100)), 0);
        assert_eq!(detector.pending_count(), 1);
    }

    #[test]
    fn test_activate_requires_modifier() {
        assert_eq!(activate(SessionId(1), "src/a.rs", None, false), None);
    }

    #[test]
    fn test_activate_resolves_file_against_cwd() {
        let msg = activate(SessionId(1), "src/a.rs:12:3", Some("/repo"), true);
        assert_eq!(
            msg,
            Some(SurfaceMessage::OpenFile {
                session_id: SessionId(1),
                path: "/repo/src/a.rs".into(),
                line: Some(12),
                column: Some(3),
            })
        );
    }

    #[test]
    fn test_activate_without_cwd_uses_raw_path() {
        let msg = activate(SessionId(1), "b/src/a.rs", None, true);
        assert_eq!(
            msg,
            Some(SurfaceMessage::OpenFile {
                session_id: SessionId(1),
                path: "src/a.rs".into(),
                line: None,
                column: None,
            })
        );
    }

    #[test]
    fn test_activate_falls_back_to_url() {
        let msg = activate(SessionId(1), "https://example.com", None, true);
        assert_eq!(
            msg,
            Some(SurfaceMessage::OpenUrl {
                session_id: SessionId(1),
                url: "https://example.com".into(),
            })
        );
    }
}
