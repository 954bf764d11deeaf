//! Path and shell-quoting helpers for terminal file links.
//!
//! These are the pure functions behind link resolution and drag-and-drop:
//! deciding whether a token is already absolute, undoing the `a/`/`b/`
//! prefixes git diffs add, resolving against a tracked working directory,
//! and quoting paths before they are typed into a shell.

/// True if `path` is absolute on either platform convention:
/// a leading `/` (POSIX) or a drive-letter prefix like `C:` (Windows).
#[must_use]
pub fn is_absolute_path(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), Some(':')) if c.is_ascii_alphabetic()
    )
}

/// Strip the `a/` or `b/` prefix git diffs put in front of paths.
///
/// Any other prefix is left untouched.
#[must_use]
pub fn strip_git_diff_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Resolve a path token against an optional working directory.
///
/// Absolute paths pass through unchanged. Relative paths first lose any
/// git-diff prefix, then are joined to `cwd` with a `/`. With no known
/// cwd the (stripped) relative path is returned as-is.
#[must_use]
pub fn resolve_path(path: &str, cwd: Option<&str>) -> String {
    if is_absolute_path(path) {
        return path.to_string();
    }
    let path = strip_git_diff_prefix(path);
    match cwd {
        Some(cwd) => format!("{cwd}/{path}"),
        None => path.to_string(),
    }
}

/// Characters that force a path to be quoted before a shell sees it.
fn needs_quoting(path: &str) -> bool {
    path.chars().any(|c| {
        c.is_whitespace()
            || matches!(
                c,
                '"' | '\'' | '$' | '`' | '\\' | '!' | '&' | ';' | '|' | '<' | '>' | '(' | ')'
            )
    })
}

/// Quote a path for insertion into a shell command line.
///
/// POSIX shells get single-quote wrapping with the `'` → `'\''` escape;
/// `cmd.exe`-style shells get double-quote wrapping with embedded quotes
/// doubled. Paths without shell-special characters pass through verbatim.
#[must_use]
pub fn quote_shell_path(path: &str, windows: bool) -> String {
    if !needs_quoting(path) {
        return path.to_string();
    }
    if windows {
        format!("\"{}\"", path.replace('"', "\"\""))
    } else {
        format!("'{}'", path.replace('\'', "'\\''"))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_detection() {
        assert!(is_absolute_path("/usr/bin"));
        assert!(is_absolute_path("C:\\Users\\me"));
        assert!(is_absolute_path("c:/repo"));
        assert!(!is_absolute_path("src/main.rs"));
        assert!(!is_absolute_path("./relative"));
        assert!(!is_absolute_path(""));
        // Digit before the colon is not a drive letter
        assert!(!is_absolute_path("1:file"));
    }

    #[test]
    fn test_strip_git_diff_prefix() {
        assert_eq!(strip_git_diff_prefix("a/x"), "x");
        assert_eq!(strip_git_diff_prefix("b/x"), "x");
        assert_eq!(strip_git_diff_prefix("x"), "x");
        // Only the exact two-character prefixes are stripped
        assert_eq!(strip_git_diff_prefix("ab/x"), "ab/x");
        assert_eq!(strip_git_diff_prefix("a/b/x"), "b/x");
    }

    #[test]
    fn test_resolve_absolute_ignores_cwd() {
        assert_eq!(resolve_path("/etc/hosts", Some("/home/me")), "/etc/hosts");
        assert_eq!(resolve_path("/etc/hosts", None), "/etc/hosts");
    }

    #[test]
    fn test_resolve_relative_against_cwd() {
        assert_eq!(
            resolve_path("src/lib.rs", Some("/repo")),
            "/repo/src/lib.rs"
        );
        assert_eq!(resolve_path("a/src/lib.rs", Some("/repo")), "/repo/src/lib.rs");
    }

    #[test]
    fn test_resolve_relative_without_cwd_falls_back_to_raw() {
        assert_eq!(resolve_path("src/lib.rs", None), "src/lib.rs");
        assert_eq!(resolve_path("b/src/lib.rs", None), "src/lib.rs");
    }

    #[test]
    fn test_quote_plain_path_unchanged() {
        assert_eq!(quote_shell_path("/usr/bin/env", false), "/usr/bin/env");
        assert_eq!(quote_shell_path("C:/tools/rg.exe", true), "C:/tools/rg.exe");
    }

    #[test]
    fn test_quote_posix_single_quote_escape() {
        assert_eq!(
            quote_shell_path("/path/with spaces/it's/file.ts", false),
            "'/path/with spaces/it'\\''s/file.ts'"
        );
    }

    #[test]
    fn test_quote_posix_round_trip() {
        let original = "/tmp/it's a 'test' dir/f.rs";
        let quoted = quote_shell_path(original, false);
        assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        // Undo the quoting: strip outer quotes, reverse the escape
        let interior = &quoted[1..quoted.len() - 1];
        let restored = interior.replace("'\\''", "'");
        assert_eq!(restored, original);
    }

    #[test]
    fn test_quote_windows_doubles_embedded_quotes() {
        assert_eq!(
            quote_shell_path("C:\\Program Files\\a\"b.txt", true),
            "\"C:\\Program Files\\a\"\"b.txt\""
        );
    }
}
