//! Keybinding arbitration for the terminal surface.
//!
//! Every key event gets exactly one of three fates: the surface consumes
//! it (currently only the find shortcut), it bubbles up to the host
//! environment's own shortcut handling, or the terminal engine processes
//! it normally. The decision is a pure function of the key, the platform,
//! and whether a selection is active, so it is testable with no UI.

/// What to do with a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    /// The surface handles it (opens the search overlay) and stops here.
    ConsumeForSearch,
    /// Let the host environment's shortcut handling take it.
    BubbleToHost,
    /// Let the terminal engine's default key processing take it.
    TerminalDefault,
}

/// A key event, reduced to what the policy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Key value, lowercase for letters (`"f"`, `"c"`, `"escape"`).
    pub key: String,
    /// Control held.
    pub ctrl: bool,
    /// Alt/option held.
    pub alt: bool,
    /// Shift held.
    pub shift: bool,
    /// Cmd (mac) / Windows key held.
    pub meta: bool,
}

impl KeyPress {
    /// A bare key with no modifiers.
    #[must_use]
    pub fn plain(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        }
    }

    /// A key with ctrl held.
    #[must_use]
    pub fn ctrl(key: &str) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    /// A key with cmd/meta held.
    #[must_use]
    pub fn meta(key: &str) -> Self {
        Self {
            meta: true,
            ..Self::plain(key)
        }
    }

    fn is_single_letter(&self) -> bool {
        let mut chars = self.key.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
    }
}

/// True for the find shortcut: cmd+f on mac, ctrl+f elsewhere.
#[must_use]
pub fn is_search_shortcut(press: &KeyPress, is_mac: bool) -> bool {
    let primary = if is_mac {
        press.meta && !press.ctrl
    } else {
        press.ctrl && !press.meta
    };
    primary && !press.alt && !press.shift && press.key == "f"
}

/// Decide a key event's fate.
///
/// On mac, cmd combos belong to the host and ctrl+letter stays with the
/// terminal (so ctrl+c sends an interrupt instead of being hijacked). On
/// other platforms ctrl+shift combos belong to the host, ctrl+c bubbles
/// only while a selection is active (so copy works), and other
/// ctrl+letter combos stay with the terminal.
#[must_use]
pub fn decide(press: &KeyPress, is_mac: bool, has_selection: bool) -> KeyDecision {
    if is_search_shortcut(press, is_mac) {
        return KeyDecision::ConsumeForSearch;
    }

    if is_mac {
        if press.meta {
            return KeyDecision::BubbleToHost;
        }
        if press.ctrl && press.is_single_letter() {
            return KeyDecision::TerminalDefault;
        }
    } else {
        if press.ctrl && press.shift {
            return KeyDecision::BubbleToHost;
        }
        if press.ctrl && press.key == "c" && has_selection {
            return KeyDecision::BubbleToHost;
        }
        if press.ctrl && press.is_single_letter() {
            return KeyDecision::TerminalDefault;
        }
    }

    KeyDecision::TerminalDefault
}

// ─── Tests ─────────────────────────────────────────────────────────────────
