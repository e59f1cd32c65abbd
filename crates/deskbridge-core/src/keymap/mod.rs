//! Key name → KeySym lookup used to resolve chord tokens.
//!
//! The table is built explicitly by [`KeysymTable::standard`] and is immutable
//! afterwards.  Build it once at process start and share it (e.g. behind an
//! `Arc`); nothing in this module runs at load time.
//!
//! Names follow the conventions of common VNC scripting tools (`bsp`, `pgdn`,
//! `lctrl`, `kpenter`, ...) and are matched ASCII-case-insensitively, so
//! `Ctrl`, `CTRL` and `ctrl` all resolve to `Control_L`.

pub mod keysym;

use std::collections::HashMap;

pub use keysym::Keysym;

/// Immutable name → KeySym table.
#[derive(Debug, Clone)]
pub struct KeysymTable {
    by_name: HashMap<String, Keysym>,
    // First registered name per keysym, for log output.
    names: HashMap<Keysym, String>,
}

/// Fixed named keys.  Aliases share a KeySym; the first entry for a KeySym is
/// its canonical name.
const NAMED_KEYS: &[(&str, Keysym)] = &[
    ("bsp", Keysym::BACKSPACE),
    ("backspace", Keysym::BACKSPACE),
    ("tab", Keysym::TAB),
    ("return", Keysym::RETURN),
    ("enter", Keysym::RETURN),
    ("esc", Keysym::ESCAPE),
    ("escape", Keysym::ESCAPE),
    ("ins", Keysym::INSERT),
    ("insert", Keysym::INSERT),
    ("delete", Keysym::DELETE),
    ("del", Keysym::DELETE),
    ("home", Keysym::HOME),
    ("end", Keysym::END),
    ("pgup", Keysym::PAGE_UP),
    ("pageup", Keysym::PAGE_UP),
    ("pgdn", Keysym::PAGE_DOWN),
    ("pagedown", Keysym::PAGE_DOWN),
    ("left", Keysym::LEFT),
    ("up", Keysym::UP),
    ("right", Keysym::RIGHT),
    ("down", Keysym::DOWN),
    ("slash", Keysym::SLASH),
    ("fslash", Keysym::SLASH),
    ("bslash", Keysym::BACKSLASH),
    ("space", Keysym::SPACE),
    ("spacebar", Keysym::SPACE),
    ("sb", Keysym::SPACE),
    ("lshift", Keysym::SHIFT_L),
    ("shift", Keysym::SHIFT_L),
    ("rshift", Keysym::SHIFT_R),
    ("lctrl", Keysym::CONTROL_L),
    ("ctrl", Keysym::CONTROL_L),
    ("rctrl", Keysym::CONTROL_R),
    ("lmeta", Keysym::META_L),
    ("meta", Keysym::META_L),
    ("rmeta", Keysym::META_R),
    ("lalt", Keysym::ALT_L),
    ("alt", Keysym::ALT_L),
    ("ralt", Keysym::ALT_R),
    ("lsuper", Keysym::SUPER_L),
    ("super", Keysym::SUPER_L),
    ("win", Keysym::SUPER_L),
    ("rsuper", Keysym::SUPER_R),
    ("lhyper", Keysym::HYPER_L),
    ("hyper", Keysym::HYPER_L),
    ("rhyper", Keysym::HYPER_R),
    ("scrlk", Keysym::SCROLL_LOCK),
    ("sysrq", Keysym::SYS_REQ),
    ("numlk", Keysym::NUM_LOCK),
    ("caplk", Keysym::CAPS_LOCK),
    ("capslock", Keysym::CAPS_LOCK),
    ("pause", Keysym::PAUSE),
    ("print", Keysym::PRINT),
    ("prtsc", Keysym::PRINT),
    ("menu", Keysym::MENU),
    ("kpenter", Keysym::KP_ENTER),
    ("kpadd", Keysym::KP_ADD),
    ("kpsub", Keysym::KP_SUBTRACT),
    ("kpmul", Keysym::KP_MULTIPLY),
    ("kpdiv", Keysym::KP_DIVIDE),
    ("kpdec", Keysym::KP_DECIMAL),
];

impl KeysymTable {
    /// Builds the standard table: the named keys above plus `f1`–`f20` and
    /// `kp0`–`kp9`.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for (name, sym) in NAMED_KEYS {
            table.insert(name, *sym);
        }
        for n in 1..=20u8 {
            if let Some(sym) = Keysym::function_key(n) {
                table.insert(&format!("f{n}"), sym);
            }
        }
        for d in 0..=9u8 {
            if let Some(sym) = Keysym::keypad_digit(d) {
                table.insert(&format!("kp{d}"), sym);
            }
        }
        tracing::debug!("built keysym table with {} names", table.by_name.len());
        table
    }

    /// Builds a table from explicit `(name, keysym)` pairs.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Keysym)>,
    {
        let mut table = Self::empty();
        for (name, sym) in entries {
            table.insert(name, sym);
        }
        table
    }

    fn empty() -> Self {
        Self {
            by_name: HashMap::new(),
            names: HashMap::new(),
        }
    }

    fn insert(&mut self, name: &str, sym: Keysym) {
        let key = name.to_ascii_lowercase();
        self.names.entry(sym).or_insert_with(|| key.clone());
        self.by_name.insert(key, sym);
    }

    /// Resolves a chord token to a KeySym, ignoring ASCII case.
    ///
    /// Returns `None` for unknown names; callers fall back to typing the token
    /// literally.
    pub fn resolve(&self, token: &str) -> Option<Keysym> {
        if token.is_empty() {
            return None;
        }
        if token.bytes().any(|b| b.is_ascii_uppercase()) {
            self.by_name.get(&token.to_ascii_lowercase()).copied()
        } else {
            self.by_name.get(token).copied()
        }
    }

    /// Returns the canonical name registered for `sym`, if any.
    pub fn name_of(&self, sym: Keysym) -> Option<&str> {
        self.names.get(&sym).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for KeysymTable {
    fn default() -> Self {
        Self::standard()
    }
}
