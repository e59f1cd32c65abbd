//! X11 KeySym values as understood by remote-framebuffer endpoints.
//!
//! Remote-framebuffer key events carry a 32-bit KeySym, the same numbering
//! defined in `X11/keysymdef.h`.
//! Reference: https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h
//!
//! # Characters versus keys
//!
//! KeySyms represent *characters* as well as physical keys:
//!
//! | KeySym name | Value  | Meaning        |
//! |-------------|--------|----------------|
//! | `XK_a`      | 0x0061 | lowercase 'a'  |
//! | `XK_A`      | 0x0041 | uppercase 'A'  |
//! | `XK_Return` | 0xFF0D | Enter key      |
//! | `XK_Escape` | 0xFF1B | Escape key     |
//!
//! Latin-1 characters use their code point directly.  Every other Unicode
//! character is encoded as `0x0100_0000 | code_point`.  Control characters
//! have no glyph on the remote keyboard, so the handful that appear in typed
//! text (newline, tab, carriage return, backspace, escape) are mapped to their
//! dedicated function-key KeySyms instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote keyboard key identifier (X11 KeySym).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keysym(pub u32);

/// Offset added to a Unicode code point above Latin-1 to form its KeySym.
const UNICODE_KEYSYM_OFFSET: u32 = 0x0100_0000;

impl Keysym {
    pub const BACKSPACE: Keysym = Keysym(0xFF08); // XK_BackSpace
    pub const TAB: Keysym = Keysym(0xFF09); // XK_Tab
    pub const RETURN: Keysym = Keysym(0xFF0D); // XK_Return
    pub const PAUSE: Keysym = Keysym(0xFF13); // XK_Pause
    pub const SCROLL_LOCK: Keysym = Keysym(0xFF14); // XK_Scroll_Lock
    pub const SYS_REQ: Keysym = Keysym(0xFF15); // XK_Sys_Req
    pub const ESCAPE: Keysym = Keysym(0xFF1B); // XK_Escape
    pub const HOME: Keysym = Keysym(0xFF50); // XK_Home
    pub const LEFT: Keysym = Keysym(0xFF51); // XK_Left
    pub const UP: Keysym = Keysym(0xFF52); // XK_Up
    pub const RIGHT: Keysym = Keysym(0xFF53); // XK_Right
    pub const DOWN: Keysym = Keysym(0xFF54); // XK_Down
    pub const PAGE_UP: Keysym = Keysym(0xFF55); // XK_Page_Up
    pub const PAGE_DOWN: Keysym = Keysym(0xFF56); // XK_Page_Down
    pub const END: Keysym = Keysym(0xFF57); // XK_End
    pub const PRINT: Keysym = Keysym(0xFF61); // XK_Print
    pub const INSERT: Keysym = Keysym(0xFF63); // XK_Insert
    pub const MENU: Keysym = Keysym(0xFF67); // XK_Menu
    pub const NUM_LOCK: Keysym = Keysym(0xFF7F); // XK_Num_Lock
    pub const KP_ENTER: Keysym = Keysym(0xFF8D); // XK_KP_Enter
    pub const KP_MULTIPLY: Keysym = Keysym(0xFFAA); // XK_KP_Multiply
    pub const KP_ADD: Keysym = Keysym(0xFFAB); // XK_KP_Add
    pub const KP_SUBTRACT: Keysym = Keysym(0xFFAD); // XK_KP_Subtract
    pub const KP_DECIMAL: Keysym = Keysym(0xFFAE); // XK_KP_Decimal
    pub const KP_DIVIDE: Keysym = Keysym(0xFFAF); // XK_KP_Divide
    pub const KP_0: Keysym = Keysym(0xFFB0); // XK_KP_0
    pub const F1: Keysym = Keysym(0xFFBE); // XK_F1
    pub const SHIFT_L: Keysym = Keysym(0xFFE1); // XK_Shift_L
    pub const SHIFT_R: Keysym = Keysym(0xFFE2); // XK_Shift_R
    pub const CONTROL_L: Keysym = Keysym(0xFFE3); // XK_Control_L
    pub const CONTROL_R: Keysym = Keysym(0xFFE4); // XK_Control_R
    pub const CAPS_LOCK: Keysym = Keysym(0xFFE5); // XK_Caps_Lock
    pub const META_L: Keysym = Keysym(0xFFE7); // XK_Meta_L
    pub const META_R: Keysym = Keysym(0xFFE8); // XK_Meta_R
    pub const ALT_L: Keysym = Keysym(0xFFE9); // XK_Alt_L
    pub const ALT_R: Keysym = Keysym(0xFFEA); // XK_Alt_R
    pub const SUPER_L: Keysym = Keysym(0xFFEB); // XK_Super_L
    pub const SUPER_R: Keysym = Keysym(0xFFEC); // XK_Super_R
    pub const HYPER_L: Keysym = Keysym(0xFFED); // XK_Hyper_L
    pub const HYPER_R: Keysym = Keysym(0xFFEE); // XK_Hyper_R
    pub const DELETE: Keysym = Keysym(0xFFFF); // XK_Delete

    pub const SPACE: Keysym = Keysym(0x0020); // XK_space
    pub const SLASH: Keysym = Keysym(0x002F); // XK_slash
    pub const BACKSLASH: Keysym = Keysym(0x005C); // XK_backslash

    /// Returns the KeySym for function key `F{n}`, `n` in `1..=35`.
    pub fn function_key(n: u8) -> Option<Keysym> {
        (1..=35)
            .contains(&n)
            .then(|| Keysym(Self::F1.0 + u32::from(n) - 1))
    }

    /// Returns the KeySym for keypad digit `digit` (`0..=9`).
    pub fn keypad_digit(digit: u8) -> Option<Keysym> {
        (digit <= 9).then(|| Keysym(Self::KP_0.0 + u32::from(digit)))
    }

    /// Maps a single typed character to the KeySym the remote keyboard expects.
    ///
    /// Newline and carriage return both become `Return`; tab, backspace and
    /// escape become their dedicated keys.
    pub fn from_char(c: char) -> Keysym {
        match c {
            '\n' | '\r' => Self::RETURN,
            '\t' => Self::TAB,
            '\u{8}' => Self::BACKSPACE,
            '\u{1b}' => Self::ESCAPE,
            c if (c as u32) < 0x100 => Keysym(c as u32),
            c => Keysym(UNICODE_KEYSYM_OFFSET | c as u32),
        }
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
