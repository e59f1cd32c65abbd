//! Text command → ordered [`KeyAction`] list.
//!
//! # Ordering
//!
//! Literal characters are typed one at a time: each character's Down action is
//! immediately followed by its Up action.
//!
//! A chord presses every token left to right, then releases every token left
//! to right (not in stack order):
//!
//! ```text
//! `ctrl-alt-delete`  →  ctrl↓ alt↓ delete↓ ctrl↑ alt↑ delete↑
//! ```
//!
//! A token that is not a known key name is typed character by character in
//! place, within whichever half (down or up) is being emitted.
//!
//! # Phases
//!
//! Callers choose which halves to emit.  "Hold" commands request only Down,
//! "release" commands only Up; the Down-only and Up-only outputs concatenated
//! contain the same actions as the both-phases output of a single chord.

use std::sync::Arc;

use tracing::trace;

use super::action::KeyAction;
use super::chord::{parse, Segment};
use crate::keymap::{Keysym, KeysymTable};

/// Converts typing commands into key actions using an immutable keysym table.
#[derive(Debug, Clone)]
pub struct ChordTranslator {
    table: Arc<KeysymTable>,
}

impl ChordTranslator {
    pub fn new(table: Arc<KeysymTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeysymTable {
        &self.table
    }

    /// Translates `text` into an ordered list of key actions.
    ///
    /// `key_down` / `key_up` select which phases are emitted.  With both
    /// `false` the result is empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deskbridge_core::{ChordTranslator, KeyAction, Keysym};
    ///
    /// let translator = ChordTranslator::default();
    /// let actions = translator.translate("`ctrl-c`", true, true);
    /// assert_eq!(
    ///     actions,
    ///     vec![
    ///         KeyAction::down(Keysym::CONTROL_L),
    ///         KeyAction::down(Keysym(0x63)),
    ///         KeyAction::up(Keysym::CONTROL_L),
    ///         KeyAction::up(Keysym(0x63)),
    ///     ]
    /// );
    /// ```
    pub fn translate(&self, text: &str, key_down: bool, key_up: bool) -> Vec<KeyAction> {
        let mut actions = Vec::new();
        for segment in parse(text) {
            match segment {
                Segment::Literal(literal) => {
                    push_literal(&mut actions, &literal, key_down, key_up);
                }
                Segment::Chord(tokens) => {
                    if key_down {
                        self.push_chord_half(&mut actions, &tokens, KeyAction::down);
                    }
                    if key_up {
                        self.push_chord_half(&mut actions, &tokens, KeyAction::up);
                    }
                }
            }
        }
        actions
    }

    fn push_chord_half(
        &self,
        actions: &mut Vec<KeyAction>,
        tokens: &[String],
        make: fn(Keysym) -> KeyAction,
    ) {
        for token in tokens {
            match self.table.resolve(token) {
                Some(sym) => actions.push(make(sym)),
                None => {
                    trace!("chord token {token:?} is not a key name; typing it literally");
                    actions.extend(token.chars().map(|c| make(Keysym::from_char(c))));
                }
            }
        }
    }
}

impl Default for ChordTranslator {
    fn default() -> Self {
        Self::new(Arc::new(KeysymTable::standard()))
    }
}

fn push_literal(actions: &mut Vec<KeyAction>, text: &str, key_down: bool, key_up: bool) {
    for c in text.chars() {
        let sym = Keysym::from_char(c);
        if key_down {
            actions.push(KeyAction::down(sym));
        }
        if key_up {
            actions.push(KeyAction::up(sym));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char) -> Keysym {
        Keysym::from_char(c)
    }

    #[test]
    fn test_literal_text_interleaves_down_and_up() {
        // Arrange
        let translator = ChordTranslator::default();

        // Act
        let actions = translator.translate("hi", true, true);

        // Assert
        assert_eq!(
            actions,
            vec![
                KeyAction::down(ch('h')),
                KeyAction::up(ch('h')),
                KeyAction::down(ch('i')),
                KeyAction::up(ch('i')),
            ]
        );
    }

    #[test]
    fn test_literal_down_only() {
        let translator = ChordTranslator::default();
        let actions = translator.translate("ab", true, false);
        assert_eq!(actions, vec![KeyAction::down(ch('a')), KeyAction::down(ch('b'))]);
    }

    #[test]
    fn test_newline_types_return_key() {
        let translator = ChordTranslator::default();
        let actions = translator.translate("a\\n", true, true);
        assert_eq!(
            actions,
            vec![
                KeyAction::down(ch('a')),
                KeyAction::up(ch('a')),
                KeyAction::down(Keysym::RETURN),
                KeyAction::up(Keysym::RETURN),
            ]
        );
    }

    #[test]
    fn test_unknown_token_expands_within_each_half() {
        // Arrange: "ab" is not a key name, so it is typed in place.
        let translator = ChordTranslator::default();

        // Act
        let actions = translator.translate("`shift-ab`", true, true);

        // Assert
        assert_eq!(
            actions,
            vec![
                KeyAction::down(Keysym::SHIFT_L),
                KeyAction::down(ch('a')),
                KeyAction::down(ch('b')),
                KeyAction::up(Keysym::SHIFT_L),
                KeyAction::up(ch('a')),
                KeyAction::up(ch('b')),
            ]
        );
    }

    #[test]
    fn test_up_only_emits_release_half() {
        let translator = ChordTranslator::default();
        let actions = translator.translate("`ctrl-alt-delete`", false, true);
        assert_eq!(
            actions,
            vec![
                KeyAction::up(Keysym::CONTROL_L),
                KeyAction::up(Keysym::ALT_L),
                KeyAction::up(Keysym::DELETE),
            ]
        );
    }

    #[test]
    fn test_no_phases_yields_nothing() {
        let translator = ChordTranslator::default();
        assert!(translator.translate("abc`ctrl-x`", false, false).is_empty());
    }

    #[test]
    fn test_empty_chord_and_empty_tokens_contribute_nothing() {
        let translator = ChordTranslator::default();
        assert!(translator.translate("``", true, true).is_empty());
        assert_eq!(
            translator.translate("`ctrl--del`", true, false),
            vec![KeyAction::down(Keysym::CONTROL_L), KeyAction::down(Keysym::DELETE)]
        );
    }

    #[test]
    fn test_chord_surrounded_by_text() {
        let translator = ChordTranslator::default();
        let actions = translator.translate("a`enter`b", true, true);
        let symbols: Vec<Keysym> = actions.iter().map(|a| a.symbol).collect();
        assert_eq!(
            symbols,
            vec![ch('a'), ch('a'), Keysym::RETURN, Keysym::RETURN, ch('b'), ch('b')]
        );
    }

    #[test]
    fn test_custom_table_is_used_for_resolution() {
        let table = Arc::new(KeysymTable::from_entries([("boss", Keysym::F1)]));
        let translator = ChordTranslator::new(table);
        assert_eq!(
            translator.translate("`boss`", true, false),
            vec![KeyAction::down(Keysym::F1)]
        );
        // "ctrl" is unknown to this table, so it is typed literally.
        assert_eq!(translator.translate("`ctrl`", true, false).len(), 4);
    }
}
