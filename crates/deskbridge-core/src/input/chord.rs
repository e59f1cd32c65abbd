//! Parser for free-form typing commands with embedded chord specifications.
//!
//! # Grammar
//!
//! ```text
//! input   := (literal | chord)*
//! chord   := '`' token ('-' token)* '`'
//! literal := any text outside a chord, with backslash escapes resolved
//! ```
//!
//! Backslash escapes recognised everywhere:
//!
//! | Escape   | Result                 |
//! |----------|------------------------|
//! | `\\`     | backslash              |
//! | `` \` `` | backtick (never opens or closes a chord) |
//! | `\-`     | hyphen (never splits a chord token)      |
//! | `\n`     | newline                |
//! | `\t`     | tab                    |
//! | `\r`     | carriage return        |
//! | `\b`     | backspace              |
//! | `\e`     | escape                 |
//! | `\xHH`   | character with code HH |
//!
//! Any other backslash is kept literally.  A backtick without a matching
//! closing backtick is typed as a literal character, as is everything after it.

/// One parsed piece of a typing command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text to type character by character (escapes already resolved).
    Literal(String),
    /// Hyphen-separated chord tokens in left-to-right order (escapes already
    /// resolved).  Tokens may be empty.
    Chord(Vec<String>),
}

/// Splits `text` into literal and chord segments.
pub fn parse(text: &str) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    // Once a backtick fails to find its partner, no later one can either.
    let mut unmatched = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += push_escape(&chars, i, &mut literal);
            }
            '`' if !unmatched => match find_closing_backtick(&chars, i + 1) {
                Some(close) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Chord(split_tokens(&chars[i + 1..close])));
                    i = close + 1;
                }
                None => {
                    unmatched = true;
                    literal.push('`');
                    i += 1;
                }
            },
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Returns the index of the first unescaped backtick at or after `from`.
fn find_closing_backtick(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        match chars[j] {
            '\\' if j + 1 < chars.len() => j += 2,
            '`' => return Some(j),
            _ => j += 1,
        }
    }
    None
}

/// Splits a chord body on unescaped hyphens.
fn split_tokens(body: &[char]) -> Vec<String> {
    if body.is_empty() {
        return Vec::new();
    }
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' => i += push_escape(body, i, &mut current),
            '-' => {
                tokens.push(std::mem::take(&mut current));
                i += 1;
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    tokens.push(current);
    tokens
}

/// Resolves the escape starting at `chars[at]` (a backslash) into `out` and
/// returns how many chars were consumed.
fn push_escape(chars: &[char], at: usize, out: &mut String) -> usize {
    let Some(&next) = chars.get(at + 1) else {
        out.push('\\');
        return 1;
    };
    let resolved = match next {
        '\\' => '\\',
        '`' => '`',
        '-' => '-',
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'e' => '\u{1b}',
        'x' => {
            if let Some(c) = hex_escape(chars, at + 2) {
                out.push(c);
                return 4;
            }
            out.push('\\');
            return 1;
        }
        _ => {
            // Unknown escape: keep the backslash, let the next char be
            // processed on its own.
            out.push('\\');
            return 1;
        }
    };
    out.push(resolved);
    2
}

fn hex_escape(chars: &[char], at: usize) -> Option<char> {
    let hi = chars.get(at)?.to_digit(16)?;
    let lo = chars.get(at + 1)?.to_digit(16)?;
    char::from_u32(hi * 16 + lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn chord(tokens: &[&str]) -> Segment {
        Segment::Chord(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_plain_text_is_one_literal() {
        assert_eq!(parse("hello"), vec![lit("hello")]);
    }

    #[test]
    fn test_empty_input_has_no_segments() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_chord_between_literals() {
        assert_eq!(
            parse("ab`ctrl-c`de"),
            vec![lit("ab"), chord(&["ctrl", "c"]), lit("de")]
        );
    }

    #[test]
    fn test_adjacent_chords() {
        assert_eq!(
            parse("`ctrl-a``del`"),
            vec![chord(&["ctrl", "a"]), chord(&["del"])]
        );
    }

    #[test]
    fn test_escaped_backtick_is_literal() {
        assert_eq!(parse("a\\`b"), vec![lit("a`b")]);
    }

    #[test]
    fn test_escaped_backslash_before_backtick_still_opens_chord() {
        // `\\` is a literal backslash, so the backtick that follows is live.
        assert_eq!(parse("\\\\`tab`"), vec![lit("\\"), chord(&["tab"])]);
    }

    #[test]
    fn test_control_escapes_resolve_outside_chords() {
        assert_eq!(
            parse("a\\nb\\tc\\rd\\be\\e"),
            vec![lit("a\nb\tc\rd\u{8}e\u{1b}")]
        );
    }

    #[test]
    fn test_hex_escape() {
        assert_eq!(parse("\\x1b"), vec![lit("\u{1b}")]);
        // Malformed hex keeps the backslash.
        assert_eq!(parse("\\xZZ"), vec![lit("\\xZZ")]);
    }

    #[test]
    fn test_unknown_escape_keeps_backslash() {
        assert_eq!(parse("\\q"), vec![lit("\\q")]);
        assert_eq!(parse("end\\"), vec![lit("end\\")]);
    }

    #[test]
    fn test_unmatched_backtick_makes_rest_literal() {
        assert_eq!(parse("a`ctrl-c"), vec![lit("a`ctrl-c")]);
        assert_eq!(parse("`x` then `y"), vec![chord(&["x"]), lit(" then `y")]);
    }

    #[test]
    fn test_empty_chord_has_no_tokens() {
        assert_eq!(parse("``"), vec![chord(&[])]);
    }

    #[test]
    fn test_escaped_hyphen_does_not_split() {
        assert_eq!(parse("`ctrl-\\-`"), vec![chord(&["ctrl", "-"])]);
    }

    #[test]
    fn test_double_and_edge_hyphens_produce_empty_tokens() {
        assert_eq!(parse("`a--b`"), vec![chord(&["a", "", "b"])]);
        assert_eq!(parse("`-a-`"), vec![chord(&["", "a", ""])]);
    }

    #[test]
    fn test_escaped_backtick_inside_chord() {
        assert_eq!(parse("`ctrl-\\``"), vec![chord(&["ctrl", "`"])]);
    }
}
