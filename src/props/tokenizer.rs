//! Shell-like lexer for `--build-property` / `--build-properties` values.
//!
//! The lexer is an explicit three-state machine (unquoted, quoted, escaped).
//! It never unescapes anything: backslash sequences and inner quotes are kept
//! byte-for-byte so the toolchain sees exactly what the user typed. Only a
//! quote pair that wraps a whole value is treated as a delimiter and removed.
//!
//! ## Pair boundaries
//!
//! - [`PropertyForm::Combined`]: every unquoted comma, and unquoted whitespace
//!   followed by `key=`.
//! - [`PropertyForm::Single`]: none. An unquoted comma followed by `key=` is
//!   rejected with [`PropertyError::MultiplePairs`]; any other comma or
//!   whitespace is part of the value.

use super::PropertyError;

/// Which flag a raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyForm {
    /// `--build-property`, exactly one pair per occurrence.
    Single,
    /// `--build-properties`, deprecated, comma or space separated pairs.
    Combined,
}

impl PropertyForm {
    pub fn flag(&self) -> &'static str {
        match self {
            PropertyForm::Single => "--build-property",
            PropertyForm::Combined => "--build-properties",
        }
    }
}

/// One `key=value` pair as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    /// Value with escapes preserved and wrapping quotes (if any) removed.
    pub value: String,
    /// The whole value was wrapped in a pair of double quotes.
    pub quoted: bool,
}

impl Token {
    /// Re-serializes the pair in the form it was parsed from.
    pub fn serialize(&self) -> String {
        if self.quoted {
            format!("{}=\"{}\"", self.key, self.value)
        } else {
            format!("{}={}", self.key, self.value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Quoted,
    Escaped { in_quotes: bool },
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: usize,
    end: usize,
    eq: Option<usize>,
}

/// Splits one flag occurrence into ordered `key=value` tokens.
pub fn tokenize(input: &str, form: PropertyForm) -> Result<Vec<Token>, PropertyError> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut eq = None;
    let mut state = State::Unquoted;

    for (i, c) in input.char_indices() {
        state = match (state, c) {
            (State::Escaped { in_quotes }, _) => {
                if in_quotes {
                    State::Quoted
                } else {
                    State::Unquoted
                }
            }
            (State::Quoted, '\\') => State::Escaped { in_quotes: true },
            (State::Quoted, '"') => State::Unquoted,
            (State::Quoted, _) => State::Quoted,
            (State::Unquoted, '\\') => State::Escaped { in_quotes: false },
            (State::Unquoted, '"') => State::Quoted,
            (State::Unquoted, '=') => {
                if eq.is_none() {
                    eq = Some(i);
                }
                State::Unquoted
            }
            (State::Unquoted, c) if c == ',' || c.is_whitespace() => {
                let rest = &input[i + c.len_utf8()..];
                if is_boundary(input, c, rest, form)? {
                    segments.push(Segment { start, end: i, eq });
                    start = i + c.len_utf8();
                    eq = None;
                }
                State::Unquoted
            }
            (State::Unquoted, _) => State::Unquoted,
        };
    }

    match state {
        State::Quoted => {
            return Err(PropertyError::UnbalancedQuote {
                input: input.to_string(),
            });
        }
        State::Escaped { .. } => {
            return Err(PropertyError::IncompleteEscape {
                input: input.to_string(),
            });
        }
        State::Unquoted => {}
    }
    segments.push(Segment {
        start,
        end: input.len(),
        eq,
    });

    let tokens = segments
        .into_iter()
        .filter(|s| !input[s.start..s.end].trim().is_empty())
        .map(|s| segment_to_token(input, s))
        .collect::<Result<Vec<_>, _>>()?;

    if tokens.is_empty() {
        return Err(PropertyError::MissingSeparator {
            input: input.to_string(),
        });
    }
    Ok(tokens)
}

fn is_boundary(
    input: &str,
    sep: char,
    rest: &str,
    form: PropertyForm,
) -> Result<bool, PropertyError> {
    match form {
        PropertyForm::Combined if sep == ',' => Ok(true),
        PropertyForm::Combined => Ok(starts_pair(rest.trim_start())),
        PropertyForm::Single if sep == ',' && starts_pair(rest.trim_start()) => {
            Err(PropertyError::MultiplePairs {
                input: input.to_string(),
            })
        }
        PropertyForm::Single => Ok(false),
    }
}

/// True when `rest` begins with `key=`.
fn starts_pair(rest: &str) -> bool {
    let key_len = rest.find(|c: char| !is_key_char(c)).unwrap_or(rest.len());
    key_len > 0 && !rest.starts_with('-') && rest[key_len..].starts_with('=')
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn segment_to_token(input: &str, segment: Segment) -> Result<Token, PropertyError> {
    let raw = &input[segment.start..segment.end];
    let Some(eq) = segment.eq else {
        return Err(PropertyError::MissingSeparator {
            input: raw.trim().to_string(),
        });
    };

    let key = input[segment.start..eq].trim();
    if key.is_empty() || !key.chars().all(is_key_char) {
        return Err(PropertyError::InvalidKey {
            key: key.to_string(),
        });
    }

    let value = input[eq + 1..segment.end].trim();
    let (value, quoted) = match unwrap_quotes(value) {
        Some(inner) => (inner, true),
        None => (value, false),
    };

    Ok(Token {
        key: key.to_string(),
        value: value.to_string(),
        quoted,
    })
}

/// Returns the inner text when the first quote of `value` closes on its last byte.
fn unwrap_quotes(value: &str) -> Option<&str> {
    if value.len() < 2 || !value.starts_with('"') {
        return None;
    }
    let mut escaped = false;
    for (i, c) in value.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return (i == value.len() - 1).then(|| &value[1..i]),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> Token {
        let mut tokens = tokenize(input, PropertyForm::Single).unwrap();
        assert_eq!(tokens.len(), 1);
        tokens.remove(0)
    }

    #[test]
    fn test_plain_pair() {
        let t = single("build.extra_flags=-DMY_DEFINE=1");
        assert_eq!(t.key, "build.extra_flags");
        assert_eq!(t.value, "-DMY_DEFINE=1");
        assert!(!t.quoted);
    }

    #[test]
    fn test_wrapping_quotes_are_delimiters() {
        let t = single(r#"build.extra_flags="-DMY_DEFINE=\"hello world\"""#);
        assert_eq!(t.value, r#"-DMY_DEFINE=\"hello world\""#);
        assert!(t.quoted);
    }

    #[test]
    fn test_inner_quotes_are_kept() {
        let t = single(r#"compiler.cpp.extra_flags=-DPIN=2 "-DSSID=\"This is a String\"""#);
        assert_eq!(t.value, r#"-DPIN=2 "-DSSID=\"This is a String\"""#);
        assert!(!t.quoted);
    }

    #[test]
    fn test_round_trip_quoted_value() {
        let input = r#"build.extra_flags="-DMY_DEFINE=\"hello world\"""#;
        assert_eq!(single(input).serialize(), input);
    }

    #[test]
    fn test_quoted_comma_is_literal() {
        let tokens = tokenize(r#"a="x,y=1",b=2"#, PropertyForm::Combined).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "x,y=1");
        assert_eq!(tokens[1].key, "b");
    }

    #[test]
    fn test_combined_comma_split() {
        let tokens = tokenize(
            "build.extra_flags=-DFIRST_PIN=1,compiler.cpp.extra_flags=-DSECOND_PIN=2",
            PropertyForm::Combined,
        )
        .unwrap();
        assert_eq!(tokens[0].key, "build.extra_flags");
        assert_eq!(tokens[0].value, "-DFIRST_PIN=1");
        assert_eq!(tokens[1].key, "compiler.cpp.extra_flags");
        assert_eq!(tokens[1].value, "-DSECOND_PIN=2");
    }

    #[test]
    fn test_combined_space_split_only_before_key() {
        let tokens = tokenize("a=-DX=1 -DY=2 b=3", PropertyForm::Combined).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "-DX=1 -DY=2");
        assert_eq!(tokens[1].serialize(), "b=3");
    }

    #[test]
    fn test_single_rejects_multiple_pairs() {
        let err = tokenize(
            "build.extra_flags=-DFIRST_PIN=1,compiler.cpp.extra_flags=-DSECOND_PIN=2",
            PropertyForm::Single,
        )
        .unwrap_err();
        assert!(matches!(err, PropertyError::MultiplePairs { .. }));
    }

    #[test]
    fn test_single_keeps_comma_in_value() {
        let t = single("compiler.cpp.extra_flags=-DA=1,-DB=2");
        assert_eq!(t.value, "-DA=1,-DB=2");
    }

    #[test]
    fn test_unbalanced_quotes() {
        let err = tokenize(
            r#"compiler.cpp.extra_flags="-DPIN=2,-DSSID="This is a String""""#,
            PropertyForm::Single,
        )
        .unwrap_err();
        assert!(matches!(err, PropertyError::UnbalancedQuote { .. }));
    }

    #[test]
    fn test_incomplete_escape() {
        let err = tokenize(r"a=foo\", PropertyForm::Single).unwrap_err();
        assert!(matches!(err, PropertyError::IncompleteEscape { .. }));
    }

    #[test]
    fn test_separator_inside_quotes_does_not_count() {
        let err = tokenize(r#""a=b""#, PropertyForm::Single).unwrap_err();
        assert!(matches!(err, PropertyError::MissingSeparator { .. }));
    }

    #[test]
    fn test_empty_input() {
        let err = tokenize("   ", PropertyForm::Combined).unwrap_err();
        assert!(matches!(err, PropertyError::MissingSeparator { .. }));
    }

    #[test]
    fn test_invalid_key() {
        let err = tokenize("=value", PropertyForm::Single).unwrap_err();
        assert!(matches!(err, PropertyError::InvalidKey { .. }));
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let input = r#"a="1 2",b=\"x\" c=3"#;
        assert_eq!(
            tokenize(input, PropertyForm::Combined).unwrap(),
            tokenize(input, PropertyForm::Combined).unwrap()
        );
    }
}
