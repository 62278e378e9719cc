//! Placeholder parameter parsing.
//!
//! The text between a placeholder's braces is a comma separated list of
//! typed tokens:
//!
//! - string: `"..."` (commas inside the quotes do not split)
//! - element: `<tag attrs>`
//! - definition: a bare key that must exist in the active definitions
//!
//! Token 0 must be a valid definition. If it is not, the whole placeholder
//! falls back to [`FALLBACK`]. Later tokens that fail validation are kept as
//! [`ParamKind::Invalid`] so positional references still line up.

use crate::i18n::DefinitionMap;

/// Literal text produced for anything that cannot be resolved.
pub const FALLBACK: &str = "null";

const DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Element,
    Definition,
    Invalid,
}

impl ParamKind {
    /// Kind announced by the first character of a token.
    fn opened_by(c: char) -> ParamKind {
        match c {
            '"' => ParamKind::String,
            '<' => ParamKind::Element,
            _ => ParamKind::Definition,
        }
    }

    /// Opening and closing characters a token of this kind must carry.
    fn bounds(self) -> (&'static str, &'static str) {
        match self {
            ParamKind::String => ("\"", "\""),
            ParamKind::Element => ("<", ">"),
            ParamKind::Definition | ParamKind::Invalid => ("", ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub kind: ParamKind,
    pub value: String,
}

impl Parameter {
    fn invalid() -> Self {
        Self {
            kind: ParamKind::Invalid,
            value: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Skipping whitespace until a token opens.
    SeekStart,
    /// Collecting the body of the active token.
    Accumulating,
    /// A string closed; skipping whitespace until the next comma.
    SeekDelimiter,
}

struct ActiveToken {
    kind: ParamKind,
    body: String,
}

/// Split a placeholder's inner text into typed parameters.
///
/// Returns `None` when the first token is missing or invalid, in which case
/// the placeholder resolves to [`FALLBACK`].
pub fn parse_parameters(raw: &str, defs: &DefinitionMap) -> Option<Vec<Parameter>> {
    if raw.is_empty() || defs.is_empty() || starts_with_delimiter(raw) {
        return None;
    }

    let mut params: Vec<Parameter> = Vec::new();
    let mut state = ParseState::SeekStart;
    let mut active: Option<ActiveToken> = None;

    for c in raw.chars() {
        match state {
            ParseState::SeekStart => {
                if c.is_whitespace() {
                    continue;
                }
                if c == DELIMITER {
                    // Two commas in a row: the skipped slot is still a position
                    params.push(Parameter::invalid());
                } else {
                    active = Some(ActiveToken {
                        kind: ParamKind::opened_by(c),
                        body: c.to_string(),
                    });
                    state = ParseState::Accumulating;
                }
                continue;
            }
            ParseState::Accumulating => {
                let Some(token) = active.as_mut() else {
                    state = ParseState::SeekStart;
                    continue;
                };
                let closes = token.kind != ParamKind::String && c == DELIMITER;
                if !closes {
                    token.body.push(c);
                    if token.kind == ParamKind::String && c == '"' {
                        state = ParseState::SeekDelimiter;
                    }
                    continue;
                }
            }
            ParseState::SeekDelimiter => {
                if c.is_whitespace() {
                    continue;
                }
                if c != DELIMITER {
                    // Stray text after a closed string occupies a position of its own
                    params.push(Parameter::invalid());
                    continue;
                }
            }
        }

        if let Some(token) = active.take() {
            if !close_token(token, &mut params, defs) {
                return None;
            }
        }
        state = ParseState::SeekStart;
    }

    if let Some(token) = active.take() {
        if !close_token(token, &mut params, defs) {
            return None;
        }
    }

    match params.first() {
        Some(first) if first.kind == ParamKind::Definition => Some(params),
        _ => None,
    }
}

fn starts_with_delimiter(raw: &str) -> bool {
    raw.trim_start().starts_with(DELIMITER)
}

/// Validate a finished token and record it. Returns `false` when the token
/// was the first one and failed, which aborts the whole placeholder.
fn close_token(token: ActiveToken, params: &mut Vec<Parameter>, defs: &DefinitionMap) -> bool {
    let first = params.is_empty();

    match validate(token, first, defs) {
        Some(param) => {
            params.push(param);
            true
        }
        None if first => false,
        None => {
            params.push(Parameter::invalid());
            true
        }
    }
}

fn validate(token: ActiveToken, first: bool, defs: &DefinitionMap) -> Option<Parameter> {
    let ActiveToken { kind, body } = token;

    // Only a definition can open a placeholder
    if first && kind != ParamKind::Definition {
        return None;
    }
    if body.is_empty() {
        return None;
    }

    let (open, close) = kind.bounds();
    if !body.starts_with(open) || !body.ends_with(close) {
        return None;
    }

    let legal = match kind {
        ParamKind::String => true,
        ParamKind::Element => !has_closing_or_spaced_tag(&body),
        ParamKind::Definition => defs.contains_key(&body),
        ParamKind::Invalid => false,
    };
    if !legal {
        return None;
    }

    let value = match kind {
        ParamKind::Definition => body,
        _ => body
            .strip_prefix(open)
            .and_then(|inner| inner.strip_suffix(close))?
            .to_string(),
    };

    Some(Parameter { kind, value })
}

/// True if any `<` in the element body is followed by whitespace or `/`.
fn has_closing_or_spaced_tag(body: &str) -> bool {
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '<' {
            if let Some(&next) = chars.peek() {
                if next == '/' || next.is_whitespace() {
                    return true;
                }
            }
        }
    }
    false
}
