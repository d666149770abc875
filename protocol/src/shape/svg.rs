//! # SVG Normalization and Command Parsing
//!
//! The canvas accepts a deliberately small slice of the SVG path grammar:
//! absolute/relative moveto, lineto, horizontal, vertical, and closepath,
//! plus a three-command circle form (`X n Y n R n`). Coordinates are signed
//! decimal integers in ASCII. Whitespace between tokens is optional and
//! commas are accepted as separators.
//!
//! Parsing happens in two stages: a lexical pass that splits the string
//! into command letters and numbers (the same pass drives `normalize`),
//! and a grammar pass that enforces per-command arity.
//!
//! ## Canonical form
//!
//! `normalize` strips whitespace and collapses separators so that
//! `"   M 10 10 L 5 , 5 h -3 Z"` becomes `"M10,10L5,5h-3Z"`. Numbers are
//! joined by a single comma; commands attach directly to their neighbors.

use thiserror::Error;

/// Errors produced while lexing or parsing a shape SVG string.
///
/// The message is for humans; callers map any variant to the wire error
/// `InvalidShapeSvgString` carrying the offending string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SvgParseError {
    #[error("empty svg string")]
    Empty,

    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("unknown command {0:?}")]
    UnknownCommand(char),

    #[error("command {0:?} is missing coordinates")]
    MissingCoordinates(char),

    #[error("stray number outside any command")]
    StrayNumber,

    #[error("path must begin with a moveto command")]
    MissingMoveto,

    #[error("circle string must contain exactly X, Y and R once each")]
    MalformedCircle,
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

/// A lexical token: a command letter or a signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Command(char),
    Number(i64),
}

/// Splits an SVG string into command letters and signed integers.
///
/// A `-` terminates any number in progress and starts a new one, so
/// `"10-3"` lexes as `10, -3` — this is what makes separators between a
/// number and a following negative number optional.
fn tokenize(svg: &str) -> Result<Vec<Token>, SvgParseError> {
    let mut tokens = Vec::new();
    let mut digits = String::new();

    let mut flush = |digits: &mut String, tokens: &mut Vec<Token>| -> Result<(), SvgParseError> {
        if !digits.is_empty() {
            let value = digits
                .parse::<i64>()
                .map_err(|_| SvgParseError::StrayNumber)?;
            tokens.push(Token::Number(value));
            digits.clear();
        }
        Ok(())
    };

    for ch in svg.chars() {
        match ch {
            'A'..='Z' | 'a'..='z' => {
                flush(&mut digits, &mut tokens)?;
                tokens.push(Token::Command(ch));
            }
            '0'..='9' => digits.push(ch),
            '-' => {
                flush(&mut digits, &mut tokens)?;
                digits.push(ch);
            }
            ' ' | '\t' | '\n' | '\r' | ',' => flush(&mut digits, &mut tokens)?,
            other => return Err(SvgParseError::UnexpectedChar(other)),
        }
    }
    flush(&mut digits, &mut tokens)?;

    if tokens.is_empty() {
        return Err(SvgParseError::Empty);
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Rewrites an SVG string into canonical form: no whitespace, numbers
/// joined by single commas, commands attached directly.
///
/// Normalization is purely lexical; it succeeds for any string the lexer
/// accepts, whether or not the command grammar later holds up. Strings the
/// lexer rejects are returned unchanged — they will fail parsing anyway,
/// and the original text makes a better error payload.
pub fn normalize(svg: &str) -> String {
    let Ok(tokens) = tokenize(svg) else {
        return svg.to_string();
    };

    let mut out = String::with_capacity(svg.len());
    let mut prev_was_number = false;
    for token in tokens {
        match token {
            Token::Command(c) => {
                out.push(c);
                prev_was_number = false;
            }
            Token::Number(n) => {
                if prev_was_number {
                    out.push(',');
                }
                out.push_str(&n.to_string());
                prev_was_number = true;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Path commands
// ---------------------------------------------------------------------------

/// A single parsed path command.
///
/// `H`/`h` store their coordinate in `x` with `y = 0`; `V`/`v` store it in
/// `y` with `x = 0`; `Z`/`z` store `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathCommand {
    pub cmd: char,
    pub x: i64,
    pub y: i64,
}

/// Parses a path SVG string into its command sequence.
///
/// Supported commands (case-sensitive; uppercase absolute, lowercase
/// relative): `M m L l H h V v Z z`. Arity is strict: two coordinates for
/// moveto/lineto, one for horizontal/vertical, none for closepath. The
/// first command must be a moveto.
pub fn parse_path_commands(svg: &str) -> Result<Vec<PathCommand>, SvgParseError> {
    let tokens = tokenize(svg)?;
    let mut commands = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    let mut next_number = |iter: &mut std::iter::Peekable<std::vec::IntoIter<Token>>,
                           cmd: char|
     -> Result<i64, SvgParseError> {
        match iter.next() {
            Some(Token::Number(n)) => Ok(n),
            _ => Err(SvgParseError::MissingCoordinates(cmd)),
        }
    };

    while let Some(token) = iter.next() {
        let cmd = match token {
            Token::Command(c) => c,
            Token::Number(_) => return Err(SvgParseError::StrayNumber),
        };
        let parsed = match cmd {
            'M' | 'm' | 'L' | 'l' => {
                let x = next_number(&mut iter, cmd)?;
                let y = next_number(&mut iter, cmd)?;
                PathCommand { cmd, x, y }
            }
            'H' | 'h' => {
                let x = next_number(&mut iter, cmd)?;
                PathCommand { cmd, x, y: 0 }
            }
            'V' | 'v' => {
                let y = next_number(&mut iter, cmd)?;
                PathCommand { cmd, x: 0, y }
            }
            'Z' | 'z' => PathCommand { cmd, x: 0, y: 0 },
            other => return Err(SvgParseError::UnknownCommand(other)),
        };
        commands.push(parsed);
    }

    match commands.first() {
        Some(first) if first.cmd == 'M' || first.cmd == 'm' => Ok(commands),
        _ => Err(SvgParseError::MissingMoveto),
    }
}

// ---------------------------------------------------------------------------
// Circle commands
// ---------------------------------------------------------------------------

/// A single parsed circle command: `X`, `Y`, or `R` with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleCommand {
    pub cmd: char,
    pub val: i64,
}

/// Parses a circle SVG string.
///
/// A circle string contains exactly three commands — `X n`, `Y n`, `R n` —
/// in any order, each exactly once. Any other command (including a stray
/// `M`) is a parse error.
pub fn parse_circle_commands(svg: &str) -> Result<Vec<CircleCommand>, SvgParseError> {
    let tokens = tokenize(svg)?;
    let mut commands = Vec::new();
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        let cmd = match token {
            Token::Command(c) => c,
            Token::Number(_) => return Err(SvgParseError::StrayNumber),
        };
        if !matches!(cmd, 'X' | 'Y' | 'R') {
            return Err(SvgParseError::UnknownCommand(cmd));
        }
        let val = match iter.next() {
            Some(Token::Number(n)) => n,
            _ => return Err(SvgParseError::MissingCoordinates(cmd)),
        };
        commands.push(CircleCommand { cmd, val });
    }

    let mut seen = ['\0'; 3];
    if commands.len() != 3 {
        return Err(SvgParseError::MalformedCircle);
    }
    for (slot, c) in seen.iter_mut().zip(&commands) {
        *slot = c.cmd;
    }
    for expected in ['X', 'Y', 'R'] {
        if !seen.contains(&expected) {
            return Err(SvgParseError::MalformedCircle);
        }
    }
    Ok(commands)
}
