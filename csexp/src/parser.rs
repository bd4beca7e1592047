//! Parse s-expression input into value trees.
use std::ops::Range;

use crate::lexer::{self, LexErrorKind};
use crate::settings::Settings;
use crate::value::{Atom, Value};

/// Byte span within the input.
pub type Span = Range<usize>;

/// Shorthand for a result specialised to parse errors.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// A list header, recording how many tokens its contents occupy.
    List(usize),
    Atom(Atom),
}

/// A lexed input: tokens in input order, with lists flattened behind a
/// header that spans their contents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseBuffer {
    pub(crate) tokens: Vec<Token>,
    pub(crate) spans: Vec<Span>,
}

/// Assemble the value starting at token `start`.
///
/// Returns the value and the index one past its last token. Atoms are moved
/// out of the buffer. The loop keeps its own frame stack, so input nesting
/// depth never translates into call-stack depth.
pub(crate) fn assemble(tokens: &mut [Token], start: usize) -> (Value, usize) {
    let mut stack: Vec<(usize, Vec<Value>)> = Vec::new();
    let mut index = start;

    loop {
        // close every list whose token range is exhausted
        while stack.last().is_some_and(|(end, _)| index >= *end) {
            if let Some((_, children)) = stack.pop() {
                let list = Value::List(children);
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(list),
                    None => return (list, index),
                }
            }
        }

        match &mut tokens[index] {
            Token::List(size) => {
                stack.push((index + 1 + *size, Vec::new()));
                index += 1;
            }
            Token::Atom(atom) => {
                let value = Value::Atom(std::mem::take(atom));
                index += 1;
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(value),
                    None => return (value, index),
                }
            }
        }
    }
}

/// Parse exactly one value, with default [`Settings`].
///
/// Anything other than whitespace (or comments) after the value is a
/// [`ParseError::TrailingData`] error.
pub fn parse(input: impl AsRef<[u8]>) -> Result<Value> {
    parse_with(input, &Settings::default())
}

/// Parse exactly one value.
pub fn parse_with(input: impl AsRef<[u8]>, settings: &Settings) -> Result<Value> {
    let source = input.as_ref();
    let mut buffer = lexer::lex(source, settings)?;

    if buffer.tokens.is_empty() {
        return Err(ParseError::UnexpectedEof { at: source.len() });
    }

    let (value, next) = assemble(&mut buffer.tokens, 0);
    if next < buffer.tokens.len() {
        return Err(ParseError::TrailingData {
            at: buffer.spans[next].start,
        });
    }

    Ok(value)
}

/// Parse every top-level value in the input, with default [`Settings`].
///
/// An input holding nothing but whitespace and comments yields an empty
/// sequence.
pub fn parse_all(input: impl AsRef<[u8]>) -> Result<Vec<Value>> {
    parse_all_with(input, &Settings::default())
}

/// Parse every top-level value in the input.
pub fn parse_all_with(input: impl AsRef<[u8]>, settings: &Settings) -> Result<Vec<Value>> {
    let mut buffer = lexer::lex(input.as_ref(), settings)?;
    let mut values = Vec::new();
    let mut index = 0;

    while index < buffer.tokens.len() {
        let (value, next) = assemble(&mut buffer.tokens, index);
        values.push(value);
        index = next;
    }

    Ok(values)
}

/// Error produced when parsing s-expression input.
///
/// Every variant carries the byte offset of the failure; `UnclosedList` also
/// records where the offending list was opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input at byte {at}")]
    UnexpectedEof { at: usize },
    #[error("trailing data after a complete value at byte {at}")]
    TrailingData { at: usize },
    #[error("list opened at byte {open} is never closed")]
    UnclosedList { open: usize, at: usize },
    #[error("unmatched `)` at byte {at}")]
    UnexpectedClose { at: usize },
    #[error("atom at byte {at} is missing its closing `{expected}`")]
    UnterminatedAtom { at: usize, expected: char },
    #[error("invalid escape sequence at byte {at}")]
    InvalidEscape { at: usize },
    #[error("declared length {declared} does not match payload length {actual} for the atom at byte {at}")]
    LengthMismatch {
        at: usize,
        declared: usize,
        actual: usize,
    },
    #[error("invalid encoding at byte {at}")]
    InvalidEncoding { at: usize },
    #[error("no atom or list starts at byte {at}")]
    UnknownAtomStart { at: usize },
}

impl ParseError {
    /// Byte offset at which the parse failed.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedEof { at }
            | ParseError::TrailingData { at }
            | ParseError::UnclosedList { at, .. }
            | ParseError::UnexpectedClose { at }
            | ParseError::UnterminatedAtom { at, .. }
            | ParseError::InvalidEscape { at }
            | ParseError::LengthMismatch { at, .. }
            | ParseError::InvalidEncoding { at }
            | ParseError::UnknownAtomStart { at } => *at,
        }
    }

    pub(crate) fn from_lex(kind: LexErrorKind, span: Span, end_of_input: usize) -> Self {
        match kind {
            LexErrorKind::UnknownAtomStart => ParseError::UnknownAtomStart { at: span.start },
            LexErrorKind::UnexpectedEof => ParseError::UnexpectedEof { at: end_of_input },
            LexErrorKind::Unterminated { expected } => ParseError::UnterminatedAtom {
                at: span.start,
                expected: expected as char,
            },
            LexErrorKind::InvalidEscape { at } => ParseError::InvalidEscape { at: span.end + at },
            LexErrorKind::InvalidEncoding { at } => ParseError::InvalidEncoding { at: span.end + at },
            LexErrorKind::LengthMismatch { declared, actual } => ParseError::LengthMismatch {
                at: span.start,
                declared,
                actual,
            },
        }
    }

    /// Shift every recorded offset by `base`, for diagnostics that refer to
    /// a position in a larger stream.
    pub(crate) fn offset_by(mut self, base: usize) -> Self {
        match &mut self {
            ParseError::UnexpectedEof { at }
            | ParseError::TrailingData { at }
            | ParseError::UnexpectedClose { at }
            | ParseError::UnterminatedAtom { at, .. }
            | ParseError::InvalidEscape { at }
            | ParseError::LengthMismatch { at, .. }
            | ParseError::InvalidEncoding { at }
            | ParseError::UnknownAtomStart { at } => *at += base,
            ParseError::UnclosedList { open, at } => {
                *open += base;
                *at += base;
            }
        }
        self
    }
}
