use logos::{Lexer, Logos};

use crate::escape::{self, EscapeError};
use crate::parser::{ParseBuffer, ParseError, Token};
use crate::scan::Scan;
use crate::settings::Settings;
use crate::value::Atom;

/// Lexer-level failure kind. Offsets inside `InvalidEscape` and
/// `InvalidEncoding` are relative to the payload region that follows the
/// matched prefix; the driver converts them to input offsets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum LexErrorKind {
    #[default]
    UnknownAtomStart,
    /// A verbatim payload ran past the end of the input.
    UnexpectedEof,
    /// A delimited atom is missing its closing byte.
    Unterminated { expected: u8 },
    InvalidEscape { at: usize },
    InvalidEncoding { at: usize },
    LengthMismatch { declared: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(error = LexErrorKind)]
#[logos(skip br"[ \t\r\n\x0c]+")]
pub(crate) enum RawToken {
    #[token(b"(")]
    Open,
    #[token(b")")]
    Close,
    #[regex(br";[^\r\n]*")]
    Comment,
    #[regex(br"[0-9]+:", verbatim)]
    Verbatim(Atom),
    #[regex(br#"[0-9]*""#, quoted)]
    Quoted(Atom),
    #[regex(br"[0-9]*#", hexadecimal)]
    Hex(Atom),
    #[regex(br"[0-9]*\|", base64_region)]
    Base64(Atom),
    #[regex(br"[a-zA-Z\-./_*+=][a-zA-Z0-9\-./_:*+=]*", bare)]
    Bare(Atom),
}

#[inline]
pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c')
}

fn parse_decimal(digits: &[u8]) -> Result<usize, LexErrorKind> {
    let mut value = 0usize;
    for &digit in digits {
        value = value
            .checked_mul(10)
            .and_then(|value| value.checked_add(usize::from(digit - b'0')))
            .ok_or(LexErrorKind::InvalidEncoding { at: 0 })?;
    }
    Ok(value)
}

/// Decimal length hint preceding a `"`, `#` or `|` delimiter, if any.
fn declared_len(slice: &[u8]) -> Result<Option<usize>, LexErrorKind> {
    let digits = &slice[..slice.len() - 1];
    if digits.is_empty() {
        Ok(None)
    } else {
        parse_decimal(digits).map(Some)
    }
}

fn check_declared(declared: Option<usize>, actual: usize) -> Result<(), LexErrorKind> {
    match declared {
        Some(declared) if declared != actual => Err(LexErrorKind::LengthMismatch { declared, actual }),
        _ => Ok(()),
    }
}

fn verbatim(lex: &mut Lexer<'_, RawToken>) -> Result<Atom, LexErrorKind> {
    let slice = lex.slice();
    let length = parse_decimal(&slice[..slice.len() - 1])?;
    let mut scan = Scan::new(lex.remainder());
    let payload = scan.take(length).ok_or(LexErrorKind::UnexpectedEof)?.to_vec();
    lex.bump(scan.pos());
    Ok(Atom::from_bytes(payload))
}

fn quoted(lex: &mut Lexer<'_, RawToken>) -> Result<Atom, LexErrorKind> {
    let declared = declared_len(lex.slice())?;
    let (bytes, consumed) = escape::scan_quoted(lex.remainder()).map_err(|err| match err {
        EscapeError::Unterminated => LexErrorKind::Unterminated { expected: b'"' },
        EscapeError::Invalid { at } => LexErrorKind::InvalidEscape { at },
    })?;
    lex.bump(consumed);
    check_declared(declared, bytes.len())?;
    Ok(Atom::from_bytes(bytes))
}

fn hexadecimal(lex: &mut Lexer<'_, RawToken>) -> Result<Atom, LexErrorKind> {
    let declared = declared_len(lex.slice())?;
    let mut scan = Scan::new(lex.remainder());
    let mut digits = Vec::new();

    let bytes = loop {
        let at = scan.pos();
        match scan.bump() {
            None => return Err(LexErrorKind::Unterminated { expected: b'#' }),
            Some(b'#') => {
                if digits.len() % 2 != 0 {
                    return Err(LexErrorKind::InvalidEncoding { at });
                }
                break hex::decode(&digits).map_err(|_| LexErrorKind::InvalidEncoding { at })?;
            }
            Some(digit) if digit.is_ascii_hexdigit() => digits.push(digit),
            Some(byte) if is_whitespace(byte) => {}
            Some(_) => return Err(LexErrorKind::InvalidEncoding { at }),
        }
    };

    lex.bump(scan.pos());
    check_declared(declared, bytes.len())?;
    Ok(Atom::from_bytes(bytes))
}

fn base64_region(lex: &mut Lexer<'_, RawToken>) -> Result<Atom, LexErrorKind> {
    use base64::Engine as _;

    let declared = declared_len(lex.slice())?;
    let mut scan = Scan::new(lex.remainder());
    let mut encoded = Vec::new();

    let close = loop {
        let at = scan.pos();
        match scan.bump() {
            None => return Err(LexErrorKind::Unterminated { expected: b'|' }),
            Some(b'|') => break at,
            Some(byte) if byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=') => {
                encoded.push(byte);
            }
            Some(byte) if is_whitespace(byte) => {}
            Some(_) => return Err(LexErrorKind::InvalidEncoding { at }),
        }
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .map_err(|_| LexErrorKind::InvalidEncoding { at: close })?;
    lex.bump(scan.pos());
    check_declared(declared, bytes.len())?;
    Ok(Atom::from_bytes(bytes))
}

fn bare(lex: &mut Lexer<'_, RawToken>) -> Atom {
    Atom::from_bytes(lex.slice().to_vec())
}

/// Large-atom observability hook.
pub(crate) fn note_atom_size(atom: &Atom, settings: &Settings) {
    if settings.warn_on_large_atom && atom.len() >= settings.large_atom_threshold {
        tracing::warn!(
            target: "csexp::lexer",
            bytes = atom.len(),
            "atom exceeds the large atom threshold"
        );
    }
}

/// Lex an entire input into a flat token buffer.
pub(crate) fn lex(source: &[u8], settings: &Settings) -> Result<ParseBuffer, ParseError> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();
    let mut spans = Vec::new();
    let mut open_stack = Vec::new();

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let token = token.map_err(|kind| ParseError::from_lex(kind, span.clone(), source.len()))?;

        match token {
            RawToken::Open => {
                open_stack.push(tokens.len());
                tokens.push(Token::List(usize::MAX));
                spans.push(span);
            }
            RawToken::Close => {
                let Some(pos) = open_stack.pop() else {
                    return Err(ParseError::UnexpectedClose { at: span.start });
                };
                tokens[pos] = Token::List(tokens.len() - pos - 1);
                spans[pos].end = span.end;
            }
            RawToken::Comment => {
                if !settings.allow_comments {
                    return Err(ParseError::UnknownAtomStart { at: span.start });
                }
            }
            RawToken::Verbatim(atom)
            | RawToken::Quoted(atom)
            | RawToken::Hex(atom)
            | RawToken::Base64(atom)
            | RawToken::Bare(atom) => {
                note_atom_size(&atom, settings);
                tokens.push(Token::Atom(atom));
                spans.push(span);
            }
        }
    }

    if let Some(pos) = open_stack.last() {
        return Err(ParseError::UnclosedList {
            open: spans[*pos].start,
            at: source.len(),
        });
    }

    Ok(ParseBuffer { tokens, spans })
}

#[cfg(test)]
mod test {
    use super::lex;
    use crate::parser::{ParseError, Token};
    use crate::settings::Settings;
    use crate::value::Atom;
    use rstest::rstest;

    fn atoms(source: &[u8]) -> Vec<Atom> {
        lex(source, &Settings::default())
            .unwrap()
            .tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Atom(atom) => Some(atom),
                Token::List(_) => None,
            })
            .collect()
    }

    #[rstest]
    #[case(b"3:abc".as_slice(), b"abc".as_slice())]
    #[case(b"0:".as_slice(), b"".as_slice())]
    #[case("7:caf\u{e9} x".as_bytes(), "caf\u{e9} x".as_bytes())]
    #[case(b"#616263#".as_slice(), b"abc".as_slice())]
    #[case(b"#61 62\n63#".as_slice(), b"abc".as_slice())]
    #[case(b"##".as_slice(), b"".as_slice())]
    #[case(b"3#616263#".as_slice(), b"abc".as_slice())]
    #[case(b"|YWJj|".as_slice(), b"abc".as_slice())]
    #[case(b"|YWJjZA==|".as_slice(), b"abcd".as_slice())]
    #[case(b"|YWJj ZA==|".as_slice(), b"abcd".as_slice())]
    #[case(b"4|YWJjZA==|".as_slice(), b"abcd".as_slice())]
    #[case(br#"3"abc""#.as_slice(), b"abc".as_slice())]
    #[case(br#""a\x00b""#.as_slice(), b"a\x00b".as_slice())]
    #[case(b"token-./_:*+=".as_slice(), b"token-./_:*+=".as_slice())]
    fn decodes_atoms(#[case] source: &[u8], #[case] payload: &[u8]) {
        assert_eq!(atoms(source), vec![Atom::from_bytes(payload.to_vec())]);
    }

    #[rstest]
    #[case(b"#61626#".as_slice())]
    #[case(b"#61xx#".as_slice())]
    #[case(b"|Y$Jj|".as_slice())]
    #[case(b"|YWJjZ|".as_slice())]
    fn rejects_malformed_encodings(#[case] source: &[u8]) {
        assert!(matches!(
            lex(source, &Settings::default()),
            Err(ParseError::InvalidEncoding { .. })
        ));
    }

    #[rstest]
    #[case(br#"4"abc""#.as_slice(), 4, 3)]
    #[case(b"2#616263#".as_slice(), 2, 3)]
    #[case(b"5|YWJj|".as_slice(), 5, 3)]
    fn rejects_length_hint_mismatches(#[case] source: &[u8], #[case] declared: usize, #[case] actual: usize) {
        assert_eq!(
            lex(source, &Settings::default()),
            Err(ParseError::LengthMismatch { at: 0, declared, actual })
        );
    }

    #[test]
    fn comments_lex_as_whitespace() {
        assert_eq!(atoms(b"a ; trailing ( comment\nb"), vec![Atom::from("a"), Atom::from("b")]);
    }

    #[test]
    fn comments_can_be_disabled() {
        let settings = Settings::default().with_comments(false);
        assert_eq!(
            lex(b"a ; no\n", &settings),
            Err(ParseError::UnknownAtomStart { at: 2 })
        );
    }

    #[test]
    fn digit_runs_are_not_tokens() {
        assert!(matches!(
            lex(b"123 abc", &Settings::default()),
            Err(ParseError::UnknownAtomStart { .. })
        ));
    }

    #[test]
    fn verbatim_lengths_count_bytes_not_chars() {
        // 2-byte UTF-8 payload declared as 2 bytes
        assert_eq!(atoms("2:\u{e9}".as_bytes()), vec![Atom::from("\u{e9}")]);
    }
}
