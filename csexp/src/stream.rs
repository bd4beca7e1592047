//! Incremental parsing of s-expressions from a growing byte buffer.
//!
//! [`StreamParser`] owns the buffer and a consumed offset and extracts
//! complete top-level values as soon as they are unambiguously delimited,
//! without re-scanning consumed bytes. [`iter_parse`] wraps any reader as a
//! lazy iterator over the values of a stream.
use std::io::Read;

use delegate::delegate;
use logos::Logos;

use crate::lexer::{is_whitespace, note_atom_size, LexErrorKind, RawToken};
use crate::parser::{assemble, ParseError, Result, Span, Token};
use crate::scan::Scan;
use crate::settings::Settings;
use crate::value::Value;

/// Outcome of a [`StreamParser::step`] call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A complete top-level value, with the number of input bytes this step
    /// consumed (leading whitespace, the value, and trailing whitespace).
    Complete(Value, usize),
    /// The buffered input is a valid prefix but no complete value is
    /// available yet; feed more bytes and step again.
    Incomplete,
}

enum Extract {
    Complete { tokens: Vec<Token>, end: usize },
    Incomplete,
    Error(ParseError),
}

/// Incremental parser over a growing buffer.
///
/// Values are yielded strictly in input order. The parser holds mutable
/// stream state and is meant for a single owner; share [`Settings`] instead
/// if several streams use the same options.
#[derive(Debug)]
pub struct StreamParser {
    settings: Settings,
    buf: Vec<u8>,
    /// Bytes of `buf` already consumed by yielded values.
    consumed: usize,
    /// Absolute stream offset of `buf[0]`, for diagnostics after compaction.
    base: usize,
    finished: bool,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        StreamParser {
            settings,
            buf: Vec::new(),
            consumed: 0,
            base: 0,
            finished: false,
        }
    }

    /// Append a chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Mark the end of the stream.
    ///
    /// A trailing bare token that was only waiting for a delimiter can then
    /// be yielded; a structurally incomplete tail becomes a hard error on
    /// the next [`step`](Self::step).
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Absolute stream offset of the first unconsumed byte.
    pub fn offset(&self) -> usize {
        self.base + self.consumed
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Try to extract the next complete top-level value.
    ///
    /// Returns [`Step::Incomplete`] when the buffered bytes are a valid but
    /// incomplete prefix; this is not an error, and no input is consumed. A
    /// hard error means the buffered prefix can never become valid, no
    /// matter what bytes follow.
    pub fn step(&mut self) -> Result<Step> {
        let origin = self.base + self.consumed;

        let outcome = {
            let region = &self.buf[self.consumed..];
            let settings = &self.settings;
            let mut lexer = RawToken::lexer(region);
            let mut tokens: Vec<Token> = Vec::new();
            let mut spans: Vec<Span> = Vec::new();
            let mut open_stack: Vec<usize> = Vec::new();

            loop {
                let Some(token) = lexer.next() else {
                    break if open_stack.is_empty() {
                        Extract::Incomplete
                    } else if let (true, Some(pos)) = (self.finished, open_stack.last()) {
                        Extract::Error(ParseError::UnclosedList {
                            open: origin + spans[*pos].start,
                            at: origin + region.len(),
                        })
                    } else {
                        Extract::Incomplete
                    };
                };

                let span = lexer.span();
                let token = match token {
                    Ok(token) => token,
                    Err(kind) => {
                        break if !self.finished && error_may_extend(&kind, &span, region) {
                            Extract::Incomplete
                        } else {
                            Extract::Error(
                                ParseError::from_lex(kind, span, region.len()).offset_by(origin),
                            )
                        };
                    }
                };

                let bare = matches!(token, RawToken::Bare(_));
                match token {
                    RawToken::Open => {
                        open_stack.push(tokens.len());
                        tokens.push(Token::List(usize::MAX));
                        spans.push(span);
                    }
                    RawToken::Close => {
                        let Some(pos) = open_stack.pop() else {
                            break Extract::Error(ParseError::UnexpectedClose {
                                at: origin + span.start,
                            });
                        };
                        tokens[pos] = Token::List(tokens.len() - pos - 1);
                        spans[pos].end = span.end;
                        if open_stack.is_empty() {
                            break Extract::Complete { tokens, end: span.end };
                        }
                    }
                    RawToken::Comment => {
                        if !settings.allow_comments {
                            break Extract::Error(ParseError::UnknownAtomStart {
                                at: origin + span.start,
                            });
                        }
                    }
                    RawToken::Verbatim(atom)
                    | RawToken::Quoted(atom)
                    | RawToken::Hex(atom)
                    | RawToken::Base64(atom)
                    | RawToken::Bare(atom) => {
                        note_atom_size(&atom, settings);
                        tokens.push(Token::Atom(atom));
                        spans.push(span.clone());
                        if open_stack.is_empty() {
                            // a bare token that touches the end of the buffer
                            // is only delimited once something follows it
                            break if !bare || span.end < region.len() || self.finished {
                                Extract::Complete { tokens, end: span.end }
                            } else {
                                Extract::Incomplete
                            };
                        }
                    }
                }
            }
        };

        match outcome {
            Extract::Complete { tokens, end } => Ok(self.complete(tokens, end)),
            Extract::Incomplete => Ok(Step::Incomplete),
            Extract::Error(err) => Err(err),
        }
    }

    fn complete(&mut self, mut tokens: Vec<Token>, end: usize) -> Step {
        let (value, _) = assemble(&mut tokens, 0);

        // consume the value plus any whitespace that delimits it
        let mut trailing = Scan::new(&self.buf[self.consumed + end..]);
        while !trailing.at_end() && trailing.peek().is_some_and(is_whitespace) {
            trailing.bump();
        }
        let consumed_here = end + trailing.pos();
        self.consumed += consumed_here;
        self.compact();

        Step::Complete(value, consumed_here)
    }

    /// Drop consumed bytes from the front of the buffer, amortized so a long
    /// stream of values does not grow the buffer without bound.
    fn compact(&mut self) {
        if self.consumed >= 4096 && self.consumed * 2 >= self.buf.len() {
            self.buf.drain(..self.consumed);
            self.base += self.consumed;
            self.consumed = 0;
        }
    }
}

/// Whether a lex failure could still resolve once more bytes arrive.
fn error_may_extend(kind: &LexErrorKind, span: &Span, region: &[u8]) -> bool {
    match kind {
        LexErrorKind::UnexpectedEof | LexErrorKind::Unterminated { .. } => true,
        // a digit run reaching the end of the buffer may yet become a
        // length-prefixed atom
        LexErrorKind::UnknownAtomStart => {
            span.start < region.len()
                && region[span.start..].iter().all(|byte| byte.is_ascii_digit())
        }
        _ => false,
    }
}

/// Error yielded by [`IterParse`]: the byte source failed, or the stream
/// carried invalid s-expression data.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to read from the byte source")]
    Io(#[from] std::io::Error),
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Lazily parse every value in a byte stream, with default [`Settings`].
///
/// Reads from the source in chunks as values are pulled; a pull blocks only
/// while the source itself blocks.
pub fn iter_parse<R: Read>(reader: R) -> IterParse<R> {
    iter_parse_with(reader, Settings::default())
}

/// Lazily parse every value in a byte stream.
pub fn iter_parse_with<R: Read>(reader: R, settings: Settings) -> IterParse<R> {
    IterParse {
        parser: StreamParser::with_settings(settings),
        reader,
        chunk: vec![0; CHUNK_SIZE].into_boxed_slice(),
        done: false,
    }
}

/// Iterator over the top-level values of a byte stream.
pub struct IterParse<R> {
    parser: StreamParser,
    reader: R,
    chunk: Box<[u8]>,
    done: bool,
}

impl<R> IterParse<R> {
    delegate! {
        to self.parser {
            /// Absolute stream offset of the first unconsumed byte.
            pub fn offset(&self) -> usize;
            pub fn settings(&self) -> &Settings;
        }
    }
}

impl<R: Read> Iterator for IterParse<R> {
    type Item = std::result::Result<Value, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.parser.step() {
                Ok(Step::Complete(value, _)) => return Some(Ok(value)),
                Ok(Step::Incomplete) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }

            if self.parser.is_finished() {
                self.done = true;
                return None;
            }

            match self.reader.read(&mut self.chunk) {
                Ok(0) => self.parser.finish(),
                Ok(read) => self.parser.feed(&self.chunk[..read]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{iter_parse, Step, StreamError, StreamParser};
    use crate::parser::ParseError;
    use crate::value::Value;
    use std::io::Read;

    fn list(names: &[&str]) -> Value {
        Value::List(names.iter().map(|name| Value::atom(*name)).collect())
    }

    #[test]
    fn waits_for_the_closing_paren() {
        let mut parser = StreamParser::new();
        parser.feed(b"(a b");
        assert_eq!(parser.step(), Ok(Step::Incomplete));
        assert_eq!(parser.offset(), 0);

        parser.feed(b")");
        assert_eq!(parser.step(), Ok(Step::Complete(list(&["a", "b"]), 5)));
        assert_eq!(parser.offset(), 5);
    }

    #[test]
    fn bare_tokens_wait_for_a_delimiter() {
        let mut parser = StreamParser::new();
        parser.feed(b"ab");
        assert_eq!(parser.step(), Ok(Step::Incomplete));

        parser.feed(b"c ");
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("abc"), 4)));
    }

    #[test]
    fn finish_flushes_a_trailing_token() {
        let mut parser = StreamParser::new();
        parser.feed(b"abc");
        assert_eq!(parser.step(), Ok(Step::Incomplete));

        parser.finish();
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("abc"), 3)));
        assert_eq!(parser.step(), Ok(Step::Incomplete));
    }

    #[test]
    fn self_delimited_atoms_do_not_wait() {
        let mut parser = StreamParser::new();
        parser.feed(b"3:abc");
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("abc"), 5)));
    }

    #[test]
    fn yields_buffered_values_in_order() {
        let mut parser = StreamParser::new();
        parser.feed(b"(a) (b) ");
        assert_eq!(parser.step(), Ok(Step::Complete(list(&["a"]), 4)));
        assert_eq!(parser.step(), Ok(Step::Complete(list(&["b"]), 4)));
        assert_eq!(parser.step(), Ok(Step::Incomplete));
    }

    #[test]
    fn verbatim_payloads_may_split_across_chunks() {
        let mut parser = StreamParser::new();
        parser.feed(b"5:ab");
        assert_eq!(parser.step(), Ok(Step::Incomplete));
        parser.feed(b"cde");
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("abcde"), 7)));
    }

    #[test]
    fn length_prefixes_may_split_across_chunks() {
        let mut parser = StreamParser::new();
        parser.feed(b"3");
        assert_eq!(parser.step(), Ok(Step::Incomplete));
        parser.feed(b":abc");
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("abc"), 5)));
    }

    #[test]
    fn escapes_may_split_across_chunks() {
        let mut parser = StreamParser::new();
        parser.feed(b"\"a\\");
        assert_eq!(parser.step(), Ok(Step::Incomplete));
        parser.feed(b"nb\"");
        assert_eq!(parser.step(), Ok(Step::Complete(Value::atom("a\nb"), 6)));
    }

    #[test]
    fn invalid_input_is_a_hard_error() {
        let mut parser = StreamParser::new();
        parser.feed(b"(a \x01)");
        assert_eq!(parser.step(), Err(ParseError::UnknownAtomStart { at: 3 }));
    }

    #[test]
    fn errors_report_absolute_offsets() {
        let mut parser = StreamParser::new();
        parser.feed(b"(a) \x01");
        assert!(matches!(parser.step(), Ok(Step::Complete(_, 4))));
        assert_eq!(parser.step(), Err(ParseError::UnknownAtomStart { at: 4 }));
    }

    #[test]
    fn finish_turns_an_open_list_into_an_error() {
        let mut parser = StreamParser::new();
        parser.feed(b"(a");
        assert_eq!(parser.step(), Ok(Step::Incomplete));

        parser.finish();
        assert_eq!(
            parser.step(),
            Err(ParseError::UnclosedList { open: 0, at: 2 })
        );
    }

    #[test]
    fn long_streams_compact_the_buffer() {
        let mut parser = StreamParser::new();
        for _ in 0..2000 {
            parser.feed(b"(a) ");
        }
        for _ in 0..2000 {
            assert_eq!(parser.step(), Ok(Step::Complete(list(&["a"]), 4)));
        }
        assert_eq!(parser.offset(), 8000);
        assert_eq!(parser.step(), Ok(Step::Incomplete));
    }

    #[test]
    fn iterates_over_a_reader() {
        let values: Vec<_> = iter_parse(std::io::Cursor::new(b"(a b) 3:abc (c)".to_vec()))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![list(&["a", "b"]), Value::atom("abc"), list(&["c"])]);
    }

    /// Reader that trickles one byte per read call.
    struct Trickle<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let Some(&byte) = self.data.get(self.pos) else {
                return Ok(0);
            };
            buf[0] = byte;
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn iterates_over_a_trickling_reader() {
        let data = b"(a (b c)) \"x y\"";
        let values: Vec<_> = iter_parse(Trickle { data, pos: 0 })
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], Value::atom("x y"));
    }

    #[test]
    fn reader_failures_surface_as_io_errors() {
        struct Failing;

        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "source failed"))
            }
        }

        let mut iter = iter_parse(Failing);
        assert!(matches!(iter.next(), Some(Err(StreamError::Io(_)))));
        assert!(iter.next().is_none());
    }
}
