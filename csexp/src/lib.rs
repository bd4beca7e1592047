//! S-expressions as a data format, as specified by RFC 9804.
//!
//! # Syntax
//!
//! - **Lists** are sequences of values, delimited on the outside by `(` and
//!   `)` and separated by whitespace.
//!
//! - **Atoms** are strings of bytes, written in one of five encodings:
//!
//!    - *Verbatim*: `<n>:<bytes>`, where `<n>` counts the raw payload bytes.
//!    - *Quoted*: `"..."` with C-style escapes (`\n`, `\t`, `\xHH`, three
//!      octal digits, and backslash line splicing).
//!    - *Token*: a bare word such as `rsa-pkcs1/sha256`, permitted when the
//!      string starts with a letter or one of `-./_*+=` and uses only token
//!      characters.
//!    - *Hexadecimal*: `#6162 63#`, hex digit pairs with optional interior
//!      whitespace.
//!    - *Base64*: `|YWJj|`, standard alphabet and padding with optional
//!      interior whitespace.
//!
//!   The quoted, hexadecimal and base64 forms also accept a decimal prefix
//!   declaring the decoded byte length, which the parser verifies.
//!
//! - **Comments** begin with a `;` and extend to the end of the line.
//!
//! Parsing yields a [`Value`] tree of atoms and lists. Printing offers the
//! byte-exact canonical form ([`dumps_canonical`]) and a readable advanced
//! form ([`dumps_advanced`]); [`Settings`] carries the knobs for both
//! directions. For input that arrives in pieces, [`stream::StreamParser`]
//! and [`iter_parse`] extract each top-level value as soon as it is
//! complete.
pub(crate) mod escape;
pub(crate) mod lexer;
pub(crate) mod scan;

pub mod parser;
pub mod printer;
pub mod settings;
pub mod stream;
pub mod value;

pub use parser::{parse, parse_all, parse_all_with, parse_with, ParseError};
pub use printer::{dumps_advanced, dumps_advanced_with, dumps_canonical};
pub use settings::Settings;
pub use stream::{iter_parse, iter_parse_with, Step, StreamError, StreamParser};
pub use value::{Atom, Value};
