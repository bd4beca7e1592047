use base64::Engine as _;
use pretty::DocAllocator as _;

use crate::escape::{escape_text, is_token};
use crate::settings::Settings;
use crate::value::{Atom, Value};

/// Width handed to the layout engine. Line breaks are decided by nesting
/// rather than by measure, so the width does not change the output.
const RENDER_WIDTH: usize = 80;

/// Serialize a value into the readable advanced form with default
/// [`Settings`].
pub fn dumps_advanced(value: &Value) -> String {
    dumps_advanced_with(value, &Settings::default())
}

/// Serialize a value into the readable advanced form.
///
/// Text atoms print as bare tokens when they match the token grammar and as
/// quoted strings otherwise; binary atoms print as hex below the settings'
/// base64 threshold and as base64 from it upward. Lists join their children
/// with spaces. With `pretty_indent` set, each non-empty nested list starts
/// on a new, indented line; with `None` the output is a single line.
pub fn dumps_advanced_with(value: &Value, settings: &Settings) -> String {
    match settings.pretty_indent {
        Some(indent) => indented(value, indent, settings),
        None => compact(value, settings),
    }
}

fn atom_text(atom: &Atom, settings: &Settings) -> String {
    match atom.as_text() {
        Some(text) if is_token(text) => text.to_string(),
        Some(text) => escape_text(text),
        None => {
            let bytes = atom.as_bytes();
            if bytes.len() >= settings.prefer_base64_min_len {
                let mut out = String::with_capacity(bytes.len() / 3 * 4 + 6);
                out.push('|');
                base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut out);
                out.push('|');
                out
            } else {
                format!("#{}#", hex::encode(bytes))
            }
        }
    }
}

enum Frame<'a> {
    Value(&'a Value),
    Close,
}

fn compact(value: &Value, settings: &Settings) -> String {
    let mut out = String::new();
    let mut needs_whitespace = false;
    let mut stack = vec![Frame::Value(value)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Value(Value::Atom(atom)) => {
                if needs_whitespace {
                    out.push(' ');
                }
                out.push_str(&atom_text(atom, settings));
                needs_whitespace = true;
            }
            Frame::Value(Value::List(items)) => {
                if needs_whitespace {
                    out.push(' ');
                }
                out.push('(');
                needs_whitespace = false;
                stack.push(Frame::Close);
                stack.extend(items.iter().rev().map(Frame::Value));
            }
            Frame::Close => {
                out.push(')');
                needs_whitespace = true;
            }
        }
    }

    out
}

enum DocFrame<'a> {
    Value(&'a Value),
    Close { position: usize, items: &'a [Value] },
}

/// Whether a child starts on its own indented line.
fn breaks_line(value: &Value) -> bool {
    matches!(value, Value::List(items) if !items.is_empty())
}

fn indented(value: &Value, indent: usize, settings: &Settings) -> String {
    let arena = pretty::Arena::<()>::new();
    let mut docs = Vec::new();
    let mut stack = vec![DocFrame::Value(value)];

    while let Some(frame) = stack.pop() {
        match frame {
            DocFrame::Value(Value::Atom(atom)) => {
                docs.push(arena.text(atom_text(atom, settings)));
            }
            DocFrame::Value(Value::List(items)) => {
                stack.push(DocFrame::Close {
                    position: docs.len(),
                    items,
                });
                stack.extend(items.iter().rev().map(DocFrame::Value));
            }
            DocFrame::Close { position, items } => {
                let children: Vec<_> = docs.drain(position..).collect();
                let mut inner = arena.nil();
                for (index, (child, item)) in children.into_iter().zip(items).enumerate() {
                    if breaks_line(item) {
                        inner = inner.append(arena.hardline()).append(child);
                    } else {
                        if index > 0 {
                            inner = inner.append(arena.text(" "));
                        }
                        inner = inner.append(child);
                    }
                }
                docs.push(
                    arena
                        .text("(")
                        .append(inner.nest(indent as isize))
                        .append(arena.text(")")),
                );
            }
        }
    }

    let mut out = String::new();
    if let Some(doc) = docs.pop() {
        let _ = doc.render_fmt(RENDER_WIDTH, &mut out);
    }
    out
}
