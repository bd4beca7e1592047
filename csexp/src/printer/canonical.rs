use crate::value::Value;

enum Frame<'a> {
    Value(&'a Value),
    Close,
}

/// Serialize a value into the canonical length-prefixed form.
///
/// Atoms become `<byte-length>:<raw-bytes>` and lists concatenate their
/// children between `(` and `)` with no separator. No two distinct trees
/// share a canonical form, and the output never depends on settings, so this
/// is the form to hash or sign.
pub fn dumps_canonical(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stack = vec![Frame::Value(value)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Value(Value::Atom(atom)) => {
                let bytes = atom.as_bytes();
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(bytes);
            }
            Frame::Value(Value::List(items)) => {
                out.push(b'(');
                stack.push(Frame::Close);
                stack.extend(items.iter().rev().map(Frame::Value));
            }
            Frame::Close => out.push(b')'),
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::dumps_canonical;
    use crate::value::{Atom, Value};

    #[test]
    fn atoms_are_length_prefixed_without_separators() {
        let value = Value::list(vec![Value::atom("a"), Value::atom("bc")]);
        assert_eq!(dumps_canonical(&value), b"(1:a2:bc)");
    }

    #[test]
    fn preserves_binary_payloads_exactly() {
        let value = Value::Atom(Atom::from_bytes(vec![0x00, 0xff, 0x28]));
        assert_eq!(dumps_canonical(&value), b"3:\x00\xff\x28");
    }

    #[test]
    fn counts_bytes_not_characters() {
        assert_eq!(dumps_canonical(&Value::atom("caf\u{e9}")), "4:caf\u{e9}".as_bytes());
    }

    #[test]
    fn nested_and_empty_lists() {
        let value = Value::list(vec![
            Value::list(vec![]),
            Value::list(vec![Value::atom("")]),
        ]);
        assert_eq!(dumps_canonical(&value), b"(()(0:))");
    }
}
