//! S-expression tree values.
use proptest::arbitrary::Arbitrary;
use smol_str::SmolStr;

/// A leaf value: decoded text, or raw bytes when the payload is not valid
/// UTF-8.
///
/// Construction normalizes the representation, so two atoms are equal exactly
/// when their payload bytes are equal. Atoms are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Atom(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Repr {
    Text(SmolStr),
    Bytes(Box<[u8]>),
}

impl Default for Repr {
    fn default() -> Self {
        Repr::Text(SmolStr::default())
    }
}

impl Atom {
    /// Build an atom from raw payload bytes.
    ///
    /// Bytes that form valid UTF-8 are stored as text; anything else is kept
    /// as raw bytes and preserved exactly on canonical round-trip.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        match String::from_utf8(bytes.into()) {
            Ok(text) => Atom(Repr::Text(text.into())),
            Err(err) => Atom(Repr::Bytes(err.into_bytes().into_boxed_slice())),
        }
    }

    /// Build a text atom.
    pub fn from_text(text: impl Into<SmolStr>) -> Self {
        Atom(Repr::Text(text.into()))
    }

    /// The payload, as the exact bytes the canonical form carries.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Text(text) => text.as_bytes(),
            Repr::Bytes(bytes) => bytes,
        }
    }

    /// The decoded text, if the payload is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match &self.0 {
            Repr::Text(text) => Some(text),
            Repr::Bytes(_) => None,
        }
    }

    /// Whether the payload is raw bytes rather than text.
    pub fn is_bytes(&self) -> bool {
        matches!(self.0, Repr::Bytes(_))
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Atom {
    fn from(text: &str) -> Self {
        Atom::from_text(text)
    }
}

impl From<String> for Atom {
    fn from(text: String) -> Self {
        Atom::from_text(text)
    }
}

impl From<SmolStr> for Atom {
    fn from(text: SmolStr) -> Self {
        Atom::from_text(text)
    }
}

impl From<Vec<u8>> for Atom {
    fn from(bytes: Vec<u8>) -> Self {
        Atom::from_bytes(bytes)
    }
}

impl From<&[u8]> for Atom {
    fn from(bytes: &[u8]) -> Self {
        Atom::from_bytes(bytes)
    }
}

/// An s-expression: an atom, or an ordered list of values.
///
/// Equality is structural. The empty list is a valid value and is distinct
/// from the empty atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Atom(Atom),
    List(Vec<Value>),
}

impl Value {
    pub fn atom(value: impl Into<Atom>) -> Self {
        Value::Atom(value.into())
    }

    pub fn list(items: impl Into<Vec<Value>>) -> Self {
        Value::List(items.into())
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Value::Atom(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(atom) => Some(atom),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::Atom(_) => None,
            Value::List(items) => Some(items),
        }
    }
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::Atom(atom)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Atom(text.into())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Atom(text.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl Arbitrary for Atom {
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;

        proptest::prop_oneof![
            any::<String>().prop_map(Atom::from),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Atom::from_bytes),
        ]
        .boxed()
    }
}

impl Arbitrary for Value {
    type Parameters = ();
    type Strategy = proptest::strategy::BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::*;

        let leaf = any::<Atom>().prop_map(Value::Atom);
        leaf.prop_recursive(8, 256, 10, |inner| {
            proptest::collection::vec(inner, 0..10).prop_map(Value::List)
        })
        .boxed()
    }
}

#[cfg(test)]
mod test {
    use super::{Atom, Value};
    use crate::printer::{dumps_advanced_with, dumps_canonical};
    use crate::settings::Settings;
    use crate::{parse, parse_with};
    use proptest::prelude::*;

    #[test]
    fn atoms_normalize_to_text() {
        let atom = Atom::from_bytes(b"abc".to_vec());
        assert_eq!(atom.as_text(), Some("abc"));
        assert_eq!(atom, Atom::from("abc"));

        let atom = Atom::from_bytes(vec![0xff, 0xfe]);
        assert!(atom.is_bytes());
        assert_eq!(atom.as_text(), None);
        assert_eq!(atom.as_bytes(), &[0xff, 0xfe]);
    }

    #[test]
    fn empty_list_is_not_an_empty_atom() {
        assert_ne!(Value::list(vec![]), Value::atom(""));
    }

    proptest! {
        #[test]
        fn canonical_round_trip(value: Value) {
            let bytes = dumps_canonical(&value);
            let parsed = parse(&bytes).unwrap();
            prop_assert_eq!(value, parsed);
        }

        #[test]
        fn canonical_is_deterministic(value: Value) {
            prop_assert_eq!(dumps_canonical(&value), dumps_canonical(&value));
        }

        #[test]
        fn advanced_then_canonical(value: Value, indent in proptest::option::of(0..8usize)) {
            let settings = Settings::default().with_pretty_indent(indent);
            let text = dumps_advanced_with(&value, &settings);
            let parsed = parse_with(&text, &settings).unwrap();
            prop_assert_eq!(dumps_canonical(&value), dumps_canonical(&parsed));
        }
    }
}
