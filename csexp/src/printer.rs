//! Print value trees as s-expression output.
//!
//! Two independent serializations exist: the canonical form, a deterministic
//! byte string fit for hashing or signing, and the advanced form, a readable
//! text rendering. Neither mutates the tree, and both walk it with an
//! explicit stack so deeply nested values cannot exhaust the call stack.
mod advanced;
mod canonical;

pub use advanced::{dumps_advanced, dumps_advanced_with};
pub use canonical::dumps_canonical;
