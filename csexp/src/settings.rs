//! Options threaded through parse and print calls.

/// Read-only options for parsing and printing.
///
/// A settings value never changes during a call, so one instance may be
/// shared by reference across any number of concurrent invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Recognize `;` line comments and treat them as whitespace.
    pub allow_comments: bool,
    /// Byte size at which an atom triggers the large-atom warning.
    pub large_atom_threshold: usize,
    /// Whether to emit the large-atom warning at all.
    pub warn_on_large_atom: bool,
    /// Minimum byte length at which binary atoms print as base64 rather
    /// than hex in the advanced form.
    pub prefer_base64_min_len: usize,
    /// Indent width for nested lists in the advanced form; `None` produces
    /// compact single-line output.
    pub pretty_indent: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            allow_comments: true,
            large_atom_threshold: 1 << 20,
            warn_on_large_atom: true,
            prefer_base64_min_len: 48,
            pretty_indent: Some(2),
        }
    }
}

impl Settings {
    pub fn with_comments(mut self, allow: bool) -> Self {
        self.allow_comments = allow;
        self
    }

    pub fn with_large_atom_threshold(mut self, bytes: usize) -> Self {
        self.large_atom_threshold = bytes;
        self
    }

    pub fn with_warn_on_large_atom(mut self, warn: bool) -> Self {
        self.warn_on_large_atom = warn;
        self
    }

    pub fn with_prefer_base64_min_len(mut self, bytes: usize) -> Self {
        self.prefer_base64_min_len = bytes;
        self
    }

    pub fn with_pretty_indent(mut self, indent: Option<usize>) -> Self {
        self.pretty_indent = indent;
        self
    }
}
