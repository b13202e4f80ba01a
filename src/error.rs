//! Crate error type
//!
//! Parse and compile failures are all-or-nothing: no partial `Document` or
//! partial `CompiledPath` is ever returned alongside an error.

use thiserror::Error;

/// Errors produced by parsing, path compilation, and node-set indexing.
///
/// Evaluation itself never fails: a path that matches nothing yields an
/// empty node set, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Structural violation found by the tokenizer or tree builder:
    /// bad escaping, bad quoting, unterminated markup, content after the
    /// root element.
    #[error("malformed XML at byte {position}: {message}")]
    MalformedXml { message: String, position: usize },

    /// A closing tag did not match the innermost open element.
    #[error("mismatched closing tag </{found}> at byte {position}, expected </{expected}>")]
    MismatchedTag {
        expected: String,
        found: String,
        position: usize,
    },

    /// End of input was reached with elements still open. Names the deepest
    /// open element and the byte offset where its start tag began.
    #[error("unclosed element <{name}> opened at byte {position}")]
    UnclosedTag { name: String, position: usize },

    /// The path expression failed to compile: empty expression, unknown
    /// prefix, or syntax outside the supported grammar. Reported before any
    /// evaluation is attempted.
    #[error("invalid path expression: {0}")]
    InvalidPath(String),

    /// Out-of-bounds access on a node set.
    #[error("index {index} out of bounds for node set of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>, position: usize) -> Self {
        Error::MalformedXml {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn invalid_path(message: impl Into<String>) -> Self {
        Error::InvalidPath(message.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
