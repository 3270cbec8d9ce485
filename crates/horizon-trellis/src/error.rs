//! Error types for the host-renderer backend.

use horizon_trellis_core::BridgeError;

/// Result type alias for host-tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while applying the commit stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No node implementation matches the element type and the toolkit
    /// metadata knows no such class either.
    #[error("Unknown element type '{type_name}'")]
    UnknownElementType {
        /// The offending element type, verbatim from the caller.
        type_name: String,
    },

    /// A child was attached to a parent that satisfies none of the container
    /// capabilities the child understands. This is a programming error in
    /// the element tree, not a recoverable condition.
    #[error("Cannot attach '{child}' to '{parent}': parent satisfies no supported container capability")]
    UnsupportedChild {
        /// Element type of the parent.
        parent: String,
        /// Element type of the child.
        child: String,
    },

    /// A commit-protocol entry point referenced a node that is no longer in
    /// the host tree.
    #[error("Node is no longer part of the host tree")]
    NodeGone,

    /// The foreign-function layer failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl Error {
    /// Create an unknown-element-type error.
    pub fn unknown_element_type(type_name: impl Into<String>) -> Self {
        Self::UnknownElementType {
            type_name: type_name.into(),
        }
    }

    /// Create an unsupported-child error.
    pub fn unsupported_child(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::UnsupportedChild {
            parent: parent.into(),
            child: child.into(),
        }
    }
}
