//! Error types for the foreign-function bridge surface.

use std::fmt;

/// Errors surfaced by a [`crate::bridge::ForeignBridge`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The requested class does not exist in the toolkit's metadata.
    UnknownClass(String),
    /// The class exists but does not expose the requested method.
    UnknownMethod {
        /// The class that was targeted.
        class: String,
        /// The missing method name.
        method: String,
    },
    /// The object does not expose the requested property.
    UnknownProperty(String),
    /// The handle does not refer to a live native object.
    InvalidHandle,
    /// A value of the wrong type was passed across the boundary.
    TypeMismatch {
        /// The type the native side expected.
        expected: &'static str,
        /// A description of what was provided.
        got: &'static str,
    },
    /// The native call itself failed.
    Native(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClass(class) => write!(f, "Unknown native class: {class}"),
            Self::UnknownMethod { class, method } => {
                write!(f, "Class {class} has no method {method}")
            }
            Self::UnknownProperty(name) => write!(f, "Unknown property: {name}"),
            Self::InvalidHandle => write!(f, "Handle does not refer to a live native object"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch crossing the bridge: expected {expected}, got {got}")
            }
            Self::Native(msg) => write!(f, "Native call failed: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// A specialized Result type for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
