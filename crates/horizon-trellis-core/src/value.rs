//! Native handles and typed foreign-call values.
//!
//! Everything that crosses the foreign-function boundary is expressed with
//! the types in this module:
//!
//! - [`NativeHandle`] - opaque reference to an object owned by the native
//!   toolkit's object graph
//! - [`Value`] - typed container for call arguments, return values, property
//!   reads/writes, and signal payloads
//! - [`ConnectionToken`] - raw identifier of one native signal connection
//!
//! # Related Modules
//!
//! - [`crate::bridge`] - The trait that consumes and produces these types
//! - [`crate::signals`] - Connection bookkeeping on top of [`ConnectionToken`]

use std::fmt;

/// Opaque reference to an object instance in the native toolkit's object
/// graph.
///
/// Handles are only ever produced by the foreign-function bridge and carry no
/// meaning outside of it. A handle stays valid until the bridge releases the
/// underlying object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(u64);

impl NativeHandle {
    /// Wrap a raw handle value received from the bridge.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value, for interop and map keys.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of one raw native signal connection, as handed out by
/// [`crate::bridge::ForeignBridge::connect`].
///
/// Tokens are only meaningful to the bridge that produced them. Higher-level
/// code tracks connections through [`crate::signals::SignalStore`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionToken(u64);

impl ConnectionToken {
    /// Wrap a raw connection id received from the bridge.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw connection id.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// A typed value crossing the foreign-function boundary.
///
/// Covers the toolkit's scalar types plus handles and homogeneous lists.
/// Accessors return `None` on a variant mismatch rather than coercing, so a
/// caller that needs a specific type can surface a precise error.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Absence of a value (`NULL` on the native side).
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer (native indices, positions, badge counts).
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Double-precision float.
    F64(f64),
    /// UTF-8 string.
    Str(String),
    /// Reference to a native object.
    Handle(NativeHandle),
    /// Homogeneous list of values.
    List(Vec<Value>),
}

impl Value {
    /// `true` when this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The `i32` payload, widening from `U32` when it fits.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(n) => Some(*n),
            Self::U32(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    /// The `u32` payload, narrowing from `I32` when non-negative.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(n) => Some(*n),
            Self::I32(n) => u32::try_from(*n).ok(),
            _ => None,
        }
    }

    /// The `i64` payload, widening from the 32-bit variants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(n) => Some(*n),
            Self::I32(n) => Some(i64::from(*n)),
            Self::U32(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    /// The `f64` payload.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The handle payload, if any.
    pub fn as_handle(&self) -> Option<NativeHandle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }

    /// The list payload, if any.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NativeHandle> for Value {
    fn from(v: NativeHandle) -> Self {
        Self::Handle(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_reject_mismatched_variants() {
        assert_eq!(Value::Str("x".into()).as_bool(), None);
        assert_eq!(Value::Bool(true).as_str(), None);
        assert_eq!(Value::Null.as_handle(), None);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(Value::U32(7).as_i32(), Some(7));
        assert_eq!(Value::I32(-1).as_u32(), None);
        assert_eq!(Value::U32(7).as_i64(), Some(7));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3i32)), Value::I32(3));
    }

    #[test]
    fn test_handle_roundtrip() {
        let h = NativeHandle::from_raw(42);
        assert_eq!(h.as_raw(), 42);
        assert_eq!(Value::from(h).as_handle(), Some(h));
    }
}
