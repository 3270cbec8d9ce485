//! Element props and prop diffing.
//!
//! The upstream runtime hands every node a flat bag of props. Three kinds of
//! entries exist:
//!
//! - plain values, written to the native object as properties
//! - event callbacks (`onClicked`, `onNotifySelected`, ...), each mapping 1:1
//!   to a native signal connection
//! - row render functions for virtualized widgets
//!
//! Prop keys use the upstream camelCase convention; this module owns the
//! translation to the toolkit's kebab-case property and signal names.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use horizon_trellis_core::{SignalHandler, Value};

use crate::store::RenderRowFn;

/// A single prop entry.
#[derive(Clone)]
pub enum PropValue {
    /// A plain value, applied as a native property write.
    Value(Value),
    /// An event callback, applied as a native signal connection.
    Callback(SignalHandler),
    /// A per-row render function for virtualized widgets.
    Renderer(RenderRowFn),
}

impl PropValue {
    /// Wrap an event callback.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// The plain value, if this entry is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The callback, if this entry is one.
    pub fn as_callback(&self) -> Option<&SignalHandler> {
        match self {
            Self::Callback(f) => Some(f),
            _ => None,
        }
    }

    /// The render function, if this entry is one.
    pub fn as_renderer(&self) -> Option<&RenderRowFn> {
        match self {
            Self::Renderer(f) => Some(f),
            _ => None,
        }
    }

    /// Convenience accessor for string values.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Convenience accessor for boolean values.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    /// Convenience accessor for `i32` values.
    pub fn as_i32(&self) -> Option<i32> {
        self.as_value().and_then(Value::as_i32)
    }

    /// Convenience accessor for `u32` values.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_value().and_then(Value::as_u32)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Renderer(_) => f.write_str("Renderer(..)"),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Callback(a), Self::Callback(b)) => Arc::ptr_eq(a, b),
            (Self::Renderer(a), Self::Renderer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Into<Value>> From<T> for PropValue {
    fn from(v: T) -> Self {
        Self::Value(v.into())
    }
}

/// The prop bag of one element. Ordered so property writes are deterministic.
pub type Props = BTreeMap<String, PropValue>;

/// Whether a prop key names an event callback (`on` + UpperCamel rest).
pub fn is_signal_prop(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

/// Map an event prop key to the toolkit signal it connects to.
///
/// `onClicked` becomes `clicked`, `onValueChanged` becomes `value-changed`.
/// The `onNotify*` family maps to property-change notification:
/// `onNotifySelected` becomes `notify::selected`.
pub fn signal_name_for_prop(key: &str) -> String {
    let rest = key.strip_prefix("on").unwrap_or(key);
    if let Some(property) = rest.strip_prefix("Notify") {
        if !property.is_empty() {
            return format!("notify::{}", kebab_case(property));
        }
    }
    kebab_case(rest)
}

/// Map a camelCase prop key to the toolkit's kebab-case property name.
pub fn property_name_for_prop(key: &str) -> String {
    kebab_case(key)
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// How one callback prop changed between two prop bags.
pub enum CallbackChange {
    /// No callback before or after, or the identical callback both times.
    Unchanged,
    /// A callback appeared where there was none.
    Added(SignalHandler),
    /// The callback was removed; its connection must be torn down now.
    Removed,
    /// A different callback replaced the previous one.
    Replaced(SignalHandler),
}

/// Three-way diff of a callback prop across an update.
pub fn callback_change(old: Option<&PropValue>, new: Option<&PropValue>) -> CallbackChange {
    let old = old.and_then(PropValue::as_callback);
    let new = new.and_then(PropValue::as_callback);
    match (old, new) {
        (None, None) => CallbackChange::Unchanged,
        (None, Some(f)) => CallbackChange::Added(f.clone()),
        (Some(_), None) => CallbackChange::Removed,
        (Some(a), Some(b)) if Arc::ptr_eq(a, b) => CallbackChange::Unchanged,
        (Some(_), Some(b)) => CallbackChange::Replaced(b.clone()),
    }
}

/// Whether a (non-callback) prop differs between two bags.
pub fn prop_changed(old: Option<&Props>, new: &Props, key: &str) -> bool {
    match old {
        None => new.contains_key(key),
        Some(old) => old.get(key) != new.get(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_prop_detection() {
        assert!(is_signal_prop("onClicked"));
        assert!(is_signal_prop("onValueChanged"));
        assert!(!is_signal_prop("once"));
        assert!(!is_signal_prop("on"));
        assert!(!is_signal_prop("label"));
    }

    #[test]
    fn test_signal_name_mapping() {
        assert_eq!(signal_name_for_prop("onClicked"), "clicked");
        assert_eq!(signal_name_for_prop("onValueChanged"), "value-changed");
        assert_eq!(signal_name_for_prop("onNotifySelected"), "notify::selected");
    }

    #[test]
    fn test_property_name_mapping() {
        assert_eq!(property_name_for_prop("label"), "label");
        assert_eq!(property_name_for_prop("marginStart"), "margin-start");
        assert_eq!(property_name_for_prop("cssClasses"), "css-classes");
    }

    #[test]
    fn test_callback_change_identity() {
        let a = PropValue::callback(|_| {});
        let b = PropValue::callback(|_| {});

        assert!(matches!(
            callback_change(Some(&a), Some(&a)),
            CallbackChange::Unchanged
        ));
        assert!(matches!(
            callback_change(Some(&a), Some(&b)),
            CallbackChange::Replaced(_)
        ));
        assert!(matches!(callback_change(None, Some(&a)), CallbackChange::Added(_)));
        assert!(matches!(callback_change(Some(&a), None), CallbackChange::Removed));
        assert!(matches!(callback_change(None, None), CallbackChange::Unchanged));
    }

    #[test]
    fn test_prop_changed() {
        let old = Props::from([("label".to_owned(), PropValue::from("a"))]);
        let new = Props::from([("label".to_owned(), PropValue::from("b"))]);
        assert!(prop_changed(Some(&old), &new, "label"));
        assert!(!prop_changed(Some(&old), &old.clone(), "label"));
        assert!(prop_changed(None, &new, "label"));
        assert!(!prop_changed(None, &new, "missing"));
    }
}
