//! The consumed foreign-function bridge surface.
//!
//! Horizon Trellis never talks to the native toolkit directly; every native
//! effect goes through an implementation of [`ForeignBridge`]. In production
//! that implementation is the FFI call/marshaling layer together with the
//! introspection-generated wrapper code; in tests it is the in-memory
//! recording bridge shipped by the `horizon-trellis` crate.
//!
//! # Key Types
//!
//! - [`ForeignBridge`] - the full bridge surface, grouped by concern
//! - [`SignalHandler`] - trampoline closure invoked when a native signal fires
//!
//! # Contract
//!
//! All calls are synchronous and run on the single thread that drives the
//! toolkit's event loop. Nothing here suspends, blocks, or re-enters the
//! caller; a native signal can only fire between bridge calls, never inside
//! one.

use std::sync::Arc;

use crate::error::BridgeResult;
use crate::value::{ConnectionToken, NativeHandle, Value};

/// Trampoline closure invoked with the payload of a native signal emission.
pub type SignalHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// The complete surface this backend consumes from the FFI layer.
///
/// Grouped into object lifecycle, typed calls and properties, signal wiring,
/// and the index-addressed list-model primitives that drive virtualized
/// widgets. Implementations are expected to be cheap to clone behind an
/// `Arc<dyn ForeignBridge>`.
pub trait ForeignBridge: Send + Sync {
    // =========================================================================
    // Introspection metadata
    // =========================================================================

    /// Whether the toolkit metadata knows a class with this name.
    fn has_class(&self, class: &str) -> bool;

    /// Whether instances of `class` expose `method`.
    ///
    /// This is the basis of structural capability probing: a widget is
    /// treated as a child container, pack container, and so on based on the
    /// operations its class actually supports, never on its concrete name.
    fn class_supports(&self, class: &str, method: &str) -> bool;

    // =========================================================================
    // Object lifecycle
    // =========================================================================

    /// Construct a native object of `class`.
    fn create(&self, class: &str, args: &[Value]) -> BridgeResult<NativeHandle>;

    /// Drop this side's ownership of the native object.
    ///
    /// After release the handle is dead; the toolkit may destroy the object
    /// or hand ownership to a surviving native parent.
    fn release(&self, handle: NativeHandle) -> BridgeResult<()>;

    // =========================================================================
    // Typed calls and properties
    // =========================================================================

    /// Invoke a method on a native object.
    fn call(&self, handle: NativeHandle, method: &str, args: &[Value]) -> BridgeResult<Value>;

    /// Read a property by its toolkit (kebab-case) name.
    fn get_property(&self, handle: NativeHandle, name: &str) -> BridgeResult<Value>;

    /// Write a property by its toolkit (kebab-case) name.
    fn set_property(&self, handle: NativeHandle, name: &str, value: Value) -> BridgeResult<()>;

    /// Suspend change notification for the object.
    ///
    /// Paired with [`thaw_notify`](Self::thaw_notify) to batch a run of
    /// property writes into a single notification burst. Final property
    /// values are unaffected.
    fn freeze_notify(&self, handle: NativeHandle) -> BridgeResult<()>;

    /// Resume change notification, flushing anything batched since the
    /// matching freeze.
    fn thaw_notify(&self, handle: NativeHandle) -> BridgeResult<()>;

    // =========================================================================
    // Signals
    // =========================================================================

    /// Connect a trampoline to a named signal on a native object.
    fn connect(
        &self,
        handle: NativeHandle,
        signal: &str,
        trampoline: SignalHandler,
    ) -> BridgeResult<ConnectionToken>;

    /// Disconnect a previously connected trampoline.
    ///
    /// Disconnecting a token that is already gone is a no-op, which keeps
    /// teardown idempotent regardless of unmount ordering.
    fn disconnect(&self, handle: NativeHandle, token: ConnectionToken);

    // =========================================================================
    // List-model primitives
    // =========================================================================

    /// Insert one entry into an index-addressed native model.
    fn model_insert(&self, model: NativeHandle, index: usize, value: Value) -> BridgeResult<()>;

    /// Remove one entry from an index-addressed native model.
    fn model_remove(&self, model: NativeHandle, index: usize) -> BridgeResult<()>;

    /// Replace `n_removed` entries at `index` with `additions`.
    ///
    /// The single change notification this produces is what lets the widget
    /// re-measure only the affected range.
    fn model_splice(
        &self,
        model: NativeHandle,
        index: usize,
        n_removed: usize,
        additions: &[Value],
    ) -> BridgeResult<()>;

    /// Number of entries in an index-addressed native model.
    fn model_len(&self, model: NativeHandle) -> BridgeResult<usize>;
}
