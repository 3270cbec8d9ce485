//! Native signal lifecycle bookkeeping.
//!
//! Every declarative "on-event" prop maps to exactly one native signal
//! connection, and every connection is owned by the host node that requested
//! it. [`SignalStore`] is the single table tracking that ownership, keyed by
//! `(node, signal name)`.
//!
//! # Key Types
//!
//! - [`SignalStore`] - owned connection table
//! - [`NodeId`] - stable identifier of a host node (also the arena key used
//!   by the host tree)
//!
//! # Guarantees
//!
//! - Connecting twice for the same `(node, signal)` replaces the previous
//!   connection; callbacks never stack.
//! - Disconnecting tears the native connection down synchronously, before
//!   any subsequent native event could fire a stale handler.
//! - Draining a node removes every connection it owns; no connection
//!   outlives its owner.
//!
//! All of this runs on the toolkit's event-loop thread, so between the
//! disconnect of an old handler and the connect of its replacement no native
//! event can be dispatched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::new_key_type;

use crate::bridge::{ForeignBridge, SignalHandler};
use crate::error::BridgeResult;
use crate::value::{ConnectionToken, NativeHandle};

new_key_type! {
    /// A unique, stable identifier for a node in the host tree.
    ///
    /// `NodeId`s are arena keys: they stay valid while the node lives and are
    /// never reused for a different node within the same arena generation.
    pub struct NodeId;
}

/// One tracked native connection.
struct StoredConnection {
    /// The native object the trampoline is connected to.
    handle: NativeHandle,
    /// The raw token the bridge handed out.
    token: ConnectionToken,
}

/// Owned table of native signal connections keyed by `(node, signal name)`.
///
/// The store holds the bridge it disconnects through, so teardown never
/// needs extra context: dropping a node's connections is a single call.
pub struct SignalStore {
    bridge: Arc<dyn ForeignBridge>,
    connections: Mutex<HashMap<NodeId, HashMap<String, StoredConnection>>>,
}

impl SignalStore {
    /// Create an empty store that disconnects through `bridge`.
    pub fn new(bridge: Arc<dyn ForeignBridge>) -> Self {
        Self {
            bridge,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Connect `handler` to `signal` on `handle`, owned by `node`.
    ///
    /// Idempotent per `(node, signal)`: if a connection already exists for
    /// the pair it is torn down first and the new handler takes its place,
    /// so exactly one callback is live for the pair at any time.
    pub fn connect(
        &self,
        node: NodeId,
        handle: NativeHandle,
        signal: &str,
        handler: SignalHandler,
    ) -> BridgeResult<()> {
        let mut connections = self.connections.lock();
        let owned = connections.entry(node).or_default();

        if let Some(previous) = owned.remove(signal) {
            tracing::trace!(
                target: "horizon_trellis_core::signals",
                ?node,
                signal,
                "replacing existing connection"
            );
            self.bridge.disconnect(previous.handle, previous.token);
        }

        let token = self.bridge.connect(handle, signal, handler)?;
        owned.insert(signal.to_owned(), StoredConnection { handle, token });
        tracing::trace!(target: "horizon_trellis_core::signals", ?node, signal, "connected");
        Ok(())
    }

    /// Tear down the connection for `(node, signal)`.
    ///
    /// Returns `true` if a connection existed. Disconnecting an absent pair
    /// is a no-op so teardown stays idempotent under unmount ordering.
    pub fn disconnect(&self, node: NodeId, signal: &str) -> bool {
        let mut connections = self.connections.lock();
        let Some(owned) = connections.get_mut(&node) else {
            return false;
        };
        let Some(stored) = owned.remove(signal) else {
            return false;
        };
        if owned.is_empty() {
            connections.remove(&node);
        }
        self.bridge.disconnect(stored.handle, stored.token);
        tracing::trace!(target: "horizon_trellis_core::signals", ?node, signal, "disconnected");
        true
    }

    /// Tear down every connection owned by `node`.
    ///
    /// Part of unmount: after this returns, no handler owned by the node can
    /// fire again. Returns the number of connections removed.
    pub fn disconnect_node(&self, node: NodeId) -> usize {
        let owned = self.connections.lock().remove(&node);
        let Some(owned) = owned else { return 0 };
        let count = owned.len();
        for stored in owned.into_values() {
            self.bridge.disconnect(stored.handle, stored.token);
        }
        tracing::trace!(
            target: "horizon_trellis_core::signals",
            ?node,
            count,
            "drained node connections"
        );
        count
    }

    /// Whether a connection is currently tracked for `(node, signal)`.
    pub fn is_connected(&self, node: NodeId, signal: &str) -> bool {
        self.connections
            .lock()
            .get(&node)
            .is_some_and(|owned| owned.contains_key(signal))
    }

    /// Total number of tracked connections, across all nodes.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::value::Value;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Minimal bridge double: hands out tokens and remembers which are live,
    /// dispatching emissions to the connected trampolines.
    #[derive(Default)]
    struct TestBridge {
        next_token: AtomicU64,
        live: Mutex<HashMap<(NativeHandle, u64), (String, SignalHandler)>>,
    }

    impl TestBridge {
        fn emit(&self, handle: NativeHandle, signal: &str, args: &[Value]) {
            let handlers: Vec<SignalHandler> = self
                .live
                .lock()
                .iter()
                .filter(|((h, _), (name, _))| *h == handle && name == signal)
                .map(|(_, (_, handler))| handler.clone())
                .collect();
            for handler in handlers {
                handler(args);
            }
        }

        fn live_count(&self) -> usize {
            self.live.lock().len()
        }
    }

    impl ForeignBridge for TestBridge {
        fn has_class(&self, _class: &str) -> bool {
            true
        }

        fn class_supports(&self, _class: &str, _method: &str) -> bool {
            false
        }

        fn create(&self, _class: &str, _args: &[Value]) -> BridgeResult<NativeHandle> {
            Err(BridgeError::Native("not supported in this double".into()))
        }

        fn release(&self, _handle: NativeHandle) -> BridgeResult<()> {
            Ok(())
        }

        fn call(&self, _handle: NativeHandle, _method: &str, _args: &[Value]) -> BridgeResult<Value> {
            Ok(Value::Null)
        }

        fn get_property(&self, _handle: NativeHandle, _name: &str) -> BridgeResult<Value> {
            Ok(Value::Null)
        }

        fn set_property(&self, _handle: NativeHandle, _name: &str, _value: Value) -> BridgeResult<()> {
            Ok(())
        }

        fn freeze_notify(&self, _handle: NativeHandle) -> BridgeResult<()> {
            Ok(())
        }

        fn thaw_notify(&self, _handle: NativeHandle) -> BridgeResult<()> {
            Ok(())
        }

        fn connect(
            &self,
            handle: NativeHandle,
            signal: &str,
            trampoline: SignalHandler,
        ) -> BridgeResult<ConnectionToken> {
            let raw = self.next_token.fetch_add(1, Ordering::Relaxed);
            self.live
                .lock()
                .insert((handle, raw), (signal.to_owned(), trampoline));
            Ok(ConnectionToken::from_raw(raw))
        }

        fn disconnect(&self, handle: NativeHandle, token: ConnectionToken) {
            self.live.lock().remove(&(handle, token.as_raw()));
        }

        fn model_insert(&self, _m: NativeHandle, _i: usize, _v: Value) -> BridgeResult<()> {
            Ok(())
        }

        fn model_remove(&self, _m: NativeHandle, _i: usize) -> BridgeResult<()> {
            Ok(())
        }

        fn model_splice(
            &self,
            _m: NativeHandle,
            _i: usize,
            _r: usize,
            _a: &[Value],
        ) -> BridgeResult<()> {
            Ok(())
        }

        fn model_len(&self, _m: NativeHandle) -> BridgeResult<usize> {
            Ok(0)
        }
    }

    fn store_with_bridge() -> (Arc<TestBridge>, SignalStore, NodeId) {
        let bridge = Arc::new(TestBridge::default());
        let store = SignalStore::new(bridge.clone());
        let mut keys = slotmap::SlotMap::<NodeId, ()>::with_key();
        let node = keys.insert(());
        (bridge, store, node)
    }

    #[test]
    fn test_connect_and_fire() {
        let (bridge, store, node) = store_with_bridge();
        let handle = NativeHandle::from_raw(1);
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        store
            .connect(
                node,
                handle,
                "clicked",
                Arc::new(move |_| received_clone.lock().push("clicked")),
            )
            .unwrap();

        bridge.emit(handle, "clicked", &[]);
        assert_eq!(*received.lock(), vec!["clicked"]);
    }

    #[test]
    fn test_reconnect_replaces_previous_handler() {
        let (bridge, store, node) = store_with_bridge();
        let handle = NativeHandle::from_raw(1);
        let received = Arc::new(Mutex::new(Vec::new()));

        let first = received.clone();
        store
            .connect(node, handle, "clicked", Arc::new(move |_| first.lock().push(1)))
            .unwrap();
        let second = received.clone();
        store
            .connect(node, handle, "clicked", Arc::new(move |_| second.lock().push(2)))
            .unwrap();

        assert_eq!(bridge.live_count(), 1);
        bridge.emit(handle, "clicked", &[]);
        assert_eq!(*received.lock(), vec![2]);
    }

    #[test]
    fn test_disconnect_is_synchronous_and_idempotent() {
        let (bridge, store, node) = store_with_bridge();
        let handle = NativeHandle::from_raw(1);
        let received = Arc::new(Mutex::new(0));

        let received_clone = received.clone();
        store
            .connect(
                node,
                handle,
                "clicked",
                Arc::new(move |_| *received_clone.lock() += 1),
            )
            .unwrap();

        assert!(store.disconnect(node, "clicked"));
        bridge.emit(handle, "clicked", &[]);
        assert_eq!(*received.lock(), 0);

        // Second disconnect of the same pair is a no-op.
        assert!(!store.disconnect(node, "clicked"));
        assert!(!store.disconnect(node, "never-connected"));
    }

    #[test]
    fn test_drain_node_removes_every_connection() {
        let (bridge, store, node) = store_with_bridge();
        let a = NativeHandle::from_raw(1);
        let b = NativeHandle::from_raw(2);
        let fired = Arc::new(Mutex::new(0));

        for (handle, signal) in [(a, "clicked"), (a, "notify::label"), (b, "activate")] {
            let fired_clone = fired.clone();
            store
                .connect(node, handle, signal, Arc::new(move |_| *fired_clone.lock() += 1))
                .unwrap();
        }
        assert_eq!(store.connection_count(), 3);

        assert_eq!(store.disconnect_node(node), 3);
        assert_eq!(store.connection_count(), 0);
        bridge.emit(a, "clicked", &[]);
        bridge.emit(a, "notify::label", &[]);
        bridge.emit(b, "activate", &[]);
        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    fn test_connections_are_scoped_per_node() {
        let (bridge, store, node_a) = store_with_bridge();
        let mut keys = slotmap::SlotMap::<NodeId, ()>::with_key();
        let _ = keys.insert(());
        let node_b = keys.insert(());
        let handle = NativeHandle::from_raw(1);
        let fired = Arc::new(Mutex::new(Vec::new()));

        let fa = fired.clone();
        store
            .connect(node_a, handle, "clicked", Arc::new(move |_| fa.lock().push("a")))
            .unwrap();
        let fb = fired.clone();
        store
            .connect(node_b, handle, "clicked", Arc::new(move |_| fb.lock().push("b")))
            .unwrap();

        store.disconnect_node(node_a);
        bridge.emit(handle, "clicked", &[]);
        assert_eq!(*fired.lock(), vec!["b"]);
    }
}
