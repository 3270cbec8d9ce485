//! Lazy per-row rendering through the native factory lifecycle.
//!
//! Virtualized widgets create a small pool of recycled row shells and drive
//! them through the factory's `setup` / `bind` / `unbind` / `teardown`
//! signals. [`RowRenderer`] bridges those signals to a pluggable render
//! function:
//!
//! - `setup`: the render function builds the row's widget skeleton (item is
//!   `None`)
//! - `bind`: the row's current native position is read and the item at that
//!   position is looked up in the store; the store guarantees the position
//!   reflects logical order as of the last completed mutation
//! - `unbind`: the render function sees `None` again and clears row state
//! - `teardown`: internal row bookkeeping is dropped
//!
//! Render functions are plain closures; a failure inside the native calls
//! they make is logged, never propagated into the toolkit's dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use horizon_trellis_core::{
    BridgeResult, ForeignBridge, NativeHandle, NodeId, SignalStore, Value,
};

use super::tree_store::TreeStore;

/// Render one row. Invoked with `None` for the empty (setup/unbind) state.
pub type RenderRowFn = Arc<dyn Fn(&RowSlot, Option<&Value>) + Send + Sync>;

/// Handle to the native row shell a render function fills in.
pub struct RowSlot<'a> {
    bridge: &'a dyn ForeignBridge,
    list_item: NativeHandle,
}

impl RowSlot<'_> {
    /// The native row-shell object.
    pub fn list_item(&self) -> NativeHandle {
        self.list_item
    }

    /// Install (or clear) the row's child widget.
    pub fn set_child(&self, child: Option<NativeHandle>) -> BridgeResult<()> {
        let value = child.map_or(Value::Null, Value::Handle);
        self.bridge.call(self.list_item, "set_child", &[value])?;
        Ok(())
    }

    /// Read the row's currently installed child widget.
    pub fn child(&self) -> BridgeResult<Option<NativeHandle>> {
        Ok(self
            .bridge
            .get_property(self.list_item, "child")?
            .as_handle())
    }

    /// Build a native widget for this row.
    pub fn create_widget(&self, class: &str) -> BridgeResult<NativeHandle> {
        self.bridge.create(class, &[])
    }

    /// Write a property on a widget of this row.
    pub fn set_property(&self, widget: NativeHandle, name: &str, value: Value) -> BridgeResult<()> {
        self.bridge.set_property(widget, name, value)
    }
}

/// Owns a native row factory and drives a render function through its
/// lifecycle signals.
pub struct RowRenderer {
    bridge: Arc<dyn ForeignBridge>,
    factory: NativeHandle,
    store: Mutex<Option<Arc<TreeStore>>>,
    render: Mutex<Option<RenderRowFn>>,
    /// Row shell -> position it is currently bound to.
    bound: Mutex<HashMap<u64, u32>>,
}

impl RowRenderer {
    /// Create a renderer backed by a fresh native factory.
    pub fn new(bridge: Arc<dyn ForeignBridge>) -> BridgeResult<Arc<Self>> {
        let factory = bridge.create("SignalListItemFactory", &[])?;
        Ok(Arc::new(Self {
            bridge,
            factory,
            store: Mutex::new(None),
            render: Mutex::new(None),
            bound: Mutex::new(HashMap::new()),
        }))
    }

    /// The native factory handle the widget consumes.
    pub fn factory(&self) -> NativeHandle {
        self.factory
    }

    /// Point the renderer at the store rows read their items from.
    pub fn set_store(&self, store: Arc<TreeStore>) {
        *self.store.lock() = Some(store);
    }

    /// Swap the render function. Rows re-render on their next bind.
    pub fn set_render(&self, render: Option<RenderRowFn>) {
        *self.render.lock() = render;
    }

    /// Connect the factory lifecycle signals, owned by `owner`.
    ///
    /// Teardown of the owner through the signal store is what disconnects
    /// these again.
    pub fn connect_lifecycle(
        self: &Arc<Self>,
        owner: NodeId,
        signals: &SignalStore,
    ) -> BridgeResult<()> {
        let on_setup = self.clone();
        signals.connect(
            owner,
            self.factory,
            "setup",
            Arc::new(move |args| on_setup.handle_setup(args)),
        )?;
        let on_bind = self.clone();
        signals.connect(
            owner,
            self.factory,
            "bind",
            Arc::new(move |args| on_bind.handle_bind(args)),
        )?;
        let on_unbind = self.clone();
        signals.connect(
            owner,
            self.factory,
            "unbind",
            Arc::new(move |args| on_unbind.handle_unbind(args)),
        )?;
        let on_teardown = self.clone();
        signals.connect(
            owner,
            self.factory,
            "teardown",
            Arc::new(move |args| on_teardown.handle_teardown(args)),
        )?;
        Ok(())
    }

    /// Re-render the row currently bound at `position`, if any.
    ///
    /// Used when an item's data changes in place: the model entry is
    /// untouched, so the native side will not rebind on its own.
    pub fn rebind_position(&self, position: u32) {
        let row = self
            .bound
            .lock()
            .iter()
            .find(|(_, bound_position)| **bound_position == position)
            .map(|(raw, _)| NativeHandle::from_raw(*raw));
        if let Some(list_item) = row {
            self.bind_row(list_item, position);
        }
    }

    /// Release the native factory. Called by the owning node on teardown.
    pub fn release(&self) -> BridgeResult<()> {
        self.bridge.release(self.factory)
    }

    fn row_arg(args: &[Value]) -> Option<NativeHandle> {
        args.first().and_then(Value::as_handle)
    }

    fn invoke(&self, list_item: NativeHandle, item: Option<&Value>) {
        let render = self.render.lock().clone();
        let Some(render) = render else { return };
        let slot = RowSlot {
            bridge: self.bridge.as_ref(),
            list_item,
        };
        render(&slot, item);
    }

    fn handle_setup(&self, args: &[Value]) {
        let Some(list_item) = Self::row_arg(args) else { return };
        self.invoke(list_item, None);
    }

    fn handle_bind(&self, args: &[Value]) {
        let Some(list_item) = Self::row_arg(args) else { return };
        let position = match self.bridge.get_property(list_item, "position") {
            Ok(value) => value.as_u32().unwrap_or(u32::MAX),
            Err(error) => {
                tracing::warn!(
                    target: "horizon_trellis::store",
                    %error,
                    "row position unreadable, skipping bind"
                );
                return;
            }
        };
        self.bound.lock().insert(list_item.as_raw(), position);
        self.bind_row(list_item, position);
    }

    fn bind_row(&self, list_item: NativeHandle, position: u32) {
        let item = self
            .store
            .lock()
            .as_ref()
            .and_then(|store| store.value_at(position as usize));
        self.invoke(list_item, item.as_ref());
    }

    fn handle_unbind(&self, args: &[Value]) {
        let Some(list_item) = Self::row_arg(args) else { return };
        self.bound.lock().remove(&list_item.as_raw());
        self.invoke(list_item, None);
    }

    fn handle_teardown(&self, args: &[Value]) {
        let Some(list_item) = Self::row_arg(args) else { return };
        self.bound.lock().remove(&list_item.as_raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBridge;
    use slotmap::SlotMap;

    fn owner() -> NodeId {
        let mut keys = SlotMap::<NodeId, ()>::with_key();
        keys.insert(())
    }

    fn setup() -> (
        Arc<RecordingBridge>,
        Arc<TreeStore>,
        Arc<RowRenderer>,
        SignalStore,
        NodeId,
    ) {
        let bridge = Arc::new(RecordingBridge::new());
        let store = Arc::new(TreeStore::new(bridge.clone(), true).unwrap());
        store.append("a", Value::Str("Alpha".into()), None).unwrap();
        store.append("b", Value::Str("Beta".into()), None).unwrap();

        let renderer = RowRenderer::new(bridge.clone()).unwrap();
        renderer.set_store(store.clone());

        let signals = SignalStore::new(bridge.clone());
        let node = owner();
        renderer.connect_lifecycle(node, &signals).unwrap();
        (bridge, store, renderer, signals, node)
    }

    /// Render function that mirrors the bound item into a label child.
    fn label_render(seen: Arc<Mutex<Vec<Option<String>>>>) -> RenderRowFn {
        Arc::new(move |slot: &RowSlot, item: Option<&Value>| {
            let text = item.and_then(|v| v.as_str().map(str::to_owned));
            seen.lock().push(text.clone());
            if let Ok(None) = slot.child() {
                if let Ok(label) = slot.create_widget("Label") {
                    let _ = slot.set_child(Some(label));
                }
            }
            if let Ok(Some(label)) = slot.child() {
                let _ = slot.set_property(label, "label", Value::from(text.unwrap_or_default()));
            }
        })
    }

    #[test]
    fn test_bind_looks_item_up_by_position() {
        let (bridge, _store, renderer, _signals, _node) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        renderer.set_render(Some(label_render(seen.clone())));

        let row = bridge.new_list_item(1);
        bridge.emit(renderer.factory(), "setup", &[Value::Handle(row)]);
        bridge.emit(renderer.factory(), "bind", &[Value::Handle(row)]);

        assert_eq!(*seen.lock(), vec![None, Some("Beta".to_owned())]);
        let child = bridge.property(row, "child").as_handle().unwrap();
        assert_eq!(bridge.property(child, "label").as_str(), Some("Beta"));
    }

    #[test]
    fn test_unbind_renders_empty_state() {
        let (bridge, _store, renderer, _signals, _node) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        renderer.set_render(Some(label_render(seen.clone())));

        let row = bridge.new_list_item(0);
        bridge.emit(renderer.factory(), "setup", &[Value::Handle(row)]);
        bridge.emit(renderer.factory(), "bind", &[Value::Handle(row)]);
        bridge.emit(renderer.factory(), "unbind", &[Value::Handle(row)]);

        assert_eq!(
            *seen.lock(),
            vec![None, Some("Alpha".to_owned()), None]
        );
    }

    #[test]
    fn test_rebind_after_in_place_update() {
        let (bridge, store, renderer, _signals, _node) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        renderer.set_render(Some(label_render(seen.clone())));

        let row = bridge.new_list_item(0);
        bridge.emit(renderer.factory(), "setup", &[Value::Handle(row)]);
        bridge.emit(renderer.factory(), "bind", &[Value::Handle(row)]);

        store.update("a", Value::Str("Alef".into()));
        renderer.rebind_position(0);

        let child = bridge.property(row, "child").as_handle().unwrap();
        assert_eq!(bridge.property(child, "label").as_str(), Some("Alef"));
    }

    #[test]
    fn test_owner_teardown_disconnects_lifecycle() {
        let (bridge, _store, renderer, signals, node) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        renderer.set_render(Some(label_render(seen.clone())));

        signals.disconnect_node(node);
        let row = bridge.new_list_item(0);
        bridge.emit(renderer.factory(), "setup", &[Value::Handle(row)]);
        bridge.emit(renderer.factory(), "bind", &[Value::Handle(row)]);
        assert!(seen.lock().is_empty());
    }
}
