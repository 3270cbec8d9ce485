//! Virtualized list and grid widgets.
//!
//! `ListView` and `GridView` share one implementation: a store bridging the
//! id-addressed item collection to the native index-addressed model, a
//! selection binding over that store, and a row renderer driving the lazy
//! per-row factory lifecycle. Items arrive as `ListItem` children through
//! the item-container capability; the widget never sees one native row
//! widget per item.

use std::any::Any;
use std::sync::{Arc, Weak};

use horizon_trellis_core::{SignalHandler, Value};

use crate::container::ItemContainer;
use crate::error::Result;
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{callback_change, prop_changed, CallbackChange, Props};
use crate::store::{RowRenderer, SelectionBinding, SelectionMode, TreeStore};

const CONSUMED: &[&str] = &[
    "renderItem",
    "autoexpand",
    "selectionMode",
    "selected",
    "onSelectionChanged",
];

/// Read the `selected` prop as a list of ids.
pub(crate) fn selected_ids(props: &Props) -> Vec<String> {
    props
        .get("selected")
        .and_then(|p| p.as_value())
        .and_then(Value::as_list)
        .map(|list| {
            list.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Wire an item-updated hook of the store to row rebinding.
pub(crate) fn wire_rebind(store: &Arc<TreeStore>, renderer: &Arc<RowRenderer>) {
    let weak: Weak<TreeStore> = Arc::downgrade(store);
    let renderer = renderer.clone();
    store.add_item_updated(Arc::new(move |id: &str| {
        if let Some(store) = weak.upgrade() {
            if let Some(index) = store.index_of(id) {
                renderer.rebind_position(index as u32);
            }
        }
    }));
}

/// A virtualized list or grid widget.
pub struct ListViewNode {
    base: NodeBase,
    store: Arc<TreeStore>,
    selection: SelectionBinding,
    renderer: Arc<RowRenderer>,
}

impl ListViewNode {
    /// Element types this node backs.
    pub const TYPES: &'static [&'static str] = &["ListView", "GridView"];

    /// Whether `type_name` names a virtualized list family widget.
    pub fn matches(type_name: &str) -> bool {
        Self::TYPES.contains(&type_name)
    }

    /// Construct the widget, its store, selection binding, and renderer.
    pub fn new(ctx: &CreateContext<'_>, type_name: &str, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(type_name, &[])?;
        let autoexpand = props
            .get("autoexpand")
            .and_then(|p| p.as_bool())
            .unwrap_or(true);
        let store = Arc::new(TreeStore::new(ctx.bridge.clone(), autoexpand)?);

        let renderer = RowRenderer::new(ctx.bridge.clone())?;
        renderer.set_store(store.clone());
        renderer.set_render(props.get("renderItem").and_then(|p| p.as_renderer()).cloned());
        renderer.connect_lifecycle(ctx.id, ctx.signals)?;
        wire_rebind(&store, &renderer);
        ctx.bridge
            .call(handle, "set_factory", &[Value::Handle(renderer.factory())])?;

        let mode = props
            .get("selectionMode")
            .and_then(|p| p.as_str())
            .map(SelectionMode::from_prop)
            .unwrap_or_default();
        let selection = SelectionBinding::new(ctx.bridge.clone(), store.model(), mode)?;

        let node = Self {
            base: NodeBase::new(ctx, type_name, Some(handle), props),
            store,
            selection,
            renderer,
        };
        if let Some(user) = node
            .base
            .props()
            .get("onSelectionChanged")
            .and_then(|p| p.as_callback())
        {
            node.connect_selection_changed(ctx.signals, user.clone())?;
        }
        node.base
            .apply_props(ctx.signals, None, node.base.props(), CONSUMED)?;
        Ok(node)
    }

    fn connect_selection_changed(
        &self,
        signals: &horizon_trellis_core::SignalStore,
        user: SignalHandler,
    ) -> Result<()> {
        Ok(self
            .selection
            .connect_changed(signals, self.base.id(), self.store.clone(), user)?)
    }

    /// Swap the selection binding for a new mode and point the widget at it.
    fn rebuild_selection(
        &mut self,
        mode: SelectionMode,
        new_props: &Props,
        ctx: &CommitContext<'_>,
    ) -> Result<()> {
        let previous = std::mem::replace(
            &mut self.selection,
            SelectionBinding::new(self.base.bridge().clone(), self.store.model(), mode)?,
        );
        previous.release()?;

        if let Some(handle) = self.base.handle() {
            self.base.bridge().call(
                handle,
                "set_model",
                &[Value::Handle(self.selection.handle())],
            )?;
        }
        self.selection.set_selected(&self.store, &selected_ids(new_props))?;
        if let Some(user) = new_props.get("onSelectionChanged").and_then(|p| p.as_callback()) {
            self.connect_selection_changed(ctx.signals, user.clone())?;
        }
        Ok(())
    }
}

impl Node for ListViewNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        if prop_changed(Some(old), new, "renderItem") {
            self.renderer
                .set_render(new.get("renderItem").and_then(|p| p.as_renderer()).cloned());
        }

        if prop_changed(Some(old), new, "selectionMode") {
            let mode = new
                .get("selectionMode")
                .and_then(|p| p.as_str())
                .map(SelectionMode::from_prop)
                .unwrap_or_default();
            self.rebuild_selection(mode, new, ctx)?;
        } else {
            if prop_changed(Some(old), new, "selected") {
                self.selection.set_selected(&self.store, &selected_ids(new))?;
            }
            match callback_change(old.get("onSelectionChanged"), new.get("onSelectionChanged")) {
                CallbackChange::Added(user) | CallbackChange::Replaced(user) => {
                    self.connect_selection_changed(ctx.signals, user)?;
                }
                CallbackChange::Removed => {
                    ctx.signals.disconnect(self.base.id(), "selection-changed");
                }
                CallbackChange::Unchanged => {}
            }
        }

        self.base.apply_props(ctx.signals, Some(old), new, CONSUMED)
    }

    fn commit_mount(&mut self, _ctx: &CommitContext<'_>) -> Result<()> {
        if let Some(handle) = self.base.handle() {
            self.base.bridge().call(
                handle,
                "set_model",
                &[Value::Handle(self.selection.handle())],
            )?;
        }
        let ids = selected_ids(self.base.props());
        if !ids.is_empty() {
            self.selection.set_selected(&self.store, &ids)?;
        }
        Ok(())
    }

    fn teardown(&mut self, _signals: &horizon_trellis_core::SignalStore) -> Result<()> {
        self.store.clear_item_updated();
        self.renderer.release()?;
        self.selection.release()?;
        self.store.release()?;
        if let Some(handle) = self.base.handle() {
            self.base.bridge().release(handle)?;
        }
        Ok(())
    }

    fn item_store(&self) -> Option<Arc<TreeStore>> {
        Some(self.store.clone())
    }

    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        Some(self)
    }
}

impl ItemContainer for ListViewNode {
    fn add_item(&self, id: &str, value: &Value, parent_item: Option<&str>) -> Result<()> {
        Ok(self.store.append(id, value.clone(), parent_item)?)
    }

    fn insert_item_before(
        &self,
        id: &str,
        before: &str,
        value: &Value,
        parent_item: Option<&str>,
    ) -> Result<()> {
        Ok(self
            .store
            .insert_before(id, before, value.clone(), parent_item)?)
    }

    fn remove_item(&self, id: &str, parent_item: Option<&str>) -> Result<()> {
        Ok(self.store.remove(id, parent_item)?)
    }

    fn update_item(&self, id: &str, value: &Value) -> Result<()> {
        self.store.update(id, value.clone());
        Ok(())
    }
}
