//! Virtualized table widget and its column descriptors.
//!
//! `ColumnView` shares the item-container behavior of the list family - one
//! store, one selection binding - and additionally manages column objects.
//! Each `ColumnViewColumn` element owns a native column with its own row
//! renderer; every column reads cells from the table's shared store.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use horizon_trellis_core::{NativeHandle, Value};

use crate::container::{ColumnContainer, ItemContainer};
use crate::error::{Error, Result};
use crate::node::list_view::{selected_ids, wire_rebind};
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{callback_change, prop_changed, CallbackChange, Props};
use crate::store::{RowRenderer, SelectionBinding, SelectionMode, TreeStore};

const CONSUMED: &[&str] = &["autoexpand", "selectionMode", "selected", "onSelectionChanged"];
const COLUMN_CONSUMED: &[&str] = &["id", "renderCell"];

/// A virtualized table widget.
pub struct ColumnViewNode {
    base: NodeBase,
    store: Arc<TreeStore>,
    selection: SelectionBinding,
    columns: Mutex<Vec<NativeHandle>>,
}

impl ColumnViewNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "ColumnView";

    /// Construct the widget, its store, and its selection binding.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(Self::TYPE, &[])?;
        let autoexpand = props
            .get("autoexpand")
            .and_then(|p| p.as_bool())
            .unwrap_or(true);
        let store = Arc::new(TreeStore::new(ctx.bridge.clone(), autoexpand)?);
        let mode = props
            .get("selectionMode")
            .and_then(|p| p.as_str())
            .map(SelectionMode::from_prop)
            .unwrap_or_default();
        let selection = SelectionBinding::new(ctx.bridge.clone(), store.model(), mode)?;

        let node = Self {
            base: NodeBase::new(ctx, Self::TYPE, Some(handle), props),
            store,
            selection,
            columns: Mutex::new(Vec::new()),
        };
        if let Some(user) = node
            .base
            .props()
            .get("onSelectionChanged")
            .and_then(|p| p.as_callback())
        {
            node.selection.connect_changed(
                ctx.signals,
                node.base.id(),
                node.store.clone(),
                user.clone(),
            )?;
        }
        node.base
            .apply_props(ctx.signals, None, node.base.props(), CONSUMED)?;
        Ok(node)
    }
}

impl Node for ColumnViewNode {
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
        if prop_changed(Some(old), new, "selectionMode") {
            let mode = new
                .get("selectionMode")
                .and_then(|p| p.as_str())
                .map(SelectionMode::from_prop)
                .unwrap_or_default();
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
            self.selection.set_selected(&self.store, &selected_ids(new))?;
            if let Some(user) = new.get("onSelectionChanged").and_then(|p| p.as_callback()) {
                self.selection.connect_changed(
                    ctx.signals,
                    self.base.id(),
                    self.store.clone(),
                    user.clone(),
                )?;
            }
        } else {
            if prop_changed(Some(old), new, "selected") {
                self.selection.set_selected(&self.store, &selected_ids(new))?;
            }
            match callback_change(old.get("onSelectionChanged"), new.get("onSelectionChanged")) {
                CallbackChange::Added(user) | CallbackChange::Replaced(user) => {
                    self.selection.connect_changed(
                        ctx.signals,
                        self.base.id(),
                        self.store.clone(),
                        user,
                    )?;
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

    fn as_column_container(&self) -> Option<&dyn ColumnContainer> {
        Some(self)
    }
}

impl ItemContainer for ColumnViewNode {
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

impl ColumnContainer for ColumnViewNode {
    fn add_column(&self, column: NativeHandle) -> Result<()> {
        let mut columns = self.columns.lock();
        if let Some(handle) = self.base.handle() {
            self.base
                .bridge()
                .call(handle, "append_column", &[Value::Handle(column)])?;
        }
        columns.retain(|&c| c != column);
        columns.push(column);
        Ok(())
    }

    fn insert_column_before(&self, column: NativeHandle, before: NativeHandle) -> Result<()> {
        let mut columns = self.columns.lock();
        let Some(position) = columns.iter().position(|&c| c == before) else {
            drop(columns);
            return self.add_column(column);
        };
        if let Some(handle) = self.base.handle() {
            self.base.bridge().call(
                handle,
                "insert_column",
                &[Value::U32(position as u32), Value::Handle(column)],
            )?;
        }
        columns.retain(|&c| c != column);
        let position = columns
            .iter()
            .position(|&c| c == before)
            .unwrap_or(columns.len());
        columns.insert(position, column);
        Ok(())
    }

    fn remove_column(&self, column: NativeHandle) -> Result<()> {
        let mut columns = self.columns.lock();
        if columns.contains(&column) {
            if let Some(handle) = self.base.handle() {
                self.base
                    .bridge()
                    .call(handle, "remove_column", &[Value::Handle(column)])?;
            }
        }
        columns.retain(|&c| c != column);
        Ok(())
    }
}

/// Virtual element describing one table column.
pub struct ColumnNode {
    base: NodeBase,
    column: NativeHandle,
    renderer: Arc<RowRenderer>,
    attached: bool,
}

impl ColumnNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "ColumnViewColumn";

    /// Construct the native column and its per-column row renderer.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Result<Self> {
        let column = ctx.bridge.create(Self::TYPE, &[])?;
        let renderer = RowRenderer::new(ctx.bridge.clone())?;
        renderer.set_render(props.get("renderCell").and_then(|p| p.as_renderer()).cloned());
        renderer.connect_lifecycle(ctx.id, ctx.signals)?;
        ctx.bridge
            .set_property(column, "factory", Value::Handle(renderer.factory()))?;

        let node = Self {
            base: NodeBase::new(ctx, Self::TYPE, Some(column), props),
            column,
            renderer,
            attached: false,
        };
        node.base
            .apply_props(ctx.signals, None, node.base.props(), COLUMN_CONSUMED)?;
        Ok(node)
    }

    /// The native column object.
    pub fn column(&self) -> NativeHandle {
        self.column
    }
}

impl Node for ColumnNode {
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

    fn attached_handle(&self) -> Option<NativeHandle> {
        // Columns attach through the column container, never as widgets.
        None
    }

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(columns) = parent.as_column_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        columns.add_column(self.column)?;
        if let Some(store) = parent.item_store() {
            wire_rebind(&store, &self.renderer);
            self.renderer.set_store(store);
        }
        self.attached = true;
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        let Some(columns) = parent.as_column_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        match before.as_any().downcast_ref::<ColumnNode>() {
            Some(before) => columns.insert_column_before(self.column, before.column)?,
            None => columns.add_column(self.column)?,
        }
        if let Some(store) = parent.item_store() {
            wire_rebind(&store, &self.renderer);
            self.renderer.set_store(store);
        }
        self.attached = true;
        Ok(())
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(columns) = parent.as_column_container() {
            columns.remove_column(self.column)?;
        }
        self.attached = false;
        Ok(())
    }

    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        if prop_changed(Some(old), new, "renderCell") {
            self.renderer
                .set_render(new.get("renderCell").and_then(|p| p.as_renderer()).cloned());
        }
        self.base
            .apply_props(ctx.signals, Some(old), new, COLUMN_CONSUMED)
    }

    fn teardown(&mut self, _signals: &horizon_trellis_core::SignalStore) -> Result<()> {
        self.renderer.release()?;
        self.base.bridge().release(self.column)?;
        Ok(())
    }
}
