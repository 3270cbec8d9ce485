//! The list-item descriptor element.
//!
//! `ListItem` carries a stable string id, an opaque data payload, and - when
//! nested inside another `ListItem` - the id of its parent row. It never
//! creates a native widget; once an ancestor virtualized widget appears, the
//! item's lifecycle is owned by that widget's store and every mutation flows
//! through it.

use std::any::Any;
use std::sync::Arc;

use horizon_trellis_core::Value;

use crate::container::ItemContainer;
use crate::error::Result;
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{prop_changed, Props};
use crate::store::TreeStore;

/// Virtual element describing one row of a virtualized widget.
pub struct ListItemNode {
    base: NodeBase,
    item_id: String,
    value: Value,
    parent_item: Option<String>,
    store: Option<Arc<TreeStore>>,
}

impl ListItemNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "ListItem";

    /// Read id and payload from the element props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Self {
        let item_id = props
            .get("id")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();
        if item_id.is_empty() {
            tracing::warn!(target: "horizon_trellis::node", "list item created without an id");
        }
        let value = props
            .get("value")
            .and_then(|p| p.as_value())
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            base: NodeBase::new(ctx, Self::TYPE, None, props),
            item_id,
            value,
            parent_item: None,
            store: None,
        }
    }

    /// The stable row id.
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// The current data payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The id of the parent row, when nested.
    pub fn parent_item(&self) -> Option<&str> {
        self.parent_item.as_deref()
    }

    /// The store currently owning this item's lifecycle.
    pub(crate) fn store(&self) -> Option<&Arc<TreeStore>> {
        self.store.as_ref()
    }

    /// Bind this item to a store (host-tree cascade over freshly attached
    /// subtrees).
    pub(crate) fn bind_store(&mut self, store: Arc<TreeStore>, parent_item: Option<String>) {
        self.store = Some(store);
        self.parent_item = parent_item;
    }

    /// Drop the store binding (host-tree cascade over detached subtrees).
    pub(crate) fn unbind_store(&mut self) {
        self.store = None;
        self.parent_item = None;
    }
}

impl Node for ListItemNode {
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

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(items) = parent.as_item_container() else {
            // Parent is an item element not yet owned by a store; the
            // binding happens when the owning widget appears above it.
            return Ok(());
        };
        items.add_item(&self.item_id, &self.value, None)?;
        self.store = parent.item_store();
        self.parent_item = parent
            .as_any()
            .downcast_ref::<ListItemNode>()
            .map(|p| p.item_id.clone());
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        let Some(items) = parent.as_item_container() else {
            return Ok(());
        };
        match before.as_any().downcast_ref::<ListItemNode>() {
            Some(before) => {
                items.insert_item_before(&self.item_id, &before.item_id, &self.value, None)?;
            }
            None => items.add_item(&self.item_id, &self.value, None)?,
        }
        self.store = parent.item_store();
        self.parent_item = parent
            .as_any()
            .downcast_ref::<ListItemNode>()
            .map(|p| p.item_id.clone());
        Ok(())
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(items) = parent.as_item_container() {
            items.remove_item(&self.item_id, None)?;
        }
        self.store = None;
        self.parent_item = None;
        Ok(())
    }

    fn commit_update(&mut self, old: &Props, new: &Props, _ctx: &CommitContext<'_>) -> Result<()> {
        let changed = prop_changed(Some(old), new, "id") || prop_changed(Some(old), new, "value");
        if !changed {
            return Ok(());
        }
        let target = new
            .get("id")
            .and_then(|p| p.as_str())
            .unwrap_or(&self.item_id)
            .to_owned();
        self.value = new
            .get("value")
            .and_then(|p| p.as_value())
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(store) = &self.store {
            // Addressed by the current id from the caller's view; a re-keyed
            // id is unknown to the store and the update is a no-op, exactly
            // as a remove/insert pair would replace it anyway.
            store.update(&target, self.value.clone());
        }
        Ok(())
    }

    fn item_store(&self) -> Option<Arc<TreeStore>> {
        self.store.clone()
    }

    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        self.store.is_some().then_some(self as _)
    }
}

/// Nested items forward to the owning store with this row as the parent.
impl ItemContainer for ListItemNode {
    fn add_item(&self, id: &str, value: &Value, _parent_item: Option<&str>) -> Result<()> {
        if let Some(store) = &self.store {
            store.append(id, value.clone(), Some(&self.item_id))?;
        }
        Ok(())
    }

    fn insert_item_before(
        &self,
        id: &str,
        before: &str,
        value: &Value,
        _parent_item: Option<&str>,
    ) -> Result<()> {
        if let Some(store) = &self.store {
            store.insert_before(id, before, value.clone(), Some(&self.item_id))?;
        }
        Ok(())
    }

    fn remove_item(&self, id: &str, _parent_item: Option<&str>) -> Result<()> {
        if let Some(store) = &self.store {
            store.remove(id, Some(&self.item_id))?;
        }
        Ok(())
    }

    fn update_item(&self, id: &str, value: &Value) -> Result<()> {
        if let Some(store) = &self.store {
            store.update(id, value.clone());
        }
        Ok(())
    }
}
