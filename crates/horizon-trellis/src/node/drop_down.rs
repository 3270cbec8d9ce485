//! Dropdown widget over a string-list model.
//!
//! The dropdown consumes a native string-list model; items arrive as
//! `SimpleListItem` elements carrying a stable id and a label string. The
//! current selection is exposed by id: the `selected` prop names an item id,
//! and the change callback receives `(id, label)` - native indices never
//! reach the caller.

use std::any::Any;
use std::sync::Arc;

use horizon_trellis_core::{SignalHandler, SignalStore, Value};

use crate::container::ItemContainer;
use crate::error::Result;
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{callback_change, prop_changed, CallbackChange, Props};
use crate::store::StringStore;

const CONSUMED: &[&str] = &["selected", "onSelectionChanged"];
const SELECTION_SIGNAL: &str = "notify::selected";

/// A native dropdown widget driven by a string store.
pub struct DropDownNode {
    base: NodeBase,
    store: Arc<StringStore>,
}

impl DropDownNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "DropDown";

    /// Construct the widget and its backing string store.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(Self::TYPE, &[])?;
        let store = Arc::new(StringStore::new(ctx.bridge.clone())?);
        ctx.bridge
            .call(handle, "set_model", &[Value::Handle(store.model())])?;

        let node = Self {
            base: NodeBase::new(ctx, Self::TYPE, Some(handle), props),
            store,
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

    fn connect_selection_changed(&self, signals: &SignalStore, user: SignalHandler) -> Result<()> {
        let Some(handle) = self.base.handle() else {
            return Ok(());
        };
        let bridge = self.base.bridge().clone();
        let store = self.store.clone();
        signals.connect(
            self.base.id(),
            handle,
            SELECTION_SIGNAL,
            Arc::new(move |_args| {
                let index = bridge
                    .get_property(handle, "selected")
                    .ok()
                    .and_then(|v| v.as_u32());
                let Some(index) = index else { return };
                let Some(id) = store.id_at(index as usize) else {
                    return;
                };
                let label = store.label_at(index as usize).unwrap_or_default();
                user(&[Value::Str(id), Value::Str(label)]);
            }),
        )?;
        Ok(())
    }

    /// Point the native selection at the item with the given id.
    fn apply_selected(&self, id: Option<&str>) -> Result<()> {
        let Some(handle) = self.base.handle() else {
            return Ok(());
        };
        let Some(index) = id.and_then(|id| self.store.index_of(id)) else {
            return Ok(());
        };
        self.base
            .bridge()
            .set_property(handle, "selected", Value::U32(index as u32))?;
        Ok(())
    }
}

impl Node for DropDownNode {
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
        if prop_changed(Some(old), new, "selected") {
            self.apply_selected(new.get("selected").and_then(|p| p.as_str()))?;
        }
        match callback_change(old.get("onSelectionChanged"), new.get("onSelectionChanged")) {
            CallbackChange::Added(user) | CallbackChange::Replaced(user) => {
                self.connect_selection_changed(ctx.signals, user)?;
            }
            CallbackChange::Removed => {
                ctx.signals.disconnect(self.base.id(), SELECTION_SIGNAL);
            }
            CallbackChange::Unchanged => {}
        }
        self.base.apply_props(ctx.signals, Some(old), new, CONSUMED)
    }

    fn commit_mount(&mut self, _ctx: &CommitContext<'_>) -> Result<()> {
        let selected = self
            .base
            .props()
            .get("selected")
            .and_then(|p| p.as_str())
            .map(str::to_owned);
        self.apply_selected(selected.as_deref())
    }

    fn teardown(&mut self, _signals: &SignalStore) -> Result<()> {
        self.store.release()?;
        if let Some(handle) = self.base.handle() {
            self.base.bridge().release(handle)?;
        }
        Ok(())
    }

    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        Some(self)
    }
}

impl ItemContainer for DropDownNode {
    fn add_item(&self, id: &str, value: &Value, _parent_item: Option<&str>) -> Result<()> {
        Ok(self.store.append(id, value.as_str().unwrap_or_default())?)
    }

    fn insert_item_before(
        &self,
        id: &str,
        before: &str,
        value: &Value,
        _parent_item: Option<&str>,
    ) -> Result<()> {
        Ok(self
            .store
            .insert_before(id, before, value.as_str().unwrap_or_default())?)
    }

    fn remove_item(&self, id: &str, _parent_item: Option<&str>) -> Result<()> {
        Ok(self.store.remove(id)?)
    }

    fn update_item(&self, id: &str, value: &Value) -> Result<()> {
        Ok(self.store.update(id, value.as_str().unwrap_or_default())?)
    }
}

/// Virtual element describing one string-list entry.
pub struct StringItemNode {
    base: NodeBase,
    item_id: String,
    label: String,
}

impl StringItemNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "SimpleListItem";

    /// Read id and label from the element props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Self {
        let item_id = props
            .get("id")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();
        let label = props
            .get("value")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();
        Self {
            base: NodeBase::new(ctx, Self::TYPE, None, props),
            item_id,
            label,
        }
    }
}

impl Node for StringItemNode {
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
        if let Some(items) = parent.as_item_container() {
            items.add_item(&self.item_id, &Value::Str(self.label.clone()), None)?;
        }
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        let Some(items) = parent.as_item_container() else {
            return Ok(());
        };
        match before.as_any().downcast_ref::<StringItemNode>() {
            Some(before) => items.insert_item_before(
                &self.item_id,
                &before.item_id,
                &Value::Str(self.label.clone()),
                None,
            )?,
            None => items.add_item(&self.item_id, &Value::Str(self.label.clone()), None)?,
        }
        Ok(())
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(items) = parent.as_item_container() {
            items.remove_item(&self.item_id, None)?;
        }
        Ok(())
    }

    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        if !prop_changed(Some(old), new, "value") {
            return Ok(());
        }
        self.label = new
            .get("value")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();
        if let Some(items) = ctx.parent.and_then(Node::as_item_container) {
            items.update_item(&self.item_id, &Value::Str(self.label.clone()))?;
        }
        Ok(())
    }
}
