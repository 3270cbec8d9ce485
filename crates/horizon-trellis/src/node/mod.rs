//! The host node hierarchy and attachment protocol.
//!
//! Host nodes mirror the declarative element tree. Two kinds exist:
//!
//! - **widget nodes** own exactly one native handle; releasing it on
//!   teardown is the only path that destroys or re-parents the native object
//! - **virtual nodes** own no handle; they route or aggregate their children
//!   into a real container (a pack slot, a page descriptor, a list-item
//!   descriptor)
//!
//! At attach time a child never switches on its parent's concrete type. It
//! asks, structurally, which [container capability](crate::container) set
//! the parent satisfies - through the `as_*_container` accessors on [`Node`]
//! - and dispatches accordingly. The same native class can act as a plain
//! child container in one slot and a specialized region in another.
//!
//! # Key Types
//!
//! - [`Node`] - the trait every host node implements
//! - [`NodeBase`] - common state: id, type name, handle, parent, children,
//!   props; trait methods default to delegating here
//! - [`CommitContext`] / [`CreateContext`] - ambient references handed to
//!   node hooks by the host tree

use std::any::Any;
use std::sync::Arc;

use horizon_trellis_core::{ForeignBridge, NativeHandle, NodeId, SignalStore, Value};

use crate::container::{
    ChildContainer, ColumnContainer, GridContainer, ItemContainer, PackContainer, PageContainer,
    StackPageContainer,
};
use crate::error::{Error, Result};
use crate::host::FlushQueue;
use crate::props::{
    callback_change, is_signal_prop, property_name_for_prop, signal_name_for_prop, CallbackChange,
    Props, PropValue,
};
use crate::store::TreeStore;

mod column_view;
mod drop_down;
mod grid;
mod list_item;
mod list_view;
mod notebook;
mod pack;
mod stack;
mod widget;

pub use column_view::{ColumnNode, ColumnViewNode};
pub use drop_down::{DropDownNode, StringItemNode};
pub use grid::{GridChildNode, GridNode};
pub use list_item::ListItemNode;
pub use list_view::ListViewNode;
pub use notebook::{NotebookNode, NotebookPageNode};
pub use pack::PackSlotNode;
pub use stack::{StackNode, StackPageNode};
pub use widget::WidgetNode;

/// Ambient references available while constructing a node.
pub struct CreateContext<'a> {
    /// The id the node will occupy in the host tree arena.
    pub id: NodeId,
    /// The foreign-function bridge.
    pub bridge: &'a Arc<dyn ForeignBridge>,
    /// The connection table initial signal props are registered with.
    pub signals: &'a SignalStore,
}

/// Ambient references available during `commit_update` / `commit_mount`.
pub struct CommitContext<'a> {
    /// The connection table for signal prop changes.
    pub signals: &'a SignalStore,
    /// The node's current parent, when it has one.
    pub parent: Option<&'a dyn Node>,
    /// Queue for work deferred to the end of the current commit.
    pub flush: &'a FlushQueue,
}

/// Common state shared by every node implementation.
pub struct NodeBase {
    id: NodeId,
    type_name: String,
    bridge: Arc<dyn ForeignBridge>,
    handle: Option<NativeHandle>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    props: Props,
}

impl NodeBase {
    /// Create the base for a node.
    pub fn new(
        ctx: &CreateContext<'_>,
        type_name: impl Into<String>,
        handle: Option<NativeHandle>,
        props: Props,
    ) -> Self {
        Self {
            id: ctx.id,
            type_name: type_name.into(),
            bridge: ctx.bridge.clone(),
            handle,
            parent: None,
            children: Vec::new(),
            props,
        }
    }

    /// The node's arena id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The element type this node was created for.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The bridge every native effect goes through.
    pub fn bridge(&self) -> &Arc<dyn ForeignBridge> {
        &self.bridge
    }

    /// The owned native handle, for widget nodes.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    /// The current parent in the host tree.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Reassign the parent (host-tree bookkeeping only).
    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// The ordered children in the host tree.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Append a child id, dropping any previous occurrence (re-append moves).
    pub fn push_child(&mut self, child: NodeId) {
        self.children.retain(|&c| c != child);
        self.children.push(child);
    }

    /// Insert a child id in front of `before`; appends when `before` is not
    /// currently a child.
    pub fn insert_child_before(&mut self, child: NodeId, before: NodeId) {
        self.children.retain(|&c| c != child);
        let position = self
            .children
            .iter()
            .position(|&c| c == before)
            .unwrap_or(self.children.len());
        self.children.insert(position, child);
    }

    /// Drop a child id.
    pub fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&c| c != child);
    }

    /// The props as of the last committed update.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Replace the committed props (called by the host tree after an
    /// update has been applied).
    pub fn set_props(&mut self, props: Props) {
        self.props = props;
    }

    /// Apply a prop diff to the owned native handle.
    ///
    /// Plain values become property writes with camelCase keys mapped to the
    /// toolkit's kebab-case names; event callbacks become signal connections
    /// through `signals`, replaced or torn down as the diff dictates. Keys in
    /// `skip` are consumed by the node itself and ignored here. When more
    /// than one property write results, the writes are batched inside one
    /// freeze/thaw-notification pair; the final native state is identical
    /// either way.
    pub fn apply_props(
        &self,
        signals: &SignalStore,
        old: Option<&Props>,
        new: &Props,
        skip: &[&str],
    ) -> Result<()> {
        let Some(handle) = self.handle else {
            return Ok(());
        };

        let mut writes: Vec<(String, Value)> = Vec::new();

        if let Some(old) = old {
            for (key, value) in old {
                if skip.contains(&key.as_str()) || new.contains_key(key) {
                    continue;
                }
                match value {
                    PropValue::Callback(_) if is_signal_prop(key) => {
                        signals.disconnect(self.id, &signal_name_for_prop(key));
                    }
                    PropValue::Value(_) => {
                        writes.push((property_name_for_prop(key), Value::Null));
                    }
                    _ => {}
                }
            }
        }

        for (key, value) in new {
            if skip.contains(&key.as_str()) {
                continue;
            }
            match value {
                PropValue::Callback(_) if is_signal_prop(key) => {
                    let previous = old.and_then(|o| o.get(key));
                    match callback_change(previous, Some(value)) {
                        CallbackChange::Added(handler) | CallbackChange::Replaced(handler) => {
                            signals.connect(
                                self.id,
                                handle,
                                &signal_name_for_prop(key),
                                handler,
                            )?;
                        }
                        CallbackChange::Removed | CallbackChange::Unchanged => {}
                    }
                }
                PropValue::Value(v) => {
                    let changed = old.is_none_or(|o| o.get(key) != Some(value));
                    if changed {
                        writes.push((property_name_for_prop(key), v.clone()));
                    }
                }
                // Render functions and non-signal callbacks are consumed by
                // specialized nodes through their skip lists.
                _ => {}
            }
        }

        match writes.as_slice() {
            [] => Ok(()),
            [(name, value)] => Ok(self.bridge.set_property(handle, name, value.clone())?),
            _ => {
                self.bridge.freeze_notify(handle)?;
                let result = writes
                    .iter()
                    .try_for_each(|(name, value)| {
                        self.bridge.set_property(handle, name, value.clone())
                    });
                self.bridge.thaw_notify(handle)?;
                Ok(result?)
            }
        }
    }
}

/// One node of the host tree.
///
/// Default method implementations cover the common widget case; virtual
/// nodes override the attachment protocol, and container nodes expose their
/// capabilities through the `as_*_container` accessors.
pub trait Node: Send + Sync {
    /// The node's common state.
    fn base(&self) -> &NodeBase;

    /// Mutable access to the common state.
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Concrete-type escape hatch for host-tree orchestration.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete-type escape hatch.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The node's arena id.
    fn id(&self) -> NodeId {
        self.base().id()
    }

    /// The element type this node was created for.
    fn type_name(&self) -> &str {
        self.base().type_name()
    }

    /// The native handle this node owns, if it owns one.
    fn handle(&self) -> Option<NativeHandle> {
        self.base().handle()
    }

    /// The native widget this node contributes when a parent attaches it.
    ///
    /// Widget nodes contribute their own handle; virtual slot nodes forward
    /// the handle of the child widget they wrap; pure descriptor nodes
    /// contribute nothing.
    fn attached_handle(&self) -> Option<NativeHandle> {
        self.handle()
    }

    // =========================================================================
    // Host-side child bookkeeping hooks
    // =========================================================================

    /// Called after `child` was recorded as a child of this node.
    ///
    /// `own_parent` is this node's current parent, so slot nodes can attach
    /// a late-arriving child widget into the container they already sit in.
    /// Returns `true` when this node fully handled the native attachment and
    /// the child's own attach dispatch must be skipped.
    fn on_child_appended(
        &mut self,
        _child: &mut dyn Node,
        _own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Called before `child` is dropped from this node's children.
    ///
    /// Returns `true` when this node fully handled the native detachment.
    fn on_child_removed(
        &mut self,
        _child: &mut dyn Node,
        _own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        Ok(false)
    }

    // =========================================================================
    // Attachment protocol
    // =========================================================================

    /// Attach this node's contribution to `parent`, at the end.
    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        match self.attached_handle() {
            Some(handle) => attach_handle(parent, self.type_name(), handle, None),
            None => Ok(()),
        }
    }

    /// Attach this node's contribution in front of `before`.
    ///
    /// Falls back to a plain attach when `before` contributes no handle.
    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        match self.attached_handle() {
            Some(handle) => {
                attach_handle(parent, self.type_name(), handle, before.attached_handle())
            }
            None => Ok(()),
        }
    }

    /// Detach this node's contribution from `parent`.
    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        match self.attached_handle() {
            Some(handle) => detach_handle(parent, self.type_name(), handle),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Commit hooks
    // =========================================================================

    /// Apply an already-diffed prop update.
    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()>;

    /// Called once after the node's initial subtree is in place.
    fn commit_mount(&mut self, _ctx: &CommitContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Release owned native resources. Connections owned by the node have
    /// already been drained; children have already been torn down.
    fn teardown(&mut self, _signals: &SignalStore) -> Result<()> {
        if let Some(handle) = self.base().handle() {
            self.base().bridge().release(handle)?;
        }
        Ok(())
    }

    // =========================================================================
    // Capability queries
    // =========================================================================

    /// The store this node exposes to list-item descendants, if any.
    fn item_store(&self) -> Option<Arc<TreeStore>> {
        None
    }

    /// This node as an ordered child container, if it satisfies one.
    fn as_child_container(&self) -> Option<&dyn ChildContainer> {
        None
    }

    /// This node as a start/end pack container, if it satisfies one.
    fn as_pack_container(&self) -> Option<&dyn PackContainer> {
        None
    }

    /// This node as a grid container, if it satisfies one.
    fn as_grid_container(&self) -> Option<&dyn GridContainer> {
        None
    }

    /// This node as a tab-page container, if it satisfies one.
    fn as_page_container(&self) -> Option<&dyn PageContainer> {
        None
    }

    /// This node as a stack-page container, if it satisfies one.
    fn as_stack_page_container(&self) -> Option<&dyn StackPageContainer> {
        None
    }

    /// This node as an id-driven item container, if it satisfies one.
    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        None
    }

    /// This node as a column container, if it satisfies one.
    fn as_column_container(&self) -> Option<&dyn ColumnContainer> {
        None
    }
}

/// Dispatch a widget attachment against the parent's capability set.
pub(crate) fn attach_handle(
    parent: &dyn Node,
    child_type: &str,
    child: NativeHandle,
    before: Option<NativeHandle>,
) -> Result<()> {
    if let Some(container) = parent.as_child_container() {
        match before {
            Some(before) => container.insert_child_before(child, before),
            None => container.attach_child(child),
        }
    } else if let Some(pack) = parent.as_pack_container() {
        // A plain child of a pack container lands in the start group; the
        // Pack.End slot exists for the other one.
        pack.pack_start(child)
    } else {
        Err(Error::unsupported_child(parent.type_name(), child_type))
    }
}

/// Dispatch a widget detachment against the parent's capability set.
pub(crate) fn detach_handle(
    parent: &dyn Node,
    child_type: &str,
    child: NativeHandle,
) -> Result<()> {
    if let Some(container) = parent.as_child_container() {
        container.detach_child(child)
    } else if let Some(pack) = parent.as_pack_container() {
        pack.remove_from_pack(child)
    } else {
        Err(Error::unsupported_child(parent.type_name(), child_type))
    }
}
