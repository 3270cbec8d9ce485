//! The host tree and the commit protocol.
//!
//! [`HostTree`] owns the node arena, the signal connection table, and the
//! bridge. Its public methods are the entry points the upstream declarative
//! runtime invokes from its commit phase:
//!
//! `create`, `append_child`, `insert_before`, `remove_child`,
//! `commit_update`, `commit_mount`, `unmount`
//!
//! Calls arrive already diffed and strictly ordered; they are applied
//! causally, never reordered or coalesced across calls. The one sanctioned
//! exception is inside a single `commit_update`: consecutive native property
//! writes may be batched in one freeze/thaw-notification pair (see
//! [`NodeBase::apply_props`](crate::node::NodeBase::apply_props)), with an
//! unchanged externally observable final state.
//!
//! `begin_commit` / `end_commit` bracket one upstream commit phase; work
//! scheduled on the [`FlushQueue`] inside the bracket runs when it closes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::SlotMap;

use horizon_trellis_core::logging::{format_tree, PerfSpan};
use horizon_trellis_core::{ForeignBridge, NativeHandle, NodeId, SignalStore};

use crate::error::{Error, Result};
use crate::factory;
use crate::node::{CommitContext, CreateContext, ListItemNode, Node};
use crate::props::Props;
use crate::store::TreeStore;

/// Deferred work unit run at the end of the current commit.
pub type FlushFn = Box<dyn FnOnce() + Send>;

/// Queue of work deferred to the end of the running commit.
///
/// Outside a commit bracket, scheduled work runs immediately.
pub struct FlushQueue {
    in_commit: AtomicBool,
    pending: Mutex<Vec<FlushFn>>,
}

impl FlushQueue {
    fn new() -> Self {
        Self {
            in_commit: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Run `work` now, or at the end of the commit when one is open.
    pub fn schedule(&self, work: FlushFn) {
        if self.in_commit.load(Ordering::Relaxed) {
            self.pending.lock().push(work);
        } else {
            work();
        }
    }

    fn begin(&self) {
        self.in_commit.store(true, Ordering::Relaxed);
    }

    fn end(&self) {
        self.in_commit.store(false, Ordering::Relaxed);
        let pending = std::mem::take(&mut *self.pending.lock());
        for work in pending {
            work();
        }
    }
}

/// The retained host tree and its commit-protocol surface.
pub struct HostTree {
    bridge: Arc<dyn ForeignBridge>,
    signals: SignalStore,
    nodes: SlotMap<NodeId, Box<dyn Node>>,
    flush: FlushQueue,
}

impl HostTree {
    /// Create an empty host tree over `bridge`.
    pub fn new(bridge: Arc<dyn ForeignBridge>) -> Self {
        Self {
            signals: SignalStore::new(bridge.clone()),
            bridge,
            nodes: SlotMap::with_key(),
            flush: FlushQueue::new(),
        }
    }

    /// The bridge every native effect goes through.
    pub fn bridge(&self) -> &Arc<dyn ForeignBridge> {
        &self.bridge
    }

    /// The signal connection table.
    pub fn signals(&self) -> &SignalStore {
        &self.signals
    }

    // =========================================================================
    // Commit protocol entry points
    // =========================================================================

    /// Create the host node (and native object) for an element.
    ///
    /// An element type with no node implementation and no introspected
    /// native class is fatal.
    #[tracing::instrument(skip(self, props), target = "horizon_trellis::host", level = "debug")]
    pub fn create(&mut self, type_name: &str, props: Props) -> Result<NodeId> {
        let Self {
            bridge,
            signals,
            nodes,
            ..
        } = self;
        nodes.try_insert_with_key(|id| {
            let ctx = CreateContext {
                id,
                bridge,
                signals,
            };
            factory::create_node(&ctx, type_name, props)
        })
    }

    /// Attach `child` at the end of `parent`'s children.
    ///
    /// Re-appending a child already in that position is a no-op.
    #[tracing::instrument(skip(self), target = "horizon_trellis::host", level = "trace")]
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        {
            let parent_node = self.nodes.get(parent).ok_or(Error::NodeGone)?;
            let child_node = self.nodes.get(child).ok_or(Error::NodeGone)?;
            if child_node.base().parent() == Some(parent)
                && parent_node.base().children().last() == Some(&child)
            {
                return Ok(());
            }
        }

        self.with_edge(parent, child, |parent_node, child_node, grandparent| {
            child_node.base_mut().set_parent(Some(parent));
            parent_node.base_mut().push_child(child);
            let handled = parent_node.on_child_appended(child_node, grandparent)?;
            if !handled {
                child_node.attach_to_parent(parent_node)?;
            }
            Ok(())
        })?;
        self.bind_item_subtree(child)
    }

    /// Attach `child` in front of `before` among `parent`'s children.
    #[tracing::instrument(skip(self), target = "horizon_trellis::host", level = "trace")]
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) -> Result<()> {
        if child == before {
            return Ok(());
        }
        if !self.nodes.contains_key(before) {
            // Stale sibling reference: tolerated, degrade to an append.
            return self.append_child(parent, child);
        }

        let grandparent_id = self
            .nodes
            .get(parent)
            .ok_or(Error::NodeGone)?
            .base()
            .parent()
            .filter(|&gp| self.nodes.contains_key(gp) && gp != before && gp != child);

        match grandparent_id {
            Some(gp) => {
                let [parent_node, child_node, before_node, grandparent] = self
                    .nodes
                    .get_disjoint_mut([parent, child, before, gp])
                    .ok_or(Error::NodeGone)?;
                child_node.base_mut().set_parent(Some(parent));
                parent_node.base_mut().insert_child_before(child, before);
                let handled =
                    parent_node.on_child_appended(child_node.as_mut(), Some(grandparent.as_ref()))?;
                if !handled {
                    child_node.attach_to_parent_before(parent_node.as_ref(), before_node.as_ref())?;
                }
            }
            None => {
                let [parent_node, child_node, before_node] = self
                    .nodes
                    .get_disjoint_mut([parent, child, before])
                    .ok_or(Error::NodeGone)?;
                child_node.base_mut().set_parent(Some(parent));
                parent_node.base_mut().insert_child_before(child, before);
                let handled = parent_node.on_child_appended(child_node.as_mut(), None)?;
                if !handled {
                    child_node.attach_to_parent_before(parent_node.as_ref(), before_node.as_ref())?;
                }
            }
        }
        self.bind_item_subtree(child)
    }

    /// Detach `child` from `parent` without destroying it.
    ///
    /// The child stays alive in the host tree (the runtime may re-insert it
    /// elsewhere); destruction only happens through [`unmount`](Self::unmount).
    #[tracing::instrument(skip(self), target = "horizon_trellis::host", level = "trace")]
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.with_edge(parent, child, |parent_node, child_node, grandparent| {
            let handled = parent_node.on_child_removed(child_node, grandparent)?;
            if !handled {
                child_node.detach_from_parent(parent_node)?;
            }
            parent_node.base_mut().remove_child(child);
            child_node.base_mut().set_parent(None);
            Ok(())
        })?;
        self.unbind_item_subtree(child);
        Ok(())
    }

    /// Apply an already-diffed prop update to a node.
    #[tracing::instrument(skip(self, old, new), target = "horizon_trellis::host", level = "trace")]
    pub fn commit_update(&mut self, id: NodeId, old: &Props, new: Props) -> Result<()> {
        let Self {
            signals,
            nodes,
            flush,
            ..
        } = self;
        let parent = nodes
            .get(id)
            .ok_or(Error::NodeGone)?
            .base()
            .parent()
            .filter(|&p| nodes.contains_key(p));

        match parent {
            Some(p) => {
                let [node, parent_node] =
                    nodes.get_disjoint_mut([id, p]).ok_or(Error::NodeGone)?;
                let ctx = CommitContext {
                    signals,
                    parent: Some(parent_node.as_ref()),
                    flush,
                };
                node.commit_update(old, &new, &ctx)?;
            }
            None => {
                let node = nodes.get_mut(id).ok_or(Error::NodeGone)?;
                let ctx = CommitContext {
                    signals,
                    parent: None,
                    flush,
                };
                node.commit_update(old, &new, &ctx)?;
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.base_mut().set_props(new);
        }
        Ok(())
    }

    /// Run a node's mount hook after its initial subtree is in place.
    #[tracing::instrument(skip(self), target = "horizon_trellis::host", level = "trace")]
    pub fn commit_mount(&mut self, id: NodeId) -> Result<()> {
        let Self {
            signals,
            nodes,
            flush,
            ..
        } = self;
        let node = nodes.get_mut(id).ok_or(Error::NodeGone)?;
        let ctx = CommitContext {
            signals,
            parent: None,
            flush,
        };
        node.commit_mount(&ctx)
    }

    /// Destroy a node and its entire subtree.
    ///
    /// Unconditional: every owned signal connection is torn down and every
    /// owned native handle released, children before parents, before this
    /// returns. A failure part-way does not stop the cascade; the first
    /// error is reported after it completes.
    #[tracing::instrument(skip(self), target = "horizon_trellis::host", level = "debug")]
    pub fn unmount(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.nodes.get(id).map(|n| n.base().parent()) else {
            return Ok(());
        };
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent_node.base_mut().remove_child(id);
        }

        let _span = PerfSpan::new("unmount");
        let mut order = Vec::new();
        self.collect_teardown_order(id, &mut order);
        tracing::debug!(
            target: "horizon_trellis::host",
            count = order.len(),
            "tearing down subtree"
        );

        let mut first_error = None;
        for node_id in order {
            self.signals.disconnect_node(node_id);
            if let Some(mut node) = self.nodes.remove(node_id) {
                if let Err(error) = node.teardown(&self.signals) {
                    tracing::warn!(
                        target: "horizon_trellis::host",
                        %error,
                        "teardown failure, cascade continues"
                    );
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Open a commit bracket; deferred flush work queues until it closes.
    pub fn begin_commit(&self) {
        self.flush.begin();
    }

    /// Close the commit bracket, running deferred flush work.
    pub fn end_commit(&self) {
        self.flush.end();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether a node is currently part of the tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id).map(Box::as_ref)
    }

    /// The native handle a node owns, if any.
    pub fn handle_of(&self, id: NodeId) -> Option<NativeHandle> {
        self.nodes.get(id).and_then(|n| n.handle())
    }

    /// The ordered children of a node.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| n.base().children().to_vec())
            .unwrap_or_default()
    }

    /// The parent of a node.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.base().parent())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indented dump of the subtree under `id`, for tracing output.
    pub fn dump(&self, id: NodeId) -> String {
        struct DumpNode {
            label: String,
            children: Vec<DumpNode>,
        }

        fn build(tree: &HostTree, id: NodeId) -> DumpNode {
            let label = tree
                .nodes
                .get(id)
                .map(|node| match node.handle() {
                    Some(handle) => format!("{} {handle}", node.type_name()),
                    None => node.type_name().to_owned(),
                })
                .unwrap_or_else(|| "<gone>".to_owned());
            DumpNode {
                label,
                children: tree
                    .children_of(id)
                    .into_iter()
                    .map(|child| build(tree, child))
                    .collect(),
            }
        }

        let root = build(self, id);
        format_tree(&root, &|n| n.label.clone(), &|n| n.children.iter().collect())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run `edit` with (parent, child, grandparent) fetched disjointly.
    fn with_edge<F>(&mut self, parent: NodeId, child: NodeId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Node, &mut dyn Node, Option<&dyn Node>) -> Result<()>,
    {
        let grandparent_id = self
            .nodes
            .get(parent)
            .ok_or(Error::NodeGone)?
            .base()
            .parent()
            .filter(|&gp| self.nodes.contains_key(gp) && gp != child);

        match grandparent_id {
            Some(gp) => {
                let [parent_node, child_node, grandparent] = self
                    .nodes
                    .get_disjoint_mut([parent, child, gp])
                    .ok_or(Error::NodeGone)?;
                edit(
                    parent_node.as_mut(),
                    child_node.as_mut(),
                    Some(grandparent.as_ref()),
                )
            }
            None => {
                let [parent_node, child_node] = self
                    .nodes
                    .get_disjoint_mut([parent, child])
                    .ok_or(Error::NodeGone)?;
                edit(parent_node.as_mut(), child_node.as_mut(), None)
            }
        }
    }

    /// Teardown order for a subtree: children before parents, `id` last.
    fn collect_teardown_order(&self, id: NodeId, order: &mut Vec<NodeId>) {
        for child in self.children_of(id) {
            self.collect_teardown_order(child, order);
        }
        order.push(id);
    }

    /// After an item subtree attached under a store owner, push the store
    /// down and register descendants depth-first.
    fn bind_item_subtree(&mut self, root: NodeId) -> Result<()> {
        let root_binding = self.nodes.get(root).and_then(|node| {
            let item = node.as_any().downcast_ref::<ListItemNode>()?;
            let store = item.store()?.clone();
            Some((store, item.item_id().to_owned()))
        });
        let Some((store, root_item)) = root_binding else {
            return Ok(());
        };
        self.bind_item_children(root, &store, &root_item)
    }

    fn bind_item_children(
        &mut self,
        parent_node: NodeId,
        store: &Arc<TreeStore>,
        parent_item: &str,
    ) -> Result<()> {
        for child in self.children_of(parent_node) {
            let binding = {
                let Some(node) = self.nodes.get_mut(child) else {
                    continue;
                };
                let Some(item) = node.as_any_mut().downcast_mut::<ListItemNode>() else {
                    continue;
                };
                if item.store().is_some() {
                    // Already registered through its own attach.
                    Some((item.item_id().to_owned(), None))
                } else {
                    item.bind_store(store.clone(), Some(parent_item.to_owned()));
                    Some((
                        item.item_id().to_owned(),
                        Some(item.value().clone()),
                    ))
                }
            };
            if let Some((item_id, value)) = binding {
                if let Some(value) = value {
                    store.append(&item_id, value, Some(parent_item))?;
                }
                self.bind_item_children(child, store, &item_id)?;
            }
        }
        Ok(())
    }

    /// After an item subtree detached, drop the store bindings underneath.
    fn unbind_item_subtree(&mut self, root: NodeId) {
        let is_item = self
            .nodes
            .get(root)
            .is_some_and(|n| n.as_any().is::<ListItemNode>());
        if !is_item {
            return;
        }
        for child in self.children_of(root) {
            if let Some(node) = self.nodes.get_mut(child) {
                if let Some(item) = node.as_any_mut().downcast_mut::<ListItemNode>() {
                    item.unbind_store();
                }
            }
            self.unbind_item_subtree(child);
        }
    }
}
