//! Id-addressed tree store bridging to an index-addressed native model.
//!
//! The store owns two representations of the same collection and keeps them
//! in lockstep:
//!
//! - the logical structure: stable string ids, per-id data payloads, and
//!   optional per-id child-id lists for tree nesting
//! - the native model: a flat, index-addressed list whose entries are the
//!   flattened, depth-first, expansion-aware projection of the logical tree
//!
//! Invariant: logical order equals native iteration order immediately after
//! every mutation returns. Mutations apply the logical edit first, then the
//! minimal native edit (one insert/remove/splice at the matching index).
//! A native failure after the logical edit leaves the logical state in
//! place and surfaces the error; there is no rollback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use horizon_trellis_core::{BridgeResult, ForeignBridge, NativeHandle, Value};

/// Hook invoked with an item id after its data payload changed in place.
pub type ItemUpdatedFn = Arc<dyn Fn(&str) + Send + Sync>;

/// One logical item.
struct ItemRecord {
    value: Value,
    parent: Option<String>,
    children: Vec<String>,
}

#[derive(Default)]
struct Inner {
    items: HashMap<String, ItemRecord>,
    roots: Vec<String>,
    expanded: HashSet<String>,
}

impl Inner {
    fn sibling_list_mut(&mut self, parent: Option<&str>) -> Option<&mut Vec<String>> {
        match parent {
            None => Some(&mut self.roots),
            Some(p) => self.items.get_mut(p).map(|r| &mut r.children),
        }
    }

    /// Whether every ancestor of `id` is expanded. Roots are always visible.
    fn is_visible(&self, id: &str) -> bool {
        let mut current = self.items.get(id).and_then(|r| r.parent.as_deref());
        while let Some(parent) = current {
            if !self.expanded.contains(parent) {
                return false;
            }
            current = self.items.get(parent).and_then(|r| r.parent.as_deref());
        }
        true
    }

    /// Visible ids in flattened, depth-first, expansion-aware order.
    fn flatten(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.items.len());
        for id in &self.roots {
            self.flatten_into(id, &mut out);
        }
        out
    }

    fn flatten_into(&self, id: &str, out: &mut Vec<String>) {
        out.push(id.to_owned());
        if self.expanded.contains(id) {
            if let Some(record) = self.items.get(id) {
                for child in &record.children {
                    self.flatten_into(child, out);
                }
            }
        }
    }

    /// Native position of a visible id.
    fn flat_index_of(&self, id: &str) -> Option<usize> {
        self.flatten().iter().position(|candidate| candidate == id)
    }

    /// Rows the subtree of a visible `id` currently occupies (itself
    /// included).
    fn visible_subtree_len(&self, id: &str) -> usize {
        let mut count = 1;
        if self.expanded.contains(id) {
            if let Some(record) = self.items.get(id) {
                for child in &record.children {
                    count += self.visible_subtree_len(child);
                }
            }
        }
        count
    }

    /// All ids in logical depth-first order, expansion ignored.
    fn dfs_ids(&self) -> Vec<String> {
        fn walk(inner: &Inner, id: &str, out: &mut Vec<String>) {
            out.push(id.to_owned());
            if let Some(record) = inner.items.get(id) {
                for child in &record.children {
                    walk(inner, child, out);
                }
            }
        }
        let mut out = Vec::with_capacity(self.items.len());
        for id in &self.roots {
            walk(self, id, &mut out);
        }
        out
    }

    /// Drop the subtree of `id` from the item map. The sibling list entry
    /// must already be gone.
    fn drop_subtree(&mut self, id: &str) {
        if let Some(record) = self.items.remove(id) {
            self.expanded.remove(id);
            for child in record.children {
                self.drop_subtree(&child);
            }
        }
    }
}

/// Id-addressed list/tree collection mirrored into a native list model.
///
/// Created when the owning virtualized widget node mounts and released with
/// it. All mutation goes through the methods here; nothing else may touch
/// the native model. Mutations referencing unknown ids are no-ops, so an
/// inconsistent caller cannot corrupt the native model.
pub struct TreeStore {
    bridge: Arc<dyn ForeignBridge>,
    model: NativeHandle,
    autoexpand: bool,
    inner: RwLock<Inner>,
    item_updated: Mutex<Vec<ItemUpdatedFn>>,
}

impl TreeStore {
    /// Create an empty store backed by a fresh native model.
    ///
    /// With `autoexpand`, newly added items start expanded so nested rows
    /// become visible without an explicit [`set_expanded`](Self::set_expanded).
    pub fn new(bridge: Arc<dyn ForeignBridge>, autoexpand: bool) -> BridgeResult<Self> {
        let model = bridge.create("StringList", &[])?;
        Ok(Self {
            bridge,
            model,
            autoexpand,
            inner: RwLock::new(Inner::default()),
            item_updated: Mutex::new(Vec::new()),
        })
    }

    /// The native model handle virtualized widgets consume.
    pub fn model(&self) -> NativeHandle {
        self.model
    }

    /// Register a hook fired after in-place item updates (row rebinding).
    /// Every renderer reading rows from this store registers one.
    pub fn add_item_updated(&self, hook: ItemUpdatedFn) {
        self.item_updated.lock().push(hook);
    }

    /// Drop all item-updated hooks. Called by the owning node on teardown.
    pub fn clear_item_updated(&self) {
        self.item_updated.lock().clear();
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an item at the end of `parent_item`'s children (top level when
    /// `None`).
    ///
    /// Duplicate ids and unknown parents are no-ops.
    pub fn append(&self, id: &str, value: Value, parent_item: Option<&str>) -> BridgeResult<()> {
        self.insert_at_sibling_position(id, value, parent_item, None)
    }

    /// Insert an item in front of sibling `before`.
    ///
    /// When `before` is not currently a sibling under `parent_item`, this
    /// appends instead. Deliberate tolerance for stale references, not an
    /// error.
    pub fn insert_before(
        &self,
        id: &str,
        before: &str,
        value: Value,
        parent_item: Option<&str>,
    ) -> BridgeResult<()> {
        self.insert_at_sibling_position(id, value, parent_item, Some(before))
    }

    fn insert_at_sibling_position(
        &self,
        id: &str,
        value: Value,
        parent_item: Option<&str>,
        before: Option<&str>,
    ) -> BridgeResult<()> {
        let native_index = {
            let mut inner = self.inner.write();
            if inner.items.contains_key(id) {
                tracing::warn!(target: "horizon_trellis::store", id, "duplicate item id ignored");
                return Ok(());
            }
            let Some(siblings) = inner.sibling_list_mut(parent_item) else {
                tracing::warn!(
                    target: "horizon_trellis::store",
                    id,
                    parent = ?parent_item,
                    "unknown parent item, mutation ignored"
                );
                return Ok(());
            };

            let position = before
                .and_then(|b| siblings.iter().position(|s| s == b))
                .unwrap_or(siblings.len());
            siblings.insert(position, id.to_owned());

            inner.items.insert(
                id.to_owned(),
                ItemRecord {
                    value,
                    parent: parent_item.map(str::to_owned),
                    children: Vec::new(),
                },
            );
            if self.autoexpand {
                inner.expanded.insert(id.to_owned());
            }

            if inner.is_visible(id) {
                inner.flat_index_of(id)
            } else {
                None
            }
        };

        if let Some(index) = native_index {
            self.bridge
                .model_insert(self.model, index, Value::Str(id.to_owned()))?;
        }
        Ok(())
    }

    /// Remove an item and its entire subtree. Unknown ids are a no-op.
    ///
    /// `parent_item` is accepted for symmetry with the other mutations; the
    /// stored parent index is authoritative.
    pub fn remove(&self, id: &str, _parent_item: Option<&str>) -> BridgeResult<()> {
        let native_range = {
            let mut inner = self.inner.write();
            if !inner.items.contains_key(id) {
                return Ok(());
            }

            let range = if inner.is_visible(id) {
                inner
                    .flat_index_of(id)
                    .map(|start| (start, inner.visible_subtree_len(id)))
            } else {
                None
            };

            let parent = inner
                .items
                .get(id)
                .and_then(|r| r.parent.clone());
            if let Some(siblings) = inner.sibling_list_mut(parent.as_deref()) {
                siblings.retain(|s| s != id);
            }
            inner.drop_subtree(id);
            range
        };

        if let Some((start, len)) = native_range {
            self.bridge.model_splice(self.model, start, len, &[])?;
        }
        Ok(())
    }

    /// Replace an item's data payload in place. Unknown ids are a no-op.
    ///
    /// The native model entry is untouched (rows read data through the store
    /// at bind time); bound rows are refreshed through the item-updated hook.
    pub fn update(&self, id: &str, value: Value) {
        {
            let mut inner = self.inner.write();
            let Some(record) = inner.items.get_mut(id) else {
                return;
            };
            record.value = value;
        }
        let hooks = self.item_updated.lock().clone();
        for hook in hooks {
            hook(id);
        }
    }

    /// Expand or collapse an item, splicing its visible descendants into or
    /// out of the native model.
    ///
    /// Expanding a childless item only records the latent state; the row's
    /// expandable indicator is derived from the child list alone.
    pub fn set_expanded(&self, id: &str, expanded: bool) -> BridgeResult<()> {
        enum Edit {
            Insert(usize, Vec<Value>),
            Remove(usize, usize),
        }

        let edit = {
            let mut inner = self.inner.write();
            if !inner.items.contains_key(id) || inner.expanded.contains(id) == expanded {
                return Ok(());
            }

            let visible = inner.is_visible(id) && inner.flat_index_of(id).is_some();
            if expanded {
                inner.expanded.insert(id.to_owned());
                if !visible {
                    None
                } else {
                    let start = inner.flat_index_of(id).unwrap_or(0);
                    let mut subtree = Vec::new();
                    inner.flatten_into(id, &mut subtree);
                    let additions: Vec<Value> = subtree
                        .into_iter()
                        .skip(1)
                        .map(Value::Str)
                        .collect();
                    (!additions.is_empty()).then_some(Edit::Insert(start + 1, additions))
                }
            } else {
                let removed = if visible {
                    let start = inner.flat_index_of(id).unwrap_or(0);
                    let len = inner.visible_subtree_len(id) - 1;
                    (len > 0).then_some(Edit::Remove(start + 1, len))
                } else {
                    None
                };
                inner.expanded.remove(id);
                removed
            }
        };

        match edit {
            Some(Edit::Insert(index, additions)) => {
                self.bridge.model_splice(self.model, index, 0, &additions)
            }
            Some(Edit::Remove(index, len)) => {
                self.bridge.model_splice(self.model, index, len, &[])
            }
            None => Ok(()),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of logical items, visible or not.
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    /// `true` when the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Number of rows the native model currently shows.
    pub fn visible_len(&self) -> usize {
        self.inner.read().flatten().len()
    }

    /// All ids in logical depth-first order, ignoring expansion.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().dfs_ids()
    }

    /// Visible ids in native iteration order.
    pub fn visible_ids(&self) -> Vec<String> {
        self.inner.read().flatten()
    }

    /// Native position of a visible item.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let inner = self.inner.read();
        if !inner.is_visible(id) {
            return None;
        }
        inner.flat_index_of(id)
    }

    /// Id of the item at a native position.
    pub fn id_at(&self, index: usize) -> Option<String> {
        self.inner.read().flatten().get(index).cloned()
    }

    /// Data payload of the item at a native position.
    pub fn value_at(&self, index: usize) -> Option<Value> {
        let inner = self.inner.read();
        let flat = inner.flatten();
        let id = flat.get(index)?;
        inner.items.get(id).map(|r| r.value.clone())
    }

    /// Data payload of an item by id.
    pub fn value_of(&self, id: &str) -> Option<Value> {
        self.inner.read().items.get(id).map(|r| r.value.clone())
    }

    /// Parent item id, when nested.
    pub fn parent_of(&self, id: &str) -> Option<String> {
        self.inner.read().items.get(id).and_then(|r| r.parent.clone())
    }

    /// Whether the item currently has children. This is the sole source of a
    /// row's expandable indicator; no separate flag is stored.
    pub fn is_expandable(&self, id: &str) -> bool {
        self.inner
            .read()
            .items
            .get(id)
            .is_some_and(|r| !r.children.is_empty())
    }

    /// Whether the item is currently expanded.
    pub fn is_expanded(&self, id: &str) -> bool {
        self.inner.read().expanded.contains(id)
    }

    /// Release the native model. Called by the owning node on teardown.
    pub fn release(&self) -> BridgeResult<()> {
        self.bridge.release(self.model)
    }
}
