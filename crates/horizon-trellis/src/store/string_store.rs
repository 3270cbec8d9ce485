//! Flat id-to-label store for string-list widgets.
//!
//! Dropdown-style widgets consume a native string-list model directly; the
//! label is the model entry. This store keeps the stable string ids the
//! element tree addresses items by, mirrored into that native model with the
//! same mutation discipline as the tree store: logical edit first, then the
//! minimal native edit.

use std::sync::Arc;

use parking_lot::RwLock;

use horizon_trellis_core::{BridgeResult, ForeignBridge, NativeHandle, Value};

struct StringItem {
    id: String,
    label: String,
}

/// Ordered id-to-label mapping mirrored into a native string-list model.
pub struct StringStore {
    bridge: Arc<dyn ForeignBridge>,
    model: NativeHandle,
    items: RwLock<Vec<StringItem>>,
}

impl StringStore {
    /// Create an empty store backed by a fresh native string-list model.
    pub fn new(bridge: Arc<dyn ForeignBridge>) -> BridgeResult<Self> {
        let model = bridge.create("StringList", &[])?;
        Ok(Self {
            bridge,
            model,
            items: RwLock::new(Vec::new()),
        })
    }

    /// The native model handle the widget consumes.
    pub fn model(&self) -> NativeHandle {
        self.model
    }

    /// Append an item. Duplicate ids are a no-op.
    pub fn append(&self, id: &str, label: &str) -> BridgeResult<()> {
        let index = {
            let mut items = self.items.write();
            if items.iter().any(|item| item.id == id) {
                tracing::warn!(target: "horizon_trellis::store", id, "duplicate item id ignored");
                return Ok(());
            }
            items.push(StringItem {
                id: id.to_owned(),
                label: label.to_owned(),
            });
            items.len() - 1
        };
        self.bridge
            .model_insert(self.model, index, Value::Str(label.to_owned()))
    }

    /// Insert an item in front of `before`; appends when `before` is
    /// unknown.
    pub fn insert_before(&self, id: &str, before: &str, label: &str) -> BridgeResult<()> {
        let index = {
            let mut items = self.items.write();
            if items.iter().any(|item| item.id == id) {
                return Ok(());
            }
            let index = items
                .iter()
                .position(|item| item.id == before)
                .unwrap_or(items.len());
            items.insert(
                index,
                StringItem {
                    id: id.to_owned(),
                    label: label.to_owned(),
                },
            );
            index
        };
        self.bridge
            .model_insert(self.model, index, Value::Str(label.to_owned()))
    }

    /// Remove an item. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> BridgeResult<()> {
        let index = {
            let mut items = self.items.write();
            let Some(index) = items.iter().position(|item| item.id == id) else {
                return Ok(());
            };
            items.remove(index);
            index
        };
        self.bridge.model_remove(self.model, index)
    }

    /// Replace an item's label in place. Unknown ids are a no-op.
    pub fn update(&self, id: &str, label: &str) -> BridgeResult<()> {
        let index = {
            let mut items = self.items.write();
            let Some(index) = items.iter().position(|item| item.id == id) else {
                return Ok(());
            };
            items[index].label = label.to_owned();
            index
        };
        self.bridge
            .model_splice(self.model, index, 1, &[Value::Str(label.to_owned())])
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// `true` when the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Native position of an item.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.items.read().iter().position(|item| item.id == id)
    }

    /// Id of the item at a native position.
    pub fn id_at(&self, index: usize) -> Option<String> {
        self.items.read().get(index).map(|item| item.id.clone())
    }

    /// Label of the item at a native position.
    pub fn label_at(&self, index: usize) -> Option<String> {
        self.items.read().get(index).map(|item| item.label.clone())
    }

    /// Ids in native iteration order.
    pub fn ids(&self) -> Vec<String> {
        self.items.read().iter().map(|item| item.id.clone()).collect()
    }

    /// Release the native model. Called by the owning node on teardown.
    pub fn release(&self) -> BridgeResult<()> {
        self.bridge.release(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBridge;

    fn native_labels(bridge: &RecordingBridge, store: &StringStore) -> Vec<String> {
        bridge
            .model_entries(store.model())
            .into_iter()
            .map(|v| v.as_str().unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn test_order_mirrors_native_model() {
        let bridge = Arc::new(RecordingBridge::new());
        let store = StringStore::new(bridge.clone()).unwrap();

        store.append("a", "Alpha").unwrap();
        store.append("c", "Gamma").unwrap();
        store.insert_before("b", "c", "Beta").unwrap();

        assert_eq!(store.ids(), vec!["a", "b", "c"]);
        assert_eq!(native_labels(&bridge, &store), vec!["Alpha", "Beta", "Gamma"]);

        store.remove("a").unwrap();
        assert_eq!(store.ids(), vec!["b", "c"]);
        assert_eq!(native_labels(&bridge, &store), vec!["Beta", "Gamma"]);
    }

    #[test]
    fn test_update_replaces_label_in_place() {
        let bridge = Arc::new(RecordingBridge::new());
        let store = StringStore::new(bridge.clone()).unwrap();
        store.append("a", "Alpha").unwrap();
        store.update("a", "Ayy").unwrap();
        assert_eq!(native_labels(&bridge, &store), vec!["Ayy"]);
        assert_eq!(store.label_at(0).as_deref(), Some("Ayy"));
    }

    #[test]
    fn test_unknown_id_mutations_are_noops() {
        let bridge = Arc::new(RecordingBridge::new());
        let store = StringStore::new(bridge.clone()).unwrap();
        store.append("a", "Alpha").unwrap();
        store.remove("missing").unwrap();
        store.update("missing", "X").unwrap();
        assert_eq!(store.ids(), vec!["a"]);
        assert_eq!(native_labels(&bridge, &store), vec!["Alpha"]);
    }

    #[test]
    fn test_insert_before_absent_appends() {
        let bridge = Arc::new(RecordingBridge::new());
        let store = StringStore::new(bridge).unwrap();
        store.append("a", "Alpha").unwrap();
        store.insert_before("z", "missing", "Zeta").unwrap();
        assert_eq!(store.ids(), vec!["a", "z"]);
    }
}
