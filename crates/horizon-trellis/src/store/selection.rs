//! Selection projection over a store.
//!
//! Virtualized widgets select by native index; the element tree selects by
//! stable id. [`SelectionBinding`] owns the native selection model wrapping
//! a store's list model and translates between the two. Callers never
//! observe native indices: "selection changed" reaches them as a set of ids.

use std::sync::Arc;

use horizon_trellis_core::{
    BridgeResult, ForeignBridge, NativeHandle, NodeId, SignalHandler, SignalStore, Value,
};

use super::tree_store::TreeStore;

/// How many rows may be selected at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// No rows can be selected.
    None,
    /// At most one row (default).
    #[default]
    Single,
    /// Any number of rows.
    Multiple,
}

impl SelectionMode {
    /// Parse the `selectionMode` prop value.
    pub fn from_prop(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "multiple" => Self::Multiple,
            _ => Self::Single,
        }
    }

    /// Native selection-model class implementing this mode.
    pub fn native_class(self) -> &'static str {
        match self {
            Self::None => "NoSelection",
            Self::Single => "SingleSelection",
            Self::Multiple => "MultiSelection",
        }
    }
}

/// Native selection model plus the id set last requested.
///
/// A mode change rebuilds the binding (the native class differs per mode);
/// everything else mutates the existing native model in place. Invariant:
/// immediately after [`set_selected`](Self::set_selected), the native
/// selected indices resolve back to exactly the requested id set (unknown
/// ids excluded).
pub struct SelectionBinding {
    bridge: Arc<dyn ForeignBridge>,
    mode: SelectionMode,
    handle: NativeHandle,
}

impl SelectionBinding {
    /// Build a native selection model of `mode` wrapping the store's model.
    pub fn new(
        bridge: Arc<dyn ForeignBridge>,
        store_model: NativeHandle,
        mode: SelectionMode,
    ) -> BridgeResult<Self> {
        let handle = bridge.create(mode.native_class(), &[Value::Handle(store_model)])?;
        Ok(Self { bridge, mode, handle })
    }

    /// The native selection model the widget consumes.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// The mode this binding was built for.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Select exactly the rows of `ids`, in store terms.
    ///
    /// Ids unknown to the store are skipped. With [`SelectionMode::None`]
    /// this clears any native state and stops.
    pub fn set_selected(&self, store: &TreeStore, ids: &[String]) -> BridgeResult<()> {
        self.bridge.call(self.handle, "unselect_all", &[])?;
        if self.mode == SelectionMode::None {
            return Ok(());
        }
        for id in ids {
            let Some(index) = store.index_of(id) else {
                tracing::warn!(
                    target: "horizon_trellis::store",
                    id,
                    "selected id unknown to store, skipped"
                );
                continue;
            };
            self.bridge.call(
                self.handle,
                "select_item",
                &[Value::U32(index as u32), Value::Bool(false)],
            )?;
        }
        Ok(())
    }

    /// Resolve the native selection back to logical ids, in row order.
    pub fn selected_ids(&self, store: &TreeStore) -> BridgeResult<Vec<String>> {
        let selection = self.bridge.call(self.handle, "get_selection", &[])?;
        let indices = selection.as_list().unwrap_or(&[]).to_vec();
        Ok(indices
            .iter()
            .filter_map(Value::as_u32)
            .filter_map(|index| store.id_at(index as usize))
            .collect())
    }

    /// Release the native selection model.
    pub fn release(&self) -> BridgeResult<()> {
        self.bridge.release(self.handle)
    }

    /// Connect `user` to the native "selection changed" notification, owned
    /// by `owner`.
    ///
    /// The trampoline resolves the native selection to logical ids before
    /// invoking `user`, which receives a single list-of-id-strings argument.
    /// Native indices never reach the caller. Reconnecting for the same
    /// owner replaces any previous handler.
    pub fn connect_changed(
        &self,
        signals: &SignalStore,
        owner: NodeId,
        store: Arc<TreeStore>,
        user: SignalHandler,
    ) -> BridgeResult<()> {
        let bridge = self.bridge.clone();
        let handle = self.handle;
        signals.connect(
            owner,
            handle,
            "selection-changed",
            Arc::new(move |_args| {
                let selection = match bridge.call(handle, "get_selection", &[]) {
                    Ok(value) => value,
                    Err(error) => {
                        tracing::warn!(
                            target: "horizon_trellis::store",
                            %error,
                            "native selection unreadable"
                        );
                        return;
                    }
                };
                let ids: Vec<Value> = selection
                    .as_list()
                    .unwrap_or(&[])
                    .iter()
                    .filter_map(Value::as_u32)
                    .filter_map(|index| store.id_at(index as usize))
                    .map(Value::Str)
                    .collect();
                user(&[Value::List(ids)]);
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBridge;

    fn setup(mode: SelectionMode) -> (Arc<RecordingBridge>, TreeStore, SelectionBinding) {
        let bridge = Arc::new(RecordingBridge::new());
        let store = TreeStore::new(bridge.clone(), true).unwrap();
        for id in ["a", "b", "c"] {
            store.append(id, Value::Str(id.to_owned()), None).unwrap();
        }
        let binding = SelectionBinding::new(bridge.clone(), store.model(), mode).unwrap();
        (bridge, store, binding)
    }

    #[test]
    fn test_selected_ids_round_trip() {
        let (_bridge, store, binding) = setup(SelectionMode::Multiple);
        binding
            .set_selected(&store, &["a".to_owned(), "b".to_owned()])
            .unwrap();
        assert_eq!(binding.selected_ids(&store).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_selected_ids_are_skipped() {
        let (_bridge, store, binding) = setup(SelectionMode::Multiple);
        binding
            .set_selected(&store, &["a".to_owned(), "missing".to_owned()])
            .unwrap();
        assert_eq!(binding.selected_ids(&store).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_selection_follows_store_mutations() {
        let (_bridge, store, binding) = setup(SelectionMode::Single);
        binding.set_selected(&store, &["c".to_owned()]).unwrap();

        // A mutation in front of the selection shifts native indices; the
        // requested id set must still resolve identically.
        store
            .insert_before("a0", "a", Value::Null, None)
            .unwrap();
        binding.set_selected(&store, &["c".to_owned()]).unwrap();
        assert_eq!(binding.selected_ids(&store).unwrap(), vec!["c"]);
    }

    #[test]
    fn test_no_selection_mode_selects_nothing() {
        let (_bridge, store, binding) = setup(SelectionMode::None);
        binding.set_selected(&store, &["a".to_owned()]).unwrap();
        assert!(binding.selected_ids(&store).unwrap().is_empty());
    }
}
