//! Virtualized widget integration tests: list, table, dropdown.

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_trellis::store::RowSlot;
use horizon_trellis::testing::RecordingBridge;
use horizon_trellis::{HostTree, NativeHandle, NodeId, PropValue, Props, Value};

fn props(entries: &[(&str, PropValue)]) -> Props {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn setup() -> (Arc<RecordingBridge>, HostTree) {
    let bridge = Arc::new(RecordingBridge::new());
    let tree = HostTree::new(bridge.clone());
    (bridge, tree)
}

fn item(tree: &mut HostTree, id: &str, value: &str) -> NodeId {
    tree.create(
        "ListItem",
        props(&[("id", PropValue::from(id)), ("value", PropValue::from(value))]),
    )
    .unwrap()
}

/// The store model handle a virtualized widget's rows live in.
fn store_model(bridge: &RecordingBridge, tree: &HostTree, widget: NodeId) -> NativeHandle {
    let selection = bridge
        .property(tree.handle_of(widget).unwrap(), "model")
        .as_handle()
        .unwrap();
    bridge.property(selection, "model").as_handle().unwrap()
}

fn model_ids(bridge: &RecordingBridge, model: NativeHandle) -> Vec<String> {
    bridge
        .model_entries(model)
        .into_iter()
        .map(|v| v.as_str().unwrap_or_default().to_owned())
        .collect()
}

#[test]
fn test_list_items_mirror_into_native_model() {
    let (bridge, mut tree) = setup();
    let list = tree.create("ListView", Props::new()).unwrap();
    tree.commit_mount(list).unwrap();

    let a = item(&mut tree, "A", "first");
    let c = item(&mut tree, "C", "third");
    tree.append_child(list, a).unwrap();
    tree.append_child(list, c).unwrap();

    let model = store_model(&bridge, &tree, list);
    assert_eq!(model_ids(&bridge, model), vec!["A", "C"]);

    // insertBefore(B, C) on logical ids [A, C] yields [A, B, C], length 3.
    let b = item(&mut tree, "B", "second");
    tree.insert_before(list, b, c).unwrap();
    assert_eq!(model_ids(&bridge, model), vec!["A", "B", "C"]);

    tree.remove_child(list, a).unwrap();
    assert_eq!(model_ids(&bridge, model), vec!["B", "C"]);
}

#[test]
fn test_nested_items_bind_when_ancestor_attaches() {
    let (bridge, mut tree) = setup();
    let list = tree.create("ListView", Props::new()).unwrap();
    tree.commit_mount(list).unwrap();

    // Build the item subtree bottom-up before the list ever sees it.
    let parent = item(&mut tree, "folder", "Folder");
    let leaf_a = item(&mut tree, "a", "File A");
    let leaf_b = item(&mut tree, "b", "File B");
    tree.append_child(parent, leaf_a).unwrap();
    tree.append_child(parent, leaf_b).unwrap();
    tree.append_child(list, parent).unwrap();

    let model = store_model(&bridge, &tree, list);
    assert_eq!(model_ids(&bridge, model), vec!["folder", "a", "b"]);

    // Nested insert through the already-bound parent.
    let leaf_c = item(&mut tree, "c", "File C");
    tree.insert_before(parent, leaf_c, leaf_b).unwrap();
    assert_eq!(model_ids(&bridge, model), vec!["folder", "a", "c", "b"]);

    // Removing the subtree root drops the whole visible range.
    tree.remove_child(list, parent).unwrap();
    assert!(model_ids(&bridge, model).is_empty());
}

#[test]
fn test_selection_round_trips_as_ids() {
    let (bridge, mut tree) = setup();
    let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let on_changed = PropValue::callback(move |args| {
        let ids = args
            .first()
            .and_then(Value::as_list)
            .map(|list| {
                list.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();
        seen_clone.lock().push(ids);
    });

    let initial = props(&[
        ("selectionMode", PropValue::from("multiple")),
        ("onSelectionChanged", on_changed),
    ]);
    let list = tree.create("ListView", initial.clone()).unwrap();
    for (id, value) in [("a", "A"), ("b", "B"), ("c", "C")] {
        let node = item(&mut tree, id, value);
        tree.append_child(list, node).unwrap();
    }
    tree.commit_mount(list).unwrap();

    let mut updated = initial.clone();
    updated.insert(
        "selected".to_owned(),
        PropValue::from(Value::List(vec![Value::from("a"), Value::from("b")])),
    );
    tree.commit_update(list, &initial, updated).unwrap();

    let selection = bridge
        .property(tree.handle_of(list).unwrap(), "model")
        .as_handle()
        .unwrap();
    bridge.emit(selection, "selection-changed", &[]);

    assert_eq!(seen.lock().last().cloned(), Some(vec!["a".to_owned(), "b".to_owned()]));
}

#[test]
fn test_selection_mode_change_rebuilds_native_model() {
    let (bridge, mut tree) = setup();
    let initial = props(&[("selectionMode", PropValue::from("single"))]);
    let list = tree.create("ListView", initial.clone()).unwrap();
    tree.commit_mount(list).unwrap();

    let list_handle = tree.handle_of(list).unwrap();
    let before = bridge.property(list_handle, "model").as_handle().unwrap();
    assert_eq!(bridge.class_of(before).as_deref(), Some("SingleSelection"));

    tree.commit_update(
        list,
        &initial,
        props(&[("selectionMode", PropValue::from("multiple"))]),
    )
    .unwrap();

    let after = bridge.property(list_handle, "model").as_handle().unwrap();
    assert_ne!(before, after);
    assert_eq!(bridge.class_of(after).as_deref(), Some("MultiSelection"));
    assert!(!bridge.is_alive(before));
}

#[test]
fn test_rows_render_lazily_through_the_factory() {
    let (bridge, mut tree) = setup();
    let render = PropValue::Renderer(Arc::new(|slot: &RowSlot, value: Option<&Value>| {
        let text = value.and_then(Value::as_str).unwrap_or("").to_owned();
        if let Ok(None) = slot.child() {
            if let Ok(label) = slot.create_widget("Label") {
                let _ = slot.set_child(Some(label));
            }
        }
        if let Ok(Some(label)) = slot.child() {
            let _ = slot.set_property(label, "label", Value::from(text));
        }
    }));
    let list = tree
        .create("ListView", props(&[("renderItem", render)]))
        .unwrap();
    let a = item(&mut tree, "a", "Alpha");
    let b = item(&mut tree, "b", "Beta");
    tree.append_child(list, a).unwrap();
    tree.append_child(list, b).unwrap();
    tree.commit_mount(list).unwrap();

    let factory = bridge
        .property(tree.handle_of(list).unwrap(), "factory")
        .as_handle()
        .unwrap();

    let row = bridge.new_list_item(1);
    bridge.emit(factory, "setup", &[Value::Handle(row)]);
    bridge.emit(factory, "bind", &[Value::Handle(row)]);

    let cell = bridge.property(row, "child").as_handle().unwrap();
    assert_eq!(bridge.property(cell, "label").as_str(), Some("Beta"));

    // An in-place item update rebinds the visible row.
    tree.commit_update(
        b,
        &props(&[("id", PropValue::from("b")), ("value", PropValue::from("Beta"))]),
        props(&[("id", PropValue::from("b")), ("value", PropValue::from("Best"))]),
    )
    .unwrap();
    assert_eq!(bridge.property(cell, "label").as_str(), Some("Best"));
}

#[test]
fn test_unmount_releases_list_machinery() {
    let (bridge, mut tree) = setup();
    let list = tree.create("ListView", Props::new()).unwrap();
    let a = item(&mut tree, "a", "Alpha");
    tree.append_child(list, a).unwrap();
    tree.commit_mount(list).unwrap();

    let list_handle = tree.handle_of(list).unwrap();
    let selection = bridge.property(list_handle, "model").as_handle().unwrap();
    let model = bridge.property(selection, "model").as_handle().unwrap();
    let factory = bridge.property(list_handle, "factory").as_handle().unwrap();

    tree.unmount(list).unwrap();
    for handle in [list_handle, selection, model, factory] {
        assert!(!bridge.is_alive(handle));
    }
    assert_eq!(bridge.live_connection_count(), 0);
}

#[test]
fn test_column_view_manages_columns_and_shared_rows() {
    let (bridge, mut tree) = setup();
    let table = tree.create("ColumnView", Props::new()).unwrap();
    tree.commit_mount(table).unwrap();

    let render_title = PropValue::Renderer(Arc::new(|slot: &RowSlot, value: Option<&Value>| {
        let text = value.and_then(Value::as_str).unwrap_or("").to_owned();
        if let Ok(None) = slot.child() {
            if let Ok(label) = slot.create_widget("Label") {
                let _ = slot.set_child(Some(label));
            }
        }
        if let Ok(Some(label)) = slot.child() {
            let _ = slot.set_property(label, "label", Value::from(text));
        }
    }));

    let name_col = tree
        .create(
            "ColumnViewColumn",
            props(&[
                ("id", PropValue::from("name")),
                ("title", PropValue::from("Name")),
                ("renderCell", render_title),
            ]),
        )
        .unwrap();
    let size_col = tree
        .create(
            "ColumnViewColumn",
            props(&[
                ("id", PropValue::from("size")),
                ("title", PropValue::from("Size")),
            ]),
        )
        .unwrap();
    tree.append_child(table, name_col).unwrap();
    tree.append_child(table, size_col).unwrap();

    let table_handle = tree.handle_of(table).unwrap();
    assert_eq!(bridge.columns_of(table_handle).len(), 2);
    let name_col_handle = tree.handle_of(name_col).unwrap();
    assert_eq!(
        bridge.property(name_col_handle, "title").as_str(),
        Some("Name")
    );

    // Insert a column in front of an existing one.
    let icon_col = tree
        .create(
            "ColumnViewColumn",
            props(&[("id", PropValue::from("icon")), ("title", PropValue::from(""))]),
        )
        .unwrap();
    tree.insert_before(table, icon_col, size_col).unwrap();
    assert_eq!(
        bridge.columns_of(table_handle),
        vec![
            tree.handle_of(name_col).unwrap(),
            tree.handle_of(icon_col).unwrap(),
            tree.handle_of(size_col).unwrap(),
        ]
    );

    // Rows flow through the same store as the list family.
    let row = item(&mut tree, "r1", "readme.md");
    tree.append_child(table, row).unwrap();
    let model = store_model(&bridge, &tree, table);
    assert_eq!(model_ids(&bridge, model), vec!["r1"]);

    // The name column's renderer reads rows from the shared store.
    let factory = bridge.property(name_col_handle, "factory").as_handle().unwrap();
    let shell = bridge.new_list_item(0);
    bridge.emit(factory, "setup", &[Value::Handle(shell)]);
    bridge.emit(factory, "bind", &[Value::Handle(shell)]);
    let cell = bridge.property(shell, "child").as_handle().unwrap();
    assert_eq!(bridge.property(cell, "label").as_str(), Some("readme.md"));

    tree.remove_child(table, icon_col).unwrap();
    assert_eq!(bridge.columns_of(table_handle).len(), 2);
}

#[test]
fn test_drop_down_selects_by_id_and_reports_ids() {
    let (bridge, mut tree) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let on_changed = PropValue::callback(move |args| {
        let id = args.first().and_then(Value::as_str).unwrap_or("").to_owned();
        let label = args.get(1).and_then(Value::as_str).unwrap_or("").to_owned();
        seen_clone.lock().push((id, label));
    });

    let initial = props(&[("onSelectionChanged", on_changed)]);
    let dropdown = tree.create("DropDown", initial.clone()).unwrap();
    for (id, label) in [("a", "Alpha"), ("b", "Beta")] {
        let entry = tree
            .create(
                "SimpleListItem",
                props(&[("id", PropValue::from(id)), ("value", PropValue::from(label))]),
            )
            .unwrap();
        tree.append_child(dropdown, entry).unwrap();
    }

    let mut selected = initial.clone();
    selected.insert("selected".to_owned(), PropValue::from("b"));
    tree.commit_update(dropdown, &initial, selected.clone()).unwrap();

    let handle = tree.handle_of(dropdown).unwrap();
    assert_eq!(bridge.property(handle, "selected").as_u32(), Some(1));

    bridge.emit(handle, "notify::selected", &[]);
    assert_eq!(
        seen.lock().last().cloned(),
        Some(("b".to_owned(), "Beta".to_owned()))
    );

    // Dropping the callback prop tears the connection down.
    let mut without_callback = Props::new();
    without_callback.insert("selected".to_owned(), PropValue::from("b"));
    tree.commit_update(dropdown, &selected, without_callback).unwrap();
    let events_before = seen.lock().len();
    bridge.emit(handle, "notify::selected", &[]);
    assert_eq!(seen.lock().len(), events_before);
}

#[test]
fn test_collapsed_rows_leave_the_native_model() {
    let (bridge, mut tree) = setup();
    let list = tree.create("ListView", Props::new()).unwrap();
    tree.commit_mount(list).unwrap();
    let parent = item(&mut tree, "p", "Parent");
    let child = item(&mut tree, "c", "Child");
    tree.append_child(parent, child).unwrap();
    tree.append_child(list, parent).unwrap();

    let model = store_model(&bridge, &tree, list);
    assert_eq!(model_ids(&bridge, model), vec!["p", "c"]);

    let store = tree.node(list).and_then(|node| node.item_store()).unwrap();
    assert!(store.is_expandable("p"));

    store.set_expanded("p", false).unwrap();
    assert_eq!(model_ids(&bridge, model), vec!["p"]);
    store.set_expanded("p", true).unwrap();
    assert_eq!(model_ids(&bridge, model), vec!["p", "c"]);
}
