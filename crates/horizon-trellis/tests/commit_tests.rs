//! Commit-protocol integration tests over the recording bridge.

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_trellis::testing::RecordingBridge;
use horizon_trellis::{Error, HostTree, NodeId, PropValue, Props, Value};

fn props(entries: &[(&str, PropValue)]) -> Props {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn setup() -> (Arc<RecordingBridge>, HostTree) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let bridge = Arc::new(RecordingBridge::new());
    let tree = HostTree::new(bridge.clone());
    (bridge, tree)
}

fn label(tree: &mut HostTree, text: &str) -> NodeId {
    tree.create("Label", props(&[("label", PropValue::from(text))]))
        .unwrap()
}

#[test]
fn test_append_insert_remove_keep_native_order() {
    let (bridge, mut tree) = setup();
    let container = tree.create("Box", Props::new()).unwrap();
    let a = label(&mut tree, "A");
    let c = label(&mut tree, "C");
    tree.append_child(container, a).unwrap();
    tree.append_child(container, c).unwrap();

    let b = label(&mut tree, "B");
    tree.insert_before(container, b, c).unwrap();

    let handles: Vec<_> = [a, b, c]
        .iter()
        .map(|&id| tree.handle_of(id).unwrap())
        .collect();
    let box_handle = tree.handle_of(container).unwrap();
    assert_eq!(bridge.children_of(box_handle), handles);

    tree.remove_child(container, b).unwrap();
    assert_eq!(bridge.children_of(box_handle), vec![handles[0], handles[2]]);
}

#[test]
fn test_rekeying_reorders_without_new_handles() {
    let (bridge, mut tree) = setup();
    let container = tree.create("Box", Props::new()).unwrap();
    let a = label(&mut tree, "A");
    let b = label(&mut tree, "B");
    let c = label(&mut tree, "C");
    for id in [a, b, c] {
        tree.append_child(container, id).unwrap();
    }
    let created_before = bridge.created_count();

    // Upstream re-keys [A, B, C] to [C, B, A] as a pair of moves.
    tree.insert_before(container, c, a).unwrap();
    tree.insert_before(container, b, a).unwrap();

    let box_handle = tree.handle_of(container).unwrap();
    let expected: Vec<_> = [c, b, a]
        .iter()
        .map(|&id| tree.handle_of(id).unwrap())
        .collect();
    assert_eq!(bridge.children_of(box_handle), expected);
    assert_eq!(bridge.created_count(), created_before);
}

#[test]
fn test_insert_before_stale_sibling_appends() {
    let (bridge, mut tree) = setup();
    let container = tree.create("Box", Props::new()).unwrap();
    let a = label(&mut tree, "A");
    tree.append_child(container, a).unwrap();

    // The reference sibling was never attached to this container.
    let stray = label(&mut tree, "stray");
    let b = label(&mut tree, "B");
    tree.insert_before(container, b, stray).unwrap();

    let box_handle = tree.handle_of(container).unwrap();
    assert_eq!(
        bridge.children_of(box_handle),
        vec![tree.handle_of(a).unwrap(), tree.handle_of(b).unwrap()]
    );
}

#[test]
fn test_single_child_replaces_and_is_idempotent() {
    let (bridge, mut tree) = setup();
    let window = tree.create("Window", Props::new()).unwrap();
    let first = tree.create("Box", Props::new()).unwrap();
    tree.append_child(window, first).unwrap();

    let window_handle = tree.handle_of(window).unwrap();
    assert_eq!(
        bridge.single_child_of(window_handle),
        tree.handle_of(first)
    );
    let calls_before = bridge.call_log().len();

    // Re-attaching the same child is a no-op at the native layer.
    tree.append_child(window, first).unwrap();
    assert_eq!(bridge.call_log().len(), calls_before);

    // A new child replaces the old one without an explicit detach.
    let second = tree.create("Box", Props::new()).unwrap();
    tree.append_child(window, second).unwrap();
    assert_eq!(
        bridge.single_child_of(window_handle),
        tree.handle_of(second)
    );
}

#[test]
fn test_attach_to_incapable_parent_is_fatal() {
    let (_bridge, mut tree) = setup();
    let leaf = label(&mut tree, "leaf");
    let child = label(&mut tree, "child");
    let error = tree.append_child(leaf, child).unwrap_err();
    assert!(matches!(error, Error::UnsupportedChild { .. }));
}

#[test]
fn test_pack_slots_route_into_groups() {
    let (bridge, mut tree) = setup();
    let bar = tree.create("HeaderBar", Props::new()).unwrap();

    let end_slot = tree.create("Pack.End", Props::new()).unwrap();
    let close = tree.create("Button", Props::new()).unwrap();
    tree.append_child(end_slot, close).unwrap();
    tree.append_child(bar, end_slot).unwrap();

    // A plain child of a pack container lands in the start group.
    let title = label(&mut tree, "Title");
    tree.append_child(bar, title).unwrap();

    let bar_handle = tree.handle_of(bar).unwrap();
    assert_eq!(bridge.pack_end_of(bar_handle), vec![tree.handle_of(close).unwrap()]);
    assert_eq!(
        bridge.pack_start_of(bar_handle),
        vec![tree.handle_of(title).unwrap()]
    );
}

#[test]
fn test_grid_span_change_reattaches_same_handle() {
    let (bridge, mut tree) = setup();
    let grid = tree.create("Grid", Props::new()).unwrap();
    let cell_props = props(&[
        ("column", PropValue::from(0i32)),
        ("row", PropValue::from(0i32)),
        ("columnSpan", PropValue::from(1i32)),
        ("rowSpan", PropValue::from(1i32)),
    ]);
    let cell = tree.create("GridChild", cell_props.clone()).unwrap();
    let button = tree.create("Button", Props::new()).unwrap();
    tree.append_child(cell, button).unwrap();
    tree.append_child(grid, cell).unwrap();

    let grid_handle = tree.handle_of(grid).unwrap();
    let button_handle = tree.handle_of(button).unwrap();
    assert_eq!(
        bridge.grid_cells_of(grid_handle),
        vec![(button_handle, 0, 0, 1, 1)]
    );

    let created_before = bridge.created_count();
    let updated = props(&[
        ("column", PropValue::from(0i32)),
        ("row", PropValue::from(0i32)),
        ("columnSpan", PropValue::from(2i32)),
        ("rowSpan", PropValue::from(3i32)),
    ]);
    tree.commit_update(cell, &cell_props, updated).unwrap();

    assert_eq!(
        bridge.grid_cells_of(grid_handle),
        vec![(button_handle, 0, 0, 2, 3)]
    );
    assert_eq!(bridge.created_count(), created_before);
}

#[test]
fn test_notebook_relabel_keeps_child_attached() {
    let (bridge, mut tree) = setup();
    let notebook = tree.create("Notebook", Props::new()).unwrap();
    let page_props = props(&[("label", PropValue::from("First"))]);
    let page = tree.create("NotebookPage", page_props.clone()).unwrap();
    let content = tree.create("Box", Props::new()).unwrap();
    tree.append_child(page, content).unwrap();
    tree.append_child(notebook, page).unwrap();

    let notebook_handle = tree.handle_of(notebook).unwrap();
    let content_handle = tree.handle_of(content).unwrap();
    let pages = bridge.pages_of(notebook_handle);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].0, content_handle);
    let old_tab = pages[0].1;
    assert_eq!(bridge.property(old_tab, "label").as_str(), Some("First"));

    tree.commit_update(page, &page_props, props(&[("label", PropValue::from("Renamed"))]))
        .unwrap();

    let pages = bridge.pages_of(notebook_handle);
    assert_eq!(pages.len(), 1);
    // Same child widget, new tab label.
    assert_eq!(pages[0].0, content_handle);
    assert_eq!(bridge.property(pages[0].1, "label").as_str(), Some("Renamed"));
}

#[test]
fn test_notebook_insert_page_before() {
    let (bridge, mut tree) = setup();
    let notebook = tree.create("Notebook", Props::new()).unwrap();

    let mut make_page = |tree: &mut HostTree, title: &str| {
        let page = tree
            .create("NotebookPage", props(&[("label", PropValue::from(title))]))
            .unwrap();
        let content = tree.create("Box", Props::new()).unwrap();
        tree.append_child(page, content).unwrap();
        (page, tree.handle_of(content).unwrap())
    };

    let (first, first_content) = make_page(&mut tree, "first");
    let (third, third_content) = make_page(&mut tree, "third");
    tree.append_child(notebook, first).unwrap();
    tree.append_child(notebook, third).unwrap();

    let (second, second_content) = make_page(&mut tree, "second");
    tree.insert_before(notebook, second, third).unwrap();

    let notebook_handle = tree.handle_of(notebook).unwrap();
    let children: Vec<_> = bridge
        .pages_of(notebook_handle)
        .into_iter()
        .map(|(child, _)| child)
        .collect();
    assert_eq!(children, vec![first_content, second_content, third_content]);
}

#[test]
fn test_stack_descriptor_updates_in_place() {
    let (bridge, mut tree) = setup();
    let stack = tree.create("Stack", Props::new()).unwrap();
    let page_props = props(&[
        ("name", PropValue::from("home")),
        ("title", PropValue::from("Home")),
    ]);
    let page = tree.create("StackPage", page_props.clone()).unwrap();
    let content = tree.create("Box", Props::new()).unwrap();
    tree.append_child(page, content).unwrap();
    tree.append_child(stack, page).unwrap();

    let stack_handle = tree.handle_of(stack).unwrap();
    let pages = bridge.pages_of(stack_handle);
    assert_eq!(pages.len(), 1);
    let page_object = pages[0].1;
    assert_eq!(bridge.property(page_object, "title").as_str(), Some("Home"));

    tree.commit_update(
        page,
        &page_props,
        props(&[
            ("name", PropValue::from("home")),
            ("title", PropValue::from("Start")),
            ("needsAttention", PropValue::from(true)),
        ]),
    )
    .unwrap();

    let pages = bridge.pages_of(stack_handle);
    assert_eq!(pages.len(), 1);
    // Same page object and child; only descriptor fields moved.
    assert_eq!(pages[0].1, page_object);
    assert_eq!(pages[0].0, tree.handle_of(content).unwrap());
    assert_eq!(bridge.property(page_object, "title").as_str(), Some("Start"));
    assert_eq!(
        bridge.property(page_object, "needs-attention").as_bool(),
        Some(true)
    );
}

#[test]
fn test_stack_visible_child_applies_at_end_of_commit() {
    let (bridge, mut tree) = setup();

    tree.begin_commit();
    let stack = tree
        .create("Stack", props(&[("page", PropValue::from("settings"))]))
        .unwrap();
    let page = tree
        .create("StackPage", props(&[("name", PropValue::from("settings"))]))
        .unwrap();
    let content = tree.create("Box", Props::new()).unwrap();
    tree.append_child(page, content).unwrap();
    tree.append_child(stack, page).unwrap();
    tree.commit_mount(stack).unwrap();

    let stack_handle = tree.handle_of(stack).unwrap();
    // Still inside the commit: nothing applied yet.
    assert!(bridge
        .property(stack_handle, "visible-child-name")
        .is_null());
    tree.end_commit();
    assert_eq!(
        bridge.property(stack_handle, "visible-child-name").as_str(),
        Some("settings")
    );
}

#[test]
fn test_signal_prop_connects_and_replaces() {
    let (bridge, mut tree) = setup();
    let fired = Arc::new(Mutex::new(Vec::new()));

    let first_log = fired.clone();
    let first = PropValue::callback(move |_| first_log.lock().push("first"));
    let initial = props(&[("onClicked", first.clone())]);
    let button = tree.create("Button", initial.clone()).unwrap();
    let handle = tree.handle_of(button).unwrap();

    bridge.emit(handle, "clicked", &[]);
    assert_eq!(*fired.lock(), vec!["first"]);

    // Replacing the handler leaves exactly one active connection.
    let second_log = fired.clone();
    let second = PropValue::callback(move |_| second_log.lock().push("second"));
    let updated = props(&[("onClicked", second)]);
    tree.commit_update(button, &initial, updated.clone()).unwrap();

    bridge.emit(handle, "clicked", &[]);
    assert_eq!(*fired.lock(), vec!["first", "second"]);
    assert_eq!(bridge.live_connection_count(), 1);

    // Removing the prop tears the connection down synchronously.
    tree.commit_update(button, &updated, Props::new()).unwrap();
    bridge.emit(handle, "clicked", &[]);
    assert_eq!(*fired.lock(), vec!["first", "second"]);
    assert_eq!(bridge.live_connection_count(), 0);
}

#[test]
fn test_unmount_disconnects_all_signals() {
    let (bridge, mut tree) = setup();
    let fired = Arc::new(Mutex::new(0));

    let on_clicked = {
        let fired = fired.clone();
        PropValue::callback(move |_| *fired.lock() += 1)
    };
    let on_activate = {
        let fired = fired.clone();
        PropValue::callback(move |_| *fired.lock() += 1)
    };
    let button = tree
        .create(
            "Button",
            props(&[("onClicked", on_clicked), ("onActivate", on_activate)]),
        )
        .unwrap();
    let handle = tree.handle_of(button).unwrap();
    assert_eq!(bridge.live_connection_count(), 2);

    tree.unmount(button).unwrap();
    assert_eq!(bridge.live_connection_count(), 0);
    bridge.emit(handle, "clicked", &[]);
    bridge.emit(handle, "activate", &[]);
    assert_eq!(*fired.lock(), 0);
}

#[test]
fn test_unmount_cascades_child_first_and_releases_handles() {
    let (bridge, mut tree) = setup();
    let window = tree.create("Window", Props::new()).unwrap();
    let container = tree.create("Box", Props::new()).unwrap();
    let text = label(&mut tree, "hi");
    tree.append_child(container, text).unwrap();
    tree.append_child(window, container).unwrap();

    let handles: Vec<_> = [window, container, text]
        .iter()
        .map(|&id| tree.handle_of(id).unwrap())
        .collect();

    tree.unmount(window).unwrap();
    assert!(tree.is_empty());
    for handle in handles {
        assert!(!bridge.is_alive(handle));
    }
}

#[test]
fn test_update_batches_writes_in_one_freeze_thaw_pair() {
    let (bridge, mut tree) = setup();
    let initial = props(&[("label", PropValue::from("a"))]);
    let text = tree.create("Label", initial.clone()).unwrap();
    let handle = tree.handle_of(text).unwrap();

    tree.commit_update(
        text,
        &initial,
        props(&[
            ("label", PropValue::from("b")),
            ("marginStart", PropValue::from(4i32)),
            ("marginEnd", PropValue::from(4i32)),
        ]),
    )
    .unwrap();

    let log = bridge.call_log();
    let freeze = format!("freeze {handle}");
    let thaw = format!("thaw {handle}");
    let freeze_at = log.iter().position(|l| l == &freeze).unwrap();
    let thaw_at = log.iter().position(|l| l == &thaw).unwrap();
    assert!(freeze_at < thaw_at);
    assert_eq!(log.iter().filter(|l| *l == &freeze).count(), 1);

    // The writes landed between the pair, kebab-cased.
    assert_eq!(bridge.property(handle, "label").as_str(), Some("b"));
    assert_eq!(bridge.property(handle, "margin-start").as_i32(), Some(4));
    assert_eq!(bridge.property(handle, "margin-end").as_i32(), Some(4));

    // A single-write update stays unbatched.
    let single_before = bridge
        .call_log()
        .iter()
        .filter(|l| l.starts_with("freeze"))
        .count();
    tree.commit_update(
        text,
        &props(&[("label", PropValue::from("b"))]),
        props(&[("label", PropValue::from("c"))]),
    )
    .unwrap();
    let single_after = bridge
        .call_log()
        .iter()
        .filter(|l| l.starts_with("freeze"))
        .count();
    assert_eq!(single_before, single_after);
}

#[test]
fn test_window_presents_on_mount() {
    let (bridge, mut tree) = setup();
    let window = tree.create("Window", Props::new()).unwrap();
    tree.commit_mount(window).unwrap();
    assert_eq!(
        bridge
            .property(tree.handle_of(window).unwrap(), "visible")
            .as_bool(),
        Some(true)
    );
}
