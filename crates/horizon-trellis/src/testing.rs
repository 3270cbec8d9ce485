//! In-memory toolkit double for headless tests.
//!
//! [`RecordingBridge`] implements the full [`ForeignBridge`] surface over a
//! plain object table: classes with a fixed method vocabulary, properties,
//! ordered child lists, pack groups, grid cells, pages, list models, and
//! selection state. Tests drive native events by [`emit`](RecordingBridge::emit)-ing
//! signals into the registered trampolines and assert against the recorded
//! state and call log.
//!
//! The class table mirrors a small but representative widget set of the
//! target toolkit; capability probing sees exactly what it would see from
//! real introspection metadata.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use horizon_trellis_core::{
    BridgeError, BridgeResult, ConnectionToken, ForeignBridge, NativeHandle, SignalHandler, Value,
};

/// Method vocabulary per native class; `None` means the class is unknown.
fn class_methods(class: &str) -> Option<&'static [&'static str]> {
    Some(match class {
        "Box" | "ListBox" | "FlowBox" => &["append", "remove", "insert_child_after"],
        "Window" | "ApplicationWindow" => &["set_child", "present"],
        "Button" | "Frame" | "ScrolledWindow" | "Revealer" => &["set_child"],
        "Label" | "Image" | "Entry" | "Separator" | "Spinner" => &[],
        "HeaderBar" | "ActionBar" => &["pack_start", "pack_end", "remove"],
        "Grid" => &["attach", "remove"],
        "Notebook" => &[
            "append_page",
            "insert_page",
            "remove_page",
            "page_num",
            "set_tab_label",
        ],
        "Stack" => &["add_titled", "get_page", "get_child_by_name", "remove"],
        "StackPage" => &[],
        "ListView" | "GridView" => &["set_model", "set_factory"],
        "ColumnView" => &[
            "set_model",
            "append_column",
            "insert_column",
            "remove_column",
        ],
        "ColumnViewColumn" => &[],
        "DropDown" => &["set_model"],
        "StringList" => &[],
        "NoSelection" | "SingleSelection" | "MultiSelection" => {
            &["select_item", "unselect_all", "get_selection"]
        }
        "SignalListItemFactory" => &[],
        "ListItem" => &["set_child"],
        _ => return None,
    })
}

#[derive(Default)]
struct NativeObject {
    class: String,
    properties: HashMap<String, Value>,
    children: Vec<NativeHandle>,
    single_child: Option<NativeHandle>,
    pack_start: Vec<NativeHandle>,
    pack_end: Vec<NativeHandle>,
    grid: Vec<(NativeHandle, i32, i32, i32, i32)>,
    /// (child, auxiliary object): tab label for notebooks, page object for
    /// stacks.
    pages: Vec<(NativeHandle, NativeHandle)>,
    entries: Vec<Value>,
    selected: BTreeSet<u32>,
    columns: Vec<NativeHandle>,
    alive: bool,
}

struct Connection {
    handle: NativeHandle,
    signal: String,
    handler: SignalHandler,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    next_token: u64,
    objects: HashMap<u64, NativeObject>,
    connections: HashMap<u64, Connection>,
    log: Vec<String>,
}

impl State {
    fn object(&self, handle: NativeHandle) -> BridgeResult<&NativeObject> {
        self.objects
            .get(&handle.as_raw())
            .filter(|o| o.alive)
            .ok_or(BridgeError::InvalidHandle)
    }

    fn object_mut(&mut self, handle: NativeHandle) -> BridgeResult<&mut NativeObject> {
        self.objects
            .get_mut(&handle.as_raw())
            .filter(|o| o.alive)
            .ok_or(BridgeError::InvalidHandle)
    }

    fn new_object(&mut self, class: &str) -> NativeHandle {
        self.next_handle += 1;
        let handle = NativeHandle::from_raw(self.next_handle);
        self.objects.insert(
            self.next_handle,
            NativeObject {
                class: class.to_owned(),
                alive: true,
                ..NativeObject::default()
            },
        );
        handle
    }
}

fn arg_handle(args: &[Value], index: usize) -> BridgeResult<NativeHandle> {
    args.get(index)
        .and_then(Value::as_handle)
        .ok_or(BridgeError::TypeMismatch {
            expected: "handle",
            got: "other",
        })
}

fn arg_i32(args: &[Value], index: usize) -> BridgeResult<i32> {
    args.get(index)
        .and_then(Value::as_i32)
        .ok_or(BridgeError::TypeMismatch {
            expected: "i32",
            got: "other",
        })
}

fn arg_str(args: &[Value], index: usize) -> String {
    args.get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// In-memory [`ForeignBridge`] with full state inspection for tests.
#[derive(Default)]
pub struct RecordingBridge {
    state: Mutex<State>,
}

impl RecordingBridge {
    /// Create an empty bridge.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Test drivers
    // =========================================================================

    /// Fire a native signal, invoking every trampoline connected to
    /// `(handle, signal)`.
    ///
    /// Handlers run outside the internal lock, so they may call back into
    /// the bridge freely - just like real toolkit dispatch.
    pub fn emit(&self, handle: NativeHandle, signal: &str, args: &[Value]) {
        let handlers: Vec<SignalHandler> = {
            let state = self.state.lock();
            state
                .connections
                .values()
                .filter(|c| c.handle == handle && c.signal == signal)
                .map(|c| c.handler.clone())
                .collect()
        };
        for handler in handlers {
            handler(args);
        }
    }

    /// Create a recycled row shell at the given native position.
    pub fn new_list_item(&self, position: u32) -> NativeHandle {
        let mut state = self.state.lock();
        let handle = state.new_object("ListItem");
        if let Ok(object) = state.object_mut(handle) {
            object
                .properties
                .insert("position".to_owned(), Value::U32(position));
        }
        handle
    }

    /// Move a row shell to a new native position (viewport recycling).
    pub fn set_list_item_position(&self, row: NativeHandle, position: u32) {
        let mut state = self.state.lock();
        if let Ok(object) = state.object_mut(row) {
            object
                .properties
                .insert("position".to_owned(), Value::U32(position));
        }
    }

    // =========================================================================
    // Test inspection
    // =========================================================================

    /// A property value, `Null` when absent. `child` resolves to the
    /// single-child slot, like the real property would.
    pub fn property(&self, handle: NativeHandle, name: &str) -> Value {
        let state = self.state.lock();
        let Ok(object) = state.object(handle) else {
            return Value::Null;
        };
        if name == "child" {
            return object.single_child.map_or(Value::Null, Value::Handle);
        }
        object.properties.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Ordered flow children of a container.
    pub fn children_of(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.children.clone())
            .unwrap_or_default()
    }

    /// The exclusive child of a single-child widget.
    pub fn single_child_of(&self, handle: NativeHandle) -> Option<NativeHandle> {
        self.state
            .lock()
            .object(handle)
            .ok()
            .and_then(|o| o.single_child)
    }

    /// Start-group handles of a pack container.
    pub fn pack_start_of(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.pack_start.clone())
            .unwrap_or_default()
    }

    /// End-group handles of a pack container.
    pub fn pack_end_of(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.pack_end.clone())
            .unwrap_or_default()
    }

    /// Grid cells as `(child, column, row, column_span, row_span)`.
    pub fn grid_cells_of(&self, handle: NativeHandle) -> Vec<(NativeHandle, i32, i32, i32, i32)> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.grid.clone())
            .unwrap_or_default()
    }

    /// Pages as `(child, auxiliary)` pairs, in page order.
    pub fn pages_of(&self, handle: NativeHandle) -> Vec<(NativeHandle, NativeHandle)> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.pages.clone())
            .unwrap_or_default()
    }

    /// Column objects of a table widget, in order.
    pub fn columns_of(&self, handle: NativeHandle) -> Vec<NativeHandle> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.columns.clone())
            .unwrap_or_default()
    }

    /// Entries of an index-addressed model, in iteration order.
    pub fn model_entries(&self, model: NativeHandle) -> Vec<Value> {
        self.state
            .lock()
            .object(model)
            .map(|o| o.entries.clone())
            .unwrap_or_default()
    }

    /// Selected native indices of a selection model, ascending.
    pub fn selected_of(&self, handle: NativeHandle) -> Vec<u32> {
        self.state
            .lock()
            .object(handle)
            .map(|o| o.selected.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The class an object was created as.
    pub fn class_of(&self, handle: NativeHandle) -> Option<String> {
        self.state
            .lock()
            .objects
            .get(&handle.as_raw())
            .map(|o| o.class.clone())
    }

    /// Whether the object has not been released.
    pub fn is_alive(&self, handle: NativeHandle) -> bool {
        self.state
            .lock()
            .objects
            .get(&handle.as_raw())
            .is_some_and(|o| o.alive)
    }

    /// Total number of native objects ever created.
    pub fn created_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Number of live signal connections.
    pub fn live_connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Every create/call/property/model operation, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }
}

impl ForeignBridge for RecordingBridge {
    fn has_class(&self, class: &str) -> bool {
        class_methods(class).is_some()
    }

    fn class_supports(&self, class: &str, method: &str) -> bool {
        class_methods(class).is_some_and(|methods| methods.contains(&method))
    }

    fn create(&self, class: &str, args: &[Value]) -> BridgeResult<NativeHandle> {
        if class_methods(class).is_none() {
            return Err(BridgeError::UnknownClass(class.to_owned()));
        }
        let mut state = self.state.lock();
        let handle = state.new_object(class);
        // Selection models wrap the model passed at construction.
        if let Some(model) = args.first().and_then(Value::as_handle) {
            if let Ok(object) = state.object_mut(handle) {
                object
                    .properties
                    .insert("model".to_owned(), Value::Handle(model));
            }
        }
        state.log.push(format!("create {class} -> {handle}"));
        Ok(handle)
    }

    fn release(&self, handle: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let object = state
            .objects
            .get_mut(&handle.as_raw())
            .ok_or(BridgeError::InvalidHandle)?;
        object.alive = false;
        state.log.push(format!("release {handle}"));
        Ok(())
    }

    fn call(&self, handle: NativeHandle, method: &str, args: &[Value]) -> BridgeResult<Value> {
        let mut state = self.state.lock();
        let class = state.object(handle)?.class.clone();
        if !class_methods(&class).is_some_and(|m| m.contains(&method)) {
            return Err(BridgeError::UnknownMethod {
                class,
                method: method.to_owned(),
            });
        }
        state.log.push(format!("call {handle} {method}"));

        let result = match method {
            "append" => {
                let child = arg_handle(args, 0)?;
                let object = state.object_mut(handle)?;
                object.children.retain(|&c| c != child);
                object.children.push(child);
                Value::Null
            }
            "insert_child_after" => {
                let child = arg_handle(args, 0)?;
                let previous = args.get(1).and_then(Value::as_handle);
                let object = state.object_mut(handle)?;
                object.children.retain(|&c| c != child);
                let position = previous
                    .and_then(|p| object.children.iter().position(|&c| c == p))
                    .map_or(0, |p| p + 1);
                object.children.insert(position, child);
                Value::Null
            }
            "remove" => {
                let child = arg_handle(args, 0)?;
                let object = state.object_mut(handle)?;
                object.children.retain(|&c| c != child);
                object.pack_start.retain(|&c| c != child);
                object.pack_end.retain(|&c| c != child);
                object.grid.retain(|&(c, ..)| c != child);
                object.pages.retain(|&(c, _)| c != child);
                Value::Null
            }
            "set_child" => {
                let child = args.first().and_then(Value::as_handle);
                state.object_mut(handle)?.single_child = child;
                Value::Null
            }
            "present" => {
                state
                    .object_mut(handle)?
                    .properties
                    .insert("visible".to_owned(), Value::Bool(true));
                Value::Null
            }
            "pack_start" => {
                let child = arg_handle(args, 0)?;
                state.object_mut(handle)?.pack_start.push(child);
                Value::Null
            }
            "pack_end" => {
                let child = arg_handle(args, 0)?;
                state.object_mut(handle)?.pack_end.push(child);
                Value::Null
            }
            "attach" => {
                let child = arg_handle(args, 0)?;
                let cell = (
                    child,
                    arg_i32(args, 1)?,
                    arg_i32(args, 2)?,
                    arg_i32(args, 3)?,
                    arg_i32(args, 4)?,
                );
                let object = state.object_mut(handle)?;
                object.grid.retain(|&(c, ..)| c != child);
                object.grid.push(cell);
                Value::Null
            }
            "append_page" => {
                let child = arg_handle(args, 0)?;
                let tab = arg_handle(args, 1)?;
                state.object_mut(handle)?.pages.push((child, tab));
                Value::Null
            }
            "insert_page" => {
                let child = arg_handle(args, 0)?;
                let tab = arg_handle(args, 1)?;
                let position = arg_i32(args, 2)?.max(0) as usize;
                let object = state.object_mut(handle)?;
                let position = position.min(object.pages.len());
                object.pages.insert(position, (child, tab));
                Value::Null
            }
            "remove_page" => {
                let position = arg_i32(args, 0)?;
                let object = state.object_mut(handle)?;
                if position >= 0 && (position as usize) < object.pages.len() {
                    object.pages.remove(position as usize);
                }
                Value::Null
            }
            "page_num" => {
                let child = arg_handle(args, 0)?;
                let object = state.object(handle)?;
                object
                    .pages
                    .iter()
                    .position(|&(c, _)| c == child)
                    .map_or(Value::I32(-1), |p| Value::I32(p as i32))
            }
            "set_tab_label" => {
                let child = arg_handle(args, 0)?;
                let tab = arg_handle(args, 1)?;
                let object = state.object_mut(handle)?;
                if let Some(page) = object.pages.iter_mut().find(|(c, _)| *c == child) {
                    page.1 = tab;
                }
                Value::Null
            }
            "add_titled" => {
                let child = arg_handle(args, 0)?;
                let name = args.get(1).cloned().unwrap_or(Value::Null);
                let title = args.get(2).cloned().unwrap_or(Value::Null);
                let page = state.new_object("StackPage");
                {
                    let page_object = state.object_mut(page)?;
                    page_object.properties.insert("name".to_owned(), name);
                    page_object.properties.insert("title".to_owned(), title);
                }
                state.object_mut(handle)?.pages.push((child, page));
                Value::Null
            }
            "get_page" => {
                let child = arg_handle(args, 0)?;
                state
                    .object(handle)?
                    .pages
                    .iter()
                    .find(|&&(c, _)| c == child)
                    .map_or(Value::Null, |&(_, page)| Value::Handle(page))
            }
            "get_child_by_name" => {
                let name = arg_str(args, 0);
                let pages = state.object(handle)?.pages.clone();
                pages
                    .iter()
                    .find(|&&(_, page)| {
                        state
                            .objects
                            .get(&page.as_raw())
                            .and_then(|p| p.properties.get("name"))
                            .and_then(Value::as_str)
                            == Some(name.as_str())
                    })
                    .map_or(Value::Null, |&(child, _)| Value::Handle(child))
            }
            "set_model" => {
                let model = args.first().cloned().unwrap_or(Value::Null);
                state
                    .object_mut(handle)?
                    .properties
                    .insert("model".to_owned(), model);
                Value::Null
            }
            "set_factory" => {
                let factory = args.first().cloned().unwrap_or(Value::Null);
                state
                    .object_mut(handle)?
                    .properties
                    .insert("factory".to_owned(), factory);
                Value::Null
            }
            "append_column" => {
                let column = arg_handle(args, 0)?;
                let object = state.object_mut(handle)?;
                object.columns.retain(|&c| c != column);
                object.columns.push(column);
                Value::Null
            }
            "insert_column" => {
                let position = args
                    .first()
                    .and_then(Value::as_u32)
                    .ok_or(BridgeError::TypeMismatch {
                        expected: "u32",
                        got: "other",
                    })? as usize;
                let column = arg_handle(args, 1)?;
                let object = state.object_mut(handle)?;
                object.columns.retain(|&c| c != column);
                let position = position.min(object.columns.len());
                object.columns.insert(position, column);
                Value::Null
            }
            "remove_column" => {
                let column = arg_handle(args, 0)?;
                state.object_mut(handle)?.columns.retain(|&c| c != column);
                Value::Null
            }
            "select_item" => {
                let position = args
                    .first()
                    .and_then(Value::as_u32)
                    .ok_or(BridgeError::TypeMismatch {
                        expected: "u32",
                        got: "other",
                    })?;
                let unselect_rest = args.get(1).and_then(Value::as_bool).unwrap_or(false);
                let object = state.object_mut(handle)?;
                if unselect_rest {
                    object.selected.clear();
                }
                object.selected.insert(position);
                Value::Null
            }
            "unselect_all" => {
                state.object_mut(handle)?.selected.clear();
                Value::Null
            }
            "get_selection" => Value::List(
                state
                    .object(handle)?
                    .selected
                    .iter()
                    .map(|&i| Value::U32(i))
                    .collect(),
            ),
            other => {
                return Err(BridgeError::UnknownMethod {
                    class,
                    method: other.to_owned(),
                })
            }
        };
        Ok(result)
    }

    fn get_property(&self, handle: NativeHandle, name: &str) -> BridgeResult<Value> {
        let state = self.state.lock();
        let object = state.object(handle)?;
        if name == "child" {
            return Ok(object.single_child.map_or(Value::Null, Value::Handle));
        }
        Ok(object.properties.get(name).cloned().unwrap_or(Value::Null))
    }

    fn set_property(&self, handle: NativeHandle, name: &str, value: Value) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.log.push(format!("set {handle} {name}"));
        state
            .object_mut(handle)?
            .properties
            .insert(name.to_owned(), value);
        Ok(())
    }

    fn freeze_notify(&self, handle: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.object(handle)?;
        state.log.push(format!("freeze {handle}"));
        Ok(())
    }

    fn thaw_notify(&self, handle: NativeHandle) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.object(handle)?;
        state.log.push(format!("thaw {handle}"));
        Ok(())
    }

    fn connect(
        &self,
        handle: NativeHandle,
        signal: &str,
        trampoline: SignalHandler,
    ) -> BridgeResult<ConnectionToken> {
        let mut state = self.state.lock();
        state.object(handle)?;
        state.next_token += 1;
        let token = state.next_token;
        state.connections.insert(
            token,
            Connection {
                handle,
                signal: signal.to_owned(),
                handler: trampoline,
            },
        );
        Ok(ConnectionToken::from_raw(token))
    }

    fn disconnect(&self, _handle: NativeHandle, token: ConnectionToken) {
        self.state.lock().connections.remove(&token.as_raw());
    }

    fn model_insert(&self, model: NativeHandle, index: usize, value: Value) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.log.push(format!("model_insert {model} @{index}"));
        let object = state.object_mut(model)?;
        if index > object.entries.len() {
            return Err(BridgeError::Native(format!(
                "insert index {index} out of bounds (len {})",
                object.entries.len()
            )));
        }
        object.entries.insert(index, value);
        Ok(())
    }

    fn model_remove(&self, model: NativeHandle, index: usize) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.log.push(format!("model_remove {model} @{index}"));
        let object = state.object_mut(model)?;
        if index >= object.entries.len() {
            return Err(BridgeError::Native(format!(
                "remove index {index} out of bounds (len {})",
                object.entries.len()
            )));
        }
        object.entries.remove(index);
        Ok(())
    }

    fn model_splice(
        &self,
        model: NativeHandle,
        index: usize,
        n_removed: usize,
        additions: &[Value],
    ) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state
            .log
            .push(format!("model_splice {model} @{index} -{n_removed} +{}", additions.len()));
        let object = state.object_mut(model)?;
        if index + n_removed > object.entries.len() {
            return Err(BridgeError::Native(format!(
                "splice range {index}..{} out of bounds (len {})",
                index + n_removed,
                object.entries.len()
            )));
        }
        object
            .entries
            .splice(index..index + n_removed, additions.iter().cloned());
        Ok(())
    }

    fn model_len(&self, model: NativeHandle) -> BridgeResult<usize> {
        Ok(self.state.lock().object(model)?.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unknown_class_is_rejected() {
        let bridge = RecordingBridge::new();
        assert!(!bridge.has_class("Imaginary"));
        assert!(matches!(
            bridge.create("Imaginary", &[]),
            Err(BridgeError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_method_vocabulary_is_per_class() {
        let bridge = RecordingBridge::new();
        assert!(bridge.class_supports("Box", "append"));
        assert!(!bridge.class_supports("Label", "append"));
        assert!(bridge.class_supports("Window", "set_child"));
        assert!(bridge.class_supports("HeaderBar", "pack_end"));
    }

    #[test]
    fn test_insert_child_after_orders_children() {
        let bridge = RecordingBridge::new();
        let parent = bridge.create("Box", &[]).unwrap();
        let a = bridge.create("Label", &[]).unwrap();
        let b = bridge.create("Label", &[]).unwrap();
        let c = bridge.create("Label", &[]).unwrap();

        bridge.call(parent, "append", &[Value::Handle(a)]).unwrap();
        bridge.call(parent, "append", &[Value::Handle(c)]).unwrap();
        bridge
            .call(parent, "insert_child_after", &[Value::Handle(b), Value::Handle(a)])
            .unwrap();
        assert_eq!(bridge.children_of(parent), vec![a, b, c]);

        // Null previous sibling prepends.
        let front = bridge.create("Label", &[]).unwrap();
        bridge
            .call(parent, "insert_child_after", &[Value::Handle(front), Value::Null])
            .unwrap();
        assert_eq!(bridge.children_of(parent), vec![front, a, b, c]);
    }

    #[test]
    fn test_emit_runs_handlers_outside_lock() {
        let bridge = Arc::new(RecordingBridge::new());
        let button = bridge.create("Button", &[]).unwrap();
        let inner = bridge.clone();
        let observed = Arc::new(Mutex::new(Value::Null));
        let observed_clone = observed.clone();
        bridge
            .connect(
                button,
                "clicked",
                Arc::new(move |_| {
                    // Re-entrant bridge use from a handler must not deadlock.
                    *observed_clone.lock() = inner.property(button, "label");
                }),
            )
            .unwrap();
        bridge
            .set_property(button, "label", Value::from("Go"))
            .unwrap();
        bridge.emit(button, "clicked", &[]);
        assert_eq!(observed.lock().as_str(), Some("Go"));
    }

    #[test]
    fn test_release_marks_object_dead() {
        let bridge = RecordingBridge::new();
        let label = bridge.create("Label", &[]).unwrap();
        assert!(bridge.is_alive(label));
        bridge.release(label).unwrap();
        assert!(!bridge.is_alive(label));
        assert!(matches!(
            bridge.set_property(label, "label", Value::Null),
            Err(BridgeError::InvalidHandle)
        ));
    }
}
