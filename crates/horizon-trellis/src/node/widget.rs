//! The generic widget node.
//!
//! `WidgetNode` backs every element type that maps straight onto a native
//! class: it owns the native handle exclusively, applies props as property
//! writes and signal connections, and exposes container capabilities based
//! on what the class structurally supports according to the toolkit's
//! introspection metadata. No per-class code is involved; a class that
//! grows an `append` method becomes an ordered child container without any
//! change here.

use std::any::Any;

use parking_lot::Mutex;

use horizon_trellis_core::{ForeignBridge, NativeHandle, Value};

use crate::container::{ChildContainer, PackContainer};
use crate::error::Result;
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::Props;

/// Structural capabilities of a native class, probed once at construction.
#[derive(Clone, Copy, Debug, Default)]
struct ClassTraits {
    /// Ordered multi-child attach (`append`).
    appendable: bool,
    /// Positioned attach (`insert_child_after`).
    insertable: bool,
    /// Child removal (`remove`).
    removable: bool,
    /// Exclusive single child (`set_child`).
    single_child: bool,
    /// Start/end packing groups (`pack_start` + `pack_end`).
    pack: bool,
    /// Top-level presentation (`present`).
    presentable: bool,
}

impl ClassTraits {
    fn probe(bridge: &dyn ForeignBridge, class: &str) -> Self {
        Self {
            appendable: bridge.class_supports(class, "append"),
            insertable: bridge.class_supports(class, "insert_child_after"),
            removable: bridge.class_supports(class, "remove"),
            single_child: bridge.class_supports(class, "set_child"),
            pack: bridge.class_supports(class, "pack_start")
                && bridge.class_supports(class, "pack_end"),
            presentable: bridge.class_supports(class, "present"),
        }
    }
}

/// A node owning one native widget, with structurally probed capabilities.
pub struct WidgetNode {
    base: NodeBase,
    handle: NativeHandle,
    traits: ClassTraits,
    /// Handles attached through the flow-container capability, in native
    /// order. Mirrors the native sibling order so positioned inserts can
    /// name the preceding sibling.
    attached: Mutex<Vec<NativeHandle>>,
    /// The exclusive child of a single-child class.
    single_child: Mutex<Option<NativeHandle>>,
}

impl WidgetNode {
    /// Construct the native object for `type_name` and apply initial props.
    pub fn new(ctx: &CreateContext<'_>, type_name: &str, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(type_name, &[])?;
        let traits = ClassTraits::probe(ctx.bridge.as_ref(), type_name);
        tracing::trace!(
            target: "horizon_trellis::node",
            type_name,
            %handle,
            ?traits,
            "created widget"
        );
        let node = Self {
            base: NodeBase::new(ctx, type_name, Some(handle), props),
            handle,
            traits,
            attached: Mutex::new(Vec::new()),
            single_child: Mutex::new(None),
        };
        node.base
            .apply_props(ctx.signals, None, node.base.props(), &[])?;
        Ok(node)
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        Ok(self.base.bridge().call(self.handle, method, args)?)
    }
}

impl Node for WidgetNode {
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
        self.base.apply_props(ctx.signals, Some(old), new, &[])
    }

    fn commit_mount(&mut self, _ctx: &CommitContext<'_>) -> Result<()> {
        if self.traits.presentable {
            self.call("present", &[])?;
        }
        Ok(())
    }

    fn as_child_container(&self) -> Option<&dyn ChildContainer> {
        (self.traits.single_child || self.traits.appendable).then_some(self as _)
    }

    fn as_pack_container(&self) -> Option<&dyn PackContainer> {
        self.traits.pack.then_some(self as _)
    }
}

impl ChildContainer for WidgetNode {
    fn attach_child(&self, child: NativeHandle) -> Result<()> {
        if self.traits.single_child {
            let mut current = self.single_child.lock();
            // Re-attaching the handle that is already the child is a no-op.
            if *current == Some(child) {
                return Ok(());
            }
            self.call("set_child", &[Value::Handle(child)])?;
            *current = Some(child);
            return Ok(());
        }

        let mut attached = self.attached.lock();
        if attached.last() == Some(&child) {
            return Ok(());
        }
        attached.retain(|&c| c != child);
        self.call("append", &[Value::Handle(child)])?;
        attached.push(child);
        Ok(())
    }

    fn insert_child_before(&self, child: NativeHandle, before: NativeHandle) -> Result<()> {
        if self.traits.single_child {
            return self.attach_child(child);
        }

        {
            let mut attached = self.attached.lock();
            if let Some(position) = attached.iter().position(|&c| c == before) {
                // Already in place?
                if position > 0 && attached[position - 1] == child {
                    return Ok(());
                }
                attached.retain(|&c| c != child);
                let position = attached
                    .iter()
                    .position(|&c| c == before)
                    .unwrap_or(attached.len());
                if self.traits.insertable {
                    let previous = position
                        .checked_sub(1)
                        .map(|i| attached[i])
                        .map_or(Value::Null, Value::Handle);
                    self.call("insert_child_after", &[Value::Handle(child), previous])?;
                } else {
                    self.call("append", &[Value::Handle(child)])?;
                }
                attached.insert(position, child);
                return Ok(());
            }
        }

        // Reference sibling is not attached here: tolerated, append instead.
        self.attach_child(child)
    }

    fn detach_child(&self, child: NativeHandle) -> Result<()> {
        if self.traits.single_child {
            let mut current = self.single_child.lock();
            if *current != Some(child) {
                return Ok(());
            }
            self.call("set_child", &[Value::Null])?;
            *current = None;
            return Ok(());
        }

        let mut attached = self.attached.lock();
        let held = attached.contains(&child);
        attached.retain(|&c| c != child);
        if held && self.traits.removable {
            self.call("remove", &[Value::Handle(child)])?;
        }
        Ok(())
    }
}

impl PackContainer for WidgetNode {
    fn pack_start(&self, child: NativeHandle) -> Result<()> {
        self.call("pack_start", &[Value::Handle(child)])?;
        Ok(())
    }

    fn pack_end(&self, child: NativeHandle) -> Result<()> {
        self.call("pack_end", &[Value::Handle(child)])?;
        Ok(())
    }

    fn remove_from_pack(&self, child: NativeHandle) -> Result<()> {
        self.call("remove", &[Value::Handle(child)])?;
        Ok(())
    }
}
