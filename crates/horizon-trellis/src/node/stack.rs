//! Stack container and its page descriptor child.
//!
//! Stack pages carry a full descriptor (name, title, icon, attention flag,
//! visibility, badge). Descriptor changes apply in place through the page
//! object; the child widget is never re-parented for them. The stack's own
//! `page` prop selects the visible child by name, deferred to the end of
//! the commit so the named page exists by the time it is applied.

use std::any::Any;

use horizon_trellis_core::{NativeHandle, Value};

use crate::container::{StackPageContainer, StackPageDescriptor};
use crate::error::{Error, Result};
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{prop_changed, Props};

const CONSUMED: &[&str] = &["page"];

/// A native stack widget showing one child at a time.
pub struct StackNode {
    base: NodeBase,
    handle: NativeHandle,
}

impl StackNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "Stack";

    /// Construct the native stack and apply initial props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(Self::TYPE, &[])?;
        let node = Self {
            base: NodeBase::new(ctx, Self::TYPE, Some(handle), props),
            handle,
        };
        node.base
            .apply_props(ctx.signals, None, node.base.props(), CONSUMED)?;
        Ok(node)
    }

    /// Fetch the page object wrapping `child`.
    fn page_of(&self, child: NativeHandle) -> Result<Option<NativeHandle>> {
        Ok(self
            .base
            .bridge()
            .call(self.handle, "get_page", &[Value::Handle(child)])?
            .as_handle())
    }

    fn write_descriptor(&self, page: NativeHandle, desc: &StackPageDescriptor) -> Result<()> {
        let bridge = self.base.bridge();
        bridge.set_property(page, "name", Value::from(desc.name.clone()))?;
        bridge.set_property(page, "title", Value::from(desc.title.clone()))?;
        bridge.set_property(page, "icon-name", Value::from(desc.icon_name.clone()))?;
        bridge.set_property(page, "needs-attention", Value::Bool(desc.needs_attention))?;
        bridge.set_property(page, "visible", Value::Bool(desc.visible))?;
        bridge.set_property(page, "badge-number", Value::from(desc.badge_number))?;
        Ok(())
    }

    /// Defer selecting the visible child until the commit has finished, so a
    /// page added in the same commit can be named.
    fn schedule_visible_child(&self, ctx: &CommitContext<'_>, name: String) {
        let bridge = self.base.bridge().clone();
        let stack = self.handle;
        ctx.flush.schedule(Box::new(move || {
            let known = bridge
                .call(stack, "get_child_by_name", &[Value::Str(name.clone())])
                .ok()
                .and_then(|v| v.as_handle());
            if known.is_some() {
                if let Err(error) =
                    bridge.set_property(stack, "visible-child-name", Value::Str(name))
                {
                    tracing::warn!(
                        target: "horizon_trellis::node",
                        %error,
                        "deferred visible-child selection failed"
                    );
                }
            }
        }));
    }
}

impl Node for StackNode {
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
        if prop_changed(Some(old), new, "page") {
            if let Some(name) = new.get("page").and_then(|p| p.as_str()) {
                self.schedule_visible_child(ctx, name.to_owned());
            }
        }
        self.base.apply_props(ctx.signals, Some(old), new, CONSUMED)
    }

    fn commit_mount(&mut self, ctx: &CommitContext<'_>) -> Result<()> {
        if let Some(name) = self.base.props().get("page").and_then(|p| p.as_str()) {
            self.schedule_visible_child(ctx, name.to_owned());
        }
        Ok(())
    }

    fn as_stack_page_container(&self) -> Option<&dyn StackPageContainer> {
        Some(self)
    }
}

impl StackPageContainer for StackNode {
    fn add_stack_page(&self, child: NativeHandle, desc: &StackPageDescriptor) -> Result<()> {
        self.base.bridge().call(
            self.handle,
            "add_titled",
            &[
                Value::Handle(child),
                Value::from(desc.name.clone()),
                Value::from(desc.title.clone()),
            ],
        )?;
        if let Some(page) = self.page_of(child)? {
            self.write_descriptor(page, desc)?;
        }
        Ok(())
    }

    fn insert_stack_page_before(
        &self,
        child: NativeHandle,
        desc: &StackPageDescriptor,
        _before: NativeHandle,
    ) -> Result<()> {
        // The native stack appends only; page order has no visual meaning
        // beyond switcher listing, so an insert degrades to an add.
        self.add_stack_page(child, desc)
    }

    fn remove_stack_page(&self, child: NativeHandle) -> Result<()> {
        self.base
            .bridge()
            .call(self.handle, "remove", &[Value::Handle(child)])?;
        Ok(())
    }

    fn update_stack_page(&self, child: NativeHandle, desc: &StackPageDescriptor) -> Result<()> {
        if let Some(page) = self.page_of(child)? {
            self.write_descriptor(page, desc)?;
        }
        Ok(())
    }
}

/// Virtual element pairing one child widget with a stack-page descriptor.
pub struct StackPageNode {
    base: NodeBase,
    descriptor: StackPageDescriptor,
    child: Option<NativeHandle>,
    attached: bool,
}

impl StackPageNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "StackPage";

    /// Read the page descriptor from the element props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Self {
        let descriptor = StackPageDescriptor::from_props(&props);
        Self {
            base: NodeBase::new(ctx, Self::TYPE, None, props),
            descriptor,
            child: None,
            attached: false,
        }
    }
}

impl Node for StackPageNode {
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

    fn attached_handle(&self) -> Option<NativeHandle> {
        self.child
    }

    fn on_child_appended(
        &mut self,
        child: &mut dyn Node,
        own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        let Some(handle) = child.attached_handle() else {
            return Ok(true);
        };
        self.child = Some(handle);
        if self.attached {
            if let Some(stack) = own_parent.and_then(Node::as_stack_page_container) {
                stack.add_stack_page(handle, &self.descriptor)?;
            }
        }
        Ok(true)
    }

    fn on_child_removed(
        &mut self,
        child: &mut dyn Node,
        own_parent: Option<&dyn Node>,
    ) -> Result<bool> {
        if child.attached_handle() == self.child {
            if let (Some(handle), true) = (self.child, self.attached) {
                if let Some(stack) = own_parent.and_then(Node::as_stack_page_container) {
                    stack.remove_stack_page(handle)?;
                }
            }
            self.child = None;
        }
        Ok(true)
    }

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(stack) = parent.as_stack_page_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        if let Some(child) = self.child {
            stack.add_stack_page(child, &self.descriptor)?;
        }
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        let Some(stack) = parent.as_stack_page_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        if let Some(child) = self.child {
            match before.attached_handle() {
                Some(before) => stack.insert_stack_page_before(child, &self.descriptor, before)?,
                None => stack.add_stack_page(child, &self.descriptor)?,
            }
        }
        Ok(())
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(stack) = parent.as_stack_page_container() {
            if let (Some(child), true) = (self.child, self.attached) {
                stack.remove_stack_page(child)?;
            }
        }
        self.attached = false;
        Ok(())
    }

    fn commit_update(&mut self, _old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        let next = StackPageDescriptor::from_props(new);
        if next == self.descriptor {
            return Ok(());
        }
        self.descriptor = next;

        // Descriptor changes apply in place; the child widget stays put.
        let stack = ctx.parent.and_then(Node::as_stack_page_container);
        if let (Some(stack), Some(child), true) = (stack, self.child, self.attached) {
            stack.update_stack_page(child, &self.descriptor)?;
        }
        Ok(())
    }
}
