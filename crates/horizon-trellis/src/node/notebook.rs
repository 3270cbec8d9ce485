//! Tabbed notebook container and its page descriptor child.
//!
//! A `NotebookPage` element pairs one child widget with a tab label. Label
//! changes apply through the page container without re-parenting the child.

use std::any::Any;

use horizon_trellis_core::{NativeHandle, Value};

use crate::container::PageContainer;
use crate::error::{Error, Result};
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{prop_changed, Props};

/// A native notebook (tabbed) widget.
pub struct NotebookNode {
    base: NodeBase,
    handle: NativeHandle,
}

impl NotebookNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "Notebook";

    /// Construct the native notebook and apply initial props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Result<Self> {
        let handle = ctx.bridge.create(Self::TYPE, &[])?;
        let node = Self {
            base: NodeBase::new(ctx, Self::TYPE, Some(handle), props),
            handle,
        };
        node.base
            .apply_props(ctx.signals, None, node.base.props(), &[])?;
        Ok(node)
    }

    /// Build the tab-label widget for a page.
    fn tab_label(&self, label: &str) -> Result<NativeHandle> {
        let bridge = self.base.bridge();
        let tab = bridge.create("Label", &[])?;
        bridge.set_property(tab, "label", Value::Str(label.to_owned()))?;
        Ok(tab)
    }

    fn page_num(&self, child: NativeHandle) -> Result<i32> {
        Ok(self
            .base
            .bridge()
            .call(self.handle, "page_num", &[Value::Handle(child)])?
            .as_i32()
            .unwrap_or(-1))
    }
}

impl Node for NotebookNode {
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

    fn as_page_container(&self) -> Option<&dyn PageContainer> {
        Some(self)
    }
}

impl PageContainer for NotebookNode {
    fn add_page(&self, child: NativeHandle, label: &str) -> Result<()> {
        let tab = self.tab_label(label)?;
        self.base.bridge().call(
            self.handle,
            "append_page",
            &[Value::Handle(child), Value::Handle(tab)],
        )?;
        Ok(())
    }

    fn insert_page_before(
        &self,
        child: NativeHandle,
        label: &str,
        before: NativeHandle,
    ) -> Result<()> {
        let position = self.page_num(before)?;
        if position < 0 {
            return self.add_page(child, label);
        }
        let tab = self.tab_label(label)?;
        self.base.bridge().call(
            self.handle,
            "insert_page",
            &[Value::Handle(child), Value::Handle(tab), Value::I32(position)],
        )?;
        Ok(())
    }

    fn remove_page(&self, child: NativeHandle) -> Result<()> {
        let position = self.page_num(child)?;
        if position >= 0 {
            self.base
                .bridge()
                .call(self.handle, "remove_page", &[Value::I32(position)])?;
        }
        Ok(())
    }

    fn update_page_label(&self, child: NativeHandle, label: &str) -> Result<()> {
        let tab = self.tab_label(label)?;
        self.base.bridge().call(
            self.handle,
            "set_tab_label",
            &[Value::Handle(child), Value::Handle(tab)],
        )?;
        Ok(())
    }
}

/// Virtual element pairing one child widget with a tab label.
pub struct NotebookPageNode {
    base: NodeBase,
    label: String,
    child: Option<NativeHandle>,
    attached: bool,
}

impl NotebookPageNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "NotebookPage";

    /// Read the tab label from the element props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Self {
        let label = props
            .get("label")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();
        Self {
            base: NodeBase::new(ctx, Self::TYPE, None, props),
            label,
            child: None,
            attached: false,
        }
    }
}

impl Node for NotebookPageNode {
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
            if let Some(pages) = own_parent.and_then(Node::as_page_container) {
                pages.add_page(handle, &self.label)?;
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
                if let Some(pages) = own_parent.and_then(Node::as_page_container) {
                    pages.remove_page(handle)?;
                }
            }
            self.child = None;
        }
        Ok(true)
    }

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(pages) = parent.as_page_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        if let Some(child) = self.child {
            pages.add_page(child, &self.label)?;
        }
        Ok(())
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, before: &dyn Node) -> Result<()> {
        let Some(pages) = parent.as_page_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        if let Some(child) = self.child {
            match before.attached_handle() {
                Some(before) => pages.insert_page_before(child, &self.label, before)?,
                None => pages.add_page(child, &self.label)?,
            }
        }
        Ok(())
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(pages) = parent.as_page_container() {
            if let (Some(child), true) = (self.child, self.attached) {
                pages.remove_page(child)?;
            }
        }
        self.attached = false;
        Ok(())
    }

    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        if !prop_changed(Some(old), new, "label") {
            return Ok(());
        }
        self.label = new
            .get("label")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_owned();

        // Renaming the tab never re-parents the child widget.
        let pages = ctx.parent.and_then(Node::as_page_container);
        if let (Some(pages), Some(child), true) = (pages, self.child, self.attached) {
            pages.update_page_label(child, &self.label)?;
        }
        Ok(())
    }
}
