//! Grid container and its cell-placement child.
//!
//! `Grid` places children at (column, row) cells with spans. The placement
//! lives on a virtual `GridChild` element wrapping the actual widget; a
//! position or span change re-attaches the same native handle rather than
//! mutating the attachment in place.

use std::any::Any;

use horizon_trellis_core::{NativeHandle, Value};

use crate::container::GridContainer;
use crate::error::{Error, Result};
use crate::node::{CommitContext, CreateContext, Node, NodeBase};
use crate::props::{prop_changed, Props};

/// A native grid widget.
pub struct GridNode {
    base: NodeBase,
    handle: NativeHandle,
}

impl GridNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "Grid";

    /// Construct the native grid and apply initial props.
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
}

impl Node for GridNode {
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

    fn as_grid_container(&self) -> Option<&dyn GridContainer> {
        Some(self)
    }
}

impl GridContainer for GridNode {
    fn attach_to_grid(
        &self,
        child: NativeHandle,
        column: i32,
        row: i32,
        column_span: i32,
        row_span: i32,
    ) -> Result<()> {
        self.base.bridge().call(
            self.handle,
            "attach",
            &[
                Value::Handle(child),
                Value::I32(column),
                Value::I32(row),
                Value::I32(column_span),
                Value::I32(row_span),
            ],
        )?;
        Ok(())
    }

    fn remove_from_grid(&self, child: NativeHandle) -> Result<()> {
        self.base
            .bridge()
            .call(self.handle, "remove", &[Value::Handle(child)])?;
        Ok(())
    }
}

/// Cell placement of one grid child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellPlacement {
    column: i32,
    row: i32,
    column_span: i32,
    row_span: i32,
}

impl CellPlacement {
    fn from_props(props: &Props) -> Self {
        Self {
            column: props.get("column").and_then(|p| p.as_i32()).unwrap_or(0),
            row: props.get("row").and_then(|p| p.as_i32()).unwrap_or(0),
            column_span: props
                .get("columnSpan")
                .and_then(|p| p.as_i32())
                .unwrap_or(1),
            row_span: props.get("rowSpan").and_then(|p| p.as_i32()).unwrap_or(1),
        }
    }
}

/// Virtual element pairing one child widget with a grid cell.
pub struct GridChildNode {
    base: NodeBase,
    placement: CellPlacement,
    child: Option<NativeHandle>,
    attached: bool,
}

impl GridChildNode {
    /// Element type this node backs.
    pub const TYPE: &'static str = "GridChild";

    /// Read the cell placement from the element props.
    pub fn new(ctx: &CreateContext<'_>, props: Props) -> Self {
        let placement = CellPlacement::from_props(&props);
        Self {
            base: NodeBase::new(ctx, Self::TYPE, None, props),
            placement,
            child: None,
            attached: false,
        }
    }

    fn attach_into(&self, grid: &dyn GridContainer) -> Result<()> {
        if let Some(child) = self.child {
            grid.attach_to_grid(
                child,
                self.placement.column,
                self.placement.row,
                self.placement.column_span,
                self.placement.row_span,
            )?;
        }
        Ok(())
    }
}

impl Node for GridChildNode {
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
            if let Some(grid) = own_parent.and_then(Node::as_grid_container) {
                self.attach_into(grid)?;
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
                if let Some(grid) = own_parent.and_then(Node::as_grid_container) {
                    grid.remove_from_grid(handle)?;
                }
            }
            self.child = None;
        }
        Ok(true)
    }

    fn attach_to_parent(&mut self, parent: &dyn Node) -> Result<()> {
        let Some(grid) = parent.as_grid_container() else {
            return Err(Error::unsupported_child(parent.type_name(), self.type_name()));
        };
        self.attached = true;
        self.attach_into(grid)
    }

    fn attach_to_parent_before(&mut self, parent: &dyn Node, _before: &dyn Node) -> Result<()> {
        // Cell placement carries the position; sibling order is irrelevant.
        self.attach_to_parent(parent)
    }

    fn detach_from_parent(&mut self, parent: &dyn Node) -> Result<()> {
        if let Some(grid) = parent.as_grid_container() {
            if let (Some(child), true) = (self.child, self.attached) {
                grid.remove_from_grid(child)?;
            }
        }
        self.attached = false;
        Ok(())
    }

    fn commit_update(&mut self, old: &Props, new: &Props, ctx: &CommitContext<'_>) -> Result<()> {
        let moved = ["column", "row", "columnSpan", "rowSpan"]
            .iter()
            .any(|key| prop_changed(Some(old), new, key));
        if !moved {
            return Ok(());
        }

        // A placement change re-attaches the same handle; the attachment is
        // never mutated in place.
        let grid = ctx.parent.and_then(Node::as_grid_container);
        if let (Some(grid), Some(child), true) = (grid, self.child, self.attached) {
            grid.remove_from_grid(child)?;
            self.placement = CellPlacement::from_props(new);
            self.attach_into(grid)?;
        } else {
            self.placement = CellPlacement::from_props(new);
        }
        Ok(())
    }
}
