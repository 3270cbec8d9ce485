//! Element-type to node-implementation dispatch.
//!
//! Specialized and virtual element types are matched first; anything else
//! that names a class known to the toolkit metadata becomes a generic
//! [`WidgetNode`]. An element type matching neither is a fatal error - there
//! is no silent fallback widget.

use crate::error::{Error, Result};
use crate::node::{
    ColumnNode, ColumnViewNode, CreateContext, DropDownNode, GridChildNode, GridNode, ListItemNode,
    ListViewNode, Node, NotebookNode, NotebookPageNode, PackSlotNode, StackNode, StackPageNode,
    StringItemNode, WidgetNode,
};
use crate::props::Props;

/// Build the node implementation for an element type.
pub fn create_node(
    ctx: &CreateContext<'_>,
    type_name: &str,
    props: Props,
) -> Result<Box<dyn Node>> {
    let node: Box<dyn Node> = match type_name {
        ListItemNode::TYPE => Box::new(ListItemNode::new(ctx, props)),
        StringItemNode::TYPE => Box::new(StringItemNode::new(ctx, props)),
        GridChildNode::TYPE => Box::new(GridChildNode::new(ctx, props)),
        NotebookPageNode::TYPE => Box::new(NotebookPageNode::new(ctx, props)),
        StackPageNode::TYPE => Box::new(StackPageNode::new(ctx, props)),
        t if PackSlotNode::matches(t) => Box::new(PackSlotNode::new(ctx, t, props)),
        GridNode::TYPE => Box::new(GridNode::new(ctx, props)?),
        NotebookNode::TYPE => Box::new(NotebookNode::new(ctx, props)?),
        StackNode::TYPE => Box::new(StackNode::new(ctx, props)?),
        ColumnViewNode::TYPE => Box::new(ColumnViewNode::new(ctx, props)?),
        ColumnNode::TYPE => Box::new(ColumnNode::new(ctx, props)?),
        DropDownNode::TYPE => Box::new(DropDownNode::new(ctx, props)?),
        t if ListViewNode::matches(t) => Box::new(ListViewNode::new(ctx, t, props)?),
        t if ctx.bridge.has_class(t) => Box::new(WidgetNode::new(ctx, t, props)?),
        t => return Err(Error::unknown_element_type(t)),
    };
    Ok(node)
}
