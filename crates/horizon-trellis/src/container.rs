//! Capability-typed container interfaces.
//!
//! A parent widget is exposed to the attachment protocol by the operation set
//! it supports for accepting children, never by its concrete type. At attach
//! time a child asks its parent for these capabilities through the accessors
//! on [`crate::node::Node`] (`as_child_container()`, ...) and dispatches to
//! whichever one the parent satisfies. One native class may satisfy different
//! capability sets depending on the slot it fills.
//!
//! These traits are the extension point for new specialized widget families:
//! implementing one on a node type is all that is needed for existing
//! children to attach to it.
//!
//! # Capability Families
//!
//! - [`ChildContainer`] - identity-based ordered attach/detach (flow
//!   containers, and single-child widgets which replace on attach)
//! - [`PackContainer`] - start/end packing with no intrinsic order beyond
//!   the group
//! - [`GridContainer`] - cell placement; position changes re-attach
//! - [`PageContainer`] - children paired with a tab label
//! - [`StackPageContainer`] - children paired with a page descriptor
//! - [`ItemContainer`] - index-free, stable-string-id driven item
//!   collections (virtualized widgets)
//! - [`ColumnContainer`] - column objects of a table widget

use horizon_trellis_core::{NativeHandle, Value};

use crate::error::Result;
use crate::props::Props;

/// Containers that manage child widgets with ordered, identity-based
/// attach/detach semantics.
pub trait ChildContainer {
    /// Attach `child` at the end.
    fn attach_child(&self, child: NativeHandle) -> Result<()>;

    /// Attach `child` in front of `before`.
    ///
    /// When `before` is not currently attached here, this falls back to
    /// [`attach_child`](Self::attach_child). This is deliberate tolerance for
    /// stale sibling references, not an error.
    fn insert_child_before(&self, child: NativeHandle, before: NativeHandle) -> Result<()>;

    /// Detach `child`.
    fn detach_child(&self, child: NativeHandle) -> Result<()>;
}

/// Containers with start/end packing groups (header and action bars).
pub trait PackContainer {
    /// Pack `child` into the start group.
    fn pack_start(&self, child: NativeHandle) -> Result<()>;

    /// Pack `child` into the end group.
    fn pack_end(&self, child: NativeHandle) -> Result<()>;

    /// Remove `child` from whichever group holds it.
    fn remove_from_pack(&self, child: NativeHandle) -> Result<()>;
}

/// Containers that place children in grid cells.
pub trait GridContainer {
    /// Attach `child` at the given cell with the given span.
    fn attach_to_grid(
        &self,
        child: NativeHandle,
        column: i32,
        row: i32,
        column_span: i32,
        row_span: i32,
    ) -> Result<()>;

    /// Remove `child` from the grid.
    fn remove_from_grid(&self, child: NativeHandle) -> Result<()>;
}

/// Containers that pair each child with a tab label.
pub trait PageContainer {
    /// Append a page wrapping `child` with the given tab label.
    fn add_page(&self, child: NativeHandle, label: &str) -> Result<()>;

    /// Insert a page in front of the page wrapping `before`; appends when
    /// `before` is not a page here.
    fn insert_page_before(&self, child: NativeHandle, label: &str, before: NativeHandle)
        -> Result<()>;

    /// Remove the page wrapping `child`.
    fn remove_page(&self, child: NativeHandle) -> Result<()>;

    /// Change the tab label of the page wrapping `child` without re-parenting
    /// the child widget.
    fn update_page_label(&self, child: NativeHandle, label: &str) -> Result<()>;
}

/// Descriptor of one stack page.
///
/// Carried by `StackPage` elements; descriptor changes apply in place and
/// never re-parent the child widget.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackPageDescriptor {
    /// Machine name used to address the page (`visible-child-name`).
    pub name: Option<String>,
    /// Human-readable title shown in stack switchers.
    pub title: Option<String>,
    /// Icon name from the icon theme.
    pub icon_name: Option<String>,
    /// Whether the switcher shows an attention marker.
    pub needs_attention: bool,
    /// Whether the page is shown in switchers.
    pub visible: bool,
    /// Badge count shown on the page indicator.
    pub badge_number: Option<u32>,
}

impl StackPageDescriptor {
    /// Read the descriptor fields out of an element's prop bag.
    pub fn from_props(props: &Props) -> Self {
        Self {
            name: props.get("name").and_then(|p| p.as_str()).map(str::to_owned),
            title: props.get("title").and_then(|p| p.as_str()).map(str::to_owned),
            icon_name: props
                .get("iconName")
                .and_then(|p| p.as_str())
                .map(str::to_owned),
            needs_attention: props
                .get("needsAttention")
                .and_then(|p| p.as_bool())
                .unwrap_or(false),
            visible: props.get("visible").and_then(|p| p.as_bool()).unwrap_or(true),
            badge_number: props.get("badgeNumber").and_then(|p| p.as_u32()),
        }
    }
}

/// Containers that pair each child with a [`StackPageDescriptor`].
pub trait StackPageContainer {
    /// Add a page for `child`.
    fn add_stack_page(&self, child: NativeHandle, desc: &StackPageDescriptor) -> Result<()>;

    /// Insert a page for `child` in front of the page of `before`; appends
    /// when `before` has no page here.
    fn insert_stack_page_before(
        &self,
        child: NativeHandle,
        desc: &StackPageDescriptor,
        before: NativeHandle,
    ) -> Result<()>;

    /// Remove the page of `child`.
    fn remove_stack_page(&self, child: NativeHandle) -> Result<()>;

    /// Apply descriptor changes to the page of `child` without re-parenting.
    fn update_stack_page(&self, child: NativeHandle, desc: &StackPageDescriptor) -> Result<()>;
}

/// Containers driven by stable string ids rather than widget identity.
///
/// Backed by a store (§ virtualized model bridge); items never materialize
/// one widget per entry. `parent_item` carries the id of the logical parent
/// row for tree nesting; `None` means top level.
pub trait ItemContainer {
    /// Append an item.
    fn add_item(&self, id: &str, value: &Value, parent_item: Option<&str>) -> Result<()>;

    /// Insert an item in front of `before`; appends when `before` is
    /// unknown.
    fn insert_item_before(
        &self,
        id: &str,
        before: &str,
        value: &Value,
        parent_item: Option<&str>,
    ) -> Result<()>;

    /// Remove an item. Unknown ids are a no-op.
    fn remove_item(&self, id: &str, parent_item: Option<&str>) -> Result<()>;

    /// Replace an item's data payload in place.
    fn update_item(&self, id: &str, value: &Value) -> Result<()>;
}

/// Containers that manage the column objects of a table widget.
pub trait ColumnContainer {
    /// Append a column object.
    fn add_column(&self, column: NativeHandle) -> Result<()>;

    /// Insert a column object in front of `before`; appends when `before` is
    /// not a column here.
    fn insert_column_before(&self, column: NativeHandle, before: NativeHandle) -> Result<()>;

    /// Remove a column object.
    fn remove_column(&self, column: NativeHandle) -> Result<()>;
}
