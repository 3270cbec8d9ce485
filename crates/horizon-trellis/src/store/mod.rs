//! The virtualized list/tree model bridge.
//!
//! Native virtualized widgets (list, grid, tree, table) are driven by an
//! index-addressed native model with count/get access and change
//! notification; they must not be driven by eagerly creating one native row
//! widget per logical item. The stores in this module decouple the logical,
//! id-addressed collection declared by the element tree from that native
//! model:
//!
//! - [`TreeStore`] - ordered id-addressed items with optional nesting, kept
//!   in lockstep with a native model (flattened, depth-first,
//!   expansion-aware indices)
//! - [`StringStore`] - flat id-to-label store for string-list widgets
//! - [`SelectionBinding`] - selection mode + selected-id projection over a
//!   store; translates native indices back to logical ids
//! - [`RowRenderer`] - lazy per-row rendering through the native factory's
//!   setup/bind/unbind/teardown lifecycle
//!
//! Every mutation updates the logical structure first and then issues the
//! minimal corresponding native model edit, so the widget's viewport
//! re-measures only the changed range and the id-to-index mapping is
//! consistent the moment a mutation returns.

mod row_renderer;
mod selection;
mod string_store;
mod tree_store;

pub use row_renderer::{RenderRowFn, RowRenderer, RowSlot};
pub use selection::{SelectionBinding, SelectionMode};
pub use string_store::StringStore;
pub use tree_store::{ItemUpdatedFn, TreeStore};
