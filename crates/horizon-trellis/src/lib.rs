//! Horizon Trellis - a host-renderer backend for declarative UI trees.
//!
//! Trellis applies the commit stream of an upstream declarative UI runtime
//! to a retained-mode native widget tree reached through a foreign-function
//! bridge. It owns reconciliation mechanics, never drawing or layout:
//!
//! - **Node hierarchy & attachment protocol**: widget nodes own native
//!   handles; virtual nodes route children into specialized slots; children
//!   attach by testing which [container capability](container) their parent
//!   structurally satisfies
//! - **Virtualized model bridge**: id-addressed [stores](store) kept in
//!   lockstep with index-addressed native models, plus selection and lazy
//!   row rendering
//! - **Signal lifecycle**: every event prop is one native connection owned
//!   by its node, replaced on change and drained on unmount
//! - **Commit protocol**: the fixed entry-point set on [`HostTree`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_trellis::{HostTree, PropValue, Props};
//! use horizon_trellis::testing::RecordingBridge;
//!
//! let bridge = Arc::new(RecordingBridge::new());
//! let mut tree = HostTree::new(bridge);
//!
//! let window = tree.create("Window", Props::new())?;
//! let label = tree.create(
//!     "Label",
//!     Props::from([("label".to_owned(), PropValue::from("Hello"))]),
//! )?;
//! tree.append_child(window, label)?;
//! tree.commit_mount(window)?;
//! # Ok::<(), horizon_trellis::Error>(())
//! ```

pub mod container;
mod error;
mod factory;
mod host;
pub mod node;
mod props;
pub mod store;
pub mod testing;

pub use error::{Error, Result};
pub use host::{FlushFn, FlushQueue, HostTree};
pub use props::{
    callback_change, is_signal_prop, prop_changed, property_name_for_prop, signal_name_for_prop,
    CallbackChange, PropValue, Props,
};

// Core types commonly needed alongside the host tree.
pub use horizon_trellis_core::{
    BridgeError, BridgeResult, ConnectionToken, ForeignBridge, NativeHandle, NodeId, SignalHandler,
    SignalStore, Value,
};
