//! Core systems for Horizon Trellis.
//!
//! This crate provides the foundation the host-renderer backend is built on:
//!
//! - **Native handles & typed values**: opaque [`NativeHandle`]s and the
//!   [`Value`] enum that carries everything crossing the FFI boundary
//! - **The bridge surface**: the [`ForeignBridge`] trait describing the
//!   call/marshaling layer this backend consumes but does not implement
//! - **Signal lifecycle**: the [`SignalStore`] table owning every native
//!   signal connection, keyed by `(node, signal name)`
//! - **Debug helpers**: tree dumps and scope timing for `tracing` output
//!
//! # Signal Lifecycle Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_trellis_core::{NativeHandle, SignalStore};
//! # fn bridge() -> Arc<dyn horizon_trellis_core::ForeignBridge> { unimplemented!() }
//! # fn node_id() -> horizon_trellis_core::NodeId { unimplemented!() }
//!
//! let signals = SignalStore::new(bridge());
//! let node = node_id();
//! let button = NativeHandle::from_raw(7);
//!
//! // Connecting twice for the same (node, signal) replaces the handler.
//! signals.connect(node, button, "clicked", Arc::new(|_| println!("first")))?;
//! signals.connect(node, button, "clicked", Arc::new(|_| println!("second")))?;
//!
//! // Unmount teardown: nothing owned by the node can fire afterwards.
//! signals.disconnect_node(node);
//! # Ok::<(), horizon_trellis_core::BridgeError>(())
//! ```

mod bridge;
mod error;
pub mod logging;
mod signals;
mod value;

pub use bridge::{ForeignBridge, SignalHandler};
pub use error::{BridgeError, BridgeResult};
pub use signals::{NodeId, SignalStore};
pub use value::{ConnectionToken, NativeHandle, Value};
