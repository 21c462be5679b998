//! # Cancellation tree: contexts, cancel handles, tuning.
//!
//! This module groups the context node itself and its small satellites.
//!
//! ## Contents
//! - [`Context`] — a node of the cancellation tree (create roots/children,
//!   cancel, wait)
//! - [`CancelHandle`] — cancel trigger scoped to one node
//! - [`ContextConfig`] — compaction tuning, inherited by children
//!
//! ## Quick reference
//! - **Cancel** flows downward only: a node's `cancel` recursively cancels
//!   its live children before returning; ancestors are never touched.
//! - **Ownership** flows upward never: parents hold weak references, a child
//!   lives exactly as long as its strong handles do.

mod config;
#[allow(clippy::module_inception)]
mod context;
mod handle;

pub use config::ContextConfig;
pub use context::Context;
pub use handle::CancelHandle;
