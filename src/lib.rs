//! # ctxtree
//!
//! **ctxtree** is a hierarchical cancellation primitive for async Rust.
//!
//! It provides a tree of [`Context`] objects where cancelling one node
//! atomically cancels every descendant, carries a terminal [`Status`]
//! (ok / error code / message), and lets any number of observers wait until
//! cancellation occurs or a deadline passes. It is the building block for
//! propagating "stop now" signals (timeouts, explicit aborts, parent
//! failures) through deeply nested concurrent call graphs without each layer
//! managing its own shutdown plumbing.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌───────────────┐
//!                 │  root Context │◄──── CancelHandle (cancel trigger)
//!                 └──────┬────────┘
//!              weak refs │ cancel(status) recurses downward
//!            ┌───────────┼───────────────┐
//!            ▼           ▼               ▼
//!     ┌────────────┐ ┌────────────┐ ┌────────────┐
//!     │  child A   │ │  child B   │ │  child C   │   (owned by their
//!     └─────┬──────┘ └────────────┘ └────────────┘    creators, not by
//!           ▼                                         the parent)
//!     ┌────────────┐
//!     │ grandchild │    each node: Mutex { done, status, children } +
//!     └────────────┘    watch channel for waiter wakeup
//! ```
//!
//! ### Lifecycle
//! ```text
//! Context::new() ──► ctx.child() ──► work, polling ctx.is_done()
//!                                    or awaiting ctx.done()
//!
//! cancel(status):
//!   ├─► done = true, status stored      (one-shot, under the node's lock)
//!   ├─► wake every waiter on this node
//!   └─► for each live child: cancel(status)   (same status, recursively)
//!
//! drop of last strong handle (Context clones + CancelHandles):
//!   └─► implicit cancel with the default ok status, children included
//! ```
//!
//! ## Features
//! | Area           | Description                                                      | Key types / macros                      |
//! |----------------|------------------------------------------------------------------|-----------------------------------------|
//! | **Tree**       | Derive children, cancel subtrees, bounded child-list memory.     | [`Context`], [`ContextConfig`]          |
//! | **Triggers**   | Cancel-only capability scoped to a single node.                  | [`CancelHandle`]                        |
//! | **Waiting**    | Await cancellation, with optional duration/deadline bounds.      | [`Context::done`], [`Context::wait_for`]|
//! | **Status**     | Immutable (ok, code, message) outcome attached to a cancellation.| [`Status`], [`format_status!`]          |
//! | **Combinator** | Run a future until it finishes or the context is cancelled.      | [`Context::run_until_done`]             |
//!
//! ## Optional features
//! - `signals`: exports [`cancel_on_shutdown_signal`], an OS-signal →
//!   cancellation bridge.
//!
//! ## Guarantees
//! - `done` is one-shot and irreversible; the first `cancel` wins and its
//!   status is never overwritten.
//! - A child created from an already-cancelled parent is born cancelled with
//!   the parent's status; there is no "not yet propagated" window.
//! - Waiters never miss a wakeup and never return early spuriously.
//! - Sibling cancellation order is unspecified; parent-before-descendant is
//!   guaranteed.
//! - Timed waits report timeout as `false`; timing out never cancels.
//!
//! ## Example
//! ```rust
//! use ctxtree::{Context, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let (root, cancel) = Context::new_with_cancel();
//!
//!     // One context per request, owned by the request handler.
//!     let request = root.child();
//!     let worker = tokio::spawn(async move {
//!         // Work until the subtree is told to stop.
//!         request.done().await;
//!         request.status()
//!     });
//!
//!     cancel.cancel(Status::new(false).with_code(1).with_message("shutdown"));
//!
//!     let seen = worker.await.unwrap();
//!     assert!(!seen.ok());
//!     assert_eq!(seen.message(), "shutdown");
//! }
//! ```

mod context;
mod status;

// ---- Public re-exports ----

pub use context::{CancelHandle, Context, ContextConfig};
pub use status::Status;

// Optional: expose the OS-signal → cancellation bridge.
// Enable with: `--features signals`
#[cfg(feature = "signals")]
mod signal;
#[cfg(feature = "signals")]
pub use signal::cancel_on_shutdown_signal;
