//! # Cancel handle: the cancel trigger for one node.
//!
//! A [`CancelHandle`] is a cancel-only capability scoped to exactly one
//! context node, obtained from `Context::new_with_cancel`,
//! `Context::child_with_cancel` or `Context::cancel_handle`.
//!
//! It holds its own strong reference to the node, so a context created only
//! to be cancelled later stays cancellable even if no `Context` clone
//! survives.

use std::sync::Arc;

use crate::context::context::Inner;
use crate::status::Status;

/// Cancel trigger for one specific context node.
///
/// Cloning yields another trigger for the same node. Cancelling is
/// idempotent: the first call wins, later calls (from this handle, a clone,
/// or propagation from an ancestor) are no-ops.
///
/// # Example
/// ```rust
/// use ctxtree::{Context, Status};
///
/// let (ctx, cancel) = Context::new_with_cancel();
/// drop(ctx); // the handle alone keeps the node alive
///
/// cancel.cancel(Status::new(false).with_message("abort"));
/// assert!(cancel.is_done());
/// ```
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// Cancels the node (and transitively its live descendants) with `status`.
    ///
    /// No-op if the node is already done.
    pub fn cancel(&self, status: Status) {
        self.inner.cancel(&status);
    }

    /// Returns whether the node is done.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;

    #[test]
    fn test_handle_cancel_is_idempotent() {
        let (ctx, cancel) = Context::new_with_cancel();
        cancel.cancel(Status::new(false).with_code(7));
        cancel.cancel(Status::new(false).with_code(1));
        assert_eq!(ctx.status().code(), 7);
    }

    #[test]
    fn test_cloned_handles_share_the_node() {
        let (ctx, cancel) = Context::new_with_cancel();
        let other = cancel.clone();
        other.cancel(Status::new(false));
        assert!(cancel.is_done());
        assert!(ctx.is_done());
    }
}
