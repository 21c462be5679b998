//! # The context node: cancellation state machine, propagation, waiting.
//!
//! A [`Context`] is a cheap clonable handle to one node of a cancellation
//! tree. Cancelling a node is a one-shot, irreversible transition that stores
//! a [`Status`], wakes every waiter on that node, and synchronously cancels
//! every still-live child with the same status.
//!
//! ## Structure
//! ```text
//!           Context ── Arc ──► Inner
//!                               ├─ Mutex<State> { done, status, children, births }
//!                               ├─ watch::Sender<bool>   (waiter wakeup)
//!                               └─ ContextConfig         (inherited by children)
//!
//!           parent.children: Vec<Weak<Inner>>   (non-owning fan-out list)
//! ```
//!
//! ## Rules
//! - `done` is monotonic (false → true only); `status` never changes after
//!   the transition. Both are guarded by the node's own mutex — there is no
//!   tree-wide lock.
//! - Parents hold **weak** references to children; a child's lifetime is
//!   controlled solely by whoever holds its `Context` (or a [`CancelHandle`]).
//! - Propagation recurses strictly downward, so no lock-ordering cycle can
//!   form between nodes.
//! - A child derived from an already-done parent is born done with the
//!   parent's status and is never registered.
//! - Dropping the last strong reference to a not-yet-done node cancels it
//!   with the default ok status, children included.
//! - The child list is compacted (dead weak entries removed) every
//!   `compact_threshold` registrations and on [`Context::compress`]; this is
//!   a memory bound, never a correctness mechanism.

use std::future::Future;
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::context::config::ContextConfig;
use crate::context::handle::CancelHandle;
use crate::status::Status;

/// One node of a cancellation tree.
///
/// `Context` is `Clone`; every clone is a strong handle to the same node.
/// The node stays alive (and cancellable) until the last strong handle —
/// `Context` clones and [`CancelHandle`]s alike — is dropped.
///
/// # Example
/// ```rust
/// use ctxtree::{Context, Status};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let root = Context::new();
///     let child = root.child();
///
///     root.cancel(Status::new(false).with_code(1).with_message("shutdown"));
///
///     assert!(child.is_done());
///     assert_eq!(child.status().code(), 1);
///     child.done().await; // already done: returns immediately
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    state: Mutex<State>,
    done_tx: watch::Sender<bool>,
    config: ContextConfig,
}

struct State {
    done: bool,
    status: Status,
    children: Vec<Weak<Inner>>,
    /// Child registrations since the last compaction pass.
    births: usize,
}

impl Context {
    /// Creates a root context with the default [`ContextConfig`].
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    /// Creates a root context with the given config.
    ///
    /// The config is inherited by every child derived from this node.
    pub fn with_config(config: ContextConfig) -> Self {
        Self {
            inner: Inner::live(config),
        }
    }

    /// Creates a root context together with a [`CancelHandle`] for it.
    ///
    /// The handle holds its own strong reference, so the node remains
    /// cancellable even if every `Context` clone is dropped first.
    pub fn new_with_cancel() -> (Self, CancelHandle) {
        let ctx = Self::new();
        let handle = ctx.cancel_handle();
        (ctx, handle)
    }

    /// Creates a child of this node.
    ///
    /// If this node is already done, the child is born done with this node's
    /// status and is not registered (no further propagation can reach it).
    /// Otherwise the child is registered as a weak entry in this node's child
    /// list; every `compact_threshold` registrations the list is compacted
    /// as a side effect.
    ///
    /// May be called concurrently with `cancel`: a child registered before
    /// the cancelling thread takes the lock is cancelled via propagation,
    /// one registered after observes `done` and is born cancelled. There is
    /// no window in which a child of a done parent is observably not-done.
    pub fn child(&self) -> Context {
        let mut st = self.inner.state.lock();
        if st.done {
            return Context {
                inner: Inner::born_done(st.status.clone(), self.inner.config),
            };
        }
        let child = Context {
            inner: Inner::live(self.inner.config),
        };
        st.children.push(Arc::downgrade(&child.inner));
        st.births += 1;
        if st.births >= self.inner.config.threshold() {
            st.compact();
        }
        child
    }

    /// Creates a child together with a [`CancelHandle`] scoped to it.
    ///
    /// The handle cancels the child only; the parent and any siblings are
    /// unaffected.
    pub fn child_with_cancel(&self) -> (Context, CancelHandle) {
        let child = self.child();
        let handle = child.cancel_handle();
        (child, handle)
    }

    /// Returns a [`CancelHandle`] for this node.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.inner.clone())
    }

    /// Cancels this node and, transitively, every live descendant.
    ///
    /// Idempotent: on a node that is already done this is a no-op and the
    /// original status is kept. Otherwise, under the node's lock, `done` is
    /// set, `status` stored and every waiter woken; the call then cancels
    /// each still-live child with the same status (verbatim, unmodified)
    /// before returning. Children whose last strong reference is gone are
    /// skipped.
    pub fn cancel(&self, status: Status) {
        self.inner.cancel(&status);
    }

    /// Returns whether this node is done (cancelled).
    ///
    /// Non-blocking; consistent with the latest completed `cancel`.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// Returns the terminal status.
    ///
    /// Meaningful once [`is_done`](Context::is_done) is true; before that it
    /// is the default ok status.
    pub fn status(&self) -> Status {
        self.inner.state.lock().status.clone()
    }

    /// Waits until this node is done.
    ///
    /// Suspends the calling task; completes exactly when `is_done` becomes
    /// true (or immediately if it already is). No wakeup is ever missed:
    /// the done flag is flipped under the node's lock and rechecked on every
    /// wakeup.
    pub async fn done(&self) {
        let mut rx = self.inner.done_tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender gone means the node was dropped, which cancels it.
                break;
            }
        }
    }

    /// Waits until this node is done or `timeout` elapses.
    ///
    /// Returns `true` if the node was cancelled, `false` on timeout.
    /// Timing out does **not** cancel the node.
    pub async fn wait_for(&self, timeout: Duration) -> bool {
        time::timeout(timeout, self.done()).await.is_ok()
    }

    /// Waits until this node is done or `deadline` passes.
    ///
    /// Returns `true` if the node was cancelled, `false` on timeout.
    /// Passing the deadline does **not** cancel the node.
    pub async fn wait_until(&self, deadline: Instant) -> bool {
        time::timeout_at(deadline, self.done()).await.is_ok()
    }

    /// Drives `fut` to completion unless this node is cancelled first.
    ///
    /// Returns `Some(output)` if the future completed, `None` if the node
    /// was cancelled before it did (the future is dropped in that case).
    pub async fn run_until_done<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            out = fut => Some(out),
            _ = self.done() => None,
        }
    }

    /// Compacts the child list, dropping entries whose child has died.
    ///
    /// Same pass the node runs automatically every `compact_threshold`
    /// registrations. Safe to call at any time; affects memory only.
    pub fn compress(&self) {
        self.inner.state.lock().compact();
    }

    #[cfg(test)]
    fn child_list_len(&self) -> usize {
        self.inner.state.lock().children.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn live(config: ContextConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                done: false,
                status: Status::default(),
                children: Vec::new(),
                births: 0,
            }),
            done_tx: watch::Sender::new(false),
            config,
        })
    }

    fn born_done(status: Status, config: ContextConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                done: true,
                status,
                children: Vec::new(),
                births: 0,
            }),
            done_tx: watch::Sender::new(true),
            config,
        })
    }

    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// One-shot done transition plus synchronous downward propagation.
    ///
    /// The child list is detached under the lock and the lock released
    /// before recursing: `done` is already visible at that point, so a
    /// concurrently registering child either landed in the detached list or
    /// is born cancelled.
    pub(crate) fn cancel(&self, status: &Status) {
        let children = {
            let mut st = self.state.lock();
            if st.done {
                return;
            }
            st.done = true;
            st.status = status.clone();
            st.births = 0;
            self.done_tx.send_replace(true);
            mem::take(&mut st.children)
        };
        for weak in children {
            if let Some(child) = weak.upgrade() {
                child.cancel(status);
            }
        }
    }
}

impl Drop for Inner {
    /// Implicit cancellation for abandoned nodes.
    ///
    /// Runs when the last strong reference disappears. A node that was never
    /// cancelled is cancelled here with the default ok status, live children
    /// included, so nothing downstream can be left waiting forever.
    fn drop(&mut self) {
        let st = self.state.get_mut();
        if st.done {
            return;
        }
        st.done = true;
        st.status = Status::default();
        let children = mem::take(&mut st.children);
        self.done_tx.send_replace(true);
        let status = Status::default();
        for weak in children {
            if let Some(child) = weak.upgrade() {
                child.cancel(&status);
            }
        }
    }
}

impl State {
    /// Keeps only entries whose child is still alive.
    ///
    /// The replacement vector is pre-sized to half the prior length: in
    /// steady state roughly half of the registered children are expected to
    /// have died by the time a pass runs.
    fn compact(&mut self) {
        let mut live = Vec::with_capacity(self.children.len() / 2);
        live.extend(self.children.drain(..).filter(|w| w.strong_count() > 0));
        self.children = live;
        self.births = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(code: i32, message: &str) -> Status {
        Status::new(false).with_code(code).with_message(message)
    }

    #[tokio::test]
    async fn test_new_context_is_not_done() {
        let ctx = Context::new();
        assert!(!ctx.is_done());
        assert!(ctx.status().ok());
    }

    #[tokio::test]
    async fn test_cancel_via_handle() {
        let (ctx, cancel) = Context::new_with_cancel();
        assert!(!ctx.is_done());
        cancel.cancel(Status::new(false));
        assert!(ctx.is_done());
        assert!(!ctx.status().ok());
    }

    #[tokio::test]
    async fn test_clones_share_the_node() {
        let ctx = Context::new();
        let other = ctx.clone();
        other.cancel(failed(3, ""));
        assert!(ctx.is_done());
        assert_eq!(ctx.status().code(), 3);
    }

    #[tokio::test]
    async fn test_second_cancel_is_a_noop() {
        let ctx = Context::new();
        ctx.cancel(failed(7, "timeout"));
        ctx.cancel(failed(1, "shutdown"));
        assert_eq!(ctx.status(), failed(7, "timeout"));
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_children() {
        let (ctx, cancel) = Context::new_with_cancel();
        let children: Vec<_> = (0..10).map(|_| ctx.child()).collect();
        cancel.cancel(Status::new(false));
        assert!(ctx.is_done());
        for child in &children {
            assert!(child.is_done());
            assert!(!child.status().ok());
        }
    }

    #[tokio::test]
    async fn test_cancel_propagates_transitively() {
        let root = Context::new();
        let mid = root.child();
        let leaf = mid.child();
        root.cancel(failed(0, "stop"));
        assert!(mid.is_done());
        assert!(leaf.is_done());
        assert_eq!(leaf.status().message(), "stop");
    }

    #[tokio::test]
    async fn test_released_children_are_skipped_on_cancel() {
        let (ctx, cancel) = Context::new_with_cancel();
        let mut children: Vec<_> = (0..10).map(|_| ctx.child()).collect();
        children.truncate(1);
        cancel.cancel(Status::new(false));
        assert!(ctx.is_done());
        for child in &children {
            assert!(child.is_done());
            assert!(!child.status().ok());
        }
    }

    #[tokio::test]
    async fn test_child_of_done_parent_is_born_done() {
        let (ctx, cancel) = Context::new_with_cancel();
        cancel.cancel(failed(4, ""));
        let child = ctx.child();
        assert!(child.is_done());
        assert_eq!(child.status().code(), 4);
        assert_eq!(ctx.child_list_len(), 0, "no linkage for a born-done child");

        let (c2, h2) = ctx.child_with_cancel();
        assert!(c2.is_done());
        h2.cancel(failed(5, "")); // no-op on a terminal node
        assert_eq!(c2.status().code(), 4);
    }

    #[tokio::test]
    async fn test_child_cancel_does_not_affect_parent_or_sibling() {
        let root = Context::new();
        let (a, cancel_a) = root.child_with_cancel();
        let b = root.child();

        cancel_a.cancel(failed(7, "timeout"));
        assert!(a.is_done());
        assert!(!b.is_done());
        assert!(!root.is_done());

        root.cancel(failed(1, "shutdown"));
        assert!(b.is_done());
        assert_eq!(b.status(), failed(1, "shutdown"));
        // Cancellation never overwrites an already-terminal node.
        assert_eq!(a.status(), failed(7, "timeout"));
    }

    #[tokio::test]
    async fn test_cancel_handle_keeps_node_cancellable() {
        let (ctx, cancel) = Context::new_with_cancel();
        let child = ctx.child();
        drop(ctx);
        assert!(!cancel.is_done());
        cancel.cancel(failed(9, ""));
        assert!(cancel.is_done());
        assert!(child.is_done());
        assert_eq!(child.status().code(), 9);
    }

    #[tokio::test]
    async fn test_drop_cancels_live_children_with_default_status() {
        let parent = Context::new();
        let child = parent.child();
        drop(parent);
        assert!(child.is_done());
        assert_eq!(child.status(), Status::default());
        child.done().await; // released immediately
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_waiters_released_on_cancel() {
        let (ctx, cancel) = Context::new_with_cancel();
        let mut waiters = Vec::new();
        for _ in 0..8 {
            let c = ctx.clone();
            waiters.push(tokio::spawn(async move { c.done().await }));
        }
        tokio::task::yield_now().await;
        cancel.cancel(Status::new(false));
        for w in waiters {
            w.await.expect("waiter must complete after cancel");
        }
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_returns_false_on_timeout() {
        let ctx = Context::new();
        assert!(!ctx.wait_for(Duration::from_millis(50)).await);
        assert!(!ctx.is_done(), "timeout must not cancel the context");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_returns_true_on_cancel() {
        let (ctx, cancel) = Context::new_with_cancel();
        let waiter = {
            let c = ctx.clone();
            tokio::spawn(async move { c.wait_for(Duration::from_secs(5)).await })
        };
        time::sleep(Duration::from_millis(10)).await;
        cancel.cancel(failed(0, "stop"));
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out_before_late_cancel() {
        let (ctx, cancel) = Context::new_with_cancel();
        let waiter = {
            let c = ctx.clone();
            tokio::spawn(async move { c.wait_for(Duration::from_millis(10)).await })
        };
        time::sleep(Duration::from_millis(100)).await;
        cancel.cancel(Status::new(false));
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_deadline() {
        let ctx = Context::new();
        assert!(!ctx.wait_until(Instant::now() + Duration::from_millis(20)).await);

        let (ctx, cancel) = Context::new_with_cancel();
        cancel.cancel(Status::new(false));
        assert!(ctx.wait_until(Instant::now() + Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_done_completes_work() {
        let ctx = Context::new();
        assert_eq!(ctx.run_until_done(async { 42 }).await, Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_done_aborts_on_cancel() {
        let (ctx, cancel) = Context::new_with_cancel();
        let worker = {
            let c = ctx.clone();
            tokio::spawn(async move {
                c.run_until_done(time::sleep(Duration::from_secs(60))).await
            })
        };
        time::sleep(Duration::from_millis(5)).await;
        cancel.cancel(Status::new(false));
        assert_eq!(worker.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_compaction_bounds_child_list() {
        let ctx = Context::new();
        let mut kept = Vec::new();
        for i in 0..250 {
            let child = ctx.child();
            if i % 10 == 0 {
                kept.push(child);
            }
        }
        // 250 registrations cross the default threshold at least twice;
        // dead entries must not survive a pass.
        assert!(ctx.child_list_len() < 100);

        ctx.cancel(failed(2, ""));
        for child in &kept {
            assert!(child.is_done());
            assert_eq!(child.status().code(), 2);
        }
    }

    #[tokio::test]
    async fn test_custom_threshold_compacts_eagerly() {
        let ctx = Context::with_config(ContextConfig {
            compact_threshold: 1,
        });
        for _ in 0..10 {
            let _ = ctx.child();
        }
        assert!(ctx.child_list_len() <= 1);
    }

    #[tokio::test]
    async fn test_children_inherit_config() {
        let ctx = Context::with_config(ContextConfig {
            compact_threshold: 1,
        });
        let child = ctx.child();
        for _ in 0..10 {
            let _ = child.child();
        }
        assert!(child.child_list_len() <= 1);
    }

    #[tokio::test]
    async fn test_compress_drops_dead_entries() {
        let ctx = Context::new();
        let survivor = ctx.child();
        for _ in 0..20 {
            let _ = ctx.child();
        }
        ctx.compress();
        assert_eq!(ctx.child_list_len(), 1);

        ctx.cancel(failed(6, ""));
        assert!(survivor.is_done());
        assert_eq!(survivor.status().code(), 6);
    }
}
