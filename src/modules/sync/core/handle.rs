// Close handle for one live subscription.
//
// Purpose
// - The only way to stop receiving notifications.
//
// Notes
// - Cloning shares the same subscription. `close` is idempotent and callable from any task.
// - `SubscriptionGuard` closes on drop, so every exit path of the owning scope releases the
//   channel.

use crate::modules::sync::core::state::SubscriptionState;
use crate::shared::infrastructure::document_store::ListenTarget;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use uuid::Uuid;

struct HandleInner {
    id: Uuid,
    target: ListenTarget,
    closed: watch::Sender<bool>,
    state: watch::Sender<SubscriptionState>,
    finished: AtomicBool,
}

#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.inner.id)
            .field("target", &self.inner.target)
            .field("state", &self.state())
            .finish()
    }
}

impl SubscriptionHandle {
    pub(crate) fn new(target: ListenTarget) -> Self {
        let (closed, _) = watch::channel(false);
        let (state, _) = watch::channel(SubscriptionState::Unsubscribed);
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::now_v7(),
                target,
                closed,
                state,
                finished: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn target(&self) -> &ListenTarget {
        &self.inner.target
    }

    pub fn state(&self) -> SubscriptionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.inner.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// No pump is running for this subscription any more: it was closed, failed to open, or
    /// gave up retrying.
    pub fn is_finished(&self) -> bool {
        self.is_closed() || self.inner.finished.load(Ordering::SeqCst)
    }

    pub fn same_as(&self, other: &SubscriptionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn close(&self) {
        let was_closed = self.inner.closed.send_replace(true);
        if !was_closed {
            self.inner.state.send_replace(SubscriptionState::Unsubscribed);
            tracing::info!(
                subscription_id = %self.inner.id,
                target = %self.inner.target,
                "subscription closed"
            );
        }
    }

    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { handle: self }
    }

    /// Resolves once `close` has been called.
    pub(crate) async fn closed(&self) {
        let mut closed = self.inner.closed.subscribe();
        // Err means the handle itself was dropped, which also ends the subscription.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Publish a new state unless the handle was closed.
    pub(crate) fn set_state(&self, next: SubscriptionState) {
        let closed = &self.inner.closed;
        let target = &self.inner.target;
        self.inner.state.send_if_modified(|current| {
            if *closed.borrow() || *current == next {
                return false;
            }
            tracing::debug!(%target, from = %current, to = %next, "subscription state");
            *current = next;
            true
        });
    }

    pub(crate) fn mark_finished(&self) {
        self.inner.finished.store(true, Ordering::SeqCst);
    }
}

/// Closes the wrapped subscription when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    handle: SubscriptionHandle,
}

impl SubscriptionGuard {
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod subscription_handle_tests {
    use super::*;
    use crate::shared::infrastructure::document_store::Collection;
    use rstest::{fixture, rstest};

    #[fixture]
    fn handle() -> SubscriptionHandle {
        SubscriptionHandle::new(ListenTarget::Collection(Collection::Gigs))
    }

    #[rstest]
    fn it_should_close_idempotently(handle: SubscriptionHandle) {
        handle.set_state(SubscriptionState::Active);
        handle.close();
        handle.close();
        assert!(handle.is_closed());
        assert!(handle.is_finished());
        assert_eq!(handle.state(), SubscriptionState::Unsubscribed);
    }

    #[rstest]
    fn it_should_ignore_state_changes_after_close(handle: SubscriptionHandle) {
        handle.close();
        handle.set_state(SubscriptionState::Active);
        assert_eq!(handle.state(), SubscriptionState::Unsubscribed);
    }

    #[rstest]
    fn it_should_share_closing_between_clones(handle: SubscriptionHandle) {
        let clone = handle.clone();
        clone.close();
        assert!(handle.is_closed());
        assert!(handle.same_as(&clone));
    }

    #[rstest]
    fn it_should_close_when_the_guard_is_dropped(handle: SubscriptionHandle) {
        {
            let _guard = handle.clone().into_guard();
        }
        assert!(handle.is_closed());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_wake_waiters_on_close(handle: SubscriptionHandle) {
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.closed().await });
        handle.close();
        task.await.unwrap();
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_allow_closing_from_another_task(handle: SubscriptionHandle) {
        let remote = handle.clone();
        tokio::spawn(async move { remote.close() }).await.unwrap();
        assert!(handle.is_closed());
    }
}
