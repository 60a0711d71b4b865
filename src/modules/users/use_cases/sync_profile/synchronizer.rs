// Display name of the signed-in user, kept live.
//
// Purpose
// - Republish `firstName` (empty when absent) whenever the user document changes.
//
// Lifecycle
// - `start` when the session begins, `stop` when it ends. Stopping closes the user
//   subscription; dropping the synchronizer does the same.

use crate::modules::sync::core::handle::SubscriptionGuard;
use crate::modules::sync::use_cases::mirror_documents::manager::{
    SubscriptionError, SubscriptionManager,
};
use crate::modules::users::core::user::UserRecord;
use crate::shared::core::session::Session;
use crate::shared::infrastructure::document_store::DocumentStore;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

struct Running {
    guard: SubscriptionGuard,
    forwarder: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

pub struct ProfileSynchronizer<TStore>
where
    TStore: DocumentStore + 'static,
{
    session: Session,
    manager: Arc<SubscriptionManager<TStore>>,
    display_name: watch::Sender<String>,
    running: Mutex<Option<Running>>,
}

impl<TStore> ProfileSynchronizer<TStore>
where
    TStore: DocumentStore + 'static,
{
    pub fn new(session: Session, manager: Arc<SubscriptionManager<TStore>>) -> Self {
        let (display_name, _) = watch::channel(String::new());
        Self {
            session,
            manager,
            display_name,
            running: Mutex::new(None),
        }
    }

    /// Subscribe to the session user's document. A no-op for anonymous sessions or when
    /// already running.
    pub async fn start(&self) -> Result<(), SubscriptionError> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(());
        };
        let mut running = self.running.lock().await;
        if running
            .as_ref()
            .is_some_and(|running| !running.guard.handle().is_finished())
        {
            return Ok(());
        }

        let (handle, cell) = self.manager.subscribe_user(user_id).await?;
        let mut records = cell.subscribe();
        let display_name = self.display_name.clone();
        let closing = handle.clone();
        let forwarder = tokio::spawn(async move {
            loop {
                let name = first_name(&records.borrow_and_update());
                display_name.send_if_modified(|current| {
                    if *current == name {
                        return false;
                    }
                    *current = name;
                    true
                });
                tokio::select! {
                    biased;
                    _ = closing.closed() => break,
                    changed = records.changed() => if changed.is_err() { break },
                }
            }
        });

        tracing::info!(%user_id, "profile sync started");
        *running = Some(Running {
            guard: handle.into_guard(),
            forwarder,
        });
        Ok(())
    }

    pub async fn stop(&self) {
        if self.running.lock().await.take().is_some() {
            self.display_name.send_replace(String::new());
            tracing::info!("profile sync stopped");
        }
    }

    pub fn current_display_name(&self) -> String {
        self.display_name.borrow().clone()
    }

    pub fn watch_display_name(&self) -> watch::Receiver<String> {
        self.display_name.subscribe()
    }
}

fn first_name(record: &Option<UserRecord>) -> String {
    record
        .as_ref()
        .map(|record| record.display_name().to_string())
        .unwrap_or_default()
}
