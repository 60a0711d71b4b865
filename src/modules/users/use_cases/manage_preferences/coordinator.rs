// Optimistic preference mutations for the signed-in user.
//
// Purpose
// - Like/unlike, recommend, gig notifications and profile edits.
//
// Responsibilities
// - Apply the local edit to the user cell before the remote write is awaited.
// - Issue the matching set-union / set-remove / increment / set write, bounded by a timeout.
// - Revert the touched membership (or names) when the write fails, and surface the failure.
// - Track every optimistic edit as Pending -> Confirmed | Rejected.
//
// Boundaries
// - Only acts for the user in the `Session`. The user subscription may overwrite an
//   optimistic value at any time; the backend is last-writer-wins.

use crate::modules::gigs::core::event_index::IndexReader;
use crate::modules::gigs::core::gig::GigRecord;
use crate::modules::users::core::mutation::{MutationId, MutationLog, MutationStatus};
use crate::modules::users::core::user::{PreferenceSet, UserRecord};
use crate::modules::users::core::user_cell::UserRecordCell;
use crate::shared::core::session::Session;
use crate::shared::infrastructure::document_store::{
    Collection, DocumentStore, DocumentStoreError, FieldUpdate, FieldUpdates,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const LIKES_FIELD: &str = "likes";
const NOTIFIED_USERS_FIELD: &str = "notifiedUsers";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("no user is signed in")]
    SignedOut,

    #[error("user {0} is not the signed-in user")]
    NotSessionUser(String),

    #[error("user record for {0} is not loaded yet")]
    UserNotLoaded(String),

    #[error("gig {0} does not exist")]
    UnknownGig(String),

    #[error("remote write timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggled {
    pub mutation_id: MutationId,
    pub liked: bool,
}

pub struct PreferenceCoordinator<TStore>
where
    TStore: DocumentStore + 'static,
{
    session: Session,
    store: Arc<TStore>,
    cell: Arc<UserRecordCell>,
    index: IndexReader,
    mutations: MutationLog,
    write_timeout: Duration,
}

impl<TStore> PreferenceCoordinator<TStore>
where
    TStore: DocumentStore + 'static,
{
    pub fn new(
        session: Session,
        store: Arc<TStore>,
        cell: Arc<UserRecordCell>,
        index: IndexReader,
        write_timeout: Duration,
    ) -> Self {
        Self {
            session,
            store,
            cell,
            index,
            mutations: MutationLog::new(),
            write_timeout,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cell(&self) -> &Arc<UserRecordCell> {
        &self.cell
    }

    /// Flip membership of `gig_id` in the liked set.
    pub async fn toggle_like(
        &self,
        user_id: &str,
        gig_id: &str,
    ) -> Result<LikeToggled, MutationError> {
        self.authorize(user_id)?;
        self.loaded(user_id)?;
        let liked = self
            .cell
            .toggle_membership(PreferenceSet::Liked, gig_id)
            .ok_or_else(|| MutationError::UserNotLoaded(user_id.to_string()))?;
        let was_liked = !liked;
        let mutation_id = self.mutations.begin().await;

        let update = if liked {
            FieldUpdate::union_one(gig_id)
        } else {
            FieldUpdate::remove_one(gig_id)
        };
        let result = self
            .write(
                Collection::Users,
                user_id,
                vec![(PreferenceSet::Liked.field().to_string(), update)],
            )
            .await;
        self.settle(mutation_id, result, || {
            self.cell
                .set_membership(PreferenceSet::Liked, gig_id, was_liked);
        })
        .await?;

        tracing::info!(%user_id, %gig_id, liked, %mutation_id, "like toggled");
        Ok(LikeToggled { mutation_id, liked })
    }

    /// Server-side `likes += 1`. Commutative, so no local tracking.
    pub async fn increment_recommend(&self, gig_id: &str) -> Result<(), MutationError> {
        self.write(
            Collection::Gigs,
            gig_id,
            vec![(LIKES_FIELD.to_string(), FieldUpdate::Increment(1))],
        )
        .await?;
        tracing::info!(%gig_id, "recommendation counted");
        Ok(())
    }

    /// Idempotent set-add into the recommended set.
    pub async fn add_recommended_gig(
        &self,
        user_id: &str,
        gig_id: &str,
    ) -> Result<MutationId, MutationError> {
        self.authorize(user_id)?;
        let mutation_id = self.mutations.begin().await;
        let previous = self
            .cell
            .set_membership(PreferenceSet::Recommended, gig_id, true);

        let result = self
            .write(
                Collection::Users,
                user_id,
                vec![(
                    PreferenceSet::Recommended.field().to_string(),
                    FieldUpdate::union_one(gig_id),
                )],
            )
            .await;
        self.settle(mutation_id, result, || {
            if previous == Some(false) {
                self.cell
                    .set_membership(PreferenceSet::Recommended, gig_id, false);
            }
        })
        .await?;
        Ok(mutation_id)
    }

    /// Recommend a gig once per signed-in user: record it in the user's recommended set and
    /// bump the gig's counter. Anonymous sessions only bump the counter.
    pub async fn recommend_gig(&self, gig_id: &str) -> Result<u64, MutationError> {
        if let Some(user_id) = self.session.user_id() {
            let already = self
                .cell
                .current()
                .is_some_and(|record| record.set(PreferenceSet::Recommended).contains(gig_id));
            if already {
                return self.recommendation_count(gig_id).await;
            }
            self.add_recommended_gig(user_id, gig_id).await?;
        }
        self.increment_recommend(gig_id).await?;
        self.recommendation_count(gig_id).await
    }

    /// Current `likes` counter of a gig, read from the backend.
    pub async fn recommendation_count(&self, gig_id: &str) -> Result<u64, MutationError> {
        let document = tokio::time::timeout(
            self.write_timeout,
            self.store.get(Collection::Gigs, gig_id),
        )
        .await
        .map_err(|_| self.timeout_error())??
        .ok_or_else(|| MutationError::UnknownGig(gig_id.to_string()))?;
        Ok(document
            .get(LIKES_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or_default())
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<MutationId, MutationError> {
        self.authorize(user_id)?;
        let mutation_id = self.mutations.begin().await;
        let previous = self.cell.set_names(first_name, last_name);

        let result = self
            .write(
                Collection::Users,
                user_id,
                vec![
                    ("firstName".to_string(), FieldUpdate::Set(first_name.into())),
                    ("lastName".to_string(), FieldUpdate::Set(last_name.into())),
                ],
            )
            .await;
        self.settle(mutation_id, result, || {
            if let Some((first, last)) = &previous {
                self.cell.set_names(first, last);
            }
        })
        .await?;
        tracing::info!(%user_id, %mutation_id, "profile updated");
        Ok(mutation_id)
    }

    pub async fn notify_me(&self, user_id: &str, gig_id: &str) -> Result<(), MutationError> {
        self.authorize(user_id)?;
        self.write(
            Collection::Gigs,
            gig_id,
            vec![(
                NOTIFIED_USERS_FIELD.to_string(),
                FieldUpdate::union_one(user_id),
            )],
        )
        .await
    }

    pub async fn stop_notifying(&self, user_id: &str, gig_id: &str) -> Result<(), MutationError> {
        self.authorize(user_id)?;
        self.write(
            Collection::Gigs,
            gig_id,
            vec![(
                NOTIFIED_USERS_FIELD.to_string(),
                FieldUpdate::remove_one(user_id),
            )],
        )
        .await
    }

    /// Liked gigs that still exist, in index order.
    pub fn saved_gigs(&self, user_id: &str) -> Result<Vec<GigRecord>, MutationError> {
        let record = self.loaded(user_id)?;
        Ok(self
            .index
            .snapshot()
            .iter()
            .filter(|gig| record.has_liked(&gig.id))
            .cloned()
            .collect())
    }

    pub async fn mutation_status(&self, mutation_id: MutationId) -> Option<MutationStatus> {
        self.mutations.status(mutation_id).await
    }

    pub async fn pending_mutations(&self) -> usize {
        self.mutations.pending_count().await
    }

    fn authorize(&self, user_id: &str) -> Result<(), MutationError> {
        match self.session.user_id() {
            None => Err(MutationError::SignedOut),
            Some(current) if current == user_id => Ok(()),
            Some(_) => Err(MutationError::NotSessionUser(user_id.to_string())),
        }
    }

    fn loaded(&self, user_id: &str) -> Result<UserRecord, MutationError> {
        self.cell
            .current()
            .filter(|record| record.id == user_id)
            .ok_or_else(|| MutationError::UserNotLoaded(user_id.to_string()))
    }

    fn timeout_error(&self) -> MutationError {
        MutationError::Timeout {
            timeout_ms: u64::try_from(self.write_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn write(
        &self,
        collection: Collection,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<(), MutationError> {
        tokio::time::timeout(self.write_timeout, self.store.update(collection, id, updates))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(MutationError::from)
    }

    async fn settle(
        &self,
        mutation_id: MutationId,
        result: Result<(), MutationError>,
        rollback: impl FnOnce(),
    ) -> Result<(), MutationError> {
        match result {
            Ok(()) => {
                self.mutations.confirm(mutation_id).await;
                Ok(())
            }
            Err(error) => {
                rollback();
                tracing::warn!(%mutation_id, %error, "remote write rejected; local change reverted");
                self.mutations.reject(mutation_id, error.to_string()).await;
                Err(error)
            }
        }
    }
}
