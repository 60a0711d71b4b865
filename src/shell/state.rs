use crate::modules::gigs::use_cases::browse_gigs::handler::BrowseGigsHandler;
use crate::modules::sync::use_cases::mirror_documents::manager::{
    SubscriptionError, SubscriptionManager,
};
use crate::modules::users::core::user_cell::UserRecordCell;
use crate::modules::users::use_cases::manage_preferences::coordinator::PreferenceCoordinator;
use crate::modules::users::use_cases::sync_profile::synchronizer::ProfileSynchronizer;
use crate::shared::core::session::Session;
use crate::shared::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use crate::shell::config::AppConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Session,
    pub subscriptions: Arc<SubscriptionManager<InMemoryDocumentStore>>,
    pub browse: Arc<BrowseGigsHandler>,
    pub preferences: Arc<PreferenceCoordinator<InMemoryDocumentStore>>,
    pub profile: Arc<ProfileSynchronizer<InMemoryDocumentStore>>,
}

impl AppState {
    /// Open the gig subscription and, for a signed-in session, the user subscription, then
    /// wire the use cases on top of them. Anything already opened is closed again when a
    /// later step fails.
    pub async fn connect(
        config: &AppConfig,
        store: Arc<InMemoryDocumentStore>,
    ) -> Result<Self, SubscriptionError> {
        let subscriptions = Arc::new(SubscriptionManager::new(
            store.clone(),
            config.retry,
            config.subscribe_timeout,
        ));
        match Self::wire(config, store, subscriptions.clone()).await {
            Ok(state) => Ok(state),
            Err(error) => {
                tracing::error!(%error, "connect failed; closing opened subscriptions");
                subscriptions.close_all().await;
                Err(error)
            }
        }
    }

    async fn wire(
        config: &AppConfig,
        store: Arc<InMemoryDocumentStore>,
        subscriptions: Arc<SubscriptionManager<InMemoryDocumentStore>>,
    ) -> Result<Self, SubscriptionError> {
        let session = config.session();
        subscriptions.subscribe_events().await?;

        let cell = match session.user_id() {
            Some(user_id) => subscriptions.subscribe_user(user_id).await?.1,
            None => Arc::new(UserRecordCell::new()),
        };
        let profile = Arc::new(ProfileSynchronizer::new(
            session.clone(),
            subscriptions.clone(),
        ));
        profile.start().await?;

        let browse = Arc::new(BrowseGigsHandler::new(
            subscriptions.index(),
            config.timezone,
            config.week_start,
        ));
        let preferences = Arc::new(PreferenceCoordinator::new(
            session.clone(),
            store,
            cell,
            subscriptions.index(),
            config.write_timeout,
        ));

        Ok(Self {
            session,
            subscriptions,
            browse,
            preferences,
            profile,
        })
    }

    /// End the session: stop profile sync and close every subscription.
    pub async fn shutdown(&self) {
        self.profile.stop().await;
        self.subscriptions.close_all().await;
    }
}
