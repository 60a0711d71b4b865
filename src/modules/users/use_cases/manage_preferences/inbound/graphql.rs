use async_graphql::{Context, ID, Object, Result as GqlResult};

use crate::modules::gigs::use_cases::browse_gigs::inbound::graphql::GqlGig;
use crate::modules::users::use_cases::manage_preferences::coordinator::MutationError;
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlLikeToggled {
    pub mutation_id: ID,
    pub liked: bool,
}

fn session_user(state: &AppState) -> Result<String, MutationError> {
    state
        .session
        .user_id()
        .map(str::to_string)
        .ok_or(MutationError::SignedOut)
}

#[derive(Default)]
pub struct PreferencesQuery;

#[Object]
impl PreferencesQuery {
    async fn saved_gigs(&self, context: &Context<'_>) -> GqlResult<Vec<GqlGig>> {
        let state = context.data_unchecked::<AppState>();
        let user_id = session_user(state)?;
        let gigs = state.preferences.saved_gigs(&user_id)?;
        Ok(gigs.into_iter().map(Into::into).collect())
    }

    async fn recommendation_count(&self, context: &Context<'_>, gig_id: String) -> GqlResult<u64> {
        let state = context.data_unchecked::<AppState>();
        Ok(state.preferences.recommendation_count(&gig_id).await?)
    }
}

#[derive(Default)]
pub struct PreferencesMutation;

#[Object]
impl PreferencesMutation {
    async fn toggle_like(&self, context: &Context<'_>, gig_id: String) -> GqlResult<GqlLikeToggled> {
        let state = context.data_unchecked::<AppState>();
        let user_id = session_user(state)?;
        let toggled = state.preferences.toggle_like(&user_id, &gig_id).await?;
        Ok(GqlLikeToggled {
            mutation_id: ID(toggled.mutation_id.to_string()),
            liked: toggled.liked,
        })
    }

    /// Returns the gig's recommendation count after the write.
    async fn recommend_gig(&self, context: &Context<'_>, gig_id: String) -> GqlResult<u64> {
        let state = context.data_unchecked::<AppState>();
        Ok(state.preferences.recommend_gig(&gig_id).await?)
    }

    async fn set_gig_notification(
        &self,
        context: &Context<'_>,
        gig_id: String,
        enabled: bool,
    ) -> GqlResult<bool> {
        let state = context.data_unchecked::<AppState>();
        let user_id = session_user(state)?;
        if enabled {
            state.preferences.notify_me(&user_id, &gig_id).await?;
        } else {
            state.preferences.stop_notifying(&user_id, &gig_id).await?;
        }
        Ok(enabled)
    }

    async fn update_profile(
        &self,
        context: &Context<'_>,
        first_name: String,
        last_name: String,
    ) -> GqlResult<ID> {
        let state = context.data_unchecked::<AppState>();
        let user_id = session_user(state)?;
        let mutation_id = state
            .preferences
            .update_profile(&user_id, &first_name, &last_name)
            .await?;
        Ok(ID(mutation_id.to_string()))
    }
}
