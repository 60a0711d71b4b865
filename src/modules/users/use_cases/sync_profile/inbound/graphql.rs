use async_graphql::{Context, Object};

use crate::shell::state::AppState;

#[derive(Default)]
pub struct ProfileQuery;

#[Object]
impl ProfileQuery {
    /// First name of the signed-in user; empty when signed out or not yet loaded.
    async fn display_name(&self, context: &Context<'_>) -> String {
        let state = context.data_unchecked::<AppState>();
        state.profile.current_display_name()
    }
}
