use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::modules::gigs::use_cases::browse_gigs::inbound::graphql::BrowseGigsQuery;
use crate::modules::users::use_cases::manage_preferences::inbound::graphql::{
    PreferencesMutation, PreferencesQuery,
};
use crate::modules::users::use_cases::sync_profile::inbound::graphql::ProfileQuery;
pub use crate::shell::state::AppState;

#[derive(MergedObject, Default)]
pub struct QueryRoot(BrowseGigsQuery, PreferencesQuery, ProfileQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(PreferencesMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(state)
        .finish()
}
