// Seeded in-memory document stores for tests.

use crate::modules::gigs::core::gig::GigRecord;
use crate::modules::users::core::user::UserRecord;
use crate::shared::infrastructure::document_store::Fields;
use crate::shared::infrastructure::document_store::in_memory::{InMemoryDocumentStore, Seed};
use crate::tests::fixtures::gigs::to_fields;
use std::sync::Arc;

pub fn seeded_store(gigs: Vec<GigRecord>, users: Vec<UserRecord>) -> Arc<InMemoryDocumentStore> {
    let seed = Seed {
        gigs: gigs
            .iter()
            .map(|record| (record.id.clone(), to_fields(record)))
            .collect(),
        users: users
            .iter()
            .map(|record| {
                let fields: Fields = match serde_json::to_value(record).unwrap() {
                    serde_json::Value::Object(map) => map,
                    _ => unreachable!("user records serialize to objects"),
                };
                (record.id.clone(), fields)
            })
            .collect(),
    };
    Arc::new(InMemoryDocumentStore::from_seed(seed))
}
