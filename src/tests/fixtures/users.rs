// Shared test fixture for user records.

use crate::modules::users::core::user::UserRecord;
use crate::shared::infrastructure::document_store::Fields;

const USER_JSON: &str = include_str!("json/user.json");

pub struct UserRecordBuilder {
    inner: UserRecord,
}

#[allow(dead_code)]
impl UserRecordBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let fields: Fields = serde_json::from_str(USER_JSON).unwrap();
        let id = id.into();
        Self {
            inner: UserRecord::from_document(&id, fields).unwrap(),
        }
    }

    pub fn first_name(mut self, v: impl Into<String>) -> Self {
        self.inner.first_name = v.into();
        self
    }

    pub fn last_name(mut self, v: impl Into<String>) -> Self {
        self.inner.last_name = v.into();
        self
    }

    pub fn liked<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.liked_gigs = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn recommended<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.recommended_gigs = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> UserRecord {
        self.inner
    }

    pub fn fields(self) -> Fields {
        match serde_json::to_value(&self.inner).unwrap() {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("user records serialize to objects"),
        }
    }
}
