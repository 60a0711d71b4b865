// Explicit session object for the signed-in user.
//
// Purpose
// - Carry the current user identifier into the components that act on behalf of a user,
//   instead of reading it from ambient global state.
//
// Boundaries
// - Authentication itself happens elsewhere; this only holds the opaque identifier.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_user(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}
