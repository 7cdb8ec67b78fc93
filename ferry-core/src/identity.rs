use serde::{Deserialize, Serialize};

/// Caller identity as resolved by the web layer. The user id is an opaque
/// reference from the identity provider; bookings never require one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn customer(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: true,
        }
    }
}
