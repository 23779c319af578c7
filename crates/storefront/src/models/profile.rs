//! User profiles.

use serde::{Deserialize, Serialize};

use shopwave_core::{Role, UserId};

/// One row of `profiles`, keyed by the gateway's auth user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    /// The profile every new account starts with.
    #[must_use]
    pub fn new_user(id: UserId) -> Self {
        Self {
            id,
            role: Role::User,
        }
    }
}
