//! Access roles stored on user profiles.

use serde::{Deserialize, Serialize};

/// Access tier of a user.
///
/// New profiles always start as [`Role::User`]. Promotion to
/// [`Role::Admin`] happens out of band (see `sw-cli role set`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Customer: browses the catalog and manages a cart.
    #[default]
    User,
    /// Administrator: manages catalog items.
    Admin,
}

impl Role {
    /// Whether this role grants access to the admin console.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The wire representation stored in the `profiles.role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected user or admin)")]
pub struct RoleParseError(pub String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_user() {
        assert_eq!(Role::default(), Role::User);
        assert!(!Role::User.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_parse_and_display_agree() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Admin).expect("serialize"),
            "\"admin\""
        );
        let role: Role = serde_json::from_str("\"user\"").expect("deserialize");
        assert_eq!(role, Role::User);
    }
}
