use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of portal roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Moderator,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Editor, Role::Moderator, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }

    /// Static permission set granted to this role.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &[
                "create_news",
                "edit_news",
                "delete_news",
                "moderate",
                "manage_users",
                "manage_categories",
            ],
            Role::Editor => &["create_news", "edit_news", "manage_categories"],
            Role::Moderator => &["moderate", "edit_news"],
            Role::User => &["read_news", "comment"],
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Permissions for a role name. Unrecognised names get the `user` set.
pub fn permissions_for(role: &str) -> Vec<String> {
    role.parse::<Role>()
        .unwrap_or_default()
        .permissions()
        .iter()
        .map(|p| p.to_string())
        .collect()
}
