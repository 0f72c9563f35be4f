//! Ownership rules for saved tax returns.
//!
//! Identity is established by the caller (a verified token, a CLI flag);
//! this module only decides whether that identity may act on a record.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The identity a request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
}

impl Requester {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::User,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnAction {
    View,
    Update,
    Delete,
}

impl ReturnAction {
    /// Admins may view and delete any return but only owners may edit.
    fn admin_allowed(self) -> bool {
        matches!(self, Self::View | Self::Delete)
    }
}

impl fmt::Display for ReturnAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let verb = match self {
            Self::View => "view",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(verb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied: you can only {action} your own tax returns")]
pub struct AccessDenied {
    pub action: ReturnAction,
}

/// Checks whether `requester` may perform `action` on a record owned by
/// `owner_id`.
pub fn authorize(
    requester: &Requester,
    owner_id: &str,
    action: ReturnAction,
) -> Result<(), AccessDenied> {
    if requester.user_id == owner_id || (requester.is_admin() && action.admin_allowed()) {
        Ok(())
    } else {
        Err(AccessDenied { action })
    }
}
