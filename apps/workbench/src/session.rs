//! # Session
//!
//! The acting user. Entry and delivery commands stamp `full_name`; role
//! gates guard invoicing, payments and deletions.

use atelier_core::{CoreError, Role, User};

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session { user }
    }

    pub fn who(&self) -> &str {
        &self.user.full_name
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.user.role)
    }

    /// Fails with `FORBIDDEN` unless the user holds one of `roles`.
    pub fn require_role(&self, roles: &[Role], action: &str) -> Result<(), ApiError> {
        if self.has_role(roles) {
            return Ok(());
        }
        tracing::warn!(user = %self.user.id, action, "Permission denied");
        Err(CoreError::Forbidden {
            action: action.to_string(),
        }
        .into())
    }
}
