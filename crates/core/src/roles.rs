//! Roles and the per-operation session context.
//!
//! Identity is passed explicitly to every tracker operation instead of being
//! read from ambient client state.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_TECHNICIAN: &str = "technician";

/// Role of the person performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => ROLE_MANAGER,
            Role::Technician => ROLE_TECHNICIAN,
        }
    }
}

/// Who is acting, scoped to a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn manager(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Manager,
        }
    }

    pub fn technician(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Technician,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Fail with `Forbidden` unless the session belongs to a manager.
    pub fn require_manager(&self, action: &str) -> Result<(), CoreError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Only managers may {action}"
            )))
        }
    }
}
