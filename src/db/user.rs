//! User model for sharebox.
//!
//! Users belong to the directory; the file engine only reads them.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user identity record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address (unique).
    pub email: String,
    /// Job title.
    pub designation: Option<String>,
    /// Office or branch.
    pub branch: Option<String>,
    /// When the user was registered.
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Job title.
    pub designation: Option<String>,
    /// Office or branch.
    pub branch: Option<String>,
}

impl NewUser {
    /// Create a new NewUser.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            designation: None,
            branch: None,
        }
    }

    /// Set the designation.
    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = Some(designation.into());
        self
    }

    /// Set the branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}
