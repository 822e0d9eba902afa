//! User directory abstraction.
//!
//! The file engine never owns users. It looks them up through
//! [`UserDirectory`], which callers inject; [`SqlUserDirectory`] is the
//! implementation backed by the local `users` table.

use async_trait::async_trait;

use super::repository::UserRepository;
use super::user::User;
use super::Database;
use crate::Result;

/// Read-only lookup of user identity records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Get a user by ID, `None` if unknown.
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// List every user except `exclude_id`.
    async fn list_users(&self, exclude_id: i64) -> Result<Vec<User>>;
}

/// User directory stored in the sharebox database.
#[derive(Debug, Clone)]
pub struct SqlUserDirectory {
    db: Database,
}

impl SqlUserDirectory {
    /// Create a directory over the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for SqlUserDirectory {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        UserRepository::new(self.db.pool()).get_by_id(id).await
    }

    async fn list_users(&self, exclude_id: i64) -> Result<Vec<User>> {
        UserRepository::new(self.db.pool())
            .list_excluding(exclude_id)
            .await
    }
}
