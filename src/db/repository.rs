//! User repository for sharebox.

use chrono::Utc;
use sqlx::SqlitePool;

use super::user::{NewUser, User};
use crate::{Result, ShareboxError};

const USER_COLUMNS: &str = "id, name, email, designation, branch, created_at";

/// Repository for user records.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Returns the created user with the assigned ID.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, designation, branch, created_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.designation)
        .bind(&new_user.branch)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ShareboxError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// List all users except `exclude_id`, ordered by name.
    pub async fn list_excluding(&self, exclude_id: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id <> ? ORDER BY name, id"
        ))
        .bind(exclude_id)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Delete a user by ID.
    ///
    /// Returns true if a user was deleted.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("Alice", "alice@example.com").with_branch("HQ"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.branch.as_deref(), Some("HQ"));
        assert!(user.designation.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("Alice", "alice@example.com"))
            .await
            .unwrap();
        let result = repo.create(&NewUser::new("Other", "alice@example.com")).await;

        assert!(matches!(result, Err(ShareboxError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_and_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let created = repo
            .create(&NewUser::new("Bob", "bob@example.com"))
            .await
            .unwrap();

        let found = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created.clone()));

        let by_email = repo.get_by_email("BOB@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));

        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_excluding() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let carol = repo
            .create(&NewUser::new("Carol", "carol@example.com"))
            .await
            .unwrap();
        repo.create(&NewUser::new("Alice", "alice@example.com"))
            .await
            .unwrap();
        repo.create(&NewUser::new("Bob", "bob@example.com"))
            .await
            .unwrap();

        let others = repo.list_excluding(carol.id).await.unwrap();
        let names: Vec<_> = others.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("Dave", "dave@example.com"))
            .await
            .unwrap();

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }
}
