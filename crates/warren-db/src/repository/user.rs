//! # User Repository
//!
//! Customer records. There is no password or session data here; the
//! storefront identifies a signed-in shopper by user id only.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use warren_core::{NewUser, User, UserRole};

const USER_COLUMNS: &str = "id, name, email, phone, address, role, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a customer.
    ///
    /// ## Returns
    /// * `Ok(User)` - the stored record
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn create(&self, user: &NewUser) -> DbResult<User> {
        self.create_with_role(user, UserRole::Customer).await
    }

    /// Inserts a user with an explicit role (seed data, admin bootstrap).
    pub async fn create_with_role(&self, user: &NewUser, role: UserRole) -> DbResult<User> {
        let now = Utc::now();
        let email = user.email.trim().to_lowercase();

        debug!(email = %email, role = ?role, "Creating user");

        let sql = format!(
            "INSERT INTO users (name, email, phone, address, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {USER_COLUMNS}"
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.name.trim())
            .bind(&email)
            .bind(user.phone.as_deref().map(str::trim))
            .bind(user.address.as_deref().map(str::trim))
            .bind(role)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                    field,
                    value: email.clone(),
                },
                other => other,
            })?;

        Ok(created)
    }

    /// Gets a user by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(User))` - found
    /// * `Ok(None)` - no such user
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Lists all users, newest first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id DESC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Changes a user's role.
    pub async fn update_role(&self, id: i64, role: UserRole) -> DbResult<User> {
        debug!(id, role = ?role, "Updating user role");

        let sql = format!(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Deletes a user.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - the user still owns orders or
    ///   loans; history is never orphaned
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }
}
