use crate::models::{NewUser, Role, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Persistence failures surfaced to the handlers. `DuplicateEmail` is the
/// only one handlers recover from; everything else becomes a 500 page.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a user with this email already exists")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// The abstract contract for all user persistence. Handlers only see this
/// trait, so tests can swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Signup / Login ---
    // Fails with `DuplicateEmail` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    // --- Admin ---
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;
    // Single-row update; returns false when no user has this id.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of `Repository`, backed by the `users` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Inserts a user with a fresh v4 id. The unique index on `email` turns a
    /// second signup with the same address into `DuplicateEmail`.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    RepositoryError::DuplicateEmail
                }
                other => {
                    tracing::error!("create_user error: {:?}", other);
                    RepositoryError::Database(other)
                }
            })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("find_user_by_email error: {:?}", e);
                e.into()
            })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("get_user error: {:?}", e);
                e.into()
            })
    }

    /// list_users
    ///
    /// Every user, oldest first, for the admin table.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");

        sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("list_users error: {:?}", e);
                e.into()
            })
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("set_role error: {:?}", e);
                RepositoryError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
