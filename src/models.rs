use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field of a user, stored as the Postgres enum `user_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// User
///
/// A row of the `users` table. Created at signup and never deleted; only
/// `role` changes afterwards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    // Short alphanumeric display name.
    pub name: String,
    // Unique login identifier.
    pub email: String,
    // bcrypt hash; never rendered or serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// NewUser
///
/// Insert payload for `Repository::create_user`. The password has already
/// been hashed by the time this is built.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

// --- Request Payloads (Form Bodies) ---

/// SignupForm
///
/// `POST /signup` body. Missing fields deserialize to empty strings so they
/// fail validation with a flash message instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// LoginForm
///
/// `POST /login` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// RoleChangeForm
///
/// `POST /promote` and `POST /demote` body: the target user's id. Kept as
/// raw text; a value that is not a UUID is treated as an unknown user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChangeForm {
    #[serde(default)]
    pub id: String,
}
