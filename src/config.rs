use std::{env, path::PathBuf, time::Duration};

use thiserror::Error;

/// Fallback secrets used outside production. They are public, so any
/// deployment that reaches real users must set its own.
const LOCAL_STORE_SECRET: &str = "local-session-store-secret-do-not-use-in-prod";
const LOCAL_COOKIE_SECRET: &str = "local-session-cookie-secret-do-not-use-in-prod";

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SESSION_TTL_SECS: u64 = 60;
const DEFAULT_BCRYPT_COST: u32 = 12;

/// Work-factor bounds accepted by bcrypt.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable
/// configuration. The server refuses to start on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded
/// and pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls secret fallbacks, log format and cookie flags.
    pub env: Env,
    pub port: u16,
    // Database credentials; combined by `db_url`.
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_name: String,
    // Encrypts session payloads at rest.
    pub session_store_secret: String,
    // Signs the session cookie.
    pub session_cookie_secret: String,
    pub session_ttl: Duration,
    pub bcrypt_cost: u32,
    // A signup with this email is created with the admin role.
    pub bootstrap_admin_email: Option<String>,
    pub static_dir: PathBuf,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a non-panicking AppConfig for test setup, without touching
    /// the process environment. The bcrypt cost is the minimum so password
    /// hashing stays cheap in tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: DEFAULT_PORT,
            db_user: "postgres".to_string(),
            db_password: "password".to_string(),
            db_host: "localhost:5432".to_string(),
            db_name: "members_test".to_string(),
            session_store_secret: LOCAL_STORE_SECRET.to_string(),
            session_cookie_secret: LOCAL_COOKIE_SECRET.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            bcrypt_cost: MIN_BCRYPT_COST,
            bootstrap_admin_email: None,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables.
    ///
    /// In `production` the database credentials and both session secrets are
    /// mandatory; in `local` they fall back to development values so the app
    /// runs against a stock Docker Postgres.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let required = |name: &'static str, local: &str| -> Result<String, ConfigError> {
            match (env::var(name), env) {
                (Ok(value), _) => Ok(value),
                (Err(_), Env::Production) => Err(ConfigError::Missing(name)),
                (Err(_), Env::Local) => Ok(local.to_string()),
            }
        };

        Ok(Self {
            env,
            port: parse_var("PORT", DEFAULT_PORT)?,
            db_user: required("DB_USER", "postgres")?,
            db_password: required("DB_PASSWORD", "password")?,
            db_host: required("DB_HOST", "localhost:5432")?,
            db_name: required("DB_NAME", "members")?,
            session_store_secret: required("SESSION_STORE_SECRET", LOCAL_STORE_SECRET)?,
            session_cookie_secret: required("SESSION_COOKIE_SECRET", LOCAL_COOKIE_SECRET)?,
            session_ttl: parse_session_ttl()?,
            bcrypt_cost: parse_bcrypt_cost()?,
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .filter(|email| !email.is_empty()),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
        })
    }

    /// The Postgres connection string built from the individual credentials.
    pub fn db_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_name
        )
    }

    /// Same as `db_url` with the password masked, for logging.
    pub fn redacted_db_url(&self) -> String {
        format!(
            "postgres://{}:***@{}/{}",
            self.db_user, self.db_host, self.db_name
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_session_ttl() -> Result<Duration, ConfigError> {
    let secs = parse_var("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
    // A zero TTL would expire every session as it is saved.
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name: "SESSION_TTL_SECS",
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bcrypt_cost() -> Result<u32, ConfigError> {
    let cost = parse_var("BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(ConfigError::Invalid {
            name: "BCRYPT_COST",
            value: cost.to_string(),
        });
    }
    Ok(cost)
}
