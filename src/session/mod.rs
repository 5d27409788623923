//! Cookie-backed server-side sessions.
//!
//! A browser carries only a signed cookie holding a random session id. The
//! session payload (authenticated user, flash message) lives in a
//! `SessionStore`, encrypted with `SessionCipher`, and expires after the
//! configured time-to-live.
//!
//! `session_middleware` resolves the session before the handler runs and
//! commits it afterwards:
//! - destroyed sessions are deleted and their cookie removed;
//! - brand-new sessions that nobody touched are never persisted;
//! - everything else is re-saved with a refreshed expiry.

pub mod crypto;
pub mod store;

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_cookies::{Cookie, Cookies, Key, SignedCookies, cookie::SameSite};
use uuid::Uuid;

use crate::{config::AppConfig, models::User};

pub use crypto::SessionCipher;
pub use store::{
    MemorySessionStore, PostgresSessionStore, SessionRecord, SessionStore, SessionStoreState,
};

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("session payload could not be encrypted or decrypted")]
    Crypto,
    #[error("session payload is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SessionUser
///
/// The identity an authenticated session refers to. The role is not stored:
/// it is re-read from the user store on every admin check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// SessionData
///
/// The decrypted session payload. A session is authenticated exactly when
/// `user` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub flash: Option<String>,
}

#[derive(Debug, Default)]
struct SessionInner {
    // None until the session is first persisted.
    id: Option<Uuid>,
    data: SessionData,
    modified: bool,
    destroyed: bool,
    // Issue a fresh id on commit (after login, against fixation).
    rotate: bool,
}

/// Session
///
/// Per-request handle to the current browser session. Cheap to clone; all
/// clones share state, so changes made by extractors and handlers are seen
/// by the middleware when it commits.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// A fresh, unsaved session.
    pub fn new() -> Self {
        Self::default()
    }

    fn restored(id: Uuid, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id: Some(id),
                data,
                ..SessionInner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.lock().id
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.lock().data.user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().data.user.is_some()
    }

    /// Marks the session as logged in for `user` and clears any pending
    /// flash. The session id is rotated when the session is committed.
    pub fn authenticate(&self, user: SessionUser) {
        let mut inner = self.lock();
        inner.data.user = Some(user);
        inner.data.flash = None;
        inner.rotate = true;
        inner.modified = true;
    }

    /// Drops the user reference but keeps the session (and its flash).
    pub fn clear_user(&self) {
        let mut inner = self.lock();
        if inner.data.user.take().is_some() {
            inner.modified = true;
        }
    }

    pub fn set_flash(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.data.flash = Some(message.into());
        inner.modified = true;
    }

    /// Returns the pending flash message and clears it.
    pub fn take_flash(&self) -> Option<String> {
        let mut inner = self.lock();
        let flash = inner.data.flash.take();
        if flash.is_some() {
            inner.modified = true;
        }
        flash
    }

    /// Ends the session. Its record and cookie are removed on commit.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.data = SessionData::default();
        inner.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn data(&self) -> SessionData {
        self.lock().data.clone()
    }
}

/// Session Extractor
///
/// Pulls the handle inserted by `session_middleware`. Failing here means the
/// router was assembled without the session layer.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "session layer is not installed",
        ))
    }
}

/// CommitOutcome
///
/// What the cookie jar must do after a session has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was stored and the cookie is left alone.
    Untouched,
    /// The session was saved under this id; (re)issue the cookie.
    Saved(Uuid),
    /// The session was destroyed; remove the cookie.
    Destroyed,
}

/// SessionManager
///
/// Owns the store, the payload cipher and the cookie signing key. Shared
/// through the application state.
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStoreState,
    cipher: SessionCipher,
    key: Key,
    ttl: TimeDelta,
    secure_cookie: bool,
}

impl SessionManager {
    pub fn new(store: SessionStoreState, config: &AppConfig) -> Self {
        let ttl_secs = i64::try_from(config.session_ttl.as_secs()).unwrap_or(i64::MAX);

        Self {
            store,
            cipher: SessionCipher::new(&config.session_store_secret),
            // Key::from needs 64 bytes of material; SHA-512 supplies exactly that.
            key: Key::from(Sha512::digest(config.session_cookie_secret.as_bytes()).as_slice()),
            ttl: TimeDelta::try_seconds(ttl_secs).unwrap_or(TimeDelta::MAX),
            secure_cookie: config.env == crate::config::Env::Production,
        }
    }

    pub fn store(&self) -> &SessionStoreState {
        &self.store
    }

    /// Loads and decrypts a stored session. Expired or unknown ids yield `None`.
    pub async fn load(&self, id: Uuid) -> Result<Option<Session>, SessionError> {
        let Some(record) = self.store.load(id).await? else {
            return Ok(None);
        };

        let plaintext = self.cipher.decrypt(&record.data)?;
        let data: SessionData = serde_json::from_slice(&plaintext)?;
        Ok(Some(Session::restored(record.id, data)))
    }

    /// Writes the session back to the store according to its state.
    pub async fn persist(&self, session: &Session) -> Result<CommitOutcome, SessionError> {
        let (current_id, data, modified, destroyed, rotate) = {
            let inner = session.lock();
            (
                inner.id,
                inner.data.clone(),
                inner.modified,
                inner.destroyed,
                inner.rotate,
            )
        };

        if destroyed {
            if let Some(id) = current_id {
                self.store.delete(id).await?;
            }
            return Ok(CommitOutcome::Destroyed);
        }

        if current_id.is_none() && !modified {
            return Ok(CommitOutcome::Untouched);
        }

        let id = match current_id {
            Some(old) if rotate => {
                self.store.delete(old).await?;
                Uuid::new_v4()
            }
            Some(existing) => existing,
            None => Uuid::new_v4(),
        };

        let sealed = self.cipher.encrypt(&serde_json::to_vec(&data)?)?;
        self.store
            .save(&SessionRecord {
                id,
                data: sealed,
                expires_at: Utc::now() + self.ttl,
            })
            .await?;

        {
            let mut inner = session.lock();
            inner.id = Some(id);
            inner.modified = false;
            inner.rotate = false;
        }

        Ok(CommitOutcome::Saved(id))
    }

    async fn resolve(&self, cookies: &SignedCookies<'_>) -> Session {
        let Some(cookie) = cookies.get(SESSION_COOKIE) else {
            return Session::new();
        };
        // A cookie that passed signature checks but carries no UUID is ignored.
        let Ok(id) = Uuid::parse_str(cookie.value()) else {
            return Session::new();
        };

        match self.load(id).await {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(),
            Err(e) => {
                tracing::warn!("Failed to load session, starting a new one: {}", e);
                Session::new()
            }
        }
    }

    fn session_cookie(&self, id: Uuid) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .build()
    }
}

/// session_middleware
///
/// Resolves the session from the signed cookie, exposes it to extractors via
/// request extensions, runs the handler, then commits. Store failures on
/// either side are logged and the request carries on.
pub async fn session_middleware(
    State(manager): State<SessionManager>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let signed = cookies.signed(&manager.key);
    let session = manager.resolve(&signed).await;
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    match manager.persist(&session).await {
        Ok(CommitOutcome::Saved(id)) => signed.add(manager.session_cookie(id)),
        Ok(CommitOutcome::Destroyed) => {
            signed.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
        }
        Ok(CommitOutcome::Untouched) => {}
        Err(e) => tracing::error!("Failed to commit session: {}", e),
    }

    response
}

/// spawn_expiry_sweeper
///
/// Periodically deletes expired session records. Loads already ignore them;
/// this only keeps the table from growing.
pub fn spawn_expiry_sweeper(store: SessionStoreState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match store.delete_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Removed {} expired sessions", removed),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (SessionManager, MemorySessionStore) {
        let store = MemorySessionStore::new();
        let manager = SessionManager::new(Arc::new(store.clone()), &AppConfig::default());
        (manager, store)
    }

    fn alice() -> SessionUser {
        SessionUser {
            id: Uuid::from_u128(1),
            name: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn untouched_new_session_is_not_saved() {
        let (manager, store) = manager();
        let outcome = manager.persist(&Session::new()).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Untouched);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn saved_session_loads_back_decrypted() {
        let (manager, store) = manager();
        let session = Session::new();
        session.authenticate(alice());
        session.set_flash("welcome");

        let CommitOutcome::Saved(id) = manager.persist(&session).await.unwrap() else {
            panic!("expected the session to be saved");
        };
        assert_eq!(store.len().await, 1);

        let stored = store.load(id).await.unwrap().unwrap();
        assert!(!stored.data.windows(5).any(|w| w == b"alice"));

        let loaded = manager.load(id).await.unwrap().unwrap();
        assert_eq!(loaded.user(), Some(alice()));
        assert_eq!(loaded.take_flash().as_deref(), Some("welcome"));
        assert_eq!(loaded.take_flash(), None);
    }

    #[tokio::test]
    async fn authenticate_rotates_existing_id() {
        let (manager, store) = manager();
        let session = Session::new();
        session.set_flash("Please login");
        let CommitOutcome::Saved(first) = manager.persist(&session).await.unwrap() else {
            panic!("expected save");
        };

        let session = manager.load(first).await.unwrap().unwrap();
        session.authenticate(alice());
        let CommitOutcome::Saved(second) = manager.persist(&session).await.unwrap() else {
            panic!("expected save");
        };

        assert_ne!(first, second);
        assert!(manager.load(first).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn destroy_removes_record() {
        let (manager, store) = manager();
        let session = Session::new();
        session.authenticate(alice());
        let CommitOutcome::Saved(id) = manager.persist(&session).await.unwrap() else {
            panic!("expected save");
        };

        let session = manager.load(id).await.unwrap().unwrap();
        session.destroy();
        assert!(!session.is_authenticated());
        assert_eq!(
            manager.persist(&session).await.unwrap(),
            CommitOutcome::Destroyed
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_records_are_invisible_and_swept() {
        let (manager, store) = manager();
        let id = Uuid::new_v4();
        store
            .save(&SessionRecord {
                id,
                data: vec![0; 32],
                expires_at: Utc::now() - TimeDelta::seconds(1),
            })
            .await
            .unwrap();

        assert!(manager.load(id).await.unwrap().is_none());
        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn records_sealed_with_another_secret_are_rejected() {
        let store = MemorySessionStore::new();
        let writer = SessionManager::new(Arc::new(store.clone()), &AppConfig::default());
        let reader = SessionManager::new(
            Arc::new(store.clone()),
            &AppConfig {
                session_store_secret: "a-different-secret".to_string(),
                ..AppConfig::default()
            },
        );

        let session = Session::new();
        session.authenticate(alice());
        let CommitOutcome::Saved(id) = writer.persist(&session).await.unwrap() else {
            panic!("expected save");
        };

        assert!(matches!(reader.load(id).await, Err(SessionError::Crypto)));
    }

    #[test]
    fn clear_user_keeps_flash() {
        let session = Session::new();
        session.authenticate(alice());
        session.set_flash("Please login");
        session.clear_user();

        assert!(!session.is_authenticated());
        assert_eq!(session.data().flash.as_deref(), Some("Please login"));
    }
}
