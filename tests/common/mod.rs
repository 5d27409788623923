#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use members_portal::{
    AppConfig, AppState, MemorySessionStore, SessionManager,
    config::MIN_BCRYPT_COST,
    models::{NewUser, Role, User},
    repository::{Repository, RepositoryError},
    session::{SessionError, SessionRecord, SessionStore},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use uuid::Uuid;

// --- IN-MEMORY REPOSITORY ---

/// Stand-in for the Postgres repository. Enforces the same unique-email rule
/// and can be switched into a failing mode to exercise the 500 paths.
#[derive(Default)]
pub struct MemoryRepository {
    users: Mutex<Vec<User>>,
    failing: AtomicBool,
    get_user_calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `get_user` lookups served so far.
    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }

    /// Inserts a user directly, hashing the password at the minimum cost.
    pub fn seed(&self, name: &str, email: &str, password: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: bcrypt::hash(password, MIN_BCRYPT_COST).unwrap(),
            role,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        self.check()?;
        Ok(self.users())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// --- IN-MEMORY SESSION STORE ---

/// `MemorySessionStore` with switches that make loads or saves fail the way
/// an unreachable database would.
#[derive(Clone, Default)]
pub struct TestSessionStore {
    records: MemorySessionStore,
    failing_loads: Arc<AtomicBool>,
    failing_saves: Arc<AtomicBool>,
}

impl TestSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.records.is_empty().await
    }

    pub fn set_failing_loads(&self, failing: bool) {
        self.failing_loads.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_saves(&self, failing: bool) {
        self.failing_saves.store(failing, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), SessionError> {
        if flag.load(Ordering::SeqCst) {
            Err(SessionError::Store(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for TestSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionRecord>, SessionError> {
        Self::check(&self.failing_loads)?;
        self.records.load(id).await
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        Self::check(&self.failing_saves)?;
        self.records.save(record).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), SessionError> {
        Self::check(&self.failing_saves)?;
        self.records.delete(id).await
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        self.records.delete_expired().await
    }
}

// --- TEST UTILITIES ---

pub struct TestState {
    pub state: AppState,
    pub repo: Arc<MemoryRepository>,
    pub sessions: TestSessionStore,
}

/// AppState wired to in-memory components.
pub fn test_state() -> TestState {
    test_state_with(AppConfig::default())
}

pub fn test_state_with(config: AppConfig) -> TestState {
    let repo = Arc::new(MemoryRepository::new());
    let sessions = TestSessionStore::new();
    let state = AppState {
        repo: repo.clone(),
        sessions: SessionManager::new(Arc::new(sessions.clone()), &config),
        config,
    };
    TestState {
        state,
        repo,
        sessions,
    }
}
