//! Session context - the current token and user profile
//!
//! The store keeps an in-memory copy that guard evaluations read without I/O,
//! and writes through to a [`SessionStorage`] on login and logout. Token and
//! user are always set and cleared together.

mod storage;

pub use storage::{
    MemorySessionStorage, SessionStorage, SqliteSessionStorage, StoredSlots, TOKEN_KEY, USER_KEY,
};

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::errors::{AppError, AppResult};
use crate::jwt;
use crate::models::{Role, User};
use crate::utils::utc_now;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    token: String,
    user: User,
}

/// Immutable view of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user: User) -> Self {
        Self {
            credentials: Some(Credentials {
                token: token.into(),
                user,
            }),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|user| user.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Shared session context, injected into the guard host and the API client.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    current: RwLock<Session>,
    // Held across the storage write and the in-memory swap.
    writer: Mutex<()>,
}

impl SessionStore {
    /// Load the persisted session.
    ///
    /// A half-written pair, an unreadable user slot, or a JWT whose `exp` has
    /// passed is cleared from storage and yields an anonymous session.
    pub async fn open(storage: Arc<dyn SessionStorage>) -> AppResult<Self> {
        let slots = storage.load().await?;

        let session = match (slots.token, slots.user) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) if token_expired(&token) => {
                    tracing::info!(user_id = %user.user_id, "stored session token expired, clearing");
                    storage.clear().await?;
                    Session::anonymous()
                }
                Ok(user) => Session::authenticated(token, user),
                Err(err) => {
                    tracing::warn!(error = %err, "stored session user is unreadable, clearing");
                    storage.clear().await?;
                    Session::anonymous()
                }
            },
            (None, None) => Session::anonymous(),
            _ => {
                tracing::warn!("stored session has only one of token/user, clearing");
                storage.clear().await?;
                Session::anonymous()
            }
        };

        Ok(Self {
            storage,
            current: RwLock::new(session),
            writer: Mutex::new(()),
        })
    }

    pub async fn in_memory() -> AppResult<Self> {
        Self::open(Arc::new(MemorySessionStorage::new())).await
    }

    pub fn snapshot(&self) -> Session {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token().map(str::to_string)
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    /// Token for an authenticated request, or `Unauthenticated`.
    pub fn require_token(&self) -> AppResult<String> {
        self.token()
            .ok_or_else(|| AppError::unauthenticated("no session token"))
    }

    pub async fn login(&self, token: impl Into<String>, user: User) -> AppResult<()> {
        let token = token.into();
        if token.is_empty() {
            return Err(AppError::bad_request("session token must not be empty"));
        }

        let user_json = serde_json::to_string(&user)?;
        let _writer = self.writer.lock().await;
        self.storage.save(&token, &user_json).await?;

        tracing::info!(user_id = %user.user_id, role = %user.role, "session started");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            Session::authenticated(token, user);
        Ok(())
    }

    pub async fn logout(&self) -> AppResult<()> {
        let _writer = self.writer.lock().await;
        self.storage.clear().await?;

        let previous = std::mem::take(&mut *self.current.write().unwrap_or_else(PoisonError::into_inner));
        if let Some(user) = previous.user() {
            tracing::info!(user_id = %user.user_id, "session cleared");
        }
        Ok(())
    }

    /// Alias of [`SessionStore::logout`] for callers clearing a stale session.
    pub async fn clear(&self) -> AppResult<()> {
        self.logout().await
    }
}

fn token_expired(token: &str) -> bool {
    match jwt::peek_claims(token) {
        Ok(claims) => claims.is_expired_at(utc_now()),
        // Opaque tokens carry no expiry of their own.
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> User {
        User::new("PI0824.0001", Role::Ppic).with_username("BAYU")
    }

    #[tokio::test]
    async fn login_sets_token_and_user_together() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = SessionStore::open(storage.clone()).await.unwrap();
        assert!(!store.is_authenticated());

        store.login("opaque-token", planner()).await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.token(), Some("opaque-token"));
        assert_eq!(session.role(), Some(Role::Ppic));

        let slots = storage.slots();
        assert_eq!(slots.token.as_deref(), Some("opaque-token"));
        assert!(slots.user.unwrap().contains("\"role\":\"PPIC\""));
    }

    #[tokio::test]
    async fn logout_clears_both_slots() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = SessionStore::open(storage.clone()).await.unwrap();
        store.login("opaque-token", planner()).await.unwrap();

        store.logout().await.unwrap();

        assert_eq!(store.snapshot(), Session::anonymous());
        assert_eq!(storage.slots(), StoredSlots::default());
        assert!(matches!(
            store.require_token(),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn half_written_session_is_discarded_on_open() {
        let storage = Arc::new(MemorySessionStorage::with_slots(StoredSlots {
            token: Some("dangling".to_string()),
            user: None,
        }));

        let store = SessionStore::open(storage.clone()).await.unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(storage.slots(), StoredSlots::default());
    }

    #[tokio::test]
    async fn unreadable_user_is_discarded_on_open() {
        let storage = Arc::new(MemorySessionStorage::with_slots(StoredSlots {
            token: Some("t".to_string()),
            user: Some("{\"user_id\":\"x\",\"role\":\"Operator\"}".to_string()),
        }));

        let store = SessionStore::open(storage.clone()).await.unwrap();

        assert!(store.current_user().is_none());
        assert_eq!(storage.slots(), StoredSlots::default());
    }

    /// Yields after every write so other tasks run between persisting and swapping.
    struct YieldingStorage(Arc<MemorySessionStorage>);

    #[async_trait::async_trait]
    impl SessionStorage for YieldingStorage {
        async fn load(&self) -> AppResult<StoredSlots> {
            self.0.load().await
        }

        async fn save(&self, token: &str, user: &str) -> AppResult<()> {
            self.0.save(token, user).await?;
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn clear(&self) -> AppResult<()> {
            self.0.clear().await?;
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_logins_and_logouts_keep_memory_and_storage_in_step() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = Arc::new(
            SessionStore::open(Arc::new(YieldingStorage(storage.clone())))
                .await
                .unwrap(),
        );

        let mut tasks = Vec::new();
        for round in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                if round % 3 == 0 {
                    store.logout().await
                } else {
                    store.login(format!("token-{}", round), planner()).await
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = store.snapshot();
        let slots = storage.slots();
        assert_eq!(session.token(), slots.token.as_deref());
        assert_eq!(session.is_authenticated(), slots.user.is_some());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let store = SessionStore::in_memory().await.unwrap();
        let result = store.login("", planner()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!store.is_authenticated());
    }
}
