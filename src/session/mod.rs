//! Session/Auth Manager: at most one signed-in identity, persisted across restarts.

pub mod error;
pub mod storage;

pub use error::*;
pub use storage::{SessionStorage, STORAGE_KEY};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::{Credentials, Registration, Role, User, UserPatch};
use crate::remote::{bounded, RemoteStore};

/// Credential used for accounts created through a social provider.
pub const SOCIAL_PLACEHOLDER_PASSWORD: &str = "social-login-placeholder-pass";

/// Identity provider behind a social sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialProvider::Google => f.write_str("Google"),
            SocialProvider::Facebook => f.write_str("Facebook"),
        }
    }
}

/// The persisted session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

impl AuthState {
    fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
        }
    }

    fn current(&self) -> Option<&User> {
        self.user.as_ref().filter(|_| self.is_authenticated)
    }
}

pub struct SessionManager {
    state: RwLock<AuthState>,
    remote: Arc<dyn RemoteStore>,
    storage: SessionStorage,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(remote: Arc<dyn RemoteStore>, storage: SessionStorage, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(AuthState::default()),
            remote,
            storage,
            timeout,
        }
    }

    /// Re-establishes a persisted session without contacting the store.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Option<User> {
        let restored = self.storage.load().await?;
        let user = restored.current().cloned()?;
        info!(user_id = %user.id, role = ?user.role, "Session restored");
        *self.state.write().await = restored;
        Some(user)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.current().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.current().is_some()
    }

    pub async fn require_user(&self) -> Result<User, SessionError> {
        self.current_user().await.ok_or(SessionError::NotAuthenticated)
    }

    pub async fn require_admin(&self) -> Result<User, SessionError> {
        let user = self.require_user().await?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(SessionError::Forbidden(format!("{} is not an admin", user.email)))
        }
    }

    async fn establish(&self, user: User) -> User {
        let state = AuthState::signed_in(user.clone());
        if let Err(e) = self.storage.save(&state).await {
            warn!(error = %e, "Session not persisted");
        }
        *self.state.write().await = state;
        info!(user_id = %user.id, role = ?user.role, "Signed in");
        user
    }

    /// Signs in. With a social provider and no password the placeholder credential is used,
    /// and an unknown identity is registered as a customer and signed in exactly once more.
    #[instrument(skip(self, password), fields(social = ?social))]
    pub async fn login(
        &self,
        email: &str,
        role: Role,
        password: Option<String>,
        social: Option<SocialProvider>,
    ) -> Result<User, SessionError> {
        let password = password.or_else(|| social.map(|_| SOCIAL_PLACEHOLDER_PASSWORD.to_string()));
        let credentials = Credentials {
            email: email.to_string(),
            password,
            role,
        };

        match bounded(self.timeout, self.remote.login(&credentials)).await {
            Ok(user) => Ok(self.establish(user).await),
            Err(e) if e.is_user_not_found() && social.is_some() => {
                info!("Unknown social identity, registering");
                let name = email.split_once('@').map_or(email, |(local, _)| local);
                let registration = Registration {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: SOCIAL_PLACEHOLDER_PASSWORD.to_string(),
                    role: Role::Customer,
                };
                bounded(self.timeout, self.remote.create_user(&registration)).await?;

                let retry = Credentials {
                    password: Some(SOCIAL_PLACEHOLDER_PASSWORD.to_string()),
                    ..credentials
                };
                let user = bounded(self.timeout, self.remote.login(&retry)).await?;
                Ok(self.establish(user).await)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                Err(e.into())
            }
        }
    }

    /// Creates a customer account, then signs it in.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, SessionError> {
        let registration = Registration {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Customer,
        };
        bounded(self.timeout, self.remote.create_user(&registration)).await?;
        self.login(email, Role::Customer, Some(password.to_string()), None).await
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SessionError> {
        *self.state.write().await = AuthState::default();
        self.storage.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Applies `patch` to the signed-in user when it is `user_id`. Returns the updated user.
    pub async fn patch_if_current(&self, user_id: &str, patch: &UserPatch) -> Result<Option<User>, SessionError> {
        let updated = {
            let mut state = self.state.write().await;
            match state.user.as_mut().filter(|user| user.id == user_id) {
                Some(user) => {
                    user.apply_patch(patch);
                    user.clone()
                }
                None => return Ok(None),
            }
        };
        self.persist().await?;
        Ok(Some(updated))
    }

    /// Replaces the signed-in user's record, e.g. after a profile batched with an order.
    pub async fn replace_current(&self, user: User) -> Result<(), SessionError> {
        {
            let mut state = self.state.write().await;
            if state.current().map(|current| current.id.as_str()) != Some(user.id.as_str()) {
                return Ok(());
            }
            state.user = Some(user);
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), SessionError> {
        let state = self.state.read().await.clone();
        self.storage.save(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::Collection;
    use crate::remote::{InMemoryRemoteStore, RemoteError};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn manager(remote: &Arc<InMemoryRemoteStore>, dir: &std::path::Path) -> SessionManager {
        SessionManager::new(remote.clone(), SessionStorage::in_dir(dir), TIMEOUT)
    }

    #[tokio::test]
    async fn test_social_login_registers_unknown_identity_once() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let dir = tempfile::tempdir().unwrap();
        let session = manager(&remote, dir.path());

        let user = session
            .login("neo@example.com", Role::Customer, None, Some(SocialProvider::Google))
            .await
            .unwrap();
        assert_eq!(user.name, "neo");
        assert_eq!(user.role, Role::Customer);
        assert_eq!(remote.count(Collection::Users).await, 1);

        session.logout().await.unwrap();
        let again = session
            .login("neo@example.com", Role::Customer, None, Some(SocialProvider::Google))
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(remote.count(Collection::Users).await, 1);
    }

    #[tokio::test]
    async fn test_password_login_does_not_register() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let dir = tempfile::tempdir().unwrap();
        let session = manager(&remote, dir.path());

        let result = session
            .login("ghost@example.com", Role::Customer, Some("pw".into()), None)
            .await;
        assert!(matches!(result, Err(SessionError::Remote(ref e)) if e.is_user_not_found()));
        assert_eq!(remote.count(Collection::Users).await, 0);
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_session_survives_restart_without_network() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let dir = tempfile::tempdir().unwrap();

        let user = manager(&remote, dir.path())
            .register("Ana", "ana@example.com", "secret")
            .await
            .unwrap();
        assert!(dir.path().join("luxe_auth.json").exists());

        let calls = remote.call_count();
        let restored = manager(&remote, dir.path()).restore().await;
        assert_eq!(restored.map(|u| u.id), Some(user.id));
        assert_eq!(remote.call_count(), calls);
    }

    #[tokio::test]
    async fn test_logout_clears_persisted_record() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let dir = tempfile::tempdir().unwrap();
        let session = manager(&remote, dir.path());

        session.register("Ana", "ana@example.com", "secret").await.unwrap();
        session.logout().await.unwrap();

        assert!(session.current_user().await.is_none());
        assert!(!dir.path().join("luxe_auth.json").exists());
        assert!(manager(&remote, dir.path()).restore().await.is_none());
    }

    #[tokio::test]
    async fn test_customer_is_not_admin() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let session = SessionManager::new(remote.clone(), SessionStorage::ephemeral(), TIMEOUT);

        assert_eq!(session.require_admin().await, Err(SessionError::NotAuthenticated));
        session.register("Ana", "ana@example.com", "secret").await.unwrap();
        assert!(matches!(session.require_admin().await, Err(SessionError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_reported() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        remote.set_offline(true).await;
        let session = SessionManager::new(remote.clone(), SessionStorage::ephemeral(), TIMEOUT);

        let result = session
            .login("a@b.com", Role::Customer, None, Some(SocialProvider::Facebook))
            .await;
        assert!(matches!(result, Err(SessionError::Remote(RemoteError::Unreachable(_)))));
    }
}
