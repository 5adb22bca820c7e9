//! Authentication and sessions
//!
//! Passwords are stored as `salt$sha256hex(salt + password)`.
//! Sessions live in memory and map an opaque token to a user id.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::models::{NewUser, User};
use crate::storage::FinanceStore;
use crate::Result;

/// Token issued on register/login, plus the user it belongs to
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub user: User,
}

pub struct AuthService {
    store: Arc<dyn FinanceStore>,
    sessions: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn FinanceStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(TrackerError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let display_name = match display_name.trim() {
            "" => username.to_string(),
            name => name.to_string(),
        };

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(password),
                display_name,
            })
            .await?;

        info!(user_id = user.id, "User registered");
        self.open_session(user).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let user = self
            .store
            .get_user_by_username(username.trim())
            .await?
            .filter(|u| verify_password(password, &u.password_hash))
            .ok_or_else(|| TrackerError::Unauthorized("Invalid username or password".to_string()))?;

        self.open_session(user).await
    }

    pub async fn logout(&self, token: Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&token);
    }

    /// Resolve a bearer token to its user id
    pub async fn authenticate(&self, token: &str) -> Result<i64> {
        let token = Uuid::parse_str(token.trim())
            .map_err(|_| TrackerError::Unauthorized("Malformed session token".to_string()))?;

        let sessions = self.sessions.read().await;
        sessions
            .get(&token)
            .copied()
            .ok_or_else(|| TrackerError::Unauthorized("Unknown or expired session".to_string()))
    }

    pub async fn current_user(&self, user_id: i64) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("User {}", user_id)))
    }

    /// Change display name and/or password
    pub async fn update_profile(
        &self,
        user_id: i64,
        display_name: Option<String>,
        password: Option<String>,
    ) -> Result<User> {
        let password_hash = match password {
            Some(p) if p.is_empty() => {
                return Err(TrackerError::Validation(
                    "Password must not be empty".to_string(),
                ))
            }
            Some(p) => Some(hash_password(&p)),
            None => None,
        };

        self.store
            .update_user(user_id, display_name, password_hash)
            .await
    }

    async fn open_session(&self, user: User) -> Result<Session> {
        let token = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(token, user.id);
        Ok(Session { token, user })
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryFinanceStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(InMemoryFinanceStore::new()))
    }

    #[test]
    fn test_password_hashing() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert_ne!(stored, hash_password("hunter2"));
        assert!(!verify_password("hunter2", "no-separator"));
    }

    #[tokio::test]
    async fn test_register_login_logout() {
        let auth = service();
        let registered = auth.register("minh", "secret", "").await.unwrap();
        assert_eq!(registered.user.display_name, "minh");

        let session = auth.login("minh", "secret").await.unwrap();
        let user_id = auth.authenticate(&session.token.to_string()).await.unwrap();
        assert_eq!(user_id, registered.user.id);

        auth.logout(session.token).await;
        assert!(matches!(
            auth.authenticate(&session.token.to_string()).await,
            Err(TrackerError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_credentials() {
        let auth = service();
        auth.register("minh", "secret", "Minh").await.unwrap();

        assert!(matches!(
            auth.login("minh", "wrong").await,
            Err(TrackerError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("nobody", "secret").await,
            Err(TrackerError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.authenticate("not-a-token").await,
            Err(TrackerError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.register(" ", "pw", "x").await,
            Err(TrackerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_changes_password() {
        let auth = service();
        let session = auth.register("thu", "old", "Thu").await.unwrap();

        let user = auth
            .update_profile(session.user.id, None, Some("new".to_string()))
            .await
            .unwrap();
        assert_eq!(user.display_name, "Thu");

        assert!(auth.login("thu", "old").await.is_err());
        assert!(auth.login("thu", "new").await.is_ok());
    }
}
