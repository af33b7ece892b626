//! Authentication session shared by every client operation.
//!
//! # Design
//! There is one `SessionStore` per client, injected rather than global.
//! Reads take a snapshot once at the start of an operation. Writes hold the
//! write lock across "persist, then update memory", so concurrent `set`
//! calls are serialized: the last completed write wins and no reader ever
//! observes a token that differs from the persisted one mid-update.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::StoryError;
use crate::secure_store::SecureStore;

/// Snapshot of the authentication state.
///
/// `authenticated` is true exactly when `token` is a non-empty value that was
/// issued by the backend (or restored from a token it issued earlier).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub authenticated: bool,
}

impl AuthSession {
    /// Token to send with an authenticated request, if the session allows it.
    pub fn bearer(&self) -> Option<&str> {
        match self.token.as_deref() {
            Some(token) if self.authenticated && !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

/// Owner of the process' `AuthSession`.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<AuthSession>>,
    secure_store: Arc<dyn SecureStore>,
}

impl SessionStore {
    /// Empty, unauthenticated session backed by `secure_store`.
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(AuthSession::default())),
            secure_store,
        }
    }

    /// Reload a token persisted by an earlier run. Returns whether the
    /// session is authenticated afterwards.
    pub fn restore(&self) -> Result<bool, StoryError> {
        let mut state = self.write()?;
        match self.secure_store.load_token()? {
            Some(token) if !token.is_empty() => {
                *state = AuthSession {
                    token: Some(token),
                    authenticated: true,
                };
                info!("restored persisted session");
                Ok(true)
            }
            _ => {
                debug!("no persisted session to restore");
                Ok(state.authenticated)
            }
        }
    }

    pub fn get(&self) -> AuthSession {
        self.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().bearer().is_some()
    }

    /// Persist `token`, then mark the session authenticated with it.
    ///
    /// If persisting fails the in-memory session is left untouched.
    pub fn set(&self, token: &str) -> Result<(), StoryError> {
        if token.is_empty() {
            return Err(StoryError::InvalidArgument("empty session token".to_string()));
        }
        let mut state = self.write()?;
        self.secure_store.save_token(token)?;
        *state = AuthSession {
            token: Some(token.to_string()),
            authenticated: true,
        };
        debug!("session token updated");
        Ok(())
    }

    /// Forget the session in memory and in durable storage.
    pub fn clear(&self) -> Result<(), StoryError> {
        let mut state = self.write()?;
        self.secure_store.clear_token()?;
        *state = AuthSession::default();
        info!("session cleared");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, AuthSession>, StoryError> {
        self.state
            .read()
            .map_err(|_| StoryError::Storage("session lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, AuthSession>, StoryError> {
        self.state
            .write()
            .map_err(|_| StoryError::Storage("session lock poisoned".to_string()))
    }
}
