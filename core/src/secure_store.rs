//! Durable storage for the session token.
//!
//! The client never persists the token itself; it hands it to a
//! `SecureStore` supplied by the host (Keychain, Keystore, a test double).

use std::sync::Mutex;

use crate::error::StoryError;

/// Platform secure storage for the bearer token.
///
/// Implementations must never log token values.
pub trait SecureStore: Send + Sync {
    /// Previously saved token, `None` when nothing is stored.
    fn load_token(&self) -> Result<Option<String>, StoryError>;

    /// Persist `token`, replacing any previous value.
    fn save_token(&self, token: &str) -> Result<(), StoryError>;

    /// Remove the stored token. Removing a missing token succeeds.
    fn clear_token(&self) -> Result<(), StoryError>;
}

/// Process-local store. Survives nothing beyond the process; used as the
/// default and in tests.
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    token: Mutex<Option<String>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token, as if saved by an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, StoryError> {
        self.token
            .lock()
            .map_err(|_| StoryError::Storage("memory store poisoned".to_string()))
    }
}

impl SecureStore for MemorySecureStore {
    fn load_token(&self) -> Result<Option<String>, StoryError> {
        Ok(self.slot()?.clone())
    }

    fn save_token(&self, token: &str) -> Result<(), StoryError> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), StoryError> {
        *self.slot()? = None;
        Ok(())
    }
}

#[cfg(feature = "keyring")]
pub use keyring_store::KeyringSecureStore;

#[cfg(feature = "keyring")]
mod keyring_store {
    use keyring::Entry;
    use tracing::debug;

    use super::SecureStore;
    use crate::error::StoryError;

    const ACCOUNT: &str = "session-token";

    /// OS keychain backed store (macOS Keychain, Windows Credential Manager,
    /// Secret Service on Linux).
    pub struct KeyringSecureStore {
        service_name: String,
    }

    impl KeyringSecureStore {
        pub fn new() -> Self {
            Self::with_service_name("custom-story-backend")
        }

        pub fn with_service_name(service_name: impl Into<String>) -> Self {
            Self {
                service_name: service_name.into(),
            }
        }

        fn entry(&self) -> Result<Entry, StoryError> {
            Entry::new(&self.service_name, ACCOUNT).map_err(map_keyring_error)
        }
    }

    impl Default for KeyringSecureStore {
        fn default() -> Self {
            Self::new()
        }
    }

    fn map_keyring_error(e: keyring::Error) -> StoryError {
        StoryError::Storage(format!("keyring error: {e}"))
    }

    impl SecureStore for KeyringSecureStore {
        fn load_token(&self) -> Result<Option<String>, StoryError> {
            match self.entry()?.get_password() {
                Ok(token) => Ok(Some(token)),
                Err(keyring::Error::NoEntry) => {
                    debug!(service = %self.service_name, "no stored session token");
                    Ok(None)
                }
                Err(e) => Err(map_keyring_error(e)),
            }
        }

        fn save_token(&self, token: &str) -> Result<(), StoryError> {
            self.entry()?.set_password(token).map_err(map_keyring_error)?;
            debug!(service = %self.service_name, "stored session token in keyring");
            Ok(())
        }

        fn clear_token(&self) -> Result<(), StoryError> {
            match self.entry()?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(map_keyring_error(e)),
            }
        }
    }
}
