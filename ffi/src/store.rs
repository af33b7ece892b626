//! Session token storage delegated to the host through C callbacks.

use std::ffi::CStr;

use story_core::{SecureStore, StoryError};

use crate::types::{message_cstring, FfiTokenStore};

/// `SecureStore` that forwards every call to the host's `FfiTokenStore`.
pub(crate) struct HostSecureStore {
    hooks: FfiTokenStore,
}

// SAFETY: hosts registering a token store promise its callbacks and
// `user_data` may be used from any thread; `save` runs on the background
// pool when authentication succeeds.
unsafe impl Send for HostSecureStore {}
unsafe impl Sync for HostSecureStore {}

impl HostSecureStore {
    pub(crate) fn new(hooks: FfiTokenStore) -> Self {
        Self { hooks }
    }
}

impl SecureStore for HostSecureStore {
    fn load_token(&self) -> Result<Option<String>, StoryError> {
        let Some(load) = self.hooks.load else {
            return Ok(None);
        };
        let ptr = load(self.hooks.user_data);
        if ptr.is_null() {
            return Ok(None);
        }
        // Borrowed from the host until its next store call; copy it now.
        let token = unsafe { CStr::from_ptr(ptr) }
            .to_str()
            .map_err(|_| StoryError::Storage("stored token is not UTF-8".to_string()))?;
        Ok(Some(token.to_string()).filter(|t| !t.is_empty()))
    }

    fn save_token(&self, token: &str) -> Result<(), StoryError> {
        let Some(save) = self.hooks.save else {
            return Err(StoryError::Storage("host store has no save hook".to_string()));
        };
        let token = message_cstring(token);
        if save(self.hooks.user_data, token.as_ptr()) {
            Ok(())
        } else {
            Err(StoryError::Storage("host rejected token".to_string()))
        }
    }

    fn clear_token(&self) -> Result<(), StoryError> {
        match self.hooks.clear {
            Some(clear) if !clear(self.hooks.user_data) => {
                Err(StoryError::Storage("host failed to clear token".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{c_void, CString};
    use std::os::raw::c_char;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Vault {
        token: Mutex<Option<CString>>,
        reject: bool,
    }

    extern "C" fn save(user_data: *mut c_void, token: *const c_char) -> bool {
        let vault = unsafe { &*(user_data as *const Vault) };
        let token = unsafe { CStr::from_ptr(token) }.to_owned();
        *vault.token.lock().unwrap() = Some(token);
        !vault.reject
    }

    extern "C" fn load(user_data: *mut c_void) -> *const c_char {
        let vault = unsafe { &*(user_data as *const Vault) };
        vault
            .token
            .lock()
            .unwrap()
            .as_ref()
            .map_or(std::ptr::null(), |t| t.as_ptr())
    }

    extern "C" fn clear(user_data: *mut c_void) -> bool {
        let vault = unsafe { &*(user_data as *const Vault) };
        *vault.token.lock().unwrap() = None;
        true
    }

    fn store(vault: &Vault) -> HostSecureStore {
        HostSecureStore::new(FfiTokenStore {
            user_data: vault as *const Vault as *mut c_void,
            save: Some(save),
            load: Some(load),
            clear: Some(clear),
        })
    }

    #[test]
    fn save_load_clear_round_trip_through_host() {
        let vault = Vault::default();
        let store = store(&vault);
        assert_eq!(store.load_token().unwrap(), None);
        store.save_token("tok").unwrap();
        assert_eq!(store.load_token().unwrap().as_deref(), Some("tok"));
        store.clear_token().unwrap();
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn host_refusal_is_a_storage_error() {
        let vault = Vault {
            reject: true,
            ..Vault::default()
        };
        let err = store(&vault).save_token("tok").unwrap_err();
        assert!(matches!(err, StoryError::Storage(_)));
    }

    #[test]
    fn missing_hooks_behave_as_empty_store() {
        let store = HostSecureStore::new(FfiTokenStore {
            user_data: std::ptr::null_mut(),
            save: None,
            load: None,
            clear: None,
        });
        assert_eq!(store.load_token().unwrap(), None);
        assert!(store.save_token("t").is_err());
        assert!(store.clear_token().is_ok());
    }
}
