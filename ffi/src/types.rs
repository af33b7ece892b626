//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Outcomes are handed to C callbacks as a borrowed `FfiOutcome`: every
//! pointer inside it stays valid only until the callback returns, after
//! which the library frees it. Story payloads cross the boundary as JSON
//! text because their shape belongs to the backend, not to this library.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use story_core::{
    ErrorKind, LikeState, MainQueue, SessionStore, StoryClient, StoryError, StoryRecord,
};

/// Opaque handle to a `StoryClient` and the queue its callbacks land on.
/// C callers receive a pointer to this and pass it back into every FFI
/// function.
pub struct FfiStoryClient {
    pub(crate) inner: StoryClient,
    pub(crate) session: SessionStore,
    pub(crate) queue: Arc<MainQueue>,
}

/// Media kind of an upload.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiMediaKind {
    Image = 0,
    Video = 1,
}

impl From<FfiMediaKind> for story_core::MediaKind {
    fn from(kind: FfiMediaKind) -> Self {
        match kind {
            FfiMediaKind::Image => story_core::MediaKind::Image,
            FfiMediaKind::Video => story_core::MediaKind::Video,
        }
    }
}

/// Error codes carried in `FfiOutcome`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotAuthenticated = 1,
    FileNotFound = 2,
    Transport = 3,
    Decode = 4,
    Domain = 5,
    Local = 6,
    Panic = 7,
    NullArg = 8,
}

impl From<&StoryError> for FfiErrorCode {
    fn from(err: &StoryError) -> Self {
        match err {
            StoryError::NotAuthenticated => FfiErrorCode::NotAuthenticated,
            StoryError::FileNotFound => FfiErrorCode::FileNotFound,
            other => match other.kind() {
                ErrorKind::Transport => FfiErrorCode::Transport,
                ErrorKind::Decode => FfiErrorCode::Decode,
                ErrorKind::Domain => FfiErrorCode::Domain,
                ErrorKind::Precondition | ErrorKind::Local => FfiErrorCode::Local,
            },
        }
    }
}

/// Tells the callback which payload field of `FfiOutcome` is set.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    StoryJson = 1,
    StoryListJson = 2,
    Like = 3,
}

/// Like state exposed to C.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfiLikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

/// Outcome passed (borrowed) to a callback.
///
/// On success `error_code` is `Ok` and `error_message` is null. `json` is set
/// for `StoryJson` / `StoryListJson`, `like` for `Like`.
#[repr(C)]
pub struct FfiOutcome {
    pub error_code: FfiErrorCode,
    pub error_message: *const c_char,
    pub data_tag: FfiDataTag,
    pub json: *const c_char,
    pub like: FfiLikeState,
}

/// Callback receiving an outcome. `user_data` is passed back untouched.
pub type FfiCallback = extern "C" fn(user_data: *mut c_void, outcome: *const FfiOutcome);

/// Host-side persistence for the session token.
///
/// `save` receives a token borrowed for the duration of the call and returns
/// false on failure. `load` returns the stored token or null; the pointer
/// only needs to stay valid until the host's next store call. `clear`
/// removes the token. Callbacks may run on any thread.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiTokenStore {
    pub user_data: *mut c_void,
    pub save: Option<extern "C" fn(user_data: *mut c_void, token: *const c_char) -> bool>,
    pub load: Option<extern "C" fn(user_data: *mut c_void) -> *const c_char>,
    pub clear: Option<extern "C" fn(user_data: *mut c_void) -> bool>,
}

/// A C callback plus its context, movable onto background threads.
#[derive(Clone, Copy)]
pub(crate) struct CallbackTarget {
    pub callback: Option<FfiCallback>,
    pub user_data: *mut c_void,
}

// SAFETY: the host promises `user_data` may be used from the thread that
// drains the queue, which is where callbacks run.
unsafe impl Send for CallbackTarget {}
unsafe impl Sync for CallbackTarget {}

/// Owned payload that is lent to the callback as an `FfiOutcome`.
pub(crate) enum Payload {
    None,
    StoryJson(CString),
    StoryListJson(CString),
    Like(LikeState),
}

impl Payload {
    pub(crate) fn story(story: &StoryRecord) -> Self {
        Payload::StoryJson(json_cstring(serde_json::to_string(story)))
    }

    pub(crate) fn stories(stories: &[StoryRecord]) -> Self {
        Payload::StoryListJson(json_cstring(serde_json::to_string(stories)))
    }
}

fn json_cstring(json: Result<String, serde_json::Error>) -> CString {
    // Serialized JSON escapes control characters, so it never contains NUL.
    CString::new(json.unwrap_or_default()).unwrap_or_default()
}

/// Turn an owned message into a C string, replacing interior NULs.
pub(crate) fn message_cstring(message: &str) -> CString {
    CString::new(message.replace('\0', " ")).unwrap_or_default()
}

impl CallbackTarget {
    /// Invoke the callback with a success payload.
    pub(crate) fn succeed(&self, payload: Payload) {
        let Some(callback) = self.callback else {
            return;
        };
        let (data_tag, json, like) = match &payload {
            Payload::None => (FfiDataTag::None, std::ptr::null(), FfiLikeState::default()),
            Payload::StoryJson(s) => (FfiDataTag::StoryJson, s.as_ptr(), FfiLikeState::default()),
            Payload::StoryListJson(s) => (
                FfiDataTag::StoryListJson,
                s.as_ptr(),
                FfiLikeState::default(),
            ),
            Payload::Like(state) => (
                FfiDataTag::Like,
                std::ptr::null(),
                FfiLikeState {
                    is_liked: state.is_liked,
                    likes_count: state.likes_count,
                },
            ),
        };
        let outcome = FfiOutcome {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null(),
            data_tag,
            json,
            like,
        };
        callback(self.user_data, &outcome);
    }

    /// Invoke the callback with a failure.
    pub(crate) fn fail(&self, code: FfiErrorCode, message: &str) {
        let Some(callback) = self.callback else {
            return;
        };
        let message = message_cstring(message);
        let outcome = FfiOutcome {
            error_code: code,
            error_message: message.as_ptr(),
            data_tag: FfiDataTag::None,
            json: std::ptr::null(),
            like: FfiLikeState::default(),
        };
        callback(self.user_data, &outcome);
    }

    pub(crate) fn fail_with(&self, err: &StoryError) {
        self.fail(FfiErrorCode::from(err), &err.to_string());
    }

    /// Deliver a core outcome, mapping the success value with `payload`.
    pub(crate) fn deliver<T>(
        &self,
        outcome: story_core::Outcome<T>,
        payload: impl FnOnce(&T) -> Payload,
    ) {
        match outcome {
            Ok(value) => self.succeed(payload(&value)),
            Err(err) => self.fail_with(&err),
        }
    }
}
