//! C-ABI wrapper around `story-core`.
//!
//! # Overview
//! Exposes the story client through `extern "C"` functions so the host
//! application can drive authentication and story operations without linking
//! against Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Operations run on the client's background pool. Their callbacks are
//!   queued and run when the host calls `story_client_poll` from its main
//!   thread.
//! - Callbacks receive a borrowed `FfiOutcome`. Nothing in it outlives the
//!   callback; hosts copy what they need.
//! - Strings returned directly (`story_client_token`) are owned by the caller
//!   and released with `story_free_string`.
//! - Hosts that register an `FfiTokenStore` get every token change pushed
//!   to their own secure storage.

mod store;
pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use story_core::{
    AuthParams, ClientConfig, MainQueue, MemorySecureStore, SecureStore, SessionStore, StoryClient,
    UploadRequest, Visibility,
};
use tracing::warn;

use store::HostSecureStore;

use types::*;

/// Borrow a C string as `&str`. Null or invalid UTF-8 yields `None`.
fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Like `c_str`, but null maps to an absent optional field.
fn optional_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    c_str(ptr).filter(|s| !s.is_empty())
}

fn client_ref<'a>(client: *const FfiStoryClient) -> Option<&'a FfiStoryClient> {
    if client.is_null() {
        None
    } else {
        Some(unsafe { &*client })
    }
}

/// `catch_unwind` over a body that touches client handles, with a fallback
/// value when it panics.
fn shielded<R>(fallback: R, body: impl FnOnce() -> R) -> R {
    catch_unwind(AssertUnwindSafe(body)).unwrap_or(fallback)
}

/// Run `body`, reporting a panic to the callback instead of unwinding into C.
fn guarded(target: CallbackTarget, op: &str, body: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(body)).is_err() {
        warn!(op, "panic caught at ffi boundary");
        let message = format!("{op} aborted unexpectedly");
        shielded((), || target.fail(FfiErrorCode::Panic, &message));
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

fn build_client(base_url: *const c_char, store: Arc<dyn SecureStore>) -> *mut FfiStoryClient {
    let Some(url) = c_str(base_url) else {
        return std::ptr::null_mut();
    };
    let queue = Arc::new(MainQueue::new());
    let session = SessionStore::new(store);
    if let Err(err) = session.restore() {
        warn!(error = %err, "stored session not restored");
    }
    match StoryClient::builder(ClientConfig::new(url))
        .session(session.clone())
        .dispatcher(queue.clone())
        .build()
    {
        Ok(inner) => Box::into_raw(Box::new(FfiStoryClient {
            inner,
            session,
            queue,
        })),
        Err(err) => {
            warn!(error = %err, "story client rejected");
            std::ptr::null_mut()
        }
    }
}

/// Create a client bound to `base_url` whose session lives in process
/// memory only.
///
/// Returns null if `base_url` is null, not an http(s) URL, or if an internal
/// panic occurs. Free with `story_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_new(base_url: *const c_char) -> *mut FfiStoryClient {
    shielded(std::ptr::null_mut(), || {
        build_client(base_url, Arc::new(MemorySecureStore::new()))
    })
}

/// Create a client whose session token is persisted through `store`.
///
/// A token already in `store` is restored immediately. Every successful
/// authentication calls `store.save`; sign-out calls `store.clear`.
/// Returns null under the same conditions as `story_client_new`.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_new_with_store(
    base_url: *const c_char,
    store: FfiTokenStore,
) -> *mut FfiStoryClient {
    shielded(std::ptr::null_mut(), || {
        build_client(base_url, Arc::new(HostSecureStore::new(store)))
    })
}

/// Free a client created by `story_client_new`. Safe to call with null.
/// Callbacks still queued are dropped without running.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_free(client: *mut FfiStoryClient) {
    if !client.is_null() {
        shielded((), || drop(unsafe { Box::from_raw(client) }));
    }
}

/// Seed the session with a token the host kept from an earlier run.
///
/// Returns false if either argument is null, the token is empty, or the
/// session could not be updated.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_restore_token(
    client: *const FfiStoryClient,
    token: *const c_char,
) -> bool {
    shielded(false, || {
        let (Some(client), Some(token)) = (client_ref(client), c_str(token)) else {
            return false;
        };
        client.session.set(token).is_ok()
    })
}

/// Current session token for the host to persist, or null when signed out.
/// Free with `story_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_token(client: *const FfiStoryClient) -> *mut c_char {
    shielded(std::ptr::null_mut(), || {
        let Some(client) = client_ref(client) else {
            return std::ptr::null_mut();
        };
        match client.session.get().token {
            Some(token) => message_cstring(&token).into_raw(),
            None => std::ptr::null_mut(),
        }
    })
}

/// Drop the session token. Returns false on null or storage failure.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_sign_out(client: *const FfiStoryClient) -> bool {
    shielded(false, || match client_ref(client) {
        Some(client) => client.inner.sign_out().is_ok(),
        None => false,
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn story_is_authenticated(client: *const FfiStoryClient) -> bool {
    shielded(false, || client_ref(client).is_some_and(|c| c.inner.is_authenticated()))
}

/// Run every queued callback on the calling thread. Returns how many ran.
#[unsafe(no_mangle)]
pub extern "C" fn story_client_poll(client: *const FfiStoryClient) -> usize {
    shielded(0, || client_ref(client).map_or(0, |c| c.queue.run_pending()))
}

/// Install the log subscriber. `filter` may be null for the default
/// (`story_core=info`). Returns true if this call installed it.
#[unsafe(no_mangle)]
pub extern "C" fn story_init_logging(filter: *const c_char) -> bool {
    shielded(false, || {
        let filter = optional_str(filter).unwrap_or("story_core=info,story_ffi=info");
        story_core::init_logging(filter).unwrap_or(false)
    })
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn story_free_string(s: *mut c_char) {
    if !s.is_null() {
        shielded((), || drop(unsafe { CString::from_raw(s) }));
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register with the backend. `username`, `first_name` and `last_name` may
/// be null. Delivers `FfiDataTag::None` on success.
#[unsafe(no_mangle)]
pub extern "C" fn story_authenticate(
    client: *const FfiStoryClient,
    telegram_id: *const c_char,
    username: *const c_char,
    first_name: *const c_char,
    last_name: *const c_char,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) {
    let target = CallbackTarget { callback, user_data };
    guarded(target, "authenticate", || {
        let (Some(client), Some(telegram_id)) = (client_ref(client), c_str(telegram_id)) else {
            return target.fail(FfiErrorCode::NullArg, "client and telegram_id are required");
        };
        let mut params = AuthParams::new(telegram_id);
        if let Some(username) = optional_str(username) {
            params = params.with_username(username);
        }
        params.first_name = optional_str(first_name).map(str::to_string);
        params.last_name = optional_str(last_name).map(str::to_string);
        client
            .inner
            .authenticate(params, move |outcome| target.deliver(outcome, |_| Payload::None));
    });
}

/// Upload a story from `file_path`. `caption`, `background_color` and
/// `visibility` may be null for their defaults. Delivers `StoryJson`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn story_upload_story(
    client: *const FfiStoryClient,
    file_path: *const c_char,
    media_kind: FfiMediaKind,
    caption: *const c_char,
    background_color: *const c_char,
    duration_seconds: u32,
    visibility: *const c_char,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) {
    let target = CallbackTarget { callback, user_data };
    guarded(target, "upload_story", || {
        let (Some(client), Some(file_path)) = (client_ref(client), c_str(file_path)) else {
            return target.fail(FfiErrorCode::NullArg, "client and file_path are required");
        };
        let mut upload =
            UploadRequest::new(file_path, media_kind.into()).with_duration(duration_seconds);
        if let Some(caption) = c_str(caption) {
            upload = upload.with_caption(caption);
        }
        if let Some(color) = optional_str(background_color) {
            upload = upload.with_background_color(color);
        }
        if let Some(visibility) = optional_str(visibility) {
            upload = upload.with_visibility(Visibility::from(visibility));
        }
        client
            .inner
            .upload_story(upload, move |outcome| target.deliver(outcome, Payload::story));
    });
}

/// List stories visible to the caller. Delivers `StoryListJson`.
#[unsafe(no_mangle)]
pub extern "C" fn story_fetch_stories(
    client: *const FfiStoryClient,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) {
    let target = CallbackTarget { callback, user_data };
    guarded(target, "fetch_stories", || {
        let Some(client) = client_ref(client) else {
            return target.fail(FfiErrorCode::NullArg, "client is required");
        };
        client.inner.fetch_stories(move |outcome| {
            target.deliver(outcome, |stories| Payload::stories(stories))
        });
    });
}

/// Record a view. Fire-and-forget: no callback, failures are only logged.
#[unsafe(no_mangle)]
pub extern "C" fn story_record_view(client: *const FfiStoryClient, story_id: *const c_char) {
    shielded((), || {
        if let (Some(client), Some(story_id)) = (client_ref(client), c_str(story_id)) {
            client.inner.record_view(story_id);
        }
    });
}

/// Toggle the caller's like. Delivers `Like`.
#[unsafe(no_mangle)]
pub extern "C" fn story_toggle_like(
    client: *const FfiStoryClient,
    story_id: *const c_char,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) {
    let target = CallbackTarget { callback, user_data };
    guarded(target, "toggle_like", || {
        let (Some(client), Some(story_id)) = (client_ref(client), c_str(story_id)) else {
            return target.fail(FfiErrorCode::NullArg, "client and story_id are required");
        };
        client.inner.toggle_like(story_id, move |outcome| {
            target.deliver(outcome, |state| Payload::Like(*state))
        });
    });
}

/// Delete a story owned by the caller. Delivers `FfiDataTag::None`.
#[unsafe(no_mangle)]
pub extern "C" fn story_delete_story(
    client: *const FfiStoryClient,
    story_id: *const c_char,
    callback: Option<FfiCallback>,
    user_data: *mut c_void,
) {
    let target = CallbackTarget { callback, user_data };
    guarded(target, "delete_story", || {
        let (Some(client), Some(story_id)) = (client_ref(client), c_str(story_id)) else {
            return target.fail(FfiErrorCode::NullArg, "client and story_id are required");
        };
        client
            .inner
            .delete_story(story_id, move |outcome| target.deliver(outcome, |_| Payload::None));
    });
}
