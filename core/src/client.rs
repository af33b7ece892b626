//! Callback-style orchestrator for the story backend.
//!
//! # Design
//! `StoryClient` is the single entry point the application uses. Every
//! operation has the same shape:
//!
//! 1. Read the session once. Authenticated operations fail immediately with
//!    `NotAuthenticated` when there is no token, invoking the callback on the
//!    calling thread and making no network call.
//! 2. Hand the rest to the background `Executor` and return.
//! 3. In the background: build the request, execute it on the `Transport`,
//!    decode the envelope.
//! 4. Route the outcome through the `Dispatcher` so the callback runs on the
//!    application's primary context.
//!
//! Each callback runs exactly once. `record_view` is the only operation
//! without a callback; its failures are logged and dropped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, MainQueue};
use crate::error::StoryError;
use crate::executor::Executor;
use crate::http::{HttpRequest, HttpResponse};
use crate::request::StoryRequests;
use crate::response;
use crate::secure_store::{MemorySecureStore, SecureStore};
use crate::session::{AuthSession, SessionStore};
use crate::transport::{Transport, UreqTransport};
use crate::types::{AuthParams, LikeState, Outcome, StoryRecord, UploadRequest};

/// State shared with background units. Holds no executor so a unit never
/// ends up owning the pool it runs on.
struct Inner {
    requests: StoryRequests,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    dispatcher: Arc<dyn Dispatcher>,
}

/// Client for the custom story backend. Cheap to clone; clones share the
/// session, transport and background pool.
#[derive(Clone)]
pub struct StoryClient {
    inner: Arc<Inner>,
    executor: Arc<Executor>,
}

/// Assembles a `StoryClient` from its collaborators.
pub struct StoryClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    session: Option<SessionStore>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
}

impl StoryClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn secure_store(mut self, secure_store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(secure_store);
        self
    }

    /// Share an existing session instead of creating one from the secure store.
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<StoryClient, StoryError> {
        self.config.validate()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(&self.config)));
        let session = match self.session {
            Some(session) => session,
            None => SessionStore::new(
                self.secure_store
                    .unwrap_or_else(|| Arc::new(MemorySecureStore::new())),
            ),
        };
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(MainQueue::new()));
        let executor = Executor::new(self.config.max_background_tasks)?;

        info!(base_url = %self.config.base_url, "story client ready");
        Ok(StoryClient {
            inner: Arc::new(Inner {
                requests: StoryRequests::new(&self.config.base_url),
                transport,
                session,
                dispatcher,
            }),
            executor: Arc::new(executor),
        })
    }
}

impl StoryClient {
    pub fn builder(config: ClientConfig) -> StoryClientBuilder {
        StoryClientBuilder {
            config,
            transport: None,
            secure_store: None,
            session: None,
            dispatcher: None,
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> AuthSession {
        self.inner.session.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// Reload a token persisted by a previous run.
    pub fn restore_session(&self) -> Result<bool, StoryError> {
        self.inner.session.restore()
    }

    pub fn sign_out(&self) -> Result<(), StoryError> {
        self.inner.session.clear()
    }

    /// Register with the backend and store the issued token.
    pub fn authenticate<F>(&self, params: AuthParams, callback: F)
    where
        F: FnOnce(Outcome<()>) + Send + 'static,
    {
        let inner = self.inner.clone();
        self.run_background("authenticate", callback, move || {
            let request = inner.requests.build_authenticate(&params)?;
            let response = inner.send("authenticate", request)?;
            let token = response::parse_authenticate(&response)?;
            inner.session.set(&token)?;
            Ok(())
        });
    }

    /// Upload a local image or video as a new story.
    pub fn upload_story<F>(&self, upload: UploadRequest, callback: F)
    where
        F: FnOnce(Outcome<StoryRecord>) + Send + 'static,
    {
        let Some(token) = self.inner.bearer("upload_story") else {
            return callback(Err(StoryError::NotAuthenticated));
        };
        let inner = self.inner.clone();
        self.run_background("upload_story", callback, move || {
            let size = match std::fs::metadata(&upload.file_path) {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => return Err(StoryError::FileNotFound),
            };
            debug!(path = %upload.file_path.display(), size, "uploading story");
            let request = inner.requests.build_upload_story(&token, &upload);
            let response = inner.send("upload_story", request)?;
            response::parse_upload_story(&response)
        });
    }

    /// List the stories currently visible to this user, in backend order.
    pub fn fetch_stories<F>(&self, callback: F)
    where
        F: FnOnce(Outcome<Vec<StoryRecord>>) + Send + 'static,
    {
        let Some(token) = self.inner.bearer("fetch_stories") else {
            return callback(Err(StoryError::NotAuthenticated));
        };
        let inner = self.inner.clone();
        self.run_background("fetch_stories", callback, move || {
            let request = inner.requests.build_fetch_stories(&token);
            let response = inner.send("fetch_stories", request)?;
            let stories = response::parse_fetch_stories(&response)?;
            debug!(count = stories.len(), "fetched stories");
            Ok(stories)
        });
    }

    /// Tell the backend a story was seen. Fire-and-forget: no callback, and
    /// nothing happens without a session.
    pub fn record_view(&self, story_id: &str) {
        let Some(token) = self.inner.session.get().bearer().map(str::to_string) else {
            debug!(story_id, "skipping view record without session");
            return;
        };
        let inner = self.inner.clone();
        let story_id = story_id.to_string();
        self.executor.spawn(move || {
            let result = inner
                .requests
                .build_record_view(&token, &story_id)
                .and_then(|request| inner.send("record_view", request))
                .and_then(|response| response::parse_record_view(&response));
            match result {
                Ok(()) => debug!(story_id = %story_id, "view recorded"),
                Err(e) => warn!(story_id = %story_id, error = %e, "record view failed"),
            }
        });
    }

    /// Flip this user's like on a story and report the new state.
    pub fn toggle_like<F>(&self, story_id: &str, callback: F)
    where
        F: FnOnce(Outcome<LikeState>) + Send + 'static,
    {
        let Some(token) = self.inner.bearer("toggle_like") else {
            return callback(Err(StoryError::NotAuthenticated));
        };
        let inner = self.inner.clone();
        let story_id = story_id.to_string();
        self.run_background("toggle_like", callback, move || {
            let request = inner.requests.build_toggle_like(&token, &story_id)?;
            let response = inner.send("toggle_like", request)?;
            let state = response::parse_toggle_like(&response)?;
            debug!(story_id = %story_id, is_liked = state.is_liked, "like toggled");
            Ok(state)
        });
    }

    /// Delete one of this user's stories.
    pub fn delete_story<F>(&self, story_id: &str, callback: F)
    where
        F: FnOnce(Outcome<()>) + Send + 'static,
    {
        let Some(token) = self.inner.bearer("delete_story") else {
            return callback(Err(StoryError::NotAuthenticated));
        };
        let inner = self.inner.clone();
        let story_id = story_id.to_string();
        self.run_background("delete_story", callback, move || {
            let request = inner.requests.build_delete_story(&token, &story_id)?;
            let response = inner.send("delete_story", request)?;
            response::parse_delete_story(&response)
        });
    }
}

impl StoryClient {
    /// Run `work` on the executor and deliver its outcome through the dispatcher.
    fn run_background<T, F, W>(&self, op: &'static str, callback: F, work: W)
    where
        T: Send + 'static,
        F: FnOnce(Outcome<T>) + Send + 'static,
        W: FnOnce() -> Outcome<T> + Send + 'static,
    {
        let dispatcher = self.inner.dispatcher.clone();
        self.executor.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|_| {
                error!(op, "background unit panicked");
                Err(StoryError::Transport(format!("{op} aborted unexpectedly")))
            });
            match &outcome {
                Ok(_) => info!(op, "succeeded"),
                Err(e) => warn!(op, error = %e, "failed"),
            }
            dispatcher.dispatch(Box::new(move || callback(outcome)));
        });
    }
}

impl Inner {
    fn bearer(&self, op: &'static str) -> Option<String> {
        let token = self.session.get().bearer().map(str::to_string);
        if token.is_none() {
            warn!(op, "rejected: not authenticated");
        }
        token
    }

    fn send(&self, op: &'static str, request: HttpRequest) -> Result<HttpResponse, StoryError> {
        debug!(op, method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request)?;
        debug!(op, status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }
}
