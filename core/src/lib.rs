//! Client core for the custom story backend.
//!
//! # Overview
//! Turns an application's intent ("upload this file", "like that story")
//! into an authenticated HTTP request, decodes the backend's
//! `{success, data, error}` envelope into a typed [`Outcome`], and delivers
//! it to a callback on the application's primary context without blocking
//! the calling thread.
//!
//! # Design
//! - `request` and `response` are pure codecs over plain `HttpRequest` /
//!   `HttpResponse` values; only a `Transport` performs IO.
//! - The session is an explicit `SessionStore` injected into the client,
//!   with serialized writes and token persistence delegated to a
//!   `SecureStore`.
//! - Work runs on a bounded blocking pool (`Executor`); results come back
//!   through a `Dispatcher` (`MainQueue` by default).

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod multipart;
pub mod request;
pub mod response;
pub mod secure_store;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{StoryClient, StoryClientBuilder};
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, Job, MainQueue};
pub use error::{ErrorKind, StoryError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use logging::init_logging;
pub use multipart::{MultipartBody, MultipartForm};
pub use request::StoryRequests;
pub use response::Envelope;
#[cfg(feature = "keyring")]
pub use secure_store::KeyringSecureStore;
pub use secure_store::{MemorySecureStore, SecureStore};
pub use session::{AuthSession, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{AuthParams, LikeState, MediaKind, Outcome, StoryRecord, UploadRequest, Visibility};
