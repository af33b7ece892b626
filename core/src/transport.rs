//! Network execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the only seam that performs IO. It runs one request to
//! completion on the calling thread and returns whatever status and body the
//! server sent; interpreting them is the response codec's job. Only failures
//! to obtain a response at all (DNS, connect, timeout, broken body) are
//! errors here.
//!
//! Multipart bodies are streamed from disk as the request is written.

use std::io;

use ureq::{RequestBuilder, SendBody};

use crate::config::ClientConfig;
use crate::error::StoryError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes a single HTTP request, blocking until the response body is read.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, StoryError>;
}

/// `Transport` backed by a shared `ureq` agent.
///
/// 4xx/5xx responses are returned as data, never as `Err`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_send_body(Some(config.write_timeout))
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, StoryError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Post, Some(RequestBody::Bytes(bytes))) => {
                with_headers(self.agent.post(&url), &headers).send(&bytes[..])
            }
            (HttpMethod::Post, Some(RequestBody::Multipart(form))) => {
                let mut reader = form.reader().map_err(file_error)?;
                with_headers(self.agent.post(&url), &headers)
                    .send(SendBody::from_reader(&mut reader))
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), &headers).send_empty(),
        };
        let mut response = result.map_err(|e| StoryError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| StoryError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// A file that vanished after the upload was accepted is still `FileNotFound`.
fn file_error(err: io::Error) -> StoryError {
    match err.kind() {
        io::ErrorKind::NotFound => StoryError::FileNotFound,
        _ => StoryError::Transport(err.to_string()),
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
