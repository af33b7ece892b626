//! HTTP request/response values exchanged between the codecs and the transport.
//!
//! # Design
//! Requests and responses are plain data. `StoryRequests` builds an
//! `HttpRequest` without touching the network, a `Transport` turns it into
//! an `HttpResponse`, and the response codec decodes that. Keeping the wire
//! step behind these values lets every codec be tested without a socket.
//!
//! All fields use owned types so values move freely onto background tasks.

use std::fmt;
use std::io;

use crate::multipart::MultipartBody;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        })
    }
}

/// An HTTP request described as plain data.
///
/// Header names are lower-case.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// Request payload. Multipart bodies reference their files and are streamed
/// by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Bytes(Vec<u8>),
    Multipart(MultipartBody),
}

impl RequestBody {
    /// In-memory bytes, `None` for streamed bodies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Bytes(bytes) => Some(bytes),
            RequestBody::Multipart(_) => None,
        }
    }

    /// The full encoded body, reading any referenced files.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        match self {
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
            RequestBody::Multipart(form) => form.to_vec(),
        }
    }
}

impl HttpRequest {
    /// First value of the header `name` (case-insensitive), if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
