//! Response decoding for the story backend API.
//!
//! # Design
//! Every backend reply is a `{success, data?, error?}` envelope and the
//! `success` flag is authoritative: the HTTP status code is never consulted.
//! A body that is not JSON or lacks `success` is a decode failure. An
//! explicit `success: false` becomes a domain failure carrying the backend's
//! message, or the operation's default message when the backend sent none.
//! On the success path every field the operation needs must be present;
//! there is no partial-data tolerance.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::StoryError;
use crate::http::HttpResponse;
use crate::types::{LikeState, StoryRecord};

pub const AUTH_FAILED: &str = "Unknown error";
pub const UPLOAD_FAILED: &str = "Upload failed";
pub const FETCH_FAILED: &str = "Fetch failed";
pub const VIEW_FAILED: &str = "View failed";
pub const LIKE_FAILED: &str = "Like failed";
pub const DELETE_FAILED: &str = "Delete failed";

/// The uniform wrapper around every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, StoryError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Backend error text, if it sent a non-null `error`.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// `data` on success, the domain failure otherwise.
    fn into_data(self, default_error: &str) -> Result<Option<Value>, StoryError> {
        if self.success {
            return Ok(self.data);
        }
        Err(StoryError::Domain(
            self.error_message().unwrap_or_else(|| default_error.to_string()),
        ))
    }
}

pub fn parse_authenticate(response: &HttpResponse) -> Result<String, StoryError> {
    let data = required_object(open(response, AUTH_FAILED)?)?;
    match data.get("token") {
        Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
        Some(Value::String(_)) => Err(StoryError::Decode("data.token is empty".to_string())),
        _ => Err(StoryError::Decode("missing string field data.token".to_string())),
    }
}

pub fn parse_upload_story(response: &HttpResponse) -> Result<StoryRecord, StoryError> {
    let data = required_object(open(response, UPLOAD_FAILED)?)?;
    Ok(StoryRecord::from_map(data))
}

pub fn parse_fetch_stories(response: &HttpResponse) -> Result<Vec<StoryRecord>, StoryError> {
    let mut data = required_object(open(response, FETCH_FAILED)?)?;
    match data.remove("stories") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(fields) => Ok(StoryRecord::from_map(fields)),
                _ => Err(StoryError::Decode(format!("data.stories[{i}] is not an object"))),
            })
            .collect(),
        Some(_) => Err(StoryError::Decode("data.stories is not an array".to_string())),
    }
}

pub fn parse_record_view(response: &HttpResponse) -> Result<(), StoryError> {
    open(response, VIEW_FAILED).map(|_| ())
}

pub fn parse_toggle_like(response: &HttpResponse) -> Result<LikeState, StoryError> {
    let data = required_object(open(response, LIKE_FAILED)?)?;
    let is_liked = data
        .get("isLiked")
        .and_then(Value::as_bool)
        .ok_or_else(|| StoryError::Decode("missing boolean field data.isLiked".to_string()))?;
    let likes_count = data.get("likesCount").and_then(lenient_int).unwrap_or(0);
    Ok(LikeState {
        is_liked,
        likes_count,
    })
}

/// Integer from a JSON number or numeric string; fractions are truncated.
pub(crate) fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn parse_delete_story(response: &HttpResponse) -> Result<(), StoryError> {
    open(response, DELETE_FAILED).map(|_| ())
}

fn open(response: &HttpResponse, default_error: &str) -> Result<Option<Value>, StoryError> {
    Envelope::parse(&response.body)?.into_data(default_error)
}

fn required_object(data: Option<Value>) -> Result<Map<String, Value>, StoryError> {
    match data {
        Some(Value::Object(fields)) => Ok(fields),
        Some(_) => Err(StoryError::Decode("data is not an object".to_string())),
        None => Err(StoryError::Decode("missing field data".to_string())),
    }
}
