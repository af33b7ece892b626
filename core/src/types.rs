//! Domain values for the story API.
//!
//! # Design
//! Inputs (`AuthParams`, `UploadRequest`) are typed and carry their own
//! defaults. Story payloads coming back from the backend are kept opaque:
//! `StoryRecord` wraps the JSON object untouched and only offers typed
//! accessors, so a backend adding or reshaping fields never breaks decoding.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoryError;

/// Result of every client operation, delivered exactly once.
pub type Outcome<T> = Result<T, StoryError>;

/// Kind of media attached to a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// MIME category sent as the content type of the uploaded file part.
    pub fn mime_category(self) -> &'static str {
        match self {
            MediaKind::Video => "video/*",
            MediaKind::Image => "image/*",
        }
    }
}

impl FromStr for MediaKind {
    type Err = StoryError;

    /// Anything other than `video` is treated as an image.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        })
    }
}

/// Audience a story is published to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    /// A backend-defined scope passed through verbatim.
    Custom(String),
}

impl Visibility {
    pub fn as_str(&self) -> &str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Custom(scope) => scope,
        }
    }
}

impl From<&str> for Visibility {
    fn from(s: &str) -> Self {
        match s {
            "public" => Visibility::Public,
            "private" => Visibility::Private,
            other => Visibility::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registration parameters for `authenticate`.
#[derive(Debug, Clone, Default)]
pub struct AuthParams {
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AuthParams {
    pub fn new(telegram_id: impl Into<String>) -> Self {
        Self {
            telegram_id: telegram_id.into(),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }

    /// Username sent to the backend, `user_<telegramId>` when none was given.
    pub fn effective_username(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| format!("user_{}", self.telegram_id))
    }
}

/// A story upload. Built per call and dropped once the request completes.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_path: PathBuf,
    pub media_kind: MediaKind,
    pub caption: Option<String>,
    pub background_color: Option<String>,
    pub duration_seconds: u32,
    pub visibility: Option<Visibility>,
}

impl UploadRequest {
    pub const DEFAULT_BACKGROUND: &'static str = "#FFFFFF";

    pub fn new(file_path: impl Into<PathBuf>, media_kind: MediaKind) -> Self {
        Self {
            file_path: file_path.into(),
            media_kind,
            caption: None,
            background_color: None,
            duration_seconds: 0,
            visibility: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn caption_or_default(&self) -> &str {
        self.caption.as_deref().unwrap_or("")
    }

    pub fn background_or_default(&self) -> &str {
        self.background_color.as_deref().unwrap_or(Self::DEFAULT_BACKGROUND)
    }

    pub fn visibility_or_default(&self) -> &str {
        self.visibility.as_ref().map_or("public", Visibility::as_str)
    }
}

/// A story as returned by the backend.
///
/// The JSON object is kept as-is; accessors return `None` when a field is
/// missing or has an unexpected type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryRecord(Map<String, Value>);

impl StoryRecord {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Story id; numeric ids are rendered as decimal strings.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id").or_else(|| self.0.get("_id"))? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.str_field("type").and_then(|s| s.parse().ok())
    }

    pub fn caption(&self) -> Option<&str> {
        self.str_field("caption")
    }

    pub fn background_color(&self) -> Option<&str> {
        self.str_field("backgroundColor")
    }

    pub fn duration_seconds(&self) -> Option<u64> {
        self.0.get("duration").and_then(Value::as_u64)
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.str_field("visibility").map(Visibility::from)
    }

    pub fn likes_count(&self) -> Option<i64> {
        self.0.get("likesCount").and_then(crate::response::lenient_int)
    }

    pub fn is_liked(&self) -> Option<bool> {
        self.0.get("isLiked").and_then(Value::as_bool)
    }

    /// Raw access to any field, including ones without an accessor.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Like state reported after `toggle_like`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn username_defaults_to_telegram_id() {
        assert_eq!(AuthParams::new("42").effective_username(), "user_42");
        assert_eq!(AuthParams::new("42").with_username("bob").effective_username(), "bob");
    }

    #[test]
    fn upload_defaults() {
        let req = UploadRequest::new("/tmp/a.jpg", MediaKind::Image);
        assert_eq!(req.caption_or_default(), "");
        assert_eq!(req.background_or_default(), "#FFFFFF");
        assert_eq!(req.visibility_or_default(), "public");
    }

    #[test]
    fn media_kind_parsing_falls_back_to_image() {
        assert_eq!("video".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert_eq!("gif".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert_eq!(MediaKind::Video.mime_category(), "video/*");
        assert_eq!(MediaKind::Image.mime_category(), "image/*");
    }

    #[test]
    fn visibility_passes_unknown_scopes_through() {
        assert_eq!(Visibility::from("private"), Visibility::Private);
        assert_eq!(Visibility::from("close_friends").as_str(), "close_friends");
    }

    #[test]
    fn story_record_accessors_tolerate_shape() {
        let record: StoryRecord = serde_json::from_value(json!({
            "id": 17,
            "type": "video",
            "caption": "hi",
            "likesCount": 3,
            "isLiked": "yes",
            "extra": {"nested": true}
        }))
        .unwrap();
        assert_eq!(record.id().as_deref(), Some("17"));
        assert_eq!(record.media_kind(), Some(MediaKind::Video));
        assert_eq!(record.caption(), Some("hi"));
        assert_eq!(record.likes_count(), Some(3));
        assert_eq!(record.is_liked(), None);
        assert_eq!(record.get("extra").unwrap()["nested"], true);
    }
}
