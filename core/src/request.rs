//! Stateless request builder for the story backend API.
//!
//! # Design
//! `StoryRequests` holds only a `base_url`. Each operation has a `build_*`
//! method that turns typed parameters into an `HttpRequest`; the caller runs
//! the round-trip and hands the response to the matching `response::parse_*`
//! function. Nothing here touches the network or the filesystem; upload
//! bodies only reference the media file by path.

use serde::Serialize;

use crate::error::StoryError;
use crate::http::{HttpMethod, HttpRequest, RequestBody};
use crate::multipart::MultipartForm;
use crate::types::{AuthParams, UploadRequest};

const JSON: &str = "application/json";

/// JSON body of `POST /api/auth/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    telegram_id: &'a str,
    username: String,
    first_name: &'a str,
    last_name: &'a str,
}

/// Builds requests for every backend operation.
#[derive(Debug, Clone)]
pub struct StoryRequests {
    base_url: String,
}

impl StoryRequests {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_authenticate(&self, params: &AuthParams) -> Result<HttpRequest, StoryError> {
        let body = RegisterBody {
            telegram_id: &params.telegram_id,
            username: params.effective_username(),
            first_name: params.first_name.as_deref().unwrap_or(""),
            last_name: params.last_name.as_deref().unwrap_or(""),
        };
        let body =
            serde_json::to_vec(&body).map_err(|e| StoryError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/auth/register", self.base_url),
            headers: vec![("content-type".to_string(), JSON.to_string())],
            body: Some(RequestBody::Bytes(body)),
        })
    }

    pub fn build_upload_story(&self, token: &str, upload: &UploadRequest) -> HttpRequest {
        let filename = upload
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let duration = upload.duration_seconds.to_string();
        let form = MultipartForm::new();
        let content_type = form.content_type();
        let body = form
            .file(
                "file",
                &filename,
                upload.media_kind.mime_category(),
                &upload.file_path,
            )
            .text("type", upload.media_kind.as_str())
            .text("caption", upload.caption_or_default())
            .text("backgroundColor", upload.background_or_default())
            .text("duration", &duration)
            .text("visibility", upload.visibility_or_default())
            .finish();
        HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/api/stories/create", self.base_url),
            headers: vec![bearer(token), ("content-type".to_string(), content_type)],
            body: Some(RequestBody::Multipart(body)),
        }
    }

    pub fn build_fetch_stories(&self, token: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/api/stories", self.base_url),
            headers: vec![bearer(token)],
            body: None,
        }
    }

    pub fn build_record_view(
        &self,
        token: &str,
        story_id: &str,
    ) -> Result<HttpRequest, StoryError> {
        let id = checked_id(story_id)?;
        let url = format!("{}/api/stories/{id}/view", self.base_url);
        Ok(empty_json_post(url, token))
    }

    pub fn build_toggle_like(
        &self,
        token: &str,
        story_id: &str,
    ) -> Result<HttpRequest, StoryError> {
        let id = checked_id(story_id)?;
        let url = format!("{}/api/stories/{id}/like", self.base_url);
        Ok(empty_json_post(url, token))
    }

    pub fn build_delete_story(
        &self,
        token: &str,
        story_id: &str,
    ) -> Result<HttpRequest, StoryError> {
        let id = checked_id(story_id)?;
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/api/stories/{id}", self.base_url),
            headers: vec![bearer(token)],
            body: None,
        })
    }
}

fn bearer(token: &str) -> (String, String) {
    ("authorization".to_string(), format!("Bearer {token}"))
}

fn empty_json_post(url: String, token: &str) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Post,
        url,
        headers: vec![bearer(token), ("content-type".to_string(), JSON.to_string())],
        body: Some(RequestBody::Bytes(Vec::new())),
    }
}

/// Story ids become a single path segment and must not alter the route.
fn checked_id(story_id: &str) -> Result<&str, StoryError> {
    if story_id.is_empty() || story_id.contains(['/', '?', '#']) {
        return Err(StoryError::InvalidArgument(format!("story id {story_id:?}")));
    }
    Ok(story_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaKind, Visibility};

    fn requests() -> StoryRequests {
        StoryRequests::new("http://localhost:3000")
    }

    #[test]
    fn build_authenticate_fills_defaults() {
        let req = requests().build_authenticate(&AuthParams::new("1001")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/api/auth/register");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("authorization").is_none());
        let body = req.body.as_ref().and_then(RequestBody::as_bytes).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "telegramId": "1001",
                "username": "user_1001",
                "firstName": "",
                "lastName": ""
            })
        );
    }

    #[test]
    fn build_authenticate_escapes_strings() {
        let params = AuthParams::new("7")
            .with_username("a\"b")
            .with_name("Zoë", "O'Neil\n");
        let req = requests().build_authenticate(&params).unwrap();
        let body = req.body.as_ref().and_then(RequestBody::as_bytes).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(body["username"], "a\"b");
        assert_eq!(body["firstName"], "Zoë");
        assert_eq!(body["lastName"], "O'Neil\n");
    }

    #[test]
    fn build_upload_story_encodes_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"VIDEO").unwrap();
        let upload = UploadRequest::new(&path, MediaKind::Video)
            .with_caption("beach")
            .with_duration(15)
            .with_visibility(Visibility::Private);
        let req = requests().build_upload_story("tok", &upload);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/api/stories/create");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        let content_type = req.header("content-type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let body = String::from_utf8(req.body.unwrap().to_vec().unwrap()).unwrap();
        assert!(body.contains(
            "name=\"file\"; filename=\"clip.mp4\"\r\nContent-Type: video/*\r\n\r\nVIDEO\r\n"
        ));
        assert!(body.contains("name=\"type\"\r\n\r\nvideo\r\n"));
        assert!(body.contains("name=\"caption\"\r\n\r\nbeach\r\n"));
        assert!(body.contains("name=\"backgroundColor\"\r\n\r\n#FFFFFF\r\n"));
        assert!(body.contains("name=\"duration\"\r\n\r\n15\r\n"));
        assert!(body.contains("name=\"visibility\"\r\n\r\nprivate\r\n"));
    }

    #[test]
    fn build_upload_story_streams_the_file() {
        let upload = UploadRequest::new("/media/big.mp4", MediaKind::Video);
        let req = requests().build_upload_story("tok", &upload);
        let Some(RequestBody::Multipart(form)) = req.body else {
            panic!("upload body should be multipart");
        };
        let files: Vec<_> = form.files().collect();
        assert_eq!(files, vec![std::path::Path::new("/media/big.mp4")]);
    }

    #[test]
    fn build_fetch_stories_is_authenticated_get() {
        let req = requests().build_fetch_stories("tok");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/stories");
        assert_eq!(
            req.headers,
            vec![("authorization".to_string(), "Bearer tok".to_string())]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn view_and_like_post_empty_json() {
        let view = requests().build_record_view("tok", "s1").unwrap();
        assert_eq!(view.url, "http://localhost:3000/api/stories/s1/view");
        assert_eq!(view.body, Some(RequestBody::Bytes(Vec::new())));
        assert_eq!(view.header("content-type"), Some("application/json"));

        let like = requests().build_toggle_like("tok", "s1").unwrap();
        assert_eq!(like.method, HttpMethod::Post);
        assert_eq!(like.url, "http://localhost:3000/api/stories/s1/like");
    }

    #[test]
    fn build_delete_story_produces_delete() {
        let req = requests().build_delete_story("tok", "abc").unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/api/stories/abc");
        assert!(req.body.is_none());
    }

    #[test]
    fn ids_that_change_the_route_are_rejected() {
        for id in ["", "a/b", "a?x=1", "a#frag"] {
            let err = requests().build_delete_story("tok", id).unwrap_err();
            assert!(matches!(err, StoryError::InvalidArgument(_)), "{id}");
        }
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let req = StoryRequests::new("http://localhost:3000/").build_fetch_stories("t");
        assert_eq!(req.url, "http://localhost:3000/api/stories");
    }
}
