use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Multipart, Path, State},
    http::{header, request::Parts, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub media_kind: String,
    pub caption: String,
    pub background_color: String,
    pub duration: u32,
    pub visibility: String,
    pub file_name: String,
    pub mime_type: String,
    pub media_size: usize,
    pub views_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    pub telegram_id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// In-memory backend state. Stories keep insertion order.
#[derive(Default)]
pub struct Backend {
    pub sessions: HashMap<String, String>,
    pub stories: Vec<Story>,
    pub likes: HashSet<(String, String)>,
}

impl Backend {
    fn likes_count(&self, story_id: &str) -> usize {
        self.likes.iter().filter(|(s, _)| s == story_id).count()
    }

    fn render(&self, story: &Story, viewer: &str) -> Value {
        let mut value = serde_json::to_value(story).unwrap_or_default();
        value["likesCount"] = json!(self.likes_count(&story.id));
        value["isLiked"] = json!(self.likes.contains(&(story.id.clone(), viewer.to_string())));
        value
    }
}

pub type Db = Arc<RwLock<Backend>>;

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, error: &str) -> Reply {
    (status, Json(json!({ "success": false, "error": error })))
}

/// Telegram id of the caller, resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub String);

impl FromRequestParts<Db> for AuthUser {
    type Rejection = Reply;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Unauthorized"))?;
        db.read()
            .await
            .sessions
            .get(token)
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over caller-owned state, so tests can inspect or seed it.
pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/stories", get(list_stories))
        .route("/api/stories/create", post(create_story))
        .route("/api/stories/{id}", delete(delete_story))
        .route("/api/stories/{id}/view", post(record_view))
        .route("/api/stories/{id}/like", post(toggle_like))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Db::default()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock story backend listening");
    }
    axum::serve(listener, app_with_state(db)).await
}

async fn register(State(db): State<Db>, input: Result<Json<Register>, JsonRejection>) -> Reply {
    let Json(input) = match input {
        Ok(input) => input,
        Err(rejection) => return fail(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    if input.telegram_id.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "telegramId is required");
    }
    let token = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(token.clone(), input.telegram_id.clone());
    debug!(telegram_id = %input.telegram_id, "registered user");
    ok(json!({
        "token": token,
        "user": {
            "telegramId": input.telegram_id,
            "username": input.username,
            "firstName": input.first_name,
            "lastName": input.last_name,
        }
    }))
}

async fn list_stories(State(db): State<Db>, AuthUser(user): AuthUser) -> Reply {
    let backend = db.read().await;
    let stories: Vec<Value> = backend
        .stories
        .iter()
        .filter(|s| s.visibility == "public" || s.user_id == user)
        .map(|s| backend.render(s, &user))
        .collect();
    ok(json!({ "stories": stories }))
}

async fn create_story(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Reply {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut file: Option<(String, String, usize)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return fail(StatusCode::BAD_REQUEST, &e.body_text()),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            match field.bytes().await {
                Ok(bytes) => file = Some((file_name, mime_type, bytes.len())),
                Err(e) => return fail(StatusCode::BAD_REQUEST, &e.body_text()),
            }
        } else {
            match field.text().await {
                Ok(text) => {
                    fields.insert(name, text);
                }
                Err(e) => return fail(StatusCode::BAD_REQUEST, &e.body_text()),
            }
        }
    }

    let Some((file_name, mime_type, media_size)) = file else {
        return fail(StatusCode::BAD_REQUEST, "No file uploaded");
    };
    let field = |key: &str, default: &str| {
        fields
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };
    let story = Story {
        id: Uuid::new_v4().to_string(),
        user_id: user.clone(),
        media_kind: field("type", "image"),
        caption: field("caption", ""),
        background_color: field("backgroundColor", "#FFFFFF"),
        duration: fields.get("duration").and_then(|d| d.parse().ok()).unwrap_or(0),
        visibility: field("visibility", "public"),
        file_name,
        mime_type,
        media_size,
        views_count: 0,
    };

    let mut backend = db.write().await;
    backend.stories.push(story.clone());
    debug!(story_id = %story.id, "story created");
    ok(backend.render(&story, &user))
}

async fn record_view(
    State(db): State<Db>,
    AuthUser(_user): AuthUser,
    Path(id): Path<String>,
) -> Reply {
    let mut backend = db.write().await;
    match backend.stories.iter_mut().find(|s| s.id == id) {
        Some(story) => {
            story.views_count += 1;
            ok(json!({ "viewsCount": story.views_count }))
        }
        None => fail(StatusCode::NOT_FOUND, "Story not found"),
    }
}

async fn toggle_like(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Reply {
    let mut backend = db.write().await;
    if !backend.stories.iter().any(|s| s.id == id) {
        return fail(StatusCode::NOT_FOUND, "Story not found");
    }
    let key = (id.clone(), user);
    let is_liked = if backend.likes.remove(&key) {
        false
    } else {
        backend.likes.insert(key);
        true
    };
    ok(json!({ "isLiked": is_liked, "likesCount": backend.likes_count(&id) }))
}

async fn delete_story(
    State(db): State<Db>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Reply {
    let mut backend = db.write().await;
    let Some(pos) = backend.stories.iter().position(|s| s.id == id) else {
        return fail(StatusCode::NOT_FOUND, "Story not found");
    };
    if backend.stories[pos].user_id != user {
        return fail(StatusCode::FORBIDDEN, "not owner");
    }
    backend.stories.remove(pos);
    backend.likes.retain(|(story_id, _)| *story_id != id);
    (StatusCode::OK, Json(json!({ "success": true })))
}
