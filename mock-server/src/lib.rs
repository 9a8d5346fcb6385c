use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// First id handed out; real Confluence ids are large numbers too.
const FIRST_CONTENT_ID: u64 = 65_536;

/// Credentials the server accepts.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub user: String,
    pub token: String,
}

impl MockConfig {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub space: SpaceKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub version: VersionNumber,
    #[serde(rename = "_links")]
    pub links: Links,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpaceKey {
    pub key: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionNumber {
    pub number: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Links {
    pub context: String,
    pub webui: String,
}

#[derive(Deserialize)]
pub struct CreateContent {
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    pub title: Option<String>,
    pub space: Option<SpaceKey>,
    pub body: Option<Value>,
}

#[derive(Deserialize)]
pub struct UpdateContent {
    pub title: Option<String>,
    pub body: Option<Value>,
    pub version: VersionNumber,
}

fn default_content_type() -> String {
    "page".to_string()
}

pub struct AppState {
    config: MockConfig,
    contents: RwLock<HashMap<u64, Content>>,
    next_id: AtomicU64,
}

pub type Db = Arc<AppState>;

pub fn app(config: MockConfig) -> Router {
    let db: Db = Arc::new(AppState {
        config,
        contents: RwLock::new(HashMap::new()),
        next_id: AtomicU64::new(FIRST_CONTENT_ID),
    });
    Router::new()
        .route("/wiki/rest/api/content", post(create_content))
        .route(
            "/wiki/rest/api/content/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        .route("/wiki/rest/api/echo", any(echo))
        .route("/wiki/rest/api/broken", get(broken))
        .layer(middleware::from_fn_with_state(db.clone(), require_basic_auth))
        .with_state(db)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app(config)).await
}

/// Confluence-style error payload.
pub fn error_payload(status: StatusCode, message: &str, data: Value) -> Response {
    let body = json!({
        "statusCode": status.as_u16(),
        "message": message,
        "data": data,
    });
    (status, Json(body)).into_response()
}

fn not_found(id: u64) -> Response {
    error_payload(
        StatusCode::NOT_FOUND,
        &format!("No content found with id: {id}"),
        json!({"authorized": true, "valid": true, "successful": false, "errors": []}),
    )
}

async fn require_basic_auth(State(db): State<Db>, request: Request, next: Next) -> Response {
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", db.config.user, db.config.token))
    );
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        tracing::debug!(uri = %request.uri(), "rejecting unauthenticated request");
        return error_payload(
            StatusCode::UNAUTHORIZED,
            "Client must be authenticated to access this resource.",
            json!({"authorized": false, "valid": true, "successful": false}),
        );
    }
    next.run(request).await
}

async fn create_content(State(db): State<Db>, Json(input): Json<CreateContent>) -> Response {
    let title = input.title.filter(|title| !title.is_empty());
    let mut errors = Vec::new();
    if title.is_none() {
        errors.push("A title is required");
    }
    if input.space.is_none() {
        errors.push("A space key is required");
    }
    let (Some(title), Some(space)) = (title, input.space) else {
        return error_payload(
            StatusCode::BAD_REQUEST,
            "Could not create content",
            json!({"authorized": true, "valid": false, "successful": false, "errors": errors}),
        );
    };

    let id = db.next_id.fetch_add(1, Ordering::Relaxed);
    let content = Content {
        id: id.to_string(),
        content_type: input.content_type,
        links: Links {
            context: "/wiki".to_string(),
            webui: format!("/spaces/{}/pages/{id}", space.key),
        },
        title,
        space,
        body: input.body,
        version: VersionNumber { number: 1 },
    };
    db.contents.write().await.insert(id, content.clone());
    tracing::debug!(id, "created content");
    (StatusCode::OK, Json(content)).into_response()
}

async fn get_content(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    match db.contents.read().await.get(&id) {
        Some(content) => Json(content.clone()).into_response(),
        None => not_found(id),
    }
}

async fn update_content(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateContent>,
) -> Response {
    let mut contents = db.contents.write().await;
    let Some(content) = contents.get_mut(&id) else {
        return not_found(id);
    };
    let current = content.version.number;
    if input.version.number != current + 1 {
        return error_payload(
            StatusCode::CONFLICT,
            &format!("Version must be incremented on update. Current version is: {current}"),
            json!({"authorized": true, "valid": true, "successful": false, "errors": []}),
        );
    }
    if let Some(title) = input.title {
        content.title = title;
    }
    if let Some(body) = input.body {
        content.body = Some(body);
    }
    content.version = input.version;
    (StatusCode::OK, Json(content.clone())).into_response()
}

async fn delete_content(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    match db.contents.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}

/// Reflects what the server received: method, content type and JSON body.
async fn echo(method: Method, headers: HeaderMap, body: String) -> Response {
    if method == Method::DELETE {
        return StatusCode::NO_CONTENT.into_response();
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    Json(json!({
        "method": method.as_str(),
        "contentType": content_type,
        "body": body,
    }))
    .into_response()
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal failure: database unavailable")
}
