//! REST API Server for the Document Assistant
//!
//! Exposes the document store and the conversational assistant over HTTP

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::agent::DocumentAssistant;
use crate::error::AssistantError;
use crate::models::Record;
use crate::retrieval::{SearchRequest, SharedStore};

const DEFAULT_USER_ID: &str = "anonymous";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct AmountQueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn failure(status: StatusCode, message: String) -> ApiResult {
    (status, Json(ApiResponse::error(message)))
}

fn error_status(error: &AssistantError) -> StatusCode {
    match error {
        AssistantError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AssistantError::InvalidSessionId(_) | AssistantError::InvalidToolInput(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn from_error(error: AssistantError) -> ApiResult {
    warn!(error = %error, "Request failed");
    failure(error_status(&error), error.to_string())
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub store: SharedStore,
    pub assistant: Arc<DocumentAssistant>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Document Endpoints
/// =============================

async fn list_documents(State(state): State<ApiState>) -> ApiResult {
    ok(state.store.read().await.all())
}

async fn add_document(State(state): State<ApiState>, Json(record): Json<Record>) -> ApiResult {
    if record.doc_id.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "doc_id must not be empty".into());
    }

    info!(doc_id = %record.doc_id, doc_type = %record.doc_type, "Adding document");
    let doc_id = record.doc_id.clone();
    state.store.write().await.insert(record);

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::json!({ "doc_id": doc_id }))),
    )
}

async fn get_document(State(state): State<ApiState>, Path(doc_id): Path<String>) -> ApiResult {
    match state.store.read().await.get_by_id(&doc_id) {
        Some(document) => ok(document),
        None => failure(
            StatusCode::NOT_FOUND,
            format!("Document with ID {} not found", doc_id),
        ),
    }
}

async fn documents_by_category(
    State(state): State<ApiState>,
    Path(doc_type): Path<String>,
) -> ApiResult {
    ok(state.store.read().await.by_category(&doc_type))
}

/// =============================
/// Search Endpoints
/// =============================

async fn search(State(state): State<ApiState>, Json(request): Json<SearchRequest>) -> ApiResult {
    let results = state.store.read().await.search(&request);
    info!(query = %request.query, search_type = ?request.search_type, results = results.len(), "Search");

    ok(serde_json::json!({
        "results_count": results.len(),
        "results": results,
    }))
}

async fn search_amount(
    State(state): State<ApiState>,
    Json(request): Json<AmountQueryRequest>,
) -> ApiResult {
    let results = state.store.read().await.by_amount_query(&request.query);

    ok(serde_json::json!({
        "results_count": results.len(),
        "results": results,
    }))
}

async fn statistics(State(state): State<ApiState>) -> ApiResult {
    ok(state.store.read().await.statistics())
}

/// =============================
/// Conversation Endpoints
/// =============================

async fn start_session(
    State(state): State<ApiState>,
    Json(request): Json<SessionRequest>,
) -> ApiResult {
    let user_id = request.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);

    match state
        .assistant
        .start_session(user_id, request.session_id.as_deref())
        .await
    {
        Ok(session) => ok(serde_json::json!({
            "session_id": session.session_id,
            "user_id": session.user_id,
            "message_count": session.history.message_count(),
            "document_context": session.document_context,
            "created_at": session.created_at,
        })),
        Err(e) => from_error(e),
    }
}

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    if req.message.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "message must not be empty".into());
    }

    let user_id = req.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    let session = match state
        .assistant
        .start_session(user_id, req.session_id.as_deref())
        .await
    {
        Ok(session) => session,
        Err(e) => return from_error(e),
    };

    info!(session_id = %session.session_id, "Chat message received");

    match state
        .assistant
        .process_message(&session.session_id, &req.message)
        .await
    {
        Ok(turn) => ok(turn),
        Err(e) => from_error(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(store: SharedStore, assistant: Arc<DocumentAssistant>) -> Router {
    let state = ApiState { store, assistant };

    Router::new()
        .route("/health", get(health))
        .route("/api/documents", get(list_documents).post(add_document))
        .route("/api/documents/:doc_id", get(get_document))
        .route("/api/documents/category/:doc_type", get(documents_by_category))
        .route("/api/search", post(search))
        .route("/api/search/amount", post(search_amount))
        .route("/api/statistics", get(statistics))
        .route("/api/sessions", post(start_session))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    store: SharedStore,
    assistant: Arc<DocumentAssistant>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(store, assistant);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::retrieval::DocumentStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn router(dir: &TempDir) -> Router {
        let store = DocumentStore::with_sample_documents().into_shared();
        let config = AssistantConfig {
            sessions_dir: dir.path().join("sessions"),
            logs_dir: dir.path().join("logs"),
            ..AssistantConfig::default()
        };
        let assistant = DocumentAssistant::from_config(config, store.clone()).unwrap();
        create_router(store, Arc::new(assistant))
    }

    async fn call(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(router(&dir), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("healthy"));
    }

    #[tokio::test]
    async fn test_get_document_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(&dir);

        let (status, body) = call(app.clone(), Method::GET, "/api/documents/INV-002", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["doc_id"], json!("INV-002"));
        assert_eq!(body["data"]["metadata"]["total"], json!(69300.0));

        let (status, body) = call(app, Method::GET, "/api/documents/XYZ-999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_add_then_list_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(&dir);

        let record = json!({
            "doc_id": "CON-002",
            "title": "Lease",
            "content": "Office lease",
            "doc_type": "contract",
            "metadata": {"value": 36000}
        });
        let (status, _) = call(app.clone(), Method::POST, "/api/documents", Some(record)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(app, Method::GET, "/api/documents/category/Contract", None).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["doc_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["CON-001", "CON-002"]);
    }

    #[tokio::test]
    async fn test_search_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(&dir);

        let (_, body) = call(
            app.clone(),
            Method::POST,
            "/api/search",
            Some(json!({"search_type": "amount_range", "min_amount": 50000, "max_amount": 200000})),
        )
        .await;
        assert_eq!(body["data"]["results_count"], json!(2));
        assert_eq!(body["data"]["results"][0]["doc_id"], json!("CON-001"));

        let (_, body) = call(
            app.clone(),
            Method::POST,
            "/api/search/amount",
            Some(json!({"query": "under $10,000"})),
        )
        .await;
        assert_eq!(body["data"]["results"][0]["doc_id"], json!("CLM-001"));

        let (_, body) = call(app, Method::GET, "/api/statistics", None).await;
        assert_eq!(body["data"]["total_documents"], json!(5));
        assert_eq!(body["data"]["total_amount"], json!(466250.0));
    }

    #[tokio::test]
    async fn test_session_and_chat() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(&dir);

        let (status, body) = call(
            app.clone(),
            Method::POST,
            "/api/sessions",
            Some(json!({"user_id": "demo_user", "session_id": "web-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["session_id"], json!("web-1"));

        let (status, body) = call(
            app.clone(),
            Method::POST,
            "/api/chat",
            Some(json!({"session_id": "web-1", "message": "Summarize INV-001"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["intent"]["intent_type"], json!("summarization"));
        assert_eq!(body["data"]["sources"], json!(["INV-001"]));

        let (status, _) = call(
            app,
            Method::POST,
            "/api/chat",
            Some(json!({"session_id": "../escape", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
