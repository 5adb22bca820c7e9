//! REST API Server for the finance assistant
//!
//! Exposes accounts, budgets, expenses, the spending summary and the chat
//! assistant over HTTP. Every route except /health, /api/register,
//! /api/login and /api/classify expects `Authorization: Bearer <token>`.

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::advice::AdviceService;
use crate::auth::{AuthService, Session};
use crate::chat::{ChatOrchestrator, ChatReply};
use crate::classifier::IntentClassifier;
use crate::error::TrackerError;
use crate::models::{
    Budget, BudgetUpdate, ClassificationResult, Expense, ExpenseUpdate, NewBudget, NewExpense, User,
};
use crate::storage::FinanceStore;
use crate::summary::SpendingSummary;
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub utterance: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub user: User,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.user,
        }
    }
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
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> ApiReply {
    match result {
        Ok(data) => (status, Json(ApiResponse::success(data))),
        Err(e) => (e.status_code(), Json(ApiResponse::error(e.to_string()))),
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn FinanceStore>,
    pub auth: Arc<AuthService>,
    pub classifier: Arc<IntentClassifier>,
    pub chat: Arc<ChatOrchestrator>,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn FinanceStore>,
        classifier: Arc<IntentClassifier>,
        advisor: Arc<dyn AdviceService>,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(store.clone())),
            chat: Arc::new(ChatOrchestrator::new(
                classifier.clone(),
                store.clone(),
                advisor,
            )),
            classifier,
            store,
        }
    }
}

/// =============================
/// Bearer token helpers
/// =============================

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| TrackerError::Unauthorized("Missing bearer token".to_string()))
}

async fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<i64> {
    state.auth.authenticate(bearer_token(headers)?).await
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Account Endpoints
/// =============================

async fn register(State(state): State<ApiState>, Json(req): Json<RegisterRequest>) -> ApiReply {
    let result = state
        .auth
        .register(&req.username, &req.password, &req.display_name)
        .await
        .map(SessionResponse::from);
    respond(StatusCode::CREATED, result)
}

async fn login(State(state): State<ApiState>, Json(req): Json<LoginRequest>) -> ApiReply {
    let result = state
        .auth
        .login(&req.username, &req.password)
        .await
        .map(SessionResponse::from);
    respond(StatusCode::OK, result)
}

async fn logout(State(state): State<ApiState>, headers: HeaderMap) -> ApiReply {
    let result: Result<serde_json::Value> = async {
        let token = bearer_token(&headers)?;
        let token = Uuid::parse_str(token)
            .map_err(|_| TrackerError::Unauthorized("Malformed session token".to_string()))?;
        state.auth.logout(token).await;
        Ok(serde_json::json!({ "loggedOut": true }))
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn current_user(State(state): State<ApiState>, headers: HeaderMap) -> ApiReply {
    let result: Result<User> = async {
        let user_id = authorize(&state, &headers).await?;
        state.auth.current_user(user_id).await
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn update_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> ApiReply {
    let result: Result<User> = async {
        let user_id = authorize(&state, &headers).await?;
        state
            .auth
            .update_profile(user_id, req.display_name, req.password)
            .await
    }
    .await;
    respond(StatusCode::OK, result)
}

/// =============================
/// Budget Endpoints
/// =============================

async fn list_budgets(State(state): State<ApiState>, headers: HeaderMap) -> ApiReply {
    let result: Result<Vec<Budget>> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.list_budgets(user_id).await
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn create_budget(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<NewBudget>,
) -> ApiReply {
    let result: Result<Budget> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.create_budget(user_id, req).await
    }
    .await;
    respond(StatusCode::CREATED, result)
}

async fn update_budget(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<BudgetUpdate>,
) -> ApiReply {
    let result: Result<Budget> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.update_budget(user_id, id, req).await
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn delete_budget(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiReply {
    let result: Result<serde_json::Value> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.delete_budget(user_id, id).await?;
        Ok(serde_json::json!({ "deleted": id }))
    }
    .await;
    respond(StatusCode::OK, result)
}

/// =============================
/// Expense Endpoints
/// =============================

async fn list_expenses(State(state): State<ApiState>, headers: HeaderMap) -> ApiReply {
    let result: Result<Vec<Expense>> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.list_expenses(user_id).await
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn create_expense(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<NewExpense>,
) -> ApiReply {
    let result: Result<Expense> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.create_expense(user_id, req).await
    }
    .await;
    respond(StatusCode::CREATED, result)
}

async fn update_expense(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<ExpenseUpdate>,
) -> ApiReply {
    let result: Result<Expense> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.update_expense(user_id, id, req).await
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn delete_expense(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiReply {
    let result: Result<serde_json::Value> = async {
        let user_id = authorize(&state, &headers).await?;
        state.store.delete_expense(user_id, id).await?;
        Ok(serde_json::json!({ "deleted": id }))
    }
    .await;
    respond(StatusCode::OK, result)
}

/// =============================
/// Summary Endpoint
/// =============================

async fn summary(State(state): State<ApiState>, headers: HeaderMap) -> ApiReply {
    let result: Result<SpendingSummary> = async {
        let user_id = authorize(&state, &headers).await?;
        let expenses = state.store.list_expenses(user_id).await?;
        let budgets = state.store.list_budgets(user_id).await?;
        Ok(SpendingSummary::compute(&expenses, &budgets))
    }
    .await;
    respond(StatusCode::OK, result)
}

/// =============================
/// Chat Endpoints
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> ApiReply {
    let result: Result<ChatReply> = async {
        let user_id = authorize(&state, &headers).await?;

        let question = req.question.trim();
        if question.is_empty() {
            return Err(TrackerError::Validation("Question is required".to_string()));
        }

        info!(user_id, "Received chat message");
        Ok(state.chat.handle(user_id, question, Utc::now()).await)
    }
    .await;
    respond(StatusCode::OK, result)
}

async fn classify_handler(
    State(state): State<ApiState>,
    Json(req): Json<ClassifyRequest>,
) -> (StatusCode, Json<ClassificationResult>) {
    (
        StatusCode::OK,
        Json(state.classifier.classify(&req.utterance, Utc::now())),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/user", get(current_user).patch(update_user))
        .route("/api/budgets", get(list_budgets).post(create_budget))
        .route("/api/budgets/:id", patch(update_budget).delete(delete_budget))
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/:id", patch(update_expense).delete(delete_expense))
        .route("/api/summary", get(summary))
        .route("/api/chat", post(chat_handler))
        .route("/api/classify", post(classify_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceContext;
    use crate::storage::InMemoryFinanceStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct CannedAdvisor;

    #[async_trait::async_trait]
    impl AdviceService for CannedAdvisor {
        async fn get_advice(&self, _: &str, context: Option<AdviceContext>) -> Result<String> {
            let spent = context.map(|c| c.expenses).unwrap_or_default();
            Ok(format!("You spent {:.0} so far.\n\nKeep going.", spent))
        }
    }

    fn app() -> Router {
        let state = ApiState::new(
            Arc::new(InMemoryFinanceStore::new()),
            Arc::new(IntentClassifier::with_default_tables().unwrap()),
            Arc::new(CannedAdvisor),
        );
        create_router(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn register_user(app: &Router, username: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "username": username, "password": "pw", "displayName": username })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_requires_session() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/expenses", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, "GET", "/api/expenses", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expense_crud_and_ownership() {
        let app = app();
        let alice = register_user(&app, "alice").await;
        let bob = register_user(&app, "bob").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/expenses",
            Some(&alice),
            Some(json!({
                "amount": 42.5,
                "category": "Food",
                "description": "Groceries",
                "date": "2024-02-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/expenses/{}", id),
            Some(&bob),
            Some(json!({ "amount": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/expenses/{}", id),
            Some(&alice),
            Some(json!({ "amount": 40.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["amount"], 40.0);

        let (_, body) = send(&app, "GET", "/api/expenses", Some(&bob), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/expenses/{}", id),
            Some(&alice),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], id);
    }

    #[tokio::test]
    async fn test_invalid_expense_is_rejected() {
        let app = app();
        let token = register_user(&app, "carol").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/expenses",
            Some(&token),
            Some(json!({
                "amount": -3,
                "category": "Food",
                "description": "Refund?",
                "date": "2024-02-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Amount"));
    }

    #[tokio::test]
    async fn test_chat_records_expense_then_advises() {
        let app = app();
        let token = register_user(&app, "dung").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(&token),
            Some(json!({ "question": "spent 1,250 on rent" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "expense");
        assert_eq!(body["data"]["expense"]["category"], "Housing");
        assert_eq!(body["data"]["expense"]["amount"], 1250.0);

        let (_, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(&token),
            Some(json!({ "question": "am I on track?" })),
        )
        .await;
        assert_eq!(body["data"]["kind"], "advice");
        assert_eq!(body["data"]["response"], "You spent 1250 so far.\n\nKeep going.");

        let (_, body) = send(&app, "GET", "/api/summary", Some(&token), None).await;
        assert_eq!(body["data"]["totalExpenses"], 1250.0);
        assert_eq!(body["data"]["byCategory"][0]["category"], "Housing");
    }

    #[tokio::test]
    async fn test_chat_requires_question() {
        let app = app();
        let token = register_user(&app, "em").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/chat",
            Some(&token),
            Some(json!({ "question": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Question is required"));
    }

    #[tokio::test]
    async fn test_classify_endpoint() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/classify",
            None,
            Some(json!({ "utterance": "invest 10 million, long term, aggressive" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "investment");
        assert_eq!(body["data"]["amount"], 10_000_000.0);
        assert_eq!(body["data"]["timeHorizon"], "long-term");
        assert_eq!(body["data"]["riskTolerance"], "aggressive");
    }

    #[tokio::test]
    async fn test_login_and_profile_update() {
        let app = app();
        register_user(&app, "giang").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({ "username": "giang", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let (_, body) = send(
            &app,
            "PATCH",
            "/api/user",
            Some(&token),
            Some(json!({ "displayName": "Giang Le" })),
        )
        .await;
        assert_eq!(body["data"]["displayName"], "Giang Le");

        let (status, _) = send(&app, "POST", "/api/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", "/api/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
