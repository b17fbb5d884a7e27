//! HTTP API for host metrics, mission status and Prometheus metrics

use crate::auth::{require_basic, require_jwt, Credentials, JwtService};
use crate::config::MonitorConfig;
use crate::request_id::{assign_request_id, RequestId, REQUEST_ID_HEADER};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use monitor_lib::{
    classify_error, models::unix_timestamp, Aggregator, ErrorReport, MonitorError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

const MAX_USERNAME_LEN: usize = 50;
const MAX_PASSWORD_LEN: usize = 100;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub jwt: Arc<JwtService>,
    pub credentials: Arc<Credentials>,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(aggregator: Aggregator, config: &MonitorConfig) -> Self {
        Self {
            aggregator,
            jwt: Arc::new(JwtService::new(
                &config.jwt_secret,
                config.jwt_expiration_secs,
            )),
            credentials: Arc::new(Credentials::new(
                config.admin_username.clone(),
                config.admin_password.clone(),
            )),
            cors_origins: config.cors_origin_list(),
            static_dir: config.static_dir.clone(),
        }
    }
}

/// Failure of an API handler
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// Classified failure rendered as a `MISSION_FAILED` envelope
    Mission(ErrorReport),
}

impl ApiError {
    /// Classify and log `err`, keeping the report for the response
    pub fn mission(err: MonitorError, function: &str, request_id: &RequestId) -> Self {
        let mut context = Map::new();
        context.insert("function".into(), Value::String(function.to_string()));
        ApiError::Mission(classify_error(&err, context, request_id.as_str()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message, "success": false })),
            )
                .into_response(),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": message, "success": false })),
            )
                .into_response(),
            ApiError::Mission(report) => {
                let status = StatusCode::from_u16(report.severity.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(report.to_response_body())).into_response()
            }
        }
    }
}

/// Response body with the request id added alongside the payload fields
#[derive(Debug, Serialize)]
struct WithRequestId<T> {
    #[serde(flatten)]
    body: T,
    request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddLogRequest {
    pub level: Option<String>,
    pub message: Option<String>,
}

/// Exchange administrator credentials for an access token
async fn login(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(request_id = %request_id, error = %rejection, "Unreadable login body");
        ApiError::BadRequest("Username and password are required".to_string())
    })?;
    let (username, password) = match (request.username, request.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            return Err(ApiError::BadRequest(
                "Username and password are required".to_string(),
            ))
        }
    };

    if username.chars().count() > MAX_USERNAME_LEN || password.chars().count() > MAX_PASSWORD_LEN
    {
        return Err(ApiError::BadRequest("Credentials too long".to_string()));
    }

    if !state.credentials.verify(&username, &password) {
        warn!(request_id = %request_id, "Failed login attempt");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state
        .jwt
        .generate_token(&username)
        .map_err(|e| ApiError::mission(MonitorError::System(e.to_string()), "login", &request_id))?;

    info!(request_id = %request_id, username = %username, "Access token issued");
    Ok(Json(json!({ "access_token": token, "success": true })))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .aggregator
        .stats()
        .await
        .map_err(|e| ApiError::mission(e, "stats", &request_id))?;

    Ok(Json(json!({
        "cpu": stats.cpu,
        "ram": stats.ram,
        "disk": stats.disk,
        "network": stats.network,
        "request_id": request_id.as_str(),
        "response_time_ms": stats.response_time_ms,
        "success": true,
    })))
}

async fn cpu(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let sample = state
        .aggregator
        .cpu()
        .await
        .map_err(|e| ApiError::mission(e, "cpu", &request_id))?;
    Ok(Json(
        json!({ "cpu": sample, "request_id": request_id.as_str(), "success": true }),
    ))
}

async fn ram(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let sample = state
        .aggregator
        .ram()
        .await
        .map_err(|e| ApiError::mission(e, "ram", &request_id))?;
    Ok(Json(
        json!({ "ram": sample, "request_id": request_id.as_str(), "success": true }),
    ))
}

async fn disk(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let sample = state
        .aggregator
        .disk()
        .await
        .map_err(|e| ApiError::mission(e, "disk", &request_id))?;
    Ok(Json(
        json!({ "disk": sample, "request_id": request_id.as_str(), "success": true }),
    ))
}

async fn network(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let sample = state
        .aggregator
        .network()
        .await
        .map_err(|e| ApiError::mission(e, "network", &request_id))?;
    Ok(Json(
        json!({ "network": sample, "request_id": request_id.as_str(), "success": true }),
    ))
}

async fn health(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> impl IntoResponse {
    let health = state.aggregator.system_health(request_id.as_str()).await;
    Json(WithRequestId {
        body: health,
        request_id: request_id.0,
    })
}

async fn health_basic() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "Hardware monitor running",
        "timestamp": unix_timestamp(),
    }))
}

async fn mission_status(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> impl IntoResponse {
    let status = state.aggregator.aggregate_health(request_id.as_str()).await;
    Json(WithRequestId {
        body: status,
        request_id: request_id.0,
    })
}

/// Record the query itself, then return every entry
async fn mission_logs(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> impl IntoResponse {
    state
        .aggregator
        .append_mission_log(
            "INFO",
            format!("MISSION LOGS REQUESTED - Request ID: {}", request_id),
            request_id.as_str(),
        )
        .await;

    let logs = state.aggregator.mission_logs().await;
    Json(json!({
        "total_logs": logs.len(),
        "logs": logs,
        "request_id": request_id.as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn add_mission_log(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<AddLogRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(request_id = %request_id, error = %rejection, "Unreadable mission log body");
        ApiError::BadRequest("Message is required".to_string())
    })?;
    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is required".to_string()))?;
    let level = request.level.unwrap_or_else(|| "INFO".to_string());

    let entry = state
        .aggregator
        .append_mission_log(&level, message, request_id.as_str())
        .await;
    let total_logs = state.aggregator.mission_log().len().await;

    Ok(Json(json!({
        "success": true,
        "log_added": entry,
        "total_logs": total_logs,
        "request_id": request_id.as_str(),
    })))
}

/// Liveness only; does not touch the host probes
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "alive",
        "mission_start": state.aggregator.mission_start().to_rfc3339(),
    }))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([REQUEST_ID_HEADER.clone()])
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/stats", get(stats))
        .route("/api/cpu", get(cpu))
        .route("/api/ram", get(ram))
        .route("/api/disk", get(disk))
        .route("/api/network", get(network))
        .route("/api/health", get(health))
        .route("/api/mission-status", get(mission_status))
        .route("/api/mission-logs", get(mission_logs))
        .route("/api/mission-logs/add", post(add_mission_log))
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            require_jwt,
        ));

    let basic = Router::new()
        .route("/api/health/basic", get(health_basic))
        .route_layer(middleware::from_fn_with_state(
            state.credentials.clone(),
            require_basic,
        ));

    let mut router = Router::new()
        .route("/api/login", post(login))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(protected)
        .merge(basic);

    if let Some(dir) = &state.static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.cors_origins))
        .layer(middleware::from_fn(assign_request_id))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
