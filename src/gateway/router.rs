//! HTTP router and handlers

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use prompt_gateway_core::{PromptRecord, PromptStore, substitute_variables};
use serde_json::{Map, Value, json};
use tokio::sync::Semaphore;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::auth::{AuthRejection, authorize};
use super::exposure::ExposureMap;
use super::logs::{LogBuffer, LogEntry};
use super::metrics::Metrics;
use super::rate_limit::IpRateLimiter;
use crate::config::{LogLevel, ServerConfig};

/// Shared application state
pub struct AppState {
    /// Live configuration, snapshotted per request
    pub config: RwLock<ServerConfig>,
    /// Currently exposed prompts, swapped wholesale
    pub exposure: RwLock<Arc<ExposureMap>>,
    /// Read-only prompt lookup
    pub store: Arc<dyn PromptStore>,
    /// Per-IP request windows
    pub rate_limiter: IpRateLimiter,
    /// Request counters
    pub metrics: Arc<Metrics>,
    /// Recent gateway log entries
    pub logs: LogBuffer,
    /// Bounds concurrently processed requests; resized on start
    pub inflight: RwLock<Arc<Semaphore>>,
}

impl AppState {
    /// Create state with an empty exposure set
    pub fn new(config: ServerConfig, store: Arc<dyn PromptStore>) -> Self {
        let permits = config.max_connections.max(1);
        Self {
            config: RwLock::new(config),
            exposure: RwLock::new(Arc::new(ExposureMap::default())),
            store,
            rate_limiter: IpRateLimiter::new(),
            metrics: Arc::new(Metrics::new()),
            logs: LogBuffer::default(),
            inflight: RwLock::new(Arc::new(Semaphore::new(permits))),
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> ServerConfig {
        self.config.read().clone()
    }

    /// Snapshot of the current exposure set
    pub fn exposure(&self) -> Arc<ExposureMap> {
        self.exposure.read().clone()
    }

    /// Record a gateway log entry, mirroring it to the console when enabled
    pub fn log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) {
        let entry = LogEntry::new(level, message, data);
        let mirror = {
            let config = self.config.read();
            config.enable_logging && level >= config.log_level
        };
        if mirror {
            entry.mirror();
        }
        self.logs.push(entry);
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler).fallback(not_found_handler))
        .route("/prompts", get(list_prompts_handler).fallback(not_found_handler))
        .route(
            "/prompts/{hash}",
            get(get_prompt_handler).fallback(not_found_handler),
        )
        .route(
            "/prompts/{hash}/execute",
            post(execute_handler).fallback(not_found_handler),
        )
        .fallback(not_found_handler)
        // Inside the gatekeeper so panics are counted as 500s
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            gatekeeper,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request pipeline applied before routing:
/// count → log → track connection → preflight → in-flight permit → rate limit → auth.
async fn gatekeeper(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let config = state.config();
    let ip = client_ip(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.record_request();
    state.log(
        LogLevel::Info,
        format!("{method} {path}"),
        Some(json!({ "ip": ip })),
    );
    let _connection = state.metrics.track_connection();

    let mut response = if method == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let inflight = state.inflight.read().clone();
        // The semaphore is never closed; a failed acquire just skips the bound
        let _permit = inflight.acquire_owned().await.ok();
        admit(&state, &config, &ip, &path, request, next).await
    };

    state.metrics.record_response(response.status());
    if config.enable_cors {
        apply_cors_headers(response.headers_mut());
    }
    response
}

/// Rate limit and authenticate, then hand the request to its route
async fn admit(
    state: &AppState,
    config: &ServerConfig,
    ip: &str,
    path: &str,
    request: Request,
    next: Next,
) -> Response {
    if let Err(retry_after) = state.rate_limiter.check(ip, config.rate_limit) {
        state.log(
            LogLevel::Warn,
            "Rate limit exceeded",
            Some(json!({ "ip": ip, "path": path })),
        );
        return rate_limited_response(retry_after);
    }

    if let Err(rejection) = authorize(config, request.headers()) {
        state.log(
            LogLevel::Warn,
            "Unauthorized request",
            Some(json!({ "ip": ip, "path": path, "reason": rejection.message() })),
        );
        return unauthorized_response(rejection);
    }

    // axum answers HEAD from any GET route
    if request.method() == Method::HEAD {
        return not_found("Endpoint not found");
    }

    next.run(request).await
}

/// Remote address of the connection, or `"unknown"`
fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |ConnectInfo(addr)| addr.ip().to_string())
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// `{error, message}` body with the given status
fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

fn not_found(message: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", message)
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        "An unexpected error occurred",
    )
}

fn unauthorized_response(rejection: AuthRejection) -> Response {
    let mut response = error_response(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        rejection.message(),
    );
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer"),
    );
    response
}

fn rate_limited_response(retry_after: Duration) -> Response {
    let mut response = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests",
        "Rate limit exceeded. Try again later.",
    );
    // Round up so clients never retry inside the window
    let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    internal_error()
}

async fn not_found_handler() -> Response {
    not_found("Endpoint not found")
}

/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({
        "status": "healthy",
        "uptime": state.metrics.uptime_seconds(),
        "exposedPrompts": state.exposure().len(),
    }))
    .into_response()
}

/// GET /prompts
async fn list_prompts_handler(State(state): State<Arc<AppState>>) -> Response {
    let exposure = state.exposure();
    let ids = exposure.prompt_ids();

    let rows = match state.store.get_prompts_by_ids(&ids).await {
        Ok(rows) => rows,
        Err(e) => {
            state.log(
                LogLevel::Error,
                "Failed to list exposed prompts",
                Some(json!({ "error": e.to_string(), "prompt_count": ids.len() })),
            );
            return internal_error();
        }
    };

    let mut prompts = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(hash) = exposure.hash_for(row.id) else {
            state.log(
                LogLevel::Warn,
                "No secure hash for exposed prompt, skipping",
                Some(json!({ "prompt_id": row.id })),
            );
            continue;
        };
        prompts.push(json!({
            "id": hash,
            "title": row.title,
            "description": row.description,
            "category": row.category_name,
            "tags": row.tags,
            "endpoint": format!("/prompts/{hash}"),
        }));
    }

    Json(json!({ "count": prompts.len(), "prompts": prompts })).into_response()
}

/// Resolve a hash and fetch its prompt, mapping every failure to a response
async fn resolve_prompt(state: &AppState, hash: &str) -> Result<PromptRecord, Response> {
    let Some(prompt_id) = state.exposure().prompt_id(hash) else {
        return Err(not_found("Prompt not found"));
    };
    fetch_prompt(state, hash, prompt_id).await
}

async fn fetch_prompt(
    state: &AppState,
    hash: &str,
    prompt_id: i64,
) -> Result<PromptRecord, Response> {
    match state.store.get_prompt_by_id(prompt_id).await {
        Ok(Some(prompt)) => Ok(prompt),
        Ok(None) => {
            state.log(
                LogLevel::Warn,
                "Exposed prompt no longer exists",
                Some(json!({ "hash": hash, "prompt_id": prompt_id })),
            );
            Err(not_found("Prompt not found"))
        }
        Err(e) => {
            state.log(
                LogLevel::Error,
                "Failed to load prompt",
                Some(json!({ "hash": hash, "prompt_id": prompt_id, "error": e.to_string() })),
            );
            Err(internal_error())
        }
    }
}

/// GET /prompts/{hash}
async fn get_prompt_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Response {
    let prompt = match resolve_prompt(&state, &hash).await {
        Ok(prompt) => prompt,
        Err(response) => return response,
    };

    Json(json!({
        "id": hash,
        "title": prompt.title,
        "description": prompt.description,
        "content": prompt.content,
        "category": prompt.category_name,
        "tags": prompt.tags,
        "metadata": {
            "created_at": prompt.created_at,
            "updated_at": prompt.updated_at,
            "is_favorite": prompt.is_favorite,
        },
    }))
    .into_response()
}

/// POST /prompts/{hash}/execute
async fn execute_handler(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    body: Body,
) -> Response {
    let Some(prompt_id) = state.exposure().prompt_id(&hash) else {
        return not_found("Prompt not found");
    };

    let request: Value = match read_json_body(&state, body).await {
        Ok(value) => value,
        Err(response) => return response,
    };

    let prompt = match fetch_prompt(&state, &hash, prompt_id).await {
        Ok(prompt) => prompt,
        Err(response) => return response,
    };

    let variables: Map<String, Value> = request
        .get("variables")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let content = substitute_variables(&prompt.content, &variables);

    state.log(
        LogLevel::Debug,
        "Prompt executed",
        Some(json!({ "hash": hash, "variables": variables.len() })),
    );

    Json(json!({
        "prompt": content,
        "metadata": {
            "title": prompt.title,
            "description": prompt.description,
            "parameters_applied": variables,
        },
    }))
    .into_response()
}

/// Buffer the whole body under the configured timeout and size cap, then parse.
///
/// An empty body reads as `{}`.
async fn read_json_body(state: &AppState, body: Body) -> Result<Value, Response> {
    let (timeout, limit) = {
        let config = state.config.read();
        (config.body_timeout, config.max_body_size)
    };

    let bytes = match tokio::time::timeout(timeout, axum::body::to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            state.log(
                LogLevel::Warn,
                "Failed to read request body",
                Some(json!({ "error": e.to_string() })),
            );
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Bad request",
                "Request body could not be read",
            ));
        }
        Err(_) => {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            state.log(
                LogLevel::Warn,
                "Request body timed out",
                Some(json!({ "timeout_ms": timeout_ms })),
            );
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Bad request",
                "Request body was not received in time",
            ));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        state.log(
            LogLevel::Warn,
            "Invalid JSON body",
            Some(json!({ "error": e.to_string() })),
        );
        error_response(StatusCode::BAD_REQUEST, "Invalid JSON", "Request body must be valid JSON")
    })
}
