//! # Gradus HTTP API Module
//!
//! This module implements the HTTP REST API server using axum. Every
//! lifecycle verb maps to one route; mutations carry the declared actor
//! in the JSON body, reads carry it as the `actor_id` query parameter.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `GET  /status` - Roster counts
//! - `POST /users` - Register a user (bootstrap, then admin-only)
//! - `GET  /users` - List the directory (admin-only)
//! - `POST /users/{id}/deactivate` - Deactivate a user (admin-only)
//! - `POST /groups` + per-group action routes (approve, reject, resubmit,
//!   adviser, panel, members/remove, update)
//! - `POST /theses` + per-thesis action routes (submit, resubmit,
//!   adviser-review, panel-review, schedule, conclude, begin-research,
//!   archive)
//! - `POST /schedules`, `POST /schedules/{id}/status`
//! - `POST /export` - Binary roster snapshot, base64-encoded
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `GRADUS_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `GRADUS_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `GRADUS_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `gradus::api::*`)
#[allow(unused_imports)]
pub use types::{
    ActorRequest, AssignAdviserRequest, AssignPanelRequest, CreateGroupRequest,
    CreateScheduleRequest, CreateThesisRequest, ErrorBody, ExportResponse, GroupListResponse,
    GroupResponse, HealthResponse, RegisterUserRequest, RejectRequest, RemoveMemberRequest,
    ReviewRequest, ScheduleResponse, ScheduleStatusRequest, StatusResponse, ThesisListResponse,
    ThesisResponse, UpdateGroupRequest, UserResponse, error_response, parse_disposition,
    parse_role, parse_schedule_status, parse_stage,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use gradus_core::{Engine, GradusError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the lifecycle engine.
#[derive(Clone)]
pub struct AppState {
    /// The engine behind a read/write lock: many concurrent reads, one
    /// writer per accepted transition.
    pub engine: Arc<RwLock<Engine>>,
}

impl AppState {
    /// Create new app state around an engine.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `GRADUS_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("GRADUS_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (GRADUS_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in GRADUS_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No GRADUS_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against overload (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "⚠️  API key authentication DISABLED - all endpoints are publicly accessible! \
             Set GRADUS_API_KEY environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/users",
            post(handlers::register_user_handler).get(handlers::list_users_handler),
        )
        .route(
            "/users/{id}/deactivate",
            post(handlers::deactivate_user_handler),
        )
        .route(
            "/groups",
            post(handlers::create_group_handler).get(handlers::list_groups_handler),
        )
        .route(
            "/groups/{id}",
            get(handlers::get_group_handler).delete(handlers::delete_group_handler),
        )
        .route("/groups/{id}/update", post(handlers::update_group_handler))
        .route("/groups/{id}/approve", post(handlers::approve_group_handler))
        .route("/groups/{id}/reject", post(handlers::reject_group_handler))
        .route(
            "/groups/{id}/resubmit",
            post(handlers::resubmit_group_handler),
        )
        .route("/groups/{id}/adviser", post(handlers::assign_adviser_handler))
        .route("/groups/{id}/panel", post(handlers::assign_panel_handler))
        .route(
            "/groups/{id}/members/remove",
            post(handlers::remove_member_handler),
        )
        .route(
            "/theses",
            post(handlers::create_thesis_handler).get(handlers::list_theses_handler),
        )
        .route("/theses/{id}", get(handlers::get_thesis_handler))
        .route("/theses/{id}/submit", post(handlers::submit_handler))
        .route("/theses/{id}/resubmit", post(handlers::resubmit_handler))
        .route(
            "/theses/{id}/adviser-review",
            post(handlers::adviser_review_handler),
        )
        .route(
            "/theses/{id}/panel-review",
            post(handlers::panel_review_handler),
        )
        .route(
            "/theses/{id}/schedule",
            post(handlers::schedule_defense_handler),
        )
        .route(
            "/theses/{id}/conclude",
            post(handlers::conclude_defense_handler),
        )
        .route(
            "/theses/{id}/begin-research",
            post(handlers::begin_research_handler),
        )
        .route("/theses/{id}/archive", post(handlers::archive_handler))
        .route("/schedules", post(handlers::create_schedule_handler))
        .route(
            "/schedules/{id}/status",
            post(handlers::schedule_status_handler),
        )
        .route("/export", post(handlers::export_handler))
        .fallback(handlers::not_found_handler);

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, engine: Engine) -> Result<(), GradusError> {
    let state = AppState::new(engine);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GradusError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Gradus HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| GradusError::IoError(format!("Server error: {}", e)))
}
