/// HTTP API for the outreach workflows
///
/// The session provider sits in front of this service (API gateway). It
/// authenticates the athlete and forwards the user id in `x-user-id`;
/// gateway-to-service calls are authenticated with `x-internal-api-key`
/// when a key is configured.
mod identity;
mod outreach;

use crate::error::OutreachError;
use crate::models::Session;
use crate::services::{OutreachService, ReservationService};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

/// Shared HTTP server state
#[derive(Clone)]
pub struct AppState {
    pub reservation: ReservationService,
    pub outreach: OutreachService,
    pub internal_api_key: Option<String>,
}

/// Build the HTTP router with all API endpoints
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/v1/identity",
            get(identity::get_identity).post(identity::create_identity),
        )
        .route(
            "/v1/identity/availability",
            post(identity::check_availability),
        )
        .route(
            "/v1/identity/display-name",
            patch(identity::update_display_name),
        )
        .route("/v1/outreach/send", post(outreach::send_bulk))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint (no auth required)
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Validates the internal API key and attaches the caller's [`Session`]
async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    if let Some(expected_key) = &state.internal_api_key {
        let provided_key = request
            .headers()
            .get(INTERNAL_API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if provided_key != expected_key {
            warn!(
                path = %request.uri().path(),
                "Unauthorized request - invalid internal API key"
            );
            return OutreachError::Unauthenticated.into_response();
        }
    }

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok());

    let Some(user_id) = user_id else {
        return OutreachError::Unauthenticated.into_response();
    };

    let email = request
        .headers()
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let session = Session { user_id, email };
    request.extensions_mut().insert(session);

    next.run(request).await
}

/// Start HTTP server; returns once `shutdown` resolves and in-flight requests drain
pub async fn start_http_server<F>(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Starting outreach HTTP API server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
