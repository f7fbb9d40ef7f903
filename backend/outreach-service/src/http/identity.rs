/// Identity reservation endpoints
use crate::error::OutreachError;
use crate::models::{AvailabilityStatus, EmailIdentity, Session};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateIdentityBody {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DisplayNameBody {
    pub display_name: String,
}

/// Identity plus whether the create action should be offered
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub identity: Option<IdentityView>,
    pub can_create: bool,
}

#[derive(Debug, Serialize)]
pub struct IdentityView {
    pub address: String,
    #[serde(flatten)]
    pub identity: EmailIdentity,
}

impl From<EmailIdentity> for IdentityView {
    fn from(identity: EmailIdentity) -> Self {
        Self {
            address: identity.address(),
            identity,
        }
    }
}

/// POST /v1/identity/availability
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityStatus>, OutreachError> {
    let status = state.reservation.availability_status(&body.username).await?;
    Ok(Json(status))
}

/// GET /v1/identity
pub async fn get_identity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<IdentityResponse>, OutreachError> {
    let identity = state.reservation.find_identity(&session).await?;
    Ok(Json(IdentityResponse {
        can_create: identity.is_none(),
        identity: identity.map(IdentityView::from),
    }))
}

/// POST /v1/identity
pub async fn create_identity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<CreateIdentityBody>,
) -> Result<impl IntoResponse, OutreachError> {
    let identity = state
        .reservation
        .reserve(&session, &body.username, &body.display_name)
        .await?;
    Ok((StatusCode::CREATED, Json(IdentityView::from(identity))))
}

/// PATCH /v1/identity/display-name
pub async fn update_display_name(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<DisplayNameBody>,
) -> Result<Json<IdentityView>, OutreachError> {
    let identity = state
        .reservation
        .update_display_name(&session, &body.display_name)
        .await?;
    Ok(Json(identity.into()))
}
