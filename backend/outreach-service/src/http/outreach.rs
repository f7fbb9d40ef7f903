/// Bulk outreach endpoint
use crate::error::OutreachError;
use crate::models::{BulkSendReport, OutreachDraft, Session};
use axum::{
    extract::{Extension, State},
    response::Json,
};
use std::sync::Arc;

use super::AppState;

/// POST /v1/outreach/send
pub async fn send_bulk(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(draft): Json<OutreachDraft>,
) -> Result<Json<BulkSendReport>, OutreachError> {
    let report = state.outreach.send_bulk(&session, &draft).await?;
    Ok(Json(report))
}
