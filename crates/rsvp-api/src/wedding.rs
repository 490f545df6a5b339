use axum::{Json, extract::State};
use tracing::info;

use rsvp_types::api::{ApiResponse, UpsertEventRequest};
use rsvp_types::models::WeddingEvent;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::Session;

/// GET /wedding. Public; `data` is null until the event has been set up.
pub async fn get_wedding(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<WeddingEvent>>>, ApiError> {
    let event = state.with_db(|db| db.get_event()).await?;
    Ok(Json(ApiResponse::ok(event)))
}

/// POST /wedding. Creates the event on first call, updates it after.
pub async fn upsert_wedding(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<UpsertEventRequest>,
) -> Result<Json<ApiResponse<WeddingEvent>>, ApiError> {
    session.require_editor()?;
    let input = req.validate()?;

    let event = state.with_db(move |db| db.upsert_event(&input)).await?;
    info!("Event details saved by {}: '{}' on {}", session.user_id, event.title, event.date);

    Ok(Json(ApiResponse::ok(event)))
}
