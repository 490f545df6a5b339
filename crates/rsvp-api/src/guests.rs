use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{info, warn};

use rsvp_types::api::{
    ApiResponse, CreateGuestRequest, GuestIdQuery, GuestListQuery, UpdateGuestRequest,
};
use rsvp_types::models::{AdditionalGuest, Rsvp};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::Session;

/// Load the RSVP a guest hangs off; the RSVP's user is the owner every
/// guest operation is checked against.
async fn parent_rsvp(state: &AppState, rsvp_id: i64) -> Result<Rsvp, ApiError> {
    state
        .with_db(move |db| db.get_rsvp(rsvp_id))
        .await?
        .ok_or(ApiError::NotFound("RSVP not found"))
}

fn ensure_owner(session: &Session, rsvp: &Rsvp) -> Result<(), ApiError> {
    if session.can_write(&rsvp.user_id) {
        Ok(())
    } else {
        warn!(
            "User {} tried to modify guests of RSVP {} owned by {}",
            session.user_id, rsvp.id, rsvp.user_id
        );
        Err(ApiError::Forbidden("Not allowed to modify this RSVP"))
    }
}

fn required_id(id: Option<i64>) -> Result<i64, ApiError> {
    id.ok_or_else(|| ApiError::Validation("id is required".into()))
}

/// GET /additional-guests?rsvpId=
pub async fn list_guests(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(query): ApiQuery<GuestListQuery>,
) -> Result<Json<ApiResponse<Vec<AdditionalGuest>>>, ApiError> {
    let rsvp_id = query
        .rsvp_id
        .ok_or_else(|| ApiError::Validation("rsvpId is required".into()))?;

    let rsvp = parent_rsvp(&state, rsvp_id).await?;
    if !session.can_read(&rsvp.user_id) {
        return Err(ApiError::Forbidden("Not allowed to view this RSVP"));
    }

    let guests = state.with_db(move |db| db.list_guests_by_rsvp(rsvp_id)).await?;
    Ok(Json(ApiResponse::ok(guests)))
}

/// POST /additional-guests
pub async fn create_guest(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<CreateGuestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (rsvp_id, input) = req.validate()?;

    let rsvp = parent_rsvp(&state, rsvp_id).await?;
    ensure_owner(&session, &rsvp)?;

    let guest = state
        .with_db(move |db| db.create_guest(rsvp_id, &input))
        .await?
        .ok_or(ApiError::Conflict("This RSVP already has an additional guest"))?;
    info!("Additional guest {} added to RSVP {}", guest.id, rsvp_id);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(guest))))
}

/// PUT /additional-guests?id=
pub async fn update_guest(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(query): ApiQuery<GuestIdQuery>,
    ApiJson(req): ApiJson<UpdateGuestRequest>,
) -> Result<Json<ApiResponse<AdditionalGuest>>, ApiError> {
    let id = required_id(query.id)?;
    let input = req.validate()?;

    let existing = state
        .with_db(move |db| db.get_guest(id))
        .await?
        .ok_or(ApiError::NotFound("Additional guest not found"))?;
    let rsvp = parent_rsvp(&state, existing.rsvp_id).await?;
    ensure_owner(&session, &rsvp)?;

    // Deleted between the ownership check and the write.
    let guest = state
        .with_db(move |db| db.update_guest(id, &input))
        .await?
        .ok_or(ApiError::NotFound("Additional guest not found"))?;

    Ok(Json(ApiResponse::ok(guest)))
}

/// DELETE /additional-guests?id= succeeds when the guest is already gone.
pub async fn delete_guest(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(query): ApiQuery<GuestIdQuery>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = required_id(query.id)?;

    let Some(existing) = state.with_db(move |db| db.get_guest(id)).await? else {
        return Ok(Json(ApiResponse::ok(())));
    };
    let rsvp = parent_rsvp(&state, existing.rsvp_id).await?;
    ensure_owner(&session, &rsvp)?;

    if state.with_db(move |db| db.delete_guest(id)).await? {
        info!("Additional guest {} removed from RSVP {}", id, rsvp.id);
    }
    Ok(Json(ApiResponse::ok(())))
}
