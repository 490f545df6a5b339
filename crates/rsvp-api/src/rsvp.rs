use axum::{Json, extract::State};
use tracing::{info, warn};

use rsvp_types::api::{ApiResponse, RsvpQuery, UpsertRsvpRequest};
use rsvp_types::models::{Rsvp, RsvpStats, RsvpWithGuests};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::mailer;
use crate::middleware::Session;

/// GET /rsvp?userId= returns a user's own RSVP, or anyone's for editors.
pub async fn get_rsvp(
    State(state): State<AppState>,
    session: Session,
    ApiQuery(query): ApiQuery<RsvpQuery>,
) -> Result<Json<ApiResponse<Option<Rsvp>>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("userId is required".into()))?;

    if !session.can_read(&user_id) {
        warn!("User {} tried to read RSVP of {}", session.user_id, user_id);
        return Err(ApiError::Forbidden("Not allowed to view this RSVP"));
    }

    let rsvp = state.with_db(move |db| db.get_rsvp_by_user(&user_id)).await?;
    Ok(Json(ApiResponse::ok(rsvp)))
}

/// POST /rsvp submits or overwrites the caller's RSVP.
pub async fn upsert_rsvp(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<UpsertRsvpRequest>,
) -> Result<Json<ApiResponse<Rsvp>>, ApiError> {
    let input = req.validate()?;

    if !session.can_write(&input.user_id) {
        warn!("User {} tried to submit an RSVP for {}", session.user_id, input.user_id);
        return Err(ApiError::Forbidden("Cannot submit an RSVP for another user"));
    }

    let rsvp = state.with_db(move |db| db.upsert_rsvp(&input)).await?;
    info!(
        "RSVP {} saved for {}: attending={}",
        rsvp.id, rsvp.user_id, rsvp.attending
    );

    send_confirmation(state, session, rsvp.clone());

    Ok(Json(ApiResponse::ok(rsvp)))
}

/// GET /rsvp/all returns the full roster. Editors and admins only.
pub async fn get_all_rsvps(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<RsvpWithGuests>>>, ApiError> {
    session.require_editor()?;
    let roster = state.with_db(|db| db.get_all_rsvps_with_guests()).await?;
    Ok(Json(ApiResponse::ok(roster)))
}

/// GET /rsvp/stats returns response and headcount totals. Editors and admins only.
pub async fn get_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<RsvpStats>>, ApiError> {
    session.require_editor()?;
    let roster = state.with_db(|db| db.get_all_rsvps_with_guests()).await?;
    Ok(Json(ApiResponse::ok(RsvpStats::from_roster(&roster))))
}

/// Mail goes out in the background; a delivery failure never fails the RSVP.
fn send_confirmation(state: AppState, session: Session, rsvp: Rsvp) {
    tokio::spawn(async move {
        let event = match state.with_db(|db| db.get_event()).await {
            Ok(event) => event,
            Err(e) => {
                warn!("Could not load event for confirmation mail: {}", e);
                None
            }
        };
        let email = mailer::rsvp_confirmation(&session.name, &session.email, &rsvp, event.as_ref());
        if let Err(e) = state.mailer.send(&email).await {
            warn!("Confirmation mail to {} failed: {:#}", session.email, e);
        }
    });
}
