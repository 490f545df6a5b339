use axum::{Json, extract::State};
use tracing::info;

use rsvp_types::api::{ApiResponse, ChangeRoleRequest};
use rsvp_types::models::User;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::Session;

/// PUT /user/role. Admin only.
pub async fn change_role(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<ChangeRoleRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    session.require_admin()?;
    let (user_id, role) = req.validate()?;

    let user = state
        .with_db(move |db| db.set_user_role(&user_id, role))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    info!("User {} set role of {} to {}", session.user_id, user.id, user.role);

    Ok(Json(ApiResponse::ok(user)))
}

/// GET /users. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    session.require_admin()?;
    let users = state.with_db(|db| db.list_users()).await?;
    Ok(Json(ApiResponse::ok(users)))
}
