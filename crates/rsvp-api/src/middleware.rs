use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{debug, warn};

use rsvp_types::models::{Role, User};
use rsvp_types::policy;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// The authenticated caller. Resolved from the bearer token's subject and the
/// current user row, so a role change takes effect on the next request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

impl Session {
    pub fn require_editor(&self) -> Result<(), ApiError> {
        if policy::can_edit_event(self.role) {
            Ok(())
        } else {
            warn!("User {} ({}) denied editor access", self.user_id, self.role);
            Err(ApiError::Forbidden("Editor access required"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if policy::is_admin(self.role) {
            Ok(())
        } else {
            warn!("User {} ({}) denied admin access", self.user_id, self.role);
            Err(ApiError::Forbidden("Admin access required"))
        }
    }

    /// Owners read their own records; editors and admins read everyone's.
    pub fn can_read(&self, owner_id: &str) -> bool {
        self.user_id == owner_id || policy::can_edit_event(self.role)
    }

    /// Only the owner writes.
    pub fn can_write(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthenticated)?;

        let claims = decode_token(bearer.token(), &state.jwt_secret).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::Unauthenticated
        })?;

        let user = state
            .with_db(move |db| db.get_user_by_id(&claims.sub))
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self::from(user))
    }
}
