use axum::{
    Router,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::{guests, rsvp, users, wedding};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/wedding", get(wedding::get_wedding).post(wedding::upsert_wedding))
        .route("/rsvp", get(rsvp::get_rsvp).post(rsvp::upsert_rsvp))
        .route("/rsvp/all", get(rsvp::get_all_rsvps))
        .route("/rsvp/stats", get(rsvp::get_stats))
        .route(
            "/additional-guests",
            get(guests::list_guests)
                .post(guests::create_guest)
                .put(guests::update_guest)
                .delete(guests::delete_guest),
        )
        .route("/user/role", put(users::change_role))
        .route("/users", get(users::list_users))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
