pub mod auth;
pub mod error;
pub mod extract;
pub mod guests;
pub mod mailer;
pub mod middleware;
pub mod router;
pub mod rsvp;
pub mod users;
pub mod wedding;

pub use auth::{AppState, AppStateInner};
pub use router::router;
