pub mod api;
pub mod models;
pub mod policy;

pub use models::Role;
