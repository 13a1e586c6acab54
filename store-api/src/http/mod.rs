//! HTTP layer: Axum router, handlers, and responses.
//!
//! Exposes the item and store resources, user registration, and the `/auth`
//! token endpoint.

mod auth;
mod error;
mod handlers;
mod payload;
mod responses;
mod state;


pub use handlers::router;
pub use state::AppState;
