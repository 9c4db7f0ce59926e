//! Hushcalc — HTTP server.
//!
//! One calculator session lives in a single tokio task; HTTP handlers talk
//! to it through a `SessionHandle`.

pub mod actor;
pub mod config;
pub mod error;
pub mod ports;
pub mod routes;
pub mod state;

use axum::Router;

/// Builds the application router without middleware layers.
pub fn app(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/session", routes::session::router())
        .with_state(state)
}
