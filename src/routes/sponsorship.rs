//! Sponsorship routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::sponsorship;
use crate::state::AppState;

/// Create sponsorship routes
pub fn sponsorship_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sponsorships", post(sponsorship::create_sponsorship))
        .route("/api/sponsorships", get(sponsorship::list_sponsorships))
        .route(
            "/api/sponsorships/:id/extend",
            post(sponsorship::extend_sponsorship),
        )
        .route(
            "/api/sponsorships/:id/impression",
            post(sponsorship::record_impression),
        )
        .route(
            "/api/sponsorships/:id/click",
            post(sponsorship::record_click),
        )
        .route(
            "/api/equipment/:id/sponsored",
            get(sponsorship::equipment_sponsored),
        )
}
