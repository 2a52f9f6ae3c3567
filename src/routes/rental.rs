//! Rental routes

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::handlers::rental;
use crate::state::AppState;

/// Create rental routes
pub fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rentals", post(rental::create_rental))
        .route("/api/rentals", get(rental::list_rentals))
        .route("/api/rentals/:id", get(rental::get_rental))
        .route("/api/rentals/:id", delete(rental::delete_rental))
        .route("/api/rentals/:id/status", patch(rental::update_rental_status))
        .route("/api/rentals/:id/pay", post(rental::pay_rental))
        .route("/api/rentals/:id/receipt", post(rental::upload_receipt))
        .route("/api/rentals/:id/receipt", patch(rental::validate_receipt))
}
