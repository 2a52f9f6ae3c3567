//! Rental HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{AuthenticatedUser, ModeratorUser};
use crate::models::UserRole;
use crate::rental::{
    CreateRentalRequest, ListRentalsQuery, Rental, UpdateStatusRequest, UploadReceiptRequest,
    ValidateReceiptRequest,
};
use crate::state::AppState;

/// POST /api/rentals - Create a rental request
pub async fn create_rental(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateRentalRequest>,
) -> Result<(StatusCode, Json<Rental>), ApiError> {
    req.validate()?;
    let rental = state.rental_service.create(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

/// GET /api/rentals - Rentals visible to the caller
pub async fn list_rentals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListRentalsQuery>,
) -> Result<Json<Vec<Rental>>, ApiError> {
    let rentals = state
        .rental_service
        .list(user.user_id, user.role, query)
        .await?;
    Ok(Json(rentals))
}

/// GET /api/rentals/:id
pub async fn get_rental(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> Result<Json<Rental>, ApiError> {
    let rental = state.rental_service.get(rental_id).await?;

    let is_party = rental.renter_id == user.user_id || rental.owner_id == user.user_id;
    let is_staff = matches!(user.role, UserRole::Moderator | UserRole::Admin);
    if !is_party && !is_staff {
        return Err(ApiError::Forbidden(
            "not a party to this rental".to_string(),
        ));
    }

    Ok(Json(rental))
}

/// PATCH /api/rentals/:id/status - Lifecycle transition
pub async fn update_rental_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Rental>, ApiError> {
    let rental = state
        .rental_service
        .update_status(rental_id, req.status, user.user_id)
        .await?;
    Ok(Json(rental))
}

/// POST /api/rentals/:id/pay - Pay from the caller's wallet
pub async fn pay_rental(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> Result<Json<Rental>, ApiError> {
    let rental = state
        .rental_service
        .pay_with_wallet(rental_id, user.user_id)
        .await?;
    Ok(Json(rental))
}

/// POST /api/rentals/:id/receipt - Upload a payment receipt
pub async fn upload_receipt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
    Json(req): Json<UploadReceiptRequest>,
) -> Result<Json<Rental>, ApiError> {
    req.validate()?;
    let rental = state
        .rental_service
        .upload_payment_receipt(rental_id, user.user_id, &req.receipt_url)
        .await?;
    Ok(Json(rental))
}

/// PATCH /api/rentals/:id/receipt - Moderator decision on a receipt
pub async fn validate_receipt(
    State(state): State<AppState>,
    ModeratorUser(_moderator): ModeratorUser,
    Path(rental_id): Path<Uuid>,
    Json(req): Json<ValidateReceiptRequest>,
) -> Result<Json<Rental>, ApiError> {
    let rental = state
        .rental_service
        .validate_payment_receipt(rental_id, req)
        .await?;
    Ok(Json(rental))
}

/// DELETE /api/rentals/:id - Soft-delete a finished rental
pub async fn delete_rental(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(rental_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.rental_service.delete(rental_id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
