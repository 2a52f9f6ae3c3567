//! Sponsorship HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::sponsorship::{
    AdSponsorship, CreateSponsorshipRequest, ExtendSponsorshipRequest,
};
use crate::state::AppState;

/// POST /api/sponsorships - Create a sponsorship
pub async fn create_sponsorship(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateSponsorshipRequest>,
) -> Result<(StatusCode, Json<AdSponsorship>), ApiError> {
    let sponsorship = state
        .sponsorship_service
        .create(user.user_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(sponsorship)))
}

/// POST /api/sponsorships/:id/extend - Extend an active sponsorship
pub async fn extend_sponsorship(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sponsorship_id): Path<Uuid>,
    Json(req): Json<ExtendSponsorshipRequest>,
) -> Result<Json<AdSponsorship>, ApiError> {
    let sponsorship = state
        .sponsorship_service
        .extend(sponsorship_id, user.user_id, req)
        .await?;
    Ok(Json(sponsorship))
}

/// GET /api/sponsorships - The caller's sponsorships
pub async fn list_sponsorships(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<AdSponsorship>>, ApiError> {
    let sponsorships = state
        .sponsorship_service
        .list_for_sponsor(user.user_id)
        .await?;
    Ok(Json(sponsorships))
}

/// POST /api/sponsorships/:id/impression - Count an ad impression
pub async fn record_impression(
    State(state): State<AppState>,
    Path(sponsorship_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sponsorship_service
        .record_impression(sponsorship_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sponsorships/:id/click - Count an ad click
pub async fn record_click(
    State(state): State<AppState>,
    Path(sponsorship_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sponsorship_service
        .record_click(sponsorship_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SponsoredResponse {
    pub sponsored: bool,
}

/// GET /api/equipment/:id/sponsored - Whether the listing is sponsored
pub async fn equipment_sponsored(
    State(state): State<AppState>,
    Path(equipment_id): Path<Uuid>,
) -> Result<Json<SponsoredResponse>, ApiError> {
    let sponsored = state
        .sponsorship_service
        .is_equipment_sponsored(equipment_id)
        .await?;
    Ok(Json(SponsoredResponse { sponsored }))
}
