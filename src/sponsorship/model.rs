//! Ad sponsorship models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Paid sponsorship placement. With no equipment reference the placement
/// covers all of the sponsor's equipment.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AdSponsorship {
    pub id: Uuid,
    pub sponsor_id: Uuid,
    pub equipment_id: Option<Uuid>,
    pub amount: Decimal,
    pub duration_days: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SponsorshipStatus,
    pub impressions: i64,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sponsorship lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "sponsorship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SponsorshipStatus {
    Active,
    Paused,
    Expired,
    Cancelled,
}

/// Request DTO for creating a sponsorship
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSponsorshipRequest {
    pub equipment_id: Option<Uuid>,
    pub amount: Decimal,
    pub duration_days: i32,
}

/// Request DTO for extending a sponsorship
#[derive(Debug, Deserialize, Validate)]
pub struct ExtendSponsorshipRequest {
    pub extra_days: i32,
    pub extra_amount: Decimal,
}
