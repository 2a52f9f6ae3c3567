//! Shared data models for the RentHub backend
//!
//! Users and equipment are owned by the identity/catalog service; this
//! crate reads them and writes nothing except the equipment availability
//! flag. The lifecycle-owned entities live in their own modules
//! (`wallet`, `rental`, `sponsorship`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Renter,
    Landlord,
    Moderator,
    Admin,
}

/// Equipment listing model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Equipment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub daily_rate: Decimal,
    pub price_period: PricePeriod,
    pub is_available: bool,
    pub max_rental_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Billing period for an equipment listing's rate
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "price_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}
