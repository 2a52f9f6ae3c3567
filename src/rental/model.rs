//! Rental models and lifecycle rules

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::PricePeriod;

/// Rental agreement between a renter and an equipment owner
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Rental {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub total_amount: Decimal,
    pub daily_rate: Decimal,
    pub price_period: PricePeriod,
    pub payment_method: PaymentMethod,
    pub status: RentalStatus,
    pub payment_status: PaymentStatus,
    pub payment_receipt_url: Option<String>,
    pub payment_receipt_status: Option<ReceiptStatus>,
    pub receipt_rejection_reason: Option<String>,
    pub has_priority: bool,
    pub priority_amount: Option<Decimal>,
    pub priority_paid_at: Option<DateTime<Utc>>,
    pub return_reminder_date: NaiveDate,
    pub return_notification_sent: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rental lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "rental_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Approved,
    Paid,
    Active,
    Completed,
    Cancelled,
    Rejected,
}

impl RentalStatus {
    /// Whether this transition is legal in the lifecycle state machine.
    /// PAID is only reachable through the payment paths, never through a
    /// plain status update.
    pub fn can_transition_to(self, next: RentalStatus) -> bool {
        use RentalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
                | (Paid, Active)
                | (Paid, Completed)
                | (Active, Completed)
        )
    }

    /// States that hold the equipment (block other rentals)
    pub fn holds_equipment(self) -> bool {
        matches!(
            self,
            RentalStatus::Approved | RentalStatus::Paid | RentalStatus::Active
        )
    }
}

/// Payment progress, independent of the lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// How the renter pays
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Reference,
    Receipt,
    Wallet,
}

/// Moderation state of an uploaded payment receipt
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "receipt_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Pending,
    Approved,
    Rejected,
}

/// Request DTO for creating a rental
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRentalRequest {
    pub equipment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub total_amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub has_priority: Option<bool>,
    pub priority_amount: Option<Decimal>,
}

/// Request DTO for a status transition
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RentalStatus,
}

/// Request DTO for uploading a payment receipt
#[derive(Debug, Deserialize, Validate)]
pub struct UploadReceiptRequest {
    #[validate(length(min = 1))]
    pub receipt_url: String,
}

/// Moderator decision on an uploaded receipt
#[derive(Debug, Deserialize)]
pub struct ValidateReceiptRequest {
    pub decision: ReceiptDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptDecision {
    Approved,
    Rejected,
}

/// Query parameters for listing rentals
#[derive(Debug, Deserialize)]
pub struct ListRentalsQuery {
    pub status: Option<RentalStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

/// Number of rental days, end-exclusive
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Number of billable periods for the given price period; a partial
/// week/month bills as a whole one
pub fn billable_periods(days: i64, period: PricePeriod) -> i64 {
    match period {
        PricePeriod::Hourly => days * 8,
        PricePeriod::Daily => days,
        PricePeriod::Weekly => (days + 6) / 7,
        PricePeriod::Monthly => (days + 29) / 30,
    }
}

/// Total rental price from the listing rate and date range
pub fn compute_total_amount(
    rate: Decimal,
    start: NaiveDate,
    end: NaiveDate,
    period: PricePeriod,
) -> Decimal {
    rate * Decimal::from(billable_periods(rental_days(start, end), period))
}
