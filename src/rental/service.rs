//! Rental service layer - lifecycle business logic
//!
//! Owns the rental state machine and the cross-entity rule that
//! equipment availability mirrors "some rental currently holds the
//! equipment". Approval runs in one database transaction so a rental
//! created concurrently cannot slip past the sibling auto-reject.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::CatalogService;
use crate::error::DomainError;
use crate::models::UserRole;
use crate::notifier::Notifier;
use crate::rental::model::{
    compute_total_amount, rental_days, CreateRentalRequest, ListRentalsQuery, PaymentMethod,
    PaymentStatus, ReceiptDecision, ReceiptStatus, Rental, RentalStatus, ValidateReceiptRequest,
};
use crate::wallet::{TransactionType, WalletService};

/// Rental service for managing the rental lifecycle
#[derive(Clone)]
pub struct RentalService {
    db_pool: PgPool,
    catalog: CatalogService,
    wallet: WalletService,
    notifier: Arc<dyn Notifier>,
    max_rental_days: i64,
}

impl RentalService {
    pub fn new(
        db_pool: PgPool,
        catalog: CatalogService,
        wallet: WalletService,
        notifier: Arc<dyn Notifier>,
        max_rental_days: i64,
    ) -> Self {
        Self {
            db_pool,
            catalog,
            wallet,
            notifier,
            max_rental_days,
        }
    }

    /// Create a rental request. Equipment availability is untouched here;
    /// it only changes on approval.
    pub async fn create(
        &self,
        renter_id: Uuid,
        request: CreateRentalRequest,
    ) -> Result<Rental, DomainError> {
        let equipment = self.catalog.get_equipment(request.equipment_id).await?;
        if !equipment.is_available {
            return Err(DomainError::InvalidState(
                "equipment is not available for rent".to_string(),
            ));
        }
        if equipment.owner_id == renter_id {
            return Err(DomainError::Validation(
                "cannot rent your own equipment".to_string(),
            ));
        }

        let renter = self.catalog.get_user(renter_id).await?;
        if renter.role == UserRole::Landlord {
            return Err(DomainError::Forbidden(
                "landlord accounts cannot create rentals".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        if request.start_date < today {
            return Err(DomainError::Validation(
                "start date must be today or later".to_string(),
            ));
        }
        if request.end_date <= request.start_date {
            return Err(DomainError::Validation(
                "end date must be after start date".to_string(),
            ));
        }

        let days = rental_days(request.start_date, request.end_date);
        let cap = equipment
            .max_rental_days
            .map(i64::from)
            .unwrap_or(self.max_rental_days);
        if days > cap {
            return Err(DomainError::Validation(format!(
                "rental length of {} days exceeds the {} day maximum",
                days, cap
            )));
        }

        let total_amount = request.total_amount.unwrap_or_else(|| {
            compute_total_amount(
                equipment.daily_rate,
                request.start_date,
                request.end_date,
                equipment.price_period,
            )
        });
        if total_amount <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "total amount must be positive".to_string(),
            ));
        }

        let has_priority = request.has_priority.unwrap_or(false);
        let priority_amount = request.priority_amount.filter(|a| *a > Decimal::ZERO);
        let wants_priority = has_priority && priority_amount.is_some();
        let return_reminder_date = request.end_date - Duration::days(1);

        let rental = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (
                equipment_id, renter_id, owner_id, start_date, end_date,
                start_time, end_time, total_amount, daily_rate, price_period,
                payment_method, has_priority, priority_amount, return_reminder_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(equipment.id)
        .bind(renter_id)
        .bind(equipment.owner_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.start_time)
        .bind(&request.end_time)
        .bind(total_amount)
        .bind(equipment.daily_rate)
        .bind(equipment.price_period)
        .bind(request.payment_method.unwrap_or(PaymentMethod::Reference))
        .bind(wants_priority)
        .bind(if wants_priority { priority_amount } else { None })
        .bind(return_reminder_date)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            rental_id = %rental.id,
            equipment_id = %equipment.id,
            renter_id = %renter_id,
            total = %total_amount,
            "Rental created"
        );

        if wants_priority {
            return Ok(self.apply_priority_fee(rental).await);
        }
        Ok(rental)
    }

    /// Best-effort priority fee debit after creation. A failed debit
    /// clears the priority fields instead of failing the rental.
    async fn apply_priority_fee(&self, rental: Rental) -> Rental {
        let amount = match rental.priority_amount {
            Some(a) => a,
            None => return rental,
        };

        let debit = async {
            let wallet = self.wallet.get_or_create(rental.renter_id).await?;
            let mut metadata = HashMap::new();
            metadata.insert("rental_id".to_string(), serde_json::json!(rental.id));
            self.wallet
                .apply_transaction(
                    wallet.id,
                    TransactionType::PriorityFee,
                    -amount,
                    "Rental priority placement fee",
                    Some(metadata),
                )
                .await
        };

        match debit.await {
            Ok(_) => {
                match sqlx::query_as::<_, Rental>(
                    "UPDATE rentals SET priority_paid_at = now(), updated_at = now() WHERE id = $1 RETURNING *",
                )
                .bind(rental.id)
                .fetch_one(&self.db_pool)
                .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        tracing::error!(rental_id = %rental.id, error = %e, "Failed to stamp priority payment");
                        rental
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    rental_id = %rental.id,
                    error = %e,
                    "Priority fee debit failed, clearing priority fields"
                );
                match sqlx::query_as::<_, Rental>(
                    r#"
                    UPDATE rentals
                    SET has_priority = FALSE, priority_amount = NULL,
                        priority_paid_at = NULL, updated_at = now()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(rental.id)
                .fetch_one(&self.db_pool)
                .await
                {
                    Ok(updated) => updated,
                    Err(e) => {
                        tracing::error!(rental_id = %rental.id, error = %e, "Failed to clear priority fields");
                        rental
                    }
                }
            }
        }
    }

    /// Transition a rental's lifecycle status
    pub async fn update_status(
        &self,
        rental_id: Uuid,
        new_status: RentalStatus,
        actor_id: Uuid,
    ) -> Result<Rental, DomainError> {
        let rental = self.get(rental_id).await?;

        if !rental.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidState(format!(
                "cannot move rental from {:?} to {:?}",
                rental.status, new_status
            )));
        }

        match new_status {
            RentalStatus::Cancelled => {
                if actor_id != rental.renter_id && actor_id != rental.owner_id {
                    return Err(DomainError::Forbidden(
                        "only the renter or the owner may cancel".to_string(),
                    ));
                }
            }
            _ => {
                if actor_id != rental.owner_id {
                    return Err(DomainError::Forbidden(
                        "only the equipment owner may perform this transition".to_string(),
                    ));
                }
            }
        }

        let updated = match new_status {
            RentalStatus::Approved => self.approve(&rental).await?,
            RentalStatus::Cancelled | RentalStatus::Rejected => {
                let updated = self
                    .transition_guarded(rental.id, rental.status, new_status)
                    .await?;
                self.release_equipment_if_free(rental.equipment_id).await?;
                if new_status == RentalStatus::Cancelled {
                    self.notify_cancellation(&updated).await;
                }
                updated
            }
            RentalStatus::Completed => {
                let updated = self
                    .transition_guarded(rental.id, rental.status, new_status)
                    .await?;
                self.release_equipment_if_free(rental.equipment_id).await?;
                updated
            }
            _ => {
                self.transition_guarded(rental.id, rental.status, new_status)
                    .await?
            }
        };

        tracing::info!(
            rental_id = %rental_id,
            from = ?rental.status,
            to = ?new_status,
            actor = %actor_id,
            "Rental status updated"
        );
        Ok(updated)
    }

    /// Approve: stamp, take the equipment, and auto-reject every other
    /// pending request for it - atomically, so a concurrently created
    /// request cannot escape the sweep.
    async fn approve(&self, rental: &Rental) -> Result<Rental, DomainError> {
        let mut tx = self.db_pool.begin().await?;

        let updated = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET status = 'approved', approved_at = now(), updated_at = now()
            WHERE id = $1 AND status = 'pending' AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(rental.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            DomainError::InvalidState("rental is no longer pending".to_string())
        })?;

        sqlx::query("UPDATE equipment SET is_available = FALSE, updated_at = now() WHERE id = $1")
            .bind(rental.equipment_id)
            .execute(&mut *tx)
            .await?;

        let rejected = sqlx::query(
            r#"
            UPDATE rentals
            SET status = 'rejected', updated_at = now()
            WHERE equipment_id = $1 AND id != $2 AND status = 'pending' AND deleted_at IS NULL
            "#,
        )
        .bind(rental.equipment_id)
        .bind(rental.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if rejected.rows_affected() > 0 {
            tracing::info!(
                equipment_id = %rental.equipment_id,
                count = rejected.rows_affected(),
                "Auto-rejected competing pending rentals"
            );
        }
        Ok(updated)
    }

    /// Status update guarded on the expected current status, so a
    /// concurrent transition loses cleanly instead of being overwritten
    async fn transition_guarded(
        &self,
        rental_id: Uuid,
        from: RentalStatus,
        to: RentalStatus,
    ) -> Result<Rental, DomainError> {
        sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET status = $1, updated_at = now()
            WHERE id = $2 AND status = $3 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(rental_id)
        .bind(from)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| DomainError::InvalidState("rental state changed concurrently".to_string()))
    }

    /// Pay for an approved rental out of the renter's wallet
    pub async fn pay_with_wallet(
        &self,
        rental_id: Uuid,
        payer_id: Uuid,
    ) -> Result<Rental, DomainError> {
        let rental = self.get(rental_id).await?;

        if payer_id != rental.renter_id {
            return Err(DomainError::Forbidden(
                "only the renter may pay for this rental".to_string(),
            ));
        }
        if rental.payment_status == PaymentStatus::Paid {
            return Err(DomainError::InvalidState(
                "rental is already paid".to_string(),
            ));
        }
        if rental.status != RentalStatus::Approved {
            return Err(DomainError::InvalidState(
                "rental must be approved before payment".to_string(),
            ));
        }

        let equipment = self.catalog.get_equipment(rental.equipment_id).await?;
        let wallet = self.wallet.get_or_create(payer_id).await?;

        let mut metadata = HashMap::new();
        metadata.insert("rental_id".to_string(), serde_json::json!(rental.id));
        metadata.insert("equipment_id".to_string(), serde_json::json!(equipment.id));
        metadata.insert("owner_id".to_string(), serde_json::json!(rental.owner_id));

        // The debit either fully applies or fails with no mutation, so a
        // failed payment leaves the rental untouched.
        self.wallet
            .apply_transaction(
                wallet.id,
                TransactionType::Payment,
                -rental.total_amount,
                &format!("Rental payment for {}", equipment.name),
                Some(metadata),
            )
            .await?;

        let updated = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET payment_status = 'paid', payment_method = 'wallet',
                status = 'paid', updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(rental.id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            rental_id = %rental_id,
            amount = %rental.total_amount,
            "Rental paid from wallet"
        );
        Ok(updated)
    }

    /// Attach a payment receipt for moderator review
    pub async fn upload_payment_receipt(
        &self,
        rental_id: Uuid,
        actor_id: Uuid,
        receipt_url: &str,
    ) -> Result<Rental, DomainError> {
        let rental = self.get(rental_id).await?;

        if actor_id != rental.renter_id {
            return Err(DomainError::Forbidden(
                "only the renter may upload a receipt".to_string(),
            ));
        }
        if rental.payment_method != PaymentMethod::Receipt {
            return Err(DomainError::InvalidState(
                "rental is not paid by receipt".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET payment_receipt_url = $1, payment_receipt_status = 'pending',
                receipt_rejection_reason = NULL, updated_at = now()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(receipt_url)
        .bind(rental.id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(updated)
    }

    /// Moderator decision on an uploaded receipt
    pub async fn validate_payment_receipt(
        &self,
        rental_id: Uuid,
        request: ValidateReceiptRequest,
    ) -> Result<Rental, DomainError> {
        let rental = self.get(rental_id).await?;

        if rental.payment_receipt_status != Some(ReceiptStatus::Pending) {
            return Err(DomainError::InvalidState(
                "no pending receipt to validate".to_string(),
            ));
        }

        let updated = match request.decision {
            ReceiptDecision::Approved => {
                sqlx::query_as::<_, Rental>(
                    r#"
                    UPDATE rentals
                    SET payment_receipt_status = 'approved', payment_status = 'paid',
                        status = 'paid', updated_at = now()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(rental.id)
                .fetch_one(&self.db_pool)
                .await?
            }
            ReceiptDecision::Rejected => {
                sqlx::query_as::<_, Rental>(
                    r#"
                    UPDATE rentals
                    SET payment_receipt_status = 'rejected',
                        receipt_rejection_reason = $1, updated_at = now()
                    WHERE id = $2
                    RETURNING *
                    "#,
                )
                .bind(request.reason.as_deref().unwrap_or("rejected by moderator"))
                .bind(rental.id)
                .fetch_one(&self.db_pool)
                .await?
            }
        };

        tracing::info!(
            rental_id = %rental_id,
            decision = ?request.decision,
            "Payment receipt validated"
        );
        Ok(updated)
    }

    /// Sweep: cancel approved rentals whose payment window has lapsed.
    /// Each item re-checks its state inside the UPDATE, so a rental
    /// manually transitioned mid-sweep is skipped, and one failing item
    /// never blocks the rest.
    pub async fn cancel_expired_approved(&self, timeout_hours: i64) -> Result<u64, DomainError> {
        let cutoff = Utc::now() - Duration::hours(timeout_hours);

        let candidates = sqlx::query_as::<_, Rental>(
            r#"
            SELECT * FROM rentals
            WHERE status = 'approved' AND payment_status = 'pending'
              AND approved_at <= $1 AND deleted_at IS NULL
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db_pool)
        .await?;

        let mut cancelled = 0u64;
        for rental in candidates {
            match self.cancel_one_expired(&rental).await {
                Ok(true) => cancelled += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        rental_id = %rental.id,
                        error = %e,
                        "Failed to cancel expired rental, continuing sweep"
                    );
                }
            }
        }

        if cancelled > 0 {
            tracing::info!(count = cancelled, "Expired approved rentals cancelled");
        }
        Ok(cancelled)
    }

    async fn cancel_one_expired(&self, rental: &Rental) -> Result<bool, DomainError> {
        let updated = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status = 'approved' AND payment_status = 'pending'
            RETURNING *
            "#,
        )
        .bind(rental.id)
        .fetch_optional(&self.db_pool)
        .await?;

        let Some(updated) = updated else {
            // Manually transitioned since the query; nothing to do.
            return Ok(false);
        };

        self.release_equipment_if_free(rental.equipment_id).await?;
        self.notify_cancellation(&updated).await;
        Ok(true)
    }

    /// Sweep: mark due reminders sent and hand the rentals to the
    /// notifier. Marking happens before dispatch so a dispatch failure
    /// cannot produce duplicate reminders.
    pub async fn send_return_reminders(&self) -> Result<Vec<Rental>, DomainError> {
        let today = Utc::now().date_naive();

        let due = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET return_notification_sent = TRUE, updated_at = now()
            WHERE return_reminder_date <= $1 AND return_notification_sent = FALSE
              AND status IN ('active', 'paid') AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(today)
        .fetch_all(&self.db_pool)
        .await?;

        for rental in &due {
            let send = async {
                let renter = self.catalog.get_user(rental.renter_id).await?;
                let owner = self.catalog.get_user(rental.owner_id).await?;
                self.notifier
                    .send_return_reminder(rental, &renter, &owner)
                    .await
                    .map_err(|e| DomainError::Gateway(e.to_string()))
            };
            if let Err(e) = send.await {
                tracing::error!(
                    rental_id = %rental.id,
                    error = %e,
                    "Return reminder dispatch failed"
                );
            }
        }

        if !due.is_empty() {
            tracing::info!(count = due.len(), "Return reminders processed");
        }
        Ok(due)
    }

    /// Fetch a rental, ignoring soft-deleted rows
    pub async fn get(&self, rental_id: Uuid) -> Result<Rental, DomainError> {
        sqlx::query_as::<_, Rental>(
            "SELECT * FROM rentals WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(rental_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(DomainError::NotFound("rental"))
    }

    /// List rentals visible to the actor: their own (as renter or owner),
    /// or everything for moderators and admins
    pub async fn list(
        &self,
        actor_id: Uuid,
        actor_role: UserRole,
        query: ListRentalsQuery,
    ) -> Result<Vec<Rental>, DomainError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM rentals WHERE deleted_at IS NULL");

        if !matches!(actor_role, UserRole::Moderator | UserRole::Admin) {
            builder.push(" AND (renter_id = ");
            builder.push_bind(actor_id);
            builder.push(" OR owner_id = ");
            builder.push_bind(actor_id);
            builder.push(")");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit as i64);
        builder.push(" OFFSET ");
        builder.push_bind(offset as i64);

        let rentals = builder
            .build_query_as::<Rental>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(rentals)
    }

    /// Soft-delete a finished rental
    pub async fn delete(&self, rental_id: Uuid, actor_id: Uuid) -> Result<(), DomainError> {
        let rental = self.get(rental_id).await?;

        if actor_id != rental.renter_id && actor_id != rental.owner_id {
            return Err(DomainError::Forbidden(
                "only the renter or the owner may delete".to_string(),
            ));
        }
        if rental.status.holds_equipment() {
            return Err(DomainError::InvalidState(
                "cannot delete a rental that currently holds the equipment".to_string(),
            ));
        }

        sqlx::query("UPDATE rentals SET deleted_at = now(), updated_at = now() WHERE id = $1")
            .bind(rental.id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    /// The single cross-entity rule: equipment is available exactly when
    /// no rental currently holds it.
    async fn release_equipment_if_free(&self, equipment_id: Uuid) -> Result<(), DomainError> {
        let still_held = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM rentals
                WHERE equipment_id = $1
                  AND status IN ('approved', 'paid', 'active')
                  AND end_date >= CURRENT_DATE
                  AND deleted_at IS NULL
            )
            "#,
        )
        .bind(equipment_id)
        .fetch_one(&self.db_pool)
        .await?;

        if !still_held {
            self.catalog
                .set_equipment_availability(equipment_id, true)
                .await?;
        }
        Ok(())
    }

    async fn notify_cancellation(&self, rental: &Rental) {
        let send = async {
            let renter = self.catalog.get_user(rental.renter_id).await?;
            let owner = self.catalog.get_user(rental.owner_id).await?;
            self.notifier
                .send_cancellation(rental, &renter, &owner)
                .await
                .map_err(|e| DomainError::Gateway(e.to_string()))
        };
        if let Err(e) = send.await {
            tracing::error!(
                rental_id = %rental.id,
                error = %e,
                "Cancellation notice dispatch failed"
            );
        }
    }
}
