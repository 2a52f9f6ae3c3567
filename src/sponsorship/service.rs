//! Sponsorship service layer
//!
//! Same debit pattern as the rental payment path, with a simpler state
//! machine. The one-active-per-sponsor rule lives in a partial unique
//! index, so two concurrent creations cannot both get through.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::DomainError;
use crate::sponsorship::model::{
    AdSponsorship, CreateSponsorshipRequest, ExtendSponsorshipRequest, SponsorshipStatus,
};
use crate::wallet::{TransactionType, WalletService};

const ONE_ACTIVE_INDEX: &str = "idx_sponsorships_one_active";

/// Sponsorship service for the paid-placement lifecycle
#[derive(Clone)]
pub struct SponsorshipService {
    db_pool: PgPool,
    wallet: WalletService,
}

impl SponsorshipService {
    pub fn new(db_pool: PgPool, wallet: WalletService) -> Self {
        Self { db_pool, wallet }
    }

    /// Create a sponsorship: debit the promotion fee, then insert. The
    /// insert bounces off the partial unique index if the sponsor already
    /// has an active placement, in which case the fee is refunded.
    pub async fn create(
        &self,
        sponsor_id: Uuid,
        request: CreateSponsorshipRequest,
    ) -> Result<AdSponsorship, DomainError> {
        if request.amount <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "sponsorship amount must be positive".to_string(),
            ));
        }
        if request.duration_days <= 0 {
            return Err(DomainError::Validation(
                "sponsorship duration must be positive".to_string(),
            ));
        }

        let wallet = self.wallet.get_or_create(sponsor_id).await?;

        let mut metadata = HashMap::new();
        if let Some(equipment_id) = request.equipment_id {
            metadata.insert("equipment_id".to_string(), serde_json::json!(equipment_id));
        }
        self.wallet
            .apply_transaction(
                wallet.id,
                TransactionType::PromotionFee,
                -request.amount,
                "Ad sponsorship fee",
                Some(metadata),
            )
            .await?;

        let start = Utc::now();
        let end = start + Duration::days(i64::from(request.duration_days));

        let inserted = sqlx::query_as::<_, AdSponsorship>(
            r#"
            INSERT INTO ad_sponsorships
                (sponsor_id, equipment_id, amount, duration_days, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(sponsor_id)
        .bind(request.equipment_id)
        .bind(request.amount)
        .bind(request.duration_days)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db_pool)
        .await;

        match inserted {
            Ok(sponsorship) => {
                tracing::info!(
                    sponsorship_id = %sponsorship.id,
                    sponsor_id = %sponsor_id,
                    amount = %request.amount,
                    "Sponsorship created"
                );
                Ok(sponsorship)
            }
            Err(e) if is_one_active_violation(&e) => {
                self.refund_fee(wallet.id, request.amount).await;
                Err(DomainError::InvalidState(
                    "sponsor already has an active sponsorship".to_string(),
                ))
            }
            Err(e) => {
                self.refund_fee(wallet.id, request.amount).await;
                Err(e.into())
            }
        }
    }

    /// Extend an active sponsorship's window for an additional fee
    pub async fn extend(
        &self,
        sponsorship_id: Uuid,
        actor_id: Uuid,
        request: ExtendSponsorshipRequest,
    ) -> Result<AdSponsorship, DomainError> {
        if request.extra_amount <= Decimal::ZERO || request.extra_days <= 0 {
            return Err(DomainError::Validation(
                "extension amount and days must be positive".to_string(),
            ));
        }

        let sponsorship = self.get(sponsorship_id).await?;
        if sponsorship.sponsor_id != actor_id {
            return Err(DomainError::Forbidden(
                "only the sponsor may extend this sponsorship".to_string(),
            ));
        }
        if sponsorship.status != SponsorshipStatus::Active {
            return Err(DomainError::InvalidState(
                "only active sponsorships can be extended".to_string(),
            ));
        }

        let wallet = self.wallet.get_or_create(actor_id).await?;
        let mut metadata = HashMap::new();
        metadata.insert(
            "sponsorship_id".to_string(),
            serde_json::json!(sponsorship.id),
        );
        self.wallet
            .apply_transaction(
                wallet.id,
                TransactionType::PromotionFee,
                -request.extra_amount,
                "Ad sponsorship extension fee",
                Some(metadata),
            )
            .await?;

        // Guarded on status so a sweep expiring this row mid-flight
        // cannot resurrect it; the fee is refunded in that case.
        let updated = sqlx::query_as::<_, AdSponsorship>(
            r#"
            UPDATE ad_sponsorships
            SET end_date = end_date + make_interval(days => $1),
                duration_days = duration_days + $1,
                amount = amount + $2,
                updated_at = now()
            WHERE id = $3 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(request.extra_days)
        .bind(request.extra_amount)
        .bind(sponsorship.id)
        .fetch_optional(&self.db_pool)
        .await?;

        match updated {
            Some(sponsorship) => {
                tracing::info!(
                    sponsorship_id = %sponsorship.id,
                    extra_days = request.extra_days,
                    "Sponsorship extended"
                );
                Ok(sponsorship)
            }
            None => {
                self.refund_fee(wallet.id, request.extra_amount).await;
                Err(DomainError::InvalidState(
                    "sponsorship is no longer active".to_string(),
                ))
            }
        }
    }

    /// Sweep: expire active sponsorships whose window has closed
    pub async fn expire_old(&self) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE ad_sponsorships
            SET status = 'expired', updated_at = now()
            WHERE status = 'active' AND end_date < now()
            "#,
        )
        .execute(&self.db_pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            tracing::info!(count = expired, "Sponsorships expired");
        }
        Ok(expired)
    }

    /// Whether the equipment is currently sponsored: an active in-window
    /// sponsorship names it directly, or names nothing while belonging to
    /// the equipment's owner.
    pub async fn is_equipment_sponsored(&self, equipment_id: Uuid) -> Result<bool, DomainError> {
        let sponsored = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM ad_sponsorships s
                WHERE s.status = 'active'
                  AND now() BETWEEN s.start_date AND s.end_date
                  AND (
                      s.equipment_id = $1
                      OR (s.equipment_id IS NULL
                          AND s.sponsor_id = (SELECT owner_id FROM equipment WHERE id = $1))
                  )
            )
            "#,
        )
        .bind(equipment_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(sponsored)
    }

    /// Bump the impression counter on an active sponsorship
    pub async fn record_impression(&self, sponsorship_id: Uuid) -> Result<(), DomainError> {
        self.bump_counter(sponsorship_id, "impressions").await
    }

    /// Bump the click counter on an active sponsorship
    pub async fn record_click(&self, sponsorship_id: Uuid) -> Result<(), DomainError> {
        self.bump_counter(sponsorship_id, "clicks").await
    }

    async fn bump_counter(&self, sponsorship_id: Uuid, column: &str) -> Result<(), DomainError> {
        // column is one of two compile-time literals, never user input
        let sql = format!(
            "UPDATE ad_sponsorships SET {col} = {col} + 1, updated_at = now() \
             WHERE id = $1 AND status = 'active'",
            col = column
        );
        let result = sqlx::query(&sql)
            .bind(sponsorship_id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("sponsorship"));
        }
        Ok(())
    }

    /// Fetch a sponsorship
    pub async fn get(&self, sponsorship_id: Uuid) -> Result<AdSponsorship, DomainError> {
        sqlx::query_as::<_, AdSponsorship>("SELECT * FROM ad_sponsorships WHERE id = $1")
            .bind(sponsorship_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(DomainError::NotFound("sponsorship"))
    }

    /// All of a sponsor's placements, newest first
    pub async fn list_for_sponsor(
        &self,
        sponsor_id: Uuid,
    ) -> Result<Vec<AdSponsorship>, DomainError> {
        let sponsorships = sqlx::query_as::<_, AdSponsorship>(
            "SELECT * FROM ad_sponsorships WHERE sponsor_id = $1 ORDER BY created_at DESC",
        )
        .bind(sponsor_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(sponsorships)
    }

    /// Best-effort compensating credit when the insert/extend fails after
    /// the fee debit went through
    async fn refund_fee(&self, wallet_id: Uuid, amount: Decimal) {
        if let Err(e) = self
            .wallet
            .apply_transaction(
                wallet_id,
                TransactionType::Refund,
                amount,
                "Sponsorship fee refund",
                None,
            )
            .await
        {
            tracing::error!(
                wallet_id = %wallet_id,
                amount = %amount,
                error = %e,
                "Sponsorship fee refund failed"
            );
        }
    }
}

fn is_one_active_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(ONE_ACTIVE_INDEX)
    )
}
