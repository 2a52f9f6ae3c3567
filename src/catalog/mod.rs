//! Identity/equipment store collaborator
//!
//! Read access to users and equipment owned by the catalog service, plus
//! the single write this crate is allowed: the equipment availability
//! flag, which mirrors whether a rental currently holds the equipment.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{Equipment, User};

/// Read-mostly store for users and equipment
#[derive(Clone)]
pub struct CatalogService {
    db_pool: PgPool,
}

impl CatalogService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Fetch a user, failing with NotFound if absent
    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(DomainError::NotFound("user"))
    }

    /// Fetch an equipment listing, failing with NotFound if absent
    pub async fn get_equipment(&self, id: Uuid) -> Result<Equipment, DomainError> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(DomainError::NotFound("equipment"))
    }

    /// Flip the availability flag on an equipment listing
    pub async fn set_equipment_availability(
        &self,
        id: Uuid,
        available: bool,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE equipment SET is_available = $1, updated_at = now() WHERE id = $2")
                .bind(available)
                .bind(id)
                .execute(&self.db_pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("equipment"));
        }

        tracing::debug!(equipment_id = %id, available, "Equipment availability updated");
        Ok(())
    }
}
