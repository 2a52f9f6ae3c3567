//! Notification collaborator
//!
//! Dispatch transport (email/SMS) lives outside this crate; the trait is
//! the seam. Failures here never roll back status changes that were
//! already committed by the caller.

use async_trait::async_trait;

use crate::models::User;
use crate::rental::Rental;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Remind the renter that the equipment is due back tomorrow
    async fn send_return_reminder(
        &self,
        rental: &Rental,
        renter: &User,
        owner: &User,
    ) -> anyhow::Result<()>;

    /// Tell both parties a rental was cancelled
    async fn send_cancellation(
        &self,
        rental: &Rental,
        renter: &User,
        owner: &User,
    ) -> anyhow::Result<()>;
}

/// Notifier that records the outgoing notification in the logs
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_return_reminder(
        &self,
        rental: &Rental,
        renter: &User,
        _owner: &User,
    ) -> anyhow::Result<()> {
        tracing::info!(
            rental_id = %rental.id,
            renter = %renter.email,
            end_date = %rental.end_date,
            "Return reminder dispatched"
        );
        Ok(())
    }

    async fn send_cancellation(
        &self,
        rental: &Rental,
        renter: &User,
        owner: &User,
    ) -> anyhow::Result<()> {
        tracing::info!(
            rental_id = %rental.id,
            renter = %renter.email,
            owner = %owner.email,
            "Cancellation notice dispatched"
        );
        Ok(())
    }
}
