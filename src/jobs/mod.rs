//! Scheduled sweeps
//!
//! The scheduler drives the timeout logic of both lifecycles without
//! user input: unpaid approvals are cancelled hourly, return reminders
//! go out daily, and sponsorship windows are closed hourly. Every job
//! catches and logs its own errors so a failing run never takes the
//! scheduler down.

use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::rental::RentalService;
use crate::sponsorship::SponsorshipService;

/// Wire up and start the recurring sweeps
pub async fn start_jobs(
    rental_service: Arc<RentalService>,
    sponsorship_service: Arc<SponsorshipService>,
    payment_timeout_hours: i64,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Hourly: cancel approved rentals whose payment window lapsed
    let rental = rental_service.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_id, _sched| {
            let rental = rental.clone();
            Box::pin(async move {
                match rental.cancel_expired_approved(payment_timeout_hours).await {
                    Ok(count) => {
                        tracing::debug!(count, "Expired-approval sweep finished");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Expired-approval sweep failed");
                    }
                }
            })
        })?)
        .await?;

    // Daily at 08:00: return reminders for rentals ending tomorrow
    let rental = rental_service.clone();
    scheduler
        .add(Job::new_async("0 0 8 * * *", move |_id, _sched| {
            let rental = rental.clone();
            Box::pin(async move {
                match rental.send_return_reminders().await {
                    Ok(due) => {
                        tracing::debug!(count = due.len(), "Return-reminder sweep finished");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Return-reminder sweep failed");
                    }
                }
            })
        })?)
        .await?;

    // Hourly: expire sponsorships whose window has closed
    let sponsorship = sponsorship_service.clone();
    scheduler
        .add(Job::new_async("0 30 * * * *", move |_id, _sched| {
            let sponsorship = sponsorship.clone();
            Box::pin(async move {
                match sponsorship.expire_old().await {
                    Ok(count) => {
                        tracing::debug!(count, "Sponsorship-expiry sweep finished");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Sponsorship-expiry sweep failed");
                    }
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Background sweeps scheduled");

    Ok(scheduler)
}
