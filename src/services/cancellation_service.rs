//! Auto-cancellation of unpaid bookings.
//!
//! The work lives in the `cancel_expired_bookings()` stored procedure: it
//! cancels pending bookings past their hold, releases their seats and expires
//! their pending payments in one statement. This module only invokes it.

use std::time::Duration;

use crate::{db::DbPool, error::AppError};

/// Run the expiry sweep once and return how many bookings it cancelled.
///
/// No retry: a database failure is returned to the caller as is.
pub async fn cancel_expired_bookings(pool: &DbPool) -> Result<i32, AppError> {
    let cancelled: i32 = sqlx::query_scalar("SELECT cancel_expired_bookings()")
        .fetch_one(pool)
        .await?;

    if cancelled > 0 {
        tracing::info!(cancelled, "Expired bookings cancelled");
    } else {
        tracing::debug!("No expired bookings");
    }

    Ok(cancelled)
}

/// Run the sweep every `interval` for the lifetime of the process.
///
/// Used when `EXPIRY_SWEEP_INTERVAL_SECS` is set, as an alternative to an
/// external scheduler hitting the cron endpoint.
pub fn spawn_expiry_sweep(pool: DbPool, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = cancel_expired_bookings(&pool).await {
                tracing::error!(error = %e, "Expiry sweep failed");
            }
        }
    })
}
