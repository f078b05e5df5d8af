//! Scheduler-triggered maintenance.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{error::AppError, services::cancellation_service, state::AppState};

#[derive(Debug, Serialize)]
pub struct CancelExpiredResponse {
    pub cancelled: i32,
}

/// `POST /api/v1/cron/cancel-expired`
///
/// Runs `cancel_expired_bookings()` once and reports how many bookings it
/// cancelled. Calling it again right away is harmless and returns 0.
pub async fn cancel_expired(
    State(state): State<AppState>,
) -> Result<Json<CancelExpiredResponse>, AppError> {
    let cancelled = cancellation_service::cancel_expired_bookings(&state.pool).await?;

    Ok(Json(CancelExpiredResponse { cancelled }))
}
