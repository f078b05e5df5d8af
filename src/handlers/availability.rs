//! Public availability check.

use axum::{Json, extract::State};

use crate::{
    error::AppError,
    extract::QueryParams,
    models::slot::{AvailabilityQuery, AvailabilityResponse},
    services::availability_service,
    state::AppState,
};

/// `GET /api/v1/public/availability?slot_id=...&pax=...`
///
/// # Response (200 OK)
///
/// ```json
/// { "slot_id": "...", "available": false, "remaining": 1, "reason": "insufficient_capacity" }
/// ```
///
/// An unavailable slot is still a 200; `reason` is one of `blocked`,
/// `departed`, `insufficient_capacity`. Bad `pax` is 400, an unknown slot 404.
pub async fn check_availability(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let response =
        availability_service::check_availability(&state.pool, query.slot_id, query.pax).await?;

    Ok(Json(response))
}
