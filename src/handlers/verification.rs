//! Ticket verification at the pier.
//!
//! The QR code on a ticket encodes `{PUBLIC_BASE_URL}/verify/{ref_code}`.
//! The crew app behind that page calls these owner endpoints:
//! - GET /api/v1/verify/{ref_code} - Is this ticket good to board?
//! - POST /api/v1/verify/{ref_code}/check-in - Record boarding

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    handlers::ref_code_param,
    middleware::auth::AuthContext,
    models::booking::VerificationResponse,
    services::booking_service,
    state::AppState,
};

/// `valid` is true only for confirmed bookings. Tickets of other businesses
/// are reported as not found.
pub async fn verify_ticket(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(ref_code): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let ref_code = ref_code_param(&ref_code)?;

    let summary =
        booking_service::find_owned_summary_by_ref(&state.pool, auth.business_id, &ref_code)
            .await?
            .ok_or(AppError::BookingNotFound)?;

    Ok(Json(summary.into()))
}

/// Check in a confirmed booking. Repeating the call is a 409.
pub async fn check_in(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(ref_code): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let ref_code = ref_code_param(&ref_code)?;

    let summary = booking_service::check_in(&state.pool, auth.business_id, &ref_code).await?;

    Ok(Json(summary.into()))
}
