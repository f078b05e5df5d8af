//! Payment handlers.
//!
//! - POST /api/v1/public/bookings/{ref_code}/payments - Start checkout
//! - POST /api/v1/payments/callback - Signed gateway notification

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    handlers::ref_code_param,
    models::payment::{CallbackAck, PaymentResponse},
    services::payment_service,
    state::AppState,
};

/// Header carrying `sha256=<hex>` over the raw callback body.
pub const SIGNATURE_HEADER: &str = "X-Gateway-Signature";

/// Start (or resume) checkout for a pending booking.
///
/// # Response
///
/// - **201 Created**: payment with `checkout_url` to redirect the customer to
/// - **404**: unknown ref code
/// - **409**: booking not pending or hold expired
/// - **502**: gateway refused the order
pub async fn create_payment(
    State(state): State<AppState>,
    Path(ref_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ref_code = ref_code_param(&ref_code)?;

    let payment = payment_service::create_payment(&state, &ref_code).await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

/// Gateway callback.
///
/// The body is taken as raw bytes so the signature is checked over exactly
/// what the gateway sent. Replays are acknowledged without side effects.
pub async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackAck>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = payment_service::handle_callback(&state, signature, &body).await?;

    tracing::info!(?outcome, "Payment callback processed");

    Ok(Json(CallbackAck { received: true }))
}
