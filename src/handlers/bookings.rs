//! Booking handlers.
//!
//! Public endpoints (the ref code is the customer's only credential):
//! - POST /api/v1/public/bookings - Hold seats on a departure
//! - GET /api/v1/public/bookings/{ref_code} - Booking status
//!
//! Owner endpoints:
//! - GET /api/v1/bookings - List bookings (optional status and slot filters)
//! - GET /api/v1/bookings/{id} - Booking with passengers and payments
//! - POST /api/v1/bookings/{id}/cancel - Cancel and release seats

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{JsonBody, QueryParams},
    handlers::ref_code_param,
    middleware::auth::AuthContext,
    models::{
        booking::{
            Booking, BookingDetailResponse, BookingListQuery, CreateBookingRequest,
            CreateBookingResponse, PublicBookingResponse,
        },
        webhook::BookingEvent,
    },
    services::{booking_service, webhook_service},
    state::AppState,
};

/// Create a pending booking that holds seats until `expires_at`.
///
/// # Request Body
///
/// ```json
/// {
///   "slot_id": "6a1f...",
///   "customer_name": "Aisyah Rahman",
///   "customer_email": "aisyah@example.com",
///   "customer_phone": "+60123456789",
///   "pax": 2,
///   "passengers": [{ "full_name": "Aisyah Rahman" }, { "full_name": "Daniel Lee" }]
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: `{ "id", "ref_code", "status": "pending", "pax", "total_cents",
///   "currency", "expires_at" }`
/// - **400**: validation failure
/// - **404**: unknown slot
/// - **409**: slot blocked or departed
/// - **422**: not enough seats left
pub async fn create_booking(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking =
        booking_service::create_booking(&state.pool, state.config.booking_hold_minutes, &request)
            .await?;

    Ok((StatusCode::CREATED, Json(CreateBookingResponse::from(booking))))
}

pub async fn get_public_booking(
    State(state): State<AppState>,
    Path(ref_code): Path<String>,
) -> Result<Json<PublicBookingResponse>, AppError> {
    let ref_code = ref_code_param(&ref_code)?;

    let summary = booking_service::find_summary_by_ref(&state.pool, &ref_code)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    Ok(Json(summary.into()))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    QueryParams(query): QueryParams<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = booking_service::list_bookings(&state.pool, auth.business_id, &query).await?;

    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    let (booking, passengers, payments) =
        booking_service::get_booking_detail(&state.pool, auth.business_id, booking_id).await?;

    Ok(Json(BookingDetailResponse {
        booking,
        passengers,
        payments: payments.into_iter().map(Into::into).collect(),
    }))
}

/// Cancel a pending or confirmed booking.
///
/// Seats go back to the slot. A booking that was already paid keeps its
/// payment, flagged `needs_refund` for the owner to settle with the gateway.
/// Registered webhooks receive `booking.cancelled`.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking =
        booking_service::cancel_booking(&state.pool, auth.business_id, booking_id).await?;

    let pool = state.pool.clone();
    let client = state.webhook_client.clone();
    let notified = booking.clone();
    tokio::spawn(async move {
        let event = BookingEvent::Cancelled;
        if let Err(e) =
            webhook_service::notify_booking_event(&pool, &client, &notified, event).await
        {
            tracing::error!(
                ref_code = %notified.ref_code,
                error = %e,
                "Webhook notification failed"
            );
        }
    });

    Ok(Json(booking))
}
