//! Departure slot handlers.
//!
//! Owner endpoints:
//! - POST /api/v1/services/{id}/slots - Open a departure
//! - GET /api/v1/services/{id}/slots - List departures (optional from/to window)
//! - PUT /api/v1/slots/{id}/capacity - Change capacity
//! - POST /api/v1/slots/{id}/block - Stop taking bookings
//! - POST /api/v1/slots/{id}/unblock - Resume taking bookings
//!
//! Public endpoint:
//! - GET /api/v1/public/services/{id}/slots - Bookable future departures

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, is_unique_violation},
    extract::{JsonBody, QueryParams},
    middleware::auth::AuthContext,
    models::slot::{
        CreateSlotRequest, PublicSlotResponse, Slot, SlotRangeQuery, SlotResponse,
        UpdateCapacityRequest,
    },
    state::AppState,
};

// Slots on a deactivated service would be unreachable from the public routes
const ACTIVE_SERVICE_CAPACITY: &str = r#"
    SELECT default_capacity FROM services
    WHERE id = $1 AND business_id = $2 AND is_active
"#;

/// Open a new departure for one of the caller's services.
///
/// # Request Body
///
/// ```json
/// { "departure_at": "2026-03-01T09:30:00Z", "capacity": 24 }
/// ```
///
/// # Response
///
/// - **201 Created**: the slot
/// - **400**: departure in the past or capacity not positive
/// - **404**: service not found or deactivated
/// - **409**: a slot already departs at that time
pub async fn create_slot(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
    JsonBody(request): JsonBody<CreateSlotRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.departure_at <= Utc::now() {
        return Err(AppError::InvalidRequest(
            "departure_at must be in the future".to_string(),
        ));
    }
    if request.capacity.is_some_and(|c| c <= 0) {
        return Err(AppError::InvalidRequest(
            "capacity must be positive".to_string(),
        ));
    }

    let default_capacity: i32 = sqlx::query_scalar(ACTIVE_SERVICE_CAPACITY)
    .bind(service_id)
    .bind(auth.business_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::ServiceNotFound)?;

    let slot = sqlx::query_as::<_, Slot>(
        r#"
        INSERT INTO availability_slots (business_id, service_id, departure_at, capacity)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(auth.business_id)
    .bind(service_id)
    .bind(request.departure_at)
    .bind(request.capacity.unwrap_or(default_capacity))
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A departure already exists at that time".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(SlotResponse::from(slot))))
}

pub async fn list_slots(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
    QueryParams(range): QueryParams<SlotRangeQuery>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let slots = sqlx::query_as::<_, Slot>(
        r#"
        SELECT * FROM availability_slots
        WHERE service_id = $1 AND business_id = $2
          AND ($3::timestamptz IS NULL OR departure_at >= $3)
          AND ($4::timestamptz IS NULL OR departure_at < $4)
        ORDER BY departure_at
        "#,
    )
    .bind(service_id)
    .bind(auth.business_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(slots.into_iter().map(Into::into).collect()))
}

/// Change a slot's capacity. It can never drop below the seats already booked.
pub async fn update_capacity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(slot_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateCapacityRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    if request.capacity <= 0 {
        return Err(AppError::InvalidRequest(
            "capacity must be positive".to_string(),
        ));
    }

    // The booked_count guard makes the check and the write one atomic step
    let updated = sqlx::query_as::<_, Slot>(
        r#"
        UPDATE availability_slots
        SET capacity = $3, updated_at = NOW()
        WHERE id = $1 AND business_id = $2 AND booked_count <= $3
        RETURNING *
        "#,
    )
    .bind(slot_id)
    .bind(auth.business_id)
    .bind(request.capacity)
    .fetch_optional(&state.pool)
    .await?;

    if let Some(slot) = updated {
        return Ok(Json(slot.into()));
    }

    let booked: i32 = sqlx::query_scalar(
        "SELECT booked_count FROM availability_slots WHERE id = $1 AND business_id = $2",
    )
    .bind(slot_id)
    .bind(auth.business_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    Err(AppError::Conflict(format!(
        "Capacity cannot be lower than the {booked} seats already booked"
    )))
}

async fn set_blocked(
    state: &AppState,
    business_id: Uuid,
    slot_id: Uuid,
    blocked: bool,
) -> Result<Json<SlotResponse>, AppError> {
    let slot = sqlx::query_as::<_, Slot>(
        r#"
        UPDATE availability_slots
        SET is_blocked = $3, updated_at = NOW()
        WHERE id = $1 AND business_id = $2
        RETURNING *
        "#,
    )
    .bind(slot_id)
    .bind(business_id)
    .bind(blocked)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    tracing::info!(%slot_id, blocked, "Slot blocking changed");

    Ok(Json(slot.into()))
}

/// Block a slot. Existing bookings stay valid; new ones are refused.
pub async fn block_slot(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotResponse>, AppError> {
    set_blocked(&state, auth.business_id, slot_id, true).await
}

pub async fn unblock_slot(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<SlotResponse>, AppError> {
    set_blocked(&state, auth.business_id, slot_id, false).await
}

/// Future, unblocked departures of an active service.
pub async fn list_public_slots(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    QueryParams(range): QueryParams<SlotRangeQuery>,
) -> Result<Json<Vec<PublicSlotResponse>>, AppError> {
    let service_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM services s
            JOIN businesses b ON b.id = s.business_id
            WHERE s.id = $1 AND s.is_active AND b.is_active
        )
        "#,
    )
    .bind(service_id)
    .fetch_one(&state.pool)
    .await?;

    if !service_exists {
        return Err(AppError::ServiceNotFound);
    }

    let slots = sqlx::query_as::<_, Slot>(
        r#"
        SELECT * FROM availability_slots
        WHERE service_id = $1
          AND NOT is_blocked
          AND departure_at > NOW()
          AND ($2::timestamptz IS NULL OR departure_at >= $2)
          AND ($3::timestamptz IS NULL OR departure_at < $3)
        ORDER BY departure_at
        "#,
    )
    .bind(service_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(slots.into_iter().map(Into::into).collect()))
}
