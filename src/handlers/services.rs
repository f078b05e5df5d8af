//! Tour service handlers.
//!
//! Owner endpoints:
//! - POST /api/v1/services - Create a service
//! - GET /api/v1/services - List services (active and inactive)
//! - GET /api/v1/services/{id} - Get one service
//! - PATCH /api/v1/services/{id} - Partial update
//! - DELETE /api/v1/services/{id} - Deactivate
//!
//! Public endpoint:
//! - GET /api/v1/public/businesses/{slug}/services - Active services of a business

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::JsonBody,
    middleware::auth::AuthContext,
    models::service::{
        CreateServiceRequest, PublicServiceResponse, Service, UpdateServiceRequest,
    },
    state::AppState,
};

fn validate_fields(
    name: Option<&str>,
    duration_minutes: Option<i32>,
    price_cents: Option<i64>,
    default_capacity: Option<i32>,
) -> Result<(), AppError> {
    if name.is_some_and(|n| n.trim().is_empty() || n.trim().len() > 200) {
        return Err(AppError::InvalidRequest(
            "name must be 1 to 200 characters".to_string(),
        ));
    }
    if duration_minutes.is_some_and(|d| d <= 0) {
        return Err(AppError::InvalidRequest(
            "duration_minutes must be positive".to_string(),
        ));
    }
    if price_cents.is_some_and(|p| p < 0) {
        return Err(AppError::InvalidRequest(
            "price_cents cannot be negative".to_string(),
        ));
    }
    if default_capacity.is_some_and(|c| c <= 0) {
        return Err(AppError::InvalidRequest(
            "default_capacity must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Create a service for the authenticated business.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Sunset Island Hop",
///   "duration_minutes": 180,
///   "price_cents": 12000,
///   "default_capacity": 24
/// }
/// ```
pub async fn create_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    JsonBody(request): JsonBody<CreateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_fields(
        Some(request.name.as_str()),
        Some(request.duration_minutes),
        Some(request.price_cents),
        Some(request.default_capacity),
    )?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services (
            business_id, name, description, duration_minutes, price_cents, default_capacity
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(auth.business_id)
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.duration_minutes)
    .bind(request.price_cents)
    .bind(request.default_capacity)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(business_id = %auth.business_id, service_id = %service.id, "Service created");

    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_services(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT * FROM services WHERE business_id = $1 ORDER BY is_active DESC, name",
    )
    .bind(auth.business_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(services))
}

/// Get one service. Services of other businesses are reported as not found.
pub async fn get_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    let service =
        sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1 AND business_id = $2")
            .bind(service_id)
            .bind(auth.business_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::ServiceNotFound)?;

    Ok(Json(service))
}

/// Partial update. Existing slots keep their own capacity.
pub async fn update_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    validate_fields(
        request.name.as_deref(),
        request.duration_minutes,
        request.price_cents,
        request.default_capacity,
    )?;

    let service = sqlx::query_as::<_, Service>(
        r#"
        UPDATE services
        SET name = COALESCE($3, name),
            description = COALESCE($4, description),
            duration_minutes = COALESCE($5, duration_minutes),
            price_cents = COALESCE($6, price_cents),
            default_capacity = COALESCE($7, default_capacity),
            is_active = COALESCE($8, is_active),
            updated_at = NOW()
        WHERE id = $1 AND business_id = $2
        RETURNING *
        "#,
    )
    .bind(service_id)
    .bind(auth.business_id)
    .bind(request.name.as_deref().map(str::trim))
    .bind(request.description)
    .bind(request.duration_minutes)
    .bind(request.price_cents)
    .bind(request.default_capacity)
    .bind(request.is_active)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::ServiceNotFound)?;

    Ok(Json(service))
}

/// Deactivate a service (soft delete). Existing bookings are untouched.
pub async fn deactivate_service(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(service_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE services SET is_active = false, updated_at = NOW()
        WHERE id = $1 AND business_id = $2
        "#,
    )
    .bind(service_id)
    .bind(auth.business_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ServiceNotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Active services of an active business, for the public booking page.
pub async fn list_public_services(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<PublicServiceResponse>>, AppError> {
    let (business_id, currency): (Uuid, String) = sqlx::query_as(
        "SELECT id, currency FROM businesses WHERE slug = $1 AND is_active",
    )
    .bind(&slug)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::BusinessNotFound)?;

    let services = sqlx::query_as::<_, Service>(
        "SELECT * FROM services WHERE business_id = $1 AND is_active ORDER BY name",
    )
    .bind(business_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(
        services
            .into_iter()
            .map(|s| PublicServiceResponse::new(s, &currency))
            .collect(),
    ))
}
