//! Business onboarding and profile handlers.
//!
//! - POST /api/v1/businesses - Onboard a business, returns its API key once
//! - GET /api/v1/business - Profile of the authenticated business

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    extract::JsonBody,
    middleware::auth::AuthContext,
    models::business::{Business, BusinessResponse, CreateBusinessRequest, OnboardResponse},
    services::business_service,
    state::AppState,
};

/// Onboard a new business.
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Coral Bay Cruises",
///   "slug": "coral-bay",
///   "contact_email": "ops@coralbay.example",
///   "currency": "MYR",
///   "is_active": true,
///   "created_at": "2026-01-15T10:30:00Z",
///   "api_key": "bt_live_9f2c..."
/// }
/// ```
///
/// Store the `api_key`: it cannot be retrieved again.
pub async fn create_business(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBusinessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (business, api_key) = business_service::onboard(&state.pool, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OnboardResponse {
            business: business.into(),
            api_key,
        }),
    ))
}

pub async fn get_business(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BusinessResponse>, AppError> {
    let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1")
        .bind(auth.business_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::BusinessNotFound)?;

    Ok(Json(business.into()))
}
