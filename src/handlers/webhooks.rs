//! HTTP handlers for webhook endpoint management.
//!
//! Businesses register URLs here to be told when a booking is confirmed
//! or cancelled.

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
    models::webhook::{WebhookEndpointRequest, WebhookEndpointResponse},
    services::webhook_service,
    state::AppState,
};

/// Register a new webhook endpoint.
///
/// # Request Body
///
/// ```json
/// { "url": "https://coralbay.example/hooks/bookings" }
/// ```
///
/// # Response
///
/// 201 Created. The `secret` is only returned here.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "url": "https://coralbay.example/hooks/bookings",
///   "secret": "a1b2c3d4e5f6...",
///   "is_active": true,
///   "created_at": "2026-01-15T10:30:00Z"
/// }
/// ```
///
/// HTTPS is required; plain HTTP is accepted for localhost only.
pub async fn create_webhook(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    JsonBody(request): JsonBody<WebhookEndpointRequest>,
) -> Result<impl IntoResponse, AppError> {
    let endpoint =
        webhook_service::create_webhook_endpoint(&state.pool, auth.business_id, request).await?;

    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// List active webhook endpoints. Secrets are never included.
pub async fn list_webhooks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<WebhookEndpointResponse>>, AppError> {
    let webhooks = webhook_service::list_webhook_endpoints(&state.pool, auth.business_id).await?;

    Ok(Json(webhooks))
}

/// Delete a webhook endpoint (soft delete).
///
/// Returns 204 No Content, or 404 if the endpoint is unknown or belongs to
/// another business.
pub async fn delete_webhook(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(webhook_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    webhook_service::delete_webhook_endpoint(&state.pool, auth.business_id, webhook_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
