//! Webhook service for business notification endpoints.
//!
//! Handles endpoint registration and signed delivery of booking events.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        booking::Booking,
        webhook::{
            BookingEvent, WebhookEndpoint, WebhookEndpointRequest, WebhookEndpointResponse,
            WebhookPayload,
        },
    },
    services::signature,
};

const MAX_URL_LEN: usize = 2048;

/// Register a new webhook endpoint.
///
/// # Process
///
/// 1. Validate URL format
/// 2. Generate a 32-byte secret
/// 3. Store the endpoint
/// 4. Return it with the secret (the only time the secret is shown)
pub async fn create_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    request: WebhookEndpointRequest,
) -> Result<WebhookEndpointResponse, AppError> {
    validate_webhook_url(&request.url)?;

    let secret = signature::generate_secret();

    let endpoint = sqlx::query_as::<_, WebhookEndpoint>(
        r#"
        INSERT INTO webhook_endpoints (business_id, url, secret)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(&request.url)
    .bind(&secret)
    .fetch_one(pool)
    .await?;

    tracing::info!(%business_id, endpoint_id = %endpoint.id, "Webhook endpoint registered");

    Ok(WebhookEndpointResponse::from(endpoint).with_secret(secret))
}

/// Active endpoints of a business, newest first. Secrets are not included.
pub async fn list_webhook_endpoints(
    pool: &DbPool,
    business_id: Uuid,
) -> Result<Vec<WebhookEndpointResponse>, AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        r#"
        SELECT * FROM webhook_endpoints
        WHERE business_id = $1 AND is_active
        ORDER BY created_at DESC
        "#,
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(endpoints.into_iter().map(Into::into).collect())
}

/// Soft-delete an endpoint so its delivery history survives.
pub async fn delete_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    endpoint_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE webhook_endpoints SET is_active = false
        WHERE id = $1 AND business_id = $2 AND is_active
        "#,
    )
    .bind(endpoint_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::WebhookNotFound);
    }

    Ok(())
}

/// Send a booking event to every active endpoint of the booking's business.
///
/// Individual delivery failures are logged and do not stop the others.
pub async fn notify_booking_event(
    pool: &DbPool,
    client: &reqwest::Client,
    booking: &Booking,
    event: BookingEvent,
) -> Result<(), AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE business_id = $1 AND is_active",
    )
    .bind(booking.business_id)
    .fetch_all(pool)
    .await?;

    for endpoint in endpoints {
        if let Err(e) = send_webhook(pool, client, &endpoint, booking, event).await {
            tracing::error!(url = %endpoint.url, error = ?e, "Failed to send webhook");
        }
    }

    Ok(())
}

/// Deliver one signed event and record the attempt in `webhook_events`.
///
/// Headers: `Content-Type: application/json`,
/// `X-Webhook-Signature: sha256=<hex>`, `X-Webhook-Event-Id: <uuid>`.
async fn send_webhook(
    pool: &DbPool,
    client: &reqwest::Client,
    endpoint: &WebhookEndpoint,
    booking: &Booking,
    event: BookingEvent,
) -> Result<(), AppError> {
    let event_id = Uuid::new_v4();

    let payload = WebhookPayload::new(event_id, event, booking);
    let payload_json = serde_json::to_vec(&payload)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to serialize payload: {e}")))?;

    let signature = signature::sign(&endpoint.secret, &payload_json)?;

    let response = client
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", &signature)
        .header("X-Webhook-Event-Id", event_id.to_string())
        .body(payload_json.clone())
        .send()
        .await;

    let (status, body) = match response {
        Ok(resp) => {
            let status = i32::from(resp.status().as_u16());
            let body = resp.text().await.ok();
            (Some(status), body)
        }
        Err(e) => {
            let error_msg = format!("Request failed: {e}");
            tracing::warn!(url = %endpoint.url, "{error_msg}");
            (None, Some(error_msg))
        }
    };

    let payload_value = serde_json::to_value(&payload)
        .map_err(|e| AppError::InvalidRequest(format!("Failed to encode payload: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO webhook_events (
            id, webhook_endpoint_id, booking_id, event_type,
            payload, response_status, response_body
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event_id)
    .bind(endpoint.id)
    .bind(booking.id)
    .bind(event.as_str())
    .bind(payload_value)
    .bind(status)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// Validate webhook URL format.
///
/// - Must parse as a URL of at most 2048 characters
/// - Must be HTTPS; plain HTTP only for localhost
fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > MAX_URL_LEN {
        return Err(AppError::InvalidWebhookUrl(format!(
            "URL exceeds {MAX_URL_LEN} characters"
        )));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidWebhookUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "0.0.0.0")) => {
            Ok(())
        }
        "http" => Err(AppError::InvalidWebhookUrl(
            "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
        )),
        _ => Err(AppError::InvalidWebhookUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
