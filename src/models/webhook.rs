//! Webhook models for business notification endpoints.
//!
//! # Webhook Flow
//!
//! 1. Owner registers an endpoint via `POST /api/v1/webhooks`
//! 2. A secret is generated for HMAC signature verification
//! 3. When a booking is confirmed or cancelled, a signed payload is sent
//! 4. The receiver verifies the signature with the secret

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};

/// Webhook endpoint registered by a business.
///
/// The `secret` is stored in plaintext (HMAC needs it) but is only ever
/// returned once, at registration.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub business_id: Uuid,
    pub url: String,
    pub secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to register a new webhook endpoint.
///
/// ```json
/// { "url": "https://coralbay.example/hooks/bookings" }
/// ```
#[derive(Debug, Deserialize)]
pub struct WebhookEndpointRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookEndpointResponse {
    pub id: Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookEndpoint> for WebhookEndpointResponse {
    fn from(endpoint: WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id,
            url: endpoint.url,
            secret: None,
            is_active: endpoint.is_active,
            created_at: endpoint.created_at,
        }
    }
}

impl WebhookEndpointResponse {
    /// Include the secret (registration response only).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Booking events a business can be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Confirmed,
    Cancelled,
}

impl BookingEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingEvent::Confirmed => "booking.confirmed",
            BookingEvent::Cancelled => "booking.cancelled",
        }
    }
}

/// JSON body POSTed to a registered endpoint.
///
/// ```json
/// {
///   "event_type": "booking.confirmed",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-01-15T10:30:00Z",
///   "data": { "booking": { "ref_code": "BT-7KQ2MZ9X", "...": "..." } }
/// }
/// ```
///
/// Sent with `X-Webhook-Signature: sha256=<hex HMAC-SHA256(secret, body)>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data: WebhookData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookData {
    pub booking: BookingWebhookData,
}

/// Booking fields exposed to webhook consumers.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingWebhookData {
    pub id: Uuid,
    pub ref_code: String,
    pub slot_id: Uuid,
    pub service_id: Uuid,
    pub status: BookingStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub pax: i32,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Booking> for BookingWebhookData {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            ref_code: b.ref_code.clone(),
            slot_id: b.slot_id,
            service_id: b.service_id,
            status: b.status,
            customer_name: b.customer_name.clone(),
            customer_email: b.customer_email.clone(),
            pax: b.pax,
            total_cents: b.total_cents,
            currency: b.currency.clone(),
            created_at: b.created_at,
        }
    }
}

impl WebhookPayload {
    pub fn new(event_id: Uuid, event: BookingEvent, booking: &Booking) -> Self {
        Self {
            event_type: event.as_str().to_string(),
            event_id,
            created_at: Utc::now(),
            data: WebhookData {
                booking: booking.into(),
            },
        }
    }
}
