//! Payment model and payment gateway wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mirrors the `payment_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

/// Represents a record from the `payments` table.
///
/// One booking can accumulate several payments (a failed attempt followed by
/// a successful retry). At most one of them ends up `paid`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,

    /// Order id sent to the gateway; always the booking ref code
    pub gateway_order_id: String,

    /// Gateway's own transaction id, known once the callback arrives
    pub gateway_transaction_id: Option<String>,

    pub checkout_url: Option<String>,
    pub failure_reason: Option<String>,

    /// Set when money arrived for a booking that is no longer bookable
    pub needs_refund: bool,

    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub needs_refund: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            status: payment.status,
            checkout_url: payment.checkout_url,
            failure_reason: payment.failure_reason,
            needs_refund: payment.needs_refund,
            paid_at: payment.paid_at,
            created_at: payment.created_at,
        }
    }
}

/// Order creation request sent to the gateway.
#[derive(Debug, Serialize)]
pub struct GatewayOrderRequest<'a> {
    pub order_id: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub description: String,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub callback_url: String,
    pub return_url: String,
}

/// Gateway's answer to an accepted order.
#[derive(Debug, Deserialize)]
pub struct GatewayOrderResponse {
    pub checkout_url: String,
}

/// Outcome reported by a gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Paid,
    Failed,
}

/// Body of `POST /api/v1/payments/callback`.
///
/// ```json
/// {
///   "order_id": "BT-7KQ2MZ9X",
///   "transaction_id": "txn_93f1c2",
///   "status": "paid",
///   "amount_cents": 24000,
///   "currency": "MYR"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCallback {
    pub order_id: String,
    pub transaction_id: String,
    pub status: CallbackStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub failure_reason: Option<String>,
}

/// Response for a receipt of a gateway callback.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub received: bool,
}
