//! Booking and passenger models plus their API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::payment::PaymentResponse;

/// Lifecycle of a booking. Mirrors the `booking_status` Postgres enum.
///
/// - `pending`: seats held, waiting for payment until `expires_at`
/// - `confirmed`: paid
/// - `cancelled`: expired unpaid, or cancelled by the owner
/// - `completed`: the trip has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether a ticket can be issued for a booking in this state.
    pub fn is_ticketed(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

/// Represents a record from the `bookings` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub business_id: Uuid,
    pub service_id: Uuid,
    pub slot_id: Uuid,

    /// Human-readable reference, e.g. `BT-7KQ2MZ9X`
    pub ref_code: String,

    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub pax: i32,
    pub total_cents: i64,
    pub currency: String,
    pub status: BookingStatus,

    /// Seats are released by `cancel_expired_bookings()` once this passes
    /// while the booking is still pending
    pub expires_at: DateTime<Utc>,

    pub checked_in_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a record from the `passengers` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub full_name: String,
    pub id_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A booking joined with the service, slot and business it belongs to.
///
/// This is what tickets, verification and the public lookup render.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingSummary {
    pub id: Uuid,
    pub business_id: Uuid,
    pub slot_id: Uuid,
    pub ref_code: String,
    pub status: BookingStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub pax: i32,
    pub total_cents: i64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub business_name: String,
}

/// Passenger entry in a booking request.
#[derive(Debug, Clone, Deserialize)]
pub struct PassengerInput {
    pub full_name: String,
    pub id_number: Option<String>,
}

/// Customer booking request.
///
/// ```json
/// {
///   "slot_id": "550e8400-e29b-41d4-a716-446655440000",
///   "customer_name": "Aisha Rahman",
///   "customer_email": "aisha@example.com",
///   "customer_phone": "+60 12 345 6789",
///   "pax": 2,
///   "passengers": [
///     { "full_name": "Aisha Rahman" },
///     { "full_name": "Daniel Lim", "id_number": "A1234567" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub slot_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub pax: i32,
    #[serde(default)]
    pub passengers: Vec<PassengerInput>,
}

/// Owner booking listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub slot_id: Option<Uuid>,
}

/// Booking as shown to the customer who holds the ref code.
#[derive(Debug, Serialize)]
pub struct PublicBookingResponse {
    pub ref_code: String,
    pub status: BookingStatus,
    pub business_name: String,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub customer_name: String,
    pub pax: i32,
    pub total_cents: i64,
    pub currency: String,

    /// Only meaningful while the booking is pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_before: Option<DateTime<Utc>>,
}

impl From<BookingSummary> for PublicBookingResponse {
    fn from(summary: BookingSummary) -> Self {
        let pay_before =
            (summary.status == BookingStatus::Pending).then_some(summary.expires_at);
        Self {
            ref_code: summary.ref_code,
            status: summary.status,
            business_name: summary.business_name,
            service_name: summary.service_name,
            departure_at: summary.departure_at,
            customer_name: summary.customer_name,
            pax: summary.pax,
            total_cents: summary.total_cents,
            currency: summary.currency,
            pay_before,
        }
    }
}

/// Response to a successful booking request.
#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub id: Uuid,
    pub ref_code: String,
    pub status: BookingStatus,
    pub pax: i32,
    pub total_cents: i64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Booking> for CreateBookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            ref_code: booking.ref_code,
            status: booking.status,
            pax: booking.pax,
            total_cents: booking.total_cents,
            currency: booking.currency,
            expires_at: booking.expires_at,
        }
    }
}

/// Full booking record for the owner dashboard.
#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
    pub payments: Vec<PaymentResponse>,
}

/// Result of scanning a ticket QR code.
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub ref_code: String,
    pub valid: bool,
    pub status: BookingStatus,
    pub customer_name: String,
    pub pax: i32,
    pub service_name: String,
    pub departure_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl From<BookingSummary> for VerificationResponse {
    fn from(summary: BookingSummary) -> Self {
        Self {
            valid: summary.status == BookingStatus::Confirmed,
            ref_code: summary.ref_code,
            status: summary.status,
            customer_name: summary.customer_name,
            pax: summary.pax,
            service_name: summary.service_name,
            departure_at: summary.departure_at,
            checked_in_at: summary.checked_in_at,
        }
    }
}
