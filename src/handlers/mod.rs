//! HTTP request handlers.
//!
//! Each handler extracts request data, calls a service (or runs a single
//! scoped query itself) and returns JSON, a PDF, or an `AppError`.

use crate::{error::AppError, services::booking_service};

/// Onboarding and business profile
pub mod businesses;
/// Tour service configuration
pub mod services;
/// Departure slots
pub mod slots;
/// Public availability check
pub mod availability;
/// Customer and owner booking endpoints
pub mod bookings;
/// Payment creation and gateway callbacks
pub mod payments;
/// Scheduler-triggered expiry sweep
pub mod cron;
/// Ticket, receipt and manifest downloads
pub mod documents;
/// QR ticket verification and check-in
pub mod verification;
/// Business notification webhooks
pub mod webhooks;
/// Liveness and database connectivity
pub mod health;

/// Canonicalize a ref code path segment; malformed codes are simply not found.
pub(crate) fn ref_code_param(raw: &str) -> Result<String, AppError> {
    booking_service::normalize_ref_code(raw).ok_or(AppError::BookingNotFound)
}
