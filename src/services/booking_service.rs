//! Booking service - seat reservation and booking lifecycle.
//!
//! This service handles:
//! - Request validation and ref code generation
//! - Atomic seat reservation against a locked slot row
//! - Owner cancellation with seat release
//! - Ticket check-in
//!
//! Every state change that touches `availability_slots.booked_count` happens
//! inside a PostgreSQL transaction with the slot row locked.

use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, is_unique_violation},
    models::{
        booking::{
            Booking, BookingListQuery, BookingStatus, BookingSummary, CreateBookingRequest,
            Passenger,
        },
        payment::Payment,
        slot::{Slot, UnavailableReason},
    },
    services::availability_service::{evaluate, validate_pax},
};

/// Largest party a single booking may carry.
pub const MAX_PAX: i32 = 50;

const REF_CODE_PREFIX: &str = "BT-";
const REF_CODE_LEN: usize = 8;
/// No `0 O 1 I L`, so codes survive being read aloud or retyped.
const REF_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const REF_CODE_ATTEMPTS: usize = 5;

/// Shared projection for [`BookingSummary`].
const SUMMARY_SELECT: &str = r#"
    SELECT b.id, b.business_id, b.slot_id, b.ref_code, b.status,
           b.customer_name, b.customer_email, b.customer_phone,
           b.pax, b.total_cents, b.currency, b.expires_at, b.checked_in_at, b.created_at,
           s.name AS service_name,
           sl.departure_at,
           biz.name AS business_name
    FROM bookings b
    JOIN services s ON s.id = b.service_id
    JOIN availability_slots sl ON sl.id = b.slot_id
    JOIN businesses biz ON biz.id = b.business_id
"#;

/// Generate a fresh ref code such as `BT-7KQ2MZ9X`.
pub fn generate_ref_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(REF_CODE_PREFIX.len() + REF_CODE_LEN);
    code.push_str(REF_CODE_PREFIX);
    for _ in 0..REF_CODE_LEN {
        let idx = rng.random_range(0..REF_CODE_ALPHABET.len());
        code.push(char::from(REF_CODE_ALPHABET[idx]));
    }
    code
}

/// Canonicalize a ref code typed or scanned by a human.
///
/// Returns `None` when the input cannot be a ref code at all, so callers can
/// answer 404 without a query.
pub fn normalize_ref_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    let body = code.strip_prefix(REF_CODE_PREFIX)?;
    let well_formed =
        body.len() == REF_CODE_LEN && body.bytes().all(|b| REF_CODE_ALPHABET.contains(&b));
    well_formed.then_some(code)
}

fn looks_like_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Validate a booking request before any database work.
pub fn validate_booking_request(request: &CreateBookingRequest) -> Result<(), AppError> {
    validate_pax(request.pax)?;

    if request.pax > MAX_PAX {
        return Err(AppError::InvalidRequest(format!(
            "pax cannot exceed {MAX_PAX}"
        )));
    }

    let name = request.customer_name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(AppError::InvalidRequest(
            "customer_name must be 1 to 200 characters".to_string(),
        ));
    }

    if !looks_like_email(request.customer_email.trim()) {
        return Err(AppError::InvalidRequest(
            "customer_email is not a valid email address".to_string(),
        ));
    }

    if request
        .customer_phone
        .as_deref()
        .is_some_and(|phone| phone.trim().len() > 32)
    {
        return Err(AppError::InvalidRequest(
            "customer_phone cannot exceed 32 characters".to_string(),
        ));
    }

    // pax is positive past validate_pax
    let max_passengers = usize::try_from(request.pax).unwrap_or(0);
    if request.passengers.len() > max_passengers {
        return Err(AppError::InvalidRequest(
            "more passengers listed than pax".to_string(),
        ));
    }

    if request
        .passengers
        .iter()
        .any(|p| p.full_name.trim().is_empty() || p.full_name.trim().len() > 200)
    {
        return Err(AppError::InvalidRequest(
            "passenger full_name must be 1 to 200 characters".to_string(),
        ));
    }

    Ok(())
}

/// Reserve seats and create a pending booking.
///
/// # Process
///
/// 1. Validate the request
/// 2. Start a database transaction and lock the slot row
/// 3. Re-evaluate availability on the locked row
/// 4. Increment `booked_count`, insert booking and passengers
/// 5. Commit; retry with a new ref code on the rare code collision
///
/// # Errors
///
/// - `InvalidRequest`: request fails validation
/// - `SlotNotFound`: slot missing, or its service or business inactive
/// - `Conflict`: slot blocked or already departed
/// - `InsufficientCapacity`: not enough free seats
pub async fn create_booking(
    pool: &DbPool,
    hold_minutes: i64,
    request: &CreateBookingRequest,
) -> Result<Booking, AppError> {
    validate_booking_request(request)?;

    for attempt in 1..=REF_CODE_ATTEMPTS {
        let ref_code = generate_ref_code();
        match reserve(pool, hold_minutes, request, &ref_code).await {
            Err(AppError::Database(ref e)) if is_unique_violation(e) => {
                tracing::warn!(attempt, %ref_code, "Ref code collision, retrying");
            }
            result => return result,
        }
    }

    Err(AppError::Conflict(
        "Could not allocate a booking reference, please retry".to_string(),
    ))
}

async fn reserve(
    pool: &DbPool,
    hold_minutes: i64,
    request: &CreateBookingRequest,
    ref_code: &str,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    // FOR UPDATE serializes concurrent bookings of the same departure
    let slot = sqlx::query_as::<_, Slot>(
        "SELECT * FROM availability_slots WHERE id = $1 FOR UPDATE",
    )
    .bind(request.slot_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    let (price_cents, currency): (i64, String) = sqlx::query_as(
        r#"
        SELECT s.price_cents, b.currency
        FROM services s
        JOIN businesses b ON b.id = s.business_id
        WHERE s.id = $1 AND s.is_active AND b.is_active
        "#,
    )
    .bind(slot.service_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    let now = Utc::now();
    let availability = evaluate(&slot, request.pax, now);
    match availability.unavailable {
        None => {}
        Some(UnavailableReason::Blocked) => {
            return Err(AppError::Conflict(
                "This departure is not taking bookings".to_string(),
            ));
        }
        Some(UnavailableReason::Departed) => {
            return Err(AppError::Conflict(
                "This departure has already left".to_string(),
            ));
        }
        Some(UnavailableReason::InsufficientCapacity) => {
            return Err(AppError::InsufficientCapacity {
                remaining: availability.remaining,
            });
        }
    }

    let total_cents = price_cents
        .checked_mul(i64::from(request.pax))
        .ok_or_else(|| AppError::InvalidRequest("Booking total is too large".to_string()))?;

    sqlx::query(
        r#"
        UPDATE availability_slots
        SET booked_count = booked_count + $1,
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(request.pax)
    .bind(slot.id)
    .execute(&mut *tx)
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            business_id, service_id, slot_id, ref_code,
            customer_name, customer_email, customer_phone,
            pax, total_cents, currency, status, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11)
        RETURNING *
        "#,
    )
    .bind(slot.business_id)
    .bind(slot.service_id)
    .bind(slot.id)
    .bind(ref_code)
    .bind(request.customer_name.trim())
    .bind(request.customer_email.trim().to_lowercase())
    .bind(request.customer_phone.as_deref().map(str::trim))
    .bind(request.pax)
    .bind(total_cents)
    .bind(&currency)
    .bind(now + Duration::minutes(hold_minutes))
    .fetch_one(&mut *tx)
    .await?;

    for passenger in &request.passengers {
        sqlx::query("INSERT INTO passengers (booking_id, full_name, id_number) VALUES ($1, $2, $3)")
            .bind(booking.id)
            .bind(passenger.full_name.trim())
            .bind(passenger.id_number.as_deref().map(str::trim))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(
        ref_code = %booking.ref_code,
        slot_id = %slot.id,
        pax = booking.pax,
        "Booking created"
    );

    Ok(booking)
}

/// Look up a booking summary by ref code, across all businesses.
pub async fn find_summary_by_ref(
    pool: &DbPool,
    ref_code: &str,
) -> Result<Option<BookingSummary>, AppError> {
    let summary = sqlx::query_as::<_, BookingSummary>(&format!(
        "{SUMMARY_SELECT} WHERE b.ref_code = $1"
    ))
    .bind(ref_code)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

/// Look up a booking summary by ref code within one business.
pub async fn find_owned_summary_by_ref(
    pool: &DbPool,
    business_id: Uuid,
    ref_code: &str,
) -> Result<Option<BookingSummary>, AppError> {
    let summary = sqlx::query_as::<_, BookingSummary>(&format!(
        "{SUMMARY_SELECT} WHERE b.ref_code = $1 AND b.business_id = $2"
    ))
    .bind(ref_code)
    .bind(business_id)
    .fetch_optional(pool)
    .await?;

    Ok(summary)
}

/// Bookings of one business, newest first, optionally filtered.
pub async fn list_bookings(
    pool: &DbPool,
    business_id: Uuid,
    query: &BookingListQuery,
) -> Result<Vec<Booking>, AppError> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE business_id = $1
          AND ($2::booking_status IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR slot_id = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(business_id)
    .bind(query.status)
    .bind(query.slot_id)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

/// One booking of a business together with its passengers and payments.
pub async fn get_booking_detail(
    pool: &DbPool,
    business_id: Uuid,
    booking_id: Uuid,
) -> Result<(Booking, Vec<Passenger>, Vec<Payment>), AppError> {
    let booking =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND business_id = $2")
            .bind(booking_id)
            .bind(business_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::BookingNotFound)?;

    let passengers = list_passengers(pool, booking.id).await?;

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC",
    )
    .bind(booking.id)
    .fetch_all(pool)
    .await?;

    Ok((booking, passengers, payments))
}

pub async fn list_passengers(pool: &DbPool, booking_id: Uuid) -> Result<Vec<Passenger>, AppError> {
    let passengers = sqlx::query_as::<_, Passenger>(
        "SELECT * FROM passengers WHERE booking_id = $1 ORDER BY created_at, full_name",
    )
    .bind(booking_id)
    .fetch_all(pool)
    .await?;

    Ok(passengers)
}

/// Owner cancellation of a pending or confirmed booking.
///
/// Seats go back to the slot in the same transaction. Paid payments are
/// flagged `needs_refund`; pending ones expire.
///
/// # Errors
///
/// - `BookingNotFound`: no such booking for this business
/// - `Conflict`: booking already cancelled or completed
pub async fn cancel_booking(
    pool: &DbPool,
    business_id: Uuid,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let status: BookingStatus = sqlx::query_scalar(
        "SELECT status FROM bookings WHERE id = $1 AND business_id = $2 FOR UPDATE",
    )
    .bind(booking_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::BookingNotFound)?;

    if !matches!(status, BookingStatus::Pending | BookingStatus::Confirmed) {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "A {} booking cannot be cancelled",
            status.as_str()
        )));
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = 'cancelled',
            cancelled_at = NOW(),
            cancel_reason = 'owner_cancelled',
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE availability_slots
        SET booked_count = GREATEST(booked_count - $1, 0),
            updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(booking.pax)
    .bind(booking.slot_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE payments
        SET needs_refund = (status = 'paid'),
            status = CASE WHEN status = 'pending' THEN 'expired'::payment_status ELSE status END,
            updated_at = NOW()
        WHERE booking_id = $1 AND status IN ('paid', 'pending')
        "#,
    )
    .bind(booking_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(ref_code = %booking.ref_code, "Booking cancelled by owner");

    Ok(booking)
}

/// Mark a confirmed booking as boarded.
///
/// # Errors
///
/// - `BookingNotFound`: unknown ref code for this business
/// - `Conflict`: not confirmed, or already checked in
pub async fn check_in(
    pool: &DbPool,
    business_id: Uuid,
    ref_code: &str,
) -> Result<BookingSummary, AppError> {
    let summary = find_owned_summary_by_ref(pool, business_id, ref_code)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    if summary.status != BookingStatus::Confirmed {
        return Err(AppError::Conflict(format!(
            "A {} booking cannot be checked in",
            summary.status.as_str()
        )));
    }

    // The status and NULL guards make a concurrent double check-in lose cleanly.
    let updated = sqlx::query(
        r#"
        UPDATE bookings
        SET checked_in_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'confirmed' AND checked_in_at IS NULL
        "#,
    )
    .bind(summary.id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::Conflict("Booking is already checked in".to_string()));
    }

    tracing::info!(ref_code = %summary.ref_code, "Passengers checked in");

    find_owned_summary_by_ref(pool, business_id, ref_code)
        .await?
        .ok_or(AppError::BookingNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::PassengerInput;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            slot_id: Uuid::new_v4(),
            customer_name: "Aisha Rahman".to_string(),
            customer_email: "aisha@example.com".to_string(),
            customer_phone: Some("+60 12 345 6789".to_string()),
            pax: 2,
            passengers: vec![
                PassengerInput {
                    full_name: "Aisha Rahman".to_string(),
                    id_number: None,
                },
                PassengerInput {
                    full_name: "Daniel Lim".to_string(),
                    id_number: Some("A1234567".to_string()),
                },
            ],
        }
    }

    #[rstest]
    fn ref_codes_have_expected_shape() {
        for _ in 0..200 {
            let code = generate_ref_code();
            assert_eq!(code.len(), 11);
            assert_eq!(normalize_ref_code(&code), Some(code.clone()));
        }
    }

    #[rstest]
    fn ref_codes_avoid_ambiguous_characters() {
        for _ in 0..200 {
            let code = generate_ref_code();
            let body = &code[REF_CODE_PREFIX.len()..];
            assert!(!body.contains(['0', 'O', '1', 'I', 'L']), "{code}");
        }
    }

    #[rstest]
    #[case(" bt-7kq2mz9x ", Some("BT-7KQ2MZ9X"))]
    #[case("BT-7KQ2MZ9X", Some("BT-7KQ2MZ9X"))]
    #[case("BT-7KQ2MZ9", None)]
    #[case("BT-7KQ2MZ9O", None)]
    #[case("XX-7KQ2MZ9X", None)]
    #[case("", None)]
    fn normalizes_ref_codes(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_ref_code(input).as_deref(), expected);
    }

    #[rstest]
    fn valid_request_passes(request: CreateBookingRequest) {
        assert!(validate_booking_request(&request).is_ok());
    }

    #[rstest]
    fn passengers_are_optional(mut request: CreateBookingRequest) {
        request.passengers.clear();
        assert!(validate_booking_request(&request).is_ok());
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(MAX_PAX + 1)]
    fn rejects_out_of_range_pax(mut request: CreateBookingRequest, #[case] pax: i32) {
        request.pax = pax;
        request.passengers.clear();
        assert!(matches!(
            validate_booking_request(&request),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[rstest]
    fn rejects_more_passengers_than_pax(mut request: CreateBookingRequest) {
        request.pax = 1;
        assert!(matches!(
            validate_booking_request(&request),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case("no-at-sign.example.com")]
    #[case("two@@example.com")]
    #[case("user@localhost")]
    #[case("user name@example.com")]
    #[case("user@.example.com")]
    fn rejects_bad_emails(mut request: CreateBookingRequest, #[case] email: &str) {
        request.customer_email = email.to_string();
        assert!(validate_booking_request(&request).is_err());
    }

    #[rstest]
    fn rejects_blank_customer_name(mut request: CreateBookingRequest) {
        request.customer_name = "   ".to_string();
        assert!(validate_booking_request(&request).is_err());
    }

    #[rstest]
    fn rejects_blank_passenger_name(mut request: CreateBookingRequest) {
        request.passengers[1].full_name = String::new();
        assert!(validate_booking_request(&request).is_err());
    }
}
