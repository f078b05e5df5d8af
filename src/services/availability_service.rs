//! Slot availability decisions.
//!
//! The public availability check reads the slot and decides without taking a
//! lock, so its answer can be stale by the time a booking arrives. Booking
//! creation re-runs [`evaluate`] on a row locked with `FOR UPDATE`, and the
//! `booked_within_capacity` check constraint backs both up.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::slot::{AvailabilityResponse, Slot, UnavailableReason},
};

/// Outcome of evaluating a slot against a requested passenger count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub remaining: i32,
    pub unavailable: Option<UnavailableReason>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }
}

/// Decide whether `slot` can seat `pax` more passengers at time `now`.
///
/// Checked in order: blocked, departed, capacity.
pub fn evaluate(slot: &Slot, pax: i32, now: DateTime<Utc>) -> Availability {
    let remaining = slot.remaining();

    let unavailable = if slot.is_blocked {
        Some(UnavailableReason::Blocked)
    } else if slot.departure_at <= now {
        Some(UnavailableReason::Departed)
    } else if remaining < pax {
        Some(UnavailableReason::InsufficientCapacity)
    } else {
        None
    };

    Availability {
        remaining,
        unavailable,
    }
}

/// Reject non-positive passenger counts before touching the database.
pub fn validate_pax(pax: i32) -> Result<(), AppError> {
    if pax <= 0 {
        return Err(AppError::InvalidRequest(
            "pax must be a positive number".to_string(),
        ));
    }
    Ok(())
}

/// Check whether a slot can take `pax` passengers right now.
///
/// # Errors
///
/// - `InvalidRequest`: `pax` is zero or negative
/// - `SlotNotFound`: no such slot, or its service or business is inactive
pub async fn check_availability(
    pool: &DbPool,
    slot_id: Uuid,
    pax: i32,
) -> Result<AvailabilityResponse, AppError> {
    validate_pax(pax)?;

    let slot = sqlx::query_as::<_, Slot>(
        r#"
        SELECT sl.*
        FROM availability_slots sl
        JOIN services s ON s.id = sl.service_id
        JOIN businesses b ON b.id = sl.business_id
        WHERE sl.id = $1 AND s.is_active AND b.is_active
        "#,
    )
    .bind(slot_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    let availability = evaluate(&slot, pax, Utc::now());

    Ok(AvailabilityResponse {
        slot_id: slot.id,
        available: availability.is_available(),
        remaining: availability.remaining,
        reason: availability.unavailable,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    pub(crate) fn now() -> DateTime<Utc> {
        "2026-03-01T08:00:00Z".parse().expect("valid timestamp")
    }

    pub(crate) fn slot(capacity: i32, booked_count: i32, departure_at: DateTime<Utc>) -> Slot {
        Slot {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            departure_at,
            capacity,
            booked_count,
            is_blocked: false,
            created_at: departure_at - Duration::days(30),
            updated_at: departure_at - Duration::days(30),
        }
    }

    #[rstest]
    fn open_slot_with_room_is_available(now: DateTime<Utc>) {
        let result = evaluate(&slot(20, 5, now + Duration::hours(4)), 3, now);
        assert!(result.is_available());
        assert_eq!(result.remaining, 15);
    }

    #[rstest]
    fn exact_fit_is_available(now: DateTime<Utc>) {
        let result = evaluate(&slot(10, 7, now + Duration::hours(1)), 3, now);
        assert!(result.is_available());
        assert_eq!(result.remaining, 3);
    }

    #[rstest]
    fn one_over_capacity_is_rejected(now: DateTime<Utc>) {
        let result = evaluate(&slot(10, 7, now + Duration::hours(1)), 4, now);
        assert_eq!(
            result.unavailable,
            Some(UnavailableReason::InsufficientCapacity)
        );
        assert_eq!(result.remaining, 3);
    }

    #[rstest]
    fn blocked_wins_over_everything(now: DateTime<Utc>) {
        let mut blocked = slot(10, 10, now - Duration::hours(1));
        blocked.is_blocked = true;
        assert_eq!(
            evaluate(&blocked, 1, now).unavailable,
            Some(UnavailableReason::Blocked)
        );
    }

    #[rstest]
    #[case(Duration::zero())]
    #[case(Duration::minutes(-5))]
    fn departed_slot_is_rejected(now: DateTime<Utc>, #[case] offset: Duration) {
        let result = evaluate(&slot(10, 0, now + offset), 1, now);
        assert_eq!(result.unavailable, Some(UnavailableReason::Departed));
    }

    #[rstest]
    fn overbooked_slot_reports_zero_remaining(now: DateTime<Utc>) {
        let result = evaluate(&slot(8, 10, now + Duration::days(1)), 1, now);
        assert_eq!(result.remaining, 0);
        assert!(!result.is_available());
    }

    #[rstest]
    #[case(0)]
    #[case(-2)]
    fn non_positive_pax_is_invalid(#[case] pax: i32) {
        assert!(matches!(validate_pax(pax), Err(AppError::InvalidRequest(_))));
    }
}
