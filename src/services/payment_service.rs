//! Payment service - gateway orders and callback reconciliation.
//!
//! # Flow
//!
//! 1. Customer asks to pay a pending booking; a `pending` payment row is
//!    written and an order is created at the gateway
//! 2. Customer pays on the gateway's hosted checkout page
//! 3. Gateway POSTs a signed callback; the payment becomes `paid` or
//!    `failed` and a pending booking becomes `confirmed`
//!
//! The ref code doubles as the gateway order id, so callbacks are matched
//! back to bookings without a lookup table.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, is_unique_violation},
    models::{
        booking::{Booking, BookingStatus},
        payment::{CallbackStatus, GatewayCallback, GatewayOrderRequest, Payment, PaymentStatus},
        webhook::BookingEvent,
    },
    services::{signature, webhook_service},
    state::AppState,
};

/// What a verified callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Payment recorded and the booking confirmed
    Confirmed,
    /// Payment recorded, but the booking could not take it
    NeedsRefund,
    /// Payment marked failed
    Failed,
    /// Transaction id was already processed
    Replay,
}

/// Start (or resume) payment for a pending booking.
///
/// # Process
///
/// 1. Booking must be pending and inside its hold window
/// 2. A pending payment that already has a checkout URL is reused
/// 3. Otherwise insert a pending payment and create the gateway order
/// 4. On gateway failure the payment is marked `failed`
///
/// # Errors
///
/// - `BookingNotFound`: unknown ref code
/// - `Conflict`: booking not pending, or its hold expired
/// - `PaymentGateway`: gateway rejected the order (payment marked failed)
pub async fn create_payment(state: &AppState, ref_code: &str) -> Result<Payment, AppError> {
    let pool = &state.pool;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE ref_code = $1")
        .bind(ref_code)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    ensure_payable(&booking, Utc::now())?;

    if let Some(existing) = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE booking_id = $1 AND status = 'pending' AND checkout_url IS NOT NULL
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(booking.id)
    .fetch_optional(pool)
    .await?
    {
        return Ok(existing);
    }

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (booking_id, amount_cents, currency, status, gateway_order_id)
        VALUES ($1, $2, $3, 'pending', $4)
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(booking.total_cents)
    .bind(&booking.currency)
    .bind(&booking.ref_code)
    .fetch_one(pool)
    .await?;

    let base_url = state.config.public_base_url.trim_end_matches('/');
    let order = GatewayOrderRequest {
        order_id: &booking.ref_code,
        amount_cents: booking.total_cents,
        currency: &booking.currency,
        description: format!("Booking {} ({} pax)", booking.ref_code, booking.pax),
        customer_name: &booking.customer_name,
        customer_email: &booking.customer_email,
        callback_url: format!("{base_url}/api/v1/payments/callback"),
        return_url: format!("{base_url}/bookings/{}", booking.ref_code),
    };

    match state.gateway.create_order(&order).await {
        Ok(created) => {
            let payment = sqlx::query_as::<_, Payment>(
                r#"
                UPDATE payments SET checkout_url = $1, updated_at = NOW()
                WHERE id = $2
                RETURNING *
                "#,
            )
            .bind(&created.checkout_url)
            .bind(payment.id)
            .fetch_one(pool)
            .await?;

            tracing::info!(
                ref_code = %booking.ref_code,
                payment_id = %payment.id,
                "Gateway order created"
            );
            Ok(payment)
        }
        Err(e) => {
            tracing::warn!(ref_code = %booking.ref_code, error = %e, "Gateway rejected order");
            mark_failed(pool, payment.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

/// A booking can be paid while pending and inside its hold.
pub fn ensure_payable(booking: &Booking, now: chrono::DateTime<Utc>) -> Result<(), AppError> {
    if booking.status != BookingStatus::Pending {
        return Err(AppError::Conflict(format!(
            "A {} booking cannot be paid",
            booking.status.as_str()
        )));
    }
    if booking.expires_at <= now {
        return Err(AppError::Conflict(
            "The booking hold has expired".to_string(),
        ));
    }
    Ok(())
}

async fn mark_failed(pool: &DbPool, payment_id: Uuid, reason: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'failed', failure_reason = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(reason)
    .bind(payment_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// What a verified callback does to the payment and booking rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Transaction id already recorded; change nothing
    Ignore,
    /// Mark the open payment failed with the gateway's reason
    MarkFailed,
    /// Amount or currency differs from the order; mark the payment failed
    RejectAmount,
    /// Mark the payment paid and confirm the pending booking
    Confirm,
    /// Mark the payment paid, flagged for refund; the booking is no longer pending
    RecordForRefund,
    /// Second settlement of an already paid order; add a refund-flagged row
    RecordDuplicate,
}

impl CallbackAction {
    pub fn outcome(self) -> CallbackOutcome {
        match self {
            CallbackAction::Ignore => CallbackOutcome::Replay,
            CallbackAction::MarkFailed | CallbackAction::RejectAmount => CallbackOutcome::Failed,
            CallbackAction::Confirm => CallbackOutcome::Confirmed,
            CallbackAction::RecordForRefund | CallbackAction::RecordDuplicate => {
                CallbackOutcome::NeedsRefund
            }
        }
    }
}

/// Decide how a callback applies to a locked payment and its booking.
///
/// `already_seen` is whether the callback's transaction id is on record.
pub fn decide(
    payment: &Payment,
    booking_status: BookingStatus,
    callback: &GatewayCallback,
    already_seen: bool,
) -> CallbackAction {
    if already_seen {
        return CallbackAction::Ignore;
    }
    match callback.status {
        CallbackStatus::Failed => CallbackAction::MarkFailed,
        CallbackStatus::Paid if !amount_matches(payment, callback) => CallbackAction::RejectAmount,
        CallbackStatus::Paid if payment.status == PaymentStatus::Paid => {
            CallbackAction::RecordDuplicate
        }
        CallbackStatus::Paid if booking_status == BookingStatus::Pending => CallbackAction::Confirm,
        CallbackStatus::Paid => CallbackAction::RecordForRefund,
    }
}

/// Verify and apply a gateway callback.
///
/// # Errors
///
/// - `InvalidSignature`: signature header missing or wrong
/// - `InvalidRequest`: body is not a valid callback
/// - `PaymentNotFound`: no payment for the order id
pub async fn handle_callback(
    state: &AppState,
    signature_header: Option<&str>,
    body: &[u8],
) -> Result<CallbackOutcome, AppError> {
    signature::verify(&state.config.payment_webhook_secret, body, signature_header)?;

    let callback: GatewayCallback = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid callback body: {e}")))?;

    let (outcome, booking) = match apply_callback(&state.pool, &callback).await {
        // A concurrent delivery of the same transaction committed first
        Err(AppError::Database(ref e)) if is_unique_violation(e) => {
            tracing::info!(transaction_id = %callback.transaction_id, "Callback replay ignored");
            (CallbackOutcome::Replay, None)
        }
        result => result?,
    };

    if let (CallbackOutcome::Confirmed, Some(booking)) = (&outcome, booking) {
        let pool = state.pool.clone();
        let client = state.webhook_client.clone();
        tokio::spawn(async move {
            let event = BookingEvent::Confirmed;
            if let Err(e) =
                webhook_service::notify_booking_event(&pool, &client, &booking, event).await
            {
                tracing::error!(
                    ref_code = %booking.ref_code,
                    error = %e,
                    "Webhook notification failed"
                );
            }
        });
    }

    Ok(outcome)
}

async fn apply_callback(
    pool: &DbPool,
    callback: &GatewayCallback,
) -> Result<(CallbackOutcome, Option<Booking>), AppError> {
    let mut tx = pool.begin().await?;

    // Prefer the open attempt; fall back to the newest one for late callbacks
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE gateway_order_id = $1
        ORDER BY (status = 'pending') DESC, created_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(&callback.order_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::PaymentNotFound)?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(payment.booking_id)
        .fetch_one(&mut *tx)
        .await?;

    // Checked under the locks, so a concurrent delivery that committed first is visible
    let already_seen: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM payments WHERE gateway_transaction_id = $1)",
    )
    .bind(&callback.transaction_id)
    .fetch_one(&mut *tx)
    .await?;

    let action = decide(&payment, booking.status, callback, already_seen);

    match action {
        CallbackAction::Ignore => {
            tracing::info!(transaction_id = %callback.transaction_id, "Callback replay ignored");
            return Ok((CallbackOutcome::Replay, None));
        }
        CallbackAction::MarkFailed => {
            let reason = callback
                .failure_reason
                .clone()
                .unwrap_or_else(|| "declined".to_string());
            sqlx::query(
                r#"
                UPDATE payments
                SET status = 'failed', failure_reason = $1,
                    gateway_transaction_id = $2, updated_at = NOW()
                WHERE id = $3 AND status = 'pending'
                "#,
            )
            .bind(&reason)
            .bind(&callback.transaction_id)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

            tracing::info!(ref_code = %booking.ref_code, %reason, "Payment failed");
        }
        CallbackAction::RejectAmount => {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = 'failed', failure_reason = 'amount_mismatch',
                    gateway_transaction_id = $1, updated_at = NOW()
                WHERE id = $2 AND status <> 'paid'
                "#,
            )
            .bind(&callback.transaction_id)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

            tracing::warn!(
                ref_code = %booking.ref_code,
                expected = payment.amount_cents,
                received = callback.amount_cents,
                "Payment amount mismatch"
            );
        }
        CallbackAction::RecordDuplicate => {
            // Keep the first settlement intact
            sqlx::query(
                r#"
                INSERT INTO payments (
                    booking_id, amount_cents, currency, status, gateway_order_id,
                    gateway_transaction_id, needs_refund, paid_at
                )
                VALUES ($1, $2, $3, 'paid', $4, $5, TRUE, NOW())
                "#,
            )
            .bind(payment.booking_id)
            .bind(callback.amount_cents)
            .bind(&payment.currency)
            .bind(&payment.gateway_order_id)
            .bind(&callback.transaction_id)
            .execute(&mut *tx)
            .await?;

            tracing::warn!(
                ref_code = %booking.ref_code,
                transaction_id = %callback.transaction_id,
                "Order settled twice, refund required"
            );
        }
        CallbackAction::Confirm | CallbackAction::RecordForRefund => {
            let needs_refund = action == CallbackAction::RecordForRefund;
            sqlx::query(
                r#"
                UPDATE payments
                SET status = 'paid', paid_at = NOW(), gateway_transaction_id = $1,
                    needs_refund = $2, failure_reason = NULL, updated_at = NOW()
                WHERE id = $3
                "#,
            )
            .bind(&callback.transaction_id)
            .bind(needs_refund)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

            if needs_refund {
                tracing::warn!(
                    ref_code = %booking.ref_code,
                    status = booking.status.as_str(),
                    "Payment received for a booking that is no longer pending, refund required"
                );
            } else {
                sqlx::query(
                    "UPDATE bookings SET status = 'confirmed', updated_at = NOW() WHERE id = $1",
                )
                .bind(booking.id)
                .execute(&mut *tx)
                .await?;

                tracing::info!(ref_code = %booking.ref_code, "Booking confirmed");
            }
        }
    }

    tx.commit().await?;

    let mut booking = booking;
    if action == CallbackAction::Confirm {
        booking.status = BookingStatus::Confirmed;
    }

    Ok((action.outcome(), Some(booking)))
}

fn amount_matches(payment: &Payment, callback: &GatewayCallback) -> bool {
    payment.amount_cents == callback.amount_cents
        && payment.currency.eq_ignore_ascii_case(&callback.currency)
}

/// The settled payment of a booking, if any.
pub async fn find_paid_payment(
    pool: &DbPool,
    booking_id: Uuid,
) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE booking_id = $1 AND status = $2
        ORDER BY paid_at DESC
        LIMIT 1
        "#,
    )
    .bind(booking_id)
    .bind(PaymentStatus::Paid)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use rstest::{fixture, rstest};

    #[fixture]
    fn now() -> DateTime<Utc> {
        "2026-03-01T08:00:00Z".parse().expect("valid timestamp")
    }

    fn booking(status: BookingStatus, expires_at: DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            ref_code: "BT-7KQ2MZ9X".to_string(),
            customer_name: "Aisha Rahman".to_string(),
            customer_email: "aisha@example.com".to_string(),
            customer_phone: None,
            pax: 2,
            total_cents: 24_000,
            currency: "MYR".to_string(),
            status,
            expires_at,
            checked_in_at: None,
            cancelled_at: None,
            cancel_reason: None,
            created_at: expires_at - Duration::minutes(15),
            updated_at: expires_at - Duration::minutes(15),
        }
    }

    fn payment(amount_cents: i64, currency: &str) -> Payment {
        let at: DateTime<Utc> = "2026-03-01T07:50:00Z".parse().expect("valid timestamp");
        Payment {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            amount_cents,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            gateway_order_id: "BT-7KQ2MZ9X".to_string(),
            gateway_transaction_id: None,
            checkout_url: Some("https://gateway.example.com/checkout/abc".to_string()),
            failure_reason: None,
            needs_refund: false,
            paid_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn callback(amount_cents: i64, currency: &str) -> GatewayCallback {
        GatewayCallback {
            order_id: "BT-7KQ2MZ9X".to_string(),
            transaction_id: "txn_1".to_string(),
            status: CallbackStatus::Paid,
            amount_cents,
            currency: currency.to_string(),
            failure_reason: None,
        }
    }

    #[rstest]
    fn pending_booking_inside_hold_is_payable(now: DateTime<Utc>) {
        let b = booking(BookingStatus::Pending, now + Duration::minutes(5));
        assert!(ensure_payable(&b, now).is_ok());
    }

    #[rstest]
    fn expired_hold_is_not_payable(now: DateTime<Utc>) {
        let b = booking(BookingStatus::Pending, now - Duration::seconds(1));
        assert!(matches!(ensure_payable(&b, now), Err(AppError::Conflict(_))));
    }

    #[rstest]
    #[case(BookingStatus::Confirmed)]
    #[case(BookingStatus::Cancelled)]
    #[case(BookingStatus::Completed)]
    fn settled_bookings_are_not_payable(now: DateTime<Utc>, #[case] status: BookingStatus) {
        let b = booking(status, now + Duration::minutes(5));
        assert!(matches!(ensure_payable(&b, now), Err(AppError::Conflict(_))));
    }

    #[rstest]
    #[case(24_000, "MYR", true)]
    #[case(24_000, "myr", true)]
    #[case(23_999, "MYR", false)]
    #[case(24_000, "USD", false)]
    fn amount_must_match_exactly(
        #[case] amount: i64,
        #[case] currency: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(
            amount_matches(&payment(24_000, "MYR"), &callback(amount, currency)),
            expected
        );
    }

    fn settled(mut payment: Payment) -> Payment {
        payment.status = PaymentStatus::Paid;
        payment.gateway_transaction_id = Some("txn_0".to_string());
        payment
    }

    fn declined() -> GatewayCallback {
        GatewayCallback {
            status: CallbackStatus::Failed,
            failure_reason: Some("card_declined".to_string()),
            ..callback(24_000, "MYR")
        }
    }

    #[rstest]
    #[case::confirms_pending(
        payment(24_000, "MYR"),
        BookingStatus::Pending,
        callback(24_000, "MYR"),
        false,
        CallbackAction::Confirm,
    )]
    #[case::late_after_expiry(
        payment(24_000, "MYR"),
        BookingStatus::Cancelled,
        callback(24_000, "MYR"),
        false,
        CallbackAction::RecordForRefund,
    )]
    #[case::after_check_in(
        payment(24_000, "MYR"),
        BookingStatus::Completed,
        callback(24_000, "MYR"),
        false,
        CallbackAction::RecordForRefund,
    )]
    #[case::short_amount(
        payment(24_000, "MYR"),
        BookingStatus::Pending,
        callback(12_000, "MYR"),
        false,
        CallbackAction::RejectAmount,
    )]
    #[case::wrong_currency(
        payment(24_000, "MYR"),
        BookingStatus::Pending,
        callback(24_000, "USD"),
        false,
        CallbackAction::RejectAmount,
    )]
    #[case::declined(
        payment(24_000, "MYR"),
        BookingStatus::Pending,
        declined(),
        false,
        CallbackAction::MarkFailed,
    )]
    #[case::second_settlement(
        settled(payment(24_000, "MYR")),
        BookingStatus::Confirmed,
        callback(24_000, "MYR"),
        false,
        CallbackAction::RecordDuplicate,
    )]
    #[case::replayed_paid(
        settled(payment(24_000, "MYR")),
        BookingStatus::Confirmed,
        callback(24_000, "MYR"),
        true,
        CallbackAction::Ignore,
    )]
    #[case::replayed_failed(
        payment(24_000, "MYR"),
        BookingStatus::Pending,
        declined(),
        true,
        CallbackAction::Ignore,
    )]
    fn callback_decisions(
        #[case] payment: Payment,
        #[case] booking_status: BookingStatus,
        #[case] callback: GatewayCallback,
        #[case] already_seen: bool,
        #[case] expected: CallbackAction,
    ) {
        assert_eq!(decide(&payment, booking_status, &callback, already_seen), expected);
    }

    #[rstest]
    #[case(CallbackAction::Ignore, CallbackOutcome::Replay)]
    #[case(CallbackAction::MarkFailed, CallbackOutcome::Failed)]
    #[case(CallbackAction::RejectAmount, CallbackOutcome::Failed)]
    #[case(CallbackAction::Confirm, CallbackOutcome::Confirmed)]
    #[case(CallbackAction::RecordForRefund, CallbackOutcome::NeedsRefund)]
    #[case(CallbackAction::RecordDuplicate, CallbackOutcome::NeedsRefund)]
    fn actions_report_outcomes(#[case] action: CallbackAction, #[case] expected: CallbackOutcome) {
        assert_eq!(action.outcome(), expected);
    }

    #[rstest]
    fn declined_callback_leaves_pending_booking_alone() {
        let action = decide(&payment(24_000, "MYR"), BookingStatus::Pending, &declined(), false);
        assert_ne!(action, CallbackAction::Confirm);
        assert_eq!(action.outcome(), CallbackOutcome::Failed);
    }

    #[rstest]
    fn callback_body_parses() {
        let body = br#"{
            "order_id": "BT-7KQ2MZ9X",
            "transaction_id": "txn_93f1c2",
            "status": "failed",
            "amount_cents": 24000,
            "currency": "MYR",
            "failure_reason": "card_declined"
        }"#;
        let parsed: GatewayCallback = serde_json::from_slice(body).expect("parses");
        assert_eq!(parsed.status, CallbackStatus::Failed);
        assert_eq!(parsed.failure_reason.as_deref(), Some("card_declined"));
    }

    #[rstest]
    fn unknown_callback_status_is_rejected() {
        let body = br#"{
            "order_id": "BT-7KQ2MZ9X",
            "transaction_id": "t",
            "status": "refunded",
            "amount_cents": 1,
            "currency": "MYR"
        }"#;
        assert!(serde_json::from_slice::<GatewayCallback>(body).is_err());
    }
}
