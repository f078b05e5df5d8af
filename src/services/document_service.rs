//! Loads the rows behind each PDF and hands them to the renderer.

use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::slot::Slot,
    pdf::{self, ManifestData, ManifestEntry, ReceiptData, TicketData},
    services::{booking_service, payment_service},
};

/// Ticket PDF for a confirmed or completed booking.
///
/// # Errors
///
/// - `BookingNotFound`: unknown ref code
/// - `Conflict`: booking is not (or no longer) ticketed
pub async fn ticket_pdf(
    pool: &DbPool,
    config: &Config,
    ref_code: &str,
) -> Result<Vec<u8>, AppError> {
    let summary = booking_service::find_summary_by_ref(pool, ref_code)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    if !summary.status.is_ticketed() {
        return Err(AppError::Conflict(format!(
            "No ticket is available for a {} booking",
            summary.status.as_str()
        )));
    }

    let passengers = booking_service::list_passengers(pool, summary.id)
        .await?
        .into_iter()
        .map(|p| p.full_name)
        .collect();

    pdf::render_ticket(&TicketData {
        verification_url: config.verification_url(&summary.ref_code),
        business_name: summary.business_name,
        service_name: summary.service_name,
        departure_at: summary.departure_at,
        ref_code: summary.ref_code,
        customer_name: summary.customer_name,
        pax: summary.pax,
        passengers,
    })
}

/// Receipt PDF for a booking with a settled payment.
///
/// # Errors
///
/// - `BookingNotFound`: unknown ref code
/// - `PaymentNotFound`: nothing has been paid yet
pub async fn receipt_pdf(pool: &DbPool, ref_code: &str) -> Result<Vec<u8>, AppError> {
    let summary = booking_service::find_summary_by_ref(pool, ref_code)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    let payment = payment_service::find_paid_payment(pool, summary.id)
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    pdf::render_receipt(&ReceiptData {
        business_name: summary.business_name,
        ref_code: summary.ref_code,
        customer_name: summary.customer_name,
        customer_email: summary.customer_email,
        service_name: summary.service_name,
        departure_at: summary.departure_at,
        pax: summary.pax,
        amount_cents: payment.amount_cents,
        currency: payment.currency,
        transaction_id: payment.gateway_transaction_id,
        paid_at: payment.paid_at,
    })
}

#[derive(sqlx::FromRow)]
struct ManifestRow {
    id: Uuid,
    ref_code: String,
    customer_name: String,
    customer_phone: Option<String>,
    pax: i32,
    checked_in: bool,
}

/// Manifest PDF for one of the caller's slots.
///
/// # Errors
///
/// `SlotNotFound` if the slot does not belong to the business.
pub async fn manifest_pdf(
    pool: &DbPool,
    business_id: Uuid,
    slot_id: Uuid,
) -> Result<Vec<u8>, AppError> {
    let slot = sqlx::query_as::<_, Slot>(
        "SELECT * FROM availability_slots WHERE id = $1 AND business_id = $2",
    )
    .bind(slot_id)
    .bind(business_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::SlotNotFound)?;

    let (business_name, service_name): (String, String) = sqlx::query_as(
        r#"
        SELECT b.name, s.name
        FROM services s
        JOIN businesses b ON b.id = s.business_id
        WHERE s.id = $1
        "#,
    )
    .bind(slot.service_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, ManifestRow>(
        r#"
        SELECT id, ref_code, customer_name, customer_phone, pax,
               checked_in_at IS NOT NULL AS checked_in
        FROM bookings
        WHERE slot_id = $1 AND status IN ('confirmed', 'completed')
        ORDER BY customer_name, ref_code
        "#,
    )
    .bind(slot.id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let passengers = booking_service::list_passengers(pool, row.id)
            .await?
            .into_iter()
            .map(|p| match p.id_number {
                Some(id_number) => format!("{} ({id_number})", p.full_name),
                None => p.full_name,
            })
            .collect();

        entries.push(ManifestEntry {
            ref_code: row.ref_code,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            pax: row.pax,
            checked_in: row.checked_in,
            passengers,
        });
    }

    tracing::info!(%slot_id, bookings = entries.len(), "Rendering manifest");

    pdf::render_manifest(&ManifestData {
        business_name,
        service_name,
        departure_at: slot.departure_at,
        capacity: slot.capacity,
        entries,
    })
}
