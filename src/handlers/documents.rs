//! PDF downloads.
//!
//! - GET /api/v1/public/bookings/{ref_code}/ticket.pdf
//! - GET /api/v1/public/bookings/{ref_code}/receipt.pdf
//! - GET /api/v1/slots/{id}/manifest.pdf (owner)

use axum::{
    Extension,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError, handlers::ref_code_param, middleware::auth::AuthContext,
    services::document_service, state::AppState,
};

fn pdf_response(filename: String, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
}

pub async fn download_ticket(
    State(state): State<AppState>,
    Path(ref_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ref_code = ref_code_param(&ref_code)?;
    let bytes = document_service::ticket_pdf(&state.pool, &state.config, &ref_code).await?;

    Ok(pdf_response(format!("ticket-{ref_code}.pdf"), bytes))
}

pub async fn download_receipt(
    State(state): State<AppState>,
    Path(ref_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ref_code = ref_code_param(&ref_code)?;
    let bytes = document_service::receipt_pdf(&state.pool, &ref_code).await?;

    Ok(pdf_response(format!("receipt-{ref_code}.pdf"), bytes))
}

/// Passenger manifest for a departure: confirmed and completed bookings only.
pub async fn download_manifest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(slot_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = document_service::manifest_pdf(&state.pool, auth.business_id, slot_id).await?;

    Ok(pdf_response(format!("manifest-{slot_id}.pdf"), bytes))
}
