//! Error types and HTTP error response handling.
//!
//! Every handler returns `Result<T, AppError>`. The `IntoResponse` impl below
//! turns an error into a status code and a JSON body of the form:
//!
//! ```json
//! { "error": { "code": "slot_not_found", "message": "Slot not found" } }
//! ```

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed. Details are logged, never returned.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Business API key is missing, invalid, or inactive.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Cron secret is missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Payment gateway callback signature did not verify.
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Business not found")]
    BusinessNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Webhook not found")]
    WebhookNotFound,

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    #[error("Invalid webhook URL")]
    InvalidWebhookUrl(String),

    /// The request is valid but clashes with the current state of a resource.
    #[error("Conflict")]
    Conflict(String),

    /// Slot has fewer free seats than requested.
    #[error("Only {remaining} seats remaining")]
    InsufficientCapacity { remaining: i32 },

    /// Payment gateway rejected the order or could not be reached.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// PDF or QR rendering failed.
    #[error("Document error: {0}")]
    Document(String),

    /// An outbound HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// Extractor rejections use the same JSON envelope as every other error.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            AppError::BusinessNotFound => (
                StatusCode::NOT_FOUND,
                "business_not_found",
                self.to_string(),
            ),
            AppError::ServiceNotFound => {
                (StatusCode::NOT_FOUND, "service_not_found", self.to_string())
            }
            AppError::SlotNotFound => (StatusCode::NOT_FOUND, "slot_not_found", self.to_string()),
            AppError::BookingNotFound => {
                (StatusCode::NOT_FOUND, "booking_not_found", self.to_string())
            }
            AppError::PaymentNotFound => {
                (StatusCode::NOT_FOUND, "payment_not_found", self.to_string())
            }
            AppError::WebhookNotFound => {
                (StatusCode::NOT_FOUND, "webhook_not_found", self.to_string())
            }
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidWebhookUrl(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_webhook_url", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::InsufficientCapacity { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_capacity",
                self.to_string(),
            ),
            AppError::PaymentGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "payment_gateway_error",
                "The payment gateway rejected the request".to_string(),
            ),
            AppError::Database(_) | AppError::Document(_) | AppError::HttpClient(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

/// Returns true when a database error is a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;
    use serde_json::Value;

    async fn body_json(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        (status, serde_json::from_slice(&bytes).expect("body is JSON"))
    }

    #[rstest]
    #[case(AppError::InvalidApiKey, StatusCode::UNAUTHORIZED, "invalid_api_key")]
    #[case(AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized")]
    #[case(AppError::InvalidSignature, StatusCode::UNAUTHORIZED, "invalid_signature")]
    #[case(AppError::SlotNotFound, StatusCode::NOT_FOUND, "slot_not_found")]
    #[case(AppError::BookingNotFound, StatusCode::NOT_FOUND, "booking_not_found")]
    #[case(AppError::Conflict("taken".into()), StatusCode::CONFLICT, "conflict")]
    #[case(
        AppError::InsufficientCapacity { remaining: 2 },
        StatusCode::UNPROCESSABLE_ENTITY,
        "insufficient_capacity"
    )]
    #[case(
        AppError::PaymentGateway("timeout".into()),
        StatusCode::BAD_GATEWAY,
        "payment_gateway_error"
    )]
    #[tokio::test]
    async fn maps_errors_to_status_and_code(
        #[case] error: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let (actual_status, body) = body_json(error).await;
        assert_eq!(actual_status, status);
        assert_eq!(body["error"]["code"], code);
    }

    #[rstest]
    #[tokio::test]
    async fn invalid_request_carries_its_message() {
        let (status, body) =
            body_json(AppError::InvalidRequest("pax must be positive".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "pax must be positive");
    }

    #[rstest]
    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = body_json(AppError::Document("font table corrupt".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");

        let (status, body) = body_json(AppError::Database(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("RowNotFound"));
    }

    #[rstest]
    #[tokio::test]
    async fn http_client_errors_are_internal() {
        // URL parsing fails before any connection is attempted
        let error = reqwest::get("not a url").await.expect_err("invalid url");
        let (status, body) = body_json(AppError::from(error)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "internal_error");
    }

    #[rstest]
    fn capacity_message_names_remaining_seats() {
        assert_eq!(
            AppError::InsufficientCapacity { remaining: 3 }.to_string(),
            "Only 3 seats remaining"
        );
    }
}
