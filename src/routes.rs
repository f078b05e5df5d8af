//! HTTP route table.
//!
//! Three groups share one `AppState`:
//! - owner routes behind the business API key
//! - the cron route behind the shared cron secret
//! - public routes (customer booking flow, gateway callback, health)

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers,
    middleware::auth::{auth_middleware, cron_middleware},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let owner_routes = Router::new()
        .route("/api/v1/business", get(handlers::businesses::get_business))
        // Services
        .route(
            "/api/v1/services",
            post(handlers::services::create_service).get(handlers::services::list_services),
        )
        .route(
            "/api/v1/services/{id}",
            get(handlers::services::get_service)
                .patch(handlers::services::update_service)
                .delete(handlers::services::deactivate_service),
        )
        // Slots
        .route(
            "/api/v1/services/{id}/slots",
            post(handlers::slots::create_slot).get(handlers::slots::list_slots),
        )
        .route(
            "/api/v1/slots/{id}/capacity",
            put(handlers::slots::update_capacity),
        )
        .route("/api/v1/slots/{id}/block", post(handlers::slots::block_slot))
        .route(
            "/api/v1/slots/{id}/unblock",
            post(handlers::slots::unblock_slot),
        )
        .route(
            "/api/v1/slots/{id}/manifest.pdf",
            get(handlers::documents::download_manifest),
        )
        // Bookings
        .route("/api/v1/bookings", get(handlers::bookings::list_bookings))
        .route("/api/v1/bookings/{id}", get(handlers::bookings::get_booking))
        .route(
            "/api/v1/bookings/{id}/cancel",
            post(handlers::bookings::cancel_booking),
        )
        // Verification
        .route(
            "/api/v1/verify/{ref_code}",
            get(handlers::verification::verify_ticket),
        )
        .route(
            "/api/v1/verify/{ref_code}/check-in",
            post(handlers::verification::check_in),
        )
        // Webhooks
        .route(
            "/api/v1/webhooks",
            post(handlers::webhooks::create_webhook).get(handlers::webhooks::list_webhooks),
        )
        .route(
            "/api/v1/webhooks/{id}",
            delete(handlers::webhooks::delete_webhook),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cron_routes = Router::new()
        .route(
            "/api/v1/cron/cancel-expired",
            post(handlers::cron::cancel_expired),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            cron_middleware,
        ));

    // Booking pages are served from other origins
    let public_routes = Router::new()
        .route(
            "/api/v1/businesses",
            post(handlers::businesses::create_business),
        )
        .route(
            "/api/v1/public/businesses/{slug}/services",
            get(handlers::services::list_public_services),
        )
        .route(
            "/api/v1/public/services/{id}/slots",
            get(handlers::slots::list_public_slots),
        )
        .route(
            "/api/v1/public/availability",
            get(handlers::availability::check_availability),
        )
        .route(
            "/api/v1/public/bookings",
            post(handlers::bookings::create_booking),
        )
        .route(
            "/api/v1/public/bookings/{ref_code}",
            get(handlers::bookings::get_public_booking),
        )
        .route(
            "/api/v1/public/bookings/{ref_code}/payments",
            post(handlers::payments::create_payment),
        )
        .route(
            "/api/v1/public/bookings/{ref_code}/ticket.pdf",
            get(handlers::documents::download_ticket),
        )
        .route(
            "/api/v1/public/bookings/{ref_code}/receipt.pdf",
            get(handlers::documents::download_receipt),
        )
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/payments/callback",
            post(handlers::payments::payment_callback),
        )
        .merge(owner_routes)
        .merge(cron_routes)
        .merge(public_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use rstest::{fixture, rstest};
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{config::tests::test_config, handlers::payments::SIGNATURE_HEADER};

    // Every request below is rejected before the pool is asked for a connection.
    #[fixture]
    fn app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        build_router(AppState::new(pool, config).expect("state"))
    }

    async fn error_code(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: Value = serde_json::from_slice(&bytes).expect("json body");
        json["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[rstest]
    #[case("GET", "/api/v1/business")]
    #[case("GET", "/api/v1/bookings")]
    #[case("POST", "/api/v1/verify/BT-7KQ2MZ9X/check-in")]
    #[case("GET", "/api/v1/webhooks")]
    #[tokio::test]
    async fn owner_routes_require_an_api_key(
        app: Router,
        #[case] method: &str,
        #[case] uri: &str,
    ) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "invalid_api_key");
    }

    #[rstest]
    #[case(None)]
    #[case(Some("Bearer not-the-secret"))]
    #[tokio::test]
    async fn cron_route_requires_the_secret(app: Router, #[case] auth: Option<&str>) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/cron/cancel-expired");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let response = app
            .oneshot(builder.body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[tokio::test]
    async fn availability_rejects_zero_pax(app: Router) {
        let request = Request::builder()
            .uri("/api/v1/public/availability?slot_id=6a1f5a3e-8c44-4c1b-9d5e-0f3b2a1c7d90&pax=0")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[rstest]
    #[case("/api/v1/public/availability?slot_id=6a1f5a3e-8c44-4c1b-9d5e-0f3b2a1c7d90&pax=two")]
    #[case("/api/v1/public/availability?slot_id=not-a-uuid&pax=2")]
    #[case("/api/v1/public/availability")]
    #[tokio::test]
    async fn malformed_query_strings_use_the_error_envelope(app: Router, #[case] uri: &str) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[rstest]
    #[case(
        Some("application/json"),
        r#"{
            "slot_id": "6a1f5a3e-8c44-4c1b-9d5e-0f3b2a1c7d90",
            "customer_name": "Aisha",
            "customer_email": "aisha@example.com",
            "pax": "two"
        }"#
    )]
    #[case(Some("application/json"), "{not json")]
    #[case(None, r#"{"slot_id":"6a1f5a3e-8c44-4c1b-9d5e-0f3b2a1c7d90"}"#)]
    #[tokio::test]
    async fn malformed_booking_bodies_are_invalid_requests(
        app: Router,
        #[case] content_type: Option<&str>,
        #[case] body: &'static str,
    ) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/public/bookings");
        if let Some(value) = content_type {
            builder = builder.header(header::CONTENT_TYPE, value);
        }

        let response = app
            .oneshot(builder.body(Body::from(body)).expect("request"))
            .await
            .expect("response");

        // Never 422: that status means the slot is short of seats
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[rstest]
    #[case("/api/v1/public/bookings/not-a-ref")]
    #[case("/api/v1/public/bookings/BT-0000/ticket.pdf")]
    #[case("/api/v1/public/bookings/XX-7KQ2MZ9X/receipt.pdf")]
    #[tokio::test]
    async fn malformed_ref_codes_are_not_found(app: Router, #[case] uri: &str) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_code(response).await, "booking_not_found");
    }

    #[rstest]
    #[case(None)]
    #[case(Some("sha256=deadbeef"))]
    #[tokio::test]
    async fn callback_rejects_bad_signatures(app: Router, #[case] signature: Option<&str>) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/payments/callback")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = signature {
            builder = builder.header(SIGNATURE_HEADER, value);
        }
        let body = r#"{
            "order_id": "BT-7KQ2MZ9X",
            "transaction_id": "txn_1",
            "status": "paid",
            "amount_cents": 100,
            "currency": "MYR"
        }"#;

        let response = app
            .oneshot(builder.body(Body::from(body)).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "invalid_signature");
    }

    #[rstest]
    #[tokio::test]
    async fn public_routes_answer_cors_preflight(app: Router) {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/public/bookings")
            .header(header::ORIGIN, "https://coralbay.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert!(response.status().is_success());
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
