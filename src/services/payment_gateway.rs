//! HTTP client for the third-party payment gateway.
//!
//! The gateway exposes one call we need: create an order and get back a
//! hosted checkout URL. The outcome arrives later through the signed
//! callback handled in `payment_service`.

use std::{sync::Arc, time::Duration};

use url::Url;

use crate::{
    error::AppError,
    models::payment::{GatewayOrderRequest, GatewayOrderResponse},
};

#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    orders_url: Url,
    api_key: Arc<str>,
}

impl PaymentGateway {
    /// Create a gateway client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the URL does not parse, `HttpClient` if the client
    /// cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let orders_url = orders_url(base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            orders_url,
            api_key: Arc::from(api_key),
        })
    }

    /// Create an order and return the checkout URL the customer is sent to.
    ///
    /// # Errors
    ///
    /// `PaymentGateway` when the request fails to send, the gateway answers
    /// with a non-2xx status, or the answer does not parse.
    pub async fn create_order(
        &self,
        order: &GatewayOrderRequest<'_>,
    ) -> Result<GatewayOrderResponse, AppError> {
        let response = self
            .client
            .post(self.orders_url.clone())
            .bearer_auth(&*self.api_key)
            .json(order)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PaymentGateway(format!(
                "gateway returned {status}: {body}"
            )));
        }

        response
            .json::<GatewayOrderResponse>()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("invalid gateway response: {e}")))
    }
}

/// `{base}/v1/orders`, tolerating a base URL with or without a trailing slash.
fn orders_url(base_url: &str) -> Result<Url, AppError> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
        .map_err(|_| AppError::InvalidRequest("Invalid payment gateway URL".to_string()))?;
    base.join("v1/orders")
        .map_err(|_| AppError::InvalidRequest("Invalid payment gateway URL".to_string()))
}
