//! Shared application state handed to every handler.

use std::{sync::Arc, time::Duration};

use crate::{
    config::Config, db::DbPool, error::AppError, services::payment_gateway::PaymentGateway,
};

/// Cloned per request by axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub gateway: PaymentGateway,

    /// Client for business webhook deliveries (5 second timeout)
    pub webhook_client: reqwest::Client,
}

impl AppState {
    /// Build the state, including the outbound HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway URL is invalid or an HTTP client
    /// cannot be constructed.
    pub fn new(pool: DbPool, config: Config) -> Result<Self, AppError> {
        let gateway =
            PaymentGateway::new(&config.payment_gateway_url, &config.payment_gateway_api_key)?;

        let webhook_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            gateway,
            webhook_client,
        })
    }
}
