//! Tour service model: a bookable trip a business offers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a record from the `services` table.
///
/// Prices are per passenger and stored in cents.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Service {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,

    /// Capacity given to new slots when the owner does not specify one
    pub default_capacity: i32,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a service.
///
/// ```json
/// {
///   "name": "Sunset Island Hop",
///   "description": "Three islands, snorkelling gear included",
///   "duration_minutes": 180,
///   "price_cents": 12000,
///   "default_capacity": 24
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub default_capacity: i32,
}

/// Partial update. Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price_cents: Option<i64>,
    pub default_capacity: Option<i32>,
    pub is_active: Option<bool>,
}

/// Public view of a service, without tenant internals.
#[derive(Debug, Serialize)]
pub struct PublicServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub currency: String,
}

impl PublicServiceResponse {
    pub fn new(service: Service, currency: &str) -> Self {
        Self {
            id: service.id,
            name: service.name,
            description: service.description,
            duration_minutes: service.duration_minutes,
            price_cents: service.price_cents,
            currency: currency.to_string(),
        }
    }
}
