//! Business (tenant) model and onboarding request/response types.
//!
//! A business is the tenant boundary: every service, slot, booking and
//! webhook endpoint hangs off one. Owners authenticate with an API key that
//! is issued once at onboarding and stored only as a SHA-256 hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a business record from the `businesses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,

    /// Display name printed on tickets, receipts and manifests
    pub name: String,

    /// URL-safe identifier used by the public booking endpoints
    pub slug: String,

    pub contact_email: String,

    /// ISO 4217 currency all prices of this business are quoted in
    pub currency: String,

    /// SHA-256 hash of the owner's API key (64 hex characters)
    pub api_key_hash: String,

    /// Inactive businesses can neither authenticate nor take bookings
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Onboarding request.
///
/// ```json
/// {
///   "name": "Coral Bay Cruises",
///   "slug": "coral-bay",
///   "contact_email": "ops@coralbay.example",
///   "currency": "MYR"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub slug: String,
    pub contact_email: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "MYR".to_string()
}

/// Business profile returned to clients. Never includes the key hash.
#[derive(Debug, Serialize)]
pub struct BusinessResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub contact_email: String,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Business> for BusinessResponse {
    fn from(business: Business) -> Self {
        Self {
            id: business.id,
            name: business.name,
            slug: business.slug,
            contact_email: business.contact_email,
            currency: business.currency,
            is_active: business.is_active,
            created_at: business.created_at,
        }
    }
}

/// Response to a successful onboarding.
///
/// The plaintext `api_key` appears here and nowhere else.
#[derive(Debug, Serialize)]
pub struct OnboardResponse {
    #[serde(flatten)]
    pub business: BusinessResponse,
    pub api_key: String,
}
