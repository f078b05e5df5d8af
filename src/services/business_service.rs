//! Business onboarding and API key issuance.

use crate::{
    db::DbPool,
    error::{AppError, is_unique_violation},
    models::business::{Business, CreateBusinessRequest},
    services::signature,
};

const API_KEY_PREFIX: &str = "bt_live_";

/// Generate a new plaintext API key: `bt_live_` followed by 64 hex chars.
pub fn generate_api_key() -> String {
    format!("{API_KEY_PREFIX}{}", signature::generate_secret())
}

/// Validate an onboarding request.
///
/// - `name`: 1 to 200 characters after trimming
/// - `slug`: 3 to 64 of `[a-z0-9-]`, not starting or ending with `-`
/// - `contact_email`: contains a single `@` with a dotted domain
/// - `currency`: three uppercase ASCII letters
pub fn validate_onboarding(request: &CreateBusinessRequest) -> Result<(), AppError> {
    let name = request.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(AppError::InvalidRequest(
            "name must be 1 to 200 characters".to_string(),
        ));
    }

    let slug = request.slug.as_str();
    let slug_ok = (3..=64).contains(&slug.len())
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if !slug_ok {
        return Err(AppError::InvalidRequest(
            "slug must be 3 to 64 lowercase letters, digits or hyphens".to_string(),
        ));
    }

    let email_ok = request
        .contact_email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        });
    if !email_ok {
        return Err(AppError::InvalidRequest(
            "contact_email is not a valid email address".to_string(),
        ));
    }

    if request.currency.len() != 3 || !request.currency.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AppError::InvalidRequest(
            "currency must be a three-letter ISO 4217 code".to_string(),
        ));
    }

    Ok(())
}

/// Create a business and return it together with its plaintext API key.
///
/// # Errors
///
/// - `InvalidRequest`: validation failed
/// - `Conflict`: slug already taken
pub async fn onboard(
    pool: &DbPool,
    request: &CreateBusinessRequest,
) -> Result<(Business, String), AppError> {
    validate_onboarding(request)?;

    let api_key = generate_api_key();

    let business = sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO businesses (name, slug, contact_email, currency, api_key_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(&request.slug)
    .bind(request.contact_email.trim())
    .bind(&request.currency)
    .bind(signature::sha256_hex(&api_key))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Slug '{}' is already taken", request.slug))
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(business_id = %business.id, slug = %business.slug, "Business onboarded");

    Ok((business, api_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> CreateBusinessRequest {
        CreateBusinessRequest {
            name: "Coral Bay Cruises".to_string(),
            slug: "coral-bay".to_string(),
            contact_email: "ops@coralbay.example".to_string(),
            currency: "MYR".to_string(),
        }
    }

    #[rstest]
    fn valid_request_passes(request: CreateBusinessRequest) {
        assert!(validate_onboarding(&request).is_ok());
    }

    #[rstest]
    #[case("ab")]
    #[case("Coral-Bay")]
    #[case("coral bay")]
    #[case("-coral")]
    #[case("coral-")]
    fn rejects_bad_slugs(mut request: CreateBusinessRequest, #[case] slug: &str) {
        request.slug = slug.to_string();
        assert!(validate_onboarding(&request).is_err());
    }

    #[rstest]
    #[case("myr")]
    #[case("RM")]
    #[case("EURO")]
    fn rejects_bad_currencies(mut request: CreateBusinessRequest, #[case] currency: &str) {
        request.currency = currency.to_string();
        assert!(validate_onboarding(&request).is_err());
    }

    #[rstest]
    fn api_keys_are_prefixed_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert!(a.starts_with("bt_live_"));
        assert_eq!(a.len(), "bt_live_".len() + 64);
        assert_ne!(a, b);
    }
}
