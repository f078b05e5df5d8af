//! Authentication middleware.
//!
//! Two schemes share the `Authorization: Bearer <token>` header:
//! - owner routes take a business API key, looked up by SHA-256 hash
//! - the cron route takes the shared `CRON_SECRET`

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, models::business::Business, services::signature, state::AppState};

/// Authentication context attached to owner requests.
///
/// Handlers extract it with `Extension<AuthContext>` and scope every query
/// by `business_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub business_id: Uuid,
    pub business_name: String,
    pub currency: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Business API key authentication.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>`
/// 2. Hash the key with SHA-256
/// 3. Look up an active business with that hash
/// 4. Inject `AuthContext`, or answer 401
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = bearer_token(request.headers()).ok_or(AppError::InvalidApiKey)?;
    let key_hash = signature::sha256_hex(api_key);

    let business = sqlx::query_as::<_, Business>(
        "SELECT * FROM businesses WHERE api_key_hash = $1 AND is_active",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    request.extensions_mut().insert(AuthContext {
        business_id: business.id,
        business_name: business.name,
        currency: business.currency,
    });

    Ok(next.run(request).await)
}

/// Shared-secret authentication for the scheduler calling the cron endpoint.
///
/// Both sides are compared as SHA-256 digests so the comparison time does
/// not depend on how much of the raw secret matched.
pub async fn cron_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;

    if signature::sha256_hex(token) != signature::sha256_hex(&state.config.cron_secret) {
        tracing::warn!("Cron call with wrong secret");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(v) = value {
            map.insert(header::AUTHORIZATION, HeaderValue::from_static(v));
        }
        map
    }

    #[rstest]
    #[case(Some("Bearer bt_live_abc"), Some("bt_live_abc"))]
    #[case(Some("Bearer   padded  "), Some("padded"))]
    #[case(Some("Basic dXNlcjpwYXNz"), None)]
    #[case(Some("Bearer "), None)]
    #[case(None, None)]
    fn extracts_bearer_tokens(
        #[case] header: Option<&'static str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(bearer_token(&headers(header)), expected);
    }
}
