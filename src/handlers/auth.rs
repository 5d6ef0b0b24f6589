//! Authentication HTTP handlers
//!
//! Endpoints for the wallet credential lifecycle. The nonce carrier and the
//! refresh token travel as http-only cookies scoped to `/auth`; only the
//! nonce value and the access token appear in response bodies.

use axum::{
    extract::State,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedWallet;
use crate::models::{AccessTokenResponse, LoginRequest, NonceRequest, NonceResponse, WhoAmIResponse};
use crate::state::AppState;

const NONCE_COOKIE_NAME: &str = "wg_nonce";
const REFRESH_COOKIE_NAME: &str = "wg_refresh";

/// Nonce-carrier cookie lifetime. Deliberately shorter than the nonce
/// freshness window; the cookie expiring first just forces a fresh nonce.
const NONCE_COOKIE_TTL_SECONDS: i64 = 120;

/// POST /auth/nonce - Request a challenge nonce for wallet authentication
pub async fn request_nonce(
    State(state): State<AppState>,
    Json(req): Json<NonceRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let (nonce, carrier) = state.auth_service.request_nonce(&req.public_key).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        carrier_cookie(
            NONCE_COOKIE_NAME,
            &carrier,
            NONCE_COOKIE_TTL_SECONDS,
            state.cookie_secure,
        )
        .map_err(|_| ApiError::Internal)?,
    );

    Ok((headers, Json(NonceResponse { nonce })))
}

/// POST /auth/login - Exchange a signed challenge for tokens
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let carrier = extract_cookie(&headers, NONCE_COOKIE_NAME);

    let pair = state
        .auth_service
        .authenticate(
            &req.public_key,
            &req.signature,
            &req.nonce,
            &req.iso_timestamp,
            carrier.as_deref(),
        )
        .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        carrier_cookie(
            REFRESH_COOKIE_NAME,
            &pair.refresh_token,
            state.refresh_token_ttl_days * 24 * 60 * 60,
            state.cookie_secure,
        )
        .map_err(|_| ApiError::Internal)?,
    );
    // The nonce carrier is spent; clear it
    response_headers.append(
        SET_COOKIE,
        carrier_cookie(NONCE_COOKIE_NAME, "", 0, state.cookie_secure)
            .map_err(|_| ApiError::Internal)?,
    );

    Ok((
        response_headers,
        Json(AccessTokenResponse {
            access_token: pair.access_token,
        }),
    ))
}

/// POST /auth/refresh - Rotate the refresh token and mint a new access token
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let presented = extract_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::CredentialInvalid("missing refresh token".to_string()))?;

    let pair = state.auth_service.refresh(&presented).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        carrier_cookie(
            REFRESH_COOKIE_NAME,
            &pair.refresh_token,
            state.refresh_token_ttl_days * 24 * 60 * 60,
            state.cookie_secure,
        )
        .map_err(|_| ApiError::Internal)?,
    );

    Ok((
        response_headers,
        Json(AccessTokenResponse {
            access_token: pair.access_token,
        }),
    ))
}

/// GET /auth/whoami - Resolve the bearer access token into profile fields
pub async fn whoami(
    State(state): State<AppState>,
    wallet: AuthenticatedWallet,
) -> ApiResult<Json<WhoAmIResponse>> {
    let record = state.auth_service.profile(&wallet.public_key).await?;

    Ok(Json(record.into()))
}

/// Build an http-only carrier cookie.
///
/// The login flow is cross-site (wallet frontends live on another origin),
/// so SameSite=None; that in turn requires Secure except in local HTTP dev.
fn carrier_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/auth; HttpOnly; SameSite=None; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull a named cookie value out of the request headers.
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_cookie_attributes() {
        let cookie = carrier_cookie("wg_nonce", "abc", 120, true).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("wg_nonce=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=120"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/auth"));
    }

    #[test]
    fn test_carrier_cookie_insecure_dev() {
        let cookie = carrier_cookie("wg_nonce", "abc", 120, false).unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; wg_nonce=carrier-value; wg_refresh=tok"),
        );

        assert_eq!(
            extract_cookie(&headers, "wg_nonce").as_deref(),
            Some("carrier-value")
        );
        assert_eq!(
            extract_cookie(&headers, "wg_refresh").as_deref(),
            Some("tok")
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_cookie_empty_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("wg_nonce="));
        assert_eq!(extract_cookie(&headers, "wg_nonce"), None);
    }
}
