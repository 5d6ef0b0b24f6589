//! Bearer-token authorization
//!
//! Extractor for protected routes: validates the `Authorization: Bearer`
//! access token and yields the subject identity. The check is stateless
//! (signature + expiry under the subject's derived secret); handlers that
//! need profile fields do their own store lookup afterwards.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::ApiError;
use crate::state::SharedAuthService;

/// Authenticated wallet identity extracted from an access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedWallet {
    pub public_key: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedWallet
where
    SharedAuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::CredentialInvalid(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = SharedAuthService::from_ref(state);
        let public_key = auth_service.resolve_access_token(bearer.token())?;

        Ok(AuthenticatedWallet { public_key })
    }
}
