use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::AppError;
use crate::models::credential::Credential;

/// Optional header carrying an already-resolved account id.
pub const ACCOUNT_ID_HEADER: &str = "x-threads-user-id";

/// Pull the bearer credential out of the request headers.
pub fn credential_from_headers(headers: &HeaderMap) -> Result<Credential, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::MissingCredential)?;

    let (scheme, token) = auth.split_once(' ').ok_or(AppError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::MissingCredential);
    }

    let account_id = headers
        .get(ACCOUNT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Credential::new(token)
        .map(|c| c.with_account_id(account_id))
        .ok_or(AppError::MissingCredential)
}

#[async_trait]
impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credential = credential_from_headers(&parts.headers);
        if credential.is_err() {
            tracing::warn!(path = %parts.uri.path(), "request without bearer credential");
        }
        credential
    }
}
