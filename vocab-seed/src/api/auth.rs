//! Bearer-token extractor for trigger endpoints
//!
//! Handlers that take [`Authorized`] reject requests whose
//! `Authorization: Bearer <secret>` does not match the configured secret.
//! With no secret configured every request passes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use vocab_common::auth::{authorize, AuthError};

use crate::{error::ApiError, AppState};

/// Proof that the request carried the trigger secret
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
            None => None,
        };

        if let Err(e) = authorize(header, state.trigger_secret.as_deref()) {
            tracing::warn!(
                path = %parts.uri.path(),
                reason = %e,
                "Rejected unauthorized trigger request"
            );
            return Err(e.into());
        }

        Ok(Authorized)
    }
}
