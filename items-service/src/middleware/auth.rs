use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::services::{IdentityClaims, TokenError};
use crate::supabase::AccessToken;
use crate::AppState;

/// Verified caller, attached to the request by [`auth_middleware`].
///
/// Carries the access token as well so downstream data calls can run under
/// the caller's row-level security.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub claims: IdentityClaims,
    pub access_token: AccessToken,
}

impl RequestIdentity {
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }
}

/// Middleware to require a valid bearer token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw = authorization_value(req.headers());

    let claims = raw
        .clone()
        .and_then(|raw| state.verifier.verify_header(raw))
        .map_err(|e| {
            tracing::debug!(
                reason = %e,
                malformed = e.is_malformed(),
                path = %req.uri().path(),
                "Rejected request credential"
            );
            AppError::Unauthorized(anyhow::Error::new(e))
        })?;

    // verify_header only succeeds for a well-formed "Bearer <token>" value
    let access_token = AccessToken::new(
        raw.ok()
            .flatten()
            .and_then(|v| v.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default(),
    );

    tracing::Span::current().record("user_id", claims.sub.as_str());

    req.extensions_mut().insert(RequestIdentity {
        claims,
        access_token,
    });

    Ok(next.run(req).await)
}

/// Raw `Authorization` value. A header that is present but not visible
/// ASCII is malformed, not missing.
pub(crate) fn authorization_value(headers: &HeaderMap) -> Result<Option<&str>, TokenError> {
    headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| TokenError::MalformedHeader))
        .transpose()
}

/// Extractor handing the verified identity to handlers
pub struct AuthUser(pub RequestIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<RequestIdentity>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Request identity missing from request extensions"
            ))
        })?;

        Ok(AuthUser(identity.clone()))
    }
}
