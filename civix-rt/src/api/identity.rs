//! Acting-identity middleware
//!
//! Authentication happens upstream. Requests to protected routes carry the
//! issued credential in `x-auth-token` (or `Authorization: Bearer`), and the
//! configured [`IdentityResolver`] maps it to a [`UserId`] that handlers read
//! from the request extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::models::UserId;
use crate::AppState;

/// Header carrying the caller credential
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Maps a caller credential to a stable owner identity
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Option<UserId>;
}

/// Resolver for credentials that are the identity UUID itself
///
/// Any caller that can reach the listener can claim any identity, so this is
/// only sound behind an upstream proxy that authenticates and sets the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenResolver;

impl UuidTokenResolver {
    /// Logged at startup whenever this resolver is installed
    pub const TRUST_NOTICE: &'static str = "Caller identities are taken verbatim from the \
        x-auth-token header; run civix-rt only behind an upstream trusted proxy that \
        authenticates users and sets that header";
}

impl IdentityResolver for UuidTokenResolver {
    fn resolve(&self, credential: &str) -> Option<UserId> {
        credential.parse().ok()
    }
}

/// Identity of the caller, inserted by [`identity_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingIdentity(pub UserId);

/// Reject requests without a resolvable credential
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = credential_from(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;

    let user = state.identity.resolve(credential).ok_or_else(|| {
        debug!("Credential did not resolve to an identity");
        ApiError::Unauthorized("Token is not valid".to_string())
    })?;

    request.extensions_mut().insert(ActingIdentity(user));
    Ok(next.run(request).await)
}

fn credential_from(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if token.is_some() {
        return token;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
