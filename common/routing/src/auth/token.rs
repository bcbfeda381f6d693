use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::auth::{claims::JwtKeys, roles::Roles, user::AuthedUser};
use crate::response::ApiError;

pub const MISSING_TOKEN: &str = "Authorization token missing";
pub const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<JwtKeys>,
}

impl AuthState {
    pub fn new(keys: JwtKeys) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }
}

/// What [`validate_token`] found on the request. Always present in the request extensions
/// of routes built by the router builder.
#[derive(Debug, Clone)]
pub enum AuthStatus<R> {
    Missing,
    Invalid,
    Authed(AuthedUser<R>),
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Records the outcome of token validation and lets every request through. Routes that need
/// a user are guarded by [`require_auth`] or [`require_roles`](crate::require_roles).
#[instrument(skip_all)]
pub async fn validate_token<R: Roles>(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let status = match bearer_token(request.headers()) {
        None => AuthStatus::Missing,
        Some(token) => match state.keys.verify(token) {
            Ok(claims) => {
                let user = claims.into_authed_user::<R>();
                debug!("Token validated for user '{}' with roles {}", user.id, user.roles);
                AuthStatus::Authed(user)
            }
            Err(e) => {
                debug!("Token validation error: {e:?}");
                AuthStatus::Invalid
            }
        },
    };

    request.extensions_mut().insert(status);
    next.run(request).await
}

pub async fn require_auth<R: Roles>(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<AuthStatus<R>>() {
        Some(AuthStatus::Authed(_)) => {}
        Some(AuthStatus::Invalid) => return Err(ApiError::unauthorized(INVALID_TOKEN)),
        _ => return Err(ApiError::unauthorized(MISSING_TOKEN)),
    }

    Ok(next.run(req).await)
}
