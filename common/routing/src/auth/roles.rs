use std::{fmt::Display, str::FromStr};

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::token::{AuthStatus, INVALID_TOKEN, MISSING_TOKEN};
use crate::response::ApiError;

pub trait Roles: FromStr + Display + Clone + Send + Sync + 'static {
    fn none() -> Self;
    fn is_none(&self) -> bool;
    fn contains(&self, other: Self) -> bool;
    fn add(&mut self, other: Self);
}

/// Guards a route behind `required_roles`. Expects [`validate_token`](crate::validate_token)
/// to have run.
pub async fn require_roles<R: Roles>(
    State(required_roles): State<R>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match req.extensions().get::<AuthStatus<R>>() {
        Some(AuthStatus::Authed(user)) => user,
        Some(AuthStatus::Invalid) => return Err(ApiError::unauthorized(INVALID_TOKEN)),
        _ => return Err(ApiError::unauthorized(MISSING_TOKEN)),
    };

    debug!("required roles: {required_roles}");
    if required_roles.is_none() || user.has_roles(required_roles.clone()) {
        Ok(next.run(req).await)
    } else {
        warn!("User {} does not have the authority! (🧙‍♂️🚫➡️)", user.id);
        Err(ApiError::forbidden(format!(
            "Access denied: {required_roles} role required"
        )))
    }
}
