use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::roles::Roles;
use crate::auth::token::{AuthStatus, INVALID_TOKEN, MISSING_TOKEN};
use crate::response::ApiError;

#[derive(Debug, Clone)]
pub struct AuthedUser<R> {
    pub id: Uuid,
    pub email: Arc<str>,
    pub roles: R,
}

impl<R> AuthedUser<R>
where
    R: Roles,
{
    pub fn has_roles(&self, role: R) -> bool {
        self.roles.contains(role)
    }
}

impl<S, R> FromRequestParts<S> for AuthedUser<R>
where
    S: Send + Sync,
    R: Roles,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthStatus<R>>() {
            Some(AuthStatus::Authed(user)) => Ok(user.clone()),
            Some(AuthStatus::Invalid) => Err(ApiError::unauthorized(INVALID_TOKEN)),
            _ => Err(ApiError::unauthorized(MISSING_TOKEN)),
        }
    }
}

/// `Option<AuthedUser<R>>` on public routes that behave differently for signed in users.
impl<S, R> OptionalFromRequestParts<S> for AuthedUser<R>
where
    S: Send + Sync,
    R: Roles,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(match parts.extensions.get::<AuthStatus<R>>() {
            Some(AuthStatus::Authed(user)) => Some(user.clone()),
            _ => None,
        })
    }
}
