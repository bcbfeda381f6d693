use utoipa::{
    PartialSchema,
    openapi::{RefOr, Schema},
};

mod auth;
mod metrics;
pub mod response;
pub mod router;

pub use auth::{
    claims::{Claims, DEFAULT_TOKEN_EXPIRY_DAYS, JwtKeys, TokenErr},
    roles::{Roles, require_roles},
    token::{AuthState, AuthStatus, INVALID_TOKEN, MISSING_TOKEN, require_auth, validate_token},
    user::AuthedUser,
};
pub use metrics::{MetricsSetupErr, setup_recorder};

/// Schema for fields that distinguish between "absent" and "explicitly null".
pub fn patch_field_schema() -> impl Into<RefOr<Schema>> {
    <Option<String> as PartialSchema>::schema()
}
