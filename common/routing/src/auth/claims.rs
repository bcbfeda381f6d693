use std::fmt::{Debug, Formatter};

use chrono::{Duration, Utc};
use error_stack::{Report, ResultExt};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{roles::Roles, user::AuthedUser};

pub const DEFAULT_TOKEN_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Unknown roles are ignored, the user ends up with no roles.
    pub fn into_authed_user<R: Roles>(self) -> AuthedUser<R> {
        let roles = self.role.parse().unwrap_or_else(|_| {
            warn!("Unknown role: {}. Ignoring", self.role);
            R::none()
        });

        AuthedUser {
            id: self.id,
            email: self.email.into(),
            roles,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenErr {
    #[error("failed to sign token")]
    Sign,
    #[error("token is invalid or expired")]
    Invalid,
}

/// HMAC-SHA256 keys for issuing and verifying tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl Debug for JwtKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8], expiry_days: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            expiry: Duration::days(expiry_days),
        }
    }

    pub fn issue(&self, id: Uuid, email: &str, role: &str) -> Result<String, Report<TokenErr>> {
        let now = Utc::now();
        let claims = Claims {
            id,
            email: email.to_owned(),
            role: role.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .change_context(TokenErr::Sign)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Report<TokenErr>> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .change_context(TokenErr::Invalid)
    }
}
