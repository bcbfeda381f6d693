use std::sync::Arc;

use error_stack::{Report, ResultExt};
use heritage_core::HeritageEngine;
use heritage_core::ids::UserId;
use heritage_core::model::user::{NewUser, ProfileUpdate, Role, User};
use heritage_core::repository::UserRepository;
use heritage_core::result::UserRepoError;
use routing::JwtKeys;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::error::AuthServiceError;
use crate::uploads::{StoredFile, UploadStore};
use crate::{OptServiceResult, ServiceResult, metrics, password};

/// A signed in user and the token that authenticates them.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Duplicate,
    Registered(Session),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    /// Unknown email or wrong password, indistinguishable to the caller.
    InvalidCredentials,
    Deactivated,
    LoggedIn(Session),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePasswordOutcome {
    UserNotFound,
    IncorrectPassword,
    Changed,
}

#[derive(Clone)]
pub struct AuthService<T> {
    engine: T,
    keys: Arc<JwtKeys>,
    uploads: UploadStore,
}

impl<T> AuthService<T>
where
    T: HeritageEngine,
{
    pub fn new(engine: T, keys: Arc<JwtKeys>, uploads: UploadStore) -> Self {
        Self {
            engine,
            keys,
            uploads,
        }
    }

    fn session(&self, user: User, context: AuthServiceError) -> ServiceResult<Session, AuthServiceError> {
        let token = self
            .keys
            .issue(user.id.0, &user.email, user.role.as_str())
            .change_context(context)?;
        Ok(Session { user, token })
    }

    #[instrument(skip_all, name = "service#register")]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> ServiceResult<RegisterOutcome, AuthServiceError> {
        let users = self.engine.users();

        let taken = users
            .exists_with_email_or_username(
                registration.email.clone(),
                registration.username.clone(),
            )
            .await
            .change_context(AuthServiceError::Register)?;
        if taken {
            return Ok(RegisterOutcome::Duplicate);
        }

        let password_hash = password::hash(registration.password)
            .await
            .change_context(AuthServiceError::Register)?;

        let created = users
            .create(NewUser {
                first_name: registration.first_name,
                last_name: registration.last_name,
                username: registration.username,
                email: registration.email,
                password_hash,
                phone: registration.phone,
                role: Role::User,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(e) if is_duplicate(&e) => {
                debug!("lost registration race on unique constraint");
                return Ok(RegisterOutcome::Duplicate);
            }
            Err(e) => return Err(e.change_context(AuthServiceError::Register)),
        };

        metrics::increment_users_registered();
        self.session(user, AuthServiceError::Register)
            .map(RegisterOutcome::Registered)
    }

    #[instrument(skip_all, name = "service#login")]
    pub async fn login(
        &self,
        email: String,
        password: String,
    ) -> ServiceResult<LoginOutcome, AuthServiceError> {
        let users = self.engine.users();

        let Some(credentials) = users
            .find_credentials_by_email(email)
            .await
            .change_context(AuthServiceError::Login)?
        else {
            metrics::increment_failed_logins();
            return Ok(LoginOutcome::InvalidCredentials);
        };

        if !credentials.user.is_active {
            metrics::increment_failed_logins();
            return Ok(LoginOutcome::Deactivated);
        }

        let matches = password::verify(password, credentials.password_hash)
            .await
            .change_context(AuthServiceError::Login)?;
        if !matches {
            metrics::increment_failed_logins();
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let Some(user) = users
            .record_login(credentials.user.id)
            .await
            .change_context(AuthServiceError::Login)?
        else {
            return Ok(LoginOutcome::InvalidCredentials);
        };

        metrics::increment_logins();
        self.session(user, AuthServiceError::Login)
            .map(LoginOutcome::LoggedIn)
    }

    #[instrument(skip_all, name = "service#profile")]
    pub async fn profile(&self, id: UserId) -> OptServiceResult<User, AuthServiceError> {
        self.engine
            .users()
            .find(id)
            .await
            .change_context(AuthServiceError::Profile)
    }

    #[instrument(skip_all, name = "service#update_profile")]
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> OptServiceResult<User, AuthServiceError> {
        self.engine
            .users()
            .update_profile(id, update)
            .await
            .change_context(AuthServiceError::UpdateProfile)
    }

    /// The stored file is removed again when the user is gone or the update fails.
    #[instrument(skip_all, name = "service#set_profile_image")]
    pub async fn set_profile_image(
        &self,
        id: UserId,
        image: StoredFile,
    ) -> OptServiceResult<User, AuthServiceError> {
        let updated = self
            .engine
            .users()
            .set_profile_image(id, image.public_path())
            .await
            .change_context(AuthServiceError::ProfileImage);

        if !matches!(updated, Ok(Some(_))) {
            self.uploads.discard(std::slice::from_ref(&image)).await;
        }
        updated
    }

    #[instrument(skip_all, name = "service#change_password")]
    pub async fn change_password(
        &self,
        id: UserId,
        current: String,
        new: String,
    ) -> ServiceResult<ChangePasswordOutcome, AuthServiceError> {
        let users = self.engine.users();

        let Some(credentials) = users
            .find_credentials(id)
            .await
            .change_context(AuthServiceError::ChangePassword)?
        else {
            return Ok(ChangePasswordOutcome::UserNotFound);
        };

        let matches = password::verify(current, credentials.password_hash)
            .await
            .change_context(AuthServiceError::ChangePassword)?;
        if !matches {
            return Ok(ChangePasswordOutcome::IncorrectPassword);
        }

        let password_hash = password::hash(new)
            .await
            .change_context(AuthServiceError::ChangePassword)?;

        let changed = users
            .set_password(id, password_hash)
            .await
            .change_context(AuthServiceError::ChangePassword)?;

        Ok(if changed {
            ChangePasswordOutcome::Changed
        } else {
            ChangePasswordOutcome::UserNotFound
        })
    }
}

pub(crate) fn is_duplicate(report: &Report<UserRepoError>) -> bool {
    matches!(report.current_context(), UserRepoError::Duplicate)
}
