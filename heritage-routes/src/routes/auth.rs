use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use garde::Validate;
use heritage_core::HeritageEngine;
use heritage_core::model::user::{ProfileUpdate, User};
use optional_field::{Field, serde_optional_fields};
use routing::patch_field_schema;
use routing::response::{ApiError, ApiResponse, EndpointError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{OpenApi, ToSchema};

use super::extract::{ValidJson, max_chars};
use super::{Builder, CurrentUser, USER_NOT_FOUND};
use crate::error::AuthServiceError;
use crate::notifications::PushSender;
use crate::services::{
    AuthService, ChangePasswordOutcome, LoginOutcome, RegisterOutcome, Registration, Session,
};
use crate::uploads::{FormError, UploadStore};

const REGISTER_PATH: &str = "/auth/register";
const LOGIN_PATH: &str = "/auth/login";
const PROFILE_PATH: &str = "/auth/profile";
const PROFILE_IMAGE_PATH: &str = "/auth/profile/image";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";

pub const DUPLICATE_USER: &str = "User with this email or username already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_DEACTIVATED: &str = "Account is deactivated";
pub const INCORRECT_PASSWORD: &str = "Current password is incorrect";
const NO_IMAGE: &str = "No image file provided";
const PROFILE_IMAGE_FIELD: &str = "profileImage";

#[derive(OpenApi)]
#[openapi(
    paths(register, login, profile, update_profile, upload_profile_image, change_password),
    components(schemas(RegisterRequest, LoginRequest, UpdateProfileRequest, ChangePasswordRequest, Session, UserEnvelope))
)]
pub(super) struct AuthDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .post(REGISTER_PATH, register::<T>, Access::Public)
        .post(LOGIN_PATH, login::<T>, Access::Public)
        .get(PROFILE_PATH, profile::<T>, Access::Authenticated)
        .put(PROFILE_PATH, update_profile::<T>, Access::Authenticated)
        .post(PROFILE_IMAGE_PATH, upload_profile_image::<T>, Access::Authenticated)
        .put(CHANGE_PASSWORD_PATH, change_password::<T>, Access::Authenticated)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[garde(length(chars, min = 2, max = 50))]
    pub first_name: String,
    #[garde(length(chars, min = 2, max = 50))]
    pub last_name: String,
    #[garde(length(chars, min = 3, max = 30))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(chars, min = 6, max = 100))]
    pub password: String,
    #[garde(length(chars, max = 20))]
    pub phone: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Omitted fields keep their stored value. `bio` can be cleared with an explicit null.
#[serde_optional_fields]
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[garde(length(chars, min = 2, max = 50))]
    pub first_name: Option<String>,
    #[garde(length(chars, min = 2, max = 50))]
    pub last_name: Option<String>,
    #[garde(length(chars, max = 20))]
    pub phone: Option<String>,
    #[garde(skip)]
    #[schema(schema_with = patch_field_schema)]
    pub bio: Field<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[garde(length(min = 1))]
    pub current_password: String,
    #[garde(length(chars, min = 6, max = 100))]
    pub new_password: String,
}

impl std::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChangePasswordRequest")
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserEnvelope {
    pub user: User,
}

/// Create an account with the `user` role and sign it in.
#[utoipa::path(
    post,
    path = REGISTER_PATH,
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = CREATED, description = "The account was created", body = Session),
        (status = BAD_REQUEST, description = "Validation failed or the email or username is taken"),
    )
)]
#[instrument(skip_all, err(Debug), fields(req.username = request.username))]
async fn register<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<Response, EndpointError<AuthServiceError>> {
    let outcome = service
        .register(Registration {
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            email: request.email,
            password: request.password,
            phone: request.phone,
        })
        .await?;

    Ok(match outcome {
        RegisterOutcome::Registered(session) => {
            ApiResponse::created("User registered successfully", session).into_response()
        }
        RegisterOutcome::Duplicate => ApiError::bad_request(DUPLICATE_USER).into_response(),
    })
}

#[utoipa::path(
    post,
    path = LOGIN_PATH,
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = OK, description = "Signed in, `lastLogin` is updated", body = Session),
        (status = UNAUTHORIZED, description = "Wrong credentials or a deactivated account"),
    )
)]
#[instrument(skip_all, err(Debug), fields(req.email = request.email))]
async fn login<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Response, EndpointError<AuthServiceError>> {
    let outcome = service.login(request.email, request.password).await?;

    Ok(match outcome {
        LoginOutcome::LoggedIn(session) => {
            ApiResponse::ok_with_message("Login successful", session).into_response()
        }
        LoginOutcome::InvalidCredentials => {
            ApiError::unauthorized(INVALID_CREDENTIALS).into_response()
        }
        LoginOutcome::Deactivated => ApiError::unauthorized(ACCOUNT_DEACTIVATED).into_response(),
    })
}

#[utoipa::path(
    get,
    path = PROFILE_PATH,
    tag = "auth",
    responses(
        (status = OK, description = "The signed in user", body = UserEnvelope),
        (status = NOT_FOUND, description = "The user no longer exists"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn profile<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    user: CurrentUser,
) -> Result<Response, EndpointError<AuthServiceError>> {
    Ok(match service.profile(user.id.into()).await? {
        Some(user) => ApiResponse::ok(UserEnvelope { user }).into_response(),
        None => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    put,
    path = PROFILE_PATH,
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = OK, description = "The updated user", body = User),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = NOT_FOUND, description = "The user no longer exists"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn update_profile<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    user: CurrentUser,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> Result<Response, EndpointError<AuthServiceError>> {
    if let Field::Present(Some(bio)) = &request.bio {
        if let Some(error) = max_chars("bio", bio, 500) {
            return Ok(ApiError::validation(vec![error]).into_response());
        }
    }

    let update = ProfileUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        bio: request.bio,
    };

    Ok(match service.update_profile(user.id.into(), update).await? {
        Some(user) => ApiResponse::ok_with_message("Profile updated successfully", user).into_response(),
        None => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}

/// Replace the profile image. Multipart field `profileImage`, one jpeg, png, gif or webp of at
/// most 5MB.
#[utoipa::path(
    post,
    path = PROFILE_IMAGE_PATH,
    tag = "auth",
    request_body(content_type = "multipart/form-data", description = "field `profileImage`"),
    responses(
        (status = OK, description = "The updated user", body = User),
        (status = BAD_REQUEST, description = "No image, not an image or too large"),
        (status = NOT_FOUND, description = "The user no longer exists"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn upload_profile_image<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    State(uploads): State<UploadStore>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, EndpointError<AuthServiceError>> {
    let form = match uploads.read_form(multipart, PROFILE_IMAGE_FIELD, 1).await {
        Ok(form) => form,
        Err(FormError::Rejected(message)) => {
            return Ok(ApiError::bad_request(message).into_response());
        }
        Err(FormError::Storage(e)) => return Err(e.change_context(AuthServiceError::ProfileImage).into()),
    };

    let Some(image) = form.files.into_iter().next() else {
        return Ok(ApiError::bad_request(NO_IMAGE).into_response());
    };

    Ok(match service.set_profile_image(user.id.into(), image).await? {
        Some(user) => {
            ApiResponse::ok_with_message("Profile image updated successfully", user).into_response()
        }
        None => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    put,
    path = CHANGE_PASSWORD_PATH,
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = OK, description = "The password was changed"),
        (status = BAD_REQUEST, description = "Validation failed or the current password is wrong"),
        (status = NOT_FOUND, description = "The user no longer exists"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn change_password<T: HeritageEngine>(
    State(service): State<AuthService<T>>,
    user: CurrentUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> Result<Response, EndpointError<AuthServiceError>> {
    let outcome = service
        .change_password(user.id.into(), request.current_password, request.new_password)
        .await?;

    Ok(match outcome {
        ChangePasswordOutcome::Changed => {
            ApiResponse::done("Password changed successfully").into_response()
        }
        ChangePasswordOutcome::IncorrectPassword => {
            ApiError::bad_request(INCORRECT_PASSWORD).into_response()
        }
        ChangePasswordOutcome::UserNotFound => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}
