use axum::extract::State;
use axum::response::{IntoResponse, Response};
use heritage_core::HeritageEngine;
use heritage_core::model::saved::SavedHeritageCard;
use heritage_core::model::stats::UserStatistics;
use routing::response::{ApiError, ApiResponse, EndpointError};
use routing::router::Access;
use serde::Deserialize;
use serde_with::{NoneAsEmptyString, serde_as};
use tracing::instrument;
use utoipa::{IntoParams, OpenApi};

use super::extract::ApiQuery;
use super::{Builder, CurrentUser, USER_NOT_FOUND};
use crate::error::UserServiceError;
use crate::notifications::PushSender;
use crate::services::UserService;

const PROFILE_PATH: &str = "/user/profile";
const SAVED_PATH: &str = "/user/savedHeritages";
const SAVED_SUMMARY_PATH: &str = "/user/savedHeritages/summary";
const STATISTICS_PATH: &str = "/user/statistics";

#[derive(OpenApi)]
#[openapi(
    paths(profile, saved_heritages, saved_summary, statistics),
    components(schemas(SavedHeritageCard, UserStatistics))
)]
pub(super) struct UserDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .get(PROFILE_PATH, profile::<T>, Access::Authenticated)
        .get(SAVED_PATH, saved_heritages::<T>, Access::Authenticated)
        .get(SAVED_SUMMARY_PATH, saved_summary::<T>, Access::Authenticated)
        .get(STATISTICS_PATH, statistics::<T>, Access::Authenticated)
}

#[serde_as]
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct LimitQuery {
    /// Every saved heritage when omitted
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(value_type = Option<u64>)]
    limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = PROFILE_PATH,
    tag = "user",
    responses(
        (status = OK, description = "The signed in user", body = heritage_core::model::user::User),
        (status = NOT_FOUND, description = "The user no longer exists"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn profile<T: HeritageEngine>(
    State(service): State<UserService<T>>,
    user: CurrentUser,
) -> Result<Response, EndpointError<UserServiceError>> {
    Ok(match service.profile(user.id.into()).await? {
        Some(user) => ApiResponse::ok(user).into_response(),
        None => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}

/// Saved heritages as cards, most recently saved first.
#[utoipa::path(
    get,
    path = SAVED_PATH,
    tag = "user",
    params(LimitQuery),
    responses((status = OK, description = "Saved heritage cards", body = Vec<SavedHeritageCard>)),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn saved_heritages<T: HeritageEngine>(
    State(service): State<UserService<T>>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Response, EndpointError<UserServiceError>> {
    let cards = service.saved(user.id.into(), query.limit).await?;
    Ok(ApiResponse::ok(cards).into_response())
}

/// The 3 most recently saved heritages, without descriptions.
#[utoipa::path(
    get,
    path = SAVED_SUMMARY_PATH,
    tag = "user",
    responses((status = OK, description = "Saved heritage cards", body = Vec<SavedHeritageCard>)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn saved_summary<T: HeritageEngine>(
    State(service): State<UserService<T>>,
    user: CurrentUser,
) -> Result<Response, EndpointError<UserServiceError>> {
    let cards = service.saved_summary(user.id.into()).await?;
    Ok(ApiResponse::ok(cards).into_response())
}

#[utoipa::path(
    get,
    path = STATISTICS_PATH,
    tag = "user",
    responses((status = OK, description = "Saved count, total heritages and the most saved sites", body = UserStatistics)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn statistics<T: HeritageEngine>(
    State(service): State<UserService<T>>,
    user: CurrentUser,
) -> Result<Response, EndpointError<UserServiceError>> {
    let statistics = service.statistics(user.id.into()).await?;
    Ok(ApiResponse::ok(statistics).into_response())
}
