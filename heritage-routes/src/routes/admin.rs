use axum::extract::State;
use axum::response::{IntoResponse, Response};
use garde::Validate;
use heritage_core::HeritageEngine;
use heritage_core::filter::{DEFAULT_USER_PAGE_SIZE, UserFilter, UserListCriteria};
use heritage_core::ids::UserId;
use heritage_core::list_criteria::ListFilter;
use heritage_core::model::stats::{ActivityTrends, DashboardStats, HeritageStats, UserStats};
use heritage_core::model::user::{AdminUserUpdate, Role, User};
use heritage_core::pagination::{PageMeta, Pagination};
use optional_field::{Field, serde_optional_fields};
use routing::patch_field_schema;
use routing::response::{ApiError, ApiResponse, EndpointError, FieldError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, OpenApi, ToSchema};

use super::extract::{ApiPath, ApiQuery, ValidJson, max_chars};
use super::heritages::{HeritageList, HeritageQuery};
use super::{Builder, DUPLICATE_USER, SortQuery, USER_NOT_FOUND};
use crate::error::AdminServiceError;
use crate::notifications::PushSender;
use crate::roles::HeritageRoles;
use crate::services::{AdminService, AdminUpdateOutcome};

const USERS_PATH: &str = "/admin/allUsers";
const USER_PATH: &str = "/admin/user/{id}";
const DELETE_USER_PATH: &str = "/admin/deleteUser/{id}";
const DASHBOARD_PATH: &str = "/admin/dashboard";
const HERITAGE_MANAGEMENT_PATH: &str = "/admin/heritageManagement";
const USER_STATS_PATH: &str = "/admin/userStats";
const HERITAGE_STATS_PATH: &str = "/admin/heritageStats";
const ACTIVITY_TRENDS_PATH: &str = "/admin/activityTrends";

pub const EMAIL_TAKEN: &str = "Email already exists";
const ROLE_ALL: &str = "all";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        get_user,
        update_user,
        delete_user,
        dashboard,
        heritage_management,
        user_stats,
        heritage_stats,
        activity_trends,
    ),
    components(schemas(
        UserList,
        AdminUpdateUserRequest,
        DashboardStats,
        UserStats,
        HeritageStats,
        ActivityTrends
    ))
)]
pub(super) struct AdminDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    let admin = || Access::Roles(HeritageRoles::ADMIN);

    builder
        .get(USERS_PATH, list_users::<T>, admin())
        .get(USER_PATH, get_user::<T>, admin())
        .put(USER_PATH, update_user::<T>, admin())
        .delete(DELETE_USER_PATH, delete_user::<T>, admin())
        .get(DASHBOARD_PATH, dashboard::<T>, admin())
        .get(HERITAGE_MANAGEMENT_PATH, heritage_management::<T>, admin())
        .get(USER_STATS_PATH, user_stats::<T>, admin())
        .get(HERITAGE_STATS_PATH, heritage_stats::<T>, admin())
        .get(ACTIVITY_TRENDS_PATH, activity_trends::<T>, admin())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
struct UserQuery {
    /// Case insensitive substring of first name, last name, username or email
    search: Option<String>,
    /// user, admin or all
    role: Option<String>,
    /// `true` for active users, anything else for deactivated ones
    is_active: Option<String>,
}

impl UserQuery {
    fn into_criteria(self, pagination: Pagination) -> Result<UserListCriteria, ApiError> {
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") | Some(ROLE_ALL) => None,
            Some(role) => Some(
                role.parse::<Role>()
                    .map(UserFilter::Role)
                    .map_err(|e| ApiError::bad_request(e.to_string()))?,
            ),
        };
        let active = self
            .is_active
            .filter(|a| !a.trim().is_empty())
            .map(|a| UserFilter::Active(a == "true"));

        Ok(UserFilter::criteria(pagination, DEFAULT_USER_PAGE_SIZE)
            .with_opt(self.search.and_then(UserFilter::search))
            .with_opt(role)
            .with_opt(active))
    }
}

#[derive(Debug, Serialize, ToSchema)]
struct UserList {
    users: Vec<User>,
    pagination: PageMeta,
}

/// Omitted fields keep their stored value. `phone` and `bio` can be cleared with an explicit null.
#[serde_optional_fields]
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    #[garde(length(chars, min = 2, max = 50))]
    pub first_name: Option<String>,
    #[garde(length(chars, min = 2, max = 50))]
    pub last_name: Option<String>,
    #[garde(length(chars, min = 3, max = 30))]
    pub username: Option<String>,
    #[garde(email)]
    pub email: Option<String>,
    #[garde(skip)]
    pub role: Option<Role>,
    #[garde(skip)]
    pub is_active: Option<bool>,
    #[garde(skip)]
    #[schema(schema_with = patch_field_schema)]
    pub phone: Field<String>,
    #[garde(skip)]
    #[schema(schema_with = patch_field_schema)]
    pub bio: Field<String>,
}

impl AdminUpdateUserRequest {
    fn field_errors(&self) -> Vec<FieldError> {
        let present = |field: &Field<String>| match field {
            Field::Present(Some(value)) => Some(value.clone()),
            _ => None,
        };

        [
            present(&self.phone).and_then(|p| max_chars("phone", &p, 20)),
            present(&self.bio).and_then(|b| max_chars("bio", &b, 500)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[utoipa::path(
    get,
    path = USERS_PATH,
    tag = "admin",
    params(Pagination, UserQuery, SortQuery),
    responses(
        (status = OK, description = "One page of users", body = UserList),
        (status = BAD_REQUEST, description = "Unknown role"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service, sort), err(Debug))]
async fn list_users<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(query): ApiQuery<UserQuery>,
    ApiQuery(sort): ApiQuery<SortQuery>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let criteria = match query.into_criteria(pagination) {
        Ok(criteria) => criteria,
        Err(e) => return Ok(e.into_response()),
    };

    let listing = service.users(criteria, sort.parse()).await?;
    Ok(ApiResponse::ok(UserList {
        users: listing.items,
        pagination: listing.pagination,
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = USER_PATH,
    tag = "admin",
    params(("id" = UserId, Path, description = "The user to fetch")),
    responses(
        (status = OK, description = "The user", body = User),
        (status = NOT_FOUND, description = "No user with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug))]
async fn get_user<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    Ok(match service.user(id).await? {
        Some(user) => ApiResponse::ok(user).into_response(),
        None => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    put,
    path = USER_PATH,
    tag = "admin",
    params(("id" = UserId, Path, description = "The user to update")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = OK, description = "The updated user", body = User),
        (status = BAD_REQUEST, description = "Validation failed or the email or username is taken"),
        (status = NOT_FOUND, description = "No user with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug))]
async fn update_user<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
    ApiPath(id): ApiPath<UserId>,
    ValidJson(request): ValidJson<AdminUpdateUserRequest>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let errors = request.field_errors();
    if !errors.is_empty() {
        return Ok(ApiError::validation(errors).into_response());
    }

    let update = AdminUserUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        username: request.username,
        email: request.email,
        role: request.role,
        is_active: request.is_active,
        phone: request.phone,
        bio: request.bio,
    };

    Ok(match service.update_user(id, update).await? {
        AdminUpdateOutcome::Updated(user) => {
            ApiResponse::ok_with_message("User updated successfully", user).into_response()
        }
        AdminUpdateOutcome::UserNotFound => ApiError::not_found(USER_NOT_FOUND).into_response(),
        AdminUpdateOutcome::EmailTaken => ApiError::bad_request(EMAIL_TAKEN).into_response(),
        AdminUpdateOutcome::Duplicate => ApiError::bad_request(DUPLICATE_USER).into_response(),
    })
}

/// Deactivates the account. The user can no longer sign in.
#[utoipa::path(
    delete,
    path = DELETE_USER_PATH,
    tag = "admin",
    params(("id" = UserId, Path, description = "The user to deactivate")),
    responses(
        (status = OK, description = "The user was deactivated"),
        (status = NOT_FOUND, description = "No user with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug))]
async fn delete_user<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    Ok(if service.deactivate_user(id).await? {
        ApiResponse::done("User deleted successfully").into_response()
    } else {
        ApiError::not_found(USER_NOT_FOUND).into_response()
    })
}

#[utoipa::path(
    get,
    path = DASHBOARD_PATH,
    tag = "admin",
    responses((status = OK, description = "Totals and distributions for the admin dashboard", body = DashboardStats)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn dashboard<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let stats = service.dashboard().await?;
    Ok(ApiResponse::ok(stats).into_response())
}

/// Active heritages for the management table. Searches name, description and location only.
#[utoipa::path(
    get,
    path = HERITAGE_MANAGEMENT_PATH,
    tag = "admin",
    params(Pagination, HeritageQuery),
    responses(
        (status = OK, description = "One page of heritages", body = HeritageList),
        (status = BAD_REQUEST, description = "Malformed query"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service, query), err(Debug))]
async fn heritage_management<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(query): ApiQuery<HeritageQuery>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let (criteria, sort) = match query.parts(pagination, true) {
        Ok(parts) => parts,
        Err(e) => return Ok(e.into_response()),
    };

    let listing = service.heritage_management(criteria, sort).await?;
    Ok(ApiResponse::ok(HeritageList {
        heritages: listing.items,
        pagination: listing.pagination,
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = USER_STATS_PATH,
    tag = "admin",
    responses((status = OK, description = "User counts and registrations", body = UserStats)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn user_stats<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let stats = service.user_stats().await?;
    Ok(ApiResponse::ok(stats).into_response())
}

#[utoipa::path(
    get,
    path = HERITAGE_STATS_PATH,
    tag = "admin",
    responses((status = OK, description = "Heritage counts, most saved and most recent", body = HeritageStats)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn heritage_stats<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let stats = service.heritage_stats().await?;
    Ok(ApiResponse::ok(stats).into_response())
}

#[utoipa::path(
    get,
    path = ACTIVITY_TRENDS_PATH,
    tag = "admin",
    responses((status = OK, description = "Daily activity over the last 30 days", body = ActivityTrends)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn activity_trends<T: HeritageEngine>(
    State(service): State<AdminService<T>>,
) -> Result<Response, EndpointError<AdminServiceError>> {
    let trends = service.activity_trends().await?;
    Ok(ApiResponse::ok(trends).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_all_and_blank_filters_are_ignored() {
        let criteria = UserQuery {
            search: Some("  ".into()),
            role: Some("all".into()),
            is_active: Some("".into()),
        }
        .into_criteria(Pagination::default())
        .unwrap();

        assert!(criteria.filters().is_empty());
    }

    #[test]
    fn is_active_is_true_only_for_true() {
        let criteria = UserQuery {
            is_active: Some("false".into()),
            role: Some("admin".into()),
            ..UserQuery::default()
        }
        .into_criteria(Pagination::default())
        .unwrap();

        assert_eq!(
            &[UserFilter::Role(Role::Admin), UserFilter::Active(false)],
            criteria.filters()
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let query = UserQuery {
            role: Some("root".into()),
            ..UserQuery::default()
        };

        assert!(query.into_criteria(Pagination::default()).is_err());
    }
}
