use axum::extract::State;
use axum::response::{IntoResponse, Response};
use garde::Validate;
use heritage_core::HeritageEngine;
use heritage_core::ids::{HeritageId, ReviewId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::review::{NewReview, Rating, Review, ReviewStats, ReviewUpdate};
use heritage_core::pagination::{PageMeta, Pagination};
use routing::response::{ApiError, ApiResponse, EndpointError, FieldError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{OpenApi, ToSchema};

use super::extract::{ApiPath, ApiQuery, ValidJson};
use super::{Builder, CurrentUser, HERITAGE_NOT_FOUND, SortQuery};
use crate::error::ReviewServiceError;
use crate::notifications::PushSender;
use crate::services::{CreateReviewOutcome, DEFAULT_REVIEW_PAGE_SIZE, Found, ReviewService};

const REVIEWS_PATH: &str = "/reviews/heritage/{heritage_id}/reviews";
const STATS_PATH: &str = "/reviews/heritage/{heritage_id}/reviews/stats";
const MY_REVIEW_PATH: &str = "/reviews/heritage/{heritage_id}/reviews/my";
const REVIEW_PATH: &str = "/reviews/reviews/{review_id}";

pub const ALREADY_REVIEWED: &str = "You have already reviewed this heritage site";
pub const REVIEW_NOT_EDITABLE: &str = "Review not found or you are not authorized to edit it";
pub const REVIEW_NOT_DELETABLE: &str = "Review not found or you are not authorized to delete it";

#[derive(OpenApi)]
#[openapi(
    paths(list_reviews, review_stats, my_review, create_review, update_review, delete_review),
    components(schemas(ReviewRequest, ReviewUpdateRequest, ReviewList, Review, ReviewStats))
)]
pub(super) struct ReviewDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .get(REVIEWS_PATH, list_reviews::<T>, Access::Public)
        .get(STATS_PATH, review_stats::<T>, Access::Public)
        .get(MY_REVIEW_PATH, my_review::<T>, Access::Authenticated)
        .post(REVIEWS_PATH, create_review::<T>, Access::Authenticated)
        .put(REVIEW_PATH, update_review::<T>, Access::Authenticated)
        .delete(REVIEW_PATH, delete_review::<T>, Access::Authenticated)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    #[garde(range(min = 1, max = 5))]
    pub rating: i64,
    #[garde(length(chars, min = 5, max = 100))]
    pub title: String,
    #[garde(length(chars, min = 10, max = 1000))]
    pub comment: String,
}

/// Omitted fields keep their stored value.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewUpdateRequest {
    #[garde(range(min = 1, max = 5))]
    pub rating: Option<i64>,
    #[garde(length(chars, min = 5, max = 100))]
    pub title: Option<String>,
    #[garde(length(chars, min = 10, max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ReviewList {
    reviews: Vec<Review>,
    average_rating: f64,
    total_reviews: u64,
    pagination: PageMeta,
}

fn rating(value: i64) -> Result<Rating, Response> {
    Rating::new(value).map_err(|e| {
        ApiError::validation(vec![FieldError {
            field: "rating".to_owned(),
            message: e.to_string(),
        }])
        .into_response()
    })
}

/// Active reviews of a heritage, newest first by default.
#[utoipa::path(
    get,
    path = REVIEWS_PATH,
    tag = "reviews",
    params(("heritage_id" = HeritageId, Path, description = "The reviewed heritage"), Pagination, SortQuery),
    responses(
        (status = OK, description = "One page of reviews with the rating summary", body = ReviewList),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    )
)]
#[instrument(skip(service, sort), err(Debug))]
async fn list_reviews<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    ApiPath(heritage_id): ApiPath<HeritageId>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(sort): ApiQuery<SortQuery>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    let criteria = PageCriteria::new(pagination, DEFAULT_REVIEW_PAGE_SIZE);

    Ok(
        match service.list(heritage_id, criteria, sort.parse()).await? {
            Found::Yes(listing) => ApiResponse::ok(ReviewList {
                reviews: listing.reviews.items,
                average_rating: listing.summary.average_rating,
                total_reviews: listing.summary.total_reviews,
                pagination: listing.reviews.pagination,
            })
            .into_response(),
            Found::NotFound => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
        },
    )
}

#[utoipa::path(
    get,
    path = STATS_PATH,
    tag = "reviews",
    params(("heritage_id" = HeritageId, Path, description = "The reviewed heritage")),
    responses(
        (status = OK, description = "Average, count and the distribution over 1 to 5 stars", body = ReviewStats),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    )
)]
#[instrument(skip(service), err(Debug))]
async fn review_stats<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    ApiPath(heritage_id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    Ok(match service.stats(heritage_id).await? {
        Found::Yes(stats) => ApiResponse::ok(stats).into_response(),
        Found::NotFound => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
    })
}

/// The caller's active review of the heritage, `data` is null when there is none.
#[utoipa::path(
    get,
    path = MY_REVIEW_PATH,
    tag = "reviews",
    params(("heritage_id" = HeritageId, Path, description = "The reviewed heritage")),
    responses((status = OK, description = "The caller's review or null", body = Option<Review>)),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn my_review<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    user: CurrentUser,
    ApiPath(heritage_id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    let review = service.mine(user.id.into(), heritage_id).await?;
    Ok(ApiResponse::ok(review).into_response())
}

/// One review per user and heritage.
#[utoipa::path(
    post,
    path = REVIEWS_PATH,
    tag = "reviews",
    params(("heritage_id" = HeritageId, Path, description = "The heritage to review")),
    request_body = ReviewRequest,
    responses(
        (status = CREATED, description = "The review with its author", body = Review),
        (status = BAD_REQUEST, description = "Validation failed or the heritage is already reviewed"),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn create_review<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    user: CurrentUser,
    ApiPath(heritage_id): ApiPath<HeritageId>,
    ValidJson(request): ValidJson<ReviewRequest>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    let rating = match rating(request.rating) {
        Ok(rating) => rating,
        Err(rejection) => return Ok(rejection),
    };

    let outcome = service
        .create(NewReview {
            user_id: user.id.into(),
            heritage_id,
            rating,
            title: request.title,
            comment: request.comment,
        })
        .await?;

    Ok(match outcome {
        CreateReviewOutcome::Created(review) => {
            ApiResponse::created("Review submitted successfully", review).into_response()
        }
        CreateReviewOutcome::AlreadyReviewed => {
            ApiError::bad_request(ALREADY_REVIEWED).into_response()
        }
        CreateReviewOutcome::HeritageNotFound => {
            ApiError::not_found(HERITAGE_NOT_FOUND).into_response()
        }
    })
}

#[utoipa::path(
    put,
    path = REVIEW_PATH,
    tag = "reviews",
    params(("review_id" = ReviewId, Path, description = "The review to edit")),
    request_body = ReviewUpdateRequest,
    responses(
        (status = OK, description = "The updated review", body = Review),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = NOT_FOUND, description = "No active review of the caller with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn update_review<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    user: CurrentUser,
    ApiPath(review_id): ApiPath<ReviewId>,
    ValidJson(request): ValidJson<ReviewUpdateRequest>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    let rating = match request.rating.map(rating).transpose() {
        Ok(rating) => rating,
        Err(rejection) => return Ok(rejection),
    };

    let update = ReviewUpdate {
        rating,
        title: request.title,
        comment: request.comment,
    };

    Ok(
        match service.update(review_id, user.id.into(), update).await? {
            Some(review) => {
                ApiResponse::ok_with_message("Review updated successfully", review).into_response()
            }
            None => ApiError::not_found(REVIEW_NOT_EDITABLE).into_response(),
        },
    )
}

#[utoipa::path(
    delete,
    path = REVIEW_PATH,
    tag = "reviews",
    params(("review_id" = ReviewId, Path, description = "The review to delete")),
    responses(
        (status = OK, description = "The review was deactivated"),
        (status = NOT_FOUND, description = "No active review of the caller with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn delete_review<T: HeritageEngine>(
    State(service): State<ReviewService<T>>,
    user: CurrentUser,
    ApiPath(review_id): ApiPath<ReviewId>,
) -> Result<Response, EndpointError<ReviewServiceError>> {
    Ok(if service.delete(review_id, user.id.into()).await? {
        ApiResponse::done("Review deleted successfully").into_response()
    } else {
        ApiError::not_found(REVIEW_NOT_DELETABLE).into_response()
    })
}
