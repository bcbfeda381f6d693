use axum::extract::State;
use axum::response::{IntoResponse, Response};
use garde::Validate;
use heritage_core::HeritageEngine;
use heritage_core::ids::{CommentId, HeritageId};
use heritage_core::list_criteria::PageCriteria;
use heritage_core::model::comment::{Comment, CommentStats, CommentThread, NewComment};
use heritage_core::pagination::{PageMeta, Pagination};
use routing::response::{ApiError, ApiResponse, EndpointError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{OpenApi, ToSchema};

use super::extract::{ApiPath, ApiQuery, ValidJson};
use super::{Builder, CurrentUser, HERITAGE_NOT_FOUND, SortQuery};
use crate::error::CommentServiceError;
use crate::notifications::PushSender;
use crate::services::{
    CommentService, CreateCommentOutcome, DEFAULT_COMMENT_PAGE_SIZE, DEFAULT_REPLY_PAGE_SIZE,
    Found,
};

const COMMENTS_PATH: &str = "/comments/heritage/{heritage_id}/comments";
const STATS_PATH: &str = "/comments/heritage/{heritage_id}/comments/stats";
const REPLIES_PATH: &str = "/comments/comments/{comment_id}/replies";
const COMMENT_PATH: &str = "/comments/comments/{comment_id}";

pub const PARENT_NOT_FOUND: &str = "Parent comment not found";
pub const COMMENT_NOT_EDITABLE: &str = "Comment not found or you are not authorized to edit it";
pub const COMMENT_NOT_DELETABLE: &str = "Comment not found or you are not authorized to delete it";

#[derive(OpenApi)]
#[openapi(
    paths(list_comments, comment_stats, list_replies, create_comment, update_comment, delete_comment),
    components(schemas(CommentRequest, CommentUpdateRequest, CommentList, ReplyList, Comment, CommentStats))
)]
pub(super) struct CommentDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .get(COMMENTS_PATH, list_comments::<T>, Access::Public)
        .get(STATS_PATH, comment_stats::<T>, Access::Public)
        .get(REPLIES_PATH, list_replies::<T>, Access::Public)
        .post(COMMENTS_PATH, create_comment::<T>, Access::Authenticated)
        .put(COMMENT_PATH, update_comment::<T>, Access::Authenticated)
        .delete(COMMENT_PATH, delete_comment::<T>, Access::Authenticated)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[garde(length(chars, min = 1, max = 500))]
    pub content: String,
    /// Set to reply to a top level comment of the same heritage
    #[garde(skip)]
    pub parent_id: Option<CommentId>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CommentUpdateRequest {
    #[garde(length(chars, min = 1, max = 500))]
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
struct CommentList {
    comments: Vec<CommentThread>,
    pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
struct ReplyList {
    replies: Vec<Comment>,
    pagination: PageMeta,
}

/// Active top level comments, each with its active replies oldest first.
#[utoipa::path(
    get,
    path = COMMENTS_PATH,
    tag = "comments",
    params(("heritage_id" = HeritageId, Path, description = "The commented heritage"), Pagination, SortQuery),
    responses(
        (status = OK, description = "One page of comment threads", body = CommentList),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    )
)]
#[instrument(skip(service, sort), err(Debug))]
async fn list_comments<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    ApiPath(heritage_id): ApiPath<HeritageId>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(sort): ApiQuery<SortQuery>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    let criteria = PageCriteria::new(pagination, DEFAULT_COMMENT_PAGE_SIZE);

    Ok(
        match service.list(heritage_id, criteria, sort.parse()).await? {
            Found::Yes(listing) => ApiResponse::ok(CommentList {
                comments: listing.items,
                pagination: listing.pagination,
            })
            .into_response(),
            Found::NotFound => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
        },
    )
}

#[utoipa::path(
    get,
    path = STATS_PATH,
    tag = "comments",
    params(("heritage_id" = HeritageId, Path, description = "The commented heritage")),
    responses(
        (status = OK, description = "Active comment counts", body = CommentStats),
        (status = NOT_FOUND, description = "No active heritage with this id"),
    )
)]
#[instrument(skip(service), err(Debug))]
async fn comment_stats<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    ApiPath(heritage_id): ApiPath<HeritageId>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    Ok(match service.stats(heritage_id).await? {
        Found::Yes(stats) => ApiResponse::ok(stats).into_response(),
        Found::NotFound => ApiError::not_found(HERITAGE_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    get,
    path = REPLIES_PATH,
    tag = "comments",
    params(("comment_id" = CommentId, Path, description = "The parent comment"), Pagination),
    responses(
        (status = OK, description = "Active replies, oldest first", body = ReplyList),
        (status = NOT_FOUND, description = "No comment with this id"),
    )
)]
#[instrument(skip(service), err(Debug))]
async fn list_replies<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    ApiPath(comment_id): ApiPath<CommentId>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    let criteria = PageCriteria::new(pagination, DEFAULT_REPLY_PAGE_SIZE);

    Ok(match service.replies(comment_id, criteria).await? {
        Found::Yes(listing) => ApiResponse::ok(ReplyList {
            replies: listing.items,
            pagination: listing.pagination,
        })
        .into_response(),
        Found::NotFound => ApiError::not_found(PARENT_NOT_FOUND).into_response(),
    })
}

#[utoipa::path(
    post,
    path = COMMENTS_PATH,
    tag = "comments",
    params(("heritage_id" = HeritageId, Path, description = "The heritage to comment on")),
    request_body = CommentRequest,
    responses(
        (status = CREATED, description = "The comment with its author", body = Comment),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = NOT_FOUND, description = "No active heritage or parent comment with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn create_comment<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    user: CurrentUser,
    ApiPath(heritage_id): ApiPath<HeritageId>,
    ValidJson(request): ValidJson<CommentRequest>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    let outcome = service
        .create(NewComment {
            user_id: user.id.into(),
            heritage_id,
            parent_id: request.parent_id,
            content: request.content,
        })
        .await?;

    Ok(match outcome {
        CreateCommentOutcome::Created(comment) => {
            ApiResponse::created("Comment posted successfully", comment).into_response()
        }
        CreateCommentOutcome::HeritageNotFound => {
            ApiError::not_found(HERITAGE_NOT_FOUND).into_response()
        }
        CreateCommentOutcome::ParentNotFound => {
            ApiError::not_found(PARENT_NOT_FOUND).into_response()
        }
    })
}

#[utoipa::path(
    put,
    path = COMMENT_PATH,
    tag = "comments",
    params(("comment_id" = CommentId, Path, description = "The comment to edit")),
    request_body = CommentUpdateRequest,
    responses(
        (status = OK, description = "The updated comment", body = Comment),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = NOT_FOUND, description = "No active comment of the caller with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn update_comment<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    user: CurrentUser,
    ApiPath(comment_id): ApiPath<CommentId>,
    ValidJson(request): ValidJson<CommentUpdateRequest>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    Ok(
        match service
            .update(comment_id, user.id.into(), request.content)
            .await?
        {
            Some(comment) => ApiResponse::ok_with_message("Comment updated successfully", comment)
                .into_response(),
            None => ApiError::not_found(COMMENT_NOT_EDITABLE).into_response(),
        },
    )
}

#[utoipa::path(
    delete,
    path = COMMENT_PATH,
    tag = "comments",
    params(("comment_id" = CommentId, Path, description = "The comment to delete")),
    responses(
        (status = OK, description = "The comment was deactivated"),
        (status = NOT_FOUND, description = "No active comment of the caller with this id"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service), err(Debug), fields(user.id = %user.id))]
async fn delete_comment<T: HeritageEngine>(
    State(service): State<CommentService<T>>,
    user: CurrentUser,
    ApiPath(comment_id): ApiPath<CommentId>,
) -> Result<Response, EndpointError<CommentServiceError>> {
    Ok(if service.delete(comment_id, user.id.into()).await? {
        ApiResponse::done("Comment deleted successfully").into_response()
    } else {
        ApiError::not_found(COMMENT_NOT_DELETABLE).into_response()
    })
}
