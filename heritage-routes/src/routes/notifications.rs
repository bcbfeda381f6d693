use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use heritage_core::HeritageEngine;
use heritage_core::ids::UserId;
use routing::response::{ApiError, ApiResponse, EndpointError};
use routing::router::Access;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{OpenApi, ToSchema};

use super::extract::{ApiJson, ApiPath};
use super::{Builder, CurrentUser, USER_NOT_FOUND};
use crate::error::NotificationServiceError;
use crate::notifications::{NotificationPayload, PushSender};
use crate::roles::HeritageRoles;
use crate::services::{
    FanOutReport, NotificationService, NotificationStats, SendToUserOutcome, SubscriptionKeys,
};

const SUBSCRIBE_PATH: &str = "/notifications/subscribe";
const UNSUBSCRIBE_PATH: &str = "/notifications/unsubscribe";
const STATS_PATH: &str = "/notifications/stats";
const SEND_TO_ALL_PATH: &str = "/notifications/send-to-all";
const SEND_TO_USER_PATH: &str = "/notifications/send-to-user/{user_id}";

pub const SUBSCRIPTION_REQUIRED: &str = "Subscription is required";
pub const TITLE_AND_BODY_REQUIRED: &str = "Title and body are required";
pub const NO_SUBSCRIPTION: &str = "User has no push subscription";
pub const DELIVERY_FAILED: &str = "Failed to send notification";

#[derive(OpenApi)]
#[openapi(
    paths(subscribe, unsubscribe, stats, send_to_all, send_to_user),
    components(schemas(
        SubscribeRequest,
        SubscriptionBody,
        KeysBody,
        UnsubscribeRequest,
        SendRequest,
        PublicKey,
        FanOutReport,
        NotificationStats
    ))
)]
pub(super) struct NotificationDocs;

pub(super) fn routes<T: HeritageEngine, P: PushSender>(builder: Builder<T, P>) -> Builder<T, P> {
    builder
        .post(SUBSCRIBE_PATH, subscribe::<T, P>, Access::Public)
        .post(UNSUBSCRIBE_PATH, unsubscribe::<T, P>, Access::Authenticated)
        .get(STATS_PATH, stats::<T, P>, Access::Roles(HeritageRoles::ADMIN))
        .post(
            SEND_TO_ALL_PATH,
            send_to_all::<T, P>,
            Access::Roles(HeritageRoles::ADMIN),
        )
        .post(
            SEND_TO_USER_PATH,
            send_to_user::<T, P>,
            Access::Roles(HeritageRoles::ADMIN),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct KeysBody {
    pub p256dh: String,
    pub auth: String,
}

/// A browser `PushSubscription` as returned by `pushManager.subscribe()`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionBody {
    pub endpoint: String,
    pub keys: KeysBody,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub subscription: Option<SubscriptionBody>,
    /// Owner of the subscription. Unknown users are ignored.
    pub user_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UnsubscribeRequest {
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    /// Opened when the notification is clicked, `/` by default
    pub url: Option<String>,
    pub icon: Option<String>,
}

impl SendRequest {
    fn into_payload(self) -> Option<NotificationPayload> {
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        match (non_blank(self.title), non_blank(self.body)) {
            (Some(title), Some(body)) => Some(NotificationPayload::new(
                title,
                body,
                non_blank(self.url),
                non_blank(self.icon),
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct PublicKey {
    public_key: Option<String>,
}

/// Store a browser subscription. Re-subscribing an endpoint replaces its keys and owner.
#[utoipa::path(
    post,
    path = SUBSCRIBE_PATH,
    tag = "notifications",
    request_body = SubscribeRequest,
    responses(
        (status = OK, description = "Subscribed, returns the VAPID public key", body = PublicKey),
        (status = BAD_REQUEST, description = "No subscription in the body"),
    )
)]
#[instrument(skip_all, err(Debug), fields(req.user_id = ?request.user_id))]
async fn subscribe<T: HeritageEngine, P: PushSender>(
    State(service): State<NotificationService<T, P>>,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> Result<Response, EndpointError<NotificationServiceError>> {
    let Some(subscription) = request.subscription else {
        return Ok(ApiError::bad_request(SUBSCRIPTION_REQUIRED).into_response());
    };

    let keys = SubscriptionKeys {
        endpoint: subscription.endpoint,
        p256dh: subscription.keys.p256dh,
        auth: subscription.keys.auth,
    };
    let public_key = service.subscribe(keys, request.user_id).await?;

    Ok(ApiResponse::ok_with_message(
        "Successfully subscribed to notifications",
        PublicKey { public_key },
    )
    .into_response())
}

/// Remove the given endpoint and every subscription of the caller. The body is optional.
#[utoipa::path(
    post,
    path = UNSUBSCRIBE_PATH,
    tag = "notifications",
    request_body = UnsubscribeRequest,
    responses((status = OK, description = "Unsubscribed")),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug), fields(user.id = %user.id))]
async fn unsubscribe<T: HeritageEngine, P: PushSender>(
    State(service): State<NotificationService<T, P>>,
    user: CurrentUser,
    body: Bytes,
) -> Result<Response, EndpointError<NotificationServiceError>> {
    let request = if body.is_empty() {
        UnsubscribeRequest::default()
    } else {
        match serde_json::from_slice::<UnsubscribeRequest>(&body) {
            Ok(request) => request,
            Err(e) => return Ok(ApiError::bad_request(e.to_string()).into_response()),
        }
    };

    let endpoint = request.endpoint;
    service.unsubscribe(user.id.into(), endpoint).await?;

    Ok(ApiResponse::done("Successfully unsubscribed from notifications").into_response())
}

#[utoipa::path(
    get,
    path = STATS_PATH,
    tag = "notifications",
    responses((status = OK, description = "Subscription counts and the public key", body = NotificationStats)),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn stats<T: HeritageEngine, P: PushSender>(
    State(service): State<NotificationService<T, P>>,
) -> Result<Response, EndpointError<NotificationServiceError>> {
    let stats = service.stats().await?;
    Ok(ApiResponse::ok(stats).into_response())
}

#[utoipa::path(
    post,
    path = SEND_TO_ALL_PATH,
    tag = "notifications",
    request_body = SendRequest,
    responses(
        (status = OK, description = "Per subscription delivery results", body = FanOutReport),
        (status = BAD_REQUEST, description = "Title or body missing"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip_all, err(Debug))]
async fn send_to_all<T: HeritageEngine, P: PushSender>(
    State(service): State<NotificationService<T, P>>,
    ApiJson(request): ApiJson<SendRequest>,
) -> Result<Response, EndpointError<NotificationServiceError>> {
    let Some(payload) = request.into_payload() else {
        return Ok(ApiError::bad_request(TITLE_AND_BODY_REQUIRED).into_response());
    };

    let report = service.send_to_all(payload).await?;
    Ok(ApiResponse::ok_with_message("Notifications sent", report).into_response())
}

#[utoipa::path(
    post,
    path = SEND_TO_USER_PATH,
    tag = "notifications",
    params(("user_id" = UserId, Path, description = "The user to notify")),
    request_body = SendRequest,
    responses(
        (status = OK, description = "Delivered to at least one of the user's subscriptions", body = FanOutReport),
        (status = BAD_REQUEST, description = "Title or body missing, or the user has no subscription"),
        (status = NOT_FOUND, description = "No user with this id"),
        (status = INTERNAL_SERVER_ERROR, description = "No subscription accepted the message"),
    ),
    security(("bearer" = []))
)]
#[instrument(skip(service, request), err(Debug))]
async fn send_to_user<T: HeritageEngine, P: PushSender>(
    State(service): State<NotificationService<T, P>>,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(request): ApiJson<SendRequest>,
) -> Result<Response, EndpointError<NotificationServiceError>> {
    let Some(payload) = request.into_payload() else {
        return Ok(ApiError::bad_request(TITLE_AND_BODY_REQUIRED).into_response());
    };

    Ok(match service.send_to_user(user_id, payload).await? {
        SendToUserOutcome::Delivered(report) if report.sent > 0 => {
            ApiResponse::ok_with_message("Notification sent to user", report).into_response()
        }
        SendToUserOutcome::Delivered(_) => {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, DELIVERY_FAILED).into_response()
        }
        SendToUserOutcome::NoSubscription => ApiError::bad_request(NO_SUBSCRIPTION).into_response(),
        SendToUserOutcome::UserNotFound => ApiError::not_found(USER_NOT_FOUND).into_response(),
    })
}
