use std::str::FromStr;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use heritage_core::HeritageEngine;
use heritage_core::filter::Sort;
use metrics_exporter_prometheus::PrometheusHandle;
use routing::router::RouterBuilder;
use routing::{AuthState, AuthedUser};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::services::ServeDir;
use tracing::info;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi};

use crate::notifications::PushSender;
use crate::roles::HeritageRoles;
use crate::state::HeritageAppState;
use crate::uploads::{MAX_HERITAGE_IMAGES, MAX_IMAGE_BYTES};

mod admin;
mod auth;
mod comments;
mod extract;
mod heritages;
mod notifications;
mod reviews;
mod users;

pub use auth::{ACCOUNT_DEACTIVATED, DUPLICATE_USER, INCORRECT_PASSWORD, INVALID_CREDENTIALS};
pub use heritages::HERITAGE_NOT_FOUND;

const API_ROOT_PATH: &str = "/api";
const HEALTH_PATH: &str = "/health";
const UPLOADS_PATH: &str = "/uploads";

pub const USER_NOT_FOUND: &str = "User not found";
pub const HEALTH_MESSAGE: &str = "Nepal Heritage Explorer API is running";

/// Room for a full set of images plus the text fields of the form.
const BODY_LIMIT: usize = MAX_HERITAGE_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

type Builder<T, P> = RouterBuilder<HeritageAppState<T, P>, HeritageRoles>;
type CurrentUser = AuthedUser<HeritageRoles>;

/// `sortBy` and `sortOrder` of the listings. Unknown keys fall back to `createdAt DESC`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
struct SortQuery {
    sort_by: Option<String>,
    /// ASC or DESC
    sort_order: Option<String>,
}

impl SortQuery {
    fn parse<F>(&self) -> Sort<F>
    where
        F: FromStr + Default,
    {
        Sort::parse(self.sort_by.as_deref(), self.sort_order.as_deref())
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Nepal Heritage Explorer API"),
    modifiers(&BearerAuth),
    nest(
        (path = API_ROOT_PATH, api = auth::AuthDocs),
        (path = API_ROOT_PATH, api = heritages::HeritageDocs),
        (path = API_ROOT_PATH, api = reviews::ReviewDocs),
        (path = API_ROOT_PATH, api = comments::CommentDocs),
        (path = API_ROOT_PATH, api = admin::AdminDocs),
        (path = API_ROOT_PATH, api = users::UserDocs),
        (path = API_ROOT_PATH, api = notifications::NotificationDocs),
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// Every API route under `/api`, `/health`, the uploaded images under `/uploads` and
/// `/metrics`. Metrics are served when a handle is given.
pub fn build<T, P>(
    app_state: HeritageAppState<T, P>,
    auth_state: AuthState,
    metrics_handle: Option<PrometheusHandle>,
) -> Router
where
    T: HeritageEngine,
    P: PushSender,
{
    let uploads_dir = app_state.uploads.dir().to_path_buf();

    let builder = Builder::<T, P>::new(API_ROOT_PATH);
    let builder = auth::routes(builder);
    let builder = heritages::routes(builder);
    let builder = reviews::routes(builder);
    let builder = comments::routes(builder);
    let builder = admin::routes(builder);
    let builder = users::routes(builder);
    let builder = notifications::routes(builder);

    let router = match metrics_handle.filter(|_| app_state.metrics_enabled) {
        Some(handle) => {
            info!("metrics enabled, setting up metrics handler");
            builder.build_with_metrics(app_state, auth_state, ApiDoc::openapi(), handle)
        }
        None => {
            info!("metrics not enabled, setting up service unavailable metrics handler");
            builder.build_no_metrics(app_state, auth_state, ApiDoc::openapi())
        }
    };

    router
        .route(HEALTH_PATH, get(health))
        .nest_service(UPLOADS_PATH, ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": HEALTH_MESSAGE,
        "timestamp": Utc::now(),
    }))
}
