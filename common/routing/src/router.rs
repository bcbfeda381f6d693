use std::fmt::Display;

use axum::{
    Router,
    handler::Handler,
    http::StatusCode,
    middleware,
    routing::{MethodRouter, delete, get, patch, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::debug;
use utoipa::openapi::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::response::ApiError;
use crate::{AuthState, Roles, metrics, require_auth, require_roles, validate_token};

pub const ROUTE_NOT_FOUND: &str = "Route not found";

/// Who may call a route.
#[derive(Debug, Clone)]
pub enum Access<R> {
    Public,
    /// Any user with a valid token.
    Authenticated,
    /// A valid token carrying the roles.
    Roles(R),
}

struct Route<R> {
    method: &'static str,
    root_path: &'static str,
    relative_path: &'static str,
    access: Access<R>,
}

impl<R> Display for Route<R>
where
    R: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.method, self.root_path, self.relative_path
        )?;

        match &self.access {
            Access::Public => Ok(()),
            Access::Authenticated => write!(f, " (requires authentication)"),
            Access::Roles(r) => write!(f, " (requires roles {r})"),
        }
    }
}

pub struct RouterBuilder<S, R> {
    inner: OpenApiRouter<S>,
    root_path: &'static str,
    routes: Vec<Route<R>>,
}

impl<S, R> RouterBuilder<S, R>
where
    S: Send + Sync + Clone + 'static,
    R: Roles,
{
    pub fn new(root_path: &'static str) -> Self {
        Self {
            inner: OpenApiRouter::new(),
            root_path,
            routes: Vec::new(),
        }
    }

    pub fn get<T, F>(self, path: &'static str, handler: F, access: Access<R>) -> Self
    where
        F: Handler<T, S>,
        T: 'static,
    {
        self.route("GET", path, get(handler), access)
    }

    pub fn post<T, F>(self, path: &'static str, handler: F, access: Access<R>) -> Self
    where
        F: Handler<T, S>,
        T: 'static,
    {
        self.route("POST", path, post(handler), access)
    }

    pub fn put<T, F>(self, path: &'static str, handler: F, access: Access<R>) -> Self
    where
        F: Handler<T, S>,
        T: 'static,
    {
        self.route("PUT", path, put(handler), access)
    }

    pub fn patch<T, F>(self, path: &'static str, handler: F, access: Access<R>) -> Self
    where
        F: Handler<T, S>,
        T: 'static,
    {
        self.route("PATCH", path, patch(handler), access)
    }

    pub fn delete<T, F>(self, path: &'static str, handler: F, access: Access<R>) -> Self
    where
        F: Handler<T, S>,
        T: 'static,
    {
        self.route("DELETE", path, delete(handler), access)
    }

    fn route(
        mut self,
        method: &'static str,
        path: &'static str,
        method_router: MethodRouter<S>,
        access: Access<R>,
    ) -> Self {
        // the last layer added runs first, authentication is checked before roles
        let method_router = match &access {
            Access::Public => method_router,
            Access::Authenticated => method_router.layer(middleware::from_fn(require_auth::<R>)),
            Access::Roles(roles) => method_router
                .layer(middleware::from_fn_with_state(
                    roles.clone(),
                    require_roles::<R>,
                ))
                .layer(middleware::from_fn(require_auth::<R>)),
        };

        self.inner = self.inner.route(path, method_router);
        self.routes.push(Route {
            method,
            root_path: self.root_path,
            relative_path: path,
            access,
        });
        self
    }

    pub fn build_no_metrics(self, app_state: S, auth_state: AuthState, api_doc: OpenApi) -> Router {
        self.log_routes();
        build::<S, R>(self.root_path, self.inner, app_state, auth_state, api_doc).route(
            "/metrics",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Metrics endpoint is disabled. Metrics must be enabled and the service restarted",
                )
            }),
        )
    }

    pub fn build_with_metrics(
        self,
        app_state: S,
        auth_state: AuthState,
        api_doc: OpenApi,
        metrics_handle: PrometheusHandle,
    ) -> Router {
        self.log_routes();

        let main_router = self
            .inner
            .route_layer(middleware::from_fn(metrics::track_http));

        build::<S, R>(self.root_path, main_router, app_state, auth_state, api_doc)
            .route("/metrics", get(|| async move { metrics_handle.render() }))
    }

    fn log_routes(&self) {
        for route in &self.routes {
            debug!("Building route - {route}")
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found(ROUTE_NOT_FOUND)
}

fn build<S, R>(
    root_path: &'static str,
    main_router: OpenApiRouter<S>,
    app_state: S,
    auth_state: AuthState,
    api_doc: OpenApi,
) -> Router
where
    S: Send + Sync + Clone + 'static,
    R: Roles,
{
    let main_routes = OpenApiRouter::new()
        .nest(root_path, main_router)
        .layer(middleware::from_fn_with_state(
            auth_state,
            validate_token::<R>,
        ))
        .with_state(app_state);
    let (router, api) = OpenApiRouter::with_openapi(api_doc)
        .merge(main_routes)
        .split_for_parts();

    router
        .merge(
            SwaggerUi::new(format!("{root_path}/swagger-ui"))
                .url(format!("{root_path}/api-docs/openapi.json"), api),
        )
        .fallback(route_not_found)
}

#[cfg(test)]
mod tests {
    use std::fmt::{Display, Formatter};
    use std::str::FromStr;

    use axum::extract::State;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::response::ApiResponse;
    use crate::{AuthedUser, INVALID_TOKEN, JwtKeys, MISSING_TOKEN};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TestRoles(u8);

    impl TestRoles {
        const ADMIN: TestRoles = TestRoles(1);
    }

    impl FromStr for TestRoles {
        type Err = ();

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "admin" => Ok(Self::ADMIN),
                "user" => Ok(Self(0)),
                _ => Err(()),
            }
        }
    }

    impl Display for TestRoles {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            if self.contains(Self::ADMIN) {
                write!(f, "Admin")
            } else {
                write!(f, "None")
            }
        }
    }

    impl Roles for TestRoles {
        fn none() -> Self {
            Self(0)
        }

        fn is_none(&self) -> bool {
            self.0 == 0
        }

        fn contains(&self, other: Self) -> bool {
            self.0 & other.0 == other.0
        }

        fn add(&mut self, other: Self) {
            self.0 |= other.0
        }
    }

    const SECRET: &[u8] = b"router-test";

    async fn whoami(
        State(_): State<()>,
        user: Option<AuthedUser<TestRoles>>,
    ) -> ApiResponse<Option<String>> {
        ApiResponse::ok(user.map(|u| u.email.to_string()))
    }

    fn server() -> TestServer {
        let router = RouterBuilder::<(), TestRoles>::new("/api")
            .get("/public", whoami, Access::Public)
            .get("/private", whoami, Access::Authenticated)
            .get("/admin", whoami, Access::Roles(TestRoles::ADMIN))
            .build_no_metrics(
                (),
                AuthState::new(JwtKeys::new(SECRET, 7)),
                OpenApi::default(),
            );

        TestServer::new(router).unwrap()
    }

    fn token(role: &str) -> String {
        JwtKeys::new(SECRET, 7)
            .issue(Uuid::now_v7(), "sita@example.com", role)
            .unwrap()
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn public_route_sees_optional_user() {
        let server = server();

        let anonymous = server.get("/api/public").await;
        anonymous.assert_status_ok();
        anonymous.assert_json(&json!({"success": true, "data": null}));

        let signed_in = server
            .get("/api/public")
            .authorization_bearer(token("user"))
            .await;
        signed_in.assert_json(&json!({"success": true, "data": "sita@example.com"}));

        let bad_token = server
            .get("/api/public")
            .authorization_bearer("garbage")
            .await;
        bad_token.assert_status_ok();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn authenticated_route_requires_valid_token() {
        let server = server();

        let missing = server.get("/api/private").await;
        missing.assert_status_unauthorized();
        assert_eq!(MISSING_TOKEN, missing.json::<Value>()["message"]);

        let invalid = server
            .get("/api/private")
            .authorization_bearer("garbage")
            .await;
        invalid.assert_status_unauthorized();
        assert_eq!(INVALID_TOKEN, invalid.json::<Value>()["message"]);

        let not_bearer = server
            .get("/api/private")
            .add_header("Authorization", "Basic abc")
            .await;
        assert_eq!(MISSING_TOKEN, not_bearer.json::<Value>()["message"]);

        server
            .get("/api/private")
            .authorization_bearer(token("user"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn role_route_checks_auth_then_roles() {
        let server = server();

        server.get("/api/admin").await.assert_status_unauthorized();

        let forbidden = server
            .get("/api/admin")
            .authorization_bearer(token("user"))
            .await;
        forbidden.assert_status_forbidden();
        assert_eq!(
            json!({"success": false, "message": "Access denied: Admin role required"}),
            forbidden.json::<Value>()
        );

        server
            .get("/api/admin")
            .authorization_bearer(token("admin"))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn unknown_route_is_json_not_found() {
        let response = server().get("/api/nope").await;

        response.assert_status_not_found();
        response.assert_json(&json!({"success": false, "message": ROUTE_NOT_FOUND}));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn disabled_metrics_are_unavailable() {
        server()
            .get("/metrics")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
