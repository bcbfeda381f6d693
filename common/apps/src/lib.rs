use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::response::Response;
use error_stack::{Report, ResultExt};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

#[derive(Debug, Clone)]
pub struct AppProperties {
    pub port: u16,
    /// The only origin allowed to call the API from a browser.
    pub frontend_url: String,
}

#[derive(Debug, thiserror::Error)]
#[error("the app exited with an error")]
pub struct AppError;

pub type AppResult<T> = Result<T, Report<AppError>>;

pub async fn run(routes: Router, properties: AppProperties) -> AppResult<()> {
    let cors = cors_layer(&properties.frontend_url)?;
    let listener = build_listener(properties.port).await?;

    let routes = routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().on_response(
                |res: &Response, latency: Duration, _span: &Span| {
                    info!("returned {} in {}ms", res.status(), latency.as_millis());
                },
            ))
            .layer(cors),
    );

    info!(
        "starting up heritage service on port {}",
        listener.local_addr().change_context(AppError)?.port()
    );

    serve_on(listener, routes).await
}

fn cors_layer(frontend_url: &str) -> AppResult<CorsLayer> {
    let origin = frontend_url
        .parse::<HeaderValue>()
        .change_context(AppError)
        .attach_with(|| format!("invalid frontend url '{frontend_url}'"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60)))
}

async fn serve_on(listener: TcpListener, routes: Router) -> AppResult<()> {
    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .change_context(AppError)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await
        }
    }
}

async fn build_listener(port: u16) -> AppResult<TcpListener> {
    TcpListener::bind(std::net::SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::UNSPECIFIED,
        port,
    )))
    .await
    .change_context(AppError)
    .attach_with(|| format!("failed to bind port {port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_frontend_origin() {
        assert!(cors_layer("http://localhost:5173").is_ok());
    }

    #[test]
    fn cors_rejects_unprintable_origin() {
        assert!(cors_layer("http://local\nhost").is_err());
    }
}
