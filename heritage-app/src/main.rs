use std::sync::Arc;

use apps::{AppError, AppProperties, AppResult};
use axum::Router;
use config::Config;
use dotenv::dotenv;
use error_stack::ResultExt;
use error_stack::fmt::ColorMode;
use heritage_routes::notifications::WebPushSender;
use heritage_routes::state::{HeritageAppState, ServiceSettings};
use heritage_routes::uploads::UploadStore;
use repositories::postgres::comments::CommentRepo;
use repositories::postgres::heritages::HeritageRepo;
use repositories::postgres::initializer::{PgRepos, RepoCreator};
use repositories::postgres::reviews::ReviewRepo;
use repositories::postgres::saved::SavedHeritageRepo;
use repositories::postgres::stats::StatsRepo;
use repositories::postgres::subscriptions::SubscriptionRepo;
use repositories::postgres::users::UserRepo;
use routing::{AuthState, JwtKeys};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod config;

#[tokio::main]
async fn main() {
    match try_main().await {
        Ok(_) => info!("heritage service shutting down"),
        Err(e) => {
            error!("heritage service exited with error: {e:?}");
        }
    }
}

fn init_logging() {
    error_stack::Report::set_color_mode(ColorMode::None);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("HERITAGE_LOG"))
        .init();
}

async fn try_main() -> AppResult<()> {
    init_logging();

    if let Err(e) = dotenv() {
        warn!("failed to load .env file: {e}");
    }

    let config = Config::from_env().change_context(AppError)?;
    let routes = build_routes(&config).await?;

    apps::run(
        routes,
        AppProperties {
            port: config.port,
            frontend_url: config.frontend_url,
        },
    )
    .await
}

async fn build_routes(config: &Config) -> AppResult<Router> {
    let repos = build_repos(config).await?;

    let uploads = UploadStore::new(&config.upload_dir);
    uploads.ensure_dir().await.change_context(AppError)?;

    let keys = JwtKeys::new(config.jwt_secret.as_bytes(), config.jwt_expiry_days);
    let settings = ServiceSettings {
        base_url: Arc::from(config.backend_url.as_str()),
        uploads,
        jwt: Arc::new(keys.clone()),
        fan_out: config.fan_out,
    };

    let engine = PgEngine::new(repos);
    let sender = build_sender(config);

    debug!("building routes..");
    let routes = if config.metrics_enabled {
        let handle = routing::setup_recorder().change_context(AppError)?;
        heritage_routes::routes::build(
            HeritageAppState::new_with_metrics(engine, sender, settings),
            AuthState::new(keys),
            Some(handle),
        )
    } else {
        heritage_routes::routes::build(
            HeritageAppState::new_without_metrics(engine, sender, settings),
            AuthState::new(keys),
            None,
        )
    };
    debug!("routes built");

    Ok(routes)
}

fn build_sender(config: &Config) -> WebPushSender {
    let client = reqwest::Client::new();
    match &config.vapid {
        Some(vapid) => WebPushSender::new(client, vapid.clone()),
        None => {
            warn!("VAPID_PUBLIC_KEY or VAPID_PRIVATE_KEY is not set, push notifications are disabled");
            WebPushSender::disabled(client)
        }
    }
}

#[instrument(skip_all)]
async fn build_repos(config: &Config) -> AppResult<PgRepos> {
    use repositories::postgres::ConnectionDetails;

    debug!("initializing repositories");
    RepoCreator::default()
        .with_heritage_repos()
        .create(
            ConnectionDetails::Url(config.database_url.clone()),
            config.pool_size,
        )
        .await
        .change_context(AppError)
}

#[derive(Clone)]
struct PgEngine {
    repos: PgRepos,
}

impl PgEngine {
    fn new(repos: PgRepos) -> Self {
        Self { repos }
    }
}

impl heritage_core::HeritageEngine for PgEngine {
    type Users = UserRepo;
    type Heritages = HeritageRepo;
    type Saved = SavedHeritageRepo;
    type Reviews = ReviewRepo;
    type Comments = CommentRepo;
    type Subscriptions = SubscriptionRepo;
    type Stats = StatsRepo;

    fn users(&self) -> &Self::Users {
        &self.repos.users
    }

    fn heritages(&self) -> &Self::Heritages {
        &self.repos.heritages
    }

    fn saved(&self) -> &Self::Saved {
        &self.repos.saved
    }

    fn reviews(&self) -> &Self::Reviews {
        &self.repos.reviews
    }

    fn comments(&self) -> &Self::Comments {
        &self.repos.comments
    }

    fn subscriptions(&self) -> &Self::Subscriptions {
        &self.repos.subscriptions
    }

    fn stats(&self) -> &Self::Stats {
        &self.repos.stats
    }
}
