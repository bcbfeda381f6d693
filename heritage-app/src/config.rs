use error_stack::{Report, ResultExt};
use heritage_routes::notifications::{FanOutConfig, VapidConfig};
use routing::DEFAULT_TOKEN_EXPIRY_DAYS;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@nepalheritage.com";

#[derive(Debug, thiserror::Error)]
#[error("invalid configuration")]
pub struct ConfigErr;

#[derive(Debug)]
pub struct Config {
    pub database_url: String,
    pub pool_size: Option<usize>,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub backend_url: String,
    pub frontend_url: String,
    pub upload_dir: String,
    /// `None` when either VAPID key is missing; push is then disabled.
    pub vapid: Option<VapidConfig>,
    pub metrics_enabled: bool,
    pub fan_out: FanOutConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, Report<ConfigErr>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Report<ConfigErr>> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let required = |name: &str| {
            var(name)
                .ok_or_else(|| Report::new(ConfigErr))
                .attach_with(|| format!("{name} is missing"))
        };

        let vapid = match (var("VAPID_PUBLIC_KEY"), var("VAPID_PRIVATE_KEY")) {
            (Some(public_key), Some(private_key)) => Some(VapidConfig {
                public_key,
                private_key,
                subject: var("VAPID_SUBJECT").unwrap_or_else(|| DEFAULT_VAPID_SUBJECT.into()),
            }),
            _ => None,
        };

        let defaults = FanOutConfig::default();
        let fan_out = FanOutConfig {
            concurrency: parse::<usize>(&var, "PUSH_CONCURRENCY")?
                .unwrap_or(defaults.concurrency)
                .max(1),
            max_attempts: parse::<u32>(&var, "PUSH_MAX_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts)
                .max(1),
            base_backoff: defaults.base_backoff,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            pool_size: parse(&var, "DATABASE_POOL_SIZE")?,
            port: parse(&var, "PORT")?.unwrap_or(DEFAULT_PORT),
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_days: parse(&var, "JWT_EXPIRY_DAYS")?.unwrap_or(DEFAULT_TOKEN_EXPIRY_DAYS),
            backend_url: var("BACKEND_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.into()),
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into()),
            upload_dir: var("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.into()),
            vapid,
            metrics_enabled: parse(&var, "METRICS_ENABLED")?.unwrap_or(true),
            fan_out,
        })
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, Report<ConfigErr>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .change_context(ConfigErr)
                .attach_with(|| format!("{name} has an invalid value: {value}"))
        })
        .transpose()
}
