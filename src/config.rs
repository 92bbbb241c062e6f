/*
 * Responsibility
 * - 環境変数の読み込み (PORT, JWT_SECRET, backend URLs, proxy timeout, CORS)
 * - 設定値のバリデーション (不正なら起動失敗)
 * - env を直接触らない `from_lookup` でテスト可能にする
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Shipped default for `JWT_SECRET`. Must be overridden outside development.
pub const PLACEHOLDER_JWT_SECRET: &str = "your-very-secret-jwt-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str),
    InsecureDefault(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::InsecureDefault(key) => {
                write!(f, "placeholder value must be overridden in production: {}", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Base addresses of the four backend services.
#[derive(Debug, Clone)]
pub struct BackendUrls {
    pub user: Url,
    pub restaurant: Url,
    pub order: Url,
    pub payment: Url,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub jwt_secret: String,
    pub jwt_leeway_seconds: u64,

    pub backends: BackendUrls,
    pub proxy_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (process env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_JWT_SECRET.to_string());

        if jwt_secret == PLACEHOLDER_JWT_SECRET {
            if app_env.is_production() {
                return Err(ConfigError::InsecureDefault("JWT_SECRET"));
            }
            tracing::warn!("JWT_SECRET is not set; using the development placeholder secret");
        }

        let jwt_leeway_seconds = lookup("JWT_LEEWAY_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let backends = BackendUrls {
            user: backend_url(&lookup, "USER_SERVICE_URL", "http://localhost:3001")?,
            restaurant: backend_url(&lookup, "RESTAURANT_SERVICE_URL", "http://localhost:3002")?,
            order: backend_url(&lookup, "ORDER_SERVICE_URL", "http://localhost:3003")?,
            payment: backend_url(&lookup, "PAYMENT_SERVICE_URL", "http://localhost:3004")?,
        };

        let proxy_timeout_seconds = match lookup("PROXY_TIMEOUT_SECONDS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("PROXY_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        let body_limit_bytes = lookup("BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            jwt_secret,
            jwt_leeway_seconds,
            backends,
            proxy_timeout: Duration::from_secs(proxy_timeout_seconds),
            body_limit_bytes,
        })
    }
}

fn backend_url<F>(lookup: &F, key: &'static str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid(key))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::Invalid(key)),
    }
}
