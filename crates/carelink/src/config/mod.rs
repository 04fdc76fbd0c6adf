use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_CHECKOUT_BASE_URL: &str = "https://checkout.example.test/session";
const DEFAULT_REVIEW_WINDOW_DAYS: u32 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let include_targets = environment != AppEnvironment::Production;

        let checkout_base_url = env::var("CARELINK_CHECKOUT_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_CHECKOUT_BASE_URL.to_string());
        if !checkout_base_url.starts_with("https://") && !checkout_base_url.starts_with("http://")
        {
            return Err(ConfigError::InvalidCheckoutUrl(checkout_base_url));
        }

        let currency = env::var("CARELINK_CURRENCY")
            .unwrap_or_else(|_| "usd".to_string())
            .trim()
            .to_ascii_lowercase();

        let review_window_days = match env::var("CARELINK_REVIEW_WINDOW_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidReviewWindow(raw))?,
            Err(_) => DEFAULT_REVIEW_WINDOW_DAYS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                include_targets,
            },
            marketplace: MarketplaceConfig {
                checkout_base_url: checkout_base_url.trim_end_matches('/').to_string(),
                currency,
                review_window_days,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub include_targets: bool,
}

/// Booking and settlement knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// Base of the redirect reference handed to clients when checkout opens.
    pub checkout_base_url: String,
    pub currency: String,
    /// Days after completion during which a review is accepted. Zero disables the bound.
    pub review_window_days: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: DEFAULT_CHECKOUT_BASE_URL.to_string(),
            currency: "usd".to_string(),
            review_window_days: DEFAULT_REVIEW_WINDOW_DAYS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCheckoutUrl(String),
    InvalidReviewWindow(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCheckoutUrl(value) => write!(
                f,
                "CARELINK_CHECKOUT_BASE_URL must be an http(s) URL, got '{}'",
                value
            ),
            ConfigError::InvalidReviewWindow(value) => write!(
                f,
                "CARELINK_REVIEW_WINDOW_DAYS must be a non-negative integer, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidCheckoutUrl(_)
            | ConfigError::InvalidReviewWindow(_) => None,
        }
    }
}
