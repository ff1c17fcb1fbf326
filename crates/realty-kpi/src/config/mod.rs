use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::analysis::{AnalyzerOptions, CurrencyCode, CurrencyError, DEFAULT_PARALLEL_THRESHOLD};
use crate::history::DEFAULT_HISTORY_LIMIT;

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
    pub analysis: AnalysisConfig,
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
        let format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            analysis: AnalysisConfig::from_env()?,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Engine defaults shared by the HTTP service and the CLI.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub default_currency: CurrencyCode,
    pub parallel_threshold: usize,
    pub history_limit: usize,
}

impl AnalysisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let default_currency = match env::var("APP_DEFAULT_CURRENCY") {
            Ok(raw) => CurrencyCode::parse(&raw).map_err(|source| ConfigError::InvalidCurrency {
                value: raw,
                source,
            })?,
            Err(_) => CurrencyCode::default(),
        };

        let parallel_threshold = match env::var("APP_PARALLEL_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidThreshold(raw))?,
            Err(_) => DEFAULT_PARALLEL_THRESHOLD,
        };

        let history_limit = match env::var("APP_HISTORY_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidHistoryLimit(raw))?,
            Err(_) => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Self {
            default_currency,
            parallel_threshold,
            history_limit,
        })
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            default_currency: self.default_currency.clone(),
            parallel_threshold: self.parallel_threshold,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_currency: CurrencyCode::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidCurrency { value: String, source: CurrencyError },
    InvalidThreshold(String),
    InvalidHistoryLimit(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be `compact` or `pretty`, got '{value}'")
            }
            ConfigError::InvalidCurrency { value, .. } => {
                write!(f, "APP_DEFAULT_CURRENCY '{value}' is not a supported currency")
            }
            ConfigError::InvalidThreshold(value) => write!(
                f,
                "APP_PARALLEL_THRESHOLD must be a record count, got '{value}'"
            ),
            ConfigError::InvalidHistoryLimit(value) => write!(
                f,
                "APP_HISTORY_LIMIT must be a positive integer, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidCurrency { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidThreshold(_)
            | ConfigError::InvalidHistoryLimit(_) => None,
        }
    }
}
