//! Application configuration loaded from environment variables.

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: Postgres connection string; unset runs on the
///   in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `RATE_PROVIDER_URL`, `RATE_PROVIDER_API_KEY`: courier rate API; unset
///   URL uses canned quotes
/// - `RATE_PROVIDER_TIMEOUT_SECS`: outbound request timeout (default: `10`)
/// - `DEFAULT_ORIGIN_POSTAL_CODE`: origin for sellers without settings
///   (default: `"10110"`)
/// - `DEFAULT_COURIERS`: comma-separated courier codes (default:
///   `"jne,jnt,sicepat"`)
/// - `PAYMENT_WEBHOOK_SECRET`: HMAC secret for gateway notifications;
///   unset disables signature checks
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub rate_provider_url: Option<String>,
    pub rate_provider_api_key: String,
    pub rate_provider_timeout_secs: u64,
    pub default_origin_postal_code: String,
    pub default_couriers: Vec<String>,
    pub payment_webhook_secret: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: var("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: var("DATABASE_URL"),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            rate_provider_url: var("RATE_PROVIDER_URL"),
            rate_provider_api_key: var("RATE_PROVIDER_API_KEY").unwrap_or_default(),
            rate_provider_timeout_secs: parsed("RATE_PROVIDER_TIMEOUT_SECS")
                .unwrap_or(defaults.rate_provider_timeout_secs),
            default_origin_postal_code: var("DEFAULT_ORIGIN_POSTAL_CODE")
                .unwrap_or(defaults.default_origin_postal_code),
            default_couriers: var("DEFAULT_COURIERS")
                .map(|c| parse_couriers(&c))
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.default_couriers),
            payment_webhook_secret: var("PAYMENT_WEBHOOK_SECRET"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            rate_provider_url: None,
            rate_provider_api_key: String::new(),
            rate_provider_timeout_secs: 10,
            default_origin_postal_code: "10110".to_string(),
            default_couriers: parse_couriers("jne,jnt,sicepat"),
            payment_webhook_secret: None,
        }
    }
}

/// Splits a comma-separated courier list into lowercase codes.
pub fn parse_couriers(list: &str) -> Vec<String> {
    let mut couriers: Vec<String> = Vec::new();
    for code in list.split(',').map(|c| c.trim().to_lowercase()) {
        if !code.is_empty() && !couriers.contains(&code) {
            couriers.push(code);
        }
    }
    couriers
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.trim().parse().ok())
}
