use std::{env, sync::Arc, time::Duration};

#[derive(Clone, Debug)]
/// Configuration struct for the dashboard server.
///
/// Holds everything needed to run the backend-for-frontend: where to bind,
/// which origin the UI is served from, where the upstream backend lives
/// and how subscription states and stats caching behave.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Upstream backend configuration.
    pub backend: BackendConfig,
    /// How long a fetched stats payload is served from memory.
    pub stats_ttl: Duration,
    /// How long an unused session's stats cache is kept.
    pub stats_idle_timeout: Duration,
    /// Raw `SUBSCRIPTION_CANCEL_PRECEDENCE` value.
    pub cancel_precedence: String,
    /// Raw `SUBSCRIPTION_ACTIVE_LABEL` value.
    pub active_label: String,
}

#[derive(Clone, Debug)]
/// Location of the upstream REST backend and its aggregate stats endpoint.
pub struct BackendConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Path of the aggregate stats endpoint.
    pub stats_path: String,
    /// Request timeout for upstream calls.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Reads the upstream configuration from environment variables:
    /// - `BACKEND_URL`: default "http://localhost:5000"
    /// - `STATS_PATH`: default "/api/analytics/stats"
    /// - `UPSTREAM_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        BackendConfig {
            base_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string())
                .trim_end_matches('/')
                .to_string(),
            stats_path: env::var("STATS_PATH")
                .unwrap_or_else(|_| "/api/analytics/stats".to_string()),
            timeout: Duration::from_secs(
                env::var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            ),
        }
    }

    /// Full URL of the stats endpoint.
    pub fn stats_url(&self) -> String {
        if self.stats_path.starts_with('/') {
            format!("{}{}", self.base_url, self.stats_path)
        } else {
            format!("{}/{}", self.base_url, self.stats_path)
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Every value has a default, so a bare environment yields a working
    /// development setup. Values that fail to parse fall back to their default.
    ///
    /// # Environment Variables
    ///
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `STATS_TTL_MS`: Stats cache lifetime in milliseconds (default: 30000)
    /// - `STATS_SESSION_IDLE_SECS`: Drop a session's cache after this long unused (default: 900)
    /// - `SUBSCRIPTION_CANCEL_PRECEDENCE`: "cancel_flag_first" or "status_first"
    /// - `SUBSCRIPTION_ACTIVE_LABEL`: "fixed" or "plan"
    /// - Upstream settings, see [`BackendConfig::from_env`]
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            backend: BackendConfig::from_env(),
            stats_ttl: Duration::from_millis(
                env::var("STATS_TTL_MS")
                    .unwrap_or_else(|_| "30000".to_string())
                    .parse()
                    .unwrap_or(30_000),
            ),
            stats_idle_timeout: Duration::from_secs(
                env::var("STATS_SESSION_IDLE_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .unwrap_or(900),
            ),
            cancel_precedence: env::var("SUBSCRIPTION_CANCEL_PRECEDENCE")
                .unwrap_or_else(|_| "cancel_flag_first".to_string()),
            active_label: env::var("SUBSCRIPTION_ACTIVE_LABEL")
                .unwrap_or_else(|_| "fixed".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
