use synth_broker::BrokerConfig;

/// Default backend endpoint.
pub const DEFAULT_BACKEND_API_URL: &str = "http://127.0.0.1:8000";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `180`). Must exceed the
    /// backend timeout because an immediately admitted submit waits for
    /// the backend call.
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the listener stops
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL of the synthesis backend.
    pub backend_api_url: String,
    /// Broker tuning (concurrency, timeouts, retention).
    pub broker: BrokerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8001`                     |
    /// | `CORS_ORIGINS`         | `*`                        |
    /// | `REQUEST_TIMEOUT_SECS` | `180`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `BACKEND_API_URL`      | `http://127.0.0.1:8000`    |
    ///
    /// Broker variables are documented on [`BrokerConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8001".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "180".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let backend_api_url =
            std::env::var("BACKEND_API_URL").unwrap_or_else(|_| DEFAULT_BACKEND_API_URL.into());

        let broker = BrokerConfig::from_env();

        if request_timeout_secs <= broker.backend_timeout.as_secs() {
            tracing::warn!(
                request_timeout_secs,
                backend_timeout_secs = broker.backend_timeout.as_secs(),
                "Request timeout does not exceed backend timeout; immediate submits may be cut off",
            );
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            backend_api_url,
            broker,
        }
    }

    /// Whether the CORS configuration allows any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            ["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn wildcard_detected() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: parse_origins("*"),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            backend_api_url: DEFAULT_BACKEND_API_URL.into(),
            broker: BrokerConfig::default(),
        };
        assert!(config.allows_any_origin());
    }
}
