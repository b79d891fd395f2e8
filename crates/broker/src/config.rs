use std::str::FromStr;
use std::time::Duration;

/// Default number of concurrent backend calls.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default upper bound on a single backend call.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

/// Default fallback wake interval for the dispatcher.
pub const DEFAULT_DISPATCH_IDLE_MS: u64 = 500;

/// Default retention for terminal results nobody polled.
pub const DEFAULT_RESULT_TTL_SECS: u64 = 3600;

/// Default cadence of the retention sweeper.
pub const DEFAULT_RESULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Broker tuning, fixed at process startup.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Size of the concurrency budget `C`. Always at least 1.
    pub concurrency: usize,
    /// Upper bound on one backend call. Distinct from how long a slot is
    /// held, which also covers recording the result.
    pub backend_timeout: Duration,
    /// How long the dispatcher sleeps when nobody wakes it.
    pub dispatch_idle: Duration,
    /// How long an unpolled terminal result is kept.
    pub result_ttl: Duration,
    /// How often expired results are swept.
    pub sweep_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            dispatch_idle: Duration::from_millis(DEFAULT_DISPATCH_IDLE_MS),
            result_ttl: Duration::from_secs(DEFAULT_RESULT_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_RESULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl BrokerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `BROKER_CONCURRENCY`         | `3`     |
    /// | `BACKEND_TIMEOUT_SECS`       | `120`   |
    /// | `DISPATCH_IDLE_MS`           | `500`   |
    /// | `RESULT_TTL_SECS`            | `3600`  |
    /// | `RESULT_SWEEP_INTERVAL_SECS` | `60`    |
    ///
    /// Panics on unparseable values or a zero concurrency budget.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Split out from
    /// [`BrokerConfig::from_env`] so parsing can be tested without touching
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let concurrency: usize = parse_or(&lookup, "BROKER_CONCURRENCY", DEFAULT_CONCURRENCY);
        assert!(concurrency >= 1, "BROKER_CONCURRENCY must be at least 1");

        let backend_timeout_secs: u64 =
            parse_or(&lookup, "BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS);
        assert!(
            backend_timeout_secs >= 1,
            "BACKEND_TIMEOUT_SECS must be at least 1"
        );

        let dispatch_idle_ms: u64 =
            parse_or(&lookup, "DISPATCH_IDLE_MS", DEFAULT_DISPATCH_IDLE_MS).max(1);
        let result_ttl_secs: u64 = parse_or(&lookup, "RESULT_TTL_SECS", DEFAULT_RESULT_TTL_SECS);
        let sweep_interval_secs: u64 = parse_or(
            &lookup,
            "RESULT_SWEEP_INTERVAL_SECS",
            DEFAULT_RESULT_SWEEP_INTERVAL_SECS,
        )
        .max(1);

        Self {
            concurrency,
            backend_timeout: Duration::from_secs(backend_timeout_secs),
            dispatch_idle: Duration::from_millis(dispatch_idle_ms),
            result_ttl: Duration::from_secs(result_ttl_secs),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        None => default,
    }
}
