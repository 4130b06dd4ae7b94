use std::env;
use std::time::Duration;

/// Base URL used when `SHEETSYNC_API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// How failed query fetches are retried. Mutations are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Query cache behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long fetched data counts as fresh; zero means every mount refetches
    pub stale_time: Duration,
    /// Refetch observed queries when the window regains focus
    pub refetch_on_window_focus: bool,
    pub retry: RetryPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            refetch_on_window_focus: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the workbook/worksheet API
    pub api_url: String,
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = env::var("SHEETSYNC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let mut retry = RetryPolicy::default();
        if let Ok(value) = env::var("SHEETSYNC_QUERY_RETRY") {
            retry.max_retries = value.parse()?;
        }
        if let Ok(value) = env::var("SHEETSYNC_RETRY_DELAY_MS") {
            retry.base_delay = Duration::from_millis(value.parse()?);
        }

        let refetch_on_window_focus = match env::var("SHEETSYNC_REFETCH_ON_FOCUS") {
            Ok(value) => parse_flag(&value)?,
            Err(_) => false,
        };

        Ok(Self {
            api_url,
            query: QueryConfig {
                refetch_on_window_focus,
                retry,
                ..QueryConfig::default()
            },
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("invalid boolean flag '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.query.stale_time, Duration::ZERO);
        assert!(!config.query.refetch_on_window_focus);
        assert_eq!(config.query.retry.max_retries, 3);
    }

    #[test]
    fn test_retry_delay_backs_off_and_caps() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay(0), Duration::from_secs(1));
        assert_eq!(retry.delay(1), Duration::from_secs(2));
        assert_eq!(retry.delay(2), Duration::from_secs(4));
        assert_eq!(retry.delay(10), Duration::from_secs(30));
        assert_eq!(RetryPolicy::none().delay(3), Duration::ZERO);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("sometimes").is_err());
    }
}
