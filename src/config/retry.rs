//! Reconnect policy shared by the bus and store connections

use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::error::ValidationError;

/// How often to retry a lost infrastructure connection before giving up.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Consecutive failed attempts tolerated before the component exits
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryConfig {
    /// Get delay as Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRetryPolicy);
        }
        Ok(())
    }

    /// Run `attempt` until it succeeds or `max_attempts` is used up.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn retry<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if attempts >= self.max_attempts => {
                    tracing::error!(operation, attempts, error = %e, "Giving up");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(operation, attempts, error = %e, "Attempt failed, retrying");
                    tokio::time::sleep(self.delay()).await;
                }
            }
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_attempts_is_invalid() {
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetryPolicy));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let config = RetryConfig {
            max_attempts: 3,
            delay_ms: 1,
        };
        let mut calls = 0;

        let result: Result<u32, String> = config
            .retry("connect", || {
                calls += 1;
                let outcome = if calls < 3 { Err("refused".to_string()) } else { Ok(calls) };
                async move { outcome }
            })
            .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let config = RetryConfig {
            max_attempts: 2,
            delay_ms: 1,
        };
        let mut calls = 0;

        let result: Result<(), String> = config
            .retry("connect", || {
                calls += 1;
                let outcome = Err(format!("refused #{}", calls));
                async move { outcome }
            })
            .await;

        assert_eq!(result, Err("refused #2".to_string()));
    }
}
