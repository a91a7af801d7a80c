//! Transport configuration.

use std::env;
use std::time::Duration;

use telegram_client::TelegramConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Settings for the Telegram side of the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
}

impl BotConfig {
    /// Load from environment variables.
    ///
    /// Required: `TELEGRAM_TOKEN`.
    /// Optional: `TELEGRAM_API_URL`, `TELEGRAM_POLL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        let mut telegram = TelegramConfig::new(token.trim());
        if let Some(url) = lookup("TELEGRAM_API_URL") {
            telegram = telegram.with_api_url(url.trim_end_matches('/'));
        }
        if let Some(value) = lookup("TELEGRAM_POLL_TIMEOUT_SECS") {
            let secs = value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "TELEGRAM_POLL_TIMEOUT_SECS",
                expected: "a number of seconds",
                value: value.clone(),
            })?;
            telegram = telegram.with_poll_timeout(Duration::from_secs(secs));
        }

        Ok(Self { telegram })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_token_required() {
        assert!(matches!(
            BotConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("TELEGRAM_TOKEN"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("TELEGRAM_API_URL", "http://localhost:8081/"),
            ("TELEGRAM_POLL_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.telegram.token, "123:ABC");
        assert_eq!(config.telegram.api_url, "http://localhost:8081");
        assert_eq!(config.telegram.poll_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_timeout() {
        let result = BotConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("TELEGRAM_POLL_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
