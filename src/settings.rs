//! # Runtime Settings Module
//!
//! Non-secret process settings: how updates are received, how confident a
//! Vision label must be, and how external calls are retried.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use reqwest::Url;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::config_errors::ConfigError;

pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;
pub const DEFAULT_LABEL_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const MAX_IMAGE_BYTES: usize = 7 * 1024 * 1024; // Vision caps JSON requests at 10MB, base64 adds a third
pub const WEBHOOK_PATH: &str = "webhook";

/// Recovery configuration for external API calls
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single attempt in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            operation_timeout_secs: 15,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// How the bot receives updates from Telegram
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    /// Long polling, for local runs
    Polling,
    /// Telegram pushes updates to `url`; the server binds `listen`
    Webhook {
        listen: SocketAddr,
        url: Url,
        secret_token: Option<String>,
    },
}

/// Settings read from the environment at startup
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub config_path: PathBuf,
    pub run_mode: RunMode,
    pub label_confidence_threshold: f32,
    pub max_image_bytes: usize,
    pub json_logs: bool,
    pub recovery: RecoveryConfig,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            run_mode: RunMode::Polling,
            label_confidence_threshold: DEFAULT_LABEL_CONFIDENCE_THRESHOLD,
            max_image_bytes: MAX_IMAGE_BYTES,
            json_logs: false,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl BotSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Self::default();

        if let Some(path) = var("MACROCALBOT_CONFIG") {
            settings.config_path = PathBuf::from(path);
        }

        if let Some(app_url) = var("APP_URL") {
            let port = match var("PORT") {
                Some(port) => port.parse::<u16>().map_err(|_| invalid("PORT", &port))?,
                None => DEFAULT_WEBHOOK_PORT,
            };
            settings.run_mode = RunMode::Webhook {
                listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
                url: webhook_url(&app_url)?,
                secret_token: var("WEBHOOK_SECRET")
                    .map(|secret| validate_secret_token(&secret).map(|()| secret))
                    .transpose()?,
            };
        }

        if let Some(threshold) = var("LABEL_CONFIDENCE_THRESHOLD") {
            settings.label_confidence_threshold = threshold
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| invalid("LABEL_CONFIDENCE_THRESHOLD", &threshold))?;
        }

        settings.json_logs = var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(settings)
    }
}

/// `{APP_URL}/webhook`, tolerating a trailing slash on the base
fn webhook_url(app_url: &str) -> Result<Url, ConfigError> {
    let joined = format!("{}/{WEBHOOK_PATH}", app_url.trim_end_matches('/'));
    Url::parse(&joined).map_err(|_| invalid("APP_URL", app_url))
}

/// Telegram accepts 1-256 characters of `A-Za-z0-9_-`
fn validate_secret_token(secret: &str) -> Result<(), ConfigError> {
    let valid = secret.len() <= 256
        && secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(invalid("WEBHOOK_SECRET", "<redacted>"))
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<BotSettings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_use_polling() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.run_mode, RunMode::Polling);
        assert_eq!(settings.config_path, PathBuf::from("config.json"));
        assert_eq!(settings.label_confidence_threshold, 0.5);
        assert!(!settings.json_logs);
    }

    #[test]
    fn test_recovery_config_defaults() {
        let recovery = RecoveryConfig::default();

        assert_eq!(recovery.max_retries, 3);
        assert_eq!(recovery.base_retry_delay_ms, 500);
        assert_eq!(recovery.max_retry_delay_ms, 5000);
        assert_eq!(recovery.operation_timeout_secs, 15);
        assert_eq!(recovery.circuit_breaker_threshold, 5);
        assert_eq!(recovery.circuit_breaker_reset_secs, 60);
    }

    #[test]
    fn test_app_url_enables_webhook() {
        let settings = settings_from(&[
            ("APP_URL", "https://macrocal.onrender.com/"),
            ("PORT", "10000"),
            ("WEBHOOK_SECRET", "s3cret"),
        ])
        .unwrap();

        match settings.run_mode {
            RunMode::Webhook {
                listen,
                url,
                secret_token,
            } => {
                assert_eq!(listen.port(), 10000);
                assert!(listen.ip().is_unspecified());
                assert_eq!(url.as_str(), "https://macrocal.onrender.com/webhook");
                assert_eq!(secret_token.as_deref(), Some("s3cret"));
            }
            other => panic!("expected webhook mode, got {other:?}"),
        }
    }

    #[test]
    fn test_webhook_port_defaults() {
        let settings = settings_from(&[("APP_URL", "https://example.org")]).unwrap();
        match settings.run_mode {
            RunMode::Webhook {
                listen,
                secret_token,
                ..
            } => {
                assert_eq!(listen.port(), DEFAULT_WEBHOOK_PORT);
                assert!(secret_token.is_none());
            }
            other => panic!("expected webhook mode, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = settings_from(&[("APP_URL", "https://example.org"), ("PORT", "http")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref name, .. } if name == "PORT"));
    }

    #[test]
    fn test_invalid_app_url_rejected() {
        let err = settings_from(&[("APP_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref name, .. } if name == "APP_URL"));
    }

    #[test]
    fn test_webhook_secret_charset() {
        let err = settings_from(&[
            ("APP_URL", "https://example.org"),
            ("WEBHOOK_SECRET", "not allowed!"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSetting { ref name, .. } if name == "WEBHOOK_SECRET")
        );
    }

    #[test]
    fn test_threshold_must_be_a_probability() {
        assert!(settings_from(&[("LABEL_CONFIDENCE_THRESHOLD", "1.5")]).is_err());
        assert!(settings_from(&[("LABEL_CONFIDENCE_THRESHOLD", "abc")]).is_err());

        let settings = settings_from(&[("LABEL_CONFIDENCE_THRESHOLD", "0.7")]).unwrap();
        assert_eq!(settings.label_confidence_threshold, 0.7);
    }

    #[test]
    fn test_json_log_format() {
        assert!(settings_from(&[("LOG_FORMAT", "JSON")]).unwrap().json_logs);
        assert!(!settings_from(&[("LOG_FORMAT", "pretty")]).unwrap().json_logs);
    }
}
