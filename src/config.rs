use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::application::{PaymentSettings, WizardSettings};

pub const DEFAULT_API_BASE_URL: &str = "https://cac-registration-backend.onrender.com/api/merchant/";

/// Top-level configuration for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub payment: PaymentSettings,
    pub poll_interval: Duration,
    pub telemetry: TelemetryConfig,
}

/// Where the registration backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Always ends in `/`.
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub state_dir: PathBuf,
}

/// Tracing controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Defaults to `bnreg.log` inside the state directory.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative whole number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a positive number of seconds")]
    ZeroDuration { var: &'static str },
    #[error("{var} is not a usable base URL '{value}': {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = normalize_base_url(
            "BNREG_API_BASE_URL",
            &var("BNREG_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        )?;
        let timeout = seconds("BNREG_HTTP_TIMEOUT_SECS", var("BNREG_HTTP_TIMEOUT_SECS"), 30)?;
        let poll_interval = seconds("BNREG_POLL_INTERVAL_SECS", var("BNREG_POLL_INTERVAL_SECS"), 5)?;

        let amount = match var("BNREG_PAYMENT_AMOUNT") {
            Some(value) => parse_number("BNREG_PAYMENT_AMOUNT", &value)?,
            None => PaymentSettings::default().amount,
        };
        let payment = PaymentSettings {
            amount,
            currency: var("BNREG_PAYMENT_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| "NGN".to_string()),
            wallet_id: var("BNREG_WALLET_ID").unwrap_or_default(),
        };

        Ok(Self {
            api: ApiConfig { base_url, timeout },
            storage: StorageConfig {
                state_dir: var("BNREG_STATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".bnreg")),
            },
            payment,
            poll_interval,
            telemetry: TelemetryConfig {
                log_level: var("BNREG_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_file: var("BNREG_LOG_FILE").map(PathBuf::from),
            },
        })
    }

    /// Replaces the API base URL, e.g. from a command-line flag.
    pub fn set_base_url(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.api.base_url = normalize_base_url("--api-base", raw)?;
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.telemetry
            .log_file
            .clone()
            .unwrap_or_else(|| self.storage.state_dir.join("bnreg.log"))
    }

    pub fn wizard_settings(&self) -> WizardSettings {
        WizardSettings {
            poll_interval: self.poll_interval,
            payment: self.payment.clone(),
        }
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

fn seconds(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let secs = match value {
        Some(value) => parse_number(var, &value)?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::ZeroDuration { var });
    }
    Ok(Duration::from_secs(secs))
}

fn normalize_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let invalid = |reason: String| ConfigError::InvalidUrl {
        var,
        value: raw.to_string(),
        reason,
    };
    let url = Url::parse(&with_slash).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url.to_string())
}
