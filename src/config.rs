use crate::blueriiot::{DEFAULT_API_BASE, DEFAULT_API_REGION};
use crate::evaluator::{Account, Identifiers};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/blueconnect/config.json";
const DEFAULT_HTTP_BIND: &str = "127.0.0.1:9120";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Options an operator can keep in the setup config file. Field names match
/// the ones the discovery hints print.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub swimmingpoolid: Option<String>,
    #[serde(default)]
    pub bluedeviceserial: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
}

fn setup_config_path(explicit: Option<&Path>, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = non_empty(lookup("BLUECONNECT_SETUP_CONFIG_PATH")) {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_SETUP_CONFIG_PATH)
}

fn load_setup_config(path: &Path) -> Option<SetupConfig> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "blueconnect-sidecar failed to read setup config; using env only"
            );
            return None;
        }
    };
    let mut bytes = contents.into_bytes();
    match simd_json::serde::from_slice(&mut bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "blueconnect-sidecar failed to parse setup config; using env only"
            );
            None
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    pub swimming_pool_id: Option<String>,
    pub device_serial: Option<String>,
    pub debug: bool,
    pub api_base: Url,
    pub api_region: String,
    pub http_bind: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub otlp_endpoint: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("swimming_pool_id", &self.swimming_pool_id)
            .field("device_serial", &self.device_serial)
            .field("debug", &self.debug)
            .field("api_base", &self.api_base.as_str())
            .field("api_region", &self.api_region)
            .field("http_bind", &self.http_bind)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .finish()
    }
}

impl Config {
    pub fn from_env(setup_path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let lookup = |key: &str| env::var(key).ok();
        let path = setup_config_path(setup_path, &lookup);
        let setup = load_setup_config(&path);
        Self::from_sources(lookup, setup.as_ref())
    }

    /// Env values win over the setup config when set and non-empty.
    pub fn from_sources(
        lookup: impl Fn(&str) -> Option<String>,
        setup: Option<&SetupConfig>,
    ) -> Result<Self> {
        let from_env_or_setup = |key: &str, setup_value: Option<&String>| {
            non_empty(lookup(key)).or_else(|| non_empty(setup_value.cloned()))
        };

        let email = from_env_or_setup("BLUECONNECT_EMAIL", setup.and_then(|s| s.email.as_ref()))
            .context("BLUECONNECT_EMAIL is required (or present as email in the setup config)")?;
        let password = from_env_or_setup(
            "BLUECONNECT_PASSWORD",
            setup.and_then(|s| s.password.as_ref()),
        )
        .context("BLUECONNECT_PASSWORD is required (or present as password in the setup config)")?;
        let swimming_pool_id = from_env_or_setup(
            "BLUECONNECT_SWIMMING_POOL_ID",
            setup.and_then(|s| s.swimmingpoolid.as_ref()),
        );
        let device_serial = from_env_or_setup(
            "BLUECONNECT_DEVICE_SERIAL",
            setup.and_then(|s| s.bluedeviceserial.as_ref()),
        );

        let debug = match non_empty(lookup("BLUECONNECT_DEBUG")) {
            Some(value) => value == "1" || value.eq_ignore_ascii_case("true"),
            None => setup.and_then(|s| s.debug).unwrap_or(false),
        };

        let api_base = non_empty(lookup("BLUECONNECT_API_BASE"))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&api_base)
            .with_context(|| format!("invalid BLUECONNECT_API_BASE {api_base}"))?;
        let api_region = non_empty(lookup("BLUECONNECT_API_REGION"))
            .unwrap_or_else(|| DEFAULT_API_REGION.to_string());

        let http_bind = non_empty(lookup("BLUECONNECT_HTTP_BIND"))
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());
        let poll_interval_secs = parse_u64(&lookup, "BLUECONNECT_POLL_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let request_timeout_secs = parse_u64(&lookup, "BLUECONNECT_REQUEST_TIMEOUT_SECS")?
            .filter(|value| *value != 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let otlp_endpoint = non_empty(lookup("OTEL_EXPORTER_OTLP_ENDPOINT"));

        Ok(Self {
            email,
            password,
            swimming_pool_id,
            device_serial,
            debug,
            api_base,
            api_region,
            http_bind,
            poll_interval_secs,
            request_timeout_secs,
            otlp_endpoint,
        })
    }

    pub fn account(&self) -> Account {
        Account {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    pub fn identifiers(&self) -> Identifiers {
        Identifiers {
            pool_id: self.swimming_pool_id.clone(),
            device_serial: self.device_serial.clone(),
        }
    }

    /// `None` disables the background poller.
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_secs > 0).then(|| Duration::from_secs(self.poll_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    non_empty(lookup(key))
        .map(|value| {
            value
                .parse::<u64>()
                .with_context(|| format!("invalid {key}"))
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
