//! Dashboard server configuration derived from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::poller::DEFAULT_POLL_INTERVAL_MS;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_BACKEND_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_DATA_PATH: &str = "/api/data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub bind_addr: SocketAddr,
    /// Base URL of the signal backend, without trailing slash.
    pub backend_api_url: String,
    pub data_path: String,
    pub poll_interval_ms: u64,
    /// Read but not enforced.
    pub dashboard_password: Option<String>,
    /// Read but not enforced.
    pub allowed_ips: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {message}")]
    InvalidBindAddr { value: String, message: String },
    #[error("invalid poll interval {0:?}: expected a positive number of milliseconds")]
    InvalidPollInterval(String),
    #[error("invalid backend URL {0:?}: expected an http:// or https:// URL")]
    InvalidBackendUrl(String),
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend_api_url: DEFAULT_BACKEND_API_URL.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dashboard_password: None,
            allowed_ips: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_raw = env_str("SIGDASH_DASHBOARD_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidBindAddr {
                value: bind_raw.clone(),
                message: err.to_string(),
            })?;

        let backend_api_url = normalize_base_url(&env_str(
            "BACKEND_API_URL",
            DEFAULT_BACKEND_API_URL,
        ))?;

        let poll_interval_ms = match env_opt("SIGDASH_POLL_INTERVAL_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => return Err(ConfigError::InvalidPollInterval(raw)),
            },
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            bind_addr,
            backend_api_url,
            data_path: normalize_path(&env_str("SIGDASH_DATA_PATH", DEFAULT_DATA_PATH)),
            poll_interval_ms,
            dashboard_password: env_opt("DASHBOARD_PASSWORD"),
            allowed_ips: env_opt("ALLOWED_IPS")
                .map(|raw| parse_ip_list(&raw))
                .unwrap_or_default(),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// URL the poller fetches the market snapshot from.
    pub fn data_url(&self) -> String {
        format!("{}{}", self.backend_api_url, self.data_path)
    }

    pub fn has_unenforced_access_settings(&self) -> bool {
        self.dashboard_password.is_some() || !self.allowed_ips.is_empty()
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_str(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBackendUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}

fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::BackendProxy;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 6] = [
        "SIGDASH_DASHBOARD_ADDR",
        "BACKEND_API_URL",
        "SIGDASH_DATA_PATH",
        "SIGDASH_POLL_INTERVAL_MS",
        "DASHBOARD_PASSWORD",
        "ALLOWED_IPS",
    ];

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn with_env_vars<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _guard = env_lock().lock().expect("env lock should not be poisoned");
        let previous: Vec<(&str, Option<String>)> =
            VARS.iter().map(|key| (*key, env::var(key).ok())).collect();

        for key in VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        let output = f();

        for (key, value) in previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }

        output
    }

    #[test]
    fn defaults_when_env_missing() {
        let cfg = with_env_vars(&[], DashboardConfig::from_env).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.data_url(), "http://localhost:5000/api/data");
        assert!(!cfg.has_unenforced_access_settings());
    }

    #[test]
    fn reads_backend_and_access_settings() {
        let cfg = with_env_vars(
            &[
                ("BACKEND_API_URL", "https://signals.example.com/"),
                ("SIGDASH_DATA_PATH", "api/signals"),
                ("SIGDASH_POLL_INTERVAL_MS", "5000"),
                ("DASHBOARD_PASSWORD", "hunter2"),
                ("ALLOWED_IPS", "10.0.0.1, 10.0.0.2,,"),
            ],
            DashboardConfig::from_env,
        )
        .unwrap();

        assert_eq!(cfg.data_url(), "https://signals.example.com/api/signals");
        let proxy = BackendProxy::new(reqwest::Client::new(), cfg.backend_api_url.clone());
        assert_eq!(
            proxy.target_url("market/BTC", None),
            "https://signals.example.com/api/market/BTC"
        );
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.allowed_ips, vec!["10.0.0.1", "10.0.0.2"]);
        assert!(cfg.has_unenforced_access_settings());
    }

    #[test]
    fn rejects_zero_interval_and_bad_urls() {
        let err = with_env_vars(
            &[("SIGDASH_POLL_INTERVAL_MS", "0")],
            DashboardConfig::from_env,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPollInterval("0".to_string()));

        let err = with_env_vars(
            &[("BACKEND_API_URL", "localhost:5000")],
            DashboardConfig::from_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBackendUrl(_)));

        let err = with_env_vars(
            &[("SIGDASH_DASHBOARD_ADDR", "not-an-addr")],
            DashboardConfig::from_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }
}
