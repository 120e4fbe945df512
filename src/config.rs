use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::api::DEFAULT_HISTORY_LIMIT;
use crate::rpc::transport::DEFAULT_TIMEOUT;

#[derive(Clone, Debug)]
pub struct Config {
    /// Default server address offered at login.
    pub server_url: Option<String>,
    /// Default database offered at login.
    pub database: Option<String>,
    pub request_timeout: Duration,

    pub session_dir: PathBuf,
    pub log_dir: PathBuf,

    pub history_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            database: None,
            request_timeout: DEFAULT_TIMEOUT,
            session_dir: PathBuf::from(".session"),
            log_dir: PathBuf::from("logs"),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            server_url: optional("ODOO_URL"),
            database: optional("ODOO_DB"),
            request_timeout: Duration::from_secs(parsed(
                "RPC_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            session_dir: optional("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            log_dir: optional("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            history_limit: parsed("HISTORY_LIMIT", defaults.history_limit)?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.history_limit, 50);
        assert!(config.server_url.is_none());
    }

    #[test]
    fn parsed_falls_back_and_rejects_garbage() {
        assert_eq!(parsed::<u32>("HRM_TEST_UNSET_KEY", 7).unwrap(), 7);

        // SAFETY: this key is only touched by this test.
        unsafe { env::set_var("HRM_TEST_BAD_NUMBER", "soon") };
        assert!(parsed::<u64>("HRM_TEST_BAD_NUMBER", 30).is_err());
        unsafe { env::set_var("HRM_TEST_BAD_NUMBER", " 12 ") };
        assert_eq!(parsed::<u64>("HRM_TEST_BAD_NUMBER", 30).unwrap(), 12);
    }
}
