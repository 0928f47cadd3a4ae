//! Configuration management for Chainproof Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub rpc_url: String,
    pub contract_address: String,
    pub abi_path: PathBuf,
    pub request_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// Remote EVM node speaking JSON-RPC
    Evm,
    /// In-process ledger, for offline runs
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "evm" => Ok(LedgerBackend::Evm),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(format!("expected \"evm\" or \"memory\", got \"{}\"", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub orphan_policy: OrphanPolicy,
}

/// What happens to a stored file whose ledger append failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Keep the file on disk without a ledger record
    Retain,
    /// Delete the file again
    Remove,
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(OrphanPolicy::Retain),
            "remove" => Ok(OrphanPolicy::Remove),
            other => Err(format!("expected \"retain\" or \"remove\", got \"{}\"", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            ledger: LedgerConfig {
                backend: LedgerBackend::Evm,
                // Ganache default
                rpc_url: "http://127.0.0.1:7545".to_string(),
                contract_address: "0x5615a35d488f9599592117e60399fe0485263314".to_string(),
                abi_path: PathBuf::from("abi.json"),
                request_timeout_secs: 30,
                confirmation_timeout_secs: 120,
                poll_interval_ms: 500,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                max_upload_bytes: 50 * 1024 * 1024,
                orphan_policy: OrphanPolicy::Retain,
            },
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables.
    ///
    /// Unset variables fall back to [`Config::default`]; set but unparseable
    /// variables are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "SERVER_PORT", defaults.server.port)?,
            },
            ledger: LedgerConfig {
                backend: parse_or(&lookup, "LEDGER_BACKEND", defaults.ledger.backend)?,
                rpc_url: lookup("LEDGER_RPC_URL").unwrap_or(defaults.ledger.rpc_url),
                contract_address: lookup("CONTRACT_ADDRESS")
                    .unwrap_or(defaults.ledger.contract_address),
                abi_path: lookup("CONTRACT_ABI_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.ledger.abi_path),
                request_timeout_secs: parse_positive_or(
                    &lookup,
                    "LEDGER_REQUEST_TIMEOUT_SECS",
                    defaults.ledger.request_timeout_secs,
                )?,
                confirmation_timeout_secs: parse_positive_or(
                    &lookup,
                    "LEDGER_CONFIRMATION_TIMEOUT_SECS",
                    defaults.ledger.confirmation_timeout_secs,
                )?,
                poll_interval_ms: parse_positive_or(
                    &lookup,
                    "LEDGER_POLL_INTERVAL_MS",
                    defaults.ledger.poll_interval_ms,
                )?,
            },
            storage: StorageConfig {
                upload_dir: lookup("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                max_upload_bytes: parse_positive_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.storage.max_upload_bytes,
                )?,
                orphan_policy: parse_or(
                    &lookup,
                    "ORPHAN_POLICY",
                    defaults.storage.orphan_policy,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::InvalidValue {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

/// Like [`parse_or`], but zero is rejected
fn parse_positive_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key,
            value: lookup(key).unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.ledger.backend, LedgerBackend::Evm);
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:7545");
        assert_eq!(config.storage.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.storage.orphan_policy, OrphanPolicy::Retain);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "8080"),
            ("LEDGER_BACKEND", "memory"),
            ("UPLOAD_DIR", "/var/lib/chainproof"),
            ("ORPHAN_POLICY", "Remove"),
            ("LEDGER_POLL_INTERVAL_MS", "50"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ledger.backend, LedgerBackend::Memory);
        assert_eq!(config.storage.upload_dir, PathBuf::from("/var/lib/chainproof"));
        assert_eq!(config.storage.orphan_policy, OrphanPolicy::Remove);
        assert_eq!(config.ledger.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("MAX_UPLOAD_BYTES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_BYTES"));

        let err = Config::from_lookup(lookup_from(&[("ORPHAN_POLICY", "shred")])).unwrap_err();
        assert!(err.to_string().contains("ORPHAN_POLICY"));
    }

    #[test]
    fn test_zero_durations_and_limits_rejected() {
        for key in [
            "LEDGER_REQUEST_TIMEOUT_SECS",
            "LEDGER_CONFIRMATION_TIMEOUT_SECS",
            "LEDGER_POLL_INTERVAL_MS",
            "MAX_UPLOAD_BYTES",
        ] {
            let err = Config::from_lookup(lookup_from(&[(key, "0")])).unwrap_err();
            match err {
                ConfigError::InvalidValue { key: reported, .. } => assert_eq!(reported, key),
            }
        }

        let config = Config::from_lookup(lookup_from(&[("LEDGER_POLL_INTERVAL_MS", "1")])).unwrap();
        assert_eq!(config.ledger.poll_interval(), Duration::from_millis(1));
    }
}
