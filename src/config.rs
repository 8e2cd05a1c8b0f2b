// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup by
//! [`AppConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATA_DIR` | Directory for the metadata database | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `RPC_URL` | EVM JSON-RPC endpoint; unset selects the in-memory ledger | unset |
//! | `CHAIN_ID` | Expected chain id | `31337` |
//! | `FILE_MANAGER_ADDRESS` | `FileManager` contract | Required with `RPC_URL` |
//! | `USER_MANAGER_ADDRESS` | `UserManager` contract | Required with `RPC_URL` |
//! | `RELAY_PRIVATE_KEYS` | Comma-separated relay signing keys | Required with `RPC_URL` |
//! | `TX_CONFIRM_TIMEOUT_SECS` | Max wait for a receipt | `60` |
//! | `PINATA_API_KEY` / `PINATA_SECRET_KEY` | Pinning credentials; unset selects the in-memory store | unset |
//! | `PINATA_API_URL` | Pinning API base | `https://api.pinata.cloud` |
//! | `IPFS_GATEWAY_URL` | Gateway base for fetches | `https://gateway.pinata.cloud` |
//! | `IPFS_FETCH_ATTEMPTS` | Attempts per fetch | `3` |
//! | `IPFS_RETRY_DELAY_MS` | Delay between rate-limited attempts | `1000` |
//! | `JWT_SECRET` | HMAC secret for session tokens | Required |
//! | `JWT_TTL_SECS` | Session lifetime | `3600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::session::DEFAULT_SESSION_TTL_SECS;
use crate::content::pinata::{DEFAULT_API_URL, DEFAULT_GATEWAY_URL};
use crate::content::{PinataConfig, RetryPolicy};
use crate::ledger::EvmLedgerConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const FILE_MANAGER_ENV: &str = "FILE_MANAGER_ADDRESS";
pub const USER_MANAGER_ENV: &str = "USER_MANAGER_ADDRESS";
pub const RELAY_KEYS_ENV: &str = "RELAY_PRIVATE_KEYS";
pub const TX_TIMEOUT_ENV: &str = "TX_CONFIRM_TIMEOUT_SECS";
pub const PINATA_API_KEY_ENV: &str = "PINATA_API_KEY";
pub const PINATA_SECRET_KEY_ENV: &str = "PINATA_SECRET_KEY";
pub const PINATA_API_URL_ENV: &str = "PINATA_API_URL";
pub const IPFS_GATEWAY_ENV: &str = "IPFS_GATEWAY_URL";
pub const IPFS_ATTEMPTS_ENV: &str = "IPFS_FETCH_ATTEMPTS";
pub const IPFS_DELAY_ENV: &str = "IPFS_RETRY_DELAY_MS";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL_SECS";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CHAIN_ID: u64 = 31337;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },

    #[error("{var} has an invalid value: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub chain_id: u64,
    /// `None` selects the in-memory ledger.
    pub ledger: Option<EvmLedgerConfig>,
    /// `None` selects the in-memory content store.
    pub pinata: Option<PinataConfig>,
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    var: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        let chain_id = parse_or(get(CHAIN_ID_ENV), CHAIN_ID_ENV, DEFAULT_CHAIN_ID)?;
        let confirm_timeout =
            Duration::from_secs(parse_or(get(TX_TIMEOUT_ENV), TX_TIMEOUT_ENV, 60u64)?);

        let ledger = match get(RPC_URL_ENV) {
            Some(rpc_url) => {
                let signer_keys: Vec<String> = required(get(RELAY_KEYS_ENV), RELAY_KEYS_ENV)?
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                if signer_keys.is_empty() {
                    return Err(ConfigError::Missing {
                        var: RELAY_KEYS_ENV,
                    });
                }
                Some(EvmLedgerConfig {
                    rpc_url,
                    chain_id,
                    file_manager: required(get(FILE_MANAGER_ENV), FILE_MANAGER_ENV)?,
                    user_manager: required(get(USER_MANAGER_ENV), USER_MANAGER_ENV)?,
                    signer_keys,
                    confirm_timeout,
                })
            }
            None => None,
        };

        let pinata = match (get(PINATA_API_KEY_ENV), get(PINATA_SECRET_KEY_ENV)) {
            (Some(api_key), Some(secret_key)) => {
                let attempts = parse_or(get(IPFS_ATTEMPTS_ENV), IPFS_ATTEMPTS_ENV, 3u32)?;
                let delay_ms = parse_or(get(IPFS_DELAY_ENV), IPFS_DELAY_ENV, 1000u64)?;
                Some(PinataConfig {
                    api_url: get(PINATA_API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                    gateway_url: get(IPFS_GATEWAY_ENV)
                        .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
                    api_key,
                    secret_key,
                    retry: RetryPolicy::new(attempts, Duration::from_millis(delay_ms)),
                })
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    var: PINATA_SECRET_KEY_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Missing {
                    var: PINATA_API_KEY_ENV,
                })
            }
        };

        let tls = match (get(TLS_CERT_ENV), get(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing { var: TLS_KEY_ENV }),
            (None, Some(_)) => return Err(ConfigError::Missing { var: TLS_CERT_ENV }),
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string())),
            log_format,
            chain_id,
            ledger,
            pinata,
            jwt_secret: required(get(JWT_SECRET_ENV), JWT_SECRET_ENV)?,
            jwt_ttl_secs: parse_or(get(JWT_TTL_ENV), JWT_TTL_ENV, DEFAULT_SESSION_TTL_SECS)?,
            tls,
        })
    }
}

fn required(value: Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::Missing { var })
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
