//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::util::rate_limit::INPUT_RATE_LIMIT;

/// Default per-connection outbound queue capacity
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,
    /// Messages a connection may have queued before new ones are dropped
    pub outbound_buffer: usize,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let client_origins: Vec<String> = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            client_origins,

            outbound_buffer: parse_or(&lookup, "OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?,
            input_rate_limit: parse_or(&lookup, "INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_level: "info".to_string(),
            client_origins: Vec::new(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            input_rate_limit: INPUT_RATE_LIMIT,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Environment variable {0} must be a non-negative integer")]
    InvalidNumber(&'static str),
}
