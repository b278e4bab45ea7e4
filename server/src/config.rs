use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OUTBOUND_BUFFER: usize = 64;
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    /// Capacity of each connection's outbound queue. Events beyond it are dropped for that
    /// connection.
    pub outbound_buffer: usize,
    /// How often each connection is pinged.
    pub heartbeat_interval: Duration,
    /// A connection silent for longer than this is closed.
    pub client_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPort(String),
    InvalidOutboundBuffer(String),
    InvalidSeconds(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort(value) => write!(f, "PORT must be a port number, got {:?}", value),
            Self::InvalidOutboundBuffer(value) => write!(
                f,
                "OUTBOUND_BUFFER must be a positive integer, got {:?}",
                value
            ),
            Self::InvalidSeconds(key, value) => write!(
                f,
                "{} must be a positive number of seconds, got {:?}",
                key, value
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            port: DEFAULT_PORT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads `PORT`, `BIND_ADDRESS`, `OUTBOUND_BUFFER`, `HEARTBEAT_INTERVAL_SECS` and
    /// `CLIENT_TIMEOUT_SECS`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup("BIND_ADDRESS") {
            config.bind_address = address;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Some(buffer) = lookup("OUTBOUND_BUFFER") {
            config.outbound_buffer = match buffer.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidOutboundBuffer(buffer)),
            };
        }

        if let Some(interval) = lookup("HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat_interval = seconds("HEARTBEAT_INTERVAL_SECS", interval)?;
        }
        if let Some(timeout) = lookup("CLIENT_TIMEOUT_SECS") {
            config.client_timeout = seconds("CLIENT_TIMEOUT_SECS", timeout)?;
        }

        Ok(config)
    }
}

fn seconds(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn it_uses_defaults_when_unset() {
        assert_eq!(lookup_in(&[]), Ok(Config::default()));
        assert_eq!(Config::default().port, 3000);
        assert_eq!(Config::default().client_timeout, Duration::from_secs(10));
    }

    #[test]
    fn it_reads_heartbeat_timing() {
        let config = lookup_in(&[("HEARTBEAT_INTERVAL_SECS", "2"), ("CLIENT_TIMEOUT_SECS", "6")])
            .expect("");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(config.client_timeout, Duration::from_secs(6));
        assert_eq!(
            lookup_in(&[("CLIENT_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidSeconds("CLIENT_TIMEOUT_SECS", "0".into()))
        );
    }

    #[test]
    fn it_reads_port_from_environment() {
        let config = lookup_in(&[("PORT", "8080"), ("BIND_ADDRESS", "127.0.0.1")]).expect("");
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn it_rejects_garbage_values() {
        assert_eq!(
            lookup_in(&[("PORT", "http")]),
            Err(ConfigError::InvalidPort("http".into()))
        );
        assert_eq!(
            lookup_in(&[("PORT", "70000")]),
            Err(ConfigError::InvalidPort("70000".into()))
        );
        assert_eq!(
            lookup_in(&[("OUTBOUND_BUFFER", "0")]),
            Err(ConfigError::InvalidOutboundBuffer("0".into()))
        );
    }
}
