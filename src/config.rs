//! Configuration from the environment

use crate::state_machine::Destination;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DESTINATIONS: &str = "procurement=Procurement|http://127.0.0.1:9000/requests";
const DEFAULT_BLOB_BASE_URL: &str = "http://127.0.0.1:9000/files";
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: '{value}' is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("SUPPLY_DESK_DESTINATIONS: entry '{0}' must look like id=Label|url")]
    Destination(String),
    #[error("SUPPLY_DESK_DESTINATIONS: destination id '{0}' appears more than once")]
    DuplicateDestination(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Offered at the final step, in this order
    pub destinations: Arc<[Destination]>,
    pub blob_base_url: String,
    pub notify_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("SUPPLY_DESK_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "SUPPLY_DESK_PORT",
                value: raw,
                expected: "port number",
            })?,
            None => DEFAULT_PORT,
        };

        let destinations = parse_destinations(
            &lookup("SUPPLY_DESK_DESTINATIONS").unwrap_or_else(|| DEFAULT_DESTINATIONS.to_string()),
        )?;

        let blob_base_url = lookup("SUPPLY_DESK_BLOB_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BLOB_BASE_URL.to_string());
        if !is_http_url(&blob_base_url) {
            return Err(ConfigError::Invalid {
                var: "SUPPLY_DESK_BLOB_BASE_URL",
                value: blob_base_url,
                expected: "http(s) URL",
            });
        }

        let notify_timeout = match lookup("SUPPLY_DESK_NOTIFY_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SUPPLY_DESK_NOTIFY_TIMEOUT_SECS",
                        value: raw,
                        expected: "positive number of seconds",
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
        };

        Ok(Self {
            port,
            destinations,
            blob_base_url,
            notify_timeout,
        })
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Parse `id=Label|url;id=Label|url`. An empty list is allowed; the dialogue
/// then tells the user there is nowhere to send to.
fn parse_destinations(raw: &str) -> Result<Arc<[Destination]>, ConfigError> {
    let mut destinations: Vec<Destination> = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let bad = || ConfigError::Destination(entry.to_string());
        let (id, rest) = entry.split_once('=').ok_or_else(bad)?;
        let (label, url) = rest.split_once('|').ok_or_else(bad)?;
        let (id, label, url) = (id.trim(), label.trim(), url.trim());
        if id.is_empty() || label.is_empty() || !is_http_url(url) {
            return Err(bad());
        }
        if destinations.iter().any(|d| d.id == id) {
            return Err(ConfigError::DuplicateDestination(id.to_string()));
        }
        destinations.push(Destination {
            id: id.to_string(),
            label: label.to_string(),
            webhook_url: url.to_string(),
        });
    }
    Ok(destinations.into())
}
