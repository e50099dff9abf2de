//! Client-Konfiguration
//!
//! Alle Werte kommen aus Umgebungsvariablen. Fehlende oder leere
//! Variablen fallen auf die Defaults zurück.

use thiserror::Error;
use url::Url;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Token-Endpoint des lokalen Backends
pub const DEFAULT_TOKEN_URL: &str = "http://localhost:8000/token";

/// Ziel für ausgehende Anrufe (`To` Parameter)
pub const DEFAULT_DESTINATION: &str = "agent";

/// Prefix für den Diagnose-Kanal
pub const DEFAULT_LOG_TAG: &str = "DealSmart";

pub const ENV_TOKEN_URL: &str = "DEALSMART_TOKEN_URL";
pub const ENV_IDENTITY: &str = "DEALSMART_IDENTITY";
pub const ENV_DESTINATION: &str = "DEALSMART_DESTINATION";
pub const ENV_DEBUG: &str = "DEALSMART_DEBUG";
pub const ENV_LOG_TAG: &str = "DEALSMART_LOG_TAG";

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid token URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid boolean for {key}: '{value}'")]
    InvalidBool { key: &'static str, value: String },
}

// ============================================================================
// CLIENT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint, der `{"token": "..."}` liefert
    pub token_url: Url,
    /// Optionale Identity, wird als `identity` Query-Parameter mitgeschickt
    pub identity: Option<String>,
    pub destination: String,
    /// Debug-Flag für das Device
    pub debug: bool,
    pub log_tag: String,
}

impl ClientConfig {
    /// Liest die Konfiguration aus der Prozess-Umgebung
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Liest die Konfiguration über eine beliebige Lookup-Funktion
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token_url =
            parse_token_url(get(ENV_TOKEN_URL).unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()))?;

        let debug = match get(ENV_DEBUG) {
            Some(value) => parse_bool(ENV_DEBUG, &value)?,
            None => true,
        };

        Ok(Self {
            token_url,
            identity: get(ENV_IDENTITY),
            destination: get(ENV_DESTINATION).unwrap_or_else(|| DEFAULT_DESTINATION.to_string()),
            debug,
            log_tag: get(ENV_LOG_TAG).unwrap_or_else(|| DEFAULT_LOG_TAG.to_string()),
        })
    }

    /// Konfiguration ohne Umgebungsvariablen
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_lookup(|_| None)
    }
}

fn parse_token_url(value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { value, source })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
