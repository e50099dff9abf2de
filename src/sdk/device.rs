//! Device und Call Handles
//!
//! Events werden wie in der CallEngine über `broadcast` Kanäle verteilt.
//! Wer abonniert, bekommt nur Events ab dem Zeitpunkt von `subscribe()`.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Fehler aus dem SDK (Code + Nachricht)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SdkError {
    pub code: u32,
    pub message: String,
}

impl SdkError {
    /// Token ungültig oder fehlt
    pub const INVALID_TOKEN: u32 = 20101;
    /// Allgemeiner Fehler
    pub const GENERAL: u32 = 31000;
    /// Verbindungsaufbau abgelehnt
    pub const CONNECTION: u32 = 31005;

    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Events eines Devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Registered,
    Registering,
    Error(SdkError),
    Connect,
    Disconnect,
}

/// Events eines Calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    Error(SdkError),
    Accept,
    Disconnect,
}

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceOptions {
    pub debug: bool,
}

/// Parameter für `connect`, z.B. `To`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectParams {
    pub params: BTreeMap<String, String>,
}

impl ConnectParams {
    /// Anruf an ein festes Ziel
    pub fn to(destination: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert("To".to_string(), destination.into());
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Baut Devices aus einem Token
pub trait DeviceFactory: Send + Sync {
    fn create(
        &self,
        token: &str,
        options: DeviceOptions,
    ) -> Result<Arc<dyn VoiceDevice>, SdkError>;
}

/// Registrierter Telefonie-Client
#[async_trait]
pub trait VoiceDevice: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent>;

    /// Baut einen ausgehenden Anruf auf
    async fn connect(&self, params: ConnectParams) -> Result<Arc<dyn VoiceCall>, SdkError>;

    /// Gibt das Device frei
    fn destroy(&self) {}
}

/// Ein laufender Anruf
pub trait VoiceCall: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<CallEvent>;

    /// Fordert das Beenden des Anrufs an
    fn disconnect(&self);
}
