//! Mikrofon-Freigabe
//!
//! Mit dem Feature `native-audio` wird das Standard-Eingabegerät über cpal
//! geprüft. Ohne das Feature gilt der Zugriff immer als gewährt.

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Audio device error: {0}")]
    Device(String),
}

// ============================================================================
// MEDIA ACCESS
// ============================================================================

/// Fordert Zugriff auf die Audio-Aufnahme an
#[async_trait]
pub trait MediaAccess: Send + Sync {
    async fn request_microphone(&self) -> Result<(), MediaError>;
}

/// Gewährt den Zugriff immer
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeGranted;

#[async_trait]
impl MediaAccess for AssumeGranted {
    async fn request_microphone(&self) -> Result<(), MediaError> {
        tracing::debug!("Microphone access assumed granted");
        Ok(())
    }
}

/// Prüft das Standard-Eingabegerät über cpal
#[cfg(feature = "native-audio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalMicrophone;

#[cfg(feature = "native-audio")]
#[async_trait]
impl MediaAccess for CpalMicrophone {
    async fn request_microphone(&self) -> Result<(), MediaError> {
        // cpal Devices sind nicht Send, daher komplett im Blocking-Thread
        tokio::task::spawn_blocking(|| {
            use cpal::traits::{DeviceTrait, HostTrait};

            let host = cpal::default_host();
            let device = host
                .default_input_device()
                .ok_or(MediaError::NoInputDevice)?;

            let config = device
                .default_input_config()
                .map_err(|e| MediaError::Device(e.to_string()))?;

            tracing::info!(
                "Microphone available: {} ({} Hz, {} channel(s))",
                device.name().unwrap_or_else(|_| "unknown".to_string()),
                config.sample_rate().0,
                config.channels()
            );
            Ok(())
        })
        .await
        .map_err(|e| MediaError::Device(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assume_granted() {
        assert_eq!(AssumeGranted.request_microphone().await, Ok(()));
    }
}
