//! Media Module - Mikrofon-Zugriff
//!
//! Vor dem ersten Token-Abruf muss der Zugriff auf ein Audio-Eingabegerät
//! gewährt sein.

mod microphone;

#[cfg(feature = "native-audio")]
pub use microphone::CpalMicrophone;
pub use microphone::{AssumeGranted, MediaAccess, MediaError};
