//! Call Engine Module - Device- und Call-Lebenszyklus
//!
//! Dieses Modul verwaltet:
//! - Device-Initialisierung (Mikrofon → Token → Device)
//! - Ausgehende Anrufe und Auflegen
//! - Weiterleitung der SDK-Events an den Status Reporter
//! - Button-Zustand der Oberfläche

mod coordinator;

pub use coordinator::{
    CallCoordinator, CallError, CallState, Collaborators, CoordinatorOptions, InitError,
};
