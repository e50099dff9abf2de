//! Status Module - Log-Ausgabe für den Benutzer
//!
//! Dieses Modul verwaltet:
//! - Statuszeile (letzte Meldung gewinnt)
//! - Log-Liste (neueste Meldung oben)
//! - Spiegelung in den Diagnose-Kanal (tracing)
//! - Abfangen von Panics als "Window error"

mod reporter;
mod view;

pub use reporter::{install_panic_hook, StatusReporter};
pub use view::{ButtonState, CallView, ConsoleView, LogEntry, MemoryView};
