//! UI-Oberfläche des Clients
//!
//! Vier Elemente: Statuszeile, Log-Liste, Call-Button, Hangup-Button.
//! `MemoryView` hält alles im Speicher, `ConsoleView` schreibt zusätzlich
//! ins Terminal.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

// ============================================================================
// BUTTON STATE
// ============================================================================

/// Aktivierungszustand der beiden Buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub call_enabled: bool,
    pub hangup_enabled: bool,
}

impl ButtonState {
    /// Kein Anruf aktiv
    pub const IDLE: Self = Self {
        call_enabled: true,
        hangup_enabled: false,
    };

    /// Anruf aktiv
    pub const IN_CALL: Self = Self {
        call_enabled: false,
        hangup_enabled: true,
    };
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::IDLE
    }
}

// ============================================================================
// LOG ENTRY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

// ============================================================================
// VIEW TRAIT
// ============================================================================

/// Schreibzugriff auf die UI-Elemente
pub trait CallView: Send + Sync {
    /// Ersetzt den Text der Statuszeile
    fn set_status(&self, text: &str);

    /// Fügt einen Eintrag oben in die Log-Liste ein
    fn prepend_log(&self, entry: &LogEntry);

    /// Setzt beide Buttons in einem Schritt
    fn set_buttons(&self, buttons: ButtonState);
}

// ============================================================================
// MEMORY VIEW
// ============================================================================

#[derive(Debug, Default)]
struct MemoryViewState {
    status: String,
    log: VecDeque<LogEntry>,
    buttons: ButtonState,
    button_history: Vec<ButtonState>,
}

/// In-Memory Implementierung, abfragbar für Tests und die Konsole
#[derive(Debug, Default)]
pub struct MemoryView {
    state: Mutex<MemoryViewState>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aktueller Text der Statuszeile
    pub fn status(&self) -> String {
        self.state.lock().status.clone()
    }

    /// Alle Log-Einträge, neueste zuerst
    pub fn entries(&self) -> Vec<LogEntry> {
        self.state.lock().log.iter().cloned().collect()
    }

    /// Alle Log-Nachrichten, neueste zuerst
    pub fn log_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn buttons(&self) -> ButtonState {
        self.state.lock().buttons
    }

    /// Jede `set_buttons` Änderung in Reihenfolge
    pub fn button_history(&self) -> Vec<ButtonState> {
        self.state.lock().button_history.clone()
    }
}

impl CallView for MemoryView {
    fn set_status(&self, text: &str) {
        self.state.lock().status = text.to_string();
    }

    fn prepend_log(&self, entry: &LogEntry) {
        self.state.lock().log.push_front(entry.clone());
    }

    fn set_buttons(&self, buttons: ButtonState) {
        let mut state = self.state.lock();
        state.buttons = buttons;
        state.button_history.push(buttons);
    }
}

// ============================================================================
// CONSOLE VIEW
// ============================================================================

/// Terminal-Ausgabe auf stdout
#[derive(Debug, Default)]
pub struct ConsoleView {
    inner: MemoryView,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> ButtonState {
        self.inner.buttons()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.inner.log_lines()
    }

    /// Gibt die komplette Log-Liste aus (neueste oben)
    pub fn print_log(&self) {
        let mut out = std::io::stdout().lock();
        for entry in self.inner.entries() {
            let written = write_line(
                &mut out,
                format_args!(
                    "  {} {}",
                    entry.timestamp.format("%H:%M:%S%.3f"),
                    entry.message
                ),
            );
            if !written {
                break;
            }
        }
    }
}

/// Schreibt eine Zeile; Fehler (z.B. geschlossene Pipe) landen im Debug-Log
fn write_line(out: &mut impl Write, line: fmt::Arguments<'_>) -> bool {
    match writeln!(out, "{line}") {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Failed to write to console: {}", e);
            false
        }
    }
}

impl CallView for ConsoleView {
    fn set_status(&self, text: &str) {
        self.inner.set_status(text);
        write_line(&mut std::io::stdout().lock(), format_args!("> {text}"));
    }

    fn prepend_log(&self, entry: &LogEntry) {
        self.inner.prepend_log(entry);
    }

    fn set_buttons(&self, buttons: ButtonState) {
        self.inner.set_buttons(buttons);
        let label = |enabled: bool| if enabled { "on" } else { "off" };
        write_line(
            &mut std::io::stdout().lock(),
            format_args!(
                "[call: {} | hangup: {}]",
                label(buttons.call_enabled),
                label(buttons.hangup_enabled)
            ),
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
