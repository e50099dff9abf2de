//! Status Reporter
//!
//! Jede Meldung geht in dieser Reihenfolge an:
//! 1. die Statuszeile
//! 2. den Anfang der Log-Liste
//! 3. den Diagnose-Kanal (tracing) mit festem Prefix

use super::view::{CallView, LogEntry};
use std::sync::Arc;

/// Schreibt Meldungen in die UI und ins Tracing
pub struct StatusReporter {
    view: Arc<dyn CallView>,
    tag: String,
}

impl StatusReporter {
    pub fn new(view: Arc<dyn CallView>, tag: impl Into<String>) -> Self {
        Self {
            view,
            tag: tag.into(),
        }
    }

    /// Meldet eine Nachricht. Kann nicht fehlschlagen.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        self.view.set_status(message);
        self.view.prepend_log(&LogEntry::now(message));
        tracing::info!("[{}] {}", self.tag, message);
    }

    /// Meldet einen nicht abgefangenen Fehler.
    ///
    /// Ohne Nachricht wird der Typname verwendet.
    pub fn report_uncaught(&self, message: Option<&str>, kind: &str) {
        let detail = match message {
            Some(m) if !m.is_empty() => m,
            _ => kind,
        };
        self.log(format!("Window error: {detail}"));
    }
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("tag", &self.tag)
            .finish()
    }
}

/// Leitet Panics an den Reporter weiter
///
/// Der vorher installierte Hook wird danach weiterhin aufgerufen.
pub fn install_panic_hook(reporter: Arc<StatusReporter>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
        reporter.report_uncaught(message, "panic");
        previous(info);
    }));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::MemoryView;

    fn reporter() -> (Arc<MemoryView>, StatusReporter) {
        let view = Arc::new(MemoryView::new());
        let reporter = StatusReporter::new(Arc::clone(&view) as Arc<dyn CallView>, "DealSmart");
        (view, reporter)
    }

    #[test]
    fn test_log_updates_status_and_list() {
        let (view, reporter) = reporter();
        reporter.log("Calling...");
        reporter.log("Call accepted");

        assert_eq!(view.status(), "Call accepted");
        assert_eq!(view.log_lines(), vec!["Call accepted", "Calling..."]);
    }

    #[test]
    fn test_uncaught_uses_message_or_type() {
        let (view, reporter) = reporter();
        reporter.report_uncaught(Some("boom"), "panic");
        reporter.report_uncaught(None, "TypeError");
        reporter.report_uncaught(Some(""), "RangeError");

        assert_eq!(
            view.log_lines(),
            vec![
                "Window error: RangeError",
                "Window error: TypeError",
                "Window error: boom",
            ]
        );
    }

    #[test]
    fn test_panic_hook_logs_once() {
        let (view, reporter) = reporter();
        install_panic_hook(Arc::new(reporter));

        let result = std::thread::spawn(|| panic!("speaker exploded")).join();
        assert!(result.is_err());

        let matching: Vec<_> = view
            .log_lines()
            .into_iter()
            .filter(|line| line.contains("speaker exploded"))
            .collect();
        assert_eq!(matching, vec!["Window error: speaker exploded"]);
    }
}
