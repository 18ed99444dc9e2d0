//! Plain-text rendering of [`StateMonitorEntry`] for demos and local debugging.
//!
//! Mirrors the project's established `TelemetryFormatter`/`PlainFormatter` split: a small trait
//! so alternate renderers (JSON, colorized) can be swapped in later without touching call sites.

use std::fmt::Debug;

use crate::monitor::StateMonitorEntry;

/// Renders a [`StateMonitorEntry`] to a human-readable line.
pub trait TelemetryFormatter<T> {
    fn render(&self, entry: &StateMonitorEntry<T>) -> String;
}

/// The default renderer: one line per entry, error (if any) on a second indented line.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFormatter;

impl<T: Debug> TelemetryFormatter<T> for PlainFormatter {
    fn render(&self, entry: &StateMonitorEntry<T>) -> String {
        let kind = match (entry.running, entry.partial, entry.error.is_some()) {
            (_, true, _) => "partial",
            (true, false, false) => "running",
            (true, false, true) => "non-fatal",
            (false, false, false) => "completed",
            (false, false, true) => "fatal",
        };
        let mut line = format!("[{}] node={} thread={} state={:?}", kind, entry.node, entry.thread_id, entry.new_state);
        if let Some(err) = &entry.error {
            line.push_str(&format!("\n    error: {err}"));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_completed_entry_without_error_line() {
        let entry = StateMonitorEntry::completed("n", "t", 1);
        let rendered = PlainFormatter.render(&entry);
        assert!(rendered.starts_with("[completed]"));
        assert!(!rendered.contains("error:"));
    }

    #[test]
    fn renders_partial_before_running_or_completed() {
        let entry = StateMonitorEntry::partial("n", "t", 1);
        assert!(PlainFormatter.render(&entry).starts_with("[partial]"));
    }
}
