//! Scan-scoped start/complete logging
//!
//! A `ScanScope` logs `{name}_BEGIN` on creation, `{name}_COMPLETE` on
//! `complete()`, `{name}_FAILED` on `fail()`, and a `{name}_INCOMPLETE`
//! warning if dropped without either.

use std::cell::Cell;

use super::logger::Logger;

/// A scope that logs start and completion events around one unit of work
pub struct ScanScope<'a> {
    name: &'a str,
    fields: Vec<(&'a str, String)>,
    finished: Cell<bool>,
}

impl<'a> ScanScope<'a> {
    /// Open a scope, logging `{name}_BEGIN` immediately
    pub fn begin(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let refs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, *v)).collect();
        Logger::info(&format!("{}_BEGIN", name), &refs);
        Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            finished: Cell::new(false),
        }
    }

    /// Close the scope successfully, logging `{name}_COMPLETE`
    ///
    /// Extra fields are appended to the ones given at `begin`.
    pub fn complete(self, extra: &[(&str, &str)]) {
        self.finished.set(true);
        let mut refs: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        refs.extend(extra.iter().copied());
        Logger::info(&format!("{}_COMPLETE", self.name), &refs);
    }

    /// Close the scope as failed, logging `{name}_FAILED`
    pub fn fail(self, reason: &str) {
        self.finished.set(true);
        Logger::error(&format!("{}_FAILED", self.name), &[("reason", reason)]);
    }
}

impl Drop for ScanScope<'_> {
    fn drop(&mut self) {
        if !self.finished.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Elapsed-time helper for log fields
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Elapsed milliseconds as a log-ready string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}
