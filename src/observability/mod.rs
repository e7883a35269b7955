//! Observability for cohortq
//!
//! Structured JSON-lines logging with deterministic key ordering, plus
//! scope and timer helpers used by the scanner and the HTTP server.
//!
//! ```ignore
//! Logger::info("SCAN_COMPLETE", &[("matched", "42")]);
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::{ScanScope, Timer};
