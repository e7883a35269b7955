//! Incremental scan output
//!
//! A scan emits a sequence of events: zero or more `fetching` markers,
//! one `processed` marker per match found, and exactly one terminal
//! `data` event carrying the full match list. Each event encodes as a
//! single JSON line for NDJSON transports.

use serde_json::{json, Value};

use crate::store::Partition;

use super::record::MatchRecord;

/// One element of the incremental scan output
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A required partition is starting to load
    Fetching(Partition),
    /// Running matched count after another match was found
    Processed(usize),
    /// Terminal event: the full match list
    Data(Vec<MatchRecord>),
}

impl ScanEvent {
    /// JSON form of this event
    pub fn to_json(&self) -> Value {
        match self {
            ScanEvent::Fetching(partition) => json!({ "fetching": partition.name() }),
            ScanEvent::Processed(count) => json!({ "processed": count }),
            ScanEvent::Data(records) => json!({ "data": records }),
        }
    }

    /// Newline-terminated JSON line for NDJSON streaming
    pub fn to_ndjson(&self) -> String {
        let mut line = self.to_json().to_string();
        line.push('\n');
        line
    }
}
