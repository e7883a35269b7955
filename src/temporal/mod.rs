//! Temporal snapshot resolution
//!
//! Sub-forms are append-only time series keyed by epoch-millis
//! timestamps. A request carries at most one effective date window;
//! resolution picks which snapshot(s) each condition reads:
//!
//! - explicit window: the latest snapshot inside `[start, end]` only;
//! - no window (phase default): the latest snapshot on each side of the
//!   cutover, so phase-spanning comparisons remain possible.
//!
//! The two policies are intentionally distinct and are not unified.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::{Comparison, Token};

/// Coarse time bucket relative to the cutover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Entirely before the cutover
    One,
    /// Entirely after the cutover
    Two,
    /// Spanning the cutover, or no explicit window
    Between,
}

/// An inclusive epoch-millis date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: i64,
    pub end: i64,
}

impl DateWindow {
    /// Classify the window against a cutover timestamp
    pub fn phase(&self, cutover: i64) -> Phase {
        if self.end < cutover {
            Phase::One
        } else if self.start > cutover {
            Phase::Two
        } else {
            Phase::Between
        }
    }
}

/// The request-wide temporal context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalContext {
    /// Fixed timestamp separating phase 1 from phase 2
    pub cutover: i64,
    /// Classification of the effective window
    pub phase: Phase,
    /// Explicit window, if any date condition supplied one
    pub range: Option<DateWindow>,
}

impl TemporalContext {
    /// Context with no explicit window (phase-default resolution)
    pub fn new(cutover: i64) -> Self {
        Self {
            cutover,
            phase: Phase::Between,
            range: None,
        }
    }

    /// Derive the context from a token sequence
    ///
    /// Date conditions are taken in token order and a later one
    /// overwrites an earlier one; the last date operand wins. This
    /// override is intentional and mirrors what senders of the wire
    /// format already rely on.
    pub fn from_tokens(tokens: &[Token], cutover: i64) -> Self {
        let mut context = Self::new(cutover);
        for operand in tokens.iter().filter_map(Token::as_operand) {
            if !operand.is_date_field() {
                continue;
            }
            if let Comparison::DateWindow { start, end } = &operand.comparison {
                let window = DateWindow {
                    start: *start,
                    end: *end,
                };
                context.range = Some(window);
                context.phase = window.phase(cutover);
            }
        }
        context
    }

    /// Pick the applicable snapshot(s) from one entity's history
    ///
    /// With an explicit window, every timestamp inside it collapses to
    /// the maximum one (latest version in the window; empty if none).
    /// Without one, up to two entries come back: the latest at or
    /// before the cutover and the latest at or after it.
    pub fn resolve(&self, history: &BTreeMap<i64, Value>) -> BTreeMap<i64, Value> {
        let mut resolved = BTreeMap::new();
        match self.range {
            Some(window) => {
                if let Some((ts, snapshot)) =
                    history.range(window.start..=window.end).next_back()
                {
                    resolved.insert(*ts, snapshot.clone());
                }
            }
            None => {
                if let Some((ts, snapshot)) = history.range(..=self.cutover).next_back() {
                    resolved.insert(*ts, snapshot.clone());
                }
                if let Some((ts, snapshot)) = history.range(self.cutover..).next_back() {
                    resolved.insert(*ts, snapshot.clone());
                }
            }
        }
        resolved
    }
}

/// Parse a `{timestamp: snapshot}` subtree into an ordered history
///
/// Keys that are not integral epoch millis are skipped; a non-object
/// subtree yields an empty history.
pub fn parse_history(subtree: &Value) -> BTreeMap<i64, Value> {
    let mut history = BTreeMap::new();
    if let Value::Object(entries) = subtree {
        for (key, snapshot) in entries {
            if let Ok(ts) = key.parse::<i64>() {
                history.insert(ts, snapshot.clone());
            }
        }
    }
    history
}
