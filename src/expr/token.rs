//! Filter expression tokens
//!
//! A filter arrives as a flat token sequence: operands (one per-question
//! condition, labelled `Q1`, `Q2`, ... by creation position) interleaved
//! with AND/OR and parentheses. Sequence order is significant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Partition;

/// The designated date field; conditions on it drive temporal resolution
pub const DATE_FIELD: &str = "form_date";

/// Demographic locator fields, evaluated against the entity's position
/// in the region hierarchy rather than by record lookup
pub const REGION_FIELD: &str = "region";
pub const SUBREGION_FIELD: &str = "subregion";

/// Maximum number of tokens in one expression
pub const MAX_TOKENS: usize = 50;

/// A choice token: AND, OR, `(` or `)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "(")]
    LParen,
    #[serde(rename = ")")]
    RParen,
}

impl OperatorKind {
    /// Returns the textual form used in the rendered expression
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::And => "AND",
            OperatorKind::Or => "OR",
            OperatorKind::LParen => "(",
            OperatorKind::RParen => ")",
        }
    }

    /// Returns true for AND/OR (as opposed to parentheses)
    pub fn is_logical(&self) -> bool {
        matches!(self, OperatorKind::And | OperatorKind::Or)
    }
}

/// Range comparison operator for scalar conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
}

impl RangeOp {
    /// Returns the operator symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Gt => ">",
            RangeOp::Lt => "<",
            RangeOp::Eq => "=",
            RangeOp::Gte => ">=",
            RangeOp::Lte => "<=",
        }
    }
}

/// One operand's comparison value
///
/// Exactly one shape applies per operand, determined by the field's
/// declared kind. `DateWindow` is only valid on the date field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Exact value equality
    Exact { value: Value },
    /// Scalar range comparison
    Range { op: RangeOp, value: f64 },
    /// Membership in a value set
    OneOf { values: Vec<Value> },
    /// Epoch-millis date window (date field only)
    DateWindow { start: i64, end: i64 },
}

/// A leaf condition referencing one question's field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandToken {
    /// Stable label, `Q<n>` by 1-based creation position
    pub label: String,
    /// Target partition of the referenced field
    pub partition: Partition,
    /// Question field name within the partition
    pub field: String,
    /// Comparison shape and value
    pub comparison: Comparison,
}

impl OperandToken {
    /// Returns true if this operand targets the designated date field
    pub fn is_date_field(&self) -> bool {
        self.field == DATE_FIELD
    }
}

/// A filter expression token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    Operand(OperandToken),
    Operator { op: OperatorKind },
}

impl Token {
    /// Shorthand for an operator token
    pub fn operator(op: OperatorKind) -> Self {
        Token::Operator { op }
    }

    /// Returns the operand if this token is one
    pub fn as_operand(&self) -> Option<&OperandToken> {
        match self {
            Token::Operand(operand) => Some(operand),
            Token::Operator { .. } => None,
        }
    }

    /// Returns the operator kind if this token is one
    pub fn as_operator(&self) -> Option<OperatorKind> {
        match self {
            Token::Operator { op } => Some(*op),
            Token::Operand(_) => None,
        }
    }
}

/// Render the space-joined textual form of a token sequence
/// (`Q1 AND ( Q2 OR Q3 )`)
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Token::Operand(operand) => operand.label.as_str(),
            Token::Operator { op } => op.as_str(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1-based position of the operand carrying `label`, for error reporting
pub fn position_of_label(tokens: &[Token], label: &str) -> usize {
    tokens
        .iter()
        .position(|token| {
            token
                .as_operand()
                .map(|operand| operand.label == label)
                .unwrap_or(false)
        })
        .map(|index| index + 1)
        .unwrap_or(1)
}
