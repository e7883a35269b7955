//! Boolean reduction over the expression tree
//!
//! Per-entity results arrive as a `label -> bool` map; reduction walks
//! the already-built tree directly. There is no textual substitution
//! and no dynamic code evaluation anywhere in this path.

use std::collections::HashMap;

use super::builder::{ExprTree, LogicalOp};
use super::errors::EvalError;

/// Reduce the tree to a single boolean given per-leaf results
///
/// Both sides of every branch are evaluated; a label missing from the
/// map is an `EvalError` (the caller skips the entity and continues).
pub fn evaluate(tree: &ExprTree, labels: &HashMap<String, bool>) -> Result<bool, EvalError> {
    match tree {
        ExprTree::Leaf(operand) => labels
            .get(&operand.label)
            .copied()
            .ok_or_else(|| EvalError::unknown_label(&operand.label)),
        ExprTree::Branch { op, left, right } => {
            let left = evaluate(left, labels)?;
            let right = evaluate(right, labels)?;
            Ok(match op {
                LogicalOp::And => left && right,
                LogicalOp::Or => left || right,
            })
        }
    }
}
