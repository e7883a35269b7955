//! Filter expression core
//!
//! Tokens arrive as a flat sequence from the form UI; this module
//! validates the sequence, reduces it to an immutable binary operator
//! tree, and evaluates the tree against per-entity boolean results.
//!
//! The validator is total: every token sequence terminates with exactly
//! one verdict. The builder assumes structural validity and is only
//! invoked after (or defensively within) validation.

mod builder;
mod errors;
mod eval;
mod token;
mod validator;

pub use builder::{build, ExprTree, LogicalOp};
pub use errors::{BuildError, EvalError, ValidationError};
pub use eval::evaluate;
pub use token::{
    position_of_label, render, Comparison, OperandToken, OperatorKind, RangeOp, Token,
    DATE_FIELD, MAX_TOKENS, REGION_FIELD, SUBREGION_FIELD,
};
pub use validator::validate;
