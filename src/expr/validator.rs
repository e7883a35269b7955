//! Filter expression validation
//!
//! Checks run in a fixed order and the whole expression is accepted or
//! rejected atomically; the first failure wins. Every failure carries a
//! human-readable reason and the 1-based token position it refers to.
//!
//! Rules:
//! 1. Non-empty, at most `MAX_TOKENS` tokens.
//! 2. First/last token must not be AND/OR.
//! 3. A date condition mixed with both AND and OR requires parentheses.
//! 4. A date condition must not be taken directly by an OR in the tree.
//! 5. Structural scan: operator placement, operand adjacency, balanced
//!    parentheses.

use super::builder::{build, LogicalOp};
use super::errors::ValidationError;
use super::token::{position_of_label, OperatorKind, Token, MAX_TOKENS};

/// Validate a token sequence; `Ok(())` means the expression is
/// accepted in full
pub fn validate(tokens: &[Token]) -> Result<(), ValidationError> {
    check_bounds(tokens)?;
    check_edges(tokens)?;
    check_date_grouping(tokens)?;
    check_date_scope(tokens)?;
    check_structure(tokens)?;
    Ok(())
}

/// Rule 1: non-empty, bounded length
fn check_bounds(tokens: &[Token]) -> Result<(), ValidationError> {
    if tokens.is_empty() {
        return Err(ValidationError::new("expression is empty", 1));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ValidationError::new(
            format!("expression exceeds {} tokens", MAX_TOKENS),
            MAX_TOKENS + 1,
        ));
    }
    Ok(())
}

/// Rule 2: AND/OR cannot open or close the expression
fn check_edges(tokens: &[Token]) -> Result<(), ValidationError> {
    if let Some(op) = tokens.first().and_then(Token::as_operator) {
        if op.is_logical() {
            return Err(ValidationError::new(
                format!("expression cannot start with {}", op.as_str()),
                1,
            ));
        }
    }
    if let Some(op) = tokens.last().and_then(Token::as_operator) {
        if op.is_logical() {
            return Err(ValidationError::new(
                format!("expression cannot end with {}", op.as_str()),
                tokens.len(),
            ));
        }
    }
    Ok(())
}

/// Rule 3: a date condition in an expression mixing AND and OR must be
/// grouped with parentheses
fn check_date_grouping(tokens: &[Token]) -> Result<(), ValidationError> {
    let date_operand = tokens
        .iter()
        .filter_map(Token::as_operand)
        .find(|operand| operand.is_date_field());
    let Some(date_operand) = date_operand else {
        return Ok(());
    };

    let has = |kind: OperatorKind| tokens.iter().any(|t| t.as_operator() == Some(kind));
    let mixed = has(OperatorKind::And) && has(OperatorKind::Or);
    let grouped = has(OperatorKind::LParen) && has(OperatorKind::RParen);
    if mixed && !grouped {
        return Err(ValidationError::new(
            format!(
                "date condition {} requires parentheses when AND and OR are mixed",
                date_operand.label
            ),
            position_of_label(tokens, &date_operand.label),
        ));
    }
    Ok(())
}

/// Rule 4: a date condition may only be combined directly by AND
///
/// Walks the built tree accumulating the enclosing operator kinds from
/// root to each leaf; a date leaf whose nearest combining operator is
/// OR is rejected, naming the offending label. An OR higher up is fine:
/// it combines the date's whole subtree, not the date itself.
///
/// Builds the tree defensively: a stream the builder cannot reduce is a
/// validation failure here, not a panic.
fn check_date_scope(tokens: &[Token]) -> Result<(), ValidationError> {
    let has_date = tokens
        .iter()
        .filter_map(Token::as_operand)
        .any(|operand| operand.is_date_field());
    if !has_date {
        return Ok(());
    }

    let tree = build(tokens)
        .map_err(|e| ValidationError::new(format!("expression structure: {}", e.reason()), 1))?;

    let mut offending: Option<String> = None;
    tree.walk_leaves(&mut |operand, ancestors| {
        if offending.is_none()
            && operand.is_date_field()
            && ancestors.last() == Some(&LogicalOp::Or)
        {
            offending = Some(operand.label.clone());
        }
    });

    if let Some(label) = offending {
        let position = position_of_label(tokens, &label);
        return Err(ValidationError::new(
            format!("date condition {} cannot be combined with OR", label),
            position,
        ));
    }
    Ok(())
}

/// Rule 5: token-stream structural scan
fn check_structure(tokens: &[Token]) -> Result<(), ValidationError> {
    // Positions of still-open parens, for unmatched-paren reporting
    let mut open_parens: Vec<usize> = Vec::new();
    let mut previous: Option<&Token> = None;

    for (index, token) in tokens.iter().enumerate() {
        let position = index + 1;
        let prev_operator = previous.and_then(Token::as_operator);

        match token {
            Token::Operator { op: OperatorKind::LParen } => {
                let follows_operand = previous.map(|t| t.as_operand().is_some()).unwrap_or(false);
                if follows_operand || prev_operator == Some(OperatorKind::RParen) {
                    return Err(ValidationError::new(
                        "( cannot directly follow a condition or )",
                        position,
                    ));
                }
                open_parens.push(position);
            }
            Token::Operator { op: OperatorKind::RParen } => {
                if matches!(
                    prev_operator,
                    Some(OperatorKind::And) | Some(OperatorKind::Or) | Some(OperatorKind::LParen)
                ) {
                    return Err(ValidationError::new(
                        ") cannot directly follow an operator or (",
                        position,
                    ));
                }
                if open_parens.pop().is_none() {
                    return Err(ValidationError::new("unmatched )", position));
                }
            }
            Token::Operator { op } => {
                // AND/OR
                if previous.is_none() {
                    return Err(ValidationError::new(
                        format!("{} cannot open the expression", op.as_str()),
                        position,
                    ));
                }
                if matches!(
                    prev_operator,
                    Some(OperatorKind::And) | Some(OperatorKind::Or)
                ) {
                    return Err(ValidationError::new(
                        format!("{} cannot follow another operator", op.as_str()),
                        position,
                    ));
                }
                if prev_operator == Some(OperatorKind::LParen) {
                    return Err(ValidationError::new(
                        format!("{} cannot follow (", op.as_str()),
                        position,
                    ));
                }
                if index == tokens.len() - 1 {
                    return Err(ValidationError::new(
                        format!("{} cannot close the expression", op.as_str()),
                        position,
                    ));
                }
            }
            Token::Operand(_) => {
                let follows_operand = previous.map(|t| t.as_operand().is_some()).unwrap_or(false);
                if follows_operand {
                    return Err(ValidationError::new(
                        "two conditions cannot be adjacent",
                        position,
                    ));
                }
                if prev_operator == Some(OperatorKind::RParen) {
                    return Err(ValidationError::new(
                        "a condition cannot directly follow )",
                        position,
                    ));
                }
            }
        }

        previous = Some(token);
    }

    if let Some(position) = open_parens.pop() {
        return Err(ValidationError::new("unmatched (", position));
    }
    Ok(())
}
