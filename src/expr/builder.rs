//! Expression tree construction
//!
//! Reduces a flat token sequence into a binary operator tree with a
//! two-stack shunting-yard pass: AND binds tighter than OR, parentheses
//! scope sub-expressions. The builder assumes a structurally valid
//! sequence but fails soft so the validator's tree-walk rule can turn a
//! malformed stream into a verdict instead of a panic.

use super::errors::BuildError;
use super::token::{OperandToken, OperatorKind, Token};

/// Branch operator of the expression tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// AND(2) binds tighter than OR(1)
    fn precedence(&self) -> u8 {
        match self {
            LogicalOp::And => 2,
            LogicalOp::Or => 1,
        }
    }

    fn from_operator(op: OperatorKind) -> Option<Self> {
        match op {
            OperatorKind::And => Some(LogicalOp::And),
            OperatorKind::Or => Some(LogicalOp::Or),
            OperatorKind::LParen | OperatorKind::RParen => None,
        }
    }
}

/// An immutable boolean expression tree over operand leaves
///
/// Built once per validated expression and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprTree {
    Leaf(OperandToken),
    Branch {
        op: LogicalOp,
        left: Box<ExprTree>,
        right: Box<ExprTree>,
    },
}

impl ExprTree {
    /// Visit every leaf with the sequence of enclosing branch operators
    /// from the root down to it
    pub fn walk_leaves<F>(&self, visit: &mut F)
    where
        F: FnMut(&OperandToken, &[LogicalOp]),
    {
        let mut ancestors = Vec::new();
        self.walk_leaves_inner(&mut ancestors, visit);
    }

    fn walk_leaves_inner<F>(&self, ancestors: &mut Vec<LogicalOp>, visit: &mut F)
    where
        F: FnMut(&OperandToken, &[LogicalOp]),
    {
        match self {
            ExprTree::Leaf(operand) => visit(operand, ancestors),
            ExprTree::Branch { op, left, right } => {
                ancestors.push(*op);
                left.walk_leaves_inner(ancestors, visit);
                right.walk_leaves_inner(ancestors, visit);
                ancestors.pop();
            }
        }
    }
}

/// Build the expression tree for a token sequence, order preserved
pub fn build(tokens: &[Token]) -> Result<ExprTree, BuildError> {
    let mut operands: Vec<ExprTree> = Vec::new();
    // Holds AND/OR plus open parens acting as scope markers
    let mut operators: Vec<OperatorKind> = Vec::new();

    for token in tokens {
        match token {
            Token::Operand(operand) => operands.push(ExprTree::Leaf(operand.clone())),
            Token::Operator { op } => match op {
                OperatorKind::LParen => operators.push(*op),
                OperatorKind::And => {
                    push_logical(&mut operands, &mut operators, LogicalOp::And)?;
                }
                OperatorKind::Or => {
                    push_logical(&mut operands, &mut operators, LogicalOp::Or)?;
                }
                OperatorKind::RParen => loop {
                    match operators.pop() {
                        Some(OperatorKind::LParen) => break,
                        Some(top) => {
                            let top_op = LogicalOp::from_operator(top)
                                .ok_or_else(|| BuildError::new("misplaced parenthesis"))?;
                            reduce(&mut operands, top_op)?;
                        }
                        None => return Err(BuildError::new("unmatched closing parenthesis")),
                    }
                },
            },
        }
    }

    while let Some(top) = operators.pop() {
        let top_op = LogicalOp::from_operator(top)
            .ok_or_else(|| BuildError::new("unmatched opening parenthesis"))?;
        reduce(&mut operands, top_op)?;
    }

    let tree = operands
        .pop()
        .ok_or_else(|| BuildError::new("empty expression"))?;
    if !operands.is_empty() {
        return Err(BuildError::new("dangling operands"));
    }
    Ok(tree)
}

fn push_logical(
    operands: &mut Vec<ExprTree>,
    operators: &mut Vec<OperatorKind>,
    incoming: LogicalOp,
) -> Result<(), BuildError> {
    while let Some(&top) = operators.last() {
        if top == OperatorKind::LParen {
            break;
        }
        let top_op = LogicalOp::from_operator(top)
            .ok_or_else(|| BuildError::new("misplaced parenthesis"))?;
        if incoming.precedence() <= top_op.precedence() {
            operators.pop();
            reduce(operands, top_op)?;
        } else {
            break;
        }
    }
    operators.push(match incoming {
        LogicalOp::And => OperatorKind::And,
        LogicalOp::Or => OperatorKind::Or,
    });
    Ok(())
}

fn reduce(operands: &mut Vec<ExprTree>, op: LogicalOp) -> Result<(), BuildError> {
    let right = operands
        .pop()
        .ok_or_else(|| BuildError::new("operator missing right operand"))?;
    let left = operands
        .pop()
        .ok_or_else(|| BuildError::new("operator missing left operand"))?;
    operands.push(ExprTree::Branch {
        op,
        left: Box::new(left),
        right: Box::new(right),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Partition;
    use crate::expr::token::Comparison;
    use serde_json::json;

    fn operand(label: &str) -> Token {
        Token::Operand(OperandToken {
            label: label.to_string(),
            partition: Partition::Intake,
            field: "weight".to_string(),
            comparison: Comparison::Exact { value: json!("61") },
        })
    }

    fn op(kind: OperatorKind) -> Token {
        Token::operator(kind)
    }

    fn leaf_label(tree: &ExprTree) -> &str {
        match tree {
            ExprTree::Leaf(operand) => &operand.label,
            ExprTree::Branch { .. } => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_single_operand() {
        let tree = build(&[operand("Q1")]).unwrap();
        assert_eq!(leaf_label(&tree), "Q1");
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // Q1 AND Q2 OR Q3 => OR(AND(Q1, Q2), Q3)
        let tree = build(&[
            operand("Q1"),
            op(OperatorKind::And),
            operand("Q2"),
            op(OperatorKind::Or),
            operand("Q3"),
        ])
        .unwrap();
        match tree {
            ExprTree::Branch { op: LogicalOp::Or, left, right } => {
                assert_eq!(leaf_label(&right), "Q3");
                match *left {
                    ExprTree::Branch { op: LogicalOp::And, ref left, ref right } => {
                        assert_eq!(leaf_label(left), "Q1");
                        assert_eq!(leaf_label(right), "Q2");
                    }
                    _ => panic!("expected AND branch"),
                }
            }
            _ => panic!("expected OR root"),
        }
    }

    #[test]
    fn test_or_then_and() {
        // Q1 OR Q2 AND Q3 => OR(Q1, AND(Q2, Q3))
        let tree = build(&[
            operand("Q1"),
            op(OperatorKind::Or),
            operand("Q2"),
            op(OperatorKind::And),
            operand("Q3"),
        ])
        .unwrap();
        match tree {
            ExprTree::Branch { op: LogicalOp::Or, left, right } => {
                assert_eq!(leaf_label(&left), "Q1");
                match *right {
                    ExprTree::Branch { op: LogicalOp::And, ref left, ref right } => {
                        assert_eq!(leaf_label(left), "Q2");
                        assert_eq!(leaf_label(right), "Q3");
                    }
                    _ => panic!("expected AND branch"),
                }
            }
            _ => panic!("expected OR root"),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        // ( Q1 OR Q2 ) AND Q3 => AND(OR(Q1, Q2), Q3)
        let tree = build(&[
            op(OperatorKind::LParen),
            operand("Q1"),
            op(OperatorKind::Or),
            operand("Q2"),
            op(OperatorKind::RParen),
            op(OperatorKind::And),
            operand("Q3"),
        ])
        .unwrap();
        match tree {
            ExprTree::Branch { op: LogicalOp::And, left, right } => {
                assert_eq!(leaf_label(&right), "Q3");
                assert!(matches!(*left, ExprTree::Branch { op: LogicalOp::Or, .. }));
            }
            _ => panic!("expected AND root"),
        }
    }

    #[test]
    fn test_walk_leaves_reports_ancestors() {
        let tree = build(&[
            operand("Q1"),
            op(OperatorKind::And),
            operand("Q2"),
            op(OperatorKind::Or),
            operand("Q3"),
        ])
        .unwrap();
        let mut seen = Vec::new();
        tree.walk_leaves(&mut |operand, ancestors| {
            seen.push((operand.label.clone(), ancestors.to_vec()));
        });
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, "Q1");
        assert_eq!(seen[0].1, vec![LogicalOp::Or, LogicalOp::And]);
        assert_eq!(seen[2].0, "Q3");
        assert_eq!(seen[2].1, vec![LogicalOp::Or]);
    }

    #[test]
    fn test_malformed_stream_fails_soft() {
        assert!(build(&[]).is_err());
        assert!(build(&[op(OperatorKind::And)]).is_err());
        assert!(build(&[operand("Q1"), op(OperatorKind::And)]).is_err());
        assert!(build(&[op(OperatorKind::LParen), operand("Q1")]).is_err());
        assert!(build(&[operand("Q1"), op(OperatorKind::RParen)]).is_err());
        assert!(build(&[operand("Q1"), operand("Q2")]).is_err());
    }
}
