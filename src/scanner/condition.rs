//! Per-leaf condition evaluation
//!
//! Evaluates one operand against an entity's resolved data. Strict
//! matching: no type coercion for equality and membership; range
//! comparisons are numeric, accepting numeric strings since survey
//! answers are frequently stored as text.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::expr::{Comparison, OperandToken, RangeOp, REGION_FIELD, SUBREGION_FIELD};
use crate::store::{EntityKey, Partition};

/// Evaluate one operand's condition for one entity
///
/// - `region`/`subregion` compare against the entity's position in the
///   hierarchy, not a record lookup;
/// - the date field is true iff its partition resolved at least one
///   snapshot;
/// - other demographic fields look up the demographic record;
/// - sub-form fields are true iff any resolved snapshot satisfies the
///   comparison.
///
/// Empty or missing data evaluates to false, never to an error.
pub fn evaluate_operand(
    operand: &OperandToken,
    entity: &EntityKey,
    demographic: Option<&Value>,
    resolved: &BTreeMap<Partition, BTreeMap<i64, Value>>,
) -> bool {
    if operand.is_date_field() {
        return resolved
            .get(&operand.partition)
            .map(|snapshots| !snapshots.is_empty())
            .unwrap_or(false);
    }

    if operand.field == REGION_FIELD {
        return matches_value(&Value::String(entity.region.clone()), &operand.comparison);
    }
    if operand.field == SUBREGION_FIELD {
        return matches_value(&Value::String(entity.subregion.clone()), &operand.comparison);
    }

    if operand.partition == Partition::Demographics {
        return demographic
            .and_then(|record| record.get(&operand.field))
            .map(|value| matches_value(value, &operand.comparison))
            .unwrap_or(false);
    }

    resolved
        .get(&operand.partition)
        .map(|snapshots| {
            snapshots.values().any(|snapshot| {
                snapshot
                    .get(&operand.field)
                    .map(|value| matches_value(value, &operand.comparison))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Check one field value against a comparison shape
fn matches_value(actual: &Value, comparison: &Comparison) -> bool {
    if actual.is_null() {
        return false;
    }
    match comparison {
        Comparison::Exact { value } => actual == value,
        Comparison::OneOf { values } => values.iter().any(|v| v == actual),
        Comparison::Range { op, value } => match as_number(actual) {
            Some(actual) => match op {
                RangeOp::Gt => actual > *value,
                RangeOp::Lt => actual < *value,
                RangeOp::Eq => actual == *value,
                RangeOp::Gte => actual >= *value,
                RangeOp::Lte => actual <= *value,
            },
            None => false,
        },
        // date windows act through snapshot resolution, not field match
        Comparison::DateWindow { .. } => false,
    }
}

/// Numeric view of a field value; numeric strings parse, anything else
/// does not match
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::DATE_FIELD;
    use serde_json::json;

    fn entity() -> EntityKey {
        EntityKey::new("north", "n1", "p1")
    }

    fn operand(partition: Partition, field: &str, comparison: Comparison) -> OperandToken {
        OperandToken {
            label: "Q1".to_string(),
            partition,
            field: field.to_string(),
            comparison,
        }
    }

    fn resolved_with(
        partition: Partition,
        snapshots: &[(i64, Value)],
    ) -> BTreeMap<Partition, BTreeMap<i64, Value>> {
        let mut inner = BTreeMap::new();
        for (ts, snapshot) in snapshots {
            inner.insert(*ts, snapshot.clone());
        }
        let mut map = BTreeMap::new();
        map.insert(partition, inner);
        map
    }

    #[test]
    fn test_region_matches_entity_position() {
        let op = operand(
            Partition::Demographics,
            REGION_FIELD,
            Comparison::Exact {
                value: json!("north"),
            },
        );
        assert!(evaluate_operand(&op, &entity(), None, &BTreeMap::new()));

        let op = operand(
            Partition::Demographics,
            REGION_FIELD,
            Comparison::Exact {
                value: json!("south"),
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &BTreeMap::new()));
    }

    #[test]
    fn test_demographic_field_lookup() {
        let record = json!({"gender": "f", "age": "34"});
        let op = operand(
            Partition::Demographics,
            "gender",
            Comparison::Exact { value: json!("f") },
        );
        assert!(evaluate_operand(&op, &entity(), Some(&record), &BTreeMap::new()));

        let op = operand(
            Partition::Demographics,
            "age",
            Comparison::Range {
                op: RangeOp::Gte,
                value: 30.0,
            },
        );
        assert!(evaluate_operand(&op, &entity(), Some(&record), &BTreeMap::new()));

        // missing record, missing field
        assert!(!evaluate_operand(&op, &entity(), None, &BTreeMap::new()));
    }

    #[test]
    fn test_subform_any_resolved_snapshot_matches() {
        let resolved = resolved_with(
            Partition::Clinical,
            &[
                (100, json!({"bp_systolic": "118"})),
                (300, json!({"bp_systolic": "142"})),
            ],
        );
        let op = operand(
            Partition::Clinical,
            "bp_systolic",
            Comparison::Range {
                op: RangeOp::Gt,
                value: 140.0,
            },
        );
        assert!(evaluate_operand(&op, &entity(), None, &resolved));

        let op = operand(
            Partition::Clinical,
            "bp_systolic",
            Comparison::Range {
                op: RangeOp::Lt,
                value: 100.0,
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &resolved));
    }

    #[test]
    fn test_empty_resolution_is_false_not_error() {
        let op = operand(
            Partition::Followup,
            "status",
            Comparison::Exact {
                value: json!("done"),
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &BTreeMap::new()));
        assert!(!evaluate_operand(
            &op,
            &entity(),
            None,
            &resolved_with(Partition::Followup, &[])
        ));
    }

    #[test]
    fn test_date_field_true_iff_snapshots_resolved() {
        let op = operand(
            Partition::Intake,
            DATE_FIELD,
            Comparison::DateWindow {
                start: 0,
                end: 1_000,
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &BTreeMap::new()));
        let resolved = resolved_with(Partition::Intake, &[(100, json!({}))]);
        assert!(evaluate_operand(&op, &entity(), None, &resolved));
    }

    #[test]
    fn test_membership() {
        let resolved = resolved_with(Partition::Lifestyle, &[(100, json!({"smoker": "no"}))]);
        let op = operand(
            Partition::Lifestyle,
            "smoker",
            Comparison::OneOf {
                values: vec![json!("no"), json!("former")],
            },
        );
        assert!(evaluate_operand(&op, &entity(), None, &resolved));

        let op = operand(
            Partition::Lifestyle,
            "smoker",
            Comparison::OneOf {
                values: vec![json!("yes")],
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &resolved));
    }

    #[test]
    fn test_exact_match_has_no_coercion() {
        let resolved = resolved_with(Partition::Intake, &[(100, json!({"weight": 61}))]);
        let op = operand(
            Partition::Intake,
            "weight",
            Comparison::Exact {
                value: json!("61"),
            },
        );
        // string "61" does not equal number 61
        assert!(!evaluate_operand(&op, &entity(), None, &resolved));

        let op = operand(
            Partition::Intake,
            "weight",
            Comparison::Exact { value: json!(61) },
        );
        assert!(evaluate_operand(&op, &entity(), None, &resolved));
    }

    #[test]
    fn test_range_accepts_numeric_strings() {
        assert_eq!(as_number(&json!("61.5")), Some(61.5));
        assert_eq!(as_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn test_null_never_matches() {
        let resolved = resolved_with(Partition::Intake, &[(100, json!({"weight": null}))]);
        let op = operand(
            Partition::Intake,
            "weight",
            Comparison::Exact {
                value: json!(null),
            },
        );
        assert!(!evaluate_operand(&op, &entity(), None, &resolved));
    }
}
