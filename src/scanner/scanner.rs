//! Condition evaluation and record scanning
//!
//! Execution flow, in strict order:
//! 1. Validate the expression and build the tree.
//! 2. Derive the temporal context and the required partitions.
//! 3. Discover the roster from the first non-empty partition of the
//!    priority order (explicit function of whether OR is present).
//! 4. Size batches from the roster length.
//! 5. Per batch, evaluate entities concurrently; per entity, resolve
//!    snapshots, evaluate each condition, reduce on the tree.
//! 6. Assemble matched records with all five partitions and stream
//!    events as work progresses.
//!
//! Per-entity failures are isolated: a reduction error skips the
//! entity, a partition fetch failure nulls that partition. Only
//! request-level problems abort the scan.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use futures_util::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::expr::{
    build, evaluate, render, validate, ExprTree, OperandToken, OperatorKind, Token,
};
use crate::observability::{Logger, ScanScope, Timer};
use crate::store::{EntityKey, Partition, TreeStore};
use crate::temporal::{parse_history, TemporalContext};

use super::batch;
use super::condition::evaluate_operand;
use super::errors::{ScanError, ScanResult};
use super::progress::ScanEvent;
use super::record::{history_to_value, MatchRecord};

/// A filter request: the token sequence plus its rendered textual form
///
/// `expression_string` is produced by the same UI that produced the
/// tokens; when present it must render-match the sequence. Evaluation
/// itself never consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub expression: Vec<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_string: Option<String>,
}

impl ScanRequest {
    /// Request with a consistent rendered form
    pub fn new(expression: Vec<Token>) -> Self {
        let expression_string = Some(render(&expression));
        Self {
            expression,
            expression_string,
        }
    }
}

/// Outcome counters for one completed (or cancelled) scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Entities enumerated for scanning
    pub roster: usize,
    /// Matches found before completion or cancellation
    pub matched: usize,
    /// Batch size chosen by the estimator
    pub batch_size: usize,
    /// True if the event sink closed before the scan finished
    pub cancelled: bool,
}

/// Scans the survey tree for entities matching a filter expression
pub struct RecordScanner {
    store: Arc<dyn TreeStore>,
    cutover: i64,
}

impl RecordScanner {
    /// Create a scanner over a store with the configured cutover
    pub fn new(store: Arc<dyn TreeStore>, cutover: i64) -> Self {
        Self { store, cutover }
    }

    /// Validate the request and discover the roster
    ///
    /// Everything that can reject the request happens here, before any
    /// output is produced, so transports can still answer with a plain
    /// error status.
    pub async fn prepare(&self, request: &ScanRequest) -> ScanResult<PreparedScan> {
        validate(&request.expression)?;
        if let Some(expected) = &request.expression_string {
            let normalized = expected.split_whitespace().collect::<Vec<_>>().join(" ");
            if normalized != render(&request.expression) {
                return Err(ScanError::InvalidExpression {
                    reason: "expression_string does not match the token sequence".to_string(),
                    position: 1,
                });
            }
        }

        // the validator has accepted the stream; a build failure past
        // this point is an internal fault, not a caller error
        let tree = build(&request.expression)
            .map_err(|e| ScanError::Unexpected(e.to_string()))?;

        let operands: Vec<OperandToken> = request
            .expression
            .iter()
            .filter_map(Token::as_operand)
            .cloned()
            .collect();
        let or_present = request
            .expression
            .iter()
            .any(|token| token.as_operator() == Some(OperatorKind::Or));
        let context = TemporalContext::from_tokens(&request.expression, self.cutover);

        let mut required: BTreeSet<Partition> =
            operands.iter().map(|operand| operand.partition).collect();
        if required.contains(&Partition::Demographics) {
            required.insert(Partition::PRIMARY_FORM);
        }

        let roster = self.discover_roster(or_present).await?;
        if roster.is_empty() {
            return Err(ScanError::DataAbsent);
        }
        let batch_size = batch::estimate(roster.len());

        Ok(PreparedScan {
            store: Arc::clone(&self.store),
            scan_id: Uuid::new_v4(),
            tree,
            operands,
            context,
            required,
            roster,
            batch_size,
        })
    }

    /// Prepare and run in one step
    pub async fn scan(
        &self,
        request: &ScanRequest,
        events: &mpsc::Sender<ScanEvent>,
    ) -> ScanResult<ScanSummary> {
        let prepared = self.prepare(request).await?;
        Ok(prepared.run(events).await)
    }

    /// Enumerate the candidate roster from the first non-empty
    /// partition in priority order
    async fn discover_roster(&self, or_present: bool) -> ScanResult<Vec<EntityKey>> {
        for partition in Partition::roster_priority(or_present) {
            let Some(subtree) = self.store.read_partition(partition).await? else {
                continue;
            };
            let roster = enumerate_entities(&subtree);
            if !roster.is_empty() {
                Logger::info(
                    "ROSTER_DISCOVERED",
                    &[
                        ("partition", partition.name()),
                        ("entities", &roster.len().to_string()),
                    ],
                );
                return Ok(roster);
            }
        }
        Ok(Vec::new())
    }
}

/// Walk region -> subregion -> entity-id in stable key order
fn enumerate_entities(subtree: &Value) -> Vec<EntityKey> {
    let mut roster = Vec::new();
    let Value::Object(regions) = subtree else {
        return roster;
    };
    for (region, subregions) in regions {
        let Value::Object(subregions) = subregions else {
            continue;
        };
        for (subregion, entities) in subregions {
            let Value::Object(entities) = entities else {
                continue;
            };
            for entity_id in entities.keys() {
                roster.push(EntityKey::new(
                    region.as_str(),
                    subregion.as_str(),
                    entity_id.as_str(),
                ));
            }
        }
    }
    roster
}

/// A validated scan with its roster, ready to run
pub struct PreparedScan {
    store: Arc<dyn TreeStore>,
    scan_id: Uuid,
    tree: ExprTree,
    operands: Vec<OperandToken>,
    context: TemporalContext,
    required: BTreeSet<Partition>,
    roster: Vec<EntityKey>,
    batch_size: usize,
}

impl PreparedScan {
    /// Entities to be scanned
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Batch size chosen by the estimator
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Partitions the expression requires
    pub fn required_partitions(&self) -> &BTreeSet<Partition> {
        &self.required
    }

    /// Run the scan, pushing events into the sink
    ///
    /// Batches execute strictly in roster order; entities within a
    /// batch run concurrently, bounded by the batch size. A closed sink
    /// is cancellation: the scan stops before the next batch (or on the
    /// failed send) without treating it as an error.
    pub async fn run(self, events: &mpsc::Sender<ScanEvent>) -> ScanSummary {
        let timer = Timer::start();
        let scan_id = self.scan_id.to_string();
        let scope = ScanScope::begin(
            "SCAN",
            &[
                ("scan_id", &scan_id),
                ("roster", &self.roster.len().to_string()),
                ("batch_size", &self.batch_size.to_string()),
            ],
        );

        let mut cancelled = false;
        for partition in &self.required {
            if events.send(ScanEvent::Fetching(*partition)).await.is_err() {
                cancelled = true;
                break;
            }
        }

        let mut matches: Vec<MatchRecord> = Vec::new();
        if !cancelled {
            'batches: for chunk in self.roster.chunks(self.batch_size) {
                if events.is_closed() {
                    cancelled = true;
                    break;
                }
                let evaluations = chunk.iter().map(|entity| self.evaluate_entity(entity));
                for record in future::join_all(evaluations).await.into_iter().flatten() {
                    matches.push(record);
                    if events
                        .send(ScanEvent::Processed(matches.len()))
                        .await
                        .is_err()
                    {
                        cancelled = true;
                        break 'batches;
                    }
                }
            }
        }

        let matched = matches.len();
        if cancelled {
            Logger::info("SCAN_CANCELLED", &[("scan_id", &scan_id)]);
        } else {
            let _ = events.send(ScanEvent::Data(matches)).await;
        }
        scope.complete(&[
            ("matched", &matched.to_string()),
            ("elapsed_ms", &timer.elapsed_ms()),
        ]);

        ScanSummary {
            roster: self.roster.len(),
            matched,
            batch_size: self.batch_size,
            cancelled,
        }
    }

    /// Evaluate one entity; `Some` carries the assembled match
    async fn evaluate_entity(&self, entity: &EntityKey) -> Option<MatchRecord> {
        let demographic = self.fetch_demographic(entity).await;
        let resolved = self.resolve_required(entity).await;

        let mut labels: HashMap<String, bool> = HashMap::with_capacity(self.operands.len());
        for operand in &self.operands {
            labels.insert(
                operand.label.clone(),
                evaluate_operand(operand, entity, demographic.as_ref(), &resolved),
            );
        }

        match evaluate(&self.tree, &labels) {
            Ok(true) => Some(self.assemble(entity, demographic, resolved).await),
            Ok(false) => None,
            Err(err) => {
                Logger::warn(
                    "ENTITY_SKIPPED",
                    &[
                        ("entity", &entity.entity_id),
                        ("reason", &err.to_string()),
                        ("scan_id", &self.scan_id.to_string()),
                    ],
                );
                None
            }
        }
    }

    async fn fetch_demographic(&self, entity: &EntityKey) -> Option<Value> {
        match self.store.read_entity(Partition::Demographics, entity).await {
            Ok(record) => record,
            Err(err) => {
                Logger::warn(
                    "ENTITY_FETCH_FAILED",
                    &[
                        ("entity", &entity.entity_id),
                        ("partition", Partition::Demographics.name()),
                        ("reason", &err.to_string()),
                    ],
                );
                None
            }
        }
    }

    /// Resolve snapshots for every required versioned partition
    async fn resolve_required(
        &self,
        entity: &EntityKey,
    ) -> BTreeMap<Partition, BTreeMap<i64, Value>> {
        let mut resolved = BTreeMap::new();
        for partition in &self.required {
            if !partition.is_versioned() {
                continue;
            }
            let history = match self.store.read_entity(*partition, entity).await {
                Ok(Some(subtree)) => parse_history(&subtree),
                Ok(None) => BTreeMap::new(),
                Err(err) => {
                    Logger::warn(
                        "ENTITY_FETCH_FAILED",
                        &[
                            ("entity", &entity.entity_id),
                            ("partition", partition.name()),
                            ("reason", &err.to_string()),
                        ],
                    );
                    BTreeMap::new()
                }
            };
            resolved.insert(*partition, self.context.resolve(&history));
        }
        resolved
    }

    /// Assemble the full record: all five partitions, the unreferenced
    /// ones fetched fresh under the same resolution policy
    async fn assemble(
        &self,
        entity: &EntityKey,
        demographic: Option<Value>,
        resolved: BTreeMap<Partition, BTreeMap<i64, Value>>,
    ) -> MatchRecord {
        let mut record = MatchRecord::new(entity);
        for partition in Partition::ALL {
            let value = if partition == Partition::Demographics {
                demographic.clone().unwrap_or(Value::Null)
            } else if let Some(history) = resolved.get(&partition) {
                history_to_value(history)
            } else {
                match self.store.read_entity(partition, entity).await {
                    Ok(Some(subtree)) => {
                        history_to_value(&self.context.resolve(&parse_history(&subtree)))
                    }
                    Ok(None) => history_to_value(&BTreeMap::new()),
                    Err(err) => {
                        Logger::warn(
                            "PARTITION_NULLED",
                            &[
                                ("entity", &entity.entity_id),
                                ("partition", partition.name()),
                                ("reason", &err.to_string()),
                            ],
                        );
                        Value::Null
                    }
                }
            };
            record.insert_partition(partition.name(), value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Comparison;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn operand(label: &str, partition: Partition, field: &str, comparison: Comparison) -> Token {
        Token::Operand(OperandToken {
            label: label.to_string(),
            partition,
            field: field.to_string(),
            comparison,
        })
    }

    fn fixture() -> Arc<dyn TreeStore> {
        Arc::new(
            MemoryStore::from_value(json!({
                "demographics": {
                    "north": {
                        "n1": {
                            "p1": {"gender": "f"},
                            "p2": {"gender": "m"}
                        }
                    }
                },
                "intake": {
                    "north": {
                        "n1": {
                            "p1": {"100": {"weight": "61"}},
                            "p2": {"100": {"weight": "82"}}
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn drain(mut rx: mpsc::Receiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_scan_streams_events_and_matches() {
        let scanner = RecordScanner::new(fixture(), 250);
        let request = ScanRequest::new(vec![operand(
            "Q1",
            Partition::Intake,
            "weight",
            Comparison::Exact { value: json!("61") },
        )]);

        let (tx, rx) = mpsc::channel(64);
        let summary = scanner.scan(&request, &tx).await.unwrap();
        drop(tx);

        assert_eq!(summary.roster, 2);
        assert_eq!(summary.matched, 1);
        assert!(!summary.cancelled);

        let events = drain(rx);
        assert!(matches!(events[0], ScanEvent::Fetching(Partition::Intake)));
        assert!(events.contains(&ScanEvent::Processed(1)));
        match events.last().unwrap() {
            ScanEvent::Data(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].entity_id, "p1");
                // all five partitions are present in the output
                assert_eq!(records[0].partitions.len(), 5);
            }
            other => panic!("expected terminal data event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_demographic_reference_requires_primary_form() {
        let scanner = RecordScanner::new(fixture(), 250);
        let request = ScanRequest::new(vec![operand(
            "Q1",
            Partition::Demographics,
            "gender",
            Comparison::Exact { value: json!("f") },
        )]);

        let prepared = scanner.prepare(&request).await.unwrap();
        assert!(prepared.required_partitions().contains(&Partition::Demographics));
        assert!(prepared.required_partitions().contains(&Partition::Intake));
    }

    #[tokio::test]
    async fn test_empty_store_is_data_absent() {
        let store: Arc<dyn TreeStore> =
            Arc::new(MemoryStore::from_value(json!({})).unwrap());
        let scanner = RecordScanner::new(store, 250);
        let request = ScanRequest::new(vec![operand(
            "Q1",
            Partition::Intake,
            "weight",
            Comparison::Exact { value: json!("61") },
        )]);

        let (tx, _rx) = mpsc::channel(64);
        let err = scanner.scan(&request, &tx).await.unwrap_err();
        assert!(matches!(err, ScanError::DataAbsent));
    }

    #[tokio::test]
    async fn test_invalid_expression_rejected_before_any_event() {
        let scanner = RecordScanner::new(fixture(), 250);
        let request = ScanRequest::new(vec![
            operand(
                "Q1",
                Partition::Intake,
                "weight",
                Comparison::Exact { value: json!("61") },
            ),
            Token::operator(OperatorKind::And),
        ]);

        let (tx, rx) = mpsc::channel(64);
        let err = scanner.scan(&request, &tx).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        drop(tx);
        assert!(drain(rx).is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_expression_string_rejected() {
        let scanner = RecordScanner::new(fixture(), 250);
        let mut request = ScanRequest::new(vec![operand(
            "Q1",
            Partition::Intake,
            "weight",
            Comparison::Exact { value: json!("61") },
        )]);
        request.expression_string = Some("Q1 AND Q2".to_string());

        let (tx, _rx) = mpsc::channel(64);
        let err = scanner.scan(&request, &tx).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidExpression { .. }));
    }

    #[tokio::test]
    async fn test_closed_sink_cancels_scan() {
        let scanner = RecordScanner::new(fixture(), 250);
        let request = ScanRequest::new(vec![operand(
            "Q1",
            Partition::Intake,
            "weight",
            Comparison::Exact { value: json!("61") },
        )]);

        let prepared = scanner.prepare(&request).await.unwrap();
        let (tx, rx) = mpsc::channel(64);
        drop(rx);
        let summary = prepared.run(&tx).await;
        assert!(summary.cancelled);
    }

    #[tokio::test]
    async fn test_roster_enumeration_is_stable() {
        let subtree = json!({
            "south": {"s1": {"p3": {}, "p1": {}}},
            "north": {"n1": {"p2": {}}}
        });
        let roster = enumerate_entities(&subtree);
        let ids: Vec<&str> = roster.iter().map(|k| k.entity_id.as_str()).collect();
        // serde_json objects iterate in sorted key order
        assert_eq!(ids, vec!["p2", "p1", "p3"]);
        assert_eq!(roster[0].region, "north");
    }
}
