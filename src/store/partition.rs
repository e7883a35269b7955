//! The five fixed logical partitions of the survey tree
//!
//! `demographics` holds one record per entity; the four sub-form
//! partitions hold append-only `{timestamp: snapshot}` histories keyed
//! region -> subregion -> entity-id.

use serde::{Deserialize, Serialize};

/// A top-level branch of the hierarchical survey store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Demographics,
    Intake,
    Clinical,
    Lifestyle,
    Followup,
}

impl Partition {
    /// All partitions, in canonical order
    pub const ALL: [Partition; 5] = [
        Partition::Demographics,
        Partition::Intake,
        Partition::Clinical,
        Partition::Lifestyle,
        Partition::Followup,
    ];

    /// The sub-form partition implicitly required whenever a
    /// demographic field is referenced
    pub const PRIMARY_FORM: Partition = Partition::Intake;

    /// Returns the partition's tree key
    pub fn name(&self) -> &'static str {
        match self {
            Partition::Demographics => "demographics",
            Partition::Intake => "intake",
            Partition::Clinical => "clinical",
            Partition::Lifestyle => "lifestyle",
            Partition::Followup => "followup",
        }
    }

    /// Returns true if this partition's leaves are timestamp-keyed
    /// snapshot histories
    pub fn is_versioned(&self) -> bool {
        !matches!(self, Partition::Demographics)
    }

    /// Roster discovery order: the first non-empty partition in this
    /// list defines the candidate roster.
    ///
    /// The order is an explicit function of whether the expression
    /// contains an OR, passed in by the scanner rather than inferred
    /// from the rendered expression text.
    pub fn roster_priority(or_present: bool) -> [Partition; 5] {
        if or_present {
            [
                Partition::Intake,
                Partition::Demographics,
                Partition::Clinical,
                Partition::Lifestyle,
                Partition::Followup,
            ]
        } else {
            [
                Partition::Demographics,
                Partition::Intake,
                Partition::Clinical,
                Partition::Lifestyle,
                Partition::Followup,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_are_tree_keys() {
        assert_eq!(Partition::Demographics.name(), "demographics");
        assert_eq!(Partition::Intake.name(), "intake");
        assert_eq!(Partition::Followup.name(), "followup");
    }

    #[test]
    fn test_only_demographics_is_unversioned() {
        for partition in Partition::ALL {
            assert_eq!(
                partition.is_versioned(),
                partition != Partition::Demographics
            );
        }
    }

    #[test]
    fn test_roster_priority_covers_all_partitions() {
        for or_present in [false, true] {
            let mut order = Partition::roster_priority(or_present).to_vec();
            order.sort();
            order.dedup();
            assert_eq!(order.len(), 5);
        }
    }

    #[test]
    fn test_roster_priority_depends_on_or() {
        assert_eq!(Partition::roster_priority(false)[0], Partition::Demographics);
        assert_eq!(Partition::roster_priority(true)[0], Partition::Intake);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Partition::Clinical).unwrap();
        assert_eq!(json, "\"clinical\"");
        let back: Partition = serde_json::from_str("\"lifestyle\"").unwrap();
        assert_eq!(back, Partition::Lifestyle);
    }
}
