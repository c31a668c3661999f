//! Serializable summaries of synthesized dispatch tables.
//!
//! A [`TableSummary`] is produced as a by-product of synthesis and describes
//! what actually got wired: which operations have dispatch bodies, which
//! path each one took, and how many declared rules ended up unreachable.
//! Summaries are plain data so they can go straight into logs or JSON
//! fixtures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dispatch body an operation was compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// Ordered branch chain of matching rules.
    BranchChain,
    /// A single implementation delegate.
    Delegate,
}

/// Synthesis outcome for one instantiated operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    /// Operation name as declared on the contract.
    pub name: String,
    /// Fully instantiated signature.
    pub signature: String,
    pub kind: DispatchKind,
    /// Branches reachable at call time; always 1 for delegates.
    pub reachable: usize,
    /// Rules shadowed by an implementation rule, or duplicate
    /// implementation rules beyond the first.
    pub shadowed: usize,
    /// Matching rules declared without a completion; they are skipped.
    pub pending: usize,
}

/// Everything synthesis wired into one dispatch table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub operations: Vec<OperationSummary>,
}

impl TableSummary {
    /// Summaries for every instantiation of the operation called `name`.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a OperationSummary> {
        self.operations.iter().filter(move |op| op.name == name)
    }

    /// Total rules that can still fire at call time.
    pub fn reachable_rules(&self) -> usize {
        self.operations.iter().map(|op| op.reachable).sum()
    }

    /// Total rules that can never fire.
    pub fn dead_rules(&self) -> usize {
        self.operations.iter().map(|op| op.shadowed + op.pending).sum()
    }
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(
                f,
                "{} [{}] reachable={} shadowed={} pending={}",
                op.signature,
                match op.kind {
                    DispatchKind::BranchChain => "branches",
                    DispatchKind::Delegate => "delegate",
                },
                op.reachable,
                op.shadowed,
                op.pending
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableSummary {
        TableSummary {
            operations: vec![
                OperationSummary {
                    name: "encode".into(),
                    signature: "encode(i64) -> String".into(),
                    kind: DispatchKind::BranchChain,
                    reachable: 2,
                    shadowed: 0,
                    pending: 1,
                },
                OperationSummary {
                    name: "decode".into(),
                    signature: "decode(String) -> i64".into(),
                    kind: DispatchKind::Delegate,
                    reachable: 1,
                    shadowed: 2,
                    pending: 0,
                },
            ],
        }
    }

    #[test]
    fn lookup_by_name_and_rule_totals() {
        let summary = sample();
        assert_eq!(summary.named("encode").count(), 1);
        assert_eq!(summary.named("missing").count(), 0);
        assert_eq!(summary.reachable_rules(), 3);
        assert_eq!(summary.dead_rules(), 3);
    }

    #[test]
    fn serializes_with_snake_case_kinds() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["operations"][0]["kind"], "branch_chain");
        assert_eq!(json["operations"][1]["kind"], "delegate");
    }
}
