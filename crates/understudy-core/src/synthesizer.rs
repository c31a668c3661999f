//! Rule-set compilation into dispatch tables.
//!
//! Synthesis consumes the registration-ordered [`RuleSet`] and wires one
//! method body per instantiated operation:
//!
//! - any implementation rule wins the whole operation; the first one
//!   registered is kept and everything else targeting the key is shadowed,
//! - otherwise the completed matching rules become an ordered branch chain,
//! - pending rules are compiled out,
//! - a value-less completion is resolved to the declared return type's
//!   default synthesizer, and the absence of one aborts synthesis.
//!
//! Shadowed and pending rules are not errors, but they are design smells in
//! the rule set, so each one is logged and counted in the returned
//! [`TableSummary`].

use std::collections::HashMap;

use tracing::{debug, warn};

use understudy_types::operation::OperationKey;
use understudy_types::report::{DispatchKind, OperationSummary, TableSummary};
use understudy_types::SynthesisError;

use crate::delegate::ErasedDelegate;
use crate::dispatch::{Branch, BranchAction, DispatchTable, MethodBody, ReturnSource};
use crate::registry::{Completion, RuleBody, RuleSet};

#[derive(Default)]
struct OperationPlan {
    delegate: Option<ErasedDelegate>,
    branches: Vec<Branch>,
    shadowed: usize,
    pending: usize,
}

/// Compile `rules` into a dispatch table plus its synthesis summary.
pub fn synthesize_table(rules: RuleSet) -> Result<(DispatchTable, TableSummary), SynthesisError> {
    // HashMap iteration order is arbitrary; keep the first-seen key order
    // on the side so summaries stay deterministic.
    let mut order: Vec<OperationKey> = Vec::new();
    let mut plans: HashMap<OperationKey, OperationPlan> = HashMap::new();

    for rule in rules.into_rules() {
        let (key, body) = rule.into_parts();
        let plan = plans.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            OperationPlan::default()
        });

        match body {
            RuleBody::Implementation { delegate } => {
                if plan.delegate.is_some() {
                    warn!(operation = %key, "duplicate implementation rule ignored, first registration wins");
                    plan.shadowed += 1;
                } else {
                    plan.delegate = Some(delegate);
                }
            }
            RuleBody::Matching { args, completion } => match completion {
                Completion::Pending => {
                    debug!(operation = %key, "skipping rule declared without a completion");
                    plan.pending += 1;
                }
                Completion::Returns {
                    value,
                    declared,
                    callback,
                } => {
                    let source = match value {
                        Some(value) => ReturnSource::Value(value),
                        None => match declared.default_synthesizer() {
                            Some(synthesize) => ReturnSource::Default(synthesize),
                            None => {
                                return Err(SynthesisError::NoDefaultSynthesizer {
                                    operation: key.name().to_string(),
                                    return_type: declared.name().to_string(),
                                });
                            }
                        },
                    };
                    plan.branches.push(Branch {
                        expected: args,
                        action: BranchAction::Returns { source, callback },
                    });
                }
                Completion::Throws { factory } => plan.branches.push(Branch {
                    expected: args,
                    action: BranchAction::Throws { factory },
                }),
            },
        }
    }

    let mut bodies = HashMap::new();
    let mut operations = Vec::new();
    for key in order {
        if let Some(plan) = plans.remove(&key) {
            let (body, kind, reachable, shadowed) = match plan.delegate {
                Some(delegate) => {
                    if !plan.branches.is_empty() {
                        warn!(
                            operation = %key,
                            count = plan.branches.len(),
                            "matching rules shadowed by an implementation rule"
                        );
                    }
                    let shadowed = plan.shadowed + plan.branches.len();
                    (MethodBody::Delegate(delegate), DispatchKind::Delegate, 1, shadowed)
                }
                None => {
                    let reachable = plan.branches.len();
                    (
                        MethodBody::Branches(plan.branches),
                        DispatchKind::BranchChain,
                        reachable,
                        plan.shadowed,
                    )
                }
            };
            operations.push(OperationSummary {
                name: key.name().to_string(),
                signature: key.to_string(),
                kind,
                reachable,
                shadowed,
                pending: plan.pending,
            });
            bodies.insert(key, body);
        }
    }

    let summary = TableSummary { operations };
    debug!(
        operations = summary.operations.len(),
        reachable = summary.reachable_rules(),
        dead = summary.dead_rules(),
        "synthesized dispatch table"
    );
    Ok((DispatchTable::new(bodies), summary))
}
