//! The ordered rule registry.
//!
//! Every stubbing declaration lands here as a [`MethodRule`]: the
//! instantiated operation it targets plus a [`RuleBody`] that is either a
//! match condition awaiting its completion or an implementation delegate.
//! The [`RuleSet`] keeps rules in registration order, which is the only
//! ordering dispatch ever consults. Rules targeting the same operation
//! coexist; reconciling them is the synthesizer's job, not the registry's.
//!
//! Completions attach through the handle returned by the declaring call, so
//! a rule is always completed (or withdrawn) before the next one can be
//! declared. A rule whose handle was dropped without a completion stays
//! [`Completion::Pending`] and is compiled out later.

use std::any::Any;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use understudy_types::operation::{OperationCatalog, OperationKey};
use understudy_types::value::{ArgVec, ErasedValue, TypeInfo};
use understudy_types::RegistrationError;

use crate::capture::{resolve_sample, SampleCall, SampleRole};
use crate::delegate::{ErasedDelegate, StubFn};

/// Zero-argument side effect fired once per matched call.
pub type SideEffect = Mutex<Box<dyn FnMut()>>;

/// Builds a fresh fault payload each time a throwing rule matches.
pub type FaultFactory = Mutex<Box<dyn FnMut() -> Box<dyn Any + Send>>>;

// =============================================================================
// Rules
// =============================================================================

/// The completion attached to a matching rule.
pub enum Completion {
    /// Declared but never completed; compiled out at synthesis.
    Pending,
    /// Produce a value, optionally after firing a side effect.
    Returns {
        /// `None` is the value-less form: the declared type's default is
        /// synthesized instead.
        value: Option<ErasedValue>,
        declared: TypeInfo,
        callback: Option<SideEffect>,
    },
    /// Raise a fault built at match time.
    Throws { factory: FaultFactory },
}

impl Completion {
    pub fn is_pending(&self) -> bool {
        matches!(self, Completion::Pending)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Pending => f.write_str("Pending"),
            Completion::Returns { value, callback, .. } => f
                .debug_struct("Returns")
                .field("value", value)
                .field("has_callback", &callback.is_some())
                .finish(),
            Completion::Throws { .. } => f.write_str("Throws"),
        }
    }
}

/// How a rule participates in dispatch.
#[derive(Debug)]
pub enum RuleBody {
    /// Expected arguments plus a completion; one branch in the chain.
    Matching { args: ArgVec, completion: Completion },
    /// A delegate invoked with the real call arguments.
    Implementation { delegate: ErasedDelegate },
}

/// One registered behavior unit.
#[derive(Debug)]
pub struct MethodRule {
    key: OperationKey,
    body: RuleBody,
}

impl MethodRule {
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    pub fn body(&self) -> &RuleBody {
        &self.body
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            &self.body,
            RuleBody::Matching {
                completion: Completion::Pending,
                ..
            }
        )
    }

    pub(crate) fn into_parts(self) -> (OperationKey, RuleBody) {
        (self.key, self.body)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered rule collection for one contract.
#[derive(Debug, Default)]
pub struct RuleSet {
    catalog: OperationCatalog,
    rules: Vec<MethodRule>,
}

impl RuleSet {
    pub fn new(catalog: OperationCatalog) -> Self {
        RuleSet {
            catalog,
            rules: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodRule> {
        self.rules.iter()
    }

    pub(crate) fn into_rules(self) -> Vec<MethodRule> {
        self.rules
    }

    /// Declare a matching rule from a dynamic sample call.
    ///
    /// The sample is resolved against the catalog first; nothing invalid is
    /// ever stored. The returned handle attaches the completion.
    pub fn declare_matching(
        &mut self,
        sample: SampleCall,
    ) -> Result<RuleHandle<'_>, RegistrationError> {
        let resolved = resolve_sample(&self.catalog, sample, SampleRole::Matching)?;
        Ok(self.insert_matching(resolved.key, resolved.args))
    }

    /// Declare an implementation rule from a dynamic sample call.
    ///
    /// The sample's arguments only pin the operation identity; the delegate
    /// receives the real call arguments and its signature must agree with
    /// the resolved operation.
    pub fn declare_implementation<Args, R>(
        &mut self,
        sample: SampleCall,
        delegate: impl StubFn<Args, R>,
    ) -> Result<(), RegistrationError> {
        let resolved = resolve_sample(&self.catalog, sample, SampleRole::Implementation)?;
        let delegate = delegate.into_erased();
        delegate.signature().check_against(&resolved.key)?;
        self.insert_implementation(resolved.key, delegate);
        Ok(())
    }

    /// Insert a matching rule for an already-instantiated operation.
    ///
    /// Typed selector surfaces land here: the key was built from the same
    /// types the compiler checked, so there is nothing left to validate.
    pub fn insert_matching(&mut self, key: OperationKey, args: ArgVec) -> RuleHandle<'_> {
        debug!(operation = %key, rule = self.rules.len(), "registering matching rule");
        self.rules.push(MethodRule {
            key,
            body: RuleBody::Matching {
                args,
                completion: Completion::Pending,
            },
        });
        RuleHandle {
            rules: &mut self.rules,
        }
    }

    /// Insert an implementation rule for an already-instantiated operation.
    pub fn insert_implementation(&mut self, key: OperationKey, delegate: ErasedDelegate) {
        debug!(operation = %key, rule = self.rules.len(), "registering implementation rule");
        self.rules.push(MethodRule {
            key,
            body: RuleBody::Implementation { delegate },
        });
    }
}

// =============================================================================
// Completion handles
// =============================================================================

/// Completion attachment point for the matching rule just declared.
///
/// Holds the registry borrow, so the rule is completed or withdrawn before
/// anything else touches the set.
pub struct RuleHandle<'a> {
    rules: &'a mut Vec<MethodRule>,
}

impl<'a> RuleHandle<'a> {
    fn key(&self) -> &OperationKey {
        match self.rules.last() {
            Some(rule) => &rule.key,
            None => unreachable!("handle always follows a freshly inserted matching rule"),
        }
    }

    fn complete(self, completion: Completion) -> &'a mut Vec<MethodRule> {
        match self.rules.last_mut() {
            Some(MethodRule {
                body: RuleBody::Matching { completion: slot, .. },
                ..
            }) => *slot = completion,
            _ => unreachable!("handle always follows a freshly inserted matching rule"),
        }
        self.rules
    }

    fn withdraw(self, err: &RegistrationError) {
        debug!(code = err.code(), "withdrawing rule after failed completion");
        self.rules.pop();
    }

    /// Complete with a recorded value, cloned out to every matching call.
    ///
    /// The value must carry the declared return type and the clone
    /// capability. On rejection the pending rule is withdrawn; nothing
    /// partial stays registered.
    pub fn returns(self, value: ErasedValue) -> Result<ReturnsHandle<'a>, RegistrationError> {
        let declared = self.key().return_type();
        if value.type_id() != declared.id() {
            let err = RegistrationError::ReturnTypeMismatch {
                operation: self.key().name().to_string(),
                expected: declared.name().to_string(),
                supplied: value.type_name().to_string(),
            };
            self.withdraw(&err);
            return Err(err);
        }
        if !value.is_cloneable() {
            let err = RegistrationError::UncloneableReturnValue {
                operation: self.key().name().to_string(),
            };
            self.withdraw(&err);
            return Err(err);
        }
        let rules = self.complete(Completion::Returns {
            value: Some(value),
            declared,
            callback: None,
        });
        Ok(ReturnsHandle { rules })
    }

    /// Complete without a value; synthesis materializes the declared return
    /// type's default, if the catalog opted one in.
    pub fn returns_default(self) -> ReturnsHandle<'a> {
        let declared = self.key().return_type();
        self.returns_default_of(declared)
    }

    /// Value-less completion with an explicit declared-type carrier, for
    /// typed surfaces that know a `Default` impl the catalog entry does not
    /// record.
    pub fn returns_default_of(self, declared: TypeInfo) -> ReturnsHandle<'a> {
        debug_assert_eq!(declared.id(), self.key().return_type().id());
        let rules = self.complete(Completion::Returns {
            value: None,
            declared,
            callback: None,
        });
        ReturnsHandle { rules }
    }

    /// Complete by raising a fault; `factory` builds a fresh payload each
    /// time the rule matches.
    pub fn throws(self, factory: impl FnMut() -> Box<dyn Any + Send> + 'static) {
        self.complete(Completion::Throws {
            factory: Mutex::new(Box::new(factory)),
        });
    }
}

/// Side-effect attachment point for a rule completed with a value.
#[derive(Debug)]
pub struct ReturnsHandle<'a> {
    rules: &'a mut Vec<MethodRule>,
}

impl ReturnsHandle<'_> {
    /// Fire `callback` once per matched call, before the value is produced.
    pub fn subscribe(self, callback: impl FnMut() + 'static) {
        match self.rules.last_mut() {
            Some(MethodRule {
                body:
                    RuleBody::Matching {
                        completion: Completion::Returns { callback: slot, .. },
                        ..
                    },
                ..
            }) => *slot = Some(Mutex::new(Box::new(callback))),
            _ => unreachable!("handle always follows a rule completed with a value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understudy_types::operation::OperationDescriptor;

    fn catalog() -> OperationCatalog {
        OperationCatalog::new()
            .with(
                OperationDescriptor::new("encode")
                    .with_param::<i64>()
                    .with_return::<String>(),
            )
            .with(
                OperationDescriptor::new("poll")
                    .with_defaultable_return::<i64>(),
            )
    }

    #[test]
    fn declare_and_complete_a_matching_rule() {
        let mut rules = RuleSet::new(catalog());
        rules
            .declare_matching(SampleCall::operation("encode").literal(7i64))
            .expect("valid sample")
            .returns(ErasedValue::cloneable(String::from("seven")))
            .expect("valid completion");

        assert_eq!(rules.len(), 1);
        let rule = rules.iter().next().expect("one rule");
        assert!(!rule.is_pending());
        assert_eq!(rule.key().name(), "encode");
    }

    #[test]
    fn return_type_mismatch_withdraws_the_rule() {
        let mut rules = RuleSet::new(catalog());
        let err = rules
            .declare_matching(SampleCall::operation("encode").literal(7i64))
            .expect("valid sample")
            .returns(ErasedValue::cloneable(5i32))
            .expect_err("wrong return type");

        assert!(matches!(err, RegistrationError::ReturnTypeMismatch { .. }));
        assert!(rules.is_empty(), "rejected rule must not linger");
    }

    #[test]
    fn uncloneable_return_withdraws_the_rule() {
        let mut rules = RuleSet::new(catalog());
        // Comparable capture keeps equality but not cloning.
        let err = rules
            .declare_matching(SampleCall::operation("encode").literal(7i64))
            .expect("valid sample")
            .returns(ErasedValue::comparable(String::from("seven")))
            .expect_err("uncloneable value");

        assert!(matches!(
            err,
            RegistrationError::UncloneableReturnValue { .. }
        ));
        assert!(rules.is_empty());
    }

    #[test]
    fn dropped_handles_leave_a_pending_rule() {
        let mut rules = RuleSet::new(catalog());
        let _ = rules.declare_matching(SampleCall::operation("encode").literal(7i64));
        assert_eq!(rules.len(), 1);
        assert!(rules.iter().next().expect("one rule").is_pending());
    }

    #[test]
    fn rules_keep_registration_order() {
        let mut rules = RuleSet::new(catalog());
        for value in [1i64, 2, 3] {
            rules
                .declare_matching(SampleCall::operation("encode").literal(value))
                .expect("valid sample")
                .returns(ErasedValue::cloneable(value.to_string()))
                .expect("valid completion");
        }
        let order: Vec<String> = rules
            .iter()
            .map(|rule| match rule.body() {
                RuleBody::Matching { args, .. } => args[0].render(),
                RuleBody::Implementation { .. } => panic!("no delegates registered"),
            })
            .collect();
        assert_eq!(order, ["1", "2", "3"]);
    }

    #[test]
    fn implementation_rules_validate_the_delegate_signature() {
        let mut rules = RuleSet::new(catalog());
        let err = rules
            .declare_implementation(
                SampleCall::operation("encode").opaque(0i64),
                |v: i32| v.to_string(),
            )
            .expect_err("parameter type disagrees");
        assert!(matches!(
            err,
            RegistrationError::DelegateSignatureMismatch { .. }
        ));
        assert!(rules.is_empty());

        rules
            .declare_implementation(
                SampleCall::operation("encode").opaque(0i64),
                |v: i64| v.to_string(),
            )
            .expect("matching signature");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn value_less_completion_keeps_the_declared_type() {
        let mut rules = RuleSet::new(catalog());
        rules
            .declare_matching(SampleCall::operation("poll"))
            .expect("valid sample")
            .returns_default();

        match rules.iter().next().expect("one rule").body() {
            RuleBody::Matching {
                completion: Completion::Returns { value, declared, .. },
                ..
            } => {
                assert!(value.is_none());
                assert!(declared.has_default());
            }
            other => panic!("expected a value-less completion, got {other:?}"),
        };
    }

    #[test]
    fn subscribe_attaches_to_the_completed_rule() {
        let mut rules = RuleSet::new(catalog());
        rules
            .declare_matching(SampleCall::operation("encode").literal(7i64))
            .expect("valid sample")
            .returns(ErasedValue::cloneable(String::from("seven")))
            .expect("valid completion")
            .subscribe(|| {});

        match rules.iter().next().expect("one rule").body() {
            RuleBody::Matching {
                completion: Completion::Returns { callback, .. },
                ..
            } => assert!(callback.is_some()),
            other => panic!("expected a completed matching rule, got {other:?}"),
        };
    }
}
