//! Call-time dispatch through a synthesized table.
//!
//! A [`DispatchTable`] maps instantiated operation keys to compiled method
//! bodies. Proxy methods funnel every call into [`DispatchTable::invoke`]
//! with their arguments boxed; the table either produces a boxed return
//! value or raises a fault by unwinding.
//!
//! The fault channel is deliberate: a synthesized stand-in has no `Result`
//! in its signatures, so "no rule matched this call" surfaces as a panic
//! carrying [`UnstubbedOperation`], and a recorded fault resumes the unwind
//! with the payload the rule's factory built. Tests observe both with
//! `catch_unwind` and a downcast.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic;

use tracing::{debug, error, trace};

use understudy_types::error::UnstubbedOperation;
use understudy_types::operation::OperationKey;
use understudy_types::value::{ArgVec, CallArgs, ErasedValue};

use crate::delegate::ErasedDelegate;
use crate::registry::{FaultFactory, SideEffect};

/// Where a matched branch takes its produced value from.
pub(crate) enum ReturnSource {
    /// Clone the recorded value, once per matched call.
    Value(ErasedValue),
    /// Synthesize the declared type's default, once per matched call.
    Default(fn() -> Box<dyn Any>),
}

/// What a matched branch does.
pub(crate) enum BranchAction {
    Returns {
        source: ReturnSource,
        callback: Option<SideEffect>,
    },
    Throws {
        factory: FaultFactory,
    },
}

/// One compiled matching rule.
pub(crate) struct Branch {
    /// Expected arguments, positionally aligned with the operation's
    /// parameters.
    pub(crate) expected: ArgVec,
    pub(crate) action: BranchAction,
}

/// Compiled dispatch body for one operation.
pub(crate) enum MethodBody {
    /// Ordered branch chain; first full match wins.
    Branches(Vec<Branch>),
    /// Single implementation delegate receiving the real arguments.
    Delegate(ErasedDelegate),
}

/// Compiled dispatch bodies keyed by instantiated operation identity.
pub struct DispatchTable {
    bodies: HashMap<OperationKey, MethodBody>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("operations", &self.bodies.len())
            .finish()
    }
}

impl DispatchTable {
    pub(crate) fn new(bodies: HashMap<OperationKey, MethodBody>) -> Self {
        DispatchTable { bodies }
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.bodies.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Dispatch one call.
    ///
    /// Unwinds with an [`UnstubbedOperation`] payload when no rule applies,
    /// and with the recorded fault payload when a throwing rule matches.
    pub fn invoke(&self, key: &OperationKey, args: CallArgs) -> Box<dyn Any> {
        if args.len() != key.arity() {
            panic!(
                "dispatch for `{key}` received {} argument(s), operation declares {}",
                args.len(),
                key.arity()
            );
        }
        match self.bodies.get(key) {
            None => raise_unstubbed(key),
            Some(MethodBody::Delegate(delegate)) => {
                debug!(operation = %key, "dispatching to implementation delegate");
                delegate.invoke(args)
            }
            Some(MethodBody::Branches(branches)) => dispatch_branches(key, branches, args),
        }
    }
}

fn dispatch_branches(key: &OperationKey, branches: &[Branch], args: CallArgs) -> Box<dyn Any> {
    'branches: for (index, branch) in branches.iter().enumerate() {
        for (position, (expected, actual)) in branch.expected.iter().zip(&args).enumerate() {
            if expected.equals(actual.as_ref()) != Some(true) {
                trace!(operation = %key, branch = index, position, "argument mismatch, next branch");
                continue 'branches;
            }
        }
        debug!(operation = %key, branch = index, "branch matched");
        return branch.action.perform(key);
    }
    raise_unstubbed(key)
}

impl BranchAction {
    fn perform(&self, key: &OperationKey) -> Box<dyn Any> {
        match self {
            BranchAction::Returns { source, callback } => {
                if let Some(callback) = callback {
                    let mut callback = callback.lock();
                    (*callback)();
                }
                match source {
                    ReturnSource::Value(value) => match value.clone_value() {
                        Some(out) => out,
                        // Clone capability is validated at registration.
                        None => panic!("recorded return value for `{key}` lost its clone capability"),
                    },
                    ReturnSource::Default(synthesize) => synthesize(),
                }
            }
            BranchAction::Throws { factory } => {
                let payload = {
                    let mut factory = factory.lock();
                    (*factory)()
                };
                debug!(operation = %key, "raising recorded fault");
                panic::resume_unwind(payload)
            }
        }
    }
}

fn raise_unstubbed(key: &OperationKey) -> ! {
    error!(operation = %key, "operation not stubbed");
    panic::panic_any(UnstubbedOperation::new(key))
}

/// Downcast a dispatch result to the operation's declared return type.
///
/// Generated proxy methods call this on their tail; the downcast cannot
/// fail for tables built through the registry, which validates every
/// completion against the declared return.
pub fn downcast_return<R: Any>(key: &OperationKey, result: Box<dyn Any>) -> R {
    match result.downcast::<R>() {
        Ok(value) => *value,
        Err(_) => panic!("dispatch for `{key}` produced a value of the wrong type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use smallvec::smallvec;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;
    use std::cell::Cell;
    use understudy_types::value::TypeInfo;

    fn boxed<T: Any>(value: T) -> Box<dyn Any> {
        Box::new(value)
    }

    fn echo_key() -> OperationKey {
        OperationKey::of("echo")
            .with_param(TypeInfo::of::<i32>())
            .with_return(TypeInfo::of::<i32>())
    }

    fn returns(value: ErasedValue) -> BranchAction {
        BranchAction::Returns {
            source: ReturnSource::Value(value),
            callback: None,
        }
    }

    fn table_of(key: OperationKey, body: MethodBody) -> DispatchTable {
        let mut bodies = HashMap::new();
        bodies.insert(key, body);
        DispatchTable::new(bodies)
    }

    fn unstubbed_payload(result: Result<Box<dyn Any>, Box<dyn Any + Send>>) -> UnstubbedOperation {
        let payload = result.err().expect("call must fault");
        *payload
            .downcast::<UnstubbedOperation>()
            .expect("unstubbed payload")
    }

    #[test]
    fn first_full_match_wins_in_registration_order() {
        let key = echo_key();
        let body = MethodBody::Branches(vec![
            Branch {
                expected: smallvec![ErasedValue::comparable(1i32)],
                action: returns(ErasedValue::cloneable(10i32)),
            },
            Branch {
                expected: smallvec![ErasedValue::comparable(1i32)],
                action: returns(ErasedValue::cloneable(99i32)),
            },
            Branch {
                expected: smallvec![ErasedValue::comparable(2i32)],
                action: returns(ErasedValue::cloneable(20i32)),
            },
        ]);
        let table = table_of(key.clone(), body);

        let first = table.invoke(&key, smallvec![boxed(1i32)]);
        assert_eq!(downcast_return::<i32>(&key, first), 10);
        let later = table.invoke(&key, smallvec![boxed(2i32)]);
        assert_eq!(downcast_return::<i32>(&key, later), 20);
    }

    #[test]
    fn exhausted_chain_faults_with_the_operation_identity() {
        let key = echo_key();
        let body = MethodBody::Branches(vec![Branch {
            expected: smallvec![ErasedValue::comparable(1i32)],
            action: returns(ErasedValue::cloneable(10i32)),
        }]);
        let table = table_of(key.clone(), body);

        let fault = unstubbed_payload(catch_unwind(AssertUnwindSafe(|| {
            table.invoke(&key, smallvec![boxed(5i32)])
        })));
        assert_eq!(fault.operation, "echo");
        assert!(fault.signature.contains("i32"), "got {}", fault.signature);
    }

    #[test]
    fn unknown_operations_fault_the_same_way() {
        let table = DispatchTable::new(HashMap::new());
        let key = echo_key();
        let fault = unstubbed_payload(catch_unwind(AssertUnwindSafe(|| {
            table.invoke(&key, smallvec![boxed(1i32)])
        })));
        assert_eq!(fault.operation, "echo");
    }

    #[test]
    fn callbacks_fire_once_per_matched_call_only() {
        let key = echo_key();
        let calls = Rc::new(Cell::new(0u32));
        let seen = calls.clone();
        let body = MethodBody::Branches(vec![Branch {
            expected: smallvec![ErasedValue::comparable(1i32)],
            action: BranchAction::Returns {
                source: ReturnSource::Value(ErasedValue::cloneable(10i32)),
                callback: Some(Mutex::new(Box::new(move || seen.set(seen.get() + 1)))),
            },
        }]);
        let table = table_of(key.clone(), body);

        table.invoke(&key, smallvec![boxed(1i32)]);
        table.invoke(&key, smallvec![boxed(1i32)]);
        assert_eq!(calls.get(), 2);

        // A miss must not fire the callback.
        let _ = catch_unwind(AssertUnwindSafe(|| {
            table.invoke(&key, smallvec![boxed(9i32)])
        }));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn fault_factories_build_a_fresh_payload_per_match() {
        #[derive(Debug)]
        struct Numbered(u32);

        let key = echo_key();
        let mut next = 0u32;
        let body = MethodBody::Branches(vec![Branch {
            expected: smallvec![ErasedValue::comparable(1i32)],
            action: BranchAction::Throws {
                factory: Mutex::new(Box::new(move || {
                    next += 1;
                    Box::new(Numbered(next))
                })),
            },
        }]);
        let table = table_of(key.clone(), body);

        for expected in 1..=2u32 {
            let payload = catch_unwind(AssertUnwindSafe(|| {
                table.invoke(&key, smallvec![boxed(1i32)])
            }))
            .err()
            .expect("throwing branch");
            let fault = payload.downcast::<Numbered>().expect("recorded fault type");
            assert_eq!(fault.0, expected);
        }
    }

    #[test]
    fn default_sources_synthesize_per_call() {
        let key = OperationKey::of("poll").with_return(TypeInfo::with_default::<i64>());
        let synthesize = TypeInfo::with_default::<i64>()
            .default_synthesizer()
            .expect("declared default");
        let body = MethodBody::Branches(vec![Branch {
            expected: ArgVec::new(),
            action: BranchAction::Returns {
                source: ReturnSource::Default(synthesize),
                callback: None,
            },
        }]);
        let table = table_of(key.clone(), body);

        let out = table.invoke(&key, CallArgs::new());
        assert_eq!(downcast_return::<i64>(&key, out), 0);
    }

    #[test]
    fn delegates_receive_the_real_arguments() {
        let key = echo_key();
        let body = MethodBody::Delegate(ErasedDelegate::new(|v: i32| v * 2));
        let table = table_of(key.clone(), body);

        let out = table.invoke(&key, smallvec![boxed(21i32)]);
        assert_eq!(downcast_return::<i32>(&key, out), 42);
    }

    #[test]
    fn arity_disagreement_is_a_programming_error() {
        let key = echo_key();
        let table = table_of(key.clone(), MethodBody::Branches(Vec::new()));
        let result = catch_unwind(AssertUnwindSafe(|| table.invoke(&key, CallArgs::new())));
        assert!(result.is_err());
    }
}
