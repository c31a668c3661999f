//! The rule builder and memoized stand-in accessor for one contract.
//!
//! A [`Double`] accumulates rules against the contract's catalog, then
//! synthesizes the stand-in on first [`instance`](Double::instance) access
//! and memoizes it. Everything declared before that access is compiled in;
//! registration afterwards is inert, exactly like reconfiguring a stage
//! after the understudy has walked on.
//!
//! The typed chain is statically checked end to end, so its steps do not
//! return `Result`: the selector fixes the argument tuple and return type,
//! and the engine-level validations it subsumes cannot fail. The dynamic
//! sample surface in `understudy_core::registry` is the fallible twin.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::panic;

use tracing::debug;

use understudy_core::delegate::StubFn;
use understudy_core::registry::{self, RuleSet};
use understudy_core::synthesizer::synthesize_table;
use understudy_types::operation::OperationKey;
use understudy_types::report::TableSummary;
use understudy_types::value::{ErasedValue, TypeInfo};
use understudy_types::SynthesisError;

use crate::contract::Contract;
use crate::selector::{IntoSampleArgs, Selector};

/// Declarative test double for contract `C`.
///
/// ```ignore
/// let mut codec = double_of::<dyn WireCodec>();
/// codec.on(wire_codec::encode()).given((7,)).returns("0x07".to_string());
/// codec.implement(wire_codec::checksum(), |frame: String| frame.len() as u64);
///
/// let instance = codec.instance();
/// assert_eq!(instance.encode(7), "0x07");
/// ```
pub struct Double<C: Contract + ?Sized> {
    rules: RuleSet,
    instance: Option<C::Instance>,
    summary: Option<TableSummary>,
}

/// Create a double for contract `C`.
pub fn double_of<C: Contract + ?Sized>() -> Double<C> {
    Double::new()
}

impl<C: Contract + ?Sized> Double<C> {
    pub fn new() -> Self {
        Double {
            rules: RuleSet::new(C::catalog()),
            instance: None,
            summary: None,
        }
    }

    /// Start a matching rule for the operation `selector` names.
    pub fn on<Args, Ret>(&mut self, selector: Selector<C, Args, Ret>) -> Stubbing<'_, C, Args, Ret> {
        Stubbing {
            rules: &mut self.rules,
            key: selector.into_key(),
            _marker: PhantomData,
        }
    }

    /// Register an implementation rule: `body` handles every call to the
    /// operation, receiving the real call arguments.
    pub fn implement<Args, Ret>(
        &mut self,
        selector: Selector<C, Args, Ret>,
        body: impl StubFn<Args, Ret>,
    ) {
        // Selector and closure share `Args`/`Ret`, so the runtime signature
        // check the dynamic surface needs is already discharged here.
        self.rules
            .insert_implementation(selector.into_key(), body.into_erased());
    }

    /// The synthesized stand-in, built on first access and memoized.
    ///
    /// Panics with the [`SynthesisError`] as payload when the accumulated
    /// rules cannot be compiled; [`try_instance`](Double::try_instance) is
    /// the propagating form.
    pub fn instance(&mut self) -> &C::Instance {
        match self.try_instance() {
            Ok(instance) => instance,
            Err(err) => panic::panic_any(err),
        }
    }

    /// The synthesized stand-in, or the synthesis failure.
    pub fn try_instance(&mut self) -> Result<&C::Instance, SynthesisError> {
        if self.instance.is_none() {
            let rules = mem::take(&mut self.rules);
            debug!(rules = rules.len(), "synthesizing stand-in instance");
            let (table, summary) = synthesize_table(rules)?;
            self.summary = Some(summary);
            self.instance = Some(C::synthesize(table));
        }
        match &self.instance {
            Some(instance) => Ok(instance),
            None => unreachable!("instance memoized above"),
        }
    }

    /// Synthesis summary; `None` until the first instance access.
    pub fn summary(&self) -> Option<&TableSummary> {
        self.summary.as_ref()
    }

    /// Rules declared so far. Zero after synthesis, which consumes them.
    pub fn pending_rules(&self) -> usize {
        self.rules.len()
    }
}

impl<C: Contract + ?Sized> Default for Double<C> {
    fn default() -> Self {
        Double::new()
    }
}

impl<C: Contract + ?Sized> fmt::Debug for Double<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Double")
            .field("rules", &self.rules.len())
            .field("synthesized", &self.instance.is_some())
            .finish()
    }
}

/// A matching rule awaiting its expected arguments.
pub struct Stubbing<'a, C: Contract + ?Sized, Args, Ret> {
    rules: &'a mut RuleSet,
    key: OperationKey,
    _marker: PhantomData<fn(&C, Args) -> Ret>,
}

impl<'a, C: Contract + ?Sized, Args, Ret> Stubbing<'a, C, Args, Ret> {
    /// Fix the expected arguments; the rule matches calls whose arguments
    /// equal these, by each type's natural equality.
    pub fn given(self, args: impl IntoSampleArgs<Args>) -> MatchHandle<'a, Ret> {
        MatchHandle {
            inner: self.rules.insert_matching(self.key, args.into_sample_args()),
            _ret: PhantomData,
        }
    }
}

/// A matching rule awaiting its completion.
pub struct MatchHandle<'a, Ret> {
    inner: registry::RuleHandle<'a>,
    _ret: PhantomData<fn() -> Ret>,
}

impl<'a, Ret> MatchHandle<'a, Ret> {
    /// Complete with a recorded value, cloned out to every matching call.
    pub fn returns(self, value: Ret) -> ReturnsHandle<'a>
    where
        Ret: Any + Clone + fmt::Debug,
    {
        match self.inner.returns(ErasedValue::cloneable(value)) {
            Ok(inner) => ReturnsHandle { inner },
            // `Ret` is the selector's return type and the capture above
            // keeps the clone capability.
            Err(err) => unreachable!("typed completion rejected: {err}"),
        }
    }

    /// Complete with the return type's default value, synthesized fresh per
    /// matching call.
    pub fn returns_default(self) -> ReturnsHandle<'a>
    where
        Ret: Any + Default,
    {
        ReturnsHandle {
            inner: self.inner.returns_default_of(TypeInfo::with_default::<Ret>()),
        }
    }

    /// Complete by raising `F::default()` on every matching call.
    pub fn throws<F>(self)
    where
        F: Any + Send + Default,
    {
        self.inner
            .throws(|| Box::new(F::default()) as Box<dyn Any + Send>);
    }

    /// Complete by raising a fault built by `factory`, evaluated once per
    /// matching call.
    pub fn throws_with<F>(self, mut factory: impl FnMut() -> F + 'static)
    where
        F: Any + Send,
    {
        self.inner
            .throws(move || Box::new(factory()) as Box<dyn Any + Send>);
    }
}

/// A completed rule accepting an optional side effect.
pub struct ReturnsHandle<'a> {
    inner: registry::ReturnsHandle<'a>,
}

impl ReturnsHandle<'_> {
    /// Fire `callback` once per matching call, before the value is
    /// produced.
    pub fn subscribe(self, callback: impl FnMut() + 'static) {
        self.inner.subscribe(callback);
    }
}
