//! Understudy Core
//!
//! Rule registry and dispatch synthesis engine for test doubles.
//!
//! This crate implements the behavior pipeline behind a synthesized
//! stand-in: rules are declared against an operation catalog, compiled into
//! a dispatch table, and driven by whatever proxy mechanism sits on top.
//! The engine never sees a trait object or a generated type; it works
//! entirely in terms of [`OperationKey`]s and type-erased values, which is
//! what keeps the proxy surface swappable.
//!
//! # Features
//!
//! - **Sample resolution**: dynamic sample calls validated against the
//!   catalog, with structural overload selection
//! - **Ordered rules**: matching rules, implementation delegates, and
//!   completions, kept strictly in registration order
//! - **Table synthesis**: per-operation reconciliation into branch chains
//!   or a single delegate, with a serializable wiring summary
//! - **Call dispatch**: first-full-match evaluation, side effects, recorded
//!   faults raised by unwinding
//!
//! # Core Modules
//!
//! - [`capture`]: sample calls and their resolution against a catalog
//! - [`registry`]: the ordered rule set and completion handles
//! - [`synthesizer`]: rule-set compilation into dispatch tables
//! - [`dispatch`]: call-time table dispatch and the fault channel
//! - [`delegate`]: implementation closures with erased signatures
//!
//! # Example
//!
//! ```ignore
//! use understudy_core::capture::SampleCall;
//! use understudy_core::registry::RuleSet;
//! use understudy_core::synthesizer::synthesize_table;
//!
//! let mut rules = RuleSet::new(catalog);
//! rules
//!     .declare_matching(SampleCall::operation("encode").literal(7i64))?
//!     .returns(ErasedValue::cloneable(String::from("seven")))?;
//!
//! let (table, summary) = synthesize_table(rules)?;
//! // Hand `table` to a proxy and call through it...
//! ```

pub mod capture;
pub mod delegate;
pub mod dispatch;
pub mod registry;
pub mod synthesizer;

pub use capture::{resolve_sample, ResolvedSample, SampleCall, SampleRole};
pub use delegate::{DelegateSignature, ErasedDelegate, StubFn};
pub use dispatch::{downcast_return, DispatchTable};
pub use registry::{Completion, MethodRule, ReturnsHandle, RuleBody, RuleHandle, RuleSet};
pub use synthesizer::synthesize_table;

// Re-exported so engine-level callers need only one crate in scope.
pub use understudy_types::operation::OperationKey;
