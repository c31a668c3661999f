//! Understudy
//!
//! Declarative test doubles for trait contracts.
//!
//! A double is configured by rules, not by hand-written fakes: declare a
//! contract with [`contract!`], state what each operation should do for
//! which arguments, and ask for the synthesized stand-in. Matching rules
//! pair expected arguments with a recorded value, a default, or a fault;
//! implementation rules route the whole operation to a closure. Rules are
//! evaluated in registration order and the first full match wins.
//!
//! # Features
//!
//! - **Typed rule chains**: `on(selector).given(args).returns(value)`,
//!   checked end to end by the compiler, no `Result` to thread
//! - **Generic operations**: each instantiation is stubbed and dispatched
//!   independently
//! - **Faults**: unstubbed calls and recorded faults unwind with typed
//!   payloads tests can catch and downcast
//! - **Wiring summaries**: synthesis reports reachable, shadowed, and
//!   pending rules per operation
//!
//! # Example
//!
//! ```ignore
//! use understudy::{contract, double_of};
//!
//! contract! {
//!     pub trait WireCodec {
//!         fn encode(&self, value: i64) -> String;
//!         fn parse<T>(&self, raw: String) -> T;
//!     }
//!     proxy WireCodecProxy;
//!     selectors mod wire_codec;
//! }
//!
//! let mut codec = double_of::<dyn WireCodec>();
//! codec.on(wire_codec::encode()).given((7,)).returns("0x07".to_string());
//! codec.on(wire_codec::parse::<i64>()).given(("9".to_string(),)).returns(9);
//!
//! let codec = codec.instance();
//! assert_eq!(codec.encode(7), "0x07");
//! assert_eq!(codec.parse::<i64>("9".to_string()), 9);
//! ```
//!
//! The typed surface sits on the engine crates: `understudy-core` owns rule
//! registration, table synthesis, and dispatch; `understudy-types` the
//! shared vocabulary. Dynamic, string-keyed registration against hand-built
//! catalogs lives in `understudy_core::registry` and is re-exported here.

pub mod contract;
pub mod double;
pub mod selector;

mod macros;

pub use contract::Contract;
pub use double::{double_of, Double, MatchHandle, ReturnsHandle, Stubbing};
pub use selector::{bound, value, wrapped, ArgExpr, IntoSampleArgs, Selector};

// Engine surface, re-exported for generated code and dynamic-surface users.
pub use understudy_core::capture::{resolve_sample, SampleCall, SampleRole};
pub use understudy_core::delegate::{ErasedDelegate, StubFn};
pub use understudy_core::dispatch::{downcast_return, DispatchTable};
pub use understudy_core::registry::RuleSet;
pub use understudy_core::synthesizer::synthesize_table;
pub use understudy_types::error::{RegistrationError, SynthesisError, UnstubbedOperation};
pub use understudy_types::operation::{OperationCatalog, OperationDescriptor, OperationKey};
pub use understudy_types::report::{DispatchKind, OperationSummary, TableSummary};
pub use understudy_types::value::{CallArgs, ErasedValue, TypeInfo};
