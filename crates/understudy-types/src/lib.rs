//! Shared types for the understudy workspace.
//!
//! This crate provides the vocabulary the rule engine and the typed facade
//! have in common, breaking circular dependency chains:
//!
//! - [`value`] - type-erased captured values and runtime type identity
//! - [`operation`] - operation catalogs, descriptors, and instantiated keys
//! - [`error`] - the registration and synthesis error taxonomy
//! - [`report`] - serializable dispatch table summaries

pub mod error;
pub mod operation;
pub mod report;
pub mod value;

// Re-export the types nearly every consumer touches at crate root
pub use error::{RegistrationError, SynthesisError, UnstubbedOperation};
pub use operation::{
    OperationCatalog, OperationDescriptor, OperationKey, ParamShape, ResolvedShape,
};
pub use report::{DispatchKind, OperationSummary, TableSummary};
pub use value::{ArgVec, CallArgs, ErasedValue, TypeInfo};
