//! Error codes and diagnostic messages for rule registration and synthesis.
//!
//! # Error Taxonomy
//!
//! The stubbing pipeline uses a phase-based error taxonomy:
//!
//! | Phase | Purpose | Error Codes |
//! |-------|---------|-------------|
//! | Registration | Validate sample calls against the catalog | E101-E110 |
//! | Synthesis | Compile rules into a dispatch table | E201 |
//!
//! Registration errors surface while rules are being declared, before any
//! proxy exists. Synthesis errors surface on first instance access, when the
//! accumulated rules are compiled. Faults raised by the synthesized proxy at
//! call time are panics, not values of these types; see the dispatch module
//! of `understudy-core`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operation::OperationKey;

// =============================================================================
// Registration Errors (E1xx)
// =============================================================================

/// A rule declaration that the catalog rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistrationError {
    /// E101: no operation with the sampled name exists on the contract.
    UnknownOperation { operation: String },
    /// E102: the sample supplied the wrong number of type arguments.
    TypeArgumentMismatch {
        operation: String,
        expected: usize,
        supplied: usize,
    },
    /// E103: the sample supplied the wrong number of arguments.
    ParameterCountMismatch {
        operation: String,
        expected: usize,
        supplied: usize,
    },
    /// E104: an argument's type does not match the declared parameter.
    ParameterTypeMismatch {
        operation: String,
        position: usize,
        expected: String,
        supplied: String,
    },
    /// E105: several overloads share the name but none fits the sample.
    NoMatchingOverload { operation: String, candidates: usize },
    /// E106: a matching rule captured an argument without the equality
    /// capability, so the rule could never match a call.
    UnsupportedShape { operation: String, position: usize },
    /// E107: the operation's return type depends on its instantiation and
    /// the registration surface cannot resolve it.
    UnresolvableReturnShape { operation: String },
    /// E108: the completion value's type does not match the declared return.
    ReturnTypeMismatch {
        operation: String,
        expected: String,
        supplied: String,
    },
    /// E109: the completion value cannot be cloned for replay.
    UncloneableReturnValue { operation: String },
    /// E110: an implementation delegate's signature disagrees with the
    /// operation it was registered for.
    DelegateSignatureMismatch { operation: String, detail: String },
}

impl RegistrationError {
    /// Numeric code for summaries and structured logs.
    pub fn code(&self) -> u16 {
        match self {
            RegistrationError::UnknownOperation { .. } => 101,
            RegistrationError::TypeArgumentMismatch { .. } => 102,
            RegistrationError::ParameterCountMismatch { .. } => 103,
            RegistrationError::ParameterTypeMismatch { .. } => 104,
            RegistrationError::NoMatchingOverload { .. } => 105,
            RegistrationError::UnsupportedShape { .. } => 106,
            RegistrationError::UnresolvableReturnShape { .. } => 107,
            RegistrationError::ReturnTypeMismatch { .. } => 108,
            RegistrationError::UncloneableReturnValue { .. } => 109,
            RegistrationError::DelegateSignatureMismatch { .. } => 110,
        }
    }

    /// The operation the rejected rule targeted.
    pub fn operation(&self) -> &str {
        match self {
            RegistrationError::UnknownOperation { operation }
            | RegistrationError::TypeArgumentMismatch { operation, .. }
            | RegistrationError::ParameterCountMismatch { operation, .. }
            | RegistrationError::ParameterTypeMismatch { operation, .. }
            | RegistrationError::NoMatchingOverload { operation, .. }
            | RegistrationError::UnsupportedShape { operation, .. }
            | RegistrationError::UnresolvableReturnShape { operation }
            | RegistrationError::ReturnTypeMismatch { operation, .. }
            | RegistrationError::UncloneableReturnValue { operation }
            | RegistrationError::DelegateSignatureMismatch { operation, .. } => operation,
        }
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::UnknownOperation { operation } => {
                write!(f, "E101: no operation named `{operation}` on the contract")
            }
            RegistrationError::TypeArgumentMismatch {
                operation,
                expected,
                supplied,
            } => write!(
                f,
                "E102: operation `{operation}` takes {expected} type argument(s), sample supplied {supplied}"
            ),
            RegistrationError::ParameterCountMismatch {
                operation,
                expected,
                supplied,
            } => write!(
                f,
                "E103: operation `{operation}` takes {expected} argument(s), sample supplied {supplied}"
            ),
            RegistrationError::ParameterTypeMismatch {
                operation,
                position,
                expected,
                supplied,
            } => write!(
                f,
                "E104: operation `{operation}` argument {position} expects `{expected}`, sample supplied `{supplied}`"
            ),
            RegistrationError::NoMatchingOverload {
                operation,
                candidates,
            } => write!(
                f,
                "E105: none of the {candidates} overload(s) of `{operation}` fit the sample call"
            ),
            RegistrationError::UnsupportedShape {
                operation,
                position,
            } => write!(
                f,
                "E106: argument {position} of the `{operation}` sample has no equality capability; capture it as a comparable value"
            ),
            RegistrationError::UnresolvableReturnShape { operation } => write!(
                f,
                "E107: the return type of `{operation}` depends on its instantiation; register through a typed selector"
            ),
            RegistrationError::ReturnTypeMismatch {
                operation,
                expected,
                supplied,
            } => write!(
                f,
                "E108: operation `{operation}` returns `{expected}`, completion value is `{supplied}`"
            ),
            RegistrationError::UncloneableReturnValue { operation } => write!(
                f,
                "E109: the completion value for `{operation}` cannot be cloned for replay"
            ),
            RegistrationError::DelegateSignatureMismatch { operation, detail } => write!(
                f,
                "E110: delegate signature does not fit `{operation}`: {detail}"
            ),
        }
    }
}

impl std::error::Error for RegistrationError {}

// =============================================================================
// Synthesis Errors (E2xx)
// =============================================================================

/// A rule set that could not be compiled into a dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisError {
    /// E201: a rule was completed without a value and the declared return
    /// type has no default synthesizer.
    NoDefaultSynthesizer {
        operation: String,
        return_type: String,
    },
}

impl SynthesisError {
    pub fn code(&self) -> u16 {
        match self {
            SynthesisError::NoDefaultSynthesizer { .. } => 201,
        }
    }
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::NoDefaultSynthesizer {
                operation,
                return_type,
            } => write!(
                f,
                "E201: no default synthesizer for `{return_type}`, required by a value-less rule on `{operation}`"
            ),
        }
    }
}

impl std::error::Error for SynthesisError {}

// =============================================================================
// Call-time Faults
// =============================================================================

/// Panic payload raised when a synthesized proxy is called on an operation
/// with no applicable rule.
///
/// Reaching an unstubbed operation is a fault in the code under test (or in
/// the rules), so it surfaces as a panic rather than a `Result`. Tests that
/// want to assert on it catch the unwind and downcast the payload to this
/// type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstubbedOperation {
    /// Operation name as declared on the contract.
    pub operation: String,
    /// Fully instantiated signature, for diagnostics.
    pub signature: String,
}

impl UnstubbedOperation {
    pub fn new(key: &OperationKey) -> Self {
        UnstubbedOperation {
            operation: key.name().to_string(),
            signature: key.to_string(),
        }
    }
}

impl fmt::Display for UnstubbedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation not stubbed: `{}`", self.signature)
    }
}

impl std::error::Error for UnstubbedOperation {}
