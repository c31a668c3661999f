//! Sample call capture and resolution.
//!
//! The dynamic registration surface describes the call a rule should match
//! as a [`SampleCall`]: an operation name, optional type arguments, and a
//! list of captured argument values. [`resolve_sample`] validates the sample
//! against the contract's [`OperationCatalog`] and pins it to one fully
//! instantiated [`OperationKey`], picking among structural overloads by the
//! sample's own shape. Everything that can go wrong here is a
//! [`RegistrationError`]; nothing invalid reaches the rule registry.

use std::any::Any;
use std::fmt;

use smallvec::SmallVec;
use tracing::debug;

use understudy_types::operation::{
    OperationCatalog, OperationDescriptor, OperationKey, ResolvedShape,
};
use understudy_types::value::{ArgVec, ErasedValue, TypeInfo};
use understudy_types::RegistrationError;

/// What the captured sample is for, which decides the capabilities its
/// arguments must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRole {
    /// Arguments become match conditions and need natural equality.
    Matching,
    /// Arguments only pin the operation identity; the delegate receives
    /// the real call arguments, so no capability is required.
    Implementation,
}

/// One sample call as the registration surface captured it.
#[derive(Debug)]
pub struct SampleCall {
    operation: String,
    type_args: SmallVec<[TypeInfo; 2]>,
    args: ArgVec,
}

impl SampleCall {
    pub fn operation(name: impl Into<String>) -> Self {
        SampleCall {
            operation: name.into(),
            type_args: SmallVec::new(),
            args: ArgVec::new(),
        }
    }

    /// Pin the next type parameter of the operation to `T`.
    pub fn type_arg<T: Any>(mut self) -> Self {
        self.type_args.push(TypeInfo::of::<T>());
        self
    }

    /// Append an already-captured argument.
    pub fn arg(mut self, value: ErasedValue) -> Self {
        self.args.push(value);
        self
    }

    /// Append a literal argument compared by natural equality.
    pub fn literal<T>(self, value: T) -> Self
    where
        T: Any + PartialEq + fmt::Debug,
    {
        self.arg(ErasedValue::comparable(value))
    }

    /// Append a plain value for a parameter declared as `Option<T>`.
    pub fn wrapped<T>(self, value: T) -> Self
    where
        T: Any + PartialEq + fmt::Debug,
    {
        self.arg(ErasedValue::wrapped(value))
    }

    /// Append a snapshot of an external binding, frozen as of this call.
    pub fn bound<T>(self, binding: &T) -> Self
    where
        T: Any + Clone + PartialEq + fmt::Debug,
    {
        self.arg(ErasedValue::snapshot(binding))
    }

    /// Append a placeholder argument with no capabilities. Only valid for
    /// implementation rules.
    pub fn opaque<T: Any>(self, value: T) -> Self {
        self.arg(ErasedValue::opaque(value))
    }

    pub fn name(&self) -> &str {
        &self.operation
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// A sample pinned to one instantiated operation.
#[derive(Debug)]
pub struct ResolvedSample {
    pub key: OperationKey,
    pub args: ArgVec,
}

struct InstantiatedSignature {
    params: SmallVec<[TypeInfo; 5]>,
    ret: TypeInfo,
}

/// Check the sample against one catalog candidate and, if it fits,
/// instantiate the candidate's signature with the sample's types.
fn instantiate_signature(
    descriptor: &OperationDescriptor,
    sample: &SampleCall,
) -> Result<InstantiatedSignature, RegistrationError> {
    if descriptor.type_params() != sample.type_args.len() {
        return Err(RegistrationError::TypeArgumentMismatch {
            operation: sample.operation.clone(),
            expected: descriptor.type_params(),
            supplied: sample.type_args.len(),
        });
    }
    if descriptor.arity() != sample.args.len() {
        return Err(RegistrationError::ParameterCountMismatch {
            operation: sample.operation.clone(),
            expected: descriptor.arity(),
            supplied: sample.args.len(),
        });
    }

    let mut params = SmallVec::<[TypeInfo; 5]>::new();
    for (position, (shape, arg)) in descriptor.params().iter().zip(&sample.args).enumerate() {
        let ty = match shape.resolve(&sample.type_args) {
            Some(ResolvedShape::Exact(expected)) if expected.id() == arg.type_id() => expected,
            Some(ResolvedShape::FromArgument) => arg.type_info(),
            Some(ResolvedShape::Exact(expected)) => {
                return Err(RegistrationError::ParameterTypeMismatch {
                    operation: sample.operation.clone(),
                    position,
                    expected: expected.name().to_string(),
                    supplied: arg.type_name().to_string(),
                });
            }
            None => {
                return Err(RegistrationError::ParameterTypeMismatch {
                    operation: sample.operation.clone(),
                    position,
                    expected: shape.display_name(),
                    supplied: arg.type_name().to_string(),
                });
            }
        };
        params.push(ty);
    }

    let ret = match descriptor.return_shape().resolve(&sample.type_args) {
        Some(ResolvedShape::Exact(ty)) => ty,
        // A return slot with no concrete resolution cannot be keyed from a
        // sample; the typed selector surface carries the instantiation.
        Some(ResolvedShape::FromArgument) | None => {
            return Err(RegistrationError::UnresolvableReturnShape {
                operation: sample.operation.clone(),
            });
        }
    };

    Ok(InstantiatedSignature { params, ret })
}

/// Resolve a sample call to one instantiated operation key.
///
/// Candidates are tried in catalog order and the first structural fit wins.
/// With a single candidate the precise mismatch is reported; with several,
/// the aggregate [`RegistrationError::NoMatchingOverload`] is.
pub fn resolve_sample(
    catalog: &OperationCatalog,
    sample: SampleCall,
    role: SampleRole,
) -> Result<ResolvedSample, RegistrationError> {
    let candidates: Vec<&OperationDescriptor> = catalog.named(sample.name()).collect();
    if candidates.is_empty() {
        return Err(RegistrationError::UnknownOperation {
            operation: sample.operation.clone(),
        });
    }

    let mut failures = Vec::new();
    let mut resolved = None;
    for candidate in &candidates {
        match instantiate_signature(candidate, &sample) {
            Ok(signature) => {
                resolved = Some(signature);
                break;
            }
            Err(e) => failures.push(e),
        }
    }

    let signature = match resolved {
        Some(signature) => signature,
        None => {
            return Err(match failures.into_iter().next() {
                Some(first) if candidates.len() == 1 => first,
                _ => RegistrationError::NoMatchingOverload {
                    operation: sample.operation.clone(),
                    candidates: candidates.len(),
                },
            });
        }
    };

    if role == SampleRole::Matching {
        for (position, arg) in sample.args.iter().enumerate() {
            if !arg.is_comparable() {
                return Err(RegistrationError::UnsupportedShape {
                    operation: sample.operation.clone(),
                    position,
                });
            }
        }
    }

    let mut key = OperationKey::of(sample.operation.as_str());
    for ty in &sample.type_args {
        key = key.with_type_arg(*ty);
    }
    for ty in &signature.params {
        key = key.with_param(*ty);
    }
    key = key.with_return(signature.ret);

    debug!(operation = %key, role = ?role, "resolved sample call");
    Ok(ResolvedSample {
        key,
        args: sample.args,
    })
}
