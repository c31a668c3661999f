//! Implementation delegates with erased signatures.
//!
//! An implementation rule routes calls to a user closure instead of a
//! branch chain. The closure is captured as an [`ErasedDelegate`]: its
//! signature recorded as runtime type identities, its body wrapped so it
//! can be invoked with type-erased arguments. The [`StubFn`] trait is
//! implemented for closures of zero through five parameters; the typed
//! facade relies on it to unify a closure's signature with a selector's.

use std::any::Any;
use std::fmt;

use parking_lot::Mutex;
use smallvec::SmallVec;

use understudy_types::operation::OperationKey;
use understudy_types::value::{CallArgs, TypeInfo};
use understudy_types::RegistrationError;

/// Runtime view of a delegate's parameter and return types.
pub struct DelegateSignature {
    params: SmallVec<[TypeInfo; 5]>,
    ret: TypeInfo,
}

impl DelegateSignature {
    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub fn return_type(&self) -> TypeInfo {
        self.ret
    }

    /// Validate the delegate against the operation it was registered for.
    pub fn check_against(&self, key: &OperationKey) -> Result<(), RegistrationError> {
        let mismatch = |detail: String| RegistrationError::DelegateSignatureMismatch {
            operation: key.name().to_string(),
            detail,
        };

        if self.params.len() != key.arity() {
            return Err(mismatch(format!(
                "delegate takes {} argument(s), operation declares {}",
                self.params.len(),
                key.arity()
            )));
        }
        for (position, (have, want)) in self.params.iter().zip(key.params()).enumerate() {
            if have.id() != want.id() {
                return Err(mismatch(format!(
                    "argument {position} is `{}`, operation declares `{}`",
                    have.name(),
                    want.name()
                )));
            }
        }
        if self.ret.id() != key.return_type().id() {
            return Err(mismatch(format!(
                "delegate returns `{}`, operation declares `{}`",
                self.ret.name(),
                key.return_type().name()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DelegateSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|t| t.name()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.ret.name())
    }
}

/// A user closure erased for storage in the dispatch table.
pub struct ErasedDelegate {
    signature: DelegateSignature,
    call: Mutex<Box<dyn FnMut(CallArgs) -> Box<dyn Any>>>,
}

impl ErasedDelegate {
    pub fn new<Args, R>(delegate: impl StubFn<Args, R>) -> Self {
        delegate.into_erased()
    }

    pub fn signature(&self) -> &DelegateSignature {
        &self.signature
    }

    /// Invoke the delegate with the real call arguments.
    pub fn invoke(&self, args: CallArgs) -> Box<dyn Any> {
        let mut call = match self.call.try_lock() {
            Some(guard) => guard,
            None => panic!("implementation delegate re-entered itself"),
        };
        (*call)(args)
    }
}

impl fmt::Debug for ErasedDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ErasedDelegate{}", self.signature)
    }
}

/// Closures usable as implementation delegates.
///
/// `Args` is the parameter tuple, so the operation's signature can be
/// unified with the closure's at the type level.
pub trait StubFn<Args, R>: 'static {
    fn signature() -> DelegateSignature;
    fn into_erased(self) -> ErasedDelegate;
}

fn next_arg<T: Any>(args: &mut impl Iterator<Item = Box<dyn Any>>) -> T {
    match args.next().and_then(|arg| arg.downcast::<T>().ok()) {
        Some(value) => *value,
        None => panic!(
            "delegate received an argument that does not match its validated signature"
        ),
    }
}

macro_rules! impl_stub_fn {
    ( $( $T:ident => $slot:ident ),* ) => {
        impl<F, R, $($T),*> StubFn<($($T,)*), R> for F
        where
            F: FnMut($($T),*) -> R + 'static,
            R: Any,
            $($T: Any,)*
        {
            fn signature() -> DelegateSignature {
                DelegateSignature {
                    params: SmallVec::from_slice(&[$(TypeInfo::of::<$T>()),*]),
                    ret: TypeInfo::of::<R>(),
                }
            }

            fn into_erased(mut self) -> ErasedDelegate {
                let call = move |args: CallArgs| -> Box<dyn Any> {
                    let mut args = args.into_iter();
                    $( let $slot: $T = next_arg(&mut args); )*
                    debug_assert!(args.next().is_none(), "arity mismatch after validation");
                    Box::new(self($($slot),*))
                };
                ErasedDelegate {
                    signature: Self::signature(),
                    call: Mutex::new(Box::new(call)),
                }
            }
        }
    };
}

impl_stub_fn!();
impl_stub_fn!(A1 => a1);
impl_stub_fn!(A1 => a1, A2 => a2);
impl_stub_fn!(A1 => a1, A2 => a2, A3 => a3);
impl_stub_fn!(A1 => a1, A2 => a2, A3 => a3, A4 => a4);
impl_stub_fn!(A1 => a1, A2 => a2, A3 => a3, A4 => a4, A5 => a5);

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn boxed<T: Any>(value: T) -> Box<dyn Any> {
        Box::new(value)
    }

    #[test]
    fn delegates_receive_real_arguments() {
        let delegate = ErasedDelegate::new(|a: i32, b: i32| a + b);
        let result = delegate.invoke(smallvec![boxed(20i32), boxed(22i32)]);
        assert_eq!(result.downcast::<i32>().ok().as_deref(), Some(&42));
    }

    #[test]
    fn delegates_keep_their_captured_state() {
        let mut calls = 0u32;
        let delegate = ErasedDelegate::new(move || {
            calls += 1;
            calls
        });
        assert_eq!(
            delegate.invoke(CallArgs::new()).downcast::<u32>().ok().as_deref(),
            Some(&1)
        );
        assert_eq!(
            delegate.invoke(CallArgs::new()).downcast::<u32>().ok().as_deref(),
            Some(&2)
        );
    }

    #[test]
    fn five_parameter_delegates_are_supported() {
        let delegate =
            ErasedDelegate::new(|a: u8, b: u8, c: u8, d: u8, e: u8| u32::from(a) + u32::from(b) + u32::from(c) + u32::from(d) + u32::from(e));
        let args: CallArgs = smallvec![boxed(1u8), boxed(2u8), boxed(3u8), boxed(4u8), boxed(5u8)];
        assert_eq!(delegate.invoke(args).downcast::<u32>().ok().as_deref(), Some(&15));
    }

    #[test]
    fn signatures_validate_against_operation_keys() {
        let key = OperationKey::of("add")
            .with_param(TypeInfo::of::<i32>())
            .with_param(TypeInfo::of::<i32>())
            .with_return(TypeInfo::of::<i32>());

        let fits = ErasedDelegate::new(|a: i32, b: i32| a + b);
        assert!(fits.signature().check_against(&key).is_ok());

        let wrong_arity = ErasedDelegate::new(|a: i32| a);
        let err = wrong_arity.signature().check_against(&key).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::DelegateSignatureMismatch { .. }
        ));

        let wrong_ret = ErasedDelegate::new(|_: i32, _: i32| String::new());
        assert!(wrong_ret.signature().check_against(&key).is_err());

        let wrong_param = ErasedDelegate::new(|a: i64, _: i32| a as i32);
        assert!(wrong_param.signature().check_against(&key).is_err());
    }
}
