//! Typed operation selectors and sample-argument capture.
//!
//! A [`Selector`] names one operation of a contract, with every type
//! parameter already pinned, and carries the parameter tuple and return
//! type as phantom generics. Selector functions are generated by
//! [`contract!`](crate::contract), which keeps their keys structurally
//! identical to the ones the synthesized proxy dispatches with.
//!
//! Sample arguments are captured as [`ArgExpr`]s. Plain values convert
//! implicitly; [`wrapped`] lifts a value into an optional parameter and
//! [`bound`] snapshots an external binding at capture time.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use understudy_types::operation::OperationKey;
use understudy_types::value::{ArgVec, ErasedValue};

/// One fully instantiated operation of contract `C`.
pub struct Selector<C: ?Sized, Args, Ret> {
    key: OperationKey,
    _marker: PhantomData<fn(&C, Args) -> Ret>,
}

impl<C: ?Sized, Args, Ret> Selector<C, Args, Ret> {
    /// Wrap a structural key built by generated selector code.
    ///
    /// The key must agree with `Args` and `Ret`; the generator is the only
    /// intended caller and builds both from the same tokens.
    pub fn from_key(key: OperationKey) -> Self {
        Selector {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    pub fn into_key(self) -> OperationKey {
        self.key
    }
}

impl<C: ?Sized, Args, Ret> fmt::Debug for Selector<C, Args, Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.key)
    }
}

impl<C: ?Sized, Args, Ret> fmt::Display for Selector<C, Args, Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

/// One captured sample argument for a parameter of type `T`.
pub struct ArgExpr<T> {
    value: ErasedValue,
    _ty: PhantomData<fn() -> T>,
}

impl<T> ArgExpr<T> {
    fn of(value: ErasedValue) -> Self {
        ArgExpr {
            value,
            _ty: PhantomData,
        }
    }

    pub(crate) fn into_erased(self) -> ErasedValue {
        self.value
    }
}

/// Expect the parameter to equal `literal`, by its natural equality.
///
/// Plain values also convert into sample arguments implicitly; this
/// spelling exists for call sites that read better fully explicit.
pub fn value<T>(literal: T) -> ArgExpr<T>
where
    T: Any + PartialEq + fmt::Debug,
{
    ArgExpr::of(ErasedValue::comparable(literal))
}

/// Expect an `Option` parameter to equal `Some(literal)`.
pub fn wrapped<T>(literal: T) -> ArgExpr<Option<T>>
where
    T: Any + PartialEq + fmt::Debug,
{
    ArgExpr::of(ErasedValue::wrapped(literal))
}

/// Snapshot `binding` now; later mutation of the binding does not move the
/// rule.
pub fn bound<T>(binding: &T) -> ArgExpr<T>
where
    T: Any + Clone + PartialEq + fmt::Debug,
{
    ArgExpr::of(ErasedValue::snapshot(binding))
}

impl<T> From<T> for ArgExpr<T>
where
    T: Any + PartialEq + fmt::Debug,
{
    fn from(literal: T) -> Self {
        value(literal)
    }
}

/// Tuples of sample arguments accepted by a matching-rule declaration.
///
/// Implemented for tuples of zero through five elements, each element
/// anything convertible into the [`ArgExpr`] of the matching parameter.
pub trait IntoSampleArgs<Args> {
    fn into_sample_args(self) -> ArgVec;
}

impl IntoSampleArgs<()> for () {
    fn into_sample_args(self) -> ArgVec {
        ArgVec::new()
    }
}

macro_rules! impl_sample_args {
    ( $( $T:ident / $E:ident => $slot:ident ),+ ) => {
        impl<$($T, $E),+> IntoSampleArgs<($($T,)+)> for ($($E,)+)
        where
            $($T: 'static, $E: Into<ArgExpr<$T>>,)+
        {
            fn into_sample_args(self) -> ArgVec {
                let ($($slot,)+) = self;
                let mut args = ArgVec::new();
                $(
                    let expr: ArgExpr<$T> = $slot.into();
                    args.push(expr.into_erased());
                )+
                args
            }
        }
    };
}

impl_sample_args!(T1 / E1 => a1);
impl_sample_args!(T1 / E1 => a1, T2 / E2 => a2);
impl_sample_args!(T1 / E1 => a1, T2 / E2 => a2, T3 / E3 => a3);
impl_sample_args!(T1 / E1 => a1, T2 / E2 => a2, T3 / E3 => a3, T4 / E4 => a4);
impl_sample_args!(T1 / E1 => a1, T2 / E2 => a2, T3 / E3 => a3, T4 / E4 => a4, T5 / E5 => a5);
