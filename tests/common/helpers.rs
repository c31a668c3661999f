//! Fault-catching assertions for the panic channel.
//!
//! Synthesized doubles signal misuse by unwinding with typed payloads, so
//! tests assert on faults by catching the unwind and downcasting.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use understudy::UnstubbedOperation;

/// Run `f`, expecting it to raise a fault of type `F`; returns the payload.
///
/// # Example
///
/// ```ignore
/// let fault: Unavailable = expect_fault(|| probe.echo_int(13));
/// ```
pub fn expect_fault<F, R>(f: impl FnOnce() -> R) -> F
where
    F: Any,
{
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = f();
    }));
    match result {
        Ok(()) => panic!("call completed but a fault was expected"),
        Err(payload) => match payload.downcast::<F>() {
            Ok(fault) => *fault,
            Err(payload) => {
                if let Some(msg) = payload.downcast_ref::<&str>() {
                    panic!("fault payload was a panic message: {msg}");
                }
                if let Some(msg) = payload.downcast_ref::<String>() {
                    panic!("fault payload was a panic message: {msg}");
                }
                panic!("fault payload was not the expected type");
            }
        },
    }
}

/// Expect the distinguished not-stubbed fault; returns it for assertions
/// on the operation identity it names.
pub fn expect_unstubbed<R>(f: impl FnOnce() -> R) -> UnstubbedOperation {
    expect_fault(f)
}
