//! The contract every behavior test stubs against.
//!
//! `Probe` is an echo-style contract: one operation per value category the
//! engine has to handle, so tests can state exactly which shape they are
//! exercising. The selector module it generates is re-exported as `probe`.

use understudy::contract;

/// Enum carried through `Probe` operations; `Zero` is the default variant,
/// which the none-versus-default tests lean on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kind {
    #[default]
    Zero,
    One,
}

/// Plain struct carried through `Probe` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Fault payload with no data; raised through `throws`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unavailable;

/// Fault payload naming the argument a double rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedArgument {
    pub name: &'static str,
}

contract! {
    /// Echo-style contract exercising every value category the engine
    /// supports.
    pub trait Probe {
        fn echo_int(&self, value: i32) -> i32;
        fn echo_opt_int(&self, value: Option<i32>) -> Option<i32>;
        fn echo_kind(&self, value: Kind) -> Kind;
        fn echo_opt_kind(&self, value: Option<Kind>) -> Option<Kind>;
        fn echo_point(&self, value: Point) -> Point;
        fn echo_opt_point(&self, value: Option<Point>) -> Option<Point>;
        fn echo_text(&self, value: String) -> String;
        fn sum(&self, a: i32, b: i32) -> i32;
        fn sum3(&self, a: i32, b: i32, c: i32) -> i32;
        fn reset(&self);
        fn parse<T>(&self, raw: String) -> T;
        fn label_of<T>(&self) -> String;
    }
    proxy ProbeProxy;
    selectors mod probe;
}
