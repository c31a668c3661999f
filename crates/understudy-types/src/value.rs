//! Type-erased argument and return values.
//!
//! Rule arguments and stubbed return values are captured as [`ErasedValue`]:
//! a boxed `dyn Any` paired with the capability functions the engine needs
//! later (natural equality for matching, cloning for replay, debug rendering
//! for diagnostics). Capabilities are captured at the construction site, where
//! the concrete type is still known; after that the value travels through the
//! registry and dispatch table fully erased.

use std::any::{Any, TypeId};
use std::fmt;

use smallvec::SmallVec;

/// Positional call arguments as they cross the proxy boundary.
pub type CallArgs = SmallVec<[Box<dyn Any>; 5]>;

/// Captured sample arguments of a single rule.
pub type ArgVec = SmallVec<[ErasedValue; 5]>;

/// Runtime identity of a Rust type plus an optional default synthesizer.
///
/// Equality and hashing consider only the [`TypeId`]; the name is carried for
/// rendering and the synthesizer for materializing absent return values.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    default_fn: Option<fn() -> Box<dyn Any>>,
}

impl TypeInfo {
    /// Identity of `T` without a default synthesizer.
    pub fn of<T: Any>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            default_fn: None,
        }
    }

    /// Identity of `T` that can also synthesize `T::default()` values.
    ///
    /// Catalog authors opt defaultable return types in through this
    /// constructor; everything else refuses absent-return rules at build
    /// time instead of guessing.
    pub fn with_default<T: Any + Default>() -> Self {
        let synthesize: fn() -> Box<dyn Any> = || -> Box<dyn Any> { Box::new(T::default()) };
        TypeInfo {
            default_fn: Some(synthesize),
            ..TypeInfo::of::<T>()
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has_default(&self) -> bool {
        self.default_fn.is_some()
    }

    /// Synthesizer for the type's default value, if one was declared.
    pub fn default_synthesizer(&self) -> Option<fn() -> Box<dyn Any>> {
        self.default_fn
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl std::hash::Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("has_default", &self.has_default())
            .finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn eq_downcast<T: Any + PartialEq>(expected: &dyn Any, actual: &dyn Any) -> bool {
    match (expected.downcast_ref::<T>(), actual.downcast_ref::<T>()) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

fn clone_downcast<T: Any + Clone>(value: &dyn Any) -> Option<Box<dyn Any>> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as Box<dyn Any>)
}

fn render_downcast<T: Any + fmt::Debug>(value: &dyn Any) -> String {
    match value.downcast_ref::<T>() {
        Some(v) => format!("{v:?}"),
        None => String::from("<opaque>"),
    }
}

fn render_opaque(_: &dyn Any) -> String {
    String::from("<opaque>")
}

/// A value captured from a rule declaration, erased to `dyn Any`.
///
/// The constructor used decides which capabilities the value keeps:
///
/// - [`comparable`](ErasedValue::comparable) for match arguments (equality),
/// - [`wrapped`](ErasedValue::wrapped) for a plain value lifted into the
///   `Option` a parameter declares (equality against `Some(value)`),
/// - [`snapshot`](ErasedValue::snapshot) for values read out of external
///   bindings at capture time (equality and cloning),
/// - [`cloneable`](ErasedValue::cloneable) for return values (cloning),
/// - [`opaque`](ErasedValue::opaque) for payloads no capability applies to.
pub struct ErasedValue {
    value: Box<dyn Any>,
    ty: TypeInfo,
    eq_fn: Option<fn(&dyn Any, &dyn Any) -> bool>,
    clone_fn: Option<fn(&dyn Any) -> Option<Box<dyn Any>>>,
    render_fn: fn(&dyn Any) -> String,
}

impl ErasedValue {
    /// Capture `value` for equality matching.
    pub fn comparable<T>(value: T) -> Self
    where
        T: Any + PartialEq + fmt::Debug,
    {
        ErasedValue {
            value: Box::new(value),
            ty: TypeInfo::of::<T>(),
            eq_fn: Some(eq_downcast::<T>),
            clone_fn: None,
            render_fn: render_downcast::<T>,
        }
    }

    /// Capture `value` lifted into `Option<T>`, for parameters declared
    /// optional at the contract but sampled with a plain value.
    pub fn wrapped<T>(value: T) -> Self
    where
        T: Any + PartialEq + fmt::Debug,
    {
        ErasedValue::comparable(Some(value))
    }

    /// Snapshot the referent of an external binding at capture time.
    ///
    /// The clone taken here is what later matching compares against; the
    /// binding the caller read from can keep changing without affecting
    /// the rule.
    pub fn snapshot<T>(value: &T) -> Self
    where
        T: Any + Clone + PartialEq + fmt::Debug,
    {
        ErasedValue {
            value: Box::new(value.clone()),
            ty: TypeInfo::of::<T>(),
            eq_fn: Some(eq_downcast::<T>),
            clone_fn: Some(clone_downcast::<T>),
            render_fn: render_downcast::<T>,
        }
    }

    /// Capture `value` for replay: the dispatch table clones it once per
    /// matched call.
    pub fn cloneable<T>(value: T) -> Self
    where
        T: Any + Clone + fmt::Debug,
    {
        ErasedValue {
            value: Box::new(value),
            ty: TypeInfo::of::<T>(),
            eq_fn: None,
            clone_fn: Some(clone_downcast::<T>),
            render_fn: render_downcast::<T>,
        }
    }

    /// Capture `value` with no capabilities beyond its type identity.
    pub fn opaque<T: Any>(value: T) -> Self {
        ErasedValue {
            value: Box::new(value),
            ty: TypeInfo::of::<T>(),
            eq_fn: None,
            clone_fn: None,
            render_fn: render_opaque,
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        self.ty
    }

    pub fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn is_comparable(&self) -> bool {
        self.eq_fn.is_some()
    }

    pub fn is_cloneable(&self) -> bool {
        self.clone_fn.is_some()
    }

    /// Natural equality against a call argument.
    ///
    /// `None` means the value was captured without the equality capability
    /// and can never match.
    pub fn equals(&self, actual: &dyn Any) -> Option<bool> {
        self.eq_fn.map(|eq| eq(self.value.as_ref(), actual))
    }

    /// Fresh clone of the captured value, if the capability was kept.
    pub fn clone_value(&self) -> Option<Box<dyn Any>> {
        self.clone_fn.and_then(|clone| clone(self.value.as_ref()))
    }

    /// Debug rendering for diagnostics and logs.
    pub fn render(&self) -> String {
        (self.render_fn)(self.value.as_ref())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedValue")
            .field("type", &self.ty.name())
            .field("value", &self.render())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn comparable_values_use_natural_equality() {
        let captured = ErasedValue::comparable(Point { x: 1, y: 2 });
        assert_eq!(captured.equals(&Point { x: 1, y: 2 }), Some(true));
        assert_eq!(captured.equals(&Point { x: 1, y: 3 }), Some(false));
    }

    #[test]
    fn equality_across_types_is_false_not_a_panic() {
        let captured = ErasedValue::comparable(5i32);
        assert_eq!(captured.equals(&5i64), Some(false));
    }

    #[test]
    fn wrapped_lifts_into_option() {
        let captured = ErasedValue::wrapped(5i32);
        assert_eq!(captured.type_id(), TypeId::of::<Option<i32>>());
        assert_eq!(captured.equals(&Some(5i32)), Some(true));
        assert_eq!(captured.equals(&Option::<i32>::None), Some(false));
    }

    #[test]
    fn snapshot_is_frozen_at_capture_time() {
        let mut binding = String::from("first");
        let captured = ErasedValue::snapshot(&binding);
        binding.push_str(" changed");
        assert_eq!(captured.equals(&String::from("first")), Some(true));
        assert_eq!(captured.equals(&binding), Some(false));
    }

    #[test]
    fn cloneable_values_produce_fresh_clones() {
        let captured = ErasedValue::cloneable(vec![1, 2, 3]);
        let a = captured.clone_value().and_then(|v| v.downcast::<Vec<i32>>().ok());
        let b = captured.clone_value().and_then(|v| v.downcast::<Vec<i32>>().ok());
        assert_eq!(a.as_deref().map(Vec::as_slice), Some([1, 2, 3].as_slice()));
        assert_eq!(b.as_deref().map(Vec::as_slice), Some([1, 2, 3].as_slice()));
    }

    #[test]
    fn opaque_values_have_no_capabilities() {
        struct NoTraits(#[allow(dead_code)] u8);
        let captured = ErasedValue::opaque(NoTraits(1));
        assert!(!captured.is_comparable());
        assert!(!captured.is_cloneable());
        assert_eq!(captured.render(), "<opaque>");
    }

    #[test]
    fn default_synthesizer_is_opt_in() {
        let plain = TypeInfo::of::<i32>();
        assert!(!plain.has_default());

        let defaultable = TypeInfo::with_default::<i32>();
        let synthesize = defaultable.default_synthesizer().expect("declared default");
        let value = synthesize().downcast::<i32>().expect("i32 default");
        assert_eq!(*value, 0);
    }
}
