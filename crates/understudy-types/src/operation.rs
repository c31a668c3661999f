//! Operation identity: catalogs, descriptors, and instantiated keys.
//!
//! A contract is described twice. The [`OperationCatalog`] is the declared
//! view: every abstract operation with its parameter shapes, including slots
//! that are generic over the operation's type parameters. The
//! [`OperationKey`] is the instantiated view: one concrete signature with
//! every type parameter pinned to a runtime type identity. Rules are stored
//! and dispatched by key, which is what keeps distinct generic
//! instantiations of the same operation isolated from each other.

use std::fmt;

use smallvec::SmallVec;

use crate::value::TypeInfo;

/// Fully instantiated operation identity.
///
/// Two keys are equal when the name, the type arguments, the parameter
/// types, and the return type all agree by [`std::any::TypeId`]. Display
/// names never participate in equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationKey {
    name: String,
    type_args: SmallVec<[TypeInfo; 2]>,
    params: SmallVec<[TypeInfo; 5]>,
    ret: TypeInfo,
}

impl OperationKey {
    /// Start a key for `name` with no parameters and a unit return.
    pub fn of(name: impl Into<String>) -> Self {
        OperationKey {
            name: name.into(),
            type_args: SmallVec::new(),
            params: SmallVec::new(),
            ret: TypeInfo::with_default::<()>(),
        }
    }

    pub fn with_type_arg(mut self, ty: TypeInfo) -> Self {
        self.type_args.push(ty);
        self
    }

    pub fn with_param(mut self, ty: TypeInfo) -> Self {
        self.params.push(ty);
        self
    }

    pub fn with_return(mut self, ty: TypeInfo) -> Self {
        self.ret = ty;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_args(&self) -> &[TypeInfo] {
        &self.type_args
    }

    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn return_type(&self) -> TypeInfo {
        self.ret
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_args.is_empty() {
            let args: Vec<&str> = self.type_args.iter().map(|t| t.name()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        let params: Vec<&str> = self.params.iter().map(|t| t.name()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.ret.name())
    }
}

/// Shape of one parameter or return slot in a catalog entry.
#[derive(Clone, Copy, Debug)]
pub enum ParamShape {
    /// A concrete type, known at declaration time.
    Concrete(TypeInfo),
    /// The n-th type parameter of the operation; resolved against the
    /// type arguments supplied at the sample site.
    TypeParam(usize),
    /// A slot whose type depends on the instantiation but was declared
    /// through a surface that cannot name the dependency precisely. The
    /// string is the declared spelling, kept for diagnostics.
    Deferred(&'static str),
}

/// What a shape expects once the sample site's type arguments are known.
pub enum ResolvedShape {
    /// The slot must hold exactly this type.
    Exact(TypeInfo),
    /// The slot takes its type from the supplied argument.
    FromArgument,
}

impl ParamShape {
    /// Resolve the shape against the type arguments of one sample call.
    ///
    /// `None` means the shape refers to a type parameter the sample did
    /// not supply.
    pub fn resolve(&self, type_args: &[TypeInfo]) -> Option<ResolvedShape> {
        match self {
            ParamShape::Concrete(ty) => Some(ResolvedShape::Exact(*ty)),
            ParamShape::TypeParam(index) => type_args.get(*index).map(|ty| ResolvedShape::Exact(*ty)),
            ParamShape::Deferred(_) => Some(ResolvedShape::FromArgument),
        }
    }

    /// Declared spelling for diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            ParamShape::Concrete(ty) => ty.name().to_string(),
            ParamShape::TypeParam(index) => format!("#{index}"),
            ParamShape::Deferred(spelling) => (*spelling).to_string(),
        }
    }
}

/// One abstract operation as the contract declares it.
#[derive(Clone, Debug)]
pub struct OperationDescriptor {
    name: String,
    type_params: usize,
    params: Vec<ParamShape>,
    ret: ParamShape,
}

impl OperationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        OperationDescriptor {
            name: name.into(),
            type_params: 0,
            params: Vec::new(),
            ret: ParamShape::Concrete(TypeInfo::with_default::<()>()),
        }
    }

    /// Number of type parameters the operation declares.
    pub fn with_type_params(mut self, count: usize) -> Self {
        self.type_params = count;
        self
    }

    pub fn with_param<T: std::any::Any>(self) -> Self {
        self.with_param_of(TypeInfo::of::<T>())
    }

    pub fn with_param_of(mut self, ty: TypeInfo) -> Self {
        self.params.push(ParamShape::Concrete(ty));
        self
    }

    /// Parameter slot typed by the operation's `index`-th type parameter.
    pub fn with_generic_param(mut self, index: usize) -> Self {
        self.params.push(ParamShape::TypeParam(index));
        self
    }

    pub fn with_deferred_param(mut self, spelling: &'static str) -> Self {
        self.params.push(ParamShape::Deferred(spelling));
        self
    }

    pub fn with_return<T: std::any::Any>(self) -> Self {
        self.with_return_of(TypeInfo::of::<T>())
    }

    /// Return slot that can synthesize `T::default()` for rules completed
    /// without an explicit value.
    pub fn with_defaultable_return<T: std::any::Any + Default>(self) -> Self {
        self.with_return_of(TypeInfo::with_default::<T>())
    }

    pub fn with_return_of(mut self, ty: TypeInfo) -> Self {
        self.ret = ParamShape::Concrete(ty);
        self
    }

    /// Return slot typed by the operation's `index`-th type parameter.
    pub fn with_generic_return(mut self, index: usize) -> Self {
        self.ret = ParamShape::TypeParam(index);
        self
    }

    pub fn with_deferred_return(mut self, spelling: &'static str) -> Self {
        self.ret = ParamShape::Deferred(spelling);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn type_params(&self) -> usize {
        self.type_params
    }

    pub fn params(&self) -> &[ParamShape] {
        &self.params
    }

    pub fn return_shape(&self) -> ParamShape {
        self.ret
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.type_params > 0 {
            let params: Vec<String> = (0..self.type_params).map(|i| format!("#{i}")).collect();
            write!(f, "<{}>", params.join(", "))?;
        }
        let params: Vec<String> = self.params.iter().map(|p| p.display_name()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.ret.display_name())
    }
}

/// Every abstract operation a contract declares, in declaration order.
///
/// Overloads are plain repeated names; lookups return all candidates and
/// callers disambiguate structurally.
#[derive(Clone, Debug, Default)]
pub struct OperationCatalog {
    ops: Vec<OperationDescriptor>,
}

impl OperationCatalog {
    pub fn new() -> Self {
        OperationCatalog { ops: Vec::new() }
    }

    pub fn with(mut self, op: OperationDescriptor) -> Self {
        self.ops.push(op);
        self
    }

    pub fn push(&mut self, op: OperationDescriptor) {
        self.ops.push(op);
    }

    /// All candidates declared under `name`.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a OperationDescriptor> {
        self.ops.iter().filter(move |op| op.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn echo_key() -> OperationKey {
        OperationKey::of("echo")
            .with_param(TypeInfo::of::<i32>())
            .with_return(TypeInfo::of::<i32>())
    }

    #[test]
    fn keys_are_structural() {
        let a = echo_key();
        let b = OperationKey::of("echo")
            .with_param(TypeInfo::of::<i32>())
            .with_return(TypeInfo::of::<i32>());
        assert_eq!(a, b);

        let other_param = OperationKey::of("echo")
            .with_param(TypeInfo::of::<i64>())
            .with_return(TypeInfo::of::<i32>());
        assert_ne!(a, other_param);
    }

    #[test]
    fn type_arguments_split_key_identity() {
        let as_i32 = OperationKey::of("convert").with_type_arg(TypeInfo::of::<i32>());
        let as_u8 = OperationKey::of("convert").with_type_arg(TypeInfo::of::<u8>());
        assert_ne!(as_i32, as_u8);

        let mut table = HashMap::new();
        table.insert(as_i32.clone(), 1);
        table.insert(as_u8.clone(), 2);
        assert_eq!(table.get(&as_i32), Some(&1));
        assert_eq!(table.get(&as_u8), Some(&2));
    }

    #[test]
    fn display_renders_the_signature() {
        let rendered = echo_key().to_string();
        assert!(rendered.starts_with("echo("), "got {rendered}");
        assert!(rendered.contains("i32"), "got {rendered}");
    }

    #[test]
    fn catalog_lookup_returns_all_overloads() {
        let catalog = OperationCatalog::new()
            .with(
                OperationDescriptor::new("add")
                    .with_param::<i32>()
                    .with_param::<i32>()
                    .with_return::<i32>(),
            )
            .with(
                OperationDescriptor::new("add")
                    .with_param::<i32>()
                    .with_param::<i32>()
                    .with_param::<i32>()
                    .with_return::<i32>(),
            )
            .with(OperationDescriptor::new("reset"));

        assert_eq!(catalog.named("add").count(), 2);
        assert_eq!(catalog.named("reset").count(), 1);
        assert_eq!(catalog.named("missing").count(), 0);
    }

    #[test]
    fn generic_shapes_resolve_against_type_arguments() {
        let shape = ParamShape::TypeParam(0);
        let args = [TypeInfo::of::<String>()];
        match shape.resolve(&args) {
            Some(ResolvedShape::Exact(ty)) => assert_eq!(ty, TypeInfo::of::<String>()),
            _ => panic!("expected exact resolution"),
        }
        assert!(shape.resolve(&[]).is_none());
    }
}
