//! The `contract!` macro.
//!
//! Declares a contract trait and generates everything the engine needs to
//! double it: the reflection catalog, the table-dispatching proxy type, and
//! a module of typed selector functions. Keys built by the selectors and
//! keys built by the proxy methods come from the same tokens, so the two
//! sides can never disagree structurally.

/// Declare a stubbable contract trait.
///
/// ```ignore
/// contract! {
///     /// Wire codec for the framing layer.
///     pub trait WireCodec {
///         fn encode(&self, value: i64) -> String;
///         fn decode(&self, frame: String) -> i64;
///         fn parse<T>(&self, raw: String) -> T;
///     }
///     proxy WireCodecProxy;
///     selectors mod wire_codec;
/// }
///
/// let mut codec = double_of::<dyn WireCodec>();
/// codec.on(wire_codec::encode()).given((7,)).returns("0x07".to_string());
/// codec.on(wire_codec::parse::<i64>()).given(("9".to_string(),)).returns(9i64);
/// assert_eq!(codec.instance().encode(7), "0x07");
/// ```
///
/// The expansion produces, for `trait WireCodec`:
///
/// - the trait itself, unchanged except that generic methods get a
///   `where Self: Sized` bound (keeping the trait object-safe) and an
///   `Any` bound on each type parameter,
/// - `struct WireCodecProxy`, implementing the trait by boxing the
///   arguments and dispatching through its table,
/// - `impl Contract for dyn WireCodec`, wiring the catalog and the proxy
///   factory,
/// - `mod wire_codec`, one selector function per method; generic methods
///   take their instantiation as turbofish type arguments.
///
/// Invoke at module level: the selector module resolves the surrounding
/// scope through `use super::*`. Methods take `&self`, up to five
/// parameters of `'static` types, and may omit `-> Ret` for unit returns.
/// Type parameters are bare idents; bounds beyond `Any` are not supported.
#[macro_export]
macro_rules! contract {
    (
        $(#[$trait_meta:meta])*
        $vis:vis trait $Trait:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident $(< $($G:ident),+ >)? ( &self $(, $param:ident : $param_ty:ty)* $(,)? ) $(-> $ret_ty:ty)?;
            )*
        }
        proxy $Proxy:ident;
        selectors mod $selectors:ident;
    ) => {
        $(#[$trait_meta])*
        $vis trait $Trait {
            $(
                $(#[$method_meta])*
                fn $method $(< $($G),+ >)? ( &self $(, $param : $param_ty)* ) $(-> $ret_ty)?
                $(where Self: ::std::marker::Sized, $($G: ::std::any::Any),+)?;
            )*
        }

        #[doc = concat!("Synthesized stand-in implementing [`", stringify!($Trait), "`] by table dispatch.")]
        $vis struct $Proxy {
            table: $crate::DispatchTable,
        }

        impl $Trait for $Proxy {
            $(
                fn $method $(< $($G),+ >)? ( &self $(, $param : $param_ty)* ) $(-> $ret_ty)?
                $(where Self: ::std::marker::Sized, $($G: ::std::any::Any),+)?
                {
                    let key = $selectors::$method $(::< $($G),+ >)? ().into_key();
                    #[allow(unused_mut)]
                    let mut args = $crate::CallArgs::new();
                    $(
                        args.push(::std::boxed::Box::new($param) as ::std::boxed::Box<dyn ::std::any::Any>);
                    )*
                    $crate::downcast_return(&key, self.table.invoke(&key, args))
                }
            )*
        }

        impl $crate::Contract for dyn $Trait {
            type Instance = $Proxy;

            fn catalog() -> $crate::OperationCatalog {
                let mut catalog = $crate::OperationCatalog::new();
                $(
                    catalog.push($crate::contract!(@descriptor $method [$($($G),+)?] [$($param_ty),*] [$($ret_ty)?]));
                )*
                catalog
            }

            fn synthesize(table: $crate::DispatchTable) -> $Proxy {
                $Proxy { table }
            }
        }

        #[doc = concat!("Typed operation selectors for [`", stringify!($Trait), "`].")]
        $vis mod $selectors {
            #[allow(unused_imports)]
            use super::*;

            $(
                $crate::contract!(@selector $Trait $method [$($($G),+)?] [$($param_ty),*] [$($ret_ty)?]);
            )*
        }
    };

    // ----- internal rules -----

    // Catalog entry for a plain method: every slot is concrete.
    (@descriptor $method:ident [] [$($param_ty:ty),*] [$($ret_ty:ty)?]) => {
        $crate::OperationDescriptor::new(stringify!($method))
            $(.with_param::<$param_ty>())*
            $(.with_return::<$ret_ty>())?
    };
    // Catalog entry for a generic method. Slot types can mention the
    // method's type parameters, which no longer exist here, so every slot
    // is deferred to its declared spelling; the typed selector surface
    // carries the precise instantiation.
    (@descriptor $method:ident [$($G:ident),+] [$($param_ty:ty),*] [$($ret_ty:ty)?]) => {
        $crate::OperationDescriptor::new(stringify!($method))
            .with_type_params($crate::contract!(@count $($G)+))
            $(.with_deferred_param(stringify!($param_ty)))*
            $(.with_deferred_return(stringify!($ret_ty)))?
    };

    (@selector $Trait:ident $method:ident [] [$($param_ty:ty),*] [$($ret_ty:ty)?]) => {
        #[doc = concat!("Selects the `", stringify!($method), "` operation.")]
        pub fn $method() -> $crate::Selector<dyn $Trait, ($($param_ty,)*), $crate::contract!(@ret $($ret_ty)?)> {
            $crate::Selector::from_key(
                $crate::OperationKey::of(stringify!($method))
                    $(.with_param($crate::TypeInfo::of::<$param_ty>()))*
                    $(.with_return($crate::TypeInfo::of::<$ret_ty>()))?
            )
        }
    };
    (@selector $Trait:ident $method:ident [$($G:ident),+] [$($param_ty:ty),*] [$($ret_ty:ty)?]) => {
        #[doc = concat!("Selects one instantiation of the `", stringify!($method), "` operation.")]
        pub fn $method<$($G: ::std::any::Any),+>() -> $crate::Selector<dyn $Trait, ($($param_ty,)*), $crate::contract!(@ret $($ret_ty)?)> {
            $crate::Selector::from_key(
                $crate::OperationKey::of(stringify!($method))
                    $(.with_type_arg($crate::TypeInfo::of::<$G>()))+
                    $(.with_param($crate::TypeInfo::of::<$param_ty>()))*
                    $(.with_return($crate::TypeInfo::of::<$ret_ty>()))?
            )
        }
    };

    (@ret) => { () };
    (@ret $ret_ty:ty) => { $ret_ty };

    (@count $($G:ident)+) => { <[()]>::len(&[$($crate::contract!(@unit $G)),+]) };
    (@unit $G:ident) => { () };
}
