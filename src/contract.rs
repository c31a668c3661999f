//! The contract seam between declared traits and the engine.

use understudy_core::dispatch::DispatchTable;
use understudy_types::operation::OperationCatalog;

/// A stubbable abstraction.
///
/// Implemented by [`contract!`](crate::contract) for `dyn Trait`.
/// [`catalog`](Contract::catalog) enumerates the trait's operations for the
/// resolver, and [`synthesize`](Contract::synthesize) wraps a compiled
/// dispatch table into a concrete stand-in. The engine underneath depends
/// on neither piece of generated code, only on this trait.
pub trait Contract: 'static {
    /// The synthesized stand-in type; implements the contract trait.
    type Instance;

    /// Every abstract operation the contract declares.
    fn catalog() -> OperationCatalog;

    /// Wrap a compiled dispatch table into a stand-in instance.
    fn synthesize(table: DispatchTable) -> Self::Instance;
}
