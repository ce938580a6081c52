//! # Taproot
//!
//! The reference/ownership runtime backing code emitted by a compiler for a
//! statically-typed, struct-oriented source language. Emitted code needs
//! heap-allocated, shareable, sometimes cyclic record instances: without a
//! garbage collector. Taproot supplies three handle types over a value of
//! type `T`, one per ownership contract:
//!
//! - [`ValueReference`]: "this record exclusively owns that record": an
//!   owning handle with value-copy semantics, or an alias reconstructed
//!   from a raw instance pointer.
//! - [`StrongReference`]: "this record may share a child with others":
//!   shared ownership, the instance lives while any strong handle does.
//! - [`WeakReference`]: "this record observes another without keeping it
//!   alive": the cycle-breaking edge.
//!
//! ## Architecture
//!
//! - **Control block**: per-instance strong/weak counts plus the value,
//!   destroyed exactly when the last owner releases it.
//! - **Capability marker**: [`Referenceable`] with an embedded [`Anchor`]
//!   opts a record type into weak observability and reconstruction of a
//!   handle to `self` inside generated method bodies.
//! - **Execution context**: [`RuntimeContext`] keeps module-global record
//!   instances alive through explicit, lifecycle-scoped storage.
//!
//! ## Concurrency
//!
//! None. Reference counts are unsynchronized and every handle is `!Send`
//! and `!Sync`; a handle belongs to whatever single logical thread of
//! control currently owns it. Handle state is plain relocatable data, so a
//! cooperative scheduler may freely suspend a task holding handles and
//! resume it elsewhere.
//!
//! ## Failure model
//!
//! Misuse fails predictably instead of corrupting memory: dereferencing a
//! null handle is [`ReferenceError::NullReference`], and claiming ownership
//! that a handle's state cannot support (e.g. strong ownership over a
//! stack-resident alias) is [`ReferenceError::IllegalReference`]. Safe code
//! can never reach a destroyed value: a borrow through a weak handle takes
//! an ownership claim of its own (a [`WeakGuard`]), and safe mutable access
//! (`get_mut`) succeeds only when nothing else can reach the storage.
//! Unchecked mutable access (`try_deref_mut`) is `unsafe` and carries the
//! single-logical-owner contract generated code upholds structurally.
//! Strong cycles that no weak edge breaks leak; partitioning edges is the
//! record designer's responsibility.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
pub mod capability;
pub mod context;
pub mod error;
pub mod reference;

// Re-export main types
pub use capability::{Anchor, Referenceable};
pub use context::RuntimeContext;
pub use error::{ContextError, ReferenceError, Result};
pub use reference::{StrongReference, ValueReference, WeakGuard, WeakReference};

/// Taproot version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
