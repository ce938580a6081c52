//! The three reference handle types backing compiled record graphs
//!
//! - [`ValueReference`]: what generated code stores in record fields and
//!   locals: either an owning handle over its own copy of a value, or an
//!   alias to an instance whose lifetime is managed elsewhere.
//! - [`StrongReference`]: shared ownership; the instance lives as long as
//!   at least one strong handle does.
//! - [`WeakReference`]: liveness-tracking observation that never extends
//!   the instance's life; the cycle-breaking edge of an ownership graph.
//!
//! Strong edges must not form a cycle that is never broken by a weak edge,
//! or the cycle leaks. The runtime performs no cycle detection;
//! partitioning a record layout into owning and observing edges is the
//! responsibility of whoever designs that layout.

mod strong;
mod value;
mod weak;

pub use strong::StrongReference;
pub use value::ValueReference;
pub use weak::{WeakGuard, WeakReference};
