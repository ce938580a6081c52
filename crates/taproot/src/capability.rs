//! Capability marker for heap-observable, self-reconstructable types
//!
//! Any type stored behind a handle implements [`Referenceable`]. By default
//! that buys only the plain-value owning mode: the provided [`anchor`]
//! accessor returns `None`, and attempts to claim strong or weak ownership
//! through an aliasing handle fail with an `IllegalReference`.
//!
//! A record type opts into heap observability by embedding an [`Anchor`]
//! field and overriding [`anchor`] to expose it. Owning handles then attach
//! every freshly allocated control block to the value's anchor, which is what
//! lets generated method bodies reconstruct a handle to `self` from a bare
//! instance pointer, recovering the original owning identity instead of a
//! detached copy.
//!
//! [`anchor`]: Referenceable::anchor

use std::cell::Cell;
use std::fmt;

use crate::block::{Observer, Shared};

/// Marker trait for types that can sit behind reference handles.
///
/// The code generator emits an impl for every record type; impls for the
/// scalar types ship with this crate. Types that keep the provided `anchor`
/// body support only the plain-value owning mode.
///
/// # Example
///
/// ```
/// use taproot::{Anchor, Referenceable};
///
/// #[derive(Default)]
/// struct Node {
///     label: String,
///     anchor: Anchor<Node>,
/// }
///
/// impl Referenceable for Node {
///     fn anchor(&self) -> Option<&Anchor<Node>> {
///         Some(&self.anchor)
///     }
/// }
/// ```
pub trait Referenceable: Sized {
    /// The instance's embedded anchor, if it carries one.
    fn anchor(&self) -> Option<&Anchor<Self>> {
        None
    }
}

/// Embedded link between an instance and the control block that owns it.
///
/// An anchor starts out detached. Allocating heap storage for an anchored
/// value attaches it; a detached anchor marks a stack-resident (or copied)
/// instance over which strong ownership can never be claimed.
///
/// `Clone` and `Default` both produce a detached anchor, so a record type can
/// derive them: a copied value is a new instance with a new identity.
/// `PartialEq` compares as always-equal, so derived equality on records stays
/// pure value equality.
pub struct Anchor<T> {
    link: Cell<Option<Observer<T>>>,
}

impl<T> Anchor<T> {
    /// Create a detached anchor.
    pub fn new() -> Self {
        Anchor {
            link: Cell::new(None),
        }
    }

    /// True once the instance has been linked to heap storage.
    pub fn is_attached(&self) -> bool {
        let link = self.link.take();
        let attached = link.is_some();
        self.link.set(link);
        attached
    }

    /// Link this instance to its owning block, replacing any earlier link.
    pub(crate) fn attach(&self, observer: Observer<T>) {
        self.link.set(Some(observer));
    }

    /// Reclaim a strong claim on the owning block, if the link is set and
    /// the block still holds a live value.
    pub(crate) fn heap_block(&self) -> Option<Shared<T>> {
        let link = self.link.take()?;
        let shared = link.upgrade();
        self.link.set(Some(link));
        shared
    }
}

impl<T> Default for Anchor<T> {
    fn default() -> Self {
        Anchor::new()
    }
}

impl<T> Clone for Anchor<T> {
    fn clone(&self) -> Self {
        Anchor::new()
    }
}

impl<T> fmt::Debug for Anchor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_attached() {
            f.write_str("Anchor(attached)")
        } else {
            f.write_str("Anchor(detached)")
        }
    }
}

impl<T> PartialEq for Anchor<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Anchor<T> {}

/// Allocate heap storage for `value` and attach its anchor, if it has one.
pub(crate) fn allocate<T: Referenceable>(value: T) -> Shared<T> {
    let shared = Shared::new(value);
    if let Some(anchor) = shared.value().anchor() {
        anchor.attach(shared.downgrade());
    }
    shared
}

/// True iff `block` is reachable from no handle other than the one the
/// caller holds: exactly one strong claim, and no observers beyond the
/// value's own anchor link. Safe mutable access requires this.
pub(crate) fn uniquely_owned<T: Referenceable>(block: &Shared<T>) -> bool {
    let anchor_links = block
        .value()
        .anchor()
        .map_or(0, |anchor| usize::from(anchor.is_attached()));
    block.strong_count() == 1 && block.weak_count() == anchor_links
}

macro_rules! impl_referenceable_scalar {
    ($($ty:ty),* $(,)?) => {
        $(impl Referenceable for $ty {})*
    };
}

impl_referenceable_scalar!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, f32, f64, (),
    String,
);
