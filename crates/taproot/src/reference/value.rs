//! Owning-or-aliasing value handles

use std::fmt;
use std::mem;
use std::ptr;

use crate::block::Shared;
use crate::capability::{allocate, uniquely_owned, Referenceable};
use crate::error::{ReferenceError, Result};
use crate::reference::strong::StrongReference;

/// The handle generated code stores in record fields and locals.
///
/// A `ValueReference` is in exactly one of two states:
///
/// - *Owning*: it holds (a share of) heap storage it created, and copies it
///   with value semantics: cloning produces an independent copy of the
///   value with a new identity.
/// - *Aliasing*: it points at an existing instance, heap- or stack-resident,
///   without participating in its ownership; cloning preserves identity.
///
/// Record fields behave like plain values, while a handle reconstructed
/// from a raw instance pointer (see [`alias`]) behaves like the reference
/// it is.
///
/// # Example
///
/// ```
/// use taproot::ValueReference;
///
/// let a = ValueReference::new(42i64);
/// let b = a.clone();
///
/// // Equal contents, independent identity.
/// assert_eq!(a, b);
/// assert_ne!(a.as_ptr(), b.as_ptr());
/// ```
///
/// [`alias`]: ValueReference::alias
pub struct ValueReference<T> {
    state: State<T>,
}

/// The two mutually exclusive states of a value handle.
enum State<T> {
    /// Shares a control block it created; `None` once the storage has been
    /// released (reset, taken, or constructed null).
    Owning(Option<Shared<T>>),

    /// Aliases an instance whose lifetime is managed elsewhere.
    Alias(*mut T),
}

impl<T: Referenceable> ValueReference<T> {
    /// Create an owning handle over a fresh heap copy of `value`.
    pub fn new(value: T) -> Self {
        ValueReference {
            state: State::Owning(Some(allocate(value))),
        }
    }
}

impl<T> ValueReference<T> {
    /// Create an owning handle with no shared storage behind it.
    ///
    /// This is the state a handle is left in by [`reset`] or [`take`];
    /// dereferencing it fails with `NullReference`.
    ///
    /// [`reset`]: ValueReference::reset
    /// [`take`]: ValueReference::take
    pub fn null() -> Self {
        ValueReference {
            state: State::Owning(None),
        }
    }

    /// Reconstruct a handle from a raw instance pointer, without taking
    /// ownership. A null `ptr` produces a null aliasing handle.
    ///
    /// Generated method bodies use this to recover a handle to the enclosing
    /// instance from a `this`-like pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point at a live instance of `T`, and that
    /// instance must outlive every use of the returned handle (and of every
    /// handle derived from it). The runtime's single-logical-owner
    /// discipline applies: no other code may mutate the instance while a
    /// borrow obtained through this handle is alive.
    pub unsafe fn alias(ptr: *mut T) -> Self {
        ValueReference {
            state: State::Alias(ptr),
        }
    }

    /// True iff the handle is in the aliasing state.
    pub fn is_aliasing(&self) -> bool {
        matches!(self.state, State::Alias(_))
    }

    /// True iff the handle is null: an owning handle whose storage has been
    /// released, or an alias to a null pointer.
    pub fn is_null(&self) -> bool {
        match &self.state {
            State::Owning(block) => block.is_none(),
            State::Alias(ptr) => ptr.is_null(),
        }
    }

    /// Borrow the referenced value, or `None` if the handle is null.
    pub fn get(&self) -> Option<&T> {
        match &self.state {
            State::Owning(Some(block)) => Some(block.value()),
            State::Owning(None) => None,
            // SAFETY: per the `alias` contract the instance is live.
            State::Alias(ptr) => unsafe { ptr.as_ref() },
        }
    }

    /// Raw observing pointer to the value; null if the handle is null.
    pub fn as_ptr(&self) -> *const T {
        match &self.state {
            State::Owning(Some(block)) => block.value_ptr(),
            State::Owning(None) => ptr::null(),
            State::Alias(ptr) => *ptr,
        }
    }

    /// Borrow the referenced value.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::NullReference`] if the handle is null.
    pub fn try_deref(&self) -> Result<&T> {
        self.get().ok_or(ReferenceError::NullReference)
    }

    /// Mutably borrow the referenced value, whether or not the storage is
    /// shared or aliased.
    ///
    /// # Safety
    ///
    /// An owning handle's storage may be shared (through [`as_strong`] or a
    /// weak observer) and an alias points at storage someone else manages,
    /// so the caller must guarantee that no other borrow of the instance is
    /// live while the returned borrow exists. This is the
    /// single-logical-owner contract generated code upholds structurally;
    /// prefer [`get_mut`] when uniqueness can be checked instead of
    /// promised.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::NullReference`] if the handle is null.
    ///
    /// [`as_strong`]: ValueReference::as_strong
    /// [`get_mut`]: ValueReference::get_mut
    pub unsafe fn try_deref_mut(&mut self) -> Result<&mut T> {
        match &mut self.state {
            // SAFETY: the block is live; exclusivity is the caller's
            // obligation per this function's contract.
            State::Owning(Some(block)) => Ok(unsafe { &mut *block.value_ptr() }),
            State::Owning(None) => Err(ReferenceError::NullReference),
            // SAFETY: per the `alias` contract the instance is live;
            // exclusivity is the caller's obligation.
            State::Alias(ptr) => unsafe { ptr.as_mut() }.ok_or(ReferenceError::NullReference),
        }
    }

    /// Release ownership (owning state) or clear the alias (aliasing
    /// state). Afterwards `is_null()` is true.
    pub fn reset(&mut self) {
        match &mut self.state {
            State::Owning(block) => *block = None,
            State::Alias(ptr) => *ptr = ptr::null_mut(),
        }
    }

    /// Move the handle out, leaving `self` null.
    pub fn take(&mut self) -> Self {
        mem::replace(self, ValueReference::null())
    }
}

impl<T: Referenceable> ValueReference<T> {
    /// Mutably borrow the owned value, if this handle is its only handle.
    ///
    /// Returns `None` for a null handle, for an alias (whose storage is
    /// managed elsewhere), and for an owning handle whose storage another
    /// strong handle or weak observer shares. Generated code that knows the
    /// storage is exclusive uses [`try_deref_mut`].
    ///
    /// [`try_deref_mut`]: ValueReference::try_deref_mut
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &self.state {
            // SAFETY: no other handle can reach this storage.
            State::Owning(Some(block)) if uniquely_owned(block) => {
                Some(unsafe { &mut *block.value_ptr() })
            }
            _ => None,
        }
    }

    /// The shared-ownership handle backing this value.
    ///
    /// Succeeds for owning handles (a null owning handle yields a null
    /// strong handle) and for aliases to heap instances reachable through
    /// the value's anchor.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::IllegalReference`] for an alias to a null pointer
    /// ("unexpected state of value reference") or to a non-heap instance
    /// ("reference to non-heap instance").
    pub fn as_strong(&self) -> Result<StrongReference<T>> {
        Ok(StrongReference::from_block(self.heap_block()?))
    }

    /// Resolve the control block backing this handle, if any.
    ///
    /// Owning handles share their block directly. Aliases are resolved
    /// through the instance's anchor: a detached anchor (or a type with no
    /// anchor at all) marks a non-heap instance.
    pub(crate) fn heap_block(&self) -> Result<Option<Shared<T>>> {
        match &self.state {
            State::Owning(block) => Ok(block.clone()),
            State::Alias(ptr) if ptr.is_null() => Err(ReferenceError::unexpected_state()),
            State::Alias(ptr) => {
                // SAFETY: per the `alias` contract the instance is live.
                let value = unsafe { &**ptr };
                let block = value
                    .anchor()
                    .and_then(|anchor| anchor.heap_block())
                    .ok_or_else(ReferenceError::non_heap)?;
                Ok(Some(block))
            }
        }
    }

    /// Wrap an existing block share (or its absence) as an owning handle.
    pub(crate) fn from_block(block: Option<Shared<T>>) -> Self {
        ValueReference {
            state: State::Owning(block),
        }
    }
}

impl<T: Referenceable + Default> Default for ValueReference<T> {
    /// An owning handle over a freshly default-constructed value. Never
    /// null.
    fn default() -> Self {
        ValueReference::new(T::default())
    }
}

impl<T: Referenceable> From<T> for ValueReference<T> {
    fn from(value: T) -> Self {
        ValueReference::new(value)
    }
}

impl<T: Referenceable + Clone> Clone for ValueReference<T> {
    /// Owning handles copy with value semantics: the clone owns an
    /// independent copy of the value under a new identity. Aliasing handles
    /// copy with reference semantics: the clone points at the same instance.
    fn clone(&self) -> Self {
        match &self.state {
            State::Owning(Some(block)) => ValueReference::new(block.value().clone()),
            State::Owning(None) => ValueReference::null(),
            State::Alias(ptr) => ValueReference {
                state: State::Alias(*ptr),
            },
        }
    }
}

impl<T: PartialEq> PartialEq for ValueReference<T> {
    /// Value equality, independent of identity. Two null handles compare
    /// equal; a null handle never equals a non-null one.
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: PartialEq> PartialEq<T> for ValueReference<T> {
    fn eq(&self, other: &T) -> bool {
        self.get().is_some_and(|value| value == other)
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) if self.is_aliasing() => write!(f, "ValueReference(alias {value:?})"),
            Some(value) => write!(f, "ValueReference({value:?})"),
            None => f.write_str("ValueReference(null)"),
        }
    }
}
