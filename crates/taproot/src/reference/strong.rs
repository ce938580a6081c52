//! Shared-ownership handles

use std::fmt;
use std::ptr;

use crate::block::Shared;
use crate::capability::{allocate, uniquely_owned, Referenceable};
use crate::error::{ReferenceError, Result};
use crate::reference::value::ValueReference;

/// A shared-ownership handle: many may coexist, and the instance lives as
/// long as at least one does.
///
/// Copying always shares the underlying storage: reference semantics, in
/// contrast to the value semantics of an owning [`ValueReference`]. This is
/// what a record field declared as "shared child" lowers to, and what the
/// execution context stores to keep module globals alive.
///
/// # Example
///
/// ```
/// use taproot::StrongReference;
///
/// let a = StrongReference::new(42i64);
/// let b = a.clone();
///
/// // Same contents *and* same identity.
/// assert_eq!(a, b);
/// assert_eq!(a.as_ptr(), b.as_ptr());
/// assert_eq!(a.strong_count(), 2);
/// ```
pub struct StrongReference<T> {
    block: Option<Shared<T>>,
}

impl<T: Referenceable> StrongReference<T> {
    /// Allocate fresh heap storage owning a copy of `value`.
    pub fn new(value: T) -> Self {
        StrongReference {
            block: Some(allocate(value)),
        }
    }
}

impl<T> StrongReference<T> {
    /// Create an empty (null) handle.
    pub fn null() -> Self {
        StrongReference { block: None }
    }

    /// True iff the handle is empty.
    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }

    /// Borrow the referenced value, or `None` if the handle is empty.
    pub fn get(&self) -> Option<&T> {
        self.block.as_ref().map(Shared::value)
    }

    /// Raw observing pointer to the value; null if the handle is empty.
    pub fn as_ptr(&self) -> *const T {
        match &self.block {
            Some(block) => block.value_ptr(),
            None => ptr::null(),
        }
    }

    /// Borrow the referenced value.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::NullReference`] if the handle is empty.
    pub fn try_deref(&self) -> Result<&T> {
        self.get().ok_or(ReferenceError::NullReference)
    }

    /// Mutably borrow the referenced value, regardless of how many handles
    /// share the storage.
    ///
    /// # Safety
    ///
    /// The storage may be shared, so the caller must guarantee that no other
    /// borrow of the instance (through this handle or any other handle,
    /// guard, or alias over the same storage) is live while the returned
    /// borrow exists. This is the single-logical-owner contract generated
    /// code upholds structurally; prefer [`get_mut`] when uniqueness can be
    /// checked instead of promised.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::NullReference`] if the handle is empty.
    ///
    /// [`get_mut`]: StrongReference::get_mut
    pub unsafe fn try_deref_mut(&mut self) -> Result<&mut T> {
        match &self.block {
            // SAFETY: the block is live; exclusivity is the caller's
            // obligation per this function's contract.
            Some(block) => Ok(unsafe { &mut *block.value_ptr() }),
            None => Err(ReferenceError::NullReference),
        }
    }

    /// Release this handle's ownership claim; afterwards `is_null()` is
    /// true. The instance itself is destroyed only when the last strong
    /// handle releases it.
    pub fn reset(&mut self) {
        self.block = None;
    }

    /// Number of strong handles currently sharing the instance; zero for an
    /// empty handle.
    ///
    /// Diagnostic hook: tests use it to catch unintended strong cycles,
    /// which this runtime never detects at run time.
    pub fn strong_count(&self) -> usize {
        self.block.as_ref().map_or(0, Shared::strong_count)
    }

    /// Number of weak observers on the instance; zero for an empty handle.
    pub fn weak_count(&self) -> usize {
        self.block.as_ref().map_or(0, Shared::weak_count)
    }

    /// Wrap an existing block share (or its absence).
    pub(crate) fn from_block(block: Option<Shared<T>>) -> Self {
        StrongReference { block }
    }

    /// The underlying block share, if any.
    pub(crate) fn block(&self) -> Option<&Shared<T>> {
        self.block.as_ref()
    }
}

impl<T: Referenceable> StrongReference<T> {
    /// Mutably borrow the referenced value, if this handle is the only one.
    ///
    /// Returns `None` when the handle is empty, when another strong handle
    /// shares the storage, or when a weak observer could reach it. Under
    /// any of those the compiler cannot vouch for exclusivity; generated
    /// code that knows better uses [`try_deref_mut`].
    ///
    /// [`try_deref_mut`]: StrongReference::try_deref_mut
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &self.block {
            // SAFETY: no other handle can reach this storage.
            Some(block) if uniquely_owned(block) => Some(unsafe { &mut *block.value_ptr() }),
            _ => None,
        }
    }

    /// A [`ValueReference`] sharing this handle's storage; a null handle
    /// yields a null `ValueReference` without failing.
    pub fn deref_as_value(&self) -> ValueReference<T> {
        ValueReference::from_block(self.block.clone())
    }
}

impl<T> Default for StrongReference<T> {
    /// An empty handle.
    fn default() -> Self {
        StrongReference::null()
    }
}

impl<T: Referenceable> From<T> for StrongReference<T> {
    fn from(value: T) -> Self {
        StrongReference::new(value)
    }
}

impl<T: Referenceable> TryFrom<&ValueReference<T>> for StrongReference<T> {
    type Error = ReferenceError;

    /// Share the source's storage. A null owning source yields a null
    /// strong handle; strong ownership can never be claimed over a
    /// non-heap alias.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::IllegalReference`] if the source is an alias to a
    /// non-heap instance or to a null pointer.
    fn try_from(value: &ValueReference<T>) -> Result<Self> {
        Ok(StrongReference::from_block(value.heap_block()?))
    }
}

impl<T> Clone for StrongReference<T> {
    /// Reference semantics: the clone shares the same storage.
    fn clone(&self) -> Self {
        StrongReference {
            block: self.block.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for StrongReference<T> {
    /// Value equality, independent of identity. Two empty handles compare
    /// equal.
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: PartialEq> PartialEq<T> for StrongReference<T> {
    fn eq(&self, other: &T) -> bool {
        self.get().is_some_and(|value| value == other)
    }
}

impl<T: fmt::Debug> fmt::Debug for StrongReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => write!(f, "StrongReference({value:?})"),
            None => f.write_str("StrongReference(null)"),
        }
    }
}
