//! Liveness-tracking, non-owning observation handles

use std::fmt;
use std::ops::Deref;
use std::ptr;

use crate::block::{Observer, Shared};
use crate::capability::Referenceable;
use crate::error::{ReferenceError, Result};
use crate::reference::strong::StrongReference;
use crate::reference::value::ValueReference;

/// A non-owning handle that tracks the liveness of an instance without ever
/// extending its life.
///
/// This is the cycle-breaking edge of an ownership graph: a record field
/// declared as "back-reference" lowers to a `WeakReference`, so that the
/// back edge never keeps its target alive.
///
/// Emptiness and expiry are distinct states. An empty handle was never
/// pointed at anything, so it cannot have expired: `is_expired()` is false.
/// An expired handle observed an instance that has since been destroyed:
/// both `is_expired()` and `is_null()` are true, and every access reports
/// null rather than touching freed storage.
///
/// Access to the live value goes through a [`WeakGuard`], which holds a
/// temporary ownership claim of its own. The weak handle never keeps the
/// instance alive, but a borrow obtained through it must, or the last
/// strong handle could destroy the value out from under the borrow.
///
/// # Example
///
/// ```
/// use taproot::{StrongReference, WeakReference};
///
/// let mut strong = StrongReference::new(42i64);
/// let weak = WeakReference::from(&strong);
/// assert!(!weak.is_expired());
/// assert_eq!(*weak.try_deref().unwrap(), 42);
///
/// strong.reset();
/// assert!(weak.is_expired());
/// assert!(weak.get().is_none());
/// ```
pub struct WeakReference<T> {
    link: Option<Observer<T>>,
}

/// A borrow of a live value reached through a [`WeakReference`].
///
/// The guard holds its own ownership claim on the instance, so the value
/// stays alive for as long as the guard does, even if every strong handle
/// releases its claim in the meantime. Dropping the guard releases the
/// claim; if it was the last one, the value is destroyed and the weak
/// handle reports expired from then on.
pub struct WeakGuard<T> {
    block: Shared<T>,
}

impl<T> Deref for WeakGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.block.value()
    }
}

impl<T: fmt::Debug> fmt::Debug for WeakGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakGuard({:?})", self.block.value())
    }
}

impl<T> WeakReference<T> {
    /// Create an empty handle: `is_null()` true, `is_expired()` false.
    pub fn new() -> Self {
        WeakReference { link: None }
    }

    /// True iff the observed instance existed and has since been destroyed
    /// while this handle still holds its (now stale) link. Always false for
    /// an empty handle.
    pub fn is_expired(&self) -> bool {
        self.link.as_ref().is_some_and(Observer::is_dangling)
    }

    /// True iff the handle is empty or its target has expired.
    pub fn is_null(&self) -> bool {
        self.link.as_ref().is_none_or(Observer::is_dangling)
    }

    /// Borrow the live value through a guard, or `None` if the handle is
    /// empty or expired. The guard keeps the instance alive while it exists.
    pub fn get(&self) -> Option<WeakGuard<T>> {
        self.link
            .as_ref()
            .and_then(Observer::upgrade)
            .map(|block| WeakGuard { block })
    }

    /// Reclaim a shared-ownership handle over the live instance, or `None`
    /// if the handle is empty or expired.
    pub fn upgrade(&self) -> Option<StrongReference<T>> {
        self.link
            .as_ref()
            .and_then(Observer::upgrade)
            .map(|block| StrongReference::from_block(Some(block)))
    }

    /// Raw pointer to the live value; null if the handle is empty or
    /// expired.
    pub fn as_ptr(&self) -> *const T {
        match &self.link {
            Some(link) => link.live_ptr(),
            None => ptr::null(),
        }
    }

    /// Borrow the live value through a guard.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::NullReference`] if the handle is empty or expired.
    pub fn try_deref(&self) -> Result<WeakGuard<T>> {
        self.get().ok_or(ReferenceError::NullReference)
    }

    /// Drop the observation link; afterwards the handle is empty.
    pub fn reset(&mut self) {
        self.link = None;
    }
}

impl<T: Referenceable> WeakReference<T> {
    /// A [`ValueReference`] sharing the live instance, or a null
    /// `ValueReference` if the handle is empty or expired. Never fails.
    pub fn deref_as_value(&self) -> ValueReference<T> {
        ValueReference::from_block(self.link.as_ref().and_then(Observer::upgrade))
    }
}

impl<T> Default for WeakReference<T> {
    /// An empty handle.
    fn default() -> Self {
        WeakReference::new()
    }
}

impl<T> From<&StrongReference<T>> for WeakReference<T> {
    /// Observe the source's instance without affecting its strong count.
    /// A null source yields an empty handle, not a failure.
    fn from(strong: &StrongReference<T>) -> Self {
        WeakReference {
            link: strong.block().map(|block| block.downgrade()),
        }
    }
}

impl<T: Referenceable> TryFrom<&ValueReference<T>> for WeakReference<T> {
    type Error = ReferenceError;

    /// Observe the source's storage. A null owning source yields an empty
    /// handle; aliases are resolved through the instance's anchor.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::IllegalReference`] if the source is an alias to a
    /// non-heap instance or to a null pointer.
    fn try_from(value: &ValueReference<T>) -> Result<Self> {
        Ok(WeakReference {
            link: value.heap_block()?.map(|block| block.downgrade()),
        })
    }
}

impl<T> Clone for WeakReference<T> {
    /// Reference semantics: the clone shares the observation link.
    fn clone(&self) -> Self {
        WeakReference {
            link: self.link.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for WeakReference<T> {
    /// Value equality over the live targets. Two handles with no live
    /// target (empty or expired) compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => *a == *b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for WeakReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.link, self.get()) {
            (_, Some(value)) => write!(f, "WeakReference({:?})", &*value),
            (Some(_), None) => f.write_str("WeakReference(expired)"),
            (None, None) => f.write_str("WeakReference(null)"),
        }
    }
}
