//! Control blocks: shared storage backing one logical heap instance
//!
//! A [`Block`] holds the live value together with two reference counts. The
//! strong count tracks handles asserting ownership; the value is destroyed
//! in place the moment it reaches zero. The weak count tracks observers plus
//! one collective claim held by all strong handles together; the allocation
//! itself is freed when it reaches zero. Counts are plain [`Cell`]s: the
//! runtime documents no thread safety, and every handle built on top of this
//! module is `!Send` and `!Sync` by construction.

use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Shared mutable record backing one logical heap instance.
struct Block<T> {
    /// Number of handles currently asserting ownership.
    strong: Cell<usize>,

    /// Observer count, plus one collective claim owned by the strong handles.
    weak: Cell<usize>,

    /// The instance data; initialized until `strong` reaches zero.
    value: UnsafeCell<MaybeUninit<T>>,
}

/// A strong, owning claim on a control block.
///
/// Clone shares the block (incrementing the strong count); dropping the last
/// clone destroys the value. Identity is the block itself: two claims refer
/// to "the same instance" iff [`Shared::ptr_eq`] holds.
pub(crate) struct Shared<T> {
    block: NonNull<Block<T>>,
}

/// A weak, non-owning claim on a control block.
///
/// Never extends the value's life; [`Observer::upgrade`] fails once the last
/// strong claim is gone.
pub(crate) struct Observer<T> {
    block: NonNull<Block<T>>,
}

impl<T> Shared<T> {
    /// Allocate a fresh block owning `value`.
    pub(crate) fn new(value: T) -> Self {
        let block = Box::into_raw(Box::new(Block {
            strong: Cell::new(1),
            weak: Cell::new(1),
            value: UnsafeCell::new(MaybeUninit::new(value)),
        }));
        Shared {
            // SAFETY: Box::into_raw never returns null.
            block: unsafe { NonNull::new_unchecked(block) },
        }
    }

    fn block(&self) -> &Block<T> {
        // SAFETY: the block outlives every claim on it; we hold one.
        unsafe { self.block.as_ref() }
    }

    /// Borrow the live value.
    pub(crate) fn value(&self) -> &T {
        debug_assert!(self.block().strong.get() > 0);
        // SAFETY: strong > 0 while we exist, so the slot is initialized.
        unsafe { (*self.block().value.get()).assume_init_ref() }
    }

    /// Raw pointer to the live value.
    ///
    /// Mutation through it is governed by the runtime's single-logical-owner
    /// contract; this module performs no checking of its own.
    pub(crate) fn value_ptr(&self) -> *mut T {
        // SAFETY: strong > 0 while we exist, so the slot is initialized.
        unsafe { (*self.block().value.get()).as_mut_ptr() }
    }

    /// Take out a weak claim on the same block.
    pub(crate) fn downgrade(&self) -> Observer<T> {
        let b = self.block();
        b.weak.set(b.weak.get() + 1);
        Observer { block: self.block }
    }

    /// Current number of strong claims.
    pub(crate) fn strong_count(&self) -> usize {
        self.block().strong.get()
    }

    /// Current number of observers (the collective claim is hidden).
    pub(crate) fn weak_count(&self) -> usize {
        self.block().weak.get() - 1
    }

    /// True iff both claims are backed by the same block.
    pub(crate) fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.block == b.block
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        let b = self.block();
        b.strong.set(b.strong.get() + 1);
        Shared { block: self.block }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let b = self.block();
        let strong = b.strong.get() - 1;
        b.strong.set(strong);
        if strong != 0 {
            return;
        }

        // Last owner gone: destroy the value in place. If the value embeds
        // an anchor, dropping it releases that anchor's observer claim; the
        // collective weak claim below is still held, so the allocation
        // survives until after this returns.
        unsafe { (*b.value.get()).assume_init_drop() };

        // Release the weak claim the strong handles held collectively.
        let weak = b.weak.get() - 1;
        b.weak.set(weak);
        if weak == 0 {
            // No observers left either; free the allocation. The value slot
            // is MaybeUninit, so this only releases memory.
            unsafe { drop(Box::from_raw(self.block.as_ptr())) };
        }
    }
}

impl<T> Observer<T> {
    fn block(&self) -> &Block<T> {
        // SAFETY: the allocation outlives every claim on it; we hold one.
        unsafe { self.block.as_ref() }
    }

    /// Reclaim a strong claim, unless the value has already been destroyed.
    pub(crate) fn upgrade(&self) -> Option<Shared<T>> {
        let b = self.block();
        if b.strong.get() == 0 {
            return None;
        }
        b.strong.set(b.strong.get() + 1);
        Some(Shared { block: self.block })
    }

    /// True once the last strong claim has been released.
    pub(crate) fn is_dangling(&self) -> bool {
        self.block().strong.get() == 0
    }

    /// Raw pointer to the value, or null once it has been destroyed.
    pub(crate) fn live_ptr(&self) -> *mut T {
        let b = self.block();
        if b.strong.get() == 0 {
            return std::ptr::null_mut();
        }
        // SAFETY: strong > 0, so the slot is initialized.
        unsafe { (*b.value.get()).as_mut_ptr() }
    }
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        let b = self.block();
        b.weak.set(b.weak.get() + 1);
        Observer { block: self.block }
    }
}

impl<T> Drop for Observer<T> {
    fn drop(&mut self) {
        let b = self.block();
        let weak = b.weak.get() - 1;
        b.weak.set(weak);
        if weak == 0 {
            // The value was destroyed when the strong count hit zero; only
            // the allocation remains.
            unsafe { drop(Box::from_raw(self.block.as_ptr())) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_counts() {
        let s = Shared::new(7);
        assert_eq!(s.strong_count(), 1);
        assert_eq!(s.weak_count(), 0);
        assert_eq!(*s.value(), 7);
    }

    #[test]
    fn test_clone_shares_block() {
        let a = Shared::new(7);
        let b = a.clone();
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(a.strong_count(), 2);
        drop(b);
        assert_eq!(a.strong_count(), 1);
    }

    #[test]
    fn test_upgrade_while_live() {
        let s = Shared::new(7);
        let o = s.downgrade();
        assert!(!o.is_dangling());

        let s2 = o.upgrade().unwrap();
        assert!(Shared::ptr_eq(&s, &s2));
        assert_eq!(s.strong_count(), 2);
    }

    #[test]
    fn test_upgrade_after_last_owner() {
        let s = Shared::new(7);
        let o = s.downgrade();
        drop(s);

        assert!(o.is_dangling());
        assert!(o.upgrade().is_none());
        assert!(o.live_ptr().is_null());
    }

    #[test]
    fn test_value_dropped_with_last_owner() {
        use std::cell::Cell as StdCell;
        use std::rc::Rc;

        struct DropFlag(Rc<StdCell<bool>>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Rc::new(StdCell::new(false));
        let s = Shared::new(DropFlag(dropped.clone()));
        let o = s.downgrade();

        drop(s);
        assert!(dropped.get());

        // The allocation is still reachable through the observer.
        assert!(o.is_dangling());
    }
}
