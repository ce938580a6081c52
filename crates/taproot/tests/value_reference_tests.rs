//! ValueReference behavior across its owning and aliasing states

use pretty_assertions::assert_eq;
use taproot::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Record {
    x: i64,
    anchor: Anchor<Record>,
}

impl Record {
    fn new(x: i64) -> Self {
        Record {
            x,
            anchor: Anchor::new(),
        }
    }

    /// A generated method body recovering a handle to `*this`.
    fn check_self(&mut self, expected: i64) {
        let this = unsafe { ValueReference::alias(self as *mut Record) };
        assert_eq!(this.try_deref().unwrap().x, expected);
    }
}

impl Referenceable for Record {
    fn anchor(&self) -> Option<&Anchor<Record>> {
        Some(&self.anchor)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_default_is_fresh_default_value() {
    let scalar = ValueReference::<i64>::default();
    assert!(!scalar.is_null());
    assert_eq!(*scalar.try_deref().unwrap(), 0);

    let record = ValueReference::<Record>::default();
    assert!(!record.is_null());
    assert!(record.get().is_some());
}

#[test]
fn test_construct_from_value() {
    let handle = ValueReference::new(42i64);
    assert_eq!(*handle.try_deref().unwrap(), 42);
    assert!(!handle.as_ptr().is_null());

    let from: ValueReference<i64> = 42.into();
    assert_eq!(from, handle);
}

#[test]
fn test_null_constructor() {
    let handle = ValueReference::<i64>::null();
    assert!(handle.is_null());
    assert!(handle.get().is_none());
    assert!(handle.as_ptr().is_null());

    // A null owning handle still yields a (null) strong handle without
    // failing.
    assert!(handle.as_strong().unwrap().is_null());
}

// ═══════════════════════════════════════════════════════════════════════
// Copy Semantics: the owning/aliasing asymmetry
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_owning_copy_has_new_identity() {
    let a = ValueReference::new(Record::new(42));
    let b = a.clone();

    assert_eq!(a, b);
    assert_ne!(a.as_ptr(), b.as_ptr());
}

#[test]
fn test_alias_copy_preserves_identity() {
    let mut on_stack = Record::new(7);
    let a = unsafe { ValueReference::alias(&mut on_stack as *mut Record) };
    let b = a.clone();

    assert!(a.is_aliasing());
    assert!(b.is_aliasing());
    assert_eq!(a.as_ptr(), b.as_ptr());
}

#[test]
fn test_null_owning_copy_stays_null() {
    let a = ValueReference::<Record>::null();
    let b = a.clone();
    assert!(b.is_null());
}

// ═══════════════════════════════════════════════════════════════════════
// Dereference and Null Handling
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_null_alias_dereference_fails() {
    let handle = unsafe { ValueReference::<Record>::alias(std::ptr::null_mut()) };

    assert!(handle.is_null());
    assert!(handle.get().is_none());
    assert_eq!(
        handle.try_deref().unwrap_err(),
        ReferenceError::NullReference
    );
}

#[test]
fn test_mutation_through_alias_hits_the_instance() {
    let mut on_stack = Record::new(0);
    let mut this = unsafe { ValueReference::alias(&mut on_stack as *mut Record) };

    // The alias contract vouches for exclusivity; `on_stack` is not
    // touched again until the write completes.
    unsafe { this.try_deref_mut().unwrap().x = 42 };
    assert_eq!(this.try_deref().unwrap().x, 42);
    assert_eq!(on_stack.x, 42);
}

#[test]
fn test_get_mut_requires_exclusive_storage() {
    let mut handle = ValueReference::new(Record::new(1));
    handle.get_mut().unwrap().x = 2;
    assert_eq!(handle.try_deref().unwrap().x, 2);

    // Shared storage refuses checked mutable access until the other
    // handle is gone.
    let strong = handle.as_strong().unwrap();
    assert!(handle.get_mut().is_none());
    drop(strong);
    assert!(handle.get_mut().is_some());

    // A weak observer could still reach the value, so it counts too.
    let watch = WeakReference::try_from(&handle).unwrap();
    assert!(handle.get_mut().is_none());
    drop(watch);
    assert!(handle.get_mut().is_some());

    // An alias's storage is managed elsewhere and never passes the check.
    let mut on_stack = Record::new(7);
    let mut this = unsafe { ValueReference::alias(&mut on_stack as *mut Record) };
    assert!(this.get_mut().is_none());
}

#[test]
fn test_self_reconstruction_in_method_body() {
    let mut handle = ValueReference::new(Record::new(11));
    handle.get_mut().unwrap().check_self(11);
}

// ═══════════════════════════════════════════════════════════════════════
// Ownership Conversions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_owning_as_strong_shares_storage() {
    let handle = ValueReference::new(Record::new(42));
    let strong = handle.as_strong().unwrap();

    assert_eq!(strong.as_ptr(), handle.as_ptr());
    assert_eq!(strong.try_deref().unwrap().x, 42);
}

#[test]
fn test_heap_alias_recovers_owning_identity() {
    let handle = ValueReference::new(Record::new(42));
    let this = unsafe { ValueReference::alias(handle.as_ptr() as *mut Record) };

    let strong = this.as_strong().unwrap();
    assert_eq!(strong.as_ptr(), handle.as_ptr());
}

#[test]
fn test_null_alias_cannot_claim_ownership() {
    let handle = unsafe { ValueReference::<Record>::alias(std::ptr::null_mut()) };

    assert_eq!(
        handle.as_strong().unwrap_err(),
        ReferenceError::IllegalReference {
            reason: "unexpected state of value reference"
        }
    );
}

#[test]
fn test_stack_alias_cannot_claim_ownership() {
    let mut on_stack = Record::new(42);
    let this = unsafe { ValueReference::alias(&mut on_stack as *mut Record) };

    let expected = ReferenceError::IllegalReference {
        reason: "reference to non-heap instance",
    };
    assert_eq!(this.as_strong().unwrap_err(), expected);
    assert_eq!(StrongReference::try_from(&this).unwrap_err(), expected);
    assert_eq!(WeakReference::try_from(&this).unwrap_err(), expected);
}

#[test]
fn test_scalar_stack_alias_is_non_heap_too() {
    // Scalars keep the provided anchor body (no anchor), so an alias to one
    // can never be promoted.
    let mut x = 5i64;
    let this = unsafe { ValueReference::alias(&mut x as *mut i64) };

    assert_eq!(
        this.as_strong().unwrap_err(),
        ReferenceError::IllegalReference {
            reason: "reference to non-heap instance"
        }
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Reset and Take
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reset_owning() {
    let mut handle = ValueReference::new(Record::new(1));
    assert!(!handle.is_null());

    handle.reset();
    assert!(handle.is_null());
}

#[test]
fn test_reset_alias() {
    let mut on_stack = Record::new(1);
    let mut handle = unsafe { ValueReference::alias(&mut on_stack as *mut Record) };
    assert!(!handle.is_null());

    handle.reset();
    assert!(handle.is_null());
    assert!(handle.is_aliasing());
}

#[test]
fn test_take_leaves_source_null() {
    let mut source = ValueReference::new(42i64);
    let taken = source.take();

    assert!(source.is_null());
    assert_eq!(*taken.try_deref().unwrap(), 42);
}

// ═══════════════════════════════════════════════════════════════════════
// Equality
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_equality_is_value_equality() {
    let a = ValueReference::new(42i64);
    let b = ValueReference::new(42i64);

    assert_ne!(a.as_ptr(), b.as_ptr());
    assert_eq!(a, b);
    assert!(a == 42);
    assert!(a != 43);
    assert_ne!(a, ValueReference::new(43i64));
}

#[test]
fn test_null_equality() {
    let null_a = ValueReference::<i64>::null();
    let null_b = ValueReference::<i64>::null();

    assert_eq!(null_a, null_b);
    assert_ne!(null_a, ValueReference::new(0i64));
    assert!(null_a != 0);
}
