//! Execution-context state: module-global instance storage
//!
//! Compiled modules keep their global variables in a record instance that
//! must stay alive for as long as the execution context that initialized it.
//! Rather than ambient process-wide state, each [`RuntimeContext`] owns an
//! insertion-ordered store of type-erased strong handles: insertion order
//! doubles as the module index the code generator bakes into accesses, and
//! dropping (or clearing) the context releases every instance
//! deterministically.

use std::any::Any;

use indexmap::IndexMap;
use tracing::debug;

use crate::capability::Referenceable;
use crate::error::ContextError;
use crate::reference::StrongReference;

/// Explicit, lifecycle-scoped state owned by one logical execution context.
///
/// Holds the strong handles that keep module-global record instances alive.
/// Passed by reference to whatever runs inside the context; there is no
/// global registry and no implicit initialization order.
///
/// # Example
///
/// ```
/// use taproot::RuntimeContext;
///
/// #[derive(Default)]
/// struct HttpGlobals {
///     request_count: u64,
/// }
/// impl taproot::Referenceable for HttpGlobals {}
///
/// let mut ctx = RuntimeContext::new();
/// let idx = ctx.init_module_globals::<HttpGlobals>("http");
///
/// let globals = ctx.module_globals::<HttpGlobals>(idx).unwrap();
/// assert_eq!(globals.try_deref().unwrap().request_count, 0);
/// ```
#[derive(Default)]
pub struct RuntimeContext {
    /// Type-erased `StrongReference<T>` per module, in registration order.
    globals: IndexMap<String, Box<dyn Any>>,
}

impl RuntimeContext {
    /// Create a context with no registered modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, default-constructed globals instance for `module`
    /// and return its index.
    ///
    /// Re-initializing a registered module replaces its instance and keeps
    /// its index.
    pub fn init_module_globals<T>(&mut self, module: &str) -> usize
    where
        T: Referenceable + Default + 'static,
    {
        self.set_module_globals(module, StrongReference::new(T::default()))
    }

    /// Store an existing globals handle for `module` and return its index.
    pub fn set_module_globals<T: 'static>(
        &mut self,
        module: &str,
        globals: StrongReference<T>,
    ) -> usize {
        let (index, replaced) = self.globals.insert_full(module.to_string(), Box::new(globals));
        debug!(module, index, replaced = replaced.is_some(), "module globals registered");
        index
    }

    /// The globals handle registered at `index`.
    ///
    /// # Errors
    ///
    /// [`ContextError::UnknownModule`] for an out-of-range index;
    /// [`ContextError::GlobalTypeMismatch`] if the stored handle has a
    /// different type than requested.
    pub fn module_globals<T: 'static>(
        &self,
        index: usize,
    ) -> Result<&StrongReference<T>, ContextError> {
        let (module, boxed) = self
            .globals
            .get_index(index)
            .ok_or(ContextError::UnknownModule { index })?;
        boxed
            .downcast_ref::<StrongReference<T>>()
            .ok_or_else(|| ContextError::GlobalTypeMismatch {
                module: module.clone(),
            })
    }

    /// The globals handle registered under `module`.
    ///
    /// # Errors
    ///
    /// [`ContextError::UnregisteredModule`] for an unknown name;
    /// [`ContextError::GlobalTypeMismatch`] if the stored handle has a
    /// different type than requested.
    pub fn module_globals_by_name<T: 'static>(
        &self,
        module: &str,
    ) -> Result<&StrongReference<T>, ContextError> {
        let boxed = self
            .globals
            .get(module)
            .ok_or_else(|| ContextError::UnregisteredModule {
                module: module.to_string(),
            })?;
        boxed
            .downcast_ref::<StrongReference<T>>()
            .ok_or_else(|| ContextError::GlobalTypeMismatch {
                module: module.to_string(),
            })
    }

    /// The index assigned to `module`, if registered.
    pub fn module_index(&self, module: &str) -> Option<usize> {
        self.globals.get_index_of(module)
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.globals.len()
    }

    /// True iff no module has been registered.
    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    /// Release every stored globals instance.
    pub fn clear(&mut self) {
        debug!(modules = self.globals.len(), "clearing module globals");
        self.globals.clear();
    }
}
