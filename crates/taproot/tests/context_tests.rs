//! Execution-context storage of module-global record instances

use pretty_assertions::assert_eq;
use taproot::*;

#[derive(Debug, Default)]
struct HttpGlobals {
    request_count: u64,
    anchor: Anchor<HttpGlobals>,
}

impl Referenceable for HttpGlobals {
    fn anchor(&self) -> Option<&Anchor<HttpGlobals>> {
        Some(&self.anchor)
    }
}

#[derive(Debug, Default)]
struct DnsGlobals {
    query_count: u64,
    anchor: Anchor<DnsGlobals>,
}

impl Referenceable for DnsGlobals {
    fn anchor(&self) -> Option<&Anchor<DnsGlobals>> {
        Some(&self.anchor)
    }
}

#[test]
fn test_new_context_is_empty() {
    let ctx = RuntimeContext::new();
    assert!(ctx.is_empty());
    assert_eq!(ctx.module_count(), 0);
}

#[test]
fn test_indices_follow_registration_order() {
    let mut ctx = RuntimeContext::new();
    let http = ctx.init_module_globals::<HttpGlobals>("http");
    let dns = ctx.init_module_globals::<DnsGlobals>("dns");

    assert_eq!((http, dns), (0, 1));
    assert_eq!(ctx.module_index("http"), Some(0));
    assert_eq!(ctx.module_index("dns"), Some(1));
    assert_eq!(ctx.module_index("ftp"), None);
    assert_eq!(ctx.module_count(), 2);
}

#[test]
fn test_fetch_by_index_and_name_agree() {
    let mut ctx = RuntimeContext::new();
    let idx = ctx.init_module_globals::<HttpGlobals>("http");

    let by_index = ctx.module_globals::<HttpGlobals>(idx).unwrap();
    let by_name = ctx.module_globals_by_name::<HttpGlobals>("http").unwrap();
    assert_eq!(by_index.as_ptr(), by_name.as_ptr());
}

#[test]
fn test_globals_are_shared_across_fetches() {
    let mut ctx = RuntimeContext::new();
    let idx = ctx.init_module_globals::<HttpGlobals>("http");

    // Generated code fetches a handle, mutates through it, and every later
    // fetch observes the same instance.
    let mut handle = ctx.module_globals::<HttpGlobals>(idx).unwrap().clone();
    // The context holds its own handle; nothing borrows it during the write.
    unsafe { handle.try_deref_mut().unwrap().request_count = 7 };

    let again = ctx.module_globals::<HttpGlobals>(idx).unwrap();
    assert_eq!(again.try_deref().unwrap().request_count, 7);
}

#[test]
fn test_set_module_globals_keeps_identity() {
    let mut ctx = RuntimeContext::new();
    let instance = StrongReference::new(HttpGlobals::default());
    let idx = ctx.set_module_globals("http", instance.clone());

    let stored = ctx.module_globals::<HttpGlobals>(idx).unwrap();
    assert_eq!(stored.as_ptr(), instance.as_ptr());
}

#[test]
fn test_context_keeps_globals_alive_until_cleared() {
    let mut ctx = RuntimeContext::new();
    let idx = ctx.init_module_globals::<HttpGlobals>("http");

    let watch = WeakReference::from(ctx.module_globals::<HttpGlobals>(idx).unwrap());
    assert!(!watch.is_expired());

    ctx.clear();
    assert!(watch.is_expired());
    assert!(ctx.is_empty());
}

#[test]
fn test_dropping_the_context_releases_globals() {
    let watch;
    {
        let mut ctx = RuntimeContext::new();
        let idx = ctx.init_module_globals::<DnsGlobals>("dns");
        watch = WeakReference::from(ctx.module_globals::<DnsGlobals>(idx).unwrap());
        assert!(!watch.is_expired());
    }
    assert!(watch.is_expired());
}

#[test]
fn test_error_cases() {
    let mut ctx = RuntimeContext::new();
    let idx = ctx.init_module_globals::<HttpGlobals>("http");

    assert_eq!(
        ctx.module_globals::<HttpGlobals>(idx + 1).unwrap_err(),
        ContextError::UnknownModule { index: idx + 1 }
    );
    assert_eq!(
        ctx.module_globals_by_name::<HttpGlobals>("dns").unwrap_err(),
        ContextError::UnregisteredModule {
            module: "dns".to_string()
        }
    );
    assert_eq!(
        ctx.module_globals::<DnsGlobals>(idx).unwrap_err(),
        ContextError::GlobalTypeMismatch {
            module: "http".to_string()
        }
    );
}
