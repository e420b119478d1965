//! Mapped diagnostic context
//!
//! A per-thread string map. Every event created on a thread copies the map as
//! it stands at that moment, so later changes never leak into events that were
//! already built.

use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static MDC_MAP: RefCell<BTreeMap<String, String>> = const { RefCell::new(BTreeMap::new()) };
}

/// Entry point for the current thread's diagnostic map
///
/// # Example
///
/// ```
/// use hierlog::core::Mdc;
///
/// Mdc::put("request_id", "abc-123");
/// assert_eq!(Mdc::get("request_id").as_deref(), Some("abc-123"));
/// Mdc::remove("request_id");
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Mdc;

impl Mdc {
    pub fn put<K, V>(key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        MDC_MAP.with(|map| {
            map.borrow_mut().insert(key.into(), value.into());
        });
    }

    pub fn get(key: &str) -> Option<String> {
        MDC_MAP.with(|map| map.borrow().get(key).cloned())
    }

    pub fn remove(key: &str) -> Option<String> {
        MDC_MAP.with(|map| map.borrow_mut().remove(key))
    }

    pub fn clear() {
        MDC_MAP.with(|map| map.borrow_mut().clear());
    }

    /// Copy of the current thread's map
    pub fn snapshot() -> BTreeMap<String, String> {
        MDC_MAP.with(|map| map.borrow().clone())
    }

    /// Put `key` and remove it again when the guard drops
    ///
    /// ```
    /// use hierlog::core::Mdc;
    ///
    /// {
    ///     let _guard = Mdc::scoped("user", "alice");
    ///     assert!(Mdc::get("user").is_some());
    /// }
    /// assert!(Mdc::get("user").is_none());
    /// ```
    #[must_use = "the key is removed as soon as the guard is dropped"]
    pub fn scoped<K, V>(key: K, value: V) -> MdcGuard
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        let previous = MDC_MAP.with(|map| map.borrow_mut().insert(key.clone(), value.into()));
        MdcGuard { key, previous }
    }
}

/// RAII guard for a scoped MDC entry
///
/// Restores the value the key had before the guard was created, if any.
pub struct MdcGuard {
    key: String,
    previous: Option<String>,
}

impl Drop for MdcGuard {
    fn drop(&mut self) {
        let key = std::mem::take(&mut self.key);
        let previous = self.previous.take();
        MDC_MAP.with(|map| {
            let mut map = map.borrow_mut();
            match previous {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }
        });
    }
}
