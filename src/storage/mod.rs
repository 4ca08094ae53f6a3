use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub(crate) const HISTORY_KEY: &str = "newsletterHistory";
pub(crate) const CONTENT_KEY: &str = "currentNewsletterContent";
pub(crate) const VERSION_KEY: &str = "currentNewsletterVersion";
pub(crate) const SESSION_CONTENT_KEY: &str = "currentNewsletterContentSession";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage quota exceeded while writing `{key}`")]
    QuotaExceeded { key: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// String key/value storage with the browser Web Storage contract.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(
    store: &impl KeyValueStore,
    key: &str,
) -> Option<T> {
    let json = store.get(key)?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json<T: Serialize>(
    store: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json =
        serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &json)
}

#[derive(Debug, Default)]
struct MemoryInner {
    items: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryInner {
    fn used_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-memory store. Clones share the same items, like two handles on `localStorage`.
///
/// An optional byte quota (keys + values) makes writes fail the way a full
/// browser storage does.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        let s = Self::default();
        s.set_quota(Some(quota_bytes));
        s
    }

    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.quota_bytes = quota_bytes;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.items.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StorageError::Unavailable("poisoned".to_string()))?;
        if let Some(quota) = inner.quota_bytes {
            if inner.used_without(key) + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        inner.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.items.remove(key);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebStorageArea {
    Local,
    Session,
}

/// `window.localStorage` / `window.sessionStorage`.
///
/// The handle is looked up on every call, so the value stays `Send + Sync` and
/// can live inside reactive stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebStorage {
    area: WebStorageArea,
}

impl WebStorage {
    pub fn local() -> Self {
        Self {
            area: WebStorageArea::Local,
        }
    }

    pub fn session() -> Self {
        Self {
            area: WebStorageArea::Session,
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn handle(&self) -> Option<web_sys::Storage> {
        let w = web_sys::window()?;
        match self.area {
            WebStorageArea::Local => w.local_storage().ok().flatten(),
            WebStorageArea::Session => w.session_storage().ok().flatten(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn classify_js_error(key: &str, err: &wasm_bindgen::JsValue) -> StorageError {
    use wasm_bindgen::JsCast;

    if let Some(ex) = err.dyn_ref::<web_sys::DomException>() {
        // Firefox reports NS_ERROR_DOM_QUOTA_REACHED, legacy WebKit uses code 22.
        if ex.name() == "QuotaExceededError"
            || ex.name() == "NS_ERROR_DOM_QUOTA_REACHED"
            || ex.code() == 22
        {
            return StorageError::QuotaExceeded {
                key: key.to_string(),
            };
        }
        return StorageError::Unavailable(ex.message());
    }
    StorageError::Unavailable(format!("{err:?}"))
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.handle()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = self
            .handle()
            .ok_or_else(|| StorageError::Unavailable(format!("{:?} storage", self.area)))?;
        storage
            .set_item(key, value)
            .map_err(|e| classify_js_error(key, &e))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.handle() {
            let _ = storage.remove_item(key);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for WebStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(format!(
            "{:?} storage outside a browser",
            self.area
        )))
    }

    fn remove(&self, _key: &str) {}
}

/// Ordered storage tiers sharing one `write(key, value) -> success` contract.
///
/// Tiers are tried in order; the index of the tier that accepted the write is returned.
pub struct StorageTiers<'a> {
    tiers: Vec<&'a dyn KeyValueStore>,
}

impl<'a> StorageTiers<'a> {
    pub fn new(tiers: Vec<&'a dyn KeyValueStore>) -> Self {
        Self { tiers }
    }

    /// Try every tier from `start` on. Failures are logged, never returned.
    pub fn write_from(&self, start: usize, key_for: impl Fn(usize) -> &'a str, value: &str) -> Option<usize> {
        for (i, tier) in self.tiers.iter().enumerate().skip(start) {
            let key = key_for(i);
            match tier.set(key, value) {
                Ok(()) => return Some(i),
                Err(e) => log::warn!("storage tier {i} rejected `{key}`: {e}"),
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

pub(crate) fn upsert_lru_by_key<T: Clone>(
    mut items: Vec<T>,
    item: T,
    same_key: impl Fn(&T, &T) -> bool,
    max: usize,
) -> Vec<T> {
    items.retain(|x| !same_key(x, &item));
    items.insert(0, item);
    if items.len() > max {
        items.truncate(max);
    }
    items
}
