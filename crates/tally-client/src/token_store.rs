//! Access token storage.
//!
//! The access token lives in a tab-scoped key/value slot (`access_token`).
//! Where that slot comes from is injected at construction: a browser's
//! `sessionStorage` on wasm32, an in-process map elsewhere, or nothing at all
//! when running before hydration, in which case every operation degrades to
//! "no token".
//!
//! Writes are versioned by a session epoch that advances on every
//! [`TokenStore::clear`]. A refresh started under an older epoch cannot
//! bring back a session that was cleared while it was in flight.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

// ============================================================================
// TokenStorage Trait
// ============================================================================

/// A key/value slot the token store writes into.
///
/// Implementations never fail: an unusable backend behaves as empty.
pub trait TokenStorage: Send + Sync + std::fmt::Debug {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str);

    fn remove_item(&self, key: &str);
}

/// In-process storage, scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.lock().insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.lock().remove(key);
    }
}

/// The browser's `sessionStorage`, looked up on every call.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct BrowserSessionStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserSessionStorage {
    /// Returns `None` when no window or no session storage is available.
    pub fn open() -> Option<Self> {
        Self::raw().map(|_| Self)
    }

    fn raw() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|w| w.session_storage().ok().flatten())
    }
}

#[cfg(target_arch = "wasm32")]
impl TokenStorage for BrowserSessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::raw().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set_item(&self, key: &str, value: &str) {
        if let Some(storage) = Self::raw() {
            let _ = storage.set_item(key, value);
        }
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = Self::raw() {
            let _ = storage.remove_item(key);
        }
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Holder of the current access token.
///
/// Cheap to clone; clones share the same slot and epoch.
#[derive(Debug, Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    backend: Option<Arc<dyn TokenStorage>>,
    /// Session epoch. Held while touching the backend so check-then-write
    /// is atomic.
    epoch: Mutex<u64>,
}

impl TokenStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn TokenStorage>) -> Self {
        Self::with_backend(Some(backend))
    }

    /// Create a store with no storage available. Every read is empty and
    /// every write is dropped.
    pub fn unavailable() -> Self {
        Self::with_backend(None)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Pick the storage for the current platform: `sessionStorage` in a
    /// browser, or nothing if it is unavailable.
    #[cfg(target_arch = "wasm32")]
    pub fn detect() -> Self {
        match BrowserSessionStorage::open() {
            Some(storage) => Self::new(Arc::new(storage)),
            None => Self::unavailable(),
        }
    }

    /// Pick the storage for the current platform: process memory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn detect() -> Self {
        Self::in_memory()
    }

    fn with_backend(backend: Option<Arc<dyn TokenStorage>>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                backend,
                epoch: Mutex::new(0),
            }),
        }
    }

    /// Whether a storage backend is present at all.
    pub fn is_available(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Current token. Empty strings count as absent.
    pub fn get(&self) -> Option<String> {
        let _epoch = self.inner.epoch.lock();
        self.read()
    }

    /// Store a token.
    pub fn set(&self, token: &str) {
        let _epoch = self.inner.epoch.lock();
        self.write(token);
    }

    /// Remove the token and start a new session epoch.
    pub fn clear(&self) {
        let mut epoch = self.inner.epoch.lock();
        *epoch += 1;
        if let Some(backend) = &self.inner.backend {
            backend.remove_item(ACCESS_TOKEN_KEY);
        }
    }

    pub fn exists(&self) -> bool {
        self.get().is_some()
    }

    /// Current session epoch.
    pub fn epoch(&self) -> u64 {
        *self.inner.epoch.lock()
    }

    /// Token and epoch read together.
    pub fn snapshot(&self) -> (Option<String>, u64) {
        let epoch = self.inner.epoch.lock();
        (self.read(), *epoch)
    }

    /// Store `token` only if no `clear` has happened since `epoch`.
    ///
    /// Returns whether the write happened.
    pub fn set_if_epoch(&self, token: &str, epoch: u64) -> bool {
        let current = self.inner.epoch.lock();
        if *current != epoch {
            return false;
        }
        self.write(token);
        true
    }

    /// Remove the token only if no `clear` has happened since `epoch`.
    ///
    /// Returns whether the clear happened. A successful clear starts a new
    /// epoch, like [`TokenStore::clear`].
    pub fn clear_if_epoch(&self, epoch: u64) -> bool {
        let mut current = self.inner.epoch.lock();
        if *current != epoch {
            return false;
        }
        *current += 1;
        if let Some(backend) = &self.inner.backend {
            backend.remove_item(ACCESS_TOKEN_KEY);
        }
        true
    }

    fn read(&self) -> Option<String> {
        self.inner
            .backend
            .as_ref()
            .and_then(|b| b.get_item(ACCESS_TOKEN_KEY))
            .filter(|t| !t.is_empty())
    }

    fn write(&self, token: &str) {
        if let Some(backend) = &self.inner.backend {
            backend.set_item(ACCESS_TOKEN_KEY, token);
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::detect()
    }
}
