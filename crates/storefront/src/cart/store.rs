//! Durable storage for the cart handle.
//!
//! Only the remote cart's ID is persisted, never its contents. The stored
//! document is `{"cartId": "<gid>"}` under a single well-known location.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopfront_core::CartId;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors persisting or clearing the handle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cart handle: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk shape of the stored handle.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHandle {
    cart_id: CartId,
}

/// Key-value persistence for the single cart handle of a session.
///
/// `load` never fails: missing, unreadable or corrupt data reads as `None`.
#[async_trait]
pub trait HandleStore: Send + Sync {
    async fn load(&self) -> Option<CartId>;
    async fn save(&self, cart_id: &CartId) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Decode a stored handle document, rejecting blank IDs.
fn decode(raw: &str) -> Option<CartId> {
    match serde_json::from_str::<StoredHandle>(raw) {
        Ok(stored) if !stored.cart_id.is_blank() => Some(stored.cart_id),
        Ok(_) => {
            warn!("Stored cart handle is blank; ignoring");
            None
        }
        Err(e) => {
            warn!(error = %e, "Stored cart handle is corrupt; ignoring");
            None
        }
    }
}

// =============================================================================
// FileHandleStore
// =============================================================================

/// Handle store backed by a small JSON file.
///
/// Writes go to a sibling temp file and are renamed into place so a crash
/// mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct FileHandleStore {
    path: PathBuf,
}

impl FileHandleStore {
    /// Store the handle at `path`. Parent directories are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the handle file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl HandleStore for FileHandleStore {
    async fn load(&self) -> Option<CartId> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cart handle unreadable; ignoring");
                None
            }
        }
    }

    async fn save(&self, cart_id: &CartId) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&StoredHandle {
            cart_id: cart_id.clone(),
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Cart handle saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cart handle cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// MemoryHandleStore
// =============================================================================

/// Process-local handle store, holding the JSON document in memory.
#[derive(Debug, Default)]
pub struct MemoryHandleStore {
    raw: Mutex<Option<String>>,
}

impl MemoryHandleStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a raw document, corrupt or not.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// A store already holding `cart_id`.
    #[must_use]
    pub fn with_handle(cart_id: &CartId) -> Self {
        let raw = serde_json::json!({ "cartId": cart_id }).to_string();
        Self::with_raw(raw)
    }

    /// The raw stored document, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HandleStore for MemoryHandleStore {
    async fn load(&self) -> Option<CartId> {
        self.raw().as_deref().and_then(decode)
    }

    async fn save(&self, cart_id: &CartId) -> Result<(), StoreError> {
        let body = serde_json::to_string(&StoredHandle {
            cart_id: cart_id.clone(),
        })?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(body);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("shopfront-store-{}", uuid::Uuid::new_v4()))
            .join("cart.json")
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryHandleStore::new();
        assert!(store.load().await.is_none());

        let id = CartId::new("gid://shopify/Cart/abc?key=1");
        store.save(&id).await.unwrap();
        assert_eq!(store.raw().unwrap(), r#"{"cartId":"gid://shopify/Cart/abc?key=1"}"#);
        assert_eq!(store.load().await, Some(id));

        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_data_reads_as_absent() {
        for raw in ["not json", "{}", r#"{"cartId": 42}"#, r#"{"cartId": "  "}"#, ""] {
            let store = MemoryHandleStore::with_raw(raw);
            assert!(store.load().await.is_none(), "expected None for {raw:?}");
        }
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let path = temp_path();
        let store = FileHandleStore::new(&path);
        assert!(store.load().await.is_none());

        let id = CartId::new("gid://shopify/Cart/file");
        store.save(&id).await.unwrap();
        assert_eq!(store.load().await, Some(id));

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, r#"{"cartId":"gid://shopify/Cart/file"}"#);

        store.clear().await.unwrap();
        assert!(store.load().await.is_none());
        // Clearing twice is fine
        store.clear().await.unwrap();

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_reads_as_absent() {
        let path = temp_path();
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, b"{\"cartId\":").await.unwrap();

        let store = FileHandleStore::new(&path);
        assert!(store.load().await.is_none());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
