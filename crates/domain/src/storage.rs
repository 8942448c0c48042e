//! Object storage trait and in-memory implementation.
//!
//! Payment evidence lives in an external object store outside the
//! transactional boundary. Uploads happen before the order transaction
//! opens, so an upload failure aborts creation with no database writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the object-storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The upload was rejected or the backend is unreachable.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Deleting a stored object failed.
    #[error("Delete failed: {0}")]
    Delete(String),
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedObject {
    /// The reference under which the object can later be retrieved or
    /// deleted.
    pub url: String,
}

/// Trait for external object-storage operations.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads raw bytes under the given folder and returns the stored
    /// object's reference.
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<UploadedObject, StorageError>;

    /// Deletes a previously uploaded object by its reference.
    async fn delete_by_reference(&self, reference: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct InMemoryStorageState {
    objects: HashMap<String, Vec<u8>>,
    next_id: u32,
    fail_on_upload: bool,
}

/// In-memory object storage for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStorage {
    state: Arc<RwLock<InMemoryStorageState>>,
}

impl InMemoryObjectStorage {
    /// Creates a new in-memory object storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the storage to fail on the next upload call.
    pub async fn set_fail_on_upload(&self, fail: bool) {
        self.state.write().await.fail_on_upload = fail;
    }

    /// Returns the number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.state.read().await.objects.len()
    }

    /// Returns true if an object exists under the given reference.
    pub async fn has_object(&self, reference: &str) -> bool {
        self.state.read().await.objects.contains_key(reference)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> Result<UploadedObject, StorageError> {
        let mut state = self.state.write().await;

        if state.fail_on_upload {
            return Err(StorageError::Upload("storage unavailable".to_string()));
        }

        state.next_id += 1;
        let url = format!("mem://{}/{:06}", folder, state.next_id);
        state.objects.insert(url.clone(), bytes);

        Ok(UploadedObject { url })
    }

    async fn delete_by_reference(&self, reference: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state.objects.remove(reference);
        Ok(())
    }
}
