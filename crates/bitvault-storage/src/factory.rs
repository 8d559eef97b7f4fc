#[cfg(feature = "storage-local")]
use crate::LocalBitStore;
#[cfg(feature = "storage-s3")]
use crate::S3BitStore;
use crate::{BitStore, StoreKind, StoreResult};
use bitvault_core::StoreSettings;
use std::sync::Arc;

/// Create a bitstream store from settings.
///
/// Selects the backend at configuration time, constructs it, and runs
/// `init` so the returned handle is already Ready. The handle is shared
/// by cloning the `Arc`; the backends are safe for concurrent use.
pub async fn create_store(settings: &StoreSettings) -> StoreResult<Arc<dyn BitStore>> {
    let store: Arc<dyn BitStore> = match settings.backend {
        #[cfg(feature = "storage-s3")]
        StoreKind::S3 => Arc::new(S3BitStore::new(settings)?),

        #[cfg(not(feature = "storage-s3"))]
        StoreKind::S3 => {
            return Err(crate::StoreError::Config(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-local")]
        StoreKind::Local => Arc::new(LocalBitStore::new(settings)?),

        #[cfg(not(feature = "storage-local"))]
        StoreKind::Local => {
            return Err(crate::StoreError::Config(
                "Local storage backend not available (storage-local feature not enabled)"
                    .to_string(),
            ))
        }
    };

    store.init().await?;
    Ok(store)
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::StoreError;
    use bitvault_core::MetadataField;
    use futures::StreamExt;
    use std::pin::Pin;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_local_store_round_trip_through_trait_object() {
        let dir = tempdir().unwrap();
        let settings = StoreSettings::local(dir.path().to_string_lossy().to_string());

        let store = create_store(&settings).await.unwrap();
        assert_eq!(store.kind(), StoreKind::Local);

        let id = store.generate_id();
        let data = b"via the trait object".to_vec();
        let reader = Box::pin(std::io::Cursor::new(data.clone()))
            as Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

        let descriptor = store.put(&id, reader).await.unwrap();
        assert_eq!(descriptor.size_bytes, data.len() as u64);

        let metadata = store
            .about(&id, &[MetadataField::SizeBytes, MetadataField::Modified])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.size_bytes, Some(data.len() as u64));
        assert!(metadata.last_modified.is_some());

        let mut stream = store.get(&id).await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, downloaded);

        store.remove(&id).await.unwrap();
        assert!(store.about(&id, &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_store_requires_path() {
        let mut settings = StoreSettings::local("");
        settings.local_path = None;

        let result = create_store(&settings).await;
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
