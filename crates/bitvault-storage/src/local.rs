//! Local filesystem bitstream store.
//!
//! The peer backend behind the same contract as the object store. Objects
//! live under a base directory, fanned out into intermediate directories
//! derived from the id so no single directory grows unbounded. The
//! "backend-reported" checksum here is a SHA-256 computed while the
//! staged copy is written.

use crate::keys;
use crate::traits::{BitStore, ContentReader, ContentStream, StoreError, StoreResult};
use async_trait::async_trait;
use bitvault_core::{
    AssetDescriptor, ChecksumAlgorithm, MetadataField, StoreKind, StoreSettings, TechMetadata,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Levels of directory fanout under the base directory.
const FANOUT_LEVELS: usize = 3;
/// Characters of the id consumed per fanout level.
const FANOUT_WIDTH: usize = 2;

/// Local filesystem bitstream store
#[derive(Clone)]
pub struct LocalBitStore {
    base_dir: PathBuf,
    subfolder: Option<String>,
}

impl LocalBitStore {
    /// Build the store from settings. The base directory itself is
    /// created during `init`.
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        let base_dir = settings
            .local_path
            .clone()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                StoreError::Config("local storage path is not configured".to_string())
            })?;

        Ok(LocalBitStore {
            base_dir,
            subfolder: settings.subfolder.clone().filter(|s| !s.is_empty()),
        })
    }

    /// Map an internal id to its filesystem path.
    ///
    /// Ids are opaque tokens, never paths: anything that could traverse
    /// out of the base directory is rejected outright.
    fn id_to_path(&self, internal_id: &str) -> StoreResult<PathBuf> {
        if internal_id.is_empty()
            || internal_id.contains("..")
            || internal_id.contains('/')
            || internal_id.contains('\\')
        {
            return Err(StoreError::InvalidKey(
                "internal id contains invalid characters".to_string(),
            ));
        }

        let mut path = self.base_dir.clone();
        if let Some(sub) = &self.subfolder {
            path.push(sub);
        }
        path.push(intermediate_path(internal_id));
        path.push(internal_id);

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Best-effort removal of fanout directories emptied by a remove,
    /// walking up until the base directory or a non-empty directory.
    /// `remove_dir` refuses non-empty directories, so a concurrent put
    /// into a shared level simply stops the walk.
    async fn prune_empty_dirs(&self, removed: &Path) {
        let mut dir = removed.parent();
        while let Some(d) = dir {
            if d == self.base_dir || !d.starts_with(&self.base_dir) {
                break;
            }
            if fs::remove_dir(d).await.is_err() {
                break;
            }
            dir = d.parent();
        }
    }
}

#[async_trait]
impl BitStore for LocalBitStore {
    async fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            StoreError::Init(format!(
                "failed to create storage directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        tracing::info!(base_dir = %self.base_dir.display(), "Local bitstream store ready");
        Ok(())
    }

    fn generate_id(&self) -> String {
        keys::generate_id()
    }

    async fn get(&self, internal_id: &str) -> StoreResult<ContentStream> {
        let path = self.id_to_path(internal_id)?;
        let start = std::time::Instant::now();

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(internal_id.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Local storage get failed"
                );
                return Err(StoreError::Backend(e.to_string()));
            }
        };

        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |chunk| {
            chunk.map_err(|e| {
                tracing::error!(
                    error = %e,
                    path = %path_display,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage download stream error"
                );
                StoreError::Backend(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn put(&self, internal_id: &str, mut reader: ContentReader) -> StoreResult<AssetDescriptor> {
        let path = self.id_to_path(internal_id)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        // Stage into the destination directory and rename into place, so
        // a concurrent reader sees either the previous object or the
        // complete new one. The staged file is removed by scope on every
        // error path.
        let parent = path.parent().unwrap_or(&self.base_dir);
        let staged = tempfile::Builder::new()
            .prefix(&format!("{}-", internal_id))
            .suffix(".staged")
            .tempfile_in(parent)?;

        let mut out = fs::File::from_std(staged.reopen()?);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; 64 * 1024];
        let mut size_bytes = 0u64;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).await?;
            size_bytes += n as u64;
        }

        out.sync_all().await?;
        drop(out);

        staged.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        let checksum = hex::encode(hasher.finalize());

        tracing::info!(
            path = %path.display(),
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(AssetDescriptor {
            id: internal_id.to_string(),
            size_bytes,
            checksum,
            checksum_algorithm: ChecksumAlgorithm::Sha256,
            stored_at: Utc::now(),
        })
    }

    async fn about(
        &self,
        internal_id: &str,
        fields: &[MetadataField],
    ) -> StoreResult<Option<TechMetadata>> {
        let path = self.id_to_path(internal_id)?;

        let file_metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Local storage stat failed"
                );
                return Err(StoreError::Backend(e.to_string()));
            }
        };

        let mut metadata = TechMetadata::default();
        for field in fields {
            match field {
                MetadataField::SizeBytes => {
                    metadata.size_bytes = Some(file_metadata.len());
                }
                MetadataField::Checksum => {
                    metadata.checksum = Some(digest_file(&path).await?);
                    metadata.checksum_algorithm = Some(ChecksumAlgorithm::Sha256);
                }
                MetadataField::Modified => {
                    metadata.last_modified = file_metadata
                        .modified()
                        .ok()
                        .map(DateTime::<Utc>::from);
                }
            }
        }

        Ok(Some(metadata))
    }

    async fn remove(&self, internal_id: &str) -> StoreResult<()> {
        let path = self.id_to_path(internal_id)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                self.prune_empty_dirs(&path).await;
                tracing::info!(path = %path.display(), "Local storage remove successful");
                Ok(())
            }
            // Removing something that is already gone is a success.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    "Local storage remove failed"
                );
                Err(StoreError::Backend(e.to_string()))
            }
        }
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }
}

/// Directory fanout for an id: up to three levels of two characters each,
/// taken from the front of the id.
fn intermediate_path(internal_id: &str) -> PathBuf {
    let mut path = PathBuf::new();
    let bytes = internal_id.as_bytes();
    for level in 0..FANOUT_LEVELS {
        let from = level * FANOUT_WIDTH;
        let to = from + FANOUT_WIDTH;
        if to > bytes.len() || !internal_id.is_char_boundary(from) || !internal_id.is_char_boundary(to)
        {
            break;
        }
        path.push(&internal_id[from..to]);
    }
    path
}

/// SHA-256 of a file's content, hex encoded. Streams in chunks so large
/// objects never sit in memory whole.
async fn digest_file(path: &Path) -> StoreResult<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn store(dir: &Path) -> LocalBitStore {
        let settings = StoreSettings::local(dir.to_string_lossy().to_string());
        LocalBitStore::new(&settings).unwrap()
    }

    fn reader(data: Vec<u8>) -> ContentReader {
        Box::pin(std::io::Cursor::new(data)) as Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>>
    }

    async fn collect(mut stream: ContentStream) -> Vec<u8> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        data
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        let data = b"some bitstream content".to_vec();
        let id = store.generate_id();

        let descriptor = store.put(&id, reader(data.clone())).await.unwrap();
        assert_eq!(descriptor.id, id);
        assert_eq!(descriptor.size_bytes, data.len() as u64);

        let downloaded = collect(store.get(&id).await.unwrap()).await;
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        let result = store.get("aabbccdd").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        // Never stored
        store.remove("aabbccdd").await.unwrap();

        // Stored, removed, removed again
        let id = store.generate_id();
        store.put(&id, reader(b"x".to_vec())).await.unwrap();
        store.remove(&id).await.unwrap();
        store.remove(&id).await.unwrap();

        assert!(matches!(store.get(&id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_about_probes_existence_without_error() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        let id = store.generate_id();
        let absent = store.about(&id, &[MetadataField::SizeBytes]).await.unwrap();
        assert!(absent.is_none());

        let data = b"probe me".to_vec();
        store.put(&id, reader(data.clone())).await.unwrap();

        let present = store
            .about(&id, &[MetadataField::SizeBytes])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(present.size_bytes, Some(data.len() as u64));
        // Unrequested fields stay unset
        assert!(present.checksum.is_none());
        assert!(present.last_modified.is_none());
    }

    #[tokio::test]
    async fn test_checksum_stable_between_put_and_about() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        let id = store.generate_id();
        let descriptor = store.put(&id, reader(b"checksum me".to_vec())).await.unwrap();
        assert_eq!(descriptor.checksum_algorithm, ChecksumAlgorithm::Sha256);

        let metadata = store
            .about(&id, &[MetadataField::Checksum])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.checksum.as_deref(), Some(descriptor.checksum.as_str()));
        assert_eq!(metadata.checksum_algorithm, Some(ChecksumAlgorithm::Sha256));
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        let id = store.generate_id();
        store.put(&id, reader(b"first version".to_vec())).await.unwrap();
        store.put(&id, reader(b"second".to_vec())).await.unwrap();

        let downloaded = collect(store.get(&id).await.unwrap()).await;
        assert_eq!(downloaded, b"second");
    }

    #[tokio::test]
    async fn test_concurrent_puts_with_distinct_ids() {
        let dir = tempdir().unwrap();
        let store = Arc::new(store(dir.path()));
        store.init().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = store.generate_id();
                let data = vec![i; 1024 * (i as usize + 1)];
                let descriptor = store.put(&id, reader(data.clone())).await.unwrap();
                (id, data, descriptor)
            }));
        }

        for handle in handles {
            let (id, data, descriptor) = handle.await.unwrap();
            assert_eq!(descriptor.size_bytes, data.len() as u64);
            let downloaded = collect(store.get(&id).await.unwrap()).await;
            assert_eq!(data, downloaded);
        }
    }

    #[tokio::test]
    async fn test_remove_prunes_emptied_fanout_dirs() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        // Two ids sharing the first two fanout levels, diverging at the third
        store.put("aabbcc01", reader(b"one".to_vec())).await.unwrap();
        store.put("aabbdd02", reader(b"two".to_vec())).await.unwrap();

        let shared = dir.path().join("aa").join("bb");
        assert!(shared.join("cc").is_dir());
        assert!(shared.join("dd").is_dir());

        store.remove("aabbcc01").await.unwrap();

        // The emptied branch is gone, the shared levels stay while occupied
        assert!(!shared.join("cc").exists());
        assert!(shared.join("dd").is_dir());
        let remaining = collect(store.get("aabbdd02").await.unwrap()).await;
        assert_eq!(remaining, b"two");

        // Removing the last object prunes up to, but never past, the base
        store.remove("aabbdd02").await.unwrap();
        assert!(!dir.path().join("aa").exists());
        assert!(dir.path().is_dir());
    }

    #[tokio::test]
    async fn test_traversal_ids_rejected() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.init().await.unwrap();

        for id in ["../escape", "a/b", "..", "a\\b", ""] {
            let result = store.get(id).await;
            assert!(matches!(result, Err(StoreError::InvalidKey(_))), "id {:?}", id);
        }
    }

    #[tokio::test]
    async fn test_subfolder_scopes_objects() {
        let dir = tempdir().unwrap();
        let mut settings = StoreSettings::local(dir.path().to_string_lossy().to_string());
        settings.subfolder = Some("assets".to_string());
        let store = LocalBitStore::new(&settings).unwrap();
        store.init().await.unwrap();

        let id = store.generate_id();
        store.put(&id, reader(b"scoped".to_vec())).await.unwrap();

        let path = store.id_to_path(&id).unwrap();
        assert!(path.starts_with(dir.path().join("assets")));
        assert_eq!(collect(store.get(&id).await.unwrap()).await, b"scoped");
    }

    #[test]
    fn test_intermediate_path_fanout() {
        assert_eq!(
            intermediate_path("aabbccdd"),
            PathBuf::from("aa").join("bb").join("cc")
        );
        // Short ids fan out as far as they can
        assert_eq!(intermediate_path("abc"), PathBuf::from("ab"));
    }
}
