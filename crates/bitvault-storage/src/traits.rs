//! Storage abstraction trait
//!
//! This module defines the `BitStore` trait that all storage backends must
//! implement, together with the error taxonomy shared by every backend.

use bitvault_core::{AssetDescriptor, MetadataField, StoreKind, TechMetadata};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
///
/// Callers branch on the variant, not on message contents: `NotFound` is
/// permanent for the given id, `Backend` is transient and may be retried
/// by the caller (this layer performs no retries itself), `Config` and
/// `Init` are surfaced at construction/init time.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Storage initialization failed: {0}")]
    Init(String),

    #[error("Bitstream not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Readable byte stream returned by `get`.
///
/// Yields the stored payload chunk by chunk, positioned at the start of
/// the object. Dropping the stream releases the underlying connection or
/// file handle; the caller owns its lifetime.
pub type ContentStream = Pin<Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send>>;

/// Readable byte source consumed by `put`. Read exactly once, to EOF.
pub type ContentReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Bitstream storage contract
///
/// All storage backends (S3-compatible object storage, local filesystem)
/// implement this trait. A backend instance is constructed once from
/// immutable settings, made Ready via [`init`](BitStore::init), and then
/// shared by any number of concurrent callers; no operation holds state
/// across calls beyond the shared client handle.
///
/// **Key format:** backends address objects by `keys::full_key(prefix,
/// internal_id)`. See the crate root documentation.
#[async_trait]
pub trait BitStore: Send + Sync {
    /// Bring the backend to its Ready state. Idempotent.
    ///
    /// Resolves and, if necessary, creates the backing namespace. Missing
    /// credentials are logged as a warning rather than failing here; the
    /// failure is deferred to the first real operation. Fails only on
    /// unrecoverable backend errors such as the provider being
    /// unreachable during namespace creation.
    async fn init(&self) -> StoreResult<()>;

    /// Return a fresh opaque identifier.
    ///
    /// Collision resistance is a best-effort randomness property; the id
    /// is independent of any content and no network round trip is made.
    fn generate_id(&self) -> String;

    /// Retrieve the payload stored under `internal_id` as a byte stream.
    ///
    /// Distinguishes "never stored" (`StoreError::NotFound`) from backend
    /// reachability failures (`StoreError::Backend`) so callers can decide
    /// whether a retry makes sense.
    async fn get(&self, internal_id: &str) -> StoreResult<ContentStream>;

    /// Store the entire `reader` under `internal_id`.
    ///
    /// The input is staged to a per-call unique temporary file before
    /// upload, so total size is known up front and the staged copy is
    /// removed on every exit path. A repeated `put` to the same id is a
    /// full overwrite; readers observe either the previous object or the
    /// complete new one, never a partial write.
    async fn put(&self, internal_id: &str, reader: ContentReader) -> StoreResult<AssetDescriptor>;

    /// Fetch the requested subset of technical metadata for `internal_id`.
    ///
    /// Returns `Ok(None)` when the id has no stored object, so existence
    /// can be probed without error-driven control flow. Reachability
    /// failures are still reported as `StoreError::Backend`.
    async fn about(
        &self,
        internal_id: &str,
        fields: &[MetadataField],
    ) -> StoreResult<Option<TechMetadata>>;

    /// Delete the object stored under `internal_id`.
    ///
    /// Idempotent: removing an id that does not exist is a success.
    async fn remove(&self, internal_id: &str) -> StoreResult<()>;

    /// Get the storage backend kind
    fn kind(&self) -> StoreKind;
}
