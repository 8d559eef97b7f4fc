//! S3-compatible object storage backend.
//!
//! Talks to any S3-compatible provider through an explicitly configured
//! endpoint (MinIO, DigitalOcean Spaces, AWS itself). Path-style
//! addressing is forced on because non-AWS endpoints rarely have
//! virtual-host-style DNS, credentials come from settings only (never
//! from the ambient environment), and the SDK's fixed SigV4 signing is
//! used rather than any per-provider negotiation.

use crate::keys;
use crate::traits::{BitStore, ContentReader, ContentStream, StoreError, StoreResult};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bitvault_core::{
    AssetDescriptor, ChecksumAlgorithm, MetadataField, StoreKind, StoreSettings, TechMetadata,
};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Region used when none is configured or the configured one is invalid.
const DEFAULT_REGION: &str = "us-east-1";

/// S3-compatible bitstream store
#[derive(Clone)]
pub struct S3BitStore {
    client: Client,
    bucket: String,
    subfolder: Option<String>,
    staging_dir: PathBuf,
}

impl S3BitStore {
    /// Build the store from settings. No network traffic happens here;
    /// namespace resolution and creation are deferred to `init`.
    ///
    /// Blank credentials or endpoint are logged as a warning rather than
    /// rejected: the store is still constructed and later operations fail
    /// with `StoreError::Backend` against the misconfigured provider.
    pub fn new(settings: &StoreSettings) -> StoreResult<Self> {
        if settings.access_key.is_empty()
            || settings.secret_key.is_empty()
            || settings.endpoint.is_empty()
        {
            tracing::warn!("Empty S3 access key, secret key or endpoint");
        }

        let region = match settings.region.as_deref() {
            Some(raw) => match validate_region(raw) {
                Some(region) => {
                    tracing::info!(region = %region, "S3 region set");
                    region
                }
                None => {
                    tracing::warn!(region = %raw, "Invalid S3 region, using default");
                    DEFAULT_REGION.to_string()
                }
            },
            None => DEFAULT_REGION.to_string(),
        };

        let bucket = match settings.namespace.clone().filter(|b| !b.is_empty()) {
            Some(bucket) => bucket,
            None => {
                let bucket = keys::default_namespace(&resolve_hostname(settings));
                tracing::warn!(bucket = %bucket, "S3 bucket is not configured, using default");
                bucket
            }
        };

        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "bitvault-settings",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .force_path_style(true);

        if !settings.endpoint.is_empty() {
            builder = builder.endpoint_url(settings.endpoint.clone());
        }

        let client = Client::from_conf(builder.build());

        Ok(S3BitStore {
            client,
            bucket,
            subfolder: settings.subfolder.clone().filter(|s| !s.is_empty()),
            staging_dir: settings
                .staging_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        })
    }

    fn full_key(&self, internal_id: &str) -> String {
        keys::full_key(self.subfolder.as_deref(), internal_id)
    }
}

#[async_trait]
impl BitStore for S3BitStore {
    async fn init(&self) -> StoreResult<()> {
        let exists = match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => true,
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                false
            }
            Err(err) => {
                tracing::error!(error = %err, bucket = %self.bucket, "S3 bucket lookup failed");
                return Err(StoreError::Init(err.to_string()));
            }
        };

        if !exists {
            let created = self
                .client
                .create_bucket()
                .bucket(&self.bucket)
                .send()
                .await;

            match created {
                Ok(_) => tracing::info!(bucket = %self.bucket, "Created new S3 bucket"),
                // A concurrent init may have won the creation race.
                Err(err)
                    if err
                        .as_service_error()
                        .map(|e| e.is_bucket_already_owned_by_you())
                        .unwrap_or(false) => {}
                Err(err) => {
                    tracing::error!(error = %err, bucket = %self.bucket, "S3 bucket creation failed");
                    return Err(StoreError::Init(err.to_string()));
                }
            }
        }

        tracing::info!(bucket = %self.bucket, "S3 bitstream store ready");
        Ok(())
    }

    fn generate_id(&self) -> String {
        keys::generate_id()
    }

    async fn get(&self, internal_id: &str) -> StoreResult<ContentStream> {
        let key = self.full_key(internal_id);
        let start = std::time::Instant::now();

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false) =>
            {
                return Err(StoreError::NotFound(internal_id.to_string()));
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                return Err(StoreError::Backend(err.to_string()));
            }
        };

        let bucket = self.bucket.clone();
        let reader = output.body.into_async_read();

        let stream = tokio_util::io::ReaderStream::new(reader).map(move |chunk| {
            chunk.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "S3 download stream error"
                );
                StoreError::Backend(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn put(&self, internal_id: &str, mut reader: ContentReader) -> StoreResult<AssetDescriptor> {
        let key = self.full_key(internal_id);
        let start = std::time::Instant::now();

        // Stage to a per-call unique local copy first: the total size is
        // then known before transmission and the upload reads a seekable
        // source. The handle removes the file when it goes out of scope,
        // on success and on every error path alike.
        let staged = tempfile::Builder::new()
            .prefix(&format!("{}-", internal_id))
            .suffix(".staged")
            .tempfile_in(&self.staging_dir)?;

        let mut out = tokio::fs::File::from_std(staged.reopen()?);
        let size_bytes = tokio::io::copy(&mut reader, &mut out).await?;
        out.flush().await?;
        drop(out);

        let body = ByteStream::from_path(staged.path())
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))?;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_length(size_bytes as i64)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                StoreError::Backend(err.to_string())
            })?;

        // Checksum is the integrity tag the provider computed at write
        // time, not a local recomputation. For a single-part put the ETag
        // is the hex MD5 of the content.
        let checksum = output
            .e_tag()
            .map(normalize_etag)
            .ok_or_else(|| StoreError::Backend("no checksum reported for upload".to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(AssetDescriptor {
            id: internal_id.to_string(),
            size_bytes,
            checksum,
            checksum_algorithm: ChecksumAlgorithm::Md5,
            stored_at: Utc::now(),
        })
    }

    async fn about(
        &self,
        internal_id: &str,
        fields: &[MetadataField],
    ) -> StoreResult<Option<TechMetadata>> {
        let key = self.full_key(internal_id);

        let output = match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            // Only a provider 404 means "truly missing"; any other fault
            // stays an error so callers can tell the two apart.
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false) =>
            {
                return Ok(None);
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 head failed"
                );
                return Err(StoreError::Backend(err.to_string()));
            }
        };

        metadata_from_head(&output, fields).map(Some)
    }

    async fn remove(&self, internal_id: &str) -> StoreResult<()> {
        let key = self.full_key(internal_id);
        let start = std::time::Instant::now();

        // DeleteObject succeeds for a missing key, which gives the
        // idempotency the contract requires for free.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(
                    error = %err,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 remove failed"
                );
                StoreError::Backend(err.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 remove successful"
        );

        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::S3
    }
}

/// Assemble the requested metadata fields from a successful HEAD.
///
/// A 200 response that omits the content length or ETag is a malformed
/// provider answer, not absence: it surfaces as `Backend`, the same way
/// `put` treats a missing ETag, so `Ok(None)` keeps meaning "truly
/// missing" and nothing else.
fn metadata_from_head(
    output: &aws_sdk_s3::operation::head_object::HeadObjectOutput,
    fields: &[MetadataField],
) -> StoreResult<TechMetadata> {
    let mut metadata = TechMetadata::default();
    for field in fields {
        match field {
            MetadataField::SizeBytes => {
                let length = output.content_length().ok_or_else(|| {
                    StoreError::Backend("no content length reported for object".to_string())
                })?;
                metadata.size_bytes = Some(length as u64);
            }
            MetadataField::Checksum => {
                let etag = output.e_tag().ok_or_else(|| {
                    StoreError::Backend("no checksum reported for object".to_string())
                })?;
                metadata.checksum = Some(normalize_etag(etag));
                metadata.checksum_algorithm = Some(ChecksumAlgorithm::Md5);
            }
            MetadataField::Modified => {
                metadata.last_modified = output
                    .last_modified()
                    .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos()));
            }
        }
    }
    Ok(metadata)
}

/// Strip the quotes S3 wraps around ETag values.
fn normalize_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// Lenient region check: lowercase letters, digits and dashes. Anything
/// else is treated as unrecognized and replaced with the default.
fn validate_region(raw: &str) -> Option<String> {
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    valid.then(|| raw.to_string())
}

fn resolve_hostname(settings: &StoreSettings) -> String {
    settings
        .public_hostname
        .clone()
        .or_else(|| hostname::get().ok().and_then(|h| h.into_string().ok()))
        .unwrap_or_else(|| "localhost".to_string())
}
