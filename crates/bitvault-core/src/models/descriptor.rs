//! Technical metadata returned by storage backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Algorithm tag for a backend-reported checksum.
///
/// The object-storage backend reports the digest the provider itself
/// computed at write time (the ETag, an MD5); the local backend digests
/// with SHA-256 while writing. The tag travels with the value so callers
/// never have to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "MD5"),
            ChecksumAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// Descriptor for a successfully stored bitstream.
///
/// Produced by `put`. The storage layer never mutates a descriptor after
/// returning it; persisting the fields into the caller's entity model is
/// the caller's job (see [`crate::models::bitstream::Bitstream`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Opaque identifier the content was stored under.
    pub id: String,
    /// Length of the stored payload in bytes.
    pub size_bytes: u64,
    /// Integrity digest reported by the backend at write time.
    pub checksum: String,
    pub checksum_algorithm: ChecksumAlgorithm,
    /// When the store call completed.
    pub stored_at: DateTime<Utc>,
}

/// Fields a caller can request from `about`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    SizeBytes,
    Checksum,
    Modified,
}

/// Partial descriptor returned by `about`.
///
/// Only the requested fields are populated; everything else stays `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechMetadata {
    pub size_bytes: Option<u64>,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub last_modified: Option<DateTime<Utc>>,
}
