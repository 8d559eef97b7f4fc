//! Bitstream content record: the entity-model side of a stored payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::descriptor::{AssetDescriptor, ChecksumAlgorithm};

/// A content record pointing at one stored bitstream.
///
/// `internal_id` is the opaque storage identifier and is immutable once
/// assigned. The size/checksum fields are owned by the caller and updated
/// from the [`AssetDescriptor`] a successful `put` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bitstream {
    pub id: Uuid,
    pub internal_id: String,
    pub size_bytes: i64,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub stored_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Bitstream {
    /// Create a record for content about to be stored under `internal_id`.
    pub fn new(internal_id: impl Into<String>) -> Self {
        Bitstream {
            id: Uuid::new_v4(),
            internal_id: internal_id.into(),
            size_bytes: 0,
            checksum: None,
            checksum_algorithm: None,
            stored_at: None,
            deleted: false,
        }
    }

    /// Absorb the technical metadata from a completed `put`.
    pub fn apply_descriptor(&mut self, descriptor: &AssetDescriptor) {
        debug_assert_eq!(self.internal_id, descriptor.id);
        self.size_bytes = descriptor.size_bytes as i64;
        self.checksum = Some(descriptor.checksum.clone());
        self.checksum_algorithm = Some(descriptor.checksum_algorithm);
        self.stored_at = Some(descriptor.stored_at);
    }
}
