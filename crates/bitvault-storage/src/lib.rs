//! Bitvault Storage Library
//!
//! This crate provides the bitstream storage abstraction for Bitvault.
//! It includes the `BitStore` trait and implementations for S3-compatible
//! object storage and the local filesystem.
//!
//! # Storage key format
//!
//! A bitstream is addressed by its opaque `internal_id`. Backends map the
//! id to a full storage key with an optional configured prefix:
//!
//! - **No prefix**: `{internal_id}`
//! - **With prefix**: `{prefix}/{internal_id}`
//!
//! Key mapping is centralized in the `keys` module and is a pure function
//! of `(prefix, internal_id)`. The object backend uses the key verbatim;
//! the local backend additionally fans the id out into intermediate
//! directories below the same prefix.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use bitvault_core::StoreKind;
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBitStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BitStore;
pub use traits::{BitStore, ContentReader, ContentStream, StoreError, StoreResult};
