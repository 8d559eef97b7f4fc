//! Bitvault Core Library
//!
//! This crate provides the domain models, configuration, and shared types
//! used across all Bitvault components: the bitstream content record, the
//! asset descriptor produced by storage backends, and the settings that
//! select and configure a backend.

pub mod config;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::StoreSettings;
pub use models::bitstream::Bitstream;
pub use models::descriptor::{AssetDescriptor, ChecksumAlgorithm, MetadataField, TechMetadata};
pub use storage_types::StoreKind;
