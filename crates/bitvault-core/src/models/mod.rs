pub mod bitstream;
pub mod descriptor;

pub use bitstream::Bitstream;
pub use descriptor::{AssetDescriptor, ChecksumAlgorithm, MetadataField, TechMetadata};
