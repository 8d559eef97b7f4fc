//! Manual smoke test for an S3-compatible bitstream store.
//!
//! Runs put -> about -> get -> remove against live credentials and prints
//! per-phase timings. Diagnostic tooling only; it carries no guarantees
//! and is not part of the storage contract.

use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;

use bitvault_core::{MetadataField, StoreKind, StoreSettings};
use bitvault_storage::create_store;

#[derive(Parser, Debug)]
#[command(name = "store_smoke")]
#[command(about = "Exercise an S3-compatible bitstream store with live credentials")]
struct Args {
    /// Access key for the provider
    #[arg(short = 'a', long)]
    access_key: String,

    /// Secret key for the provider
    #[arg(short = 's', long)]
    secret_key: String,

    /// Endpoint URL (e.g. http://localhost:9000 for MinIO)
    #[arg(short = 'e', long)]
    endpoint: String,

    /// Local file to store and fetch back
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Optional region identifier
    #[arg(long)]
    region: Option<String>,

    /// Optional bucket name (derived from the hostname when omitted)
    #[arg(long)]
    bucket: Option<String>,

    /// Optional key prefix within the bucket
    #[arg(long)]
    subfolder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = StoreSettings {
        backend: StoreKind::S3,
        access_key: args.access_key,
        secret_key: args.secret_key,
        endpoint: args.endpoint,
        region: args.region,
        namespace: args.bucket,
        subfolder: args.subfolder,
        staging_dir: None,
        local_path: None,
        public_hostname: None,
    };

    let store = create_store(&settings).await?;
    let id = store.generate_id();

    // Case 1: store the file
    let start = Instant::now();
    let file = tokio::fs::File::open(&args.file).await?;
    let reader = Box::pin(file) as Pin<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
    let descriptor = store.put(&id, reader).await?;
    println!(
        "put {} as {}: {} bytes, {} ({}), {} ms",
        args.file.display(),
        id,
        descriptor.size_bytes,
        descriptor.checksum,
        descriptor.checksum_algorithm,
        start.elapsed().as_millis()
    );

    // Case 2: fetch metadata and compare with the descriptor
    let start = Instant::now();
    let metadata = store
        .about(
            &id,
            &[
                MetadataField::SizeBytes,
                MetadataField::Checksum,
                MetadataField::Modified,
            ],
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("stored object missing from about()"))?;
    println!(
        "about {}: size={:?} checksum={:?} modified={:?}, {} ms",
        id,
        metadata.size_bytes,
        metadata.checksum,
        metadata.last_modified,
        start.elapsed().as_millis()
    );
    if metadata.checksum.as_deref() != Some(descriptor.checksum.as_str()) {
        anyhow::bail!("checksum mismatch between put and about");
    }

    // Case 3: read the content back and count the bytes
    let start = Instant::now();
    let mut stream = store.get(&id).await?;
    let mut fetched = 0u64;
    while let Some(chunk) = stream.next().await {
        fetched += chunk?.len() as u64;
    }
    println!("get {}: {} bytes, {} ms", id, fetched, start.elapsed().as_millis());
    if fetched != descriptor.size_bytes {
        anyhow::bail!("size mismatch between put and get");
    }

    // Case 4: remove and verify it is gone
    let start = Instant::now();
    store.remove(&id).await?;
    println!("remove {}: {} ms", id, start.elapsed().as_millis());

    let gone = store.about(&id, &[MetadataField::SizeBytes]).await?;
    if gone.is_some() {
        anyhow::bail!("object still present after remove");
    }
    println!("verified {} is gone", id);

    Ok(())
}
