//! Configuration module
//!
//! Settings for the bitstream store, loaded from environment variables.
//! The settings object is built once and passed to the backend at
//! construction time; nothing here is read again after that.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::storage_types::StoreKind;

/// Settings for constructing a bitstream store.
///
/// Credentials and endpoint are supplied explicitly here, never discovered
/// from ambient SDK defaults, so backend selection stays deterministic and
/// testable. Blank credentials are tolerated at load time; the backend
/// warns during `init` and fails on first real operation.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub backend: StoreKind,
    // S3-compatible provider settings
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub region: Option<String>,
    /// Bucket name. Derived from the public hostname when unset.
    pub namespace: Option<String>,
    /// Optional key prefix ("subfolder") within the namespace.
    pub subfolder: Option<String>,
    /// Directory for staging uploads. Falls back to the OS temp dir.
    pub staging_dir: Option<PathBuf>,
    // Local backend settings
    pub local_path: Option<String>,
    /// Hostname used for default namespace derivation. Falls back to the
    /// OS hostname when unset.
    pub public_hostname: Option<String>,
}

impl StoreSettings {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let backend = env::var("BITVAULT_STORE_BACKEND")
            .map(|s| StoreKind::from_str(&s))
            .unwrap_or(Ok(StoreKind::S3))?;

        Ok(StoreSettings {
            backend,
            access_key: env::var("BITVAULT_S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: env::var("BITVAULT_S3_SECRET_KEY").unwrap_or_default(),
            endpoint: env::var("BITVAULT_S3_ENDPOINT").unwrap_or_default(),
            region: env::var("BITVAULT_S3_REGION").ok().filter(|s| !s.is_empty()),
            namespace: env::var("BITVAULT_S3_BUCKET").ok().filter(|s| !s.is_empty()),
            subfolder: env::var("BITVAULT_S3_SUBFOLDER")
                .ok()
                .filter(|s| !s.is_empty()),
            staging_dir: env::var("BITVAULT_STAGING_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            local_path: env::var("BITVAULT_LOCAL_PATH").ok().filter(|s| !s.is_empty()),
            public_hostname: env::var("BITVAULT_PUBLIC_HOSTNAME")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    /// Settings for a local-backend store rooted at `path`. Used by tests
    /// and by deployments that never touch an object store.
    pub fn local(path: impl Into<String>) -> Self {
        StoreSettings {
            backend: StoreKind::Local,
            access_key: String::new(),
            secret_key: String::new(),
            endpoint: String::new(),
            region: None,
            namespace: None,
            subfolder: None,
            staging_dir: None,
            local_path: Some(path.into()),
            public_hostname: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global, so the whole surface is covered in one
    // test to keep it race-free under the parallel test runner.
    #[test]
    fn from_env_reads_the_configuration_surface() {
        env::set_var("BITVAULT_STORE_BACKEND", "local");
        env::set_var("BITVAULT_S3_ACCESS_KEY", "ak");
        env::set_var("BITVAULT_S3_BUCKET", "");
        env::set_var("BITVAULT_S3_SUBFOLDER", "assets");
        env::set_var("BITVAULT_STAGING_DIR", "/tmp/bitvault-staging");
        env::set_var("BITVAULT_LOCAL_PATH", "/var/lib/bitvault");

        let settings = StoreSettings::from_env().unwrap();
        assert_eq!(settings.backend, StoreKind::Local);
        assert_eq!(settings.access_key, "ak");
        // Blank values are filtered out, not kept as empty strings
        assert_eq!(settings.namespace, None);
        assert_eq!(settings.subfolder.as_deref(), Some("assets"));
        assert_eq!(
            settings.staging_dir.as_deref(),
            Some(std::path::Path::new("/tmp/bitvault-staging"))
        );
        assert_eq!(settings.local_path.as_deref(), Some("/var/lib/bitvault"));

        // Unknown backend kinds are rejected
        env::set_var("BITVAULT_STORE_BACKEND", "tape");
        assert!(StoreSettings::from_env().is_err());

        // Backend defaults to s3 when unset
        env::remove_var("BITVAULT_STORE_BACKEND");
        let settings = StoreSettings::from_env().unwrap();
        assert_eq!(settings.backend, StoreKind::S3);

        for var in [
            "BITVAULT_S3_ACCESS_KEY",
            "BITVAULT_S3_BUCKET",
            "BITVAULT_S3_SUBFOLDER",
            "BITVAULT_STAGING_DIR",
            "BITVAULT_LOCAL_PATH",
        ] {
            env::remove_var(var);
        }
    }
}
