//! Shared key and identifier helpers for storage backends.
//!
//! Key format: `{prefix}/{internal_id}` when a prefix is configured,
//! otherwise the bare `{internal_id}`. All backends use this mapping.

use uuid::Uuid;

/// Prefix for namespaces derived from the deployment hostname.
pub const DEFAULT_NAMESPACE_PREFIX: &str = "bitvault-asset";

/// Map an internal id to its full storage key.
///
/// Pure and side-effect free: the same `(prefix, id)` always yields the
/// same key. An empty prefix is treated as no prefix.
pub fn full_key(prefix: Option<&str>, internal_id: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}/{}", p, internal_id),
        _ => internal_id.to_string(),
    }
}

/// Generate a fresh opaque identifier.
///
/// UUIDv4 in simple form: random, content-independent, no network
/// dependency. An id is never reused for different content.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Derive the default namespace (bucket) name for a deployment.
///
/// `"{DEFAULT_NAMESPACE_PREFIX}-{hostname}"`, lowercased because bucket
/// names must be. Deterministic per host, so two deployments on different
/// hosts never collide on the default.
pub fn default_namespace(hostname: &str) -> String {
    format!("{}-{}", DEFAULT_NAMESPACE_PREFIX, hostname.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_key_with_prefix() {
        assert_eq!(full_key(Some("sub"), "abc"), "sub/abc");
    }

    #[test]
    fn full_key_without_prefix() {
        assert_eq!(full_key(None, "abc"), "abc");
        assert_eq!(full_key(Some(""), "abc"), "abc");
    }

    #[test]
    fn generated_ids_are_opaque_and_distinct() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn default_namespace_derivation() {
        assert_eq!(
            default_namespace("repo.example.org"),
            "bitvault-asset-repo.example.org"
        );
        assert_eq!(
            default_namespace("REPO.Example.ORG"),
            "bitvault-asset-repo.example.org"
        );
    }
}
