//! Hashing utilities for cache file naming.

use sha2::{Digest, Sha256};
use url::Url;

/// Longest cache file name, digest suffix included.
const MAX_NAME_LEN: usize = 120;

/// Hex digits of the URL digest appended to every name.
const DIGEST_LEN: usize = 16;

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Derive a cache file name from a URL.
///
/// Every non-alphanumeric character of the URL becomes `_`, which keeps the
/// name readable but lossy. A digest of the full URL is always appended so
/// `2024-03` and `2024_03` never share a file.
pub fn cache_file_name(url: &Url) -> String {
    let raw = url.as_str();
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    name.truncate(MAX_NAME_LEN - DIGEST_LEN - 1);
    name.push('_');
    name.push_str(&sha256_str(raw)[..DIGEST_LEN]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_str() {
        let hash = sha256_str("hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_cache_file_name_is_deterministic() {
        let url = Url::parse("https://download.eclipse.org/releases/2024-03/content.jar").unwrap();
        let name = cache_file_name(&url);
        assert_eq!(name, cache_file_name(&url));

        let (stem, digest) = name.rsplit_once('_').unwrap();
        assert_eq!(stem, "https___download_eclipse_org_releases_2024_03_content_jar");
        assert_eq!(digest.len(), DIGEST_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_file_name_distinguishes_punctuation() {
        let dash = Url::parse("https://repo.example/rel/2024-03/content.xml").unwrap();
        let underscore = Url::parse("https://repo.example/rel/2024_03/content.xml").unwrap();
        assert_ne!(cache_file_name(&dash), cache_file_name(&underscore));
    }

    #[test]
    fn test_cache_file_name_long_urls() {
        let a = Url::parse(&format!("https://example.com/{}/a", "x".repeat(200))).unwrap();
        let b = Url::parse(&format!("https://example.com/{}/b", "x".repeat(200))).unwrap();

        let name_a = cache_file_name(&a);
        let name_b = cache_file_name(&b);
        assert_eq!(name_a.len(), MAX_NAME_LEN);
        assert_ne!(name_a, name_b);
    }
}
