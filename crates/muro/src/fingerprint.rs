//! # Fingerprinter
//!
//! Deterministic mapping from a source URL to a stable cache filename.
//! The hash input is the URL itself, so the same remote asset is never
//! downloaded twice even when referenced under different catalog ids.

use sha2::{Digest, Sha256};
use url::Url;

/// Extension used when the URL carries none or a query string obscures it.
const DEFAULT_EXTENSION: &str = "jpg";

/// Compute the cache filename for a source URL.
///
/// Pure function: SHA-256 of the URL string, hex-encoded, plus the
/// extension taken from the URL path (query and fragment ignored).
pub fn fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url);
    let hash = hasher.finalize();

    format!("{}.{}", hex::encode(hash), extension_of(url))
}

/// Extract a usable file extension from the URL path.
fn extension_of(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        // Unparsable input still fingerprints; strip query/fragment by hand.
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    match path.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("https://example.com/art/12345.png");
        let b = fingerprint("https://example.com/art/12345.png");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_urls_get_distinct_names() {
        let a = fingerprint("https://example.com/a.jpg");
        let b = fingerprint("https://example.com/b.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn extension_comes_from_path_not_query() {
        let name = fingerprint("https://example.com/full/42.png?width=3840&fm=webp");
        assert!(name.ends_with(".png"), "got {name}");
    }

    #[test]
    fn missing_extension_defaults_to_jpg() {
        let name = fingerprint("https://example.com/images/42");
        assert!(name.ends_with(".jpg"), "got {name}");
    }

    #[test]
    fn extension_is_lowercased() {
        let name = fingerprint("https://example.com/photo.JPEG");
        assert!(name.ends_with(".jpeg"), "got {name}");
    }

    #[test]
    fn hash_prefix_is_64_hex_chars() {
        let name = fingerprint("https://example.com/a.jpg");
        let (hash, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "jpg");
    }
}
