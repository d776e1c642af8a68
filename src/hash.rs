//! Deterministic token fingerprinting (`spec.md` §4.A).
//!
//! The raw bearer token must never appear in a cache key, a log line, or
//! anywhere persisted. [`fingerprint`] is the only function that is allowed
//! to see it on the cache's behalf.

use sha2::{Digest, Sha256};

/// Returns the 64-character lowercase hex SHA-256 digest of `token`.
///
/// Equal inputs always yield equal outputs; distinct inputs yield differing
/// outputs with the collision probability of SHA-256. There is no function
/// that maps a fingerprint back to the token that produced it.
pub fn fingerprint(token: &[u8]) -> String {
    let digest = Sha256::digest(token);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic_and_64_hex_chars() {
        let a = fingerprint(b"user-a-token");
        let b = fingerprint(b"user-a-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn distinguishes_distinct_tokens() {
        assert_ne!(fingerprint(b"token-one"), fingerprint(b"token-two"));
    }

    #[test]
    fn never_contains_the_raw_token() {
        let token = b"super-secret-bearer-token";
        let digest = fingerprint(token);
        assert!(!digest.contains("super-secret"));
    }
}
