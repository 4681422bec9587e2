//! Hashing, random token and HMAC helpers.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates `bytes` random bytes from the OS RNG, hex encoded.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Signs `message` with HMAC-SHA256 and returns the tag as hex.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex HMAC-SHA256 tag in constant time.
///
/// Returns `false` for malformed hex instead of an error.
pub fn verify_hmac_sha256_hex(secret: &[u8], message: &[u8], tag_hex: &str) -> bool {
    let Ok(tag) = hex::decode(tag_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_of_integer_id() {
        // AR markers hash the decimal form of the id
        assert_eq!(
            sha256_hex("1"),
            "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b"
        );
    }

    #[test]
    fn test_generate_token_length_and_uniqueness() {
        let a = generate_token(32);
        let b = generate_token(32);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hmac_roundtrip() {
        let tag = hmac_sha256_hex(b"secret", b"session-1");
        assert_eq!(tag.len(), 64);
        assert!(verify_hmac_sha256_hex(b"secret", b"session-1", &tag));
    }

    #[test]
    fn test_hmac_rejects_other_message_or_key() {
        let tag = hmac_sha256_hex(b"secret", b"session-1");
        assert!(!verify_hmac_sha256_hex(b"secret", b"session-2", &tag));
        assert!(!verify_hmac_sha256_hex(b"other", b"session-1", &tag));
    }

    #[test]
    fn test_hmac_rejects_malformed_tag() {
        assert!(!verify_hmac_sha256_hex(b"secret", b"x", "not-hex"));
        assert!(!verify_hmac_sha256_hex(b"secret", b"x", ""));
    }
}
