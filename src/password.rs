//! Password hashing for the credential store.
//!
//! Hashes are PBKDF2-HMAC-SHA256 with a random per-record salt, stored as
//! `pbkdf2:iterations:hex_salt:hex_hash`. Verification re-derives the hash
//! with the stored parameters and compares in constant time, so a record
//! created under an older iteration count keeps verifying after the default
//! changes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// PBKDF2 iteration count for newly created hashes.
const ITERATIONS: u32 = 100_000;

/// Salt length in bytes
const SALT_LENGTH: usize = 16;

/// Derived hash length in bytes
const HASH_LENGTH: usize = 32;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plaintext: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, ITERATIONS, &mut hash);

    format!(
        "pbkdf2:{}:{}:{}",
        ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Verify a plaintext password against a stored hash string.
///
/// Returns `false` for malformed stored values rather than erroring; a
/// corrupt hash row behaves like a wrong password.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, ':');
    let (scheme, iterations, salt_hex, hash_hex) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(s), Some(i), Some(salt), Some(hash)) => (s, i, salt, hash),
        _ => return false,
    };

    if scheme != "pbkdf2" {
        return false;
    }
    let iterations: u32 = match iterations.parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    let salt = match hex::decode(salt_hex) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let expected = match hex::decode(hash_hex) {
        Ok(h) => h,
        Err(_) => return false,
    };

    let mut derived = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, iterations, &mut derived);

    constant_time_eq(&derived, &expected)
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for i in 0..a.len() {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_roundtrip() {
        let stored = hash_password("pw1");
        assert!(verify_password("pw1", &stored));
        assert!(!verify_password("pw2", &stored));
    }

    #[test]
    fn test_stored_format() {
        let stored = hash_password("secret");
        let parts: Vec<&str> = stored.split(':').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2");
        assert_eq!(parts[1], ITERATIONS.to_string());
        assert_eq!(parts[2].len(), SALT_LENGTH * 2);
        assert_eq!(parts[3].len(), HASH_LENGTH * 2);
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_malformed_stored_value() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "pbkdf2:100000:deadbeef"));
        assert!(!verify_password("pw", "bcrypt:10:aa:bb"));
        assert!(!verify_password("pw", "pbkdf2:not-a-number:aa:bb"));
        assert!(!verify_password("pw", "pbkdf2:100000:zz:bb"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
