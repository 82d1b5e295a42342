//! Password hashing for account credentials.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

const SCHEME: &str = "pbkdf2-sha256";

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 600_000;
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hash = derive(password, &salt, PBKDF2_ITERATIONS);
    let encoded = format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    );
    hash.zeroize();
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(stored: &str) -> (u32, Vec<u8>, Vec<u8>) {
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], SCHEME);
        (
            parts[1].parse().unwrap(),
            STANDARD_NO_PAD.decode(parts[2]).unwrap(),
            STANDARD_NO_PAD.decode(parts[3]).unwrap(),
        )
    }

    #[test]
    fn stored_form_rederives_from_its_salt() {
        let stored = hash_password("correct horse");
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));

        let (iterations, salt, hash) = split(&stored);
        assert_eq!(salt.len(), SALT_LENGTH);
        assert_eq!(hash, derive("correct horse", &salt, iterations).to_vec());
        assert_ne!(hash, derive("wrong horse", &salt, iterations).to_vec());
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }
}
