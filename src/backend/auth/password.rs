//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Stored format: `pbkdf2_sha256$<rounds>$<salt>$<hash>` with base64 (standard,
//! unpadded) salt and hash. Rounds live in the string so older hashes keep
//! verifying after the configured cost changes.

use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

pub const DEFAULT_ROUNDS: u32 = 100_000;

const SCHEME: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = derive(password.as_bytes(), &salt, rounds);
    format!("{}${}${}${}", SCHEME, rounds, B64.encode(salt), B64.encode(hash))
}

/// A well-formed hash with an all-zero salt and digest. Verifying against it
/// costs as much as a real check at `rounds` and never succeeds for a
/// password whose derived key is not all zeroes.
pub fn dummy_hash(rounds: u32) -> String {
    format!(
        "{}${}${}${}",
        SCHEME,
        rounds,
        B64.encode([0u8; SALT_LEN]),
        B64.encode([0u8; HASH_LEN])
    )
}

/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (B64.decode(salt), B64.decode(hash)) else {
        return false;
    };
    if rounds == 0 || expected.len() != HASH_LEN {
        return false;
    }

    let actual = derive(password.as_bytes(), &salt, rounds);
    constant_time_eq(&actual, &expected)
}

fn derive(password: &[u8], salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, &mut out);
    out
}

// Compare through an HMAC tag check so the comparison does not short-circuit
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(b"password-compare") else {
        return false;
    };
    mac.update(a);
    let tag = mac.finalize().into_bytes();

    let Ok(mut check) = Hmac::<Sha256>::new_from_slice(b"password-compare") else {
        return false;
    };
    check.update(b);
    check.verify_slice(&tag).is_ok()
}
