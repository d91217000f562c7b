//! Challenge hashing and authentication token generation.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha512_256};

use crate::WardenError;

/// Hash the concatenation of `parts` with SHA-512/256, as lowercase hex.
///
/// Challenge identifiers are `hash(&[plaintext])`, so the same CAPTCHA text
/// always maps to the same 64-character key.
pub fn hash(parts: &[&str]) -> String {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Generate a random UUIDv4 from the operating system RNG.
///
/// RNG failure is surfaced to the caller; there is no fallback value.
pub fn gen_uuid() -> Result<String, WardenError> {
    gen_uuid_with(&mut OsRng)
}

/// Generate a UUIDv4 from the given RNG
pub fn gen_uuid_with<R: RngCore>(rng: &mut R) -> Result<String, WardenError> {
    let mut bytes = [0u8; 16];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| WardenError::Entropy(e.to_string()))?;

    Ok(uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string())
}

/// Check for a canonical lowercase UUIDv4 (`xxxxxxxx-xxxx-4xxx-[89ab]xxx-xxxxxxxxxxxx`)
pub fn is_uuid_v4(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }

    for (i, &b) in bytes.iter().enumerate() {
        let ok = match i {
            8 | 13 | 18 | 23 => b == b'-',
            14 => b == b'4',
            19 => matches!(b, b'8' | b'9' | b'a' | b'b'),
            _ => b.is_ascii_digit() || (b'a'..=b'f').contains(&b),
        };
        if !ok {
            return false;
        }
    }

    true
}
