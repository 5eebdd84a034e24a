use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};

pub type HmacSha256 = Hmac<Sha256>;

/// `byte_len` bytes from the operating system's CSPRNG, hex-encoded.
///
/// There is no fallback generator: if the OS source fails the caller gets
/// `EngineError::Entropy`.
pub fn random_hex(byte_len: usize) -> EngineResult<String> {
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EngineError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// SHA-256 of the UTF-8 bytes of `input`, lowercase hex.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// HMAC-SHA256 keyed by the hex-decoded `key_hex`.
pub fn hmac_sha256(key_hex: &str, message: &str) -> EngineResult<[u8; 32]> {
    let key = hex::decode(key_hex)
        .map_err(|e| EngineError::InvalidSeed(format!("server seed is not hex: {e}")))?;
    // HMAC accepts keys of any length, so this cannot fail for decoded bytes.
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| EngineError::InvalidSeed(e.to_string()))?;
    mac.update(message.as_bytes());
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&res);
    Ok(out)
}
