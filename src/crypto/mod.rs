use sha2::{Digest, Sha256};

/// Width of every digest in hex characters (SHA-256 -> 32 bytes -> 64 hex).
pub const DIGEST_WIDTH: usize = 64;

/// Hash arbitrary bytes into a lowercase hex SHA-256 digest.
/// Pure: the same input always yields the same output.
pub fn digest(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// True when `hash` starts with `difficulty` zero hex characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|c| c == b'0')
}
