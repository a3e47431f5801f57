//! BLAKE3 hashing utilities for Braid
//!
//! All hashing in Braid uses BLAKE3 with 256-bit output.

/// Hash data using BLAKE3 (256-bit output)
pub fn hash_blake3(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple items together
pub fn hash_concat(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for item in items {
        hasher.update(item);
    }
    *hasher.finalize().as_bytes()
}
