pub mod ecdsa;
mod error;

pub use ecdsa::{verify_hex, Keypair};
pub use error::Error;

use sha2::{Digest, Sha256};

pub const HASH_LEN: usize = 32;

/// SHA-256 digest of `input`.
pub fn digest(input: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(input).into()
}

/// SHA-256 digest of `input`, hex-encoded. Hashes travel as hex strings
/// everywhere in the system.
pub fn hash_hex(input: &[u8]) -> String {
    hex::encode(digest(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_of_sha256() {
        let out = hash_hex(b"hello");
        assert_eq!(out.len(), 64);
        assert_eq!(
            out,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
