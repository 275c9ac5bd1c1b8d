//! Short content identifiers.
//!
//! Every identifier in a repository (commit ids, snapshot ids, file
//! fingerprints) is the first [`ID_HEX_LEN`] hex characters of a SHA-256
//! digest. Collisions are detected by the stores that mint new ids.

use std::{fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Length of an identifier in hex characters (64 bits of the digest).
pub const ID_HEX_LEN: usize = 16;

/// Hash an arbitrary byte sequence into a short hex identifier.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..ID_HEX_LEN / 2])
}

/// Hash a file's contents without loading it into memory.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 32 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..ID_HEX_LEN / 2]))
}

/// Whether `value` has the shape of an identifier minted by [`hash_bytes`].
#[must_use]
pub fn is_short_id(value: &str) -> bool {
    value.len() == ID_HEX_LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
