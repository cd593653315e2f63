//! SHA-256 content digests
//!
//! Files are hashed as raw bytes. Nothing here normalizes line endings, so a
//! digest recorded on one platform verifies the same bytes on another.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Error, Result};

const READ_CHUNK: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of a byte slice.
pub fn hash_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute the lowercase hex SHA-256 digest of a file's contents.
///
/// The file is streamed through the hasher in fixed-size chunks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    hash_reader(&mut file).map_err(|e| Error::io(path, e))
}

/// Compute the digest of everything readable from `reader`.
pub fn hash_reader(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_digest_known_value() {
        assert_eq!(
            hash_bytes(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(hash_bytes(b"test"), hash_bytes(b"test"));
        assert_ne!(hash_bytes(b"aaa"), hash_bytes(b"bbb"));
    }

    #[test]
    fn file_digest_matches_bytes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"hello world"));
    }

    #[test]
    fn line_endings_are_not_normalized() {
        assert_ne!(hash_bytes(b"a\nb\n"), hash_bytes(b"a\r\nb\r\n"));
    }

    #[test]
    fn large_file_spanning_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..(READ_CHUNK * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(&content));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = hash_file(Path::new("/nonexistent/devenv/file")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
