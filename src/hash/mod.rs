//! Hashing utilities

use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read size for checksum streaming
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the MD5 digest of a file
///
/// The file is streamed in 1 MiB chunks so memory stays bounded regardless of
/// file size. MD5 is used for change detection only, not integrity.
///
/// # Example
/// ```no_run
/// use mirrorsync::hash::compute_checksum;
/// use std::path::Path;
///
/// let digest = compute_checksum(Path::new("file.txt"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn compute_checksum(file_path: &Path) -> Result<[u8; 16], std::io::Error> {
    let mut file = File::open(file_path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// MD5 digest of an in-memory value (symlink targets)
pub fn checksum_bytes(bytes: &[u8]) -> [u8; 16] {
    Md5::digest(bytes).into()
}
