//! Zlib compression for stored documents.

use std::path::Path;

use crate::error::StorageError;

/// Compresses data using zlib at the given level (0..=10).
pub fn compress(data: &[u8], level: u8) -> Vec<u8> {
    miniz_oxide::deflate::compress_to_vec_zlib(data, level.min(10))
}

/// Decompresses zlib-compressed data read from `path`.
///
/// # Errors
///
/// Returns `StorageError::DecompressionFailed` if the header is invalid or
/// the stream is corrupted or truncated.
pub fn decompress(data: &[u8], path: &Path) -> Result<Vec<u8>, StorageError> {
    let failed = || StorageError::DecompressionFailed {
        path: path.to_path_buf(),
    };

    if data.len() < 2 || !is_valid_zlib_header(data[0], data[1]) {
        return Err(failed());
    }

    miniz_oxide::inflate::decompress_to_vec_zlib(data).map_err(|_| failed())
}

/// Validates a zlib header.
///
/// - The compression method (low 4 bits of CMF) is 8 (DEFLATE)
/// - The window size (high 4 bits of CMF) is at most 7
/// - `(CMF * 256 + FLG) % 31 == 0`
fn is_valid_zlib_header(cmf: u8, flg: u8) -> bool {
    if cmf & 0x0F != 8 {
        return false;
    }
    if (cmf >> 4) & 0x0F > 7 {
        return false;
    }
    ((cmf as u16) * 256 + (flg as u16)) % 31 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> &'static Path {
        Path::new("doc")
    }

    #[test]
    fn test_compress_roundtrip() {
        let original = br#"{"master":{"commit":"abc","commit_count":1}}"#;
        let compressed = compress(original, 6);
        assert_eq!(decompress(&compressed, here()).unwrap(), original);
    }

    #[test]
    fn test_compress_level_zero_still_valid() {
        let compressed = compress(b"plain", 0);
        assert_eq!(decompress(&compressed, here()).unwrap(), b"plain");
    }

    #[test]
    fn test_decompress_corrupted_data() {
        let mut compressed = compress(b"Hello, World!", 6);
        compressed[4] ^= 0xFF;
        compressed[5] ^= 0xFF;
        assert!(matches!(
            decompress(&compressed, here()),
            Err(StorageError::DecompressionFailed { .. })
        ));
    }

    #[test]
    fn test_decompress_truncated_or_empty() {
        let compressed = compress(b"Hello, World!", 6);
        assert!(decompress(&compressed[..compressed.len() / 2], here()).is_err());
        assert!(decompress(&[], here()).is_err());
        assert!(decompress(&[0x78], here()).is_err());
    }

    #[test]
    fn test_is_valid_zlib_header() {
        assert!(is_valid_zlib_header(0x78, 0x9C));
        assert!(is_valid_zlib_header(0x78, 0x01));
        assert!(!is_valid_zlib_header(0x00, 0x00));
        assert!(!is_valid_zlib_header(0x88, 0x00));
        assert!(!is_valid_zlib_header(0x78, 0x00));
    }

    #[test]
    fn test_compress_reduces_size() {
        let original = vec![b'a'; 1000];
        assert!(compress(&original, 6).len() < original.len());
    }
}
