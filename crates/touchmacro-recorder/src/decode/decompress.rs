//! Optional gzip/zlib layer in front of the recording text

use flate2::read::{MultiGzDecoder, ZlibDecoder};
use std::io::Read;
use tracing::{debug, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress when the blob carries a gzip or zlib header, otherwise (or when
/// decompression fails) read the raw bytes as lossy UTF-8. Never fails.
pub fn decompress(bytes: &[u8]) -> String {
    let inflated = if bytes.starts_with(&GZIP_MAGIC) {
        inflate(MultiGzDecoder::new(bytes), "gzip")
    } else if is_zlib_header(bytes) {
        inflate(ZlibDecoder::new(bytes), "zlib")
    } else {
        None
    };

    let text = match inflated {
        Some(raw) => String::from_utf8_lossy(&raw).into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

fn inflate(mut reader: impl Read, format: &str) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    match reader.read_to_end(&mut out) {
        Ok(n) => {
            debug!(format, bytes = n, "recording decompressed");
            Some(out)
        }
        Err(e) => {
            warn!(format, error = %e, "decompression failed, reading raw bytes");
            None
        }
    }
}

/// RFC 1950: deflate method, 32K window or less, header checksum divisible by 31.
fn is_zlib_header(bytes: &[u8]) -> bool {
    match bytes {
        &[cmf, flg, ..] => {
            cmf & 0x0f == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(decompress(b"tap,1,2"), "tap,1,2");
    }

    #[test]
    fn gzip_is_inflated() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(b"{\"actions\":[]}").unwrap();
        let gz = enc.finish().unwrap();
        assert_eq!(decompress(&gz), "{\"actions\":[]}");
    }

    #[test]
    fn zlib_is_inflated() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"delay,10").unwrap();
        let z = enc.finish().unwrap();
        assert_eq!(decompress(&z), "delay,10");
    }

    #[test]
    fn corrupt_gzip_falls_back_to_raw() {
        let text = decompress(&[0x1f, 0x8b, b'x', b'y']);
        assert!(text.ends_with("xy"));
    }

    #[test]
    fn bom_is_stripped() {
        assert_eq!(decompress("\u{feff}tap,1,1".as_bytes()), "tap,1,1");
    }
}
