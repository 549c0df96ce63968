//! Gzip + JSON codec for report blobs.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on the decompressed size of one blob.
pub const MAX_DECODED_BYTES: u64 = 256 * 1024 * 1024;

/// Decompress `bytes` and parse them as JSON.
///
/// Bytes without the gzip magic are parsed as-is; some transports decompress
/// `Content-Encoding: gzip` bodies on the way.
pub fn decode_json<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> StoreResult<T> {
    decode_json_limited(key, bytes, MAX_DECODED_BYTES)
}

fn decode_json_limited<T: DeserializeOwned>(key: &str, bytes: &[u8], limit: u64) -> StoreResult<T> {
    let decode_err = |message: String| StoreError::Decode {
        key: key.to_string(),
        message,
    };

    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = Vec::new();
        GzDecoder::new(bytes)
            .take(limit + 1)
            .read_to_end(&mut text)
            .map_err(|e| decode_err(format!("gzip: {e}")))?;
        if text.len() as u64 > limit {
            return Err(decode_err(format!("decompressed size exceeds {limit} bytes")));
        }
        serde_json::from_slice(&text).map_err(|e| decode_err(format!("json: {e}")))
    } else {
        serde_json::from_slice(bytes).map_err(|e| decode_err(format!("json: {e}")))
    }
}

/// Serialize `value` as pretty JSON and gzip it.
pub fn encode_json<T: Serialize>(key: &str, value: &T) -> StoreResult<Vec<u8>> {
    let encode_err = |message: String| StoreError::Encode {
        key: key.to_string(),
        message,
    };

    let json = serde_json::to_vec_pretty(value).map_err(|e| encode_err(format!("json: {e}")))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| encode_err(format!("gzip: {e}")))?;
    encoder.finish().map_err(|e| encode_err(format!("gzip: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compat_core::MonthSummary;

    #[test]
    fn test_encoded_blob_is_gzip() {
        let summary = MonthSummary::empty("2025-04");
        let bytes = encode_json("summary-2025-04.json.gz", &summary).unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));
        let decoded: MonthSummary = decode_json("summary-2025-04.json.gz", &bytes).unwrap();
        assert_eq!(decoded, summary);
    }

    #[test]
    fn test_plain_json_is_accepted() {
        let decoded: MonthSummary =
            decode_json("k", br#"{"reports": {}, "month": "2025-03"}"#).unwrap();
        assert_eq!(decoded.month, "2025-03");
    }

    #[test]
    fn test_truncated_gzip_is_decode_error() {
        let bytes = encode_json("k", &MonthSummary::empty("2025-04")).unwrap();
        let err = decode_json::<MonthSummary>("k", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref key, .. } if key == "k"));
    }

    #[test]
    fn test_oversized_gzip_is_decode_error() {
        let bytes = encode_json("k", &MonthSummary::empty("2025-04")).unwrap();
        let err = decode_json_limited::<MonthSummary>("k", &bytes, 16).unwrap_err();
        assert!(err.to_string().contains("decompressed size exceeds 16 bytes"));

        let decoded: MonthSummary = decode_json_limited("k", &bytes, 4096).unwrap();
        assert_eq!(decoded.month, "2025-04");
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let err = decode_json::<MonthSummary>("k", b"[1, 2, 3]").unwrap_err();
        assert!(err.to_string().starts_with("failed to decode k: json:"));
    }
}
