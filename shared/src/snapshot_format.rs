use bincode::{Decode, Encode};
use thiserror::Error;

use crate::annotation::Annotation;
use crate::share::ViewportMeta;

pub const SHARE_RECORD_MAGIC: [u8; 4] = *b"PMSR";
pub const SHARE_RECORD_VERSION: u32 = 1;
const SHARE_RECORD_HEADER_LEN: usize = SHARE_RECORD_MAGIC.len() + std::mem::size_of::<u32>();

/// A stored share: the sanitized scene plus the viewport it was taken from.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct ShareRecord {
    pub annotations: Vec<Annotation>,
    pub viewport: ViewportMeta,
    pub created_at_ms: u64,
}

#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    #[error("unsupported share record version {0}")]
    UnsupportedVersion(u32),
    #[error("share record header is missing or corrupt")]
    InvalidHeader,
    #[error("share record body could not be decoded: {0}")]
    InvalidBody(#[from] bincode::error::DecodeError),
}

pub fn encode_share_record(record: &ShareRecord) -> Result<Vec<u8>, bincode::error::EncodeError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&SHARE_RECORD_MAGIC);
    payload.extend_from_slice(&SHARE_RECORD_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(record, bincode::config::standard())?;
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_share_record(payload: &[u8]) -> Result<ShareRecord, SnapshotDecodeError> {
    if payload.len() < SHARE_RECORD_HEADER_LEN || !payload.starts_with(&SHARE_RECORD_MAGIC) {
        return Err(SnapshotDecodeError::InvalidHeader);
    }
    let version = u32::from_le_bytes(
        payload[SHARE_RECORD_MAGIC.len()..SHARE_RECORD_HEADER_LEN]
            .try_into()
            .map_err(|_| SnapshotDecodeError::InvalidHeader)?,
    );
    let body = &payload[SHARE_RECORD_HEADER_LEN..];
    match version {
        1 => {
            let (record, _) = bincode::decode_from_slice(body, bincode::config::standard())?;
            Ok(record)
        }
        _ => Err(SnapshotDecodeError::UnsupportedVersion(version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationId, RectShape, Shape};

    fn record() -> ShareRecord {
        ShareRecord {
            annotations: vec![Annotation {
                id: AnnotationId(3),
                shape: Shape::Rect(RectShape {
                    x: 1.0,
                    y: 2.0,
                    width: 30.0,
                    height: 40.0,
                    color: "#123".into(),
                    line_width: 2.0,
                    line_dash: Some([6.0, 4.0]),
                }),
            }],
            viewport: ViewportMeta {
                width: 1024.0,
                height: 768.0,
                scroll_x: 0.0,
                scroll_y: 50.0,
            },
            created_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn header_is_written_before_body() {
        let bytes = encode_share_record(&record()).unwrap();
        assert!(bytes.starts_with(b"PMSR"));
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(decode_share_record(&bytes).unwrap(), record());
    }

    #[test]
    fn rejects_foreign_and_future_payloads() {
        assert!(matches!(
            decode_share_record(b"[]"),
            Err(SnapshotDecodeError::InvalidHeader)
        ));

        let mut bytes = encode_share_record(&record()).unwrap();
        bytes[4..8].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(
            decode_share_record(&bytes),
            Err(SnapshotDecodeError::UnsupportedVersion(9))
        ));

        let bytes = encode_share_record(&record()).unwrap();
        assert!(matches!(
            decode_share_record(&bytes[..12]),
            Err(SnapshotDecodeError::InvalidBody(_))
        ));
    }
}
