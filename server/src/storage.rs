use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use pagemark_shared::{decode_share_record, encode_share_record, ShareRecord, SnapshotDecodeError};
use thiserror::Error;

use crate::shares::share_file_name;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("share {0} does not exist")]
    NotFound(String),
    #[error("share storage failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode share record: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error(transparent)]
    Decode(#[from] SnapshotDecodeError),
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_share(&self, share_id: &str, record: &ShareRecord) -> Result<(), StoreError>;
    async fn load_share(&self, share_id: &str) -> Result<ShareRecord, StoreError>;
}

pub struct FileStorage {
    share_dir: PathBuf,
}

impl FileStorage {
    pub fn new(share_dir: PathBuf) -> Self {
        Self { share_dir }
    }

    fn path_for(&self, share_id: &str) -> PathBuf {
        self.share_dir.join(share_file_name(share_id))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save_share(&self, share_id: &str, record: &ShareRecord) -> Result<(), StoreError> {
        let payload = encode_share_record(record)?;
        let path = self.path_for(share_id);
        // Write next to the target and rename, so readers never see half a file.
        let partial = path.with_extension("partial");
        tokio::fs::write(&partial, payload).await?;
        tokio::fs::rename(&partial, &path).await?;
        tracing::debug!(share_id, path = %path.display(), "share stored");
        Ok(())
    }

    async fn load_share(&self, share_id: &str) -> Result<ShareRecord, StoreError> {
        let payload = match tokio::fs::read(self.path_for(share_id)).await {
            Ok(payload) => payload,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(share_id.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(decode_share_record(&payload)?)
    }
}
