use std::sync::Arc;

use crate::storage::Storage;

pub const DEFAULT_MAX_ANNOTATIONS: usize = 2000;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Origin the returned image links point at, without a trailing slash.
    pub public_url: String,
    pub max_annotations: usize,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, public_url: &str, max_annotations: usize) -> Self {
        Self {
            storage,
            public_url: public_url.trim_end_matches('/').to_string(),
            max_annotations,
        }
    }
}
