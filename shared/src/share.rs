use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;

/// Visible window at the moment the user asked for a share link.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewportMeta {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl ViewportMeta {
    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.scroll_x, self.scroll_y]
            .iter()
            .all(|value| value.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShareRequest {
    pub scene: Vec<Annotation>,
    pub viewport: ViewportMeta,
}

/// What the service replies; exactly one of the two shapes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ShareResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        image_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Failure { error: String },
}

impl ShareResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        ShareResponse::Failure {
            error: error.into(),
        }
    }
}
