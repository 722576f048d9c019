use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagemark_shared::{decode_value, render_svg, ShareRecord, ShareResponse, ViewportMeta};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::shares::{image_url, new_share_id, normalize_share_id};
use crate::state::AppState;
use crate::storage::StoreError;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

#[derive(Debug, Error)]
pub enum ShareServiceError {
    #[error("Malformed share request: {0}")]
    BadRequest(String),
    #[error("Too many annotations to share ({count}, at most {max})")]
    TooManyAnnotations { count: usize, max: usize },
    #[error("Share not found")]
    NotFound,
    #[error("Could not store the share")]
    Storage(#[from] StoreError),
}

impl ShareServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ShareServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ShareServiceError::TooManyAnnotations { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ShareServiceError::NotFound | ShareServiceError::Storage(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ShareServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShareServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "share request failed");
        } else {
            tracing::debug!(error = %self, "share request rejected");
        }
        (status, Json(ShareResponse::failure(self.to_string()))).into_response()
    }
}

/// Request body as received. The scene stays untyped so that a single bad
/// entry costs that entry only, not the whole share.
#[derive(Deserialize)]
struct IncomingShare {
    scene: Value,
    viewport: ViewportMeta,
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn share_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ShareResponse>, ShareServiceError> {
    let incoming: IncomingShare = serde_json::from_slice(&body)
        .map_err(|err| ShareServiceError::BadRequest(err.to_string()))?;
    if !incoming.viewport.is_valid() {
        return Err(ShareServiceError::BadRequest(
            "viewport must have a positive, finite size".into(),
        ));
    }
    let count = match &incoming.scene {
        Value::Array(entries) => entries.len(),
        _ => {
            return Err(ShareServiceError::BadRequest(
                "scene must be an array".into(),
            ))
        }
    };
    if count > state.max_annotations {
        return Err(ShareServiceError::TooManyAnnotations {
            count,
            max: state.max_annotations,
        });
    }

    let decoded = decode_value(incoming.scene);
    let record = ShareRecord {
        annotations: decoded.annotations,
        viewport: incoming.viewport,
        created_at_ms: now_ms(),
    };
    let share_id = new_share_id();
    state.storage.save_share(&share_id, &record).await?;
    tracing::info!(
        share_id,
        annotations = record.annotations.len(),
        discarded = decoded.discarded,
        "share created"
    );

    let note = match decoded.discarded {
        0 => None,
        1 => Some("1 malformed annotation was left out".to_string()),
        n => Some(format!("{n} malformed annotations were left out")),
    };
    Ok(Json(ShareResponse::Success {
        image_url: image_url(&state.public_url, &share_id),
        note,
    }))
}

pub async fn image_handler(
    Path(share_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ShareServiceError> {
    let share_id = normalize_share_id(&share_id).ok_or(ShareServiceError::NotFound)?;
    let record = state.storage.load_share(&share_id).await?;
    let svg = render_svg(&record.annotations, &record.viewport);
    Ok(([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg).into_response())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::storage::FileStorage;

    fn state(dir: &tempfile::TempDir, max_annotations: usize) -> AppState {
        AppState::new(
            Arc::new(FileStorage::new(dir.path().to_path_buf())),
            "http://share.test/",
            max_annotations,
        )
    }

    fn viewport() -> Value {
        json!({ "width": 800.0, "height": 600.0, "scrollX": 0.0, "scrollY": 100.0 })
    }

    fn rect() -> Value {
        json!({
            "type": "rect", "id": 1, "x": 10.0, "y": 120.0, "width": 50.0, "height": 40.0,
            "color": "#ff0000", "lineWidth": 2.0
        })
    }

    fn body(value: Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    fn share_id_of(response: &ShareResponse) -> String {
        match response {
            ShareResponse::Success { image_url, .. } => image_url
                .strip_prefix("http://share.test/shares/")
                .expect("image url under the public origin")
                .to_string(),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn share_is_stored_and_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, 10);
        let Json(response) = share_handler(
            State(state.clone()),
            body(json!({ "scene": [rect()], "viewport": viewport() })),
        )
        .await
        .unwrap();
        assert!(matches!(response, ShareResponse::Success { note: None, .. }));
        let share_id = share_id_of(&response);

        let image = image_handler(Path(share_id), State(state)).await.unwrap();
        assert_eq!(image.status(), StatusCode::OK);
        assert_eq!(
            image.headers().get(header::CONTENT_TYPE).unwrap(),
            SVG_CONTENT_TYPE
        );
        let bytes = axum::body::to_bytes(image.into_body(), usize::MAX)
            .await
            .unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<rect"));
    }

    #[tokio::test]
    async fn malformed_entries_are_dropped_with_a_note() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, 10);
        let scene = json!([rect(), { "type": "rect", "x": "nope" }, { "type": "blob" }]);
        let Json(response) = share_handler(
            State(state.clone()),
            body(json!({ "scene": scene, "viewport": viewport() })),
        )
        .await
        .unwrap();
        let ShareResponse::Success { note, .. } = &response else {
            panic!("expected success, got {response:?}");
        };
        assert_eq!(note.as_deref(), Some("2 malformed annotations were left out"));

        let record = state.storage.load_share(&share_id_of(&response)).await.unwrap();
        assert_eq!(record.annotations.len(), 1);
        assert_eq!(record.viewport.scroll_y, 100.0);
    }

    #[tokio::test]
    async fn too_many_annotations_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = share_handler(
            State(state(&dir, 1)),
            body(json!({ "scene": [rect(), rect()], "viewport": viewport() })),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ShareServiceError::TooManyAnnotations { count: 2, max: 1 }
        ));
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn invalid_bodies_are_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            Bytes::from_static(b"not json"),
            body(json!({ "scene": {}, "viewport": viewport() })),
            body(json!({
                "scene": [],
                "viewport": { "width": 0.0, "height": 600.0, "scrollX": 0.0, "scrollY": 0.0 }
            })),
            body(json!({ "scene": [] })),
        ];
        for case in cases {
            let err = share_handler(State(state(&dir, 10)), case).await.unwrap_err();
            assert!(matches!(err, ShareServiceError::BadRequest(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn error_body_carries_the_message() {
        let response = ShareServiceError::BadRequest("scene must be an array".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ShareResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            parsed,
            ShareResponse::failure("Malformed share request: scene must be an array")
        );
    }

    #[tokio::test]
    async fn unknown_or_invalid_share_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, 10);
        let missing = image_handler(Path(new_share_id()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
        let invalid = image_handler(Path("../secret".into()), State(state))
            .await
            .unwrap_err();
        assert!(matches!(invalid, ShareServiceError::NotFound));
    }

    #[tokio::test]
    async fn ping_is_no_content() {
        assert_eq!(
            ping_handler().await.into_response().status(),
            StatusCode::NO_CONTENT
        );
    }
}
