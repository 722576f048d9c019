//! Scene persistence through an asynchronous string key-value store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::annotation::{Annotation, Shape};

pub const DEFAULT_STORAGE_PREFIX: &str = "pagemark:";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("scene could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The host's asynchronous string store.
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory store used by tests and as a last-resort fallback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    reject_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes.get() {
            return Err(StorageError::Write("writes rejected".into()));
        }
        self.insert(key, value);
        Ok(())
    }
}

/// Reduces a page path to the form used in storage keys: query and fragment
/// dropped, repeated slashes collapsed, no trailing slash except for the root.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

pub fn storage_key(prefix: &str, origin: &str, path: &str) -> String {
    format!(
        "{prefix}{}{}",
        origin.trim_end_matches('/'),
        normalize_path(path)
    )
}

pub fn encode_scene(annotations: &[Annotation]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(annotations)?)
}

/// Result of a tolerant decode: the usable entries plus how many were dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedScene {
    pub annotations: Vec<Annotation>,
    pub discarded: usize,
}

/// Decodes an already parsed JSON value. Anything but an array yields an
/// empty scene; array entries are kept or discarded one by one.
pub fn decode_value(value: Value) -> DecodedScene {
    let Value::Array(entries) = value else {
        log::warn!("stored scene is not an array; starting empty");
        return DecodedScene::default();
    };
    let mut decoded = DecodedScene::default();
    for entry in entries {
        let kind = entry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_string();
        let annotation = serde_json::from_value::<Annotation>(entry)
            .ok()
            .and_then(sanitize_annotation);
        match annotation {
            Some(annotation) => decoded.annotations.push(annotation),
            None => {
                log::warn!("discarding malformed stored entry of type {kind}");
                decoded.discarded += 1;
            }
        }
    }
    decoded
}

/// Decodes a stored scene. Never fails: unreadable input yields an empty scene.
pub fn decode_scene(text: &str) -> DecodedScene {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode_value(value),
        Err(err) => {
            log::warn!("stored scene is not valid JSON: {err}");
            DecodedScene::default()
        }
    }
}

fn sanitize_annotation(annotation: Annotation) -> Option<Annotation> {
    let Annotation { id, shape } = annotation;
    Shape::sanitized(shape).map(|shape| Annotation { id, shape })
}

/// Applies load-time sanitization to already typed annotations.
pub fn sanitize_annotations(annotations: Vec<Annotation>) -> DecodedScene {
    let total = annotations.len();
    let annotations: Vec<_> = annotations
        .into_iter()
        .filter_map(sanitize_annotation)
        .collect();
    DecodedScene {
        discarded: total - annotations.len(),
        annotations,
    }
}

/// Saves and loads the scene of one page.
#[derive(Clone, Debug)]
pub struct PersistenceAdapter<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn save(&self, annotations: &[Annotation]) -> Result<(), StorageError> {
        let payload = encode_scene(annotations)?;
        self.store.set(&self.key, &payload).await?;
        log::debug!("saved {} annotations under {}", annotations.len(), self.key);
        Ok(())
    }

    /// Missing or malformed state loads as an empty scene; only a failing
    /// backend is reported as an error.
    pub async fn load(&self) -> Result<Vec<Annotation>, StorageError> {
        let Some(payload) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        let decoded = decode_scene(&payload);
        if decoded.discarded > 0 {
            log::warn!(
                "dropped {} malformed entries while loading {}",
                decoded.discarded,
                self.key
            );
        }
        Ok(decoded.annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{
        AnnotationId, ArrowShape, PencilStroke, RectShape, TextAlign, TextNote,
    };
    use crate::coords::DocPoint;

    fn sample_scene() -> Vec<Annotation> {
        vec![
            Annotation {
                id: AnnotationId(1),
                shape: Shape::Pencil(PencilStroke {
                    points: vec![DocPoint::new(10.0, 10.0), DocPoint::new(20.5, 12.25)],
                    color: "#e53935".into(),
                    line_width: 3.0,
                    line_dash: None,
                }),
            },
            Annotation {
                id: AnnotationId(2),
                shape: Shape::Rect(RectShape {
                    x: 0.0,
                    y: 0.0,
                    width: 100.0,
                    height: 50.0,
                    color: "blue".into(),
                    line_width: 2.0,
                    line_dash: Some([6.0, 4.0]),
                }),
            },
            Annotation {
                id: AnnotationId(3),
                shape: Shape::Arrow(ArrowShape {
                    x1: 5.0,
                    y1: 5.0,
                    x2: 50.0,
                    y2: 75.0,
                    color: "#000".into(),
                    line_width: 4.0,
                    line_dash: None,
                }),
            },
            Annotation {
                id: AnnotationId(4),
                shape: Shape::Text(TextNote {
                    x: 12.0,
                    y: 40.0,
                    text: "two\nlines".into(),
                    color: "#333".into(),
                    font_family: "serif".into(),
                    font_size: 16.0,
                    text_align: TextAlign::Center,
                }),
            },
        ]
    }

    fn adapter() -> PersistenceAdapter<MemoryStore> {
        PersistenceAdapter::new(
            MemoryStore::new(),
            storage_key(DEFAULT_STORAGE_PREFIX, "https://example.com", "/docs/"),
        )
    }

    #[tokio::test]
    async fn save_then_load_returns_same_scene() {
        let adapter = adapter();
        let scene = sample_scene();
        adapter.save(&scene).await.unwrap();
        assert_eq!(adapter.load().await.unwrap(), scene);

        adapter.save(&[]).await.unwrap();
        assert!(adapter.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_key_loads_empty() {
        assert!(adapter().load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_array_payload_loads_empty() {
        let adapter = adapter();
        for payload in [r#"{"type":"rect"}"#, "42", "not json", "null"] {
            adapter.store().insert(adapter.key(), payload);
            assert!(adapter.load().await.unwrap().is_empty(), "{payload}");
        }
    }

    #[tokio::test]
    async fn malformed_entries_are_dropped_individually() {
        let adapter = adapter();
        adapter.store().insert(
            adapter.key(),
            r##"[7, {"x": 1}, {"type": "circle"},
                {"type": "rect", "x": 1, "y": 2, "width": 3, "height": 4,
                 "color": "#fff", "lineWidth": 1}]"##,
        );
        let loaded = adapter.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].shape.kind(), "rect");
    }

    #[test]
    fn only_bad_entries_decode_to_empty_scene() {
        let decoded = decode_scene(r#"[{"points": []}, "rect"]"#);
        assert!(decoded.annotations.is_empty());
        assert_eq!(decoded.discarded, 2);
    }

    #[test]
    fn sanitization_drops_degenerate_entries() {
        let decoded = decode_scene(
            r##"[{"type": "pencil", "points": [{"x": 1, "y": 1}], "color": "#000", "lineWidth": 2},
                {"type": "text", "x": 0, "y": 0, "text": "   ", "color": "#000",
                 "fontFamily": "serif", "fontSize": 12, "textAlign": "left"}]"##,
        );
        assert!(decoded.annotations.is_empty());
        assert_eq!(decoded.discarded, 2);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let adapter = adapter();
        adapter.store().set_reject_writes(true);
        assert!(matches!(
            adapter.save(&sample_scene()).await,
            Err(StorageError::Write(_))
        ));
    }

    #[test]
    fn key_normalizes_path() {
        assert_eq!(
            storage_key("p:", "https://a.test/", "//docs//guide/?q=1#top"),
            "p:https://a.test/docs/guide"
        );
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/?x"), "/");
        assert_eq!(normalize_path("/a/b"), "/a/b");
    }
}
