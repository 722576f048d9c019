//! Platform-independent core of the pagemark overlay: the annotation model,
//! geometry, the interaction state machine and the persistence and share
//! formats. Nothing here touches a browser or a runtime.

pub mod annotation;
pub mod coords;
pub mod frame;
pub mod geometry;
pub mod persistence;
pub mod scene;
pub mod session;
pub mod share;
pub mod snapshot_format;
pub mod style;
pub mod svg;

pub use annotation::{
    Annotation, AnnotationId, ArrowShape, BoxGeometry, Geometry, PencilStroke, RectShape, Shape,
    TextAlign, TextNote,
};
pub use coords::{CoordinateMapper, DocPoint, SurfacePoint, ViewportPoint};
pub use frame::FrameCoalescer;
pub use geometry::{
    arrow_head, bounds_of, hit_test, ApproxTextMetrics, Bounds, ResizeHandle, TextMetrics,
    MIN_RECT_SIZE, RESIZE_HANDLE_SIZE, TEXT_LINE_HEIGHT,
};
pub use persistence::{
    decode_scene, decode_value, encode_scene, sanitize_annotations, storage_key, DecodedScene,
    KeyValueStore, MemoryStore, PersistenceAdapter, StorageError, DEFAULT_STORAGE_PREFIX,
};
pub use scene::Scene;
pub use session::{
    ConfirmChoice, ConfirmRequest, Cursor, Effect, Gesture, GestureKind, InputEvent, Preview,
    Session, Tool,
};
pub use share::{ShareRequest, ShareResponse, ViewportMeta};
pub use snapshot_format::{
    decode_share_record, encode_share_record, ShareRecord, SnapshotDecodeError,
};
pub use style::{Style, StylePatch};
pub use svg::render_svg;
