use crate::annotation::{Annotation, BoxGeometry, RectShape, Shape, TextNote};
use crate::coords::DocPoint;

/// Side of the square grab area around each rectangle handle.
pub const RESIZE_HANDLE_SIZE: f64 = 8.0;
/// Smallest width or height a resize may produce.
pub const MIN_RECT_SIZE: f64 = RESIZE_HANDLE_SIZE * 2.0;
pub const BOUNDS_MARGIN: f64 = 5.0;
pub const TEXT_PADDING: f64 = 4.0;
pub const TEXT_LINE_HEIGHT: f64 = 1.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_box(rect: BoxGeometry) -> Self {
        let rect = rect.normalized();
        Self {
            min_x: rect.x,
            min_y: rect.y,
            max_x: rect.x + rect.width,
            max_y: rect.y + rect.height,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DocPoint>) -> Option<Self> {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for point in points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        if min_x == f64::MAX {
            None
        } else {
            Some(Self {
                min_x,
                min_y,
                max_x,
                max_y,
            })
        }
    }

    pub fn padded(self, pad: f64) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, point: DocPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

/// Measures rendered text. The browser answers from canvas font metrics;
/// headless callers use [`ApproxTextMetrics`].
pub trait TextMetrics {
    /// Width of a single line drawn in `font` (CSS shorthand), or `None` when
    /// the font cannot be measured.
    fn line_width(&self, line: &str, font: &str, font_size: f64) -> Option<f64>;
}

/// Character-count estimate, good enough for server-side snapshots and tests.
pub struct ApproxTextMetrics;

impl TextMetrics for ApproxTextMetrics {
    fn line_width(&self, line: &str, _font: &str, font_size: f64) -> Option<f64> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return None;
        }
        Some(line.chars().count() as f64 * font_size * 0.6)
    }
}

pub fn stroke_padding(line_width: f64) -> f64 {
    (line_width / 2.0).max(1.0) + BOUNDS_MARGIN
}

pub fn text_bounds(note: &TextNote, metrics: &dyn TextMetrics) -> Option<Bounds> {
    let font = note.css_font();
    let mut width: f64 = 0.0;
    let mut line_count = 0usize;
    for line in note.lines() {
        width = width.max(metrics.line_width(line, &font, note.font_size)?);
        line_count += 1;
    }
    let height = line_count as f64 * note.font_size * TEXT_LINE_HEIGHT;
    let left = note.x + note.text_align.offset(width);
    Some(
        Bounds {
            min_x: left,
            min_y: note.y,
            max_x: left + width,
            max_y: note.y + height,
        }
        .padded(TEXT_PADDING),
    )
}

/// Padded, document-space bounding box of an annotation.
pub fn bounds_of(annotation: &Annotation, metrics: &dyn TextMetrics) -> Option<Bounds> {
    shape_bounds(&annotation.shape, metrics)
}

pub fn shape_bounds(shape: &Shape, metrics: &dyn TextMetrics) -> Option<Bounds> {
    match shape {
        Shape::Pencil(stroke) => {
            Bounds::from_points(&stroke.points).map(|b| b.padded(stroke_padding(stroke.line_width)))
        }
        Shape::Rect(rect) => Some(
            Bounds::from_box(rect.geometry())
                .padded(stroke_padding(rect.line_width) + RESIZE_HANDLE_SIZE),
        ),
        Shape::Arrow(arrow) => Some(
            Bounds {
                min_x: arrow.x1.min(arrow.x2),
                min_y: arrow.y1.min(arrow.y2),
                max_x: arrow.x1.max(arrow.x2),
                max_y: arrow.y1.max(arrow.y2),
            }
            .padded(stroke_padding(arrow.line_width)),
        ),
        Shape::Text(note) => text_bounds(note, metrics),
    }
}

pub fn hit_test(point: DocPoint, annotation: &Annotation, metrics: &dyn TextMetrics) -> bool {
    if let Shape::Rect(rect) = &annotation.shape {
        let margin = rect.line_width.max(1.0);
        if Bounds::from_box(rect.geometry()).padded(margin).contains(point) {
            return true;
        }
    }
    bounds_of(annotation, metrics)
        .map(|bounds| bounds.contains(point))
        .unwrap_or(false)
}

/// Index of the topmost annotation under `point`; later entries paint on top.
pub fn topmost_hit(
    annotations: &[Annotation],
    point: DocPoint,
    metrics: &dyn TextMetrics,
) -> Option<usize> {
    annotations
        .iter()
        .rposition(|annotation| hit_test(point, annotation, metrics))
}

/// Index of the topmost annotation whose bounds overlap `area`.
pub fn topmost_intersecting(
    annotations: &[Annotation],
    area: &Bounds,
    metrics: &dyn TextMetrics,
) -> Option<usize> {
    annotations.iter().rposition(|annotation| {
        bounds_of(annotation, metrics)
            .map(|bounds| rects_intersect(&bounds, area))
            .unwrap_or(false)
    })
}

pub fn rects_intersect(a: &Bounds, b: &Bounds) -> bool {
    a.min_x <= b.max_x && a.max_x >= b.min_x && a.min_y <= b.max_y && a.max_y >= b.min_y
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    Nw,
    N,
    Ne,
    W,
    E,
    Sw,
    S,
    Se,
}

impl ResizeHandle {
    /// Corners come first so they win where handles overlap on tiny rects.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Nw,
        ResizeHandle::Ne,
        ResizeHandle::Sw,
        ResizeHandle::Se,
        ResizeHandle::N,
        ResizeHandle::S,
        ResizeHandle::W,
        ResizeHandle::E,
    ];

    pub fn position(self, rect: BoxGeometry) -> DocPoint {
        let rect = rect.normalized();
        let left = rect.x;
        let right = rect.x + rect.width;
        let top = rect.y;
        let bottom = rect.y + rect.height;
        let center_x = rect.x + rect.width / 2.0;
        let center_y = rect.y + rect.height / 2.0;
        match self {
            ResizeHandle::Nw => DocPoint::new(left, top),
            ResizeHandle::N => DocPoint::new(center_x, top),
            ResizeHandle::Ne => DocPoint::new(right, top),
            ResizeHandle::W => DocPoint::new(left, center_y),
            ResizeHandle::E => DocPoint::new(right, center_y),
            ResizeHandle::Sw => DocPoint::new(left, bottom),
            ResizeHandle::S => DocPoint::new(center_x, bottom),
            ResizeHandle::Se => DocPoint::new(right, bottom),
        }
    }

    pub fn cursor(self) -> &'static str {
        match self {
            ResizeHandle::Nw | ResizeHandle::Se => "nwse-resize",
            ResizeHandle::Ne | ResizeHandle::Sw => "nesw-resize",
            ResizeHandle::N | ResizeHandle::S => "ns-resize",
            ResizeHandle::W | ResizeHandle::E => "ew-resize",
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::W | ResizeHandle::Sw)
    }

    fn moves_right(self) -> bool {
        matches!(self, ResizeHandle::Ne | ResizeHandle::E | ResizeHandle::Se)
    }

    fn moves_top(self) -> bool {
        matches!(self, ResizeHandle::Nw | ResizeHandle::N | ResizeHandle::Ne)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, ResizeHandle::Sw | ResizeHandle::S | ResizeHandle::Se)
    }
}

pub fn resize_handle_at(rect: &RectShape, point: DocPoint) -> Option<ResizeHandle> {
    let half = RESIZE_HANDLE_SIZE / 2.0;
    let geometry = rect.geometry();
    ResizeHandle::ALL.into_iter().find(|handle| {
        let center = handle.position(geometry);
        (point.x - center.x).abs() <= half && (point.y - center.y).abs() <= half
    })
}

/// Recomputes a box from its pre-gesture `origin` and the cumulative drag
/// delta. An axis whose new size would fall under [`MIN_RECT_SIZE`] keeps its
/// original origin and size.
pub fn resize_box(origin: BoxGeometry, handle: ResizeHandle, dx: f64, dy: f64) -> BoxGeometry {
    let mut next = origin;

    let horizontal = if handle.moves_left() {
        Some((origin.x + dx, origin.width - dx))
    } else if handle.moves_right() {
        Some((origin.x, origin.width + dx))
    } else {
        None
    };
    if let Some((x, width)) = horizontal {
        if width >= MIN_RECT_SIZE {
            next.x = x;
            next.width = width;
        }
    }

    let vertical = if handle.moves_top() {
        Some((origin.y + dy, origin.height - dy))
    } else if handle.moves_bottom() {
        Some((origin.y, origin.height + dy))
    } else {
        None
    };
    if let Some((y, height)) = vertical {
        if height >= MIN_RECT_SIZE {
            next.y = y;
            next.height = height;
        }
    }

    next
}

/// The two barb ends of an arrow head pointing at `(x2, y2)`.
pub fn arrow_head(x1: f64, y1: f64, x2: f64, y2: f64, line_width: f64) -> [DocPoint; 2] {
    let length = (line_width * 4.0).max(10.0);
    let angle = (y2 - y1).atan2(x2 - x1);
    let spread = std::f64::consts::PI / 6.0;
    [
        DocPoint::new(
            x2 - length * (angle - spread).cos(),
            y2 - length * (angle - spread).sin(),
        ),
        DocPoint::new(
            x2 - length * (angle + spread).cos(),
            y2 - length * (angle + spread).sin(),
        ),
    ]
}
