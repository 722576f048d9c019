use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::coords::DocPoint;

/// Stable identifier handed out by the scene. Zero means "not yet assigned".
#[derive(
    Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
    PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl AnnotationId {
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub struct Annotation {
    #[serde(default)]
    pub id: AnnotationId,
    #[serde(flatten)]
    pub shape: Shape,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Pencil(PencilStroke),
    Rect(RectShape),
    Arrow(ArrowShape),
    Text(TextNote),
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PencilStroke {
    pub points: Vec<DocPoint>,
    pub color: String,
    pub line_width: f64,
    #[serde(default)]
    pub line_dash: Option<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RectShape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub line_width: f64,
    #[serde(default)]
    pub line_dash: Option<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArrowShape {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: String,
    pub line_width: f64,
    #[serde(default)]
    pub line_dash: Option<[f64; 2]>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextNote {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: String,
    pub font_family: String,
    pub font_size: f64,
    #[serde(default)]
    pub text_align: TextAlign,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    /// Horizontal shift from the anchor to the left edge of a line `width` wide.
    pub fn offset(self, width: f64) -> f64 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width / 2.0,
            TextAlign::Right => -width,
        }
    }
}

/// Axis-aligned box in document space. Width and height may be negative
/// while a gesture is in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    pub fn from_corners(a: DocPoint, b: DocPoint) -> Self {
        Self {
            x: a.x,
            y: a.y,
            width: b.x - a.x,
            height: b.y - a.y,
        }
    }

    /// Flips the origin so that width and height are non-negative.
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The movable part of a shape, copied at gesture start so drags and resizes
/// can be recomputed from the original position rather than accumulated.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Points(Vec<DocPoint>),
    Segment { from: DocPoint, to: DocPoint },
    Box(BoxGeometry),
    Anchor(DocPoint),
}

impl Geometry {
    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        match self {
            Geometry::Points(points) => {
                Geometry::Points(points.iter().map(|point| point.offset(dx, dy)).collect())
            }
            Geometry::Segment { from, to } => Geometry::Segment {
                from: from.offset(dx, dy),
                to: to.offset(dx, dy),
            },
            Geometry::Box(rect) => Geometry::Box(BoxGeometry {
                x: rect.x + dx,
                y: rect.y + dy,
                ..*rect
            }),
            Geometry::Anchor(point) => Geometry::Anchor(point.offset(dx, dy)),
        }
    }
}

impl RectShape {
    pub fn geometry(&self) -> BoxGeometry {
        BoxGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn set_geometry(&mut self, rect: BoxGeometry) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

impl TextNote {
    /// CSS font shorthand used both for measuring and painting.
    pub fn css_font(&self) -> String {
        format!("{}px {}", self.font_size, self.font_family)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Pencil(_) => "pencil",
            Shape::Rect(_) => "rect",
            Shape::Arrow(_) => "arrow",
            Shape::Text(_) => "text",
        }
    }

    pub fn as_rect(&self) -> Option<&RectShape> {
        match self {
            Shape::Rect(rect) => Some(rect),
            _ => None,
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Shape::Pencil(stroke) => Geometry::Points(stroke.points.clone()),
            Shape::Rect(rect) => Geometry::Box(rect.geometry()),
            Shape::Arrow(arrow) => Geometry::Segment {
                from: DocPoint::new(arrow.x1, arrow.y1),
                to: DocPoint::new(arrow.x2, arrow.y2),
            },
            Shape::Text(note) => Geometry::Anchor(DocPoint::new(note.x, note.y)),
        }
    }

    /// Writes `geometry` back into the shape. Returns `false` when the
    /// geometry kind does not belong to this shape.
    pub fn set_geometry(&mut self, geometry: Geometry) -> bool {
        match (self, geometry) {
            (Shape::Pencil(stroke), Geometry::Points(points)) => {
                stroke.points = points;
            }
            (Shape::Rect(rect), Geometry::Box(geometry)) => {
                rect.set_geometry(geometry);
            }
            (Shape::Arrow(arrow), Geometry::Segment { from, to }) => {
                arrow.x1 = from.x;
                arrow.y1 = from.y;
                arrow.x2 = to.x;
                arrow.y2 = to.y;
            }
            (Shape::Text(note), Geometry::Anchor(point)) => {
                note.x = point.x;
                note.y = point.y;
            }
            _ => return false,
        }
        true
    }

    /// Applies the load-time rules: drops degenerate or non-finite
    /// shapes and normalizes rectangle sign.
    pub fn sanitized(self) -> Option<Shape> {
        match self {
            Shape::Pencil(mut stroke) => {
                if !stroke.line_width.is_finite() {
                    return None;
                }
                stroke.points.retain(|point| point.is_finite());
                if stroke.points.len() < 2 {
                    return None;
                }
                stroke.line_dash = stroke.line_dash.filter(|dash| dash_is_valid(dash));
                Some(Shape::Pencil(stroke))
            }
            Shape::Rect(mut rect) => {
                let finite = [rect.x, rect.y, rect.width, rect.height, rect.line_width]
                    .iter()
                    .all(|value| value.is_finite());
                if !finite {
                    return None;
                }
                let geometry = rect.geometry().normalized();
                rect.set_geometry(geometry);
                rect.line_dash = rect.line_dash.filter(|dash| dash_is_valid(dash));
                Some(Shape::Rect(rect))
            }
            Shape::Arrow(mut arrow) => {
                let finite = [arrow.x1, arrow.y1, arrow.x2, arrow.y2, arrow.line_width]
                    .iter()
                    .all(|value| value.is_finite());
                if !finite {
                    return None;
                }
                arrow.line_dash = arrow.line_dash.filter(|dash| dash_is_valid(dash));
                Some(Shape::Arrow(arrow))
            }
            Shape::Text(mut note) => {
                if !(note.x.is_finite() && note.y.is_finite() && note.font_size.is_finite()) {
                    return None;
                }
                let trimmed = note.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != note.text.len() {
                    note.text = trimmed.to_string();
                }
                Some(Shape::Text(note))
            }
        }
    }
}

fn dash_is_valid(dash: &[f64; 2]) -> bool {
    dash.iter().all(|value| value.is_finite() && *value >= 0.0)
}
