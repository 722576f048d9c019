use serde::{Deserialize, Serialize};

use crate::annotation::{Shape, TextAlign};

pub const DEFAULT_COLOR: &str = "#e53935";
pub const MIN_LINE_WIDTH: f64 = 1.0;
pub const MAX_LINE_WIDTH: f64 = 60.0;
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 200.0;

/// Style applied to newly drawn annotations.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    pub color: String,
    pub line_width: f64,
    pub dashed: bool,
    pub font_family: String,
    pub font_size: f64,
    pub text_align: TextAlign,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            line_width: 3.0,
            dashed: false,
            font_family: "sans-serif".to_string(),
            font_size: 18.0,
            text_align: TextAlign::Left,
        }
    }
}

/// Partial style edit coming from the style panel.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    pub color: Option<String>,
    pub line_width: Option<f64>,
    pub dashed: Option<bool>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub text_align: Option<TextAlign>,
}

pub fn sanitize_color(mut color: String) -> String {
    if color.trim().is_empty() {
        return DEFAULT_COLOR.to_string();
    }
    if color.len() > 32 {
        let mut end = 32;
        while !color.is_char_boundary(end) {
            end -= 1;
        }
        color.truncate(end);
    }
    color
}

pub fn sanitize_line_width(width: f64) -> f64 {
    let width = if width.is_finite() { width } else { 3.0 };
    width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
}

pub fn sanitize_font_size(size: f64) -> f64 {
    let size = if size.is_finite() { size } else { 18.0 };
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// `[on, off]` dash pattern scaled by the stroke width.
pub fn dash_pattern(line_width: f64) -> [f64; 2] {
    [line_width * 3.0, line_width * 2.0]
}

impl Style {
    pub fn line_dash(&self) -> Option<[f64; 2]> {
        self.dashed.then(|| dash_pattern(self.line_width))
    }

    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(color) = &patch.color {
            self.color = sanitize_color(color.clone());
        }
        if let Some(width) = patch.line_width {
            self.line_width = sanitize_line_width(width);
        }
        if let Some(dashed) = patch.dashed {
            self.dashed = dashed;
        }
        if let Some(family) = &patch.font_family {
            if !family.trim().is_empty() {
                self.font_family = family.clone();
            }
        }
        if let Some(size) = patch.font_size {
            self.font_size = sanitize_font_size(size);
        }
        if let Some(align) = patch.text_align {
            self.text_align = align;
        }
    }
}

fn restyle_stroke(
    color: &mut String,
    line_width: &mut f64,
    line_dash: &mut Option<[f64; 2]>,
    patch: &StylePatch,
) {
    if let Some(value) = &patch.color {
        *color = sanitize_color(value.clone());
    }
    if let Some(value) = patch.line_width {
        *line_width = sanitize_line_width(value);
    }
    let dashed = patch.dashed.unwrap_or(line_dash.is_some());
    *line_dash = dashed.then(|| dash_pattern(*line_width));
}

/// Applies the fields of `patch` that make sense for this shape kind.
pub fn restyle(shape: &mut Shape, patch: &StylePatch) {
    match shape {
        Shape::Pencil(stroke) => restyle_stroke(
            &mut stroke.color,
            &mut stroke.line_width,
            &mut stroke.line_dash,
            patch,
        ),
        Shape::Rect(rect) => restyle_stroke(
            &mut rect.color,
            &mut rect.line_width,
            &mut rect.line_dash,
            patch,
        ),
        Shape::Arrow(arrow) => restyle_stroke(
            &mut arrow.color,
            &mut arrow.line_width,
            &mut arrow.line_dash,
            patch,
        ),
        Shape::Text(note) => {
            if let Some(value) = &patch.color {
                note.color = sanitize_color(value.clone());
            }
            if let Some(family) = &patch.font_family {
                if !family.trim().is_empty() {
                    note.font_family = family.clone();
                }
            }
            if let Some(size) = patch.font_size {
                note.font_size = sanitize_font_size(size);
            }
            if let Some(align) = patch.text_align {
                note.text_align = align;
            }
        }
    }
}
