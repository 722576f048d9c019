use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use pagemark_shared::{
    arrow_head, bounds_of, Annotation, BoxGeometry, CoordinateMapper, Preview, ResizeHandle,
    Session, Shape, TextMetrics, RESIZE_HANDLE_SIZE, TEXT_LINE_HEIGHT,
};

const SELECTION_COLOR: &str = "rgba(33, 150, 243, 0.9)";
const AREA_FILL: &str = "rgba(33, 150, 243, 0.08)";

/// The full-viewport canvas everything is painted on.
pub struct Surface {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub width: f64,
    pub height: f64,
}

impl Surface {
    /// Matches the backing store to the viewport size and pixel ratio, and
    /// returns the surface's offset relative to the viewport.
    pub fn resize(&mut self, window: &Window) -> (f64, f64) {
        let width = window
            .inner_width()
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        let height = window
            .inner_height()
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(0.0);
        let dpr = window.device_pixel_ratio().max(1.0);
        self.canvas.set_width((width * dpr) as u32);
        self.canvas.set_height((height * dpr) as u32);
        let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        self.width = width;
        self.height = height;
        log::debug!("surface resized to {width}x{height} @{dpr}");
        let rect = self.canvas.get_bounding_client_rect();
        (rect.left(), rect.top())
    }
}

pub fn repaint(
    surface: &Surface,
    session: &Session,
    mapper: &CoordinateMapper,
    metrics: &dyn TextMetrics,
) {
    let ctx = &surface.ctx;
    ctx.clear_rect(0.0, 0.0, surface.width, surface.height);
    for annotation in session.scene().annotations() {
        if let Err(err) = draw_shape(ctx, mapper, &annotation.shape) {
            log::warn!(
                "failed to paint {} annotation {:?}: {err:?}",
                annotation.shape.kind(),
                annotation.id
            );
        }
    }
    if let Some(selected) = session.scene().selected_annotation() {
        if let Err(err) = draw_selection(ctx, mapper, selected, metrics) {
            log::warn!("failed to paint selection: {err:?}");
        }
    }
    let preview = match session.preview() {
        Some(Preview::Shape(shape)) => draw_shape(ctx, mapper, &shape),
        Some(Preview::Area(area)) => draw_area(ctx, mapper, area),
        None => Ok(()),
    };
    if let Err(err) = preview {
        log::warn!("failed to paint preview: {err:?}");
    }
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: Option<[f64; 2]>) -> Result<(), JsValue> {
    let pattern = js_sys::Array::new();
    if let Some([on, off]) = dash {
        pattern.push(&on.into());
        pattern.push(&off.into());
    }
    ctx.set_line_dash(&pattern)
}

fn begin_stroke(
    ctx: &CanvasRenderingContext2d,
    color: &str,
    line_width: f64,
    dash: Option<[f64; 2]>,
) -> Result<(), JsValue> {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(line_width);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    set_dash(ctx, dash)
}

fn draw_shape(
    ctx: &CanvasRenderingContext2d,
    mapper: &CoordinateMapper,
    shape: &Shape,
) -> Result<(), JsValue> {
    ctx.save();
    let result = paint_shape(ctx, mapper, shape);
    ctx.restore();
    result
}

fn paint_shape(
    ctx: &CanvasRenderingContext2d,
    mapper: &CoordinateMapper,
    shape: &Shape,
) -> Result<(), JsValue> {
    match shape {
        Shape::Pencil(stroke) => {
            begin_stroke(ctx, &stroke.color, stroke.line_width, stroke.line_dash)?;
            ctx.begin_path();
            for (index, point) in stroke.points.iter().enumerate() {
                let (x, y) = mapper.surface_xy(point.x, point.y);
                if index == 0 {
                    ctx.move_to(x, y);
                } else {
                    ctx.line_to(x, y);
                }
            }
            ctx.stroke();
        }
        Shape::Rect(rect) => {
            begin_stroke(ctx, &rect.color, rect.line_width, rect.line_dash)?;
            let (x, y) = mapper.surface_xy(rect.x, rect.y);
            ctx.stroke_rect(x, y, rect.width, rect.height);
        }
        Shape::Arrow(arrow) => {
            begin_stroke(ctx, &arrow.color, arrow.line_width, arrow.line_dash)?;
            let (x1, y1) = mapper.surface_xy(arrow.x1, arrow.y1);
            let (x2, y2) = mapper.surface_xy(arrow.x2, arrow.y2);
            ctx.begin_path();
            ctx.move_to(x1, y1);
            ctx.line_to(x2, y2);
            ctx.stroke();

            set_dash(ctx, None)?;
            let [left, right] =
                arrow_head(arrow.x1, arrow.y1, arrow.x2, arrow.y2, arrow.line_width);
            let (lx, ly) = mapper.surface_xy(left.x, left.y);
            let (rx, ry) = mapper.surface_xy(right.x, right.y);
            ctx.begin_path();
            ctx.move_to(lx, ly);
            ctx.line_to(x2, y2);
            ctx.line_to(rx, ry);
            ctx.stroke();
        }
        Shape::Text(note) => {
            ctx.set_font(&note.css_font());
            ctx.set_fill_style_str(&note.color);
            ctx.set_text_align(note.text_align.as_str());
            ctx.set_text_baseline("top");
            let line_height = note.font_size * TEXT_LINE_HEIGHT;
            for (index, line) in note.lines().enumerate() {
                let (x, y) = mapper.surface_xy(note.x, note.y + index as f64 * line_height);
                ctx.fill_text(line, x, y)?;
            }
        }
    }
    Ok(())
}

fn draw_selection(
    ctx: &CanvasRenderingContext2d,
    mapper: &CoordinateMapper,
    annotation: &Annotation,
    metrics: &dyn TextMetrics,
) -> Result<(), JsValue> {
    ctx.save();
    let result = paint_selection(ctx, mapper, annotation, metrics);
    ctx.restore();
    result
}

fn paint_selection(
    ctx: &CanvasRenderingContext2d,
    mapper: &CoordinateMapper,
    annotation: &Annotation,
    metrics: &dyn TextMetrics,
) -> Result<(), JsValue> {
    let Some(bounds) = bounds_of(annotation, metrics) else {
        return Ok(());
    };
    begin_stroke(ctx, SELECTION_COLOR, 1.0, Some([4.0, 4.0]))?;
    let (x, y) = mapper.surface_xy(bounds.min_x, bounds.min_y);
    ctx.stroke_rect(x, y, bounds.width(), bounds.height());

    let Some(rect) = annotation.shape.as_rect() else {
        return Ok(());
    };
    set_dash(ctx, None)?;
    ctx.set_fill_style_str("#ffffff");
    let half = RESIZE_HANDLE_SIZE / 2.0;
    for handle in ResizeHandle::ALL {
        let center = handle.position(rect.geometry());
        let (cx, cy) = mapper.surface_xy(center.x, center.y);
        ctx.fill_rect(cx - half, cy - half, RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE);
        ctx.stroke_rect(cx - half, cy - half, RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE);
    }
    Ok(())
}

fn draw_area(
    ctx: &CanvasRenderingContext2d,
    mapper: &CoordinateMapper,
    area: BoxGeometry,
) -> Result<(), JsValue> {
    let area = area.normalized();
    ctx.save();
    let result = begin_stroke(ctx, SELECTION_COLOR, 1.0, Some([4.0, 6.0])).map(|()| {
        let (x, y) = mapper.surface_xy(area.x, area.y);
        ctx.set_fill_style_str(AREA_FILL);
        ctx.fill_rect(x, y, area.width, area.height);
        ctx.stroke_rect(x, y, area.width, area.height);
    });
    ctx.restore();
    result
}
