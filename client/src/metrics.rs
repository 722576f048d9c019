use web_sys::CanvasRenderingContext2d;

use pagemark_shared::TextMetrics;

/// Measures text with the overlay's own 2D context.
pub struct CanvasTextMetrics {
    ctx: CanvasRenderingContext2d,
}

impl CanvasTextMetrics {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl TextMetrics for CanvasTextMetrics {
    fn line_width(&self, line: &str, font: &str, _font_size: f64) -> Option<f64> {
        self.ctx.save();
        self.ctx.set_font(font);
        let width = self.ctx.measure_text(line).ok().map(|metrics| metrics.width());
        self.ctx.restore();
        width.filter(|width| width.is_finite())
    }
}
