//! Static SVG rendering of a scene, used for shared snapshots.

use std::fmt::Write;

use crate::annotation::{Annotation, Shape, TextAlign};
use crate::geometry::{arrow_head, TEXT_LINE_HEIGHT};
use crate::share::ViewportMeta;

/// Renders `annotations` as seen through `viewport`: the view box starts at
/// the viewport scroll offset, so document coordinates are used unchanged.
pub fn render_svg(annotations: &[Annotation], viewport: &ViewportMeta) -> String {
    let mut body = String::new();
    for annotation in annotations {
        write_shape(&mut body, &annotation.shape);
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\">{body}</svg>",
        x = viewport.scroll_x,
        y = viewport.scroll_y,
        w = viewport.width,
        h = viewport.height,
    )
}

fn write_shape(out: &mut String, shape: &Shape) {
    match shape {
        Shape::Pencil(stroke) => {
            let mut data = String::new();
            for (index, point) in stroke.points.iter().enumerate() {
                let command = if index == 0 { "M" } else { " L" };
                let _ = write!(data, "{command} {} {}", point.x, point.y);
            }
            let _ = write!(
                out,
                "<path d=\"{data}\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\"{} />",
                stroke_attrs(&stroke.color, stroke.line_width, stroke.line_dash)
            );
        }
        Shape::Rect(rect) => {
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\"{} />",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                stroke_attrs(&rect.color, rect.line_width, rect.line_dash)
            );
        }
        Shape::Arrow(arrow) => {
            let stroke = stroke_attrs(&arrow.color, arrow.line_width, arrow.line_dash);
            let _ = write!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke-linecap=\"round\"{stroke} />",
                arrow.x1, arrow.y1, arrow.x2, arrow.y2
            );
            // Heads are always solid.
            let [left, right] = arrow_head(arrow.x1, arrow.y1, arrow.x2, arrow.y2, arrow.line_width);
            let _ = write!(
                out,
                "<path d=\"M {} {} L {} {} L {} {}\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\"{} />",
                left.x,
                left.y,
                arrow.x2,
                arrow.y2,
                right.x,
                right.y,
                stroke_attrs(&arrow.color, arrow.line_width, None)
            );
        }
        Shape::Text(note) => {
            let anchor = match note.text_align {
                TextAlign::Left => "start",
                TextAlign::Center => "middle",
                TextAlign::Right => "end",
            };
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{}\" fill=\"{}\" font-family=\"{}\" font-size=\"{}\" text-anchor=\"{anchor}\" dominant-baseline=\"hanging\" xml:space=\"preserve\">",
                note.x,
                note.y,
                escape(&note.color),
                escape(&note.font_family),
                note.font_size
            );
            let line_height = note.font_size * TEXT_LINE_HEIGHT;
            for (index, line) in note.lines().enumerate() {
                let _ = write!(
                    out,
                    "<tspan x=\"{}\" y=\"{}\">{}</tspan>",
                    note.x,
                    note.y + index as f64 * line_height,
                    escape(line)
                );
            }
            out.push_str("</text>");
        }
    }
}

fn stroke_attrs(color: &str, line_width: f64, dash: Option<[f64; 2]>) -> String {
    let mut attrs = format!(
        " stroke=\"{}\" stroke-width=\"{}\"",
        escape(color),
        line_width
    );
    if let Some([on, off]) = dash {
        let _ = write!(attrs, " stroke-dasharray=\"{on} {off}\"");
    }
    attrs
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationId, ArrowShape, RectShape, TextNote};

    fn viewport() -> ViewportMeta {
        ViewportMeta {
            width: 800.0,
            height: 600.0,
            scroll_x: 0.0,
            scroll_y: 300.0,
        }
    }

    #[test]
    fn view_box_follows_scroll() {
        let svg = render_svg(&[], &viewport());
        assert!(svg.contains("viewBox=\"0 300 800 600\""));
    }

    #[test]
    fn dashed_rect_and_arrow_are_drawn() {
        let scene = vec![
            Annotation {
                id: AnnotationId(1),
                shape: Shape::Rect(RectShape {
                    x: 10.0,
                    y: 320.0,
                    width: 100.0,
                    height: 50.0,
                    color: "red".into(),
                    line_width: 2.0,
                    line_dash: Some([6.0, 4.0]),
                }),
            },
            Annotation {
                id: AnnotationId(2),
                shape: Shape::Arrow(ArrowShape {
                    x1: 0.0,
                    y1: 400.0,
                    x2: 100.0,
                    y2: 400.0,
                    color: "blue".into(),
                    line_width: 3.0,
                    line_dash: None,
                }),
            },
        ];
        let svg = render_svg(&scene, &viewport());
        assert!(svg.contains("<rect x=\"10\" y=\"320\" width=\"100\" height=\"50\""));
        assert!(svg.contains("stroke-dasharray=\"6 4\""));
        assert!(svg.contains("<line x1=\"0\" y1=\"400\" x2=\"100\" y2=\"400\""));
        assert_eq!(svg.matches("<path").count(), 1);
    }

    #[test]
    fn text_is_escaped_and_split_into_lines() {
        let scene = vec![Annotation {
            id: AnnotationId(1),
            shape: Shape::Text(TextNote {
                x: 20.0,
                y: 310.0,
                text: "a < b\n\"quoted\" & done".into(),
                color: "#000".into(),
                font_family: "serif".into(),
                font_size: 10.0,
                text_align: TextAlign::Center,
            }),
        }];
        let svg = render_svg(&scene, &viewport());
        assert!(svg.contains("text-anchor=\"middle\""));
        assert!(svg.contains("<tspan x=\"20\" y=\"310\">a &lt; b</tspan>"));
        let second = format!(
            "<tspan x=\"20\" y=\"{}\">&quot;quoted&quot; &amp; done</tspan>",
            310.0 + 10.0 * TEXT_LINE_HEIGHT
        );
        assert!(svg.contains(&second));
    }
}
