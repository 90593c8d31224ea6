#[cfg(target_arch = "wasm32")]
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    fn svg(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn canvas(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "center",
            TextAnchor::End => "end",
        }
    }
}

/// A run of text anchored at `(x, y)` (baseline), optionally rotated about that point.
#[derive(Debug, Clone, Copy)]
pub struct TextMark<'a> {
    pub x: f64,
    pub y: f64,
    pub text: &'a str,
    pub anchor: TextAnchor,
    pub rotation_deg: f64,
    pub color: &'a str,
    pub size_px: f64,
}

/// Drawing primitives the chart needs. All coordinates are canvas pixels.
pub trait RendererBackend {
    fn begin_frame(&mut self, width: f64, height: f64, clear_color: &str);
    fn draw_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f32);
    fn draw_segments(&mut self, segments: &[(f64, f64, f64, f64)], color: &str, width: f32);
    fn draw_circles(&mut self, centers: &[(f64, f64)], radius: f64, color: &str);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
    fn draw_text(&mut self, mark: &TextMark<'_>);
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders into a standalone SVG document.
#[derive(Debug, Default)]
pub struct SvgBackend {
    width: f64,
    height: f64,
    body: String,
}

impl SvgBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

impl RendererBackend for SvgBackend {
    fn begin_frame(&mut self, width: f64, height: f64, clear_color: &str) {
        self.width = width;
        self.height = height;
        self.body.clear();
        self.body.push_str(&format!(
            "<rect width=\"{width}\" height=\"{height}\" fill=\"{}\"/>\n",
            escape_xml(clear_color)
        ));
    }

    fn draw_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f32) {
        if points.len() < 2 {
            return;
        }
        let d: Vec<String> = points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| format!("{}{x:.2},{y:.2}", if i == 0 { 'M' } else { 'L' }))
            .collect();
        self.body.push_str(&format!(
            "<path class=\"line\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{width}\"/>\n",
            d.join(""),
            escape_xml(color)
        ));
    }

    fn draw_segments(&mut self, segments: &[(f64, f64, f64, f64)], color: &str, width: f32) {
        for (x1, y1, x2, y2) in segments {
            self.body.push_str(&format!(
                "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"{width}\"/>\n",
                escape_xml(color)
            ));
        }
    }

    fn draw_circles(&mut self, centers: &[(f64, f64)], radius: f64, color: &str) {
        for (cx, cy) in centers {
            self.body.push_str(&format!(
                "<circle class=\"dot\" cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{radius}\" fill=\"{}\"/>\n",
                escape_xml(color)
            ));
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.body.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\"/>\n",
            escape_xml(color)
        ));
    }

    fn draw_text(&mut self, mark: &TextMark<'_>) {
        let transform = if mark.rotation_deg != 0.0 {
            format!(
                " transform=\"rotate({} {:.2} {:.2})\"",
                mark.rotation_deg, mark.x, mark.y
            )
        } else {
            String::new()
        };
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{}\" font-size=\"{}\" fill=\"{}\"{transform}>{}</text>\n",
            mark.x,
            mark.y,
            mark.anchor.svg(),
            mark.size_px,
            escape_xml(mark.color),
            escape_xml(mark.text)
        ));
    }
}

#[cfg(target_arch = "wasm32")]
pub struct CanvasBackend {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

#[cfg(target_arch = "wasm32")]
impl CanvasBackend {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self { canvas, ctx }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

#[cfg(target_arch = "wasm32")]
impl RendererBackend for CanvasBackend {
    fn begin_frame(&mut self, width: f64, height: f64, clear_color: &str) {
        if self.canvas.width() != width as u32 {
            self.canvas.set_width(width as u32);
        }
        if self.canvas.height() != height as u32 {
            self.canvas.set_height(height as u32);
        }
        self.ctx.set_fill_style_str(clear_color);
        self.ctx.fill_rect(0.0, 0.0, width, height);
    }

    fn draw_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f32) {
        if points.len() < 2 {
            return;
        }
        let ctx = &self.ctx;
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(width as f64);
        ctx.begin_path();
        ctx.move_to(points[0].0, points[0].1);
        for p in points.iter().skip(1) {
            ctx.line_to(p.0, p.1);
        }
        ctx.stroke();
    }

    fn draw_segments(&mut self, segments: &[(f64, f64, f64, f64)], color: &str, width: f32) {
        if segments.is_empty() {
            return;
        }
        let ctx = &self.ctx;
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(width as f64);
        for (x1, y1, x2, y2) in segments {
            ctx.begin_path();
            ctx.move_to(*x1, *y1);
            ctx.line_to(*x2, *y2);
            ctx.stroke();
        }
    }

    fn draw_circles(&mut self, centers: &[(f64, f64)], radius: f64, color: &str) {
        let ctx = &self.ctx;
        ctx.set_fill_style_str(color);
        for (cx, cy) in centers {
            ctx.begin_path();
            ctx.arc(*cx, *cy, radius, 0.0, std::f64::consts::PI * 2.0).ok();
            ctx.fill();
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(x, y, w, h);
    }

    fn draw_text(&mut self, mark: &TextMark<'_>) {
        let ctx = &self.ctx;
        ctx.set_fill_style_str(mark.color);
        ctx.set_font(&format!("{}px sans-serif", mark.size_px));
        ctx.set_text_align(mark.anchor.canvas());
        if mark.rotation_deg == 0.0 {
            ctx.fill_text(mark.text, mark.x, mark.y).ok();
            return;
        }
        ctx.save();
        ctx.translate(mark.x, mark.y).ok();
        ctx.rotate(mark.rotation_deg.to_radians()).ok();
        ctx.fill_text(mark.text, 0.0, 0.0).ok();
        ctx.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_escapes_text_and_rotates() {
        let mut svg = SvgBackend::new();
        svg.begin_frame(100.0, 50.0, "#fff");
        svg.draw_text(&TextMark {
            x: 10.0,
            y: 20.0,
            text: "A & <B>",
            anchor: TextAnchor::Middle,
            rotation_deg: -90.0,
            color: "#000",
            size_px: 12.0,
        });
        let out = svg.finish();
        assert!(out.starts_with("<svg"));
        assert!(out.contains("A &amp; &lt;B&gt;"));
        assert!(out.contains("rotate(-90 10.00 20.00)"));
        assert!(out.contains("text-anchor=\"middle\""));
    }

    #[test]
    fn svg_skips_degenerate_polyline() {
        let mut svg = SvgBackend::new();
        svg.begin_frame(10.0, 10.0, "#fff");
        svg.draw_polyline(&[(1.0, 1.0)], "steelblue", 2.0);
        assert!(!svg.finish().contains("<path"));
    }
}
