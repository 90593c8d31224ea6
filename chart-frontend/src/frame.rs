use emissions_core::{format_millions, Domains, SeriesPoint, Year};
use serde::{Deserialize, Serialize};

use crate::backend::{RendererBackend, TextAnchor, TextMark};
use crate::scale::LinearScale;

/// Axis tick count requested from the scales (d3's axis default).
pub const TICK_COUNT: usize = 10;
const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;
const FONT_PX: f64 = 10.0;
const LABEL_FONT_PX: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Fixed geometry and styling of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub x_label: String,
    pub y_label: String,
    pub background: String,
    pub line_color: String,
    pub line_width: f32,
    pub marker_radius: f64,
    pub axis_color: String,
    pub text_color: String,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 400.0,
            margin: Margin {
                top: 50.0,
                right: 50.0,
                bottom: 50.0,
                left: 70.0,
            },
            x_label: "Year".to_string(),
            y_label: "Annual CO₂ emissions (million tonnes)".to_string(),
            background: "#ffffff".to_string(),
            line_color: "steelblue".to_string(),
            line_width: 2.0,
            marker_radius: 4.0,
            axis_color: "#000000".to_string(),
            text_color: "#000000".to_string(),
        }
    }
}

impl ChartLayout {
    pub fn inner_width(&self) -> f64 {
        (self.width - self.margin.left - self.margin.right).max(1.0)
    }

    pub fn inner_height(&self) -> f64 {
        (self.height - self.margin.top - self.margin.bottom).max(1.0)
    }

    /// Scales for `domains` over the plot area (y grows upwards).
    pub fn scales(&self, domains: &Domains) -> (LinearScale, LinearScale) {
        let x = LinearScale::new(
            (domains.years.min as f64, domains.years.max as f64),
            (0.0, self.inner_width()),
        );
        let y = LinearScale::new(
            (domains.emissions.min, domains.emissions.max),
            (self.inner_height(), 0.0),
        );
        (x, y)
    }

    /// Canvas coordinates to plot-area coordinates.
    pub fn to_plot(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.margin.left, y - self.margin.top)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub pos: f64,
    pub label: String,
}

/// A point marker in plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub point: SeriesPoint,
    pub x: f64,
    pub y: f64,
}

/// An annotation pinned to one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub year: Year,
    pub emissions: f64,
    pub title: String,
    pub label: String,
}

/// A callout resolved to plot coordinates; the note sits at `(x + dx, y + dy)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalloutMark {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub title: String,
    pub label: String,
}

impl CalloutMark {
    pub const DX: f64 = 0.0;
    pub const DY: f64 = -30.0;

    pub fn place(callout: &Callout, x: &LinearScale, y: &LinearScale) -> Self {
        Self {
            x: x.map(callout.year as f64),
            y: y.map(callout.emissions),
            dx: Self::DX,
            dy: Self::DY,
            title: callout.title.clone(),
            label: callout.label.clone(),
        }
    }
}

/// Hover tooltip in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipMark {
    pub left: f64,
    pub top: f64,
    pub opacity: f64,
    pub lines: [String; 2],
}

impl TooltipMark {
    pub const OFFSET_X: f64 = 10.0;
    pub const OFFSET_Y: f64 = -28.0;

    pub fn lines_for(point: &SeriesPoint) -> [String; 2] {
        [
            format!("Year: {}", point.year),
            format!("Emissions: {} million tonnes", format_millions(point.emissions)),
        ]
    }
}

/// Everything needed to draw one chart state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFrame {
    pub layout: ChartLayout,
    pub x: LinearScale,
    pub y: LinearScale,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub line: Vec<(f64, f64)>,
    pub markers: Vec<Marker>,
    pub callout: Option<CalloutMark>,
    pub tooltip: Option<TooltipMark>,
}

/// Integer years, as d3's `format("d")`.
pub fn format_year_tick(v: f64) -> String {
    format!("{}", v.round() as i64)
}

/// Emission ticks in millions of tonnes; shortest float text, like JS number printing.
pub fn format_emissions_tick(v: f64) -> String {
    let m = v / 1e6;
    if m == 0.0 {
        "0".to_string()
    } else {
        format!("{m}")
    }
}

impl ChartFrame {
    /// Frame with scales fitted to `series`; `None` when there is nothing to fit.
    pub fn build(series: &[SeriesPoint], layout: &ChartLayout) -> Option<Self> {
        let domains = Domains::of(series)?;
        let (x, y) = layout.scales(&domains);
        Some(Self::project(series, x, y, layout))
    }

    /// Frame for `series` drawn through the given scales.
    pub fn project(series: &[SeriesPoint], x: LinearScale, y: LinearScale, layout: &ChartLayout) -> Self {
        let x_ticks = x
            .ticks(TICK_COUNT)
            .into_iter()
            .map(|v| Tick {
                value: v,
                pos: x.map(v),
                label: format_year_tick(v),
            })
            .collect();
        let y_ticks = y
            .ticks(TICK_COUNT)
            .into_iter()
            .map(|v| Tick {
                value: v,
                pos: y.map(v),
                label: format_emissions_tick(v),
            })
            .collect();
        let markers: Vec<Marker> = series
            .iter()
            .map(|p| Marker {
                point: *p,
                x: x.map(p.year as f64),
                y: y.map(p.emissions),
            })
            .collect();
        let line = markers.iter().map(|m| (m.x, m.y)).collect();
        Self {
            layout: layout.clone(),
            x,
            y,
            x_ticks,
            y_ticks,
            line,
            markers,
            callout: None,
            tooltip: None,
        }
    }

    /// Marker under a canvas-space pointer, within its radius plus `slack` pixels.
    pub fn hit_test(&self, canvas_x: f64, canvas_y: f64, slack: f64) -> Option<&Marker> {
        let (px, py) = self.layout.to_plot(canvas_x, canvas_y);
        let reach = self.layout.marker_radius + slack;
        self.markers
            .iter()
            .map(|m| (m, (m.x - px).hypot(m.y - py)))
            .filter(|(_, d)| *d <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(m, _)| m)
    }
}

/// Draw `frame` onto `backend`: axes, line, markers, then overlays.
pub fn paint(frame: &ChartFrame, backend: &mut dyn RendererBackend) {
    let layout = &frame.layout;
    let ox = layout.margin.left;
    let oy = layout.margin.top;
    let w = layout.inner_width();
    let h = layout.inner_height();

    backend.begin_frame(layout.width, layout.height, &layout.background);

    // Axes: domain lines plus outward ticks.
    let mut segments = vec![(ox, oy + h, ox + w, oy + h), (ox, oy, ox, oy + h)];
    for t in &frame.x_ticks {
        segments.push((ox + t.pos, oy + h, ox + t.pos, oy + h + TICK_SIZE));
    }
    for t in &frame.y_ticks {
        segments.push((ox - TICK_SIZE, oy + t.pos, ox, oy + t.pos));
    }
    backend.draw_segments(&segments, &layout.axis_color, 1.0);

    for t in &frame.x_ticks {
        backend.draw_text(&TextMark {
            x: ox + t.pos,
            y: oy + h + TICK_SIZE + TICK_PADDING + FONT_PX,
            text: &t.label,
            anchor: TextAnchor::Middle,
            rotation_deg: 0.0,
            color: &layout.text_color,
            size_px: FONT_PX,
        });
    }
    for t in &frame.y_ticks {
        backend.draw_text(&TextMark {
            x: ox - TICK_SIZE - TICK_PADDING,
            y: oy + t.pos + FONT_PX * 0.32,
            text: &t.label,
            anchor: TextAnchor::End,
            rotation_deg: 0.0,
            color: &layout.text_color,
            size_px: FONT_PX,
        });
    }

    backend.draw_text(&TextMark {
        x: ox + w / 2.0,
        y: oy + h + layout.margin.bottom - 10.0,
        text: &layout.x_label,
        anchor: TextAnchor::Middle,
        rotation_deg: 0.0,
        color: &layout.text_color,
        size_px: LABEL_FONT_PX,
    });
    // Rotated -90°: the label's baseline runs bottom-to-top left of the axis.
    backend.draw_text(&TextMark {
        x: ox - layout.margin.left + 20.0,
        y: oy + h / 2.0,
        text: &layout.y_label,
        anchor: TextAnchor::Middle,
        rotation_deg: -90.0,
        color: &layout.text_color,
        size_px: LABEL_FONT_PX,
    });

    let line: Vec<(f64, f64)> = frame.line.iter().map(|(x, y)| (ox + x, oy + y)).collect();
    backend.draw_polyline(&line, &layout.line_color, layout.line_width);

    let centers: Vec<(f64, f64)> = frame.markers.iter().map(|m| (ox + m.x, oy + m.y)).collect();
    backend.draw_circles(&centers, layout.marker_radius, &layout.line_color);

    if let Some(c) = &frame.callout {
        let (ax, ay) = (ox + c.x, oy + c.y);
        let (nx, ny) = (ax + c.dx, ay + c.dy);
        let note_w = (c.title.len().max(c.label.len()) as f64) * 6.5 + 8.0;
        backend.draw_segments(
            &[(ax, ay, nx, ny), (nx, ny, nx + note_w, ny)],
            &layout.text_color,
            1.0,
        );
        backend.draw_text(&TextMark {
            x: nx,
            y: ny - 18.0,
            text: &c.title,
            anchor: TextAnchor::Start,
            rotation_deg: 0.0,
            color: &layout.text_color,
            size_px: LABEL_FONT_PX,
        });
        backend.draw_text(&TextMark {
            x: nx,
            y: ny - 4.0,
            text: &c.label,
            anchor: TextAnchor::Start,
            rotation_deg: 0.0,
            color: &layout.text_color,
            size_px: LABEL_FONT_PX,
        });
    }

    if let Some(tip) = frame.tooltip.as_ref().filter(|t| t.opacity > 0.0) {
        let box_w = tip.lines.iter().map(|l| l.len()).max().unwrap_or(0) as f64 * 6.5 + 12.0;
        let alpha = tip.opacity.clamp(0.0, 1.0);
        backend.fill_rect(
            tip.left,
            tip.top,
            box_w,
            2.0 * LABEL_FONT_PX + 12.0,
            &format!("rgba(176, 196, 222, {alpha:.3})"),
        );
        let text_color = format!("rgba(0, 0, 0, {alpha:.3})");
        for (i, line) in tip.lines.iter().enumerate() {
            backend.draw_text(&TextMark {
                x: tip.left + 6.0,
                y: tip.top + 4.0 + LABEL_FONT_PX * (i as f64 + 1.0),
                text: line,
                anchor: TextAnchor::Start,
                rotation_deg: 0.0,
                color: &text_color,
                size_px: LABEL_FONT_PX,
            });
        }
    }
}
