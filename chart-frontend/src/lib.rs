//! Line chart of an emissions series: scales, ticks, transitions, hover and
//! callout overlays, drawn through a [`RendererBackend`].
//!
//! [`ChartRenderer`] holds the display state. It never touches the DOM; the
//! browser wiring hands it timestamps and pointer positions and paints the
//! frames it returns.

use emissions_core::{derive_series, Dataset, SeriesPoint, Selection};
use tracing::{debug, warn};

pub mod backend;
pub mod frame;
pub mod scale;

#[cfg(target_arch = "wasm32")]
pub use backend::CanvasBackend;
pub use backend::{RendererBackend, SvgBackend, TextAnchor, TextMark};
pub use frame::{paint, Callout, CalloutMark, ChartFrame, ChartLayout, Marker, Margin, Tick, TooltipMark};
pub use scale::{ticks, LinearScale, Tween};

/// Redraw transition for axes, line and markers.
pub const TRANSITION_MS: f64 = 1000.0;
pub const TOOLTIP_FADE_IN_MS: f64 = 200.0;
pub const TOOLTIP_FADE_OUT_MS: f64 = 500.0;
pub const TOOLTIP_OPACITY: f64 = 0.9;
/// Extra pick radius around markers, in pixels.
pub const HOVER_SLACK_PX: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered { points: usize },
    /// The series was empty; the previous frame stays on screen.
    SkippedEmpty,
}

#[derive(Debug, Clone, Copy)]
struct ScaleTransition {
    from: (LinearScale, LinearScale),
    start_ms: f64,
    duration_ms: f64,
}

#[derive(Debug, Clone)]
struct TooltipState {
    left: f64,
    top: f64,
    lines: [String; 2],
    fade: Tween,
}

pub struct ChartRenderer {
    layout: ChartLayout,
    transition_ms: f64,
    selection: Option<Selection>,
    series: Vec<SeriesPoint>,
    target: Option<ChartFrame>,
    transition: Option<ScaleTransition>,
    callout: Option<Callout>,
    tooltip: Option<TooltipState>,
    hovered: Option<SeriesPoint>,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(ChartLayout::default())
    }
}

impl ChartRenderer {
    pub fn new(layout: ChartLayout) -> Self {
        Self {
            layout,
            transition_ms: TRANSITION_MS,
            selection: None,
            series: Vec::new(),
            target: None,
            transition: None,
            callout: None,
            tooltip: None,
            hovered: None,
        }
    }

    pub fn with_transition_ms(mut self, ms: f64) -> Self {
        self.transition_ms = ms.max(0.0);
        self
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    /// Selection of the frame currently on screen.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn series(&self) -> &[SeriesPoint] {
        &self.series
    }

    /// Final (post-transition) frame, without overlays.
    pub fn target_frame(&self) -> Option<&ChartFrame> {
        self.target.as_ref()
    }

    /// Re-derive the series for `selection` and start a transition towards it.
    pub fn render(&mut self, dataset: &Dataset, selection: &Selection, now_ms: f64) -> RenderOutcome {
        let series = derive_series(dataset, selection);
        self.render_series(selection.clone(), series, now_ms)
    }

    pub fn render_series(
        &mut self,
        selection: Selection,
        series: Vec<SeriesPoint>,
        now_ms: f64,
    ) -> RenderOutcome {
        let Some(next) = ChartFrame::build(&series, &self.layout) else {
            warn!(selection = %selection, "no points above threshold; keeping previous chart");
            return RenderOutcome::SkippedEmpty;
        };
        self.transition = self.current_scales(now_ms).map(|from| ScaleTransition {
            from,
            start_ms: now_ms,
            duration_ms: self.transition_ms,
        });
        debug!(
            selection = %selection,
            points = series.len(),
            x_domain = ?next.x.domain,
            y_domain = ?next.y.domain,
            "chart render"
        );
        let points = series.len();
        // the hovered marker belongs to the old series
        self.unhover(now_ms);
        self.target = Some(next);
        self.series = series;
        self.selection = Some(selection);
        RenderOutcome::Rendered { points }
    }

    /// Scales as displayed at `now_ms`, mid-transition if one is running.
    pub fn current_scales(&self, now_ms: f64) -> Option<(LinearScale, LinearScale)> {
        let target = self.target.as_ref()?;
        match &self.transition {
            Some(tr) => {
                let t = Tween {
                    from: 0.0,
                    to: 1.0,
                    start_ms: tr.start_ms,
                    duration_ms: tr.duration_ms,
                }
                .value(now_ms);
                Some((tr.from.0.lerp(&target.x, t), tr.from.1.lerp(&target.y, t)))
            }
            None => Some((target.x, target.y)),
        }
    }

    /// True while a redraw transition or tooltip fade is still in flight.
    pub fn is_animating(&self, now_ms: f64) -> bool {
        let moving = self
            .transition
            .map(|tr| now_ms - tr.start_ms < tr.duration_ms)
            .unwrap_or(false);
        let fading = self
            .tooltip
            .as_ref()
            .map(|t| !t.fade.is_done(now_ms))
            .unwrap_or(false);
        moving || fading
    }

    /// Pin a callout to an observation, or clear it with `None`.
    pub fn set_callout(&mut self, callout: Option<Callout>) {
        self.callout = callout;
    }

    pub fn callout(&self) -> Option<&Callout> {
        self.callout.as_ref()
    }

    /// The callout resolved against the final scales.
    pub fn callout_mark(&self) -> Option<CalloutMark> {
        let target = self.target.as_ref()?;
        self.callout
            .as_ref()
            .map(|c| CalloutMark::place(c, &target.x, &target.y))
    }

    /// Frame to paint at `now_ms`: the series through the tweened scales plus overlays.
    pub fn frame(&self, now_ms: f64) -> Option<ChartFrame> {
        let (x, y) = self.current_scales(now_ms)?;
        let mut frame = ChartFrame::project(&self.series, x, y, &self.layout);
        frame.callout = self.callout_mark();
        frame.tooltip = self.tooltip.as_ref().map(|t| TooltipMark {
            left: t.left,
            top: t.top,
            opacity: t.fade.value(now_ms),
            lines: t.lines.clone(),
        });
        Some(frame)
    }

    /// Pointer moved to canvas position `(x, y)`. Shows the tooltip over a marker.
    pub fn hover(&mut self, x: f64, y: f64, now_ms: f64) -> Option<SeriesPoint> {
        let hit = self
            .target
            .as_ref()
            .and_then(|f| f.hit_test(x, y, HOVER_SLACK_PX))
            .map(|m| m.point);
        match hit {
            Some(point) => {
                if self.hovered != Some(point) {
                    let from = self.tooltip_opacity(now_ms);
                    self.tooltip = Some(TooltipState {
                        left: x + TooltipMark::OFFSET_X,
                        top: y + TooltipMark::OFFSET_Y,
                        lines: TooltipMark::lines_for(&point),
                        fade: Tween {
                            from,
                            to: TOOLTIP_OPACITY,
                            start_ms: now_ms,
                            duration_ms: TOOLTIP_FADE_IN_MS,
                        },
                    });
                    self.hovered = Some(point);
                }
                Some(point)
            }
            None => {
                self.unhover(now_ms);
                None
            }
        }
    }

    /// Pointer left the markers: fade the tooltip out, keeping its last text.
    pub fn unhover(&mut self, now_ms: f64) {
        if self.hovered.take().is_none() {
            return;
        }
        let from = self.tooltip_opacity(now_ms);
        if let Some(t) = self.tooltip.as_mut() {
            t.fade = Tween {
                from,
                to: 0.0,
                start_ms: now_ms,
                duration_ms: TOOLTIP_FADE_OUT_MS,
            };
        }
    }

    pub fn tooltip_opacity(&self, now_ms: f64) -> f64 {
        self.tooltip
            .as_ref()
            .map(|t| t.fade.value(now_ms))
            .unwrap_or(0.0)
    }

    /// Paint the frame for `now_ms`. Returns false when nothing has been rendered yet.
    pub fn paint_to(&self, backend: &mut dyn RendererBackend, now_ms: f64) -> bool {
        match self.frame(now_ms) {
            Some(frame) => {
                paint(&frame, backend);
                true
            }
            None => false,
        }
    }
}
