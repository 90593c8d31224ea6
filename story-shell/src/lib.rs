use chart_frontend::{ChartLayout, ChartRenderer, RenderOutcome, TRANSITION_MS};
use emissions_core::{Dataset, DatasetError, RowPolicy, SeriesPoint, Selection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod controller;
pub mod scene;

pub use controller::{NavState, SceneController, SceneView, StoryState};
pub use scene::{default_scenes, Annotation, Scene, SceneDeck, SceneError};

pub const DEFAULT_DATASET_URL: &str = "annual-co2-emissions-per-country.csv";

/// Start-up settings for the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    pub dataset_url: String,
    pub row_policy: RowPolicy,
    pub transition_ms: f64,
    pub layout: ChartLayout,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            row_policy: RowPolicy::default(),
            transition_ms: TRANSITION_MS,
            layout: ChartLayout::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Result of a scene transition: what to show, and how the chart took it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUpdate {
    pub view: SceneView,
    pub outcome: RenderOutcome,
}

/// Application state: the dataset, the tour cursor and the chart.
///
/// Built once at start-up and handed to every event handler.
pub struct Story {
    dataset: Dataset,
    controller: SceneController,
    chart: ChartRenderer,
}

impl Story {
    pub fn new(
        dataset: Dataset,
        scenes: Vec<Scene>,
        config: &StoryConfig,
    ) -> Result<Self, SceneError> {
        let deck = SceneDeck::new(scenes, &dataset)?;
        info!(
            scenes = deck.len(),
            observations = dataset.len(),
            "story ready"
        );
        let chart =
            ChartRenderer::new(config.layout.clone()).with_transition_ms(config.transition_ms);
        Ok(Self {
            dataset,
            controller: SceneController::new(deck),
            chart,
        })
    }

    /// Parse `csv` with the configured row policy and attach the default scenes.
    pub fn from_csv(csv: &str, config: &StoryConfig) -> Result<Self, StoryError> {
        let dataset = Dataset::from_csv_str(csv, config.row_policy)?;
        Ok(Self::new(dataset, default_scenes(), config)?)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn controller(&self) -> &SceneController {
        &self.controller
    }

    pub fn chart(&self) -> &ChartRenderer {
        &self.chart
    }

    /// Selector options: `"Global"` then every entity.
    pub fn entity_options(&self) -> Vec<String> {
        self.dataset.entity_options()
    }

    pub fn start(&mut self, now_ms: f64) -> SceneUpdate {
        let view = self.controller.start();
        self.show(view, now_ms)
    }

    pub fn advance(&mut self, now_ms: f64) -> Option<SceneUpdate> {
        let view = self.controller.advance()?;
        Some(self.show(view, now_ms))
    }

    pub fn retreat(&mut self, now_ms: f64) -> Option<SceneUpdate> {
        let view = self.controller.retreat()?;
        Some(self.show(view, now_ms))
    }

    /// Dropdown change: redraw for `selection` without moving the tour.
    ///
    /// The scene's callout stays only while the chart shows that scene's entity.
    pub fn select(&mut self, selection: Selection, now_ms: f64) -> RenderOutcome {
        let outcome = self.chart.render(&self.dataset, &selection, now_ms);
        if outcome == RenderOutcome::SkippedEmpty {
            return outcome;
        }
        self.controller.select(selection);
        let callout = self.controller.view().callout;
        self.chart.set_callout(callout);
        outcome
    }

    pub fn hover(&mut self, x: f64, y: f64, now_ms: f64) -> Option<SeriesPoint> {
        self.chart.hover(x, y, now_ms)
    }

    pub fn unhover(&mut self, now_ms: f64) {
        self.chart.unhover(now_ms);
    }

    pub fn state(&self) -> StoryState {
        self.controller.state()
    }

    pub fn restore(&mut self, state: StoryState, now_ms: f64) -> SceneUpdate {
        let view = self.controller.restore(state);
        self.show(view, now_ms)
    }

    fn show(&mut self, view: SceneView, now_ms: f64) -> SceneUpdate {
        let outcome = self.chart.render(&self.dataset, &view.selection, now_ms);
        let callout = match outcome {
            RenderOutcome::Rendered { .. } => view.callout.clone(),
            RenderOutcome::SkippedEmpty => None,
        };
        self.chart.set_callout(callout);
        SceneUpdate { view, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CSV: &str = "\
Entity,Code,Year,Annual CO₂ emissions
United Kingdom,GBR,1850,196896000
United Kingdom,GBR,1851,198800000
France,FRA,1850,26000000
United States,USA,1950,2536000000
China,CHN,2000,3649000000
Tuvalu,TUV,1990,0
";

    fn story() -> Story {
        Story::from_csv(CSV, &StoryConfig::default()).unwrap()
    }

    #[test]
    fn global_scene_sums_first_year() {
        let mut s = story();
        let update = s.start(0.0);
        assert_eq!(update.view.selection, Selection::Global);
        assert!(matches!(update.outcome, RenderOutcome::Rendered { .. }));
        let first = s.chart().series()[0];
        assert_eq!(first.year, 1850);
        assert_relative_eq!(first.emissions, 196_896_000.0 + 26_000_000.0);
        assert!(s.chart().callout().is_none());
    }

    #[test]
    fn advance_to_uk_pins_one_callout_on_1850() {
        let mut s = story();
        s.start(0.0);
        let update = s.advance(10.0).unwrap();
        assert_eq!(update.view.selection, Selection::from_name("United Kingdom"));
        assert_eq!(s.chart().selection(), Some(&Selection::from_name("United Kingdom")));

        let frame = s.chart().frame(5_000.0).unwrap();
        let mark = frame.callout.expect("callout");
        let point = frame
            .markers
            .iter()
            .find(|m| m.point.year == 1850)
            .unwrap();
        assert_relative_eq!(mark.x, point.x);
        assert_relative_eq!(mark.y, point.y);

        let mut svg = chart_frontend::SvgBackend::new();
        assert!(s.chart().paint_to(&mut svg, 5_000.0));
        assert_eq!(svg.finish().matches(">Start of rapid increase</text>").count(), 1);
    }

    #[test]
    fn retreat_to_global_clears_callout() {
        let mut s = story();
        s.start(0.0);
        s.advance(0.0);
        assert!(s.chart().callout().is_some());
        s.retreat(0.0).unwrap();
        assert!(s.chart().callout().is_none());
        assert!(s.retreat(0.0).is_none());
    }

    #[test]
    fn dropdown_bypasses_cursor() {
        let mut s = story();
        s.start(0.0);
        s.advance(0.0);
        let outcome = s.select(Selection::from_name("France"), 0.0);
        assert_eq!(outcome, RenderOutcome::Rendered { points: 1 });
        assert_eq!(s.state().cursor, 1);
        assert_eq!(s.controller().view().title, "Industrial Revolution Impact");
        assert!(s.chart().callout().is_none());
    }

    #[test]
    fn dropdown_to_empty_entity_keeps_chart() {
        let mut s = story();
        s.start(0.0);
        let outcome = s.select(Selection::from_name("Tuvalu"), 0.0);
        assert_eq!(outcome, RenderOutcome::SkippedEmpty);
        assert_eq!(s.state().selection, Selection::Global);
        assert_eq!(s.chart().selection(), Some(&Selection::Global));
    }

    #[test]
    fn restore_replays_snapshot_onto_chart() {
        let mut s = story();
        s.start(0.0);
        s.advance(0.0);
        s.advance(0.0);
        let saved = s.state();

        let mut fresh = story();
        fresh.start(0.0);
        let update = fresh.restore(saved, 0.0);
        assert_eq!(update.view.index, 2);
        assert_eq!(update.view.title, "Post-World War II Economic Boom");
        assert_eq!(update.outcome, RenderOutcome::Rendered { points: 1 });
        assert_eq!(
            fresh.chart().selection(),
            Some(&Selection::from_name("United States"))
        );
        assert_eq!(fresh.chart().callout().unwrap().label, "Post-war boom");
    }

    #[test]
    fn missing_scene_entity_fails_at_startup() {
        let csv = "Entity,Year,Annual CO₂ emissions\nFrance,1850,26000000\n";
        let err = Story::from_csv(csv, &StoryConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            StoryError::Scene(SceneError::UnknownEntity { index: 1, .. })
        ));
    }

    #[test]
    fn config_defaults() {
        let cfg = StoryConfig::default();
        assert_eq!(cfg.dataset_url, DEFAULT_DATASET_URL);
        assert_eq!(cfg.row_policy, RowPolicy::SkipInvalid);
        assert_relative_eq!(cfg.transition_ms, 1000.0);
        assert_eq!(cfg.layout.width, 700.0);
    }
}
