use chart_frontend::Callout;
use emissions_core::Selection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scene::SceneDeck;

/// Visibility of the previous/next buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavState {
    pub prev_visible: bool,
    pub next_visible: bool,
}

impl NavState {
    pub fn at(cursor: usize, len: usize) -> Self {
        Self {
            prev_visible: cursor > 0,
            next_visible: cursor + 1 < len,
        }
    }

    /// CSS `display` value for a button.
    pub fn display(visible: bool) -> &'static str {
        if visible {
            "inline-block"
        } else {
            "none"
        }
    }
}

/// Everything the page shows for the scene under the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneView {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub selection: Selection,
    pub nav: NavState,
    pub callout: Option<Callout>,
}

/// Serializable snapshot of the tour position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    pub cursor: usize,
    pub selection: Selection,
}

/// Cursor over a [`SceneDeck`]. The cursor only moves through
/// [`advance`](Self::advance) and [`retreat`](Self::retreat), and never leaves
/// `0..deck.len()`.
#[derive(Debug, Clone)]
pub struct SceneController {
    deck: SceneDeck,
    cursor: usize,
    selection: Selection,
}

impl SceneController {
    pub fn new(deck: SceneDeck) -> Self {
        let selection = deck
            .scene(0)
            .map(|s| s.target.clone())
            .unwrap_or_default();
        Self {
            deck,
            cursor: 0,
            selection,
        }
    }

    pub fn deck(&self) -> &SceneDeck {
        &self.deck
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// What the chart currently shows; may differ from the scene target after [`select`](Self::select).
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn nav(&self) -> NavState {
        NavState::at(self.cursor, self.deck.len())
    }

    /// Initial load: show scene 0.
    pub fn start(&mut self) -> SceneView {
        self.cursor = 0;
        self.enter()
    }

    pub fn advance(&mut self) -> Option<SceneView> {
        if self.cursor >= self.deck.last_index() {
            return None;
        }
        self.cursor += 1;
        Some(self.enter())
    }

    pub fn retreat(&mut self) -> Option<SceneView> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.enter())
    }

    /// Dropdown change. The cursor, title and description stay where they are.
    pub fn select(&mut self, selection: Selection) {
        debug!(cursor = self.cursor, selection = %selection, "selection changed");
        self.selection = selection;
    }

    /// Whether the chart shows the current scene's own entity.
    pub fn on_scene_target(&self) -> bool {
        self.deck
            .scene(self.cursor)
            .map(|s| s.target == self.selection)
            .unwrap_or(false)
    }

    pub fn view(&self) -> SceneView {
        let index = self.cursor;
        let (title, description) = self
            .deck
            .scene(index)
            .map(|s| (s.title.clone(), s.description.clone()))
            .unwrap_or_default();
        SceneView {
            index,
            title,
            description,
            selection: self.selection.clone(),
            nav: self.nav(),
            callout: if self.on_scene_target() {
                self.deck.callout(index).cloned()
            } else {
                None
            },
        }
    }

    pub fn state(&self) -> StoryState {
        StoryState {
            cursor: self.cursor,
            selection: self.selection.clone(),
        }
    }

    /// Restore a snapshot; an out-of-range cursor is clamped to the last scene.
    pub fn restore(&mut self, state: StoryState) -> SceneView {
        self.cursor = state.cursor.min(self.deck.last_index());
        self.selection = state.selection;
        self.view()
    }

    fn enter(&mut self) -> SceneView {
        if let Some(scene) = self.deck.scene(self.cursor) {
            self.selection = scene.target.clone();
        }
        debug!(cursor = self.cursor, selection = %self.selection, "scene entered");
        self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{default_scenes, SceneDeck};
    use emissions_core::{Dataset, Observation};

    fn controller() -> SceneController {
        let ds = Dataset::new(vec![
            Observation::new("United Kingdom", 1850, 196_896_000.0),
            Observation::new("United Kingdom", 1851, 198_800_000.0),
            Observation::new("France", 1850, 26_000_000.0),
            Observation::new("United States", 1950, 2_536_000_000.0),
            Observation::new("China", 2000, 3_649_000_000.0),
        ]);
        SceneController::new(SceneDeck::new(default_scenes(), &ds).unwrap())
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut c = controller();
        c.start();
        assert!(c.retreat().is_none());
        assert_eq!(c.cursor(), 0);
        for expected in 1..=3 {
            assert_eq!(c.advance().unwrap().index, expected);
        }
        assert!(c.advance().is_none());
        assert_eq!(c.cursor(), 3);
        for expected in (0..=2).rev() {
            assert_eq!(c.retreat().unwrap().index, expected);
        }
        assert!(c.retreat().is_none());
    }

    #[test]
    fn button_visibility_tracks_cursor() {
        let mut c = controller();
        let view = c.start();
        assert_eq!(
            view.nav,
            NavState {
                prev_visible: false,
                next_visible: true
            }
        );
        c.advance();
        assert_eq!(
            c.nav(),
            NavState {
                prev_visible: true,
                next_visible: true
            }
        );
        c.advance();
        let last = c.advance().unwrap();
        assert_eq!(
            last.nav,
            NavState {
                prev_visible: true,
                next_visible: false
            }
        );
        assert_eq!(NavState::display(last.nav.next_visible), "none");
        assert_eq!(NavState::display(last.nav.prev_visible), "inline-block");
    }

    #[test]
    fn advancing_to_industrial_revolution_scene() {
        let mut c = controller();
        let first = c.start();
        assert_eq!(first.selection, Selection::Global);
        assert!(first.callout.is_none());

        let view = c.advance().unwrap();
        assert_eq!(view.title, "Industrial Revolution Impact");
        assert_eq!(view.selection, Selection::from_name("United Kingdom"));
        let callout = view.callout.unwrap();
        assert_eq!(callout.year, 1850);
        assert_eq!(callout.emissions, 196_896_000.0);
    }

    #[test]
    fn select_keeps_cursor_and_text() {
        let mut c = controller();
        c.start();
        c.advance();
        let before = c.view();
        c.select(Selection::from_name("France"));
        let after = c.view();
        assert_eq!(c.cursor(), 1);
        assert_eq!(after.title, before.title);
        assert_eq!(after.description, before.description);
        assert_eq!(after.selection, Selection::from_name("France"));
        assert!(after.callout.is_none());

        c.select(Selection::from_name("United Kingdom"));
        assert!(c.view().callout.is_some());

        // the next step resets the chart to that scene's entity
        let next = c.advance().unwrap();
        assert_eq!(next.selection, Selection::from_name("United States"));
    }

    #[test]
    fn state_roundtrip_and_clamp() {
        let mut c = controller();
        c.start();
        c.advance();
        let json = serde_json::to_string(&c.state()).unwrap();
        let decoded: StoryState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.cursor, 1);

        let view = c.restore(StoryState {
            cursor: 42,
            selection: Selection::Global,
        });
        assert_eq!(view.index, 3);
        assert_eq!(c.cursor(), 3);
    }
}
