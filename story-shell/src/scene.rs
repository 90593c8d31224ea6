use chart_frontend::Callout;
use emissions_core::{derive_series, Dataset, Selection, Year};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label pinned to one year of a scene's focal entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub year: Year,
    pub label: String,
}

/// One step of the guided tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub title: String,
    pub description: String,
    pub target: Selection,
    pub annotation: Option<Annotation>,
}

impl Scene {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        target: Selection,
        annotation: Option<Annotation>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            target,
            annotation,
        }
    }
}

fn annotate(year: Year, label: &str) -> Option<Annotation> {
    Some(Annotation {
        year,
        label: label.to_string(),
    })
}

/// The four-step narrative shown on the page.
pub fn default_scenes() -> Vec<Scene> {
    vec![
        Scene::new(
            "Global CO₂ Emissions Over Time",
            "This chart shows the total global CO₂ emissions from 1800 to 2021. Use the dropdown to explore data for individual countries.",
            Selection::Global,
            None,
        ),
        Scene::new(
            "Industrial Revolution Impact",
            "Notice the sharp increase in emissions starting from the mid-19th century, coinciding with the Industrial Revolution.",
            Selection::from_name("United Kingdom"),
            annotate(1850, "Start of rapid increase"),
        ),
        Scene::new(
            "Post-World War II Economic Boom",
            "Observe the accelerated growth in emissions following World War II, reflecting global economic expansion.",
            Selection::from_name("United States"),
            annotate(1950, "Post-war boom"),
        ),
        Scene::new(
            "China's Economic Rise",
            "China's emissions have grown dramatically since the 1990s, reflecting its rapid industrialization and economic growth.",
            Selection::from_name("China"),
            annotate(2000, "Rapid growth phase"),
        ),
    ]
}

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("scene deck is empty")]
    EmptyDeck,
    #[error("scene {index} targets unknown entity {entity:?}")]
    UnknownEntity { index: usize, entity: String },
    #[error("scene {index} targets {entity:?}, which has no points to chart")]
    EmptySeries { index: usize, entity: String },
    #[error("scene {index} annotates the Global aggregate, which has no observation rows")]
    GlobalAnnotation { index: usize },
    #[error("scene {index}: no observation for {entity:?} in {year}")]
    MissingObservation {
        index: usize,
        entity: String,
        year: Year,
    },
    #[error("scene {index}: {entity:?} in {year} is filtered out of the chart")]
    AnnotationNotPlotted {
        index: usize,
        entity: String,
        year: Year,
    },
}

/// Scenes checked against a dataset, with their callouts resolved.
#[derive(Debug, Clone)]
pub struct SceneDeck {
    scenes: Vec<Scene>,
    callouts: Vec<Option<Callout>>,
}

impl SceneDeck {
    /// Validate every scene against `dataset`.
    ///
    /// A scene must chart something, and an annotation must land on an
    /// observation of the scene's entity that survives the chart's filter;
    /// otherwise the deck is rejected here instead of failing the first time
    /// the scene is shown.
    pub fn new(scenes: Vec<Scene>, dataset: &Dataset) -> Result<Self, SceneError> {
        if scenes.is_empty() {
            return Err(SceneError::EmptyDeck);
        }
        let mut callouts = Vec::with_capacity(scenes.len());
        for (index, scene) in scenes.iter().enumerate() {
            if let Selection::Entity(name) = &scene.target {
                if !dataset.has_entity(name) {
                    return Err(SceneError::UnknownEntity {
                        index,
                        entity: name.clone(),
                    });
                }
            }
            let series = derive_series(dataset, &scene.target);
            if series.is_empty() {
                return Err(SceneError::EmptySeries {
                    index,
                    entity: scene.target.name().to_string(),
                });
            }
            let callout = match (&scene.annotation, &scene.target) {
                (None, _) => None,
                (Some(_), Selection::Global) => {
                    return Err(SceneError::GlobalAnnotation { index });
                }
                (Some(a), Selection::Entity(name)) => {
                    let obs = dataset.find(name, a.year).ok_or_else(|| {
                        SceneError::MissingObservation {
                            index,
                            entity: name.clone(),
                            year: a.year,
                        }
                    })?;
                    if !series.iter().any(|p| p.year == a.year) {
                        return Err(SceneError::AnnotationNotPlotted {
                            index,
                            entity: name.clone(),
                            year: a.year,
                        });
                    }
                    Some(Callout {
                        year: a.year,
                        emissions: obs.emissions,
                        title: a.year.to_string(),
                        label: a.label.clone(),
                    })
                }
            };
            callouts.push(callout);
        }
        Ok(Self { scenes, callouts })
    }

    pub fn default_deck(dataset: &Dataset) -> Result<Self, SceneError> {
        Self::new(default_scenes(), dataset)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always false for a validated deck.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.scenes.len() - 1
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn callout(&self, index: usize) -> Option<&Callout> {
        self.callouts.get(index).and_then(|c| c.as_ref())
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }
}
