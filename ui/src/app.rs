use crate::theme::GLOBAL_CSS;
use chart_frontend::RenderOutcome;
use emissions_core::GLOBAL;
use leptos::*;
use leptos_meta::*;
use story_shell::{default_scenes, NavState, SceneView, StoryConfig};

#[cfg(target_arch = "wasm32")]
use crate::canvas::StoryHandle;
#[cfg(target_arch = "wasm32")]
use emissions_core::Selection;
#[cfg(target_arch = "wasm32")]
use gloo_net::http::Request;
#[cfg(target_arch = "wasm32")]
use gloo_timers::future::TimeoutFuture;
#[cfg(target_arch = "wasm32")]
use js_sys::Reflect;
#[cfg(target_arch = "wasm32")]
use story_shell::Story;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::spawn_local;

pub const CANVAS_ID: &str = "chart";
/// Global read for the dataset location.
pub const DATASET_URL_KEY: &str = "STORY_DATASET_URL";

#[cfg(target_arch = "wasm32")]
type HandleSignal = RwSignal<Option<StoryHandle>>;
#[cfg(not(target_arch = "wasm32"))]
type HandleSignal = ();

#[cfg(target_arch = "wasm32")]
pub(crate) fn read_global(key: &str) -> Option<String> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}

pub fn story_config() -> StoryConfig {
    let mut config = StoryConfig::default();
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(url) = read_global(DATASET_URL_KEY) {
            config.dataset_url = url;
        }
    }
    config
}

#[cfg(target_arch = "wasm32")]
fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(target_arch = "wasm32")]
async fn load_story(config: &StoryConfig) -> Result<StoryHandle, JsValue> {
    let resp = Request::get(&config.dataset_url)
        .send()
        .await
        .map_err(js_err)?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!(
            "failed to fetch {}: HTTP {}",
            config.dataset_url,
            resp.status()
        )));
    }
    let text = resp.text().await.map_err(js_err)?;
    let story = Story::from_csv(&text, config).map_err(js_err)?;
    StoryHandle::mount(CANVAS_ID, story)
}

/// Reactive copies of what the current scene puts on the page.
#[derive(Clone, Copy)]
struct PageSignals {
    title: RwSignal<String>,
    description: RwSignal<String>,
    selected: RwSignal<String>,
    nav: RwSignal<NavState>,
}

impl PageSignals {
    fn new() -> Self {
        let (title, description) = default_scenes()
            .into_iter()
            .next()
            .map(|s| (s.title, s.description))
            .unwrap_or_default();
        Self {
            title: create_rw_signal(title),
            description: create_rw_signal(description),
            selected: create_rw_signal(GLOBAL.to_string()),
            nav: create_rw_signal(NavState {
                prev_visible: false,
                next_visible: false,
            }),
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    fn apply(&self, view: &SceneView) {
        self.title.set(view.title.clone());
        self.description.set(view.description.clone());
        self.selected.set(view.selection.name().to_string());
        self.nav.set(view.nav);
    }
}

/// Selector value and notice after a dropdown change. A skipped render keeps the
/// previous chart, so the selector goes back to what is shown.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn selector_after(outcome: RenderOutcome, requested: &str, shown: &str) -> (String, Option<String>) {
    match outcome {
        RenderOutcome::Rendered { .. } => (requested.to_string(), None),
        RenderOutcome::SkippedEmpty => (
            shown.to_string(),
            Some(format!("No emissions data to chart for {requested}.")),
        ),
    }
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    let page = PageSignals::new();
    let options = create_rw_signal(vec![GLOBAL.to_string()]);
    let status = create_rw_signal(Some(String::from("Loading emissions data…")));

    #[cfg(target_arch = "wasm32")]
    let handle: HandleSignal = create_rw_signal(None);
    #[cfg(not(target_arch = "wasm32"))]
    let _handle: HandleSignal = ();

    #[cfg(target_arch = "wasm32")]
    {
        let config = story_config();
        spawn_local(async move {
            // let the canvas mount first
            TimeoutFuture::new(0).await;
            match load_story(&config).await {
                Ok(h) => {
                    options.set(h.entity_options());
                    page.apply(&h.start());
                    handle.set(Some(h));
                    status.set(None);
                }
                Err(err) => {
                    web_sys::console::error_1(&err);
                    let msg = err
                        .as_string()
                        .unwrap_or_else(|| "failed to load emissions data".to_string());
                    tracing::error!(%msg, url = %config.dataset_url, "story load failed");
                    status.set(Some(msg));
                }
            }
        });
    }

    let on_change = move |ev: ev::Event| {
        let value = event_target_value(&ev);
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(h) = handle.get_untracked() {
                let outcome = h.select(Selection::from_name(value.clone()));
                let (shown, notice) = selector_after(outcome, &value, &h.shown_selection());
                page.selected.set(shown);
                status.set(notice);
                return;
            }
        }
        page.selected.set(value);
    };

    let on_prev = move |_| {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(view) = handle.get_untracked().and_then(|h| h.retreat()) {
                page.apply(&view);
            }
        }
    };

    let on_next = move |_| {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(view) = handle.get_untracked().and_then(|h| h.advance()) {
                page.apply(&view);
            }
        }
    };

    let layout = StoryConfig::default().layout;

    view! {
        <Style>{GLOBAL_CSS}</Style>
        <main class="story">
            <h1>{move || page.title.get()}</h1>
            <p id="description">{move || page.description.get()}</p>
            <div class="controls">
                <label for="country-select">"Country"</label>
                <select
                    id="country-select"
                    on:change=on_change
                    prop:value=move || page.selected.get()
                >
                    <For
                        each=move || options.get()
                        key=|name| name.clone()
                        children=move |name| {
                            let value = name.clone();
                            view! { <option value=value>{name}</option> }
                        }
                    />
                </select>
            </div>
            <canvas id=CANVAS_ID width=layout.width height=layout.height></canvas>
            <div class="nav">
                <button
                    id="prevButton"
                    style:display=move || NavState::display(page.nav.get().prev_visible)
                    on:click=on_prev
                >
                    "Previous"
                </button>
                <button
                    id="nextButton"
                    style:display=move || NavState::display(page.nav.get().next_visible)
                    on:click=on_next
                >
                    "Next"
                </button>
            </div>
            {move || status.get().map(|msg| view! { <p class="status">{msg}</p> })}
        </main>
    }
}
