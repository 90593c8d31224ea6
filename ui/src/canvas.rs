//! Browser side of the chart: the canvas, pointer events and the paint loop.

use chart_frontend::{CanvasBackend, RenderOutcome};
use emissions_core::Selection;
use std::cell::RefCell;
use std::rc::Rc;
use story_shell::{SceneUpdate, SceneView, Story};
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent};

struct StoryInner {
    story: Story,
    backend: CanvasBackend,
    dirty: bool,
    animating: bool,
}

/// Owns the story state for the page; clones share it.
#[derive(Clone)]
pub struct StoryHandle {
    inner: Rc<RefCell<StoryInner>>,
}

pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

impl StoryHandle {
    pub fn mount(canvas_id: &str, story: Story) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("canvas #{canvas_id} not found")))?
            .dyn_into::<HtmlCanvasElement>()?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let inner = Rc::new(RefCell::new(StoryInner {
            story,
            backend: CanvasBackend::new(canvas, ctx),
            dirty: true,
            animating: false,
        }));
        setup_pointer_events(&inner)?;
        start_render_loop(inner.clone());
        Ok(Self { inner })
    }

    pub fn entity_options(&self) -> Vec<String> {
        self.inner.borrow().story.entity_options()
    }

    pub fn start(&self) -> SceneView {
        let mut inner = self.inner.borrow_mut();
        let update = inner.story.start(now_ms());
        inner.dirty = true;
        update.view
    }

    pub fn advance(&self) -> Option<SceneView> {
        self.update(|story, now| story.advance(now)).map(|u| u.view)
    }

    pub fn retreat(&self) -> Option<SceneView> {
        self.update(|story, now| story.retreat(now)).map(|u| u.view)
    }

    /// Dropdown change; on `SkippedEmpty` the chart keeps its previous series.
    pub fn select(&self, selection: Selection) -> RenderOutcome {
        let mut inner = self.inner.borrow_mut();
        let outcome = inner.story.select(selection, now_ms());
        inner.dirty = true;
        outcome
    }

    /// Name of the selection the chart is showing.
    pub fn shown_selection(&self) -> String {
        self.inner
            .borrow()
            .story
            .controller()
            .selection()
            .name()
            .to_string()
    }

    fn update(&self, f: impl FnOnce(&mut Story, f64) -> Option<SceneUpdate>) -> Option<SceneUpdate> {
        let mut inner = self.inner.borrow_mut();
        let update = f(&mut inner.story, now_ms())?;
        inner.dirty = true;
        Some(update)
    }
}

fn canvas_point(canvas: &HtmlCanvasElement, event: &MouseEvent) -> (f64, f64) {
    let rect = canvas.get_bounding_client_rect();
    (
        event.client_x() as f64 - rect.left(),
        event.client_y() as f64 - rect.top(),
    )
}

fn setup_pointer_events(inner_rc: &Rc<RefCell<StoryInner>>) -> Result<(), JsValue> {
    let canvas = inner_rc.borrow().backend.canvas().clone();

    // mousemove
    {
        let inner_rc = inner_rc.clone();
        let canvas_clone = canvas.clone();
        let closure = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |event: MouseEvent| {
            let (x, y) = canvas_point(&canvas_clone, &event);
            inner_rc.borrow_mut().story.hover(x, y, now_ms());
        }));
        canvas.add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // mouseleave
    {
        let inner_rc = inner_rc.clone();
        let closure = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_event: MouseEvent| {
            inner_rc.borrow_mut().story.unhover(now_ms());
        }));
        canvas.add_event_listener_with_callback("mouseleave", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    Ok(())
}

/// Paints whenever state changed or a transition/fade is in flight, plus one
/// frame after it settles.
fn start_render_loop(inner_rc: Rc<RefCell<StoryInner>>) {
    let f = Rc::new(RefCell::new(None::<Closure<dyn FnMut(f64)>>));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
        {
            let mut guard = inner_rc.borrow_mut();
            let inner = &mut *guard;
            let animating = inner.story.chart().is_animating(timestamp);
            if inner.dirty || animating || inner.animating {
                inner.story.chart().paint_to(&mut inner.backend, timestamp);
                inner.dirty = false;
            }
            inner.animating = animating;
        }
        if let Err(err) = request_frame(&f) {
            warn!(?err, "render loop stopped");
        }
    }) as Box<dyn FnMut(f64)>));

    if let Err(err) = request_frame(&g) {
        warn!(?err, "render loop failed to start");
    }
}

fn request_frame(slot: &Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>) -> Result<i32, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window unavailable"))?;
    let slot = slot.borrow();
    let cb = slot
        .as_ref()
        .ok_or_else(|| JsValue::from_str("render loop closure missing"))?;
    window.request_animation_frame(cb.as_ref().unchecked_ref())
}
