pub mod app;
#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod logging;
pub mod theme;

pub use app::App;

#[cfg(all(feature = "csr", target_arch = "wasm32"))]
use leptos::*;
#[cfg(all(feature = "csr", target_arch = "wasm32"))]
use wasm_bindgen::prelude::*;

#[cfg(all(feature = "csr", target_arch = "wasm32"))]
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init();
    leptos::mount_to_body(|| view! { <App/> });
}
