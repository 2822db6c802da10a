pub use bootstrap::{BootConfig, Bootstrap};
pub use canvas::CanvasTarget;
pub use error::BootError;
pub use runtime::PyRuntime;
pub use source::{LoadedScript, ScriptSource};

#[cfg(not(target_arch = "wasm32"))]
pub use canvas::{take_ops, DrawOp};

mod bootstrap;
mod canvas;
mod connector;
mod error;
mod runtime;
mod source;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub async fn run(canvas_id: Option<String>, base_url: Option<String>) {
    use std::str::FromStr;
    use url::Url;

    let mut config = BootConfig::default();

    if let Some(canvas_id) = canvas_id {
        config.canvas_id = canvas_id;
    }

    // Without an explicit base, scripts resolve against the page itself.
    let base_url =
        base_url.or_else(|| web_sys::window().and_then(|window| window.location().href().ok()));
    config.base_url = base_url.map(|url| Url::from_str(&url).unwrap());

    let canvas = CanvasTarget::Dom(config.canvas_id.clone());

    Bootstrap { config, canvas }.run().await;
}
