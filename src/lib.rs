//! matcap-donuts
//!
//! Extruded 3D text in the middle of a field of donuts, all shaded with a
//! single matcap texture. Runs natively and in the browser through wgpu.
//!
//! High-level modules
//! - `camera`: perspective camera, damped orbit controller and its uniform
//! - `context`: window, surface, device and the shared GPU resources
//! - `data_structures`: GPU side meshes, materials, textures and instances
//! - `flow`: the event loop and the [`flow::GraphicsFlow`] trait scenes implement
//! - `geometry`: CPU meshes for the torus and extruded outlines
//! - `pipelines`: the matcap render pipeline
//! - `render`: collection of draw items into one render pass
//! - `resources`: asset loading from disk or over HTTP
//! - `scene`: the text and donut scene with its control panel
//! - `typeface`: typeface JSON parsing and glyph layout
//! - `viewport`: pixel ratio capping of the render target
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod geometry;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod typeface;
pub mod viewport;

use crate::scene::config::DemoConfig;

/// Open the window and run the demo with `config` until it is closed.
pub fn run_demo(config: DemoConfig) -> anyhow::Result<()> {
    flow::run(vec![scene::constructor(config)])
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> Result<(), wasm_bindgen::JsValue> {
    run_demo(DemoConfig::default())
        .map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
