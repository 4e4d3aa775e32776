//! heart-flow
//!
//! A small real-time 3D scene composed from independently, asynchronously loaded
//! assets: a heart model instanced 180 times on a sphere, a textured flower plane
//! and a block of extruded 3D text. Once started, an endless animation loop spins
//! the hearts, lets the flower text drift away while growing, and hands every frame
//! to a pluggable renderer. Runs natively and on the web (WASM).
//!
//! High-level modules
//! - `camera`: camera, projection and damped orbit controls
//! - `context`: window boundary (canvas size, pixel ratio, projection, shadows)
//! - `data_structures`: scene graph, transforms, meshes, textures and lights
//! - `flow`: animation loop and the winit application driving it
//! - `placement`: random placement of instances on a sphere
//! - `render`: per-frame snapshot of the scene and the renderer trait
//! - `resources`: asset sources, decoders and the load scheduler
//! - `scene`: scene configuration, composition and animation
//! - `text`: extruded text geometry and multi-line layout
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod placement;
pub mod render;
pub mod resources;
pub mod scene;
pub mod text;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> Result<(), wasm_bindgen::JsValue> {
    flow::run(scene::SceneConfig::default())
        .map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
