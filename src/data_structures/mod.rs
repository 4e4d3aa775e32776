//! Scene data structures: transforms, meshes, textures, lights and the scene graph.
//!
//! - `instance` holds per-node transforms and their packed GPU form
//! - `model` contains geometry, materials and meshes
//! - `texture` holds decoded RGBA images
//! - `light` describes the fixed scene lights
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod light;
pub mod model;
pub mod scene_graph;
pub mod texture;
