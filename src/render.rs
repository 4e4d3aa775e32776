//! Render boundary and draw batching.
//!
//! Presentation is not done by this crate. Every tick the animation loop flattens the
//! scene graph into a [`Frame`] and hands it to a [`Renderer`]. A frame carries the
//! camera matrices, the viewport and one [`DrawItem`] per mesh node; renderers that
//! want instancing can call [`Frame::batches`] to group items sharing a geometry and
//! material into [`Instanced`] batches, split into opaque and transparent passes.
//!
//! # Key types
//!
//! - [`Renderer`] is implemented by the presentation layer
//! - [`Frame<'a>`] is the per-tick snapshot of the scene
//! - [`Instanced<'a>`] is one batch of instances of the same mesh
//!

use std::sync::Arc;

use crate::{
    camera::Camera,
    context::{Context, ShadowMapSettings},
    data_structures::{
        instance::InstanceRaw,
        light::Light,
        model::{Material, Mesh},
        scene_graph::{NodeId, SceneGraph},
    },
};

/// One mesh node with its world transform.
#[derive(Clone, Debug)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub mesh: &'a Mesh,
    pub instance: InstanceRaw,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightItem {
    pub light: Light,
    pub position: cgmath::Vector3<f32>,
}

/// Instances sharing a geometry and material, ready for one instanced draw call.
#[derive(Debug)]
pub struct Instanced<'a> {
    pub mesh: &'a Mesh,
    pub instances: Vec<InstanceRaw>,
}

impl Instanced<'_> {
    /// The instance data as bytes, e.g. for a vertex buffer upload.
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Everything a renderer needs to draw one tick.
#[derive(Debug)]
pub struct Frame<'a> {
    pub draws: Vec<DrawItem<'a>>,
    pub lights: Vec<LightItem>,
    pub view: cgmath::Matrix4<f32>,
    pub projection: cgmath::Matrix4<f32>,
    pub camera: Camera,
    /// Drawing buffer size in physical pixels.
    pub viewport: (u32, u32),
    pub clear_colour: [f64; 4],
    pub shadow_map: ShadowMapSettings,
}

impl<'a> Frame<'a> {
    /// Snapshot `graph` as seen from `camera`. World transforms must be up to date.
    pub fn new(graph: &'a SceneGraph, ctx: &Context, camera: &Camera) -> Self {
        Self {
            draws: graph.draw_list(),
            lights: graph.lights(),
            view: camera.calc_matrix(),
            projection: ctx.projection.calc_matrix(),
            camera: *camera,
            viewport: ctx.physical_size(),
            clear_colour: ctx.clear_colour,
            shadow_map: ctx.shadow_map,
        }
    }

    pub fn view_proj(&self) -> cgmath::Matrix4<f32> {
        self.projection * self.view
    }

    /// Groups draw items by shared geometry and material, keeping first-seen order.
    ///
    /// Returns `(opaque, transparent)`.
    pub fn batches(&self) -> (Vec<Instanced<'a>>, Vec<Instanced<'a>>) {
        let mut opaque: Vec<Instanced<'a>> = Vec::new();
        let mut transparent: Vec<Instanced<'a>> = Vec::new();
        for item in &self.draws {
            let target = if is_transparent(&item.mesh.material) {
                &mut transparent
            } else {
                &mut opaque
            };
            match target.iter_mut().find(|batch| same_mesh(batch.mesh, item.mesh)) {
                Some(batch) => batch.instances.push(item.instance),
                None => target.push(Instanced {
                    mesh: item.mesh,
                    instances: vec![item.instance],
                }),
            }
        }
        (opaque, transparent)
    }
}

fn is_transparent(material: &Material) -> bool {
    matches!(
        material,
        Material::Basic {
            transparent: true,
            ..
        }
    )
}

fn same_mesh(a: &Mesh, b: &Mesh) -> bool {
    Arc::ptr_eq(&a.geometry, &b.geometry) && Arc::ptr_eq(&a.material, &b.material)
}

/// The presentation layer.
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>) -> anyhow::Result<()>;

    /// Called after the context's size or pixel ratio changed.
    fn resize(&mut self, _ctx: &Context) {}
}

/// A renderer that only reports what it would draw.
///
/// Logs a summary of the frame every `every` frames at debug level.
#[derive(Debug)]
pub struct LogRenderer {
    every: u64,
    frames: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for LogRenderer {
    fn default() -> Self {
        Self::new(120)
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame<'_>) -> anyhow::Result<()> {
        if self.frames % self.every == 0 {
            let (opaque, transparent) = frame.batches();
            let triangles: usize = frame
                .draws
                .iter()
                .map(|item| item.mesh.geometry.triangle_count())
                .sum();
            log::debug!(
                "frame {}: {} meshes in {} opaque / {} transparent batches, {} triangles, {} lights, viewport {:?}",
                self.frames,
                frame.draws.len(),
                opaque.len(),
                transparent.len(),
                triangles,
                frame.lights.len(),
                frame.viewport,
            );
        }
        self.frames += 1;
        Ok(())
    }

    fn resize(&mut self, ctx: &Context) {
        log::info!(
            "viewport is now {:?} ({}x pixel ratio)",
            ctx.physical_size(),
            ctx.pixel_ratio()
        );
    }
}
