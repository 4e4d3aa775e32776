//! The heart scene: what gets loaded, where it goes and how it moves.
//!
//! [`compose`] schedules every load of the scene: one heart mesh request per heart
//! and a joined texture + font request for the flower text group. Each completion
//! builds its whole subtree off the loop and queues a [`SceneUpdate`] that inserts it
//! in one call. [`Scene::animate`] is the per-tick update of everything that moves.

use std::{collections::HashMap, sync::Arc};

use anyhow::bail;
use cgmath::{Angle, Point3, Rad, Vector3};
use futures::future::join;
use rand::Rng;

use crate::{
    data_structures::{
        instance::Instance,
        light::{Light, ShadowParams, rgb},
        model::{Geometry, Material, Mesh},
        scene_graph::{NodeId, SceneGraph, SceneNode},
        texture::TextureAsset,
    },
    placement::{Placement, RandomPlacementGenerator},
    resources::{
        MeshAsset,
        font::TypefaceFont,
        scheduler::{AssetLoadScheduler, LoadRequest, Mutation},
    },
    text::{TextGeometryOptions, TextLayoutBuilder},
};

/// A change to the scene queued by a finished load.
pub type SceneUpdate = Mutation<Scene>;

/// Every tunable of the scene.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub heart_count: usize,
    pub heart_radius: f32,
    /// Hearts sit `spread_range / 20` below the origin on the z axis.
    pub spread_range: f32,
    /// Radians per second around the local y axis.
    pub heart_spin: f32,
    /// Units per second the flower text group moves up and away.
    pub flower_drift: f32,
    /// Scale gained by the flower text group per second since the loop started.
    pub flower_growth: f32,
    pub line_height: f32,
    pub text_lines: Vec<String>,
    pub text: TextGeometryOptions,
    pub heart_model: String,
    pub flower_texture: String,
    pub font: String,
    pub matcap: String,
    pub plane_size: f32,
    pub plane_offset: f32,
    pub alpha_test: f32,
    pub text_offset: f32,
    pub camera_position: Point3<f32>,
    pub ambient: Light,
    pub directional: Light,
    pub directional_position: Vector3<f32>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            heart_count: 180,
            heart_radius: 30.0,
            spread_range: 100.0,
            heart_spin: 0.5,
            flower_drift: 1.0,
            flower_growth: 0.02,
            line_height: 1.5,
            text_lines: [
                "Maman",
                "Apsveicu",
                "Tevi",
                "Valentindiena",
                "PS: Maman ei Bezdet!!!",
                "Atbildot uz tavu jautajumu,",
                "Talab, kad gribu sutit BEZDET!!!",
            ]
            .map(String::from)
            .to_vec(),
            text: TextGeometryOptions::default(),
            heart_model: "/models/Heart.glb".to_string(),
            flower_texture: "/textures/test.png".to_string(),
            font: "/fonts/helvetiker_regular.typeface.json".to_string(),
            matcap: "textures/matcaps/8.png".to_string(),
            plane_size: 5.0,
            plane_offset: -6.9,
            alpha_test: 0.1,
            text_offset: 5.0,
            camera_position: Point3::new(0.0, 0.0, 10.0),
            ambient: Light::Ambient {
                color: rgb(0xffffff),
                intensity: 2.4,
            },
            directional: Light::Directional {
                color: rgb(0xffffff),
                intensity: 1.8,
                shadow: Some(ShadowParams {
                    map_size: [1024, 1024],
                    far: 15.0,
                    left: -7.0,
                    top: 7.0,
                    right: 7.0,
                    bottom: -7.0,
                    ..Default::default()
                }),
            },
            directional_position: Vector3::new(5.0, 5.0, 5.0),
        }
    }
}

impl SceneConfig {
    pub fn vertical_offset(&self) -> f32 {
        self.spread_range / 20.0
    }
}

/// The scene graph plus the handles of the nodes the animation moves.
#[derive(Debug)]
pub struct Scene {
    graph: SceneGraph,
    hearts: Vec<NodeId>,
    flower_text: Option<NodeId>,
    models: HashMap<String, Arc<MeshAsset>>,
    heart_spin: f32,
    flower_drift: f32,
    flower_growth: f32,
}

impl Scene {
    /// An empty scene holding only the lights.
    pub fn new(config: &SceneConfig) -> anyhow::Result<Self> {
        let mut graph = SceneGraph::new();
        graph.insert(graph.root(), SceneNode::light("ambient", config.ambient))?;
        graph.insert(
            graph.root(),
            SceneNode::light("directional", config.directional)
                .with_transform(Instance::from(config.directional_position)),
        )?;
        Ok(Self {
            graph,
            hearts: Vec::new(),
            flower_text: None,
            models: HashMap::new(),
            heart_spin: config.heart_spin,
            flower_drift: config.flower_drift,
            flower_growth: config.flower_growth,
        })
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn hearts(&self) -> &[NodeId] {
        &self.hearts
    }

    pub fn flower_text(&self) -> Option<NodeId> {
        self.flower_text
    }

    /// The first model decoded from `source`. Later decodes of the same source are
    /// dropped so every instance shares one geometry and batches into one draw.
    pub fn shared_model(&mut self, source: &str, decoded: Arc<MeshAsset>) -> Arc<MeshAsset> {
        self.models
            .entry(source.to_string())
            .or_insert(decoded)
            .clone()
    }

    /// Adds one instance of the heart model at `placement`.
    pub fn add_heart(&mut self, model: &MeshAsset, placement: Placement) -> anyhow::Result<NodeId> {
        let node = SceneNode::group(format!("heart-{}", self.hearts.len()))
            .with_transform(placement.into_instance())
            .with_child(model.instantiate());
        let id = self.graph.insert(self.graph.root(), node)?;
        self.hearts.push(id);
        Ok(id)
    }

    /// Inserts the flower text group. There is only ever one.
    pub fn attach_flower_text(&mut self, group: SceneNode) -> anyhow::Result<NodeId> {
        if let Some(existing) = self.flower_text {
            bail!("The flower text group is already attached as {:?}.", existing);
        }
        let id = self.graph.insert(self.graph.root(), group)?;
        self.flower_text = Some(id);
        Ok(id)
    }

    /// Moves everything that moves. `elapsed` is the time since the loop started,
    /// `delta` the time since the previous tick, both in seconds.
    pub fn animate(&mut self, elapsed: f32, delta: f32) {
        for &heart in &self.hearts {
            if let Some(transform) = self.graph.transform_mut(heart) {
                transform.rotation.y = (transform.rotation.y + Rad(delta * self.heart_spin)).normalize();
            }
        }
        if let Some(transform) = self
            .flower_text
            .and_then(|group| self.graph.transform_mut(group))
        {
            transform.position.y += delta * self.flower_drift;
            transform.position.z -= delta * self.flower_drift;
            transform.set_uniform_scale(1.0 + elapsed * self.flower_growth);
        }
    }
}

/// The textured, see-through plane below the text.
pub fn flower_plane(texture: Arc<TextureAsset>, config: &SceneConfig) -> SceneNode {
    let material = Material::Basic {
        map: texture,
        transparent: true,
        alpha_test: config.alpha_test,
        double_sided: true,
    };
    let mesh = Mesh {
        name: "flower".to_string(),
        geometry: Arc::new(Geometry::plane(config.plane_size, config.plane_size)),
        material: Arc::new(material),
    };
    SceneNode::mesh("flower", mesh)
        .with_transform(Instance::from(Vector3::new(0.0, config.plane_offset, 0.0)))
}

/// All text lines, matcap shaded, one line below the other.
pub fn text_group(font: &TypefaceFont, config: &SceneConfig) -> SceneNode {
    let material = Arc::new(Material::Matcap {
        matcap: config.matcap.clone(),
    });
    TextLayoutBuilder::new(font)
        .options(config.text)
        .name("text")
        .build(&config.text_lines, material, config.line_height)
        .with_transform(Instance::from(Vector3::new(0.0, config.text_offset, 0.0)))
}

/// The group holding the flower plane and the text.
///
/// The group needs the font; without a texture it holds the text alone.
pub fn flower_text_group(
    texture: Option<Arc<TextureAsset>>,
    font: Option<&TypefaceFont>,
    config: &SceneConfig,
) -> Option<SceneNode> {
    let font = font?;
    let mut group = SceneNode::group("flower-text");
    if let Some(texture) = texture {
        group.add_child(flower_plane(texture, config));
    }
    group.add_child(text_group(font, config));
    Some(group)
}

/// Schedules every load of the scene. Placements are drawn up front, in request order.
pub fn compose<R: Rng>(
    scheduler: &AssetLoadScheduler<Scene>,
    config: &SceneConfig,
    placements: &mut RandomPlacementGenerator<R>,
) {
    for index in 0..config.heart_count {
        let placement = placements.sample(config.heart_radius, config.vertical_offset());
        let source = config.heart_model.clone();
        scheduler.submit(
            LoadRequest::mesh(config.heart_model.clone()),
            move |asset| {
                let model = asset.into_mesh(&source).ok()?;
                let update: SceneUpdate = Box::new(move |scene| {
                    let model = scene.shared_model(&source, model);
                    if let Err(e) = scene.add_heart(&model, placement) {
                        log::warn!("Could not add heart {}: {}", index, e);
                    }
                });
                Some(update)
            },
            move |err| log::debug!("Heart {} will be missing: {}", index, err),
        );
    }

    let texture = scheduler.load(LoadRequest::texture(config.flower_texture.clone()));
    let font = scheduler.load(LoadRequest::font(config.font.clone()));
    let config = config.clone();
    scheduler.spawn(async move {
        let (texture, font) = join(texture, font).await;
        let texture = texture
            .and_then(|asset| asset.into_texture(&config.flower_texture))
            .inspect_err(|err| log::error!("Could not load the flower texture: {}", err))
            .ok();
        let font = font
            .and_then(|asset| asset.into_font(&config.font))
            .inspect_err(|err| log::debug!("Text will be missing: {}", err))
            .ok();
        let group = flower_text_group(texture, font.as_deref(), &config)?;
        let update: SceneUpdate = Box::new(move |scene| {
            if let Err(e) = scene.attach_flower_text(group) {
                log::warn!("{}", e);
            }
        });
        Some(update)
    });
}
