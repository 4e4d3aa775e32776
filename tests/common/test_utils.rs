#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use heart_flow::{
    camera::{Camera, FixedCamera},
    context::Context,
    data_structures::{
        model::{Geometry, Material, Mesh},
        scene_graph::{NodeId, Payload, SceneGraph, SceneNode},
        texture::TextureAsset,
    },
    flow::AnimationLoop,
    placement::RandomPlacementGenerator,
    render::{Frame, Renderer},
    resources::{
        Asset, AssetKind, AssetSource, LoadError, LoadFuture, MeshAsset,
        font::TypefaceFont,
        scheduler::AssetLoadScheduler,
    },
    scene::{Scene, SceneConfig, compose},
};
use rand::Rng;

/// Every glyph is the same unit square, so any text renders as a row of blocks.
pub(crate) const BLOCK_FONT: &str = r#"{
    "glyphs": {
        "?": { "ha": 600, "o": "m 0 0 l 500 0 l 500 700 l 0 700 z" },
        "o": { "ha": 900, "o": "m 0 0 l 0 800 l 800 800 l 800 0 z m 200 200 l 600 200 l 600 600 l 200 600 z" },
        " ": { "ha": 400 }
    },
    "familyName": "Blocks",
    "resolution": 1000,
    "boundingBox": { "xMin": 0, "xMax": 900, "yMin": -200, "yMax": 900 },
    "underlineThickness": 50
}"#;

pub(crate) fn block_font() -> TypefaceFont {
    TypefaceFont::from_json(BLOCK_FONT.as_bytes()).expect("fixture font is valid")
}

pub(crate) fn heart_model() -> MeshAsset {
    let mesh = Mesh {
        name: "Heart".to_string(),
        geometry: Arc::new(Geometry::plane(1.0, 1.0)),
        material: Arc::new(Material::Standard {
            base_color: [1.0, 0.0, 0.2, 1.0],
        }),
    };
    MeshAsset::new(
        "/models/Heart.glb",
        SceneNode::group("/models/Heart.glb").with_child(SceneNode::mesh("Heart", mesh)),
    )
}

#[derive(Clone)]
enum Entry {
    Asset(Asset),
    Missing,
    /// Fails every `n`-th request for this source, 1-based.
    Flaky(Asset, usize),
    /// Builds a new asset on every request, like decoding a file would.
    Decoded(fn() -> Asset),
}

/// An in-memory asset source with random per-request latency.
#[derive(Clone)]
pub(crate) struct MemoryAssetSource {
    entries: HashMap<String, Entry>,
    max_delay_millis: u64,
    requests: Arc<AtomicUsize>,
    counters: Arc<std::sync::Mutex<HashMap<String, usize>>>,
}

impl MemoryAssetSource {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            max_delay_millis: 0,
            requests: Arc::new(AtomicUsize::new(0)),
            counters: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Heart model, flower texture and font at the default config's paths.
    pub(crate) fn complete(config: &SceneConfig) -> Self {
        Self::new()
            .with(&config.heart_model, Asset::Mesh(Arc::new(heart_model())))
            .with(
                &config.flower_texture,
                Asset::Texture(Arc::new(TextureAsset::solid("flower", 4, 4, [255, 0, 80, 255]))),
            )
            .with(&config.font, Asset::Font(Arc::new(block_font())))
    }

    pub(crate) fn with(mut self, source: &str, asset: Asset) -> Self {
        self.entries.insert(source.to_string(), Entry::Asset(asset));
        self
    }

    pub(crate) fn decoding(mut self, source: &str, decode: fn() -> Asset) -> Self {
        self.entries.insert(source.to_string(), Entry::Decoded(decode));
        self
    }

    pub(crate) fn missing(mut self, source: &str) -> Self {
        self.entries.insert(source.to_string(), Entry::Missing);
        self
    }

    pub(crate) fn flaky(mut self, source: &str, every: usize) -> Self {
        let entry = match self.entries.remove(source) {
            Some(Entry::Asset(asset)) | Some(Entry::Flaky(asset, _)) => Entry::Flaky(asset, every),
            Some(Entry::Decoded(decode)) => Entry::Flaky(decode(), every),
            _ => Entry::Missing,
        };
        self.entries.insert(source.to_string(), entry);
        self
    }

    pub(crate) fn with_jitter(mut self, max_delay_millis: u64) -> Self {
        self.max_delay_millis = max_delay_millis;
        self
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl AssetSource for MemoryAssetSource {
    fn load(&self, _kind: AssetKind, source: &str) -> LoadFuture {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let nth = {
            let mut counters = self.counters.lock().unwrap();
            let counter = counters.entry(source.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        let delay = match self.max_delay_millis {
            0 => 0,
            max => rand::thread_rng().gen_range(0..=max),
        };
        let entry = self.entries.get(source).cloned().unwrap_or(Entry::Missing);
        let path = source.to_string();
        Box::pin(async move {
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            } else {
                tokio::task::yield_now().await;
            }
            match entry {
                Entry::Asset(asset) => Ok(asset),
                Entry::Decoded(decode) => Ok(decode()),
                Entry::Flaky(asset, every) if nth % every != 0 => Ok(asset),
                Entry::Flaky(..) | Entry::Missing => Err(LoadError::NotFound { path }),
            }
        })
    }
}

/// What a renderer was handed in one frame.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FrameRecord {
    pub(crate) draws: usize,
    pub(crate) lights: usize,
    pub(crate) batches: usize,
    pub(crate) viewport: (u32, u32),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) frames: Vec<FrameRecord>,
    pub(crate) resizes: usize,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &Frame<'_>) -> anyhow::Result<()> {
        let (opaque, transparent) = frame.batches();
        self.frames.push(FrameRecord {
            draws: frame.draws.len(),
            lights: frame.lights.len(),
            batches: opaque.len() + transparent.len(),
            viewport: frame.viewport,
        });
        Ok(())
    }

    fn resize(&mut self, _ctx: &Context) {
        self.resizes += 1;
    }
}

pub(crate) type TestLoop = AnimationLoop<RecordingRenderer, FixedCamera>;

/// Schedules the whole scene against `source` and returns the loop with the scheduler.
pub(crate) fn start_scene(
    source: MemoryAssetSource,
    config: &SceneConfig,
    seed: u64,
) -> (TestLoop, AssetLoadScheduler<Scene>) {
    let (scheduler, updates) = AssetLoadScheduler::new(source).expect("inside a tokio runtime");
    let scene = Scene::new(config).expect("lights can be inserted");
    compose(&scheduler, config, &mut RandomPlacementGenerator::from_seed(seed));
    let camera = FixedCamera(Camera::new(config.camera_position, cgmath::Point3::new(0.0, 0.0, 0.0)));
    let animation = AnimationLoop::new(
        scene,
        updates,
        Context::new(800, 600, 1.0),
        camera,
        RecordingRenderer::default(),
    );
    (animation, scheduler)
}

/// Waits until every scheduled load has settled and queued its update.
pub(crate) async fn settle(scheduler: &AssetLoadScheduler<Scene>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while scheduler.pending() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("loads did not settle in time");
}

/// Loads everything, then applies it with a zero-time tick.
pub(crate) async fn loaded_scene(source: MemoryAssetSource, config: &SceneConfig, seed: u64) -> TestLoop {
    let (mut animation, scheduler) = start_scene(source, config, seed);
    settle(&scheduler).await;
    animation.step(0.0).expect("recording never fails");
    animation
}

pub(crate) fn group_children<'a>(graph: &'a SceneGraph, id: NodeId) -> Vec<&'a str> {
    graph
        .children(id)
        .iter()
        .filter_map(|child| graph.get(*child))
        .map(|node| node.name())
        .collect()
}

pub(crate) fn mesh_count(graph: &SceneGraph, id: NodeId) -> usize {
    graph
        .descendants(id)
        .into_iter()
        .filter(|node| matches!(graph.get(*node).map(|n| n.payload()), Some(Payload::Mesh(_))))
        .count()
}
