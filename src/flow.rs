//! Animation loop and application event loop.
//!
//! The [`AnimationLoop`] owns the [`Scene`] and is the only code that mutates it.
//! Loads finish out of band and queue [`SceneUpdate`]s; the loop applies them at the
//! start of a tick, before anything reads the graph, so a frame never observes a
//! half-inserted subtree.
//!
//! # Lifecycle
//!
//! Every tick:
//! 1. Apply finished loads
//! 2. Read the clock, derive `delta` from the previous tick
//! 3. Animate hearts and the flower text group
//! 4. Advance the camera rig
//! 5. Recompute world transforms and hand a [`Frame`] to the renderer
//!
//! [`App`] drives ticks from winit: one per `RedrawRequested`, each followed by a new
//! redraw request, until the window closes or the [`StopSignal`] fires.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use cgmath::{EuclideanSpace, Point3};
use futures::channel::mpsc::UnboundedReceiver;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    camera::{Camera, CameraRig, OrbitControls},
    context::Context,
    placement::RandomPlacementGenerator,
    render::{Frame, LogRenderer, Renderer},
    resources::{FileAssetSource, scheduler::AssetLoadScheduler},
    scene::{Scene, SceneConfig, SceneUpdate, compose},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Monotonic time since the loop started, and the reading of the previous tick.
#[derive(Clone, Debug)]
pub struct AnimationClock {
    start: Instant,
    previous: f32,
}

impl AnimationClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            previous: 0.0,
        }
    }

    /// Seconds since [`start`](Self::start).
    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Records a new reading and returns the time since the previous one.
    ///
    /// Readings never go backwards; an older one yields a zero delta.
    pub fn advance_to(&mut self, elapsed: f32) -> f32 {
        let delta = (elapsed - self.previous).max(0.0);
        self.previous = self.previous.max(elapsed);
        delta
    }

    pub fn previous(&self) -> f32 {
        self.previous
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Ends an [`AnimationLoop`] from anywhere. The loop stops at its next tick.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct AnimationLoop<R: Renderer, C: CameraRig> {
    scene: Scene,
    updates: UnboundedReceiver<SceneUpdate>,
    clock: AnimationClock,
    ctx: Context,
    rig: C,
    renderer: R,
    stop: StopSignal,
    state: LoopState,
}

impl<R: Renderer, C: CameraRig> AnimationLoop<R, C> {
    /// Starts the clock. `updates` is the receiving end of the scheduler channel.
    pub fn new(
        scene: Scene,
        updates: UnboundedReceiver<SceneUpdate>,
        ctx: Context,
        rig: C,
        renderer: R,
    ) -> Self {
        Self {
            scene,
            updates,
            clock: AnimationClock::start(),
            ctx,
            rig,
            renderer,
            stop: StopSignal::new(),
            state: LoopState::Running,
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn rig(&self) -> &C {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut C {
        &mut self.rig
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Applies every queued update and returns how many there were.
    pub fn apply_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            update(&mut self.scene);
            applied += 1;
        }
        applied
    }

    /// One tick at the current wall clock time.
    pub fn tick(&mut self) -> anyhow::Result<LoopState> {
        let elapsed = self.clock.elapsed();
        self.step(elapsed)
    }

    /// One tick at `elapsed` seconds since the loop started.
    pub fn step(&mut self, elapsed: f32) -> anyhow::Result<LoopState> {
        if self.stop.is_stopped() {
            self.state = LoopState::Stopped;
        }
        if self.state == LoopState::Stopped {
            return Ok(LoopState::Stopped);
        }

        let applied = self.apply_updates();
        if applied > 0 {
            log::debug!("Applied {} finished loads", applied);
        }
        let delta = self.clock.advance_to(elapsed);
        self.scene.animate(self.clock.previous(), delta);
        self.rig.update(delta);

        self.scene.graph_mut().update_world_transforms();
        let frame = Frame::new(self.scene.graph(), &self.ctx, self.rig.camera());
        self.renderer.render(&frame)?;
        Ok(LoopState::Running)
    }

    /// New logical canvas size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.rig.resize(width, height);
            self.renderer.resize(&self.ctx);
        }
    }

    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        self.ctx.set_device_pixel_ratio(device_pixel_ratio);
        self.renderer.resize(&self.ctx);
    }
}

/// Hosts an [`AnimationLoop`] in a winit window.
pub struct App<R: Renderer> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    config: SceneConfig,
    // taken once the window exists
    renderer: Option<R>,
    window: Option<Arc<Window>>,
    animation: Option<AnimationLoop<R, OrbitControls>>,
}

impl<R: Renderer> App<R> {
    pub fn new(config: SceneConfig, renderer: R) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            renderer: Some(renderer),
            window: None,
            animation: None,
        })
    }

    fn start(&mut self, window: &Window) -> anyhow::Result<AnimationLoop<R, OrbitControls>> {
        let Some(renderer) = self.renderer.take() else {
            anyhow::bail!("The animation loop was already started.");
        };
        let scale_factor = window.scale_factor();
        let size = window.inner_size().to_logical::<u32>(scale_factor);
        let ctx = Context::new(size.width.max(1), size.height.max(1), scale_factor);

        #[cfg(not(target_arch = "wasm32"))]
        let (scheduler, updates) = AssetLoadScheduler::with_handle(
            FileAssetSource::default(),
            self.async_runtime.handle().clone(),
        );
        #[cfg(target_arch = "wasm32")]
        let (scheduler, updates) = AssetLoadScheduler::new(FileAssetSource::default())?;

        let scene = Scene::new(&self.config)?;
        compose(
            &scheduler,
            &self.config,
            &mut RandomPlacementGenerator::from_entropy(),
        );
        log::info!("Scheduled {} loads", scheduler.pending());

        let camera = Camera::new(self.config.camera_position, Point3::origin());
        let mut rig = OrbitControls::new(camera).with_damping(true);
        rig.resize(size.width, size.height);
        Ok(AnimationLoop::new(scene, updates, ctx, rig, renderer))
    }
}

impl<R: Renderer> ApplicationHandler for App<R> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("heart-flow");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the main window: {}", e);
                event_loop.exit();
                return;
            }
        };
        match self.start(&window) {
            Ok(animation) => self.animation = Some(animation),
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
                return;
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (Some(animation), DeviceEvent::MouseMotion { delta: (dx, dy) }) =
            (&mut self.animation, event)
        {
            animation.rig_mut().handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let (Some(animation), Some(window)) = (&mut self.animation, &self.window) else {
            return;
        };
        animation.rig_mut().handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let size = size.to_logical::<u32>(window.scale_factor());
                animation.resize(size.width, size.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                animation.set_device_pixel_ratio(scale_factor);
            }
            WindowEvent::RedrawRequested => match animation.tick() {
                Ok(LoopState::Running) => window.request_redraw(),
                Ok(LoopState::Stopped) => event_loop.exit(),
                Err(e) => {
                    log::error!("Unable to render {}", e);
                    window.request_redraw();
                }
            },
            _ => {}
        }
    }
}

/// Opens the window and animates the scene until it is closed.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    run_with(config, LogRenderer::default())
}

pub fn run_with<R: Renderer + 'static>(config: SceneConfig, renderer: R) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, renderer)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
