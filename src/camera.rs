//! Camera, projection and damped orbit controls.
//!
//! The animation loop only depends on the [`CameraRig`] trait: it calls
//! [`CameraRig::update`] once per tick and reads the resulting [`Camera`] when
//! building a frame. [`OrbitControls`] is the default rig, orbiting a target point
//! with damped rotation and zoom driven by pointer input.

use std::f32::consts::{PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective projection. `fovy` is the vertical field of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn near(&self) -> f32 {
        self.znear
    }

    pub fn far(&self) -> f32 {
        self.zfar
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// An interactive camera the animation loop advances once per tick.
pub trait CameraRig {
    /// Advance damping/interpolation by `dt` seconds.
    fn update(&mut self, dt: f32);

    fn camera(&self) -> &Camera;

    fn handle_window_events(&mut self, _event: &WindowEvent) {}

    /// Raw pointer motion in physical pixels.
    fn handle_mouse(&mut self, _dx: f64, _dy: f64) {}

    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// A camera that never moves.
#[derive(Clone, Debug)]
pub struct FixedCamera(pub Camera);

impl CameraRig for FixedCamera {
    fn update(&mut self, _: f32) {}

    fn camera(&self) -> &Camera {
        &self.0
    }
}

/// Orbits `camera.target`, easing rotation and zoom towards the requested values.
///
/// With damping enabled each update applies `damping_factor` of the outstanding
/// rotation and keeps the rest for the following updates, so motion fades out
/// instead of stopping abruptly.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    camera: Camera,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    zoom: f32,
    dragging: bool,
    viewport_height: f32,
}

impl OrbitControls {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom: 1.0,
            dragging: false,
            viewport_height: 1.0,
        }
    }

    pub fn with_damping(mut self, enable: bool) -> Self {
        self.enable_damping = enable;
        self
    }

    /// Turn the camera left around the target by `angle`.
    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Zoom in (`factor < 1`) or out (`factor > 1`) on the next update.
    pub fn dolly(&mut self, factor: f32) {
        self.zoom *= factor;
    }

    /// Whether rotation is still being eased out.
    pub fn is_settling(&self) -> bool {
        self.delta_theta.abs() > 1e-6 || self.delta_phi.abs() > 1e-6
    }
}

impl CameraRig for OrbitControls {
    fn update(&mut self, _dt: f32) {
        let offset = self.camera.position - self.camera.target;
        let mut radius = offset.magnitude();
        // theta around +y starting at +z, phi down from +y
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * step;
        phi += self.delta_phi * step;
        phi = phi.clamp(1e-6, PI - 1e-6);
        radius = (radius * self.zoom).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let offset = Vector3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        self.camera.position = self.camera.target + offset;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.zoom = 1.0;
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = *state == ElementState::Pressed,
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                if scroll != 0.0 {
                    let factor = 0.95f32.powf(self.zoom_speed * scroll.abs());
                    self.dolly(if scroll > 0.0 { factor } else { 1.0 / factor });
                }
            }
            _ => (),
        }
    }

    fn handle_mouse(&mut self, dx: f64, dy: f64) {
        if !self.dragging {
            return;
        }
        // a drag across the full viewport height is one full turn
        let height = self.viewport_height.max(1.0);
        self.rotate_left(TAU * dx as f32 / height * self.rotate_speed);
        self.rotate_up(TAU * dy as f32 / height * self.rotate_speed);
    }

    fn resize(&mut self, _width: u32, height: u32) {
        self.viewport_height = height as f32;
    }
}
