use crate::camera::Projection;

/// Upper bound for the device pixel ratio; denser displays render at 2x.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShadowMapKind {
    Basic,
    Pcf,
    #[default]
    PcfSoft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowMapSettings {
    pub enabled: bool,
    pub kind: ShadowMapKind,
}

impl Default for ShadowMapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: ShadowMapKind::PcfSoft,
        }
    }
}

/// Everything the core knows about the window it is presented in.
///
/// Sizes are logical (device independent) pixels as reported by the host. The
/// projection and the physical viewport are derived from them and recomputed on
/// every [`resize`](Self::resize) or pixel ratio change.
#[derive(Clone, Debug)]
pub struct Context {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    pub projection: Projection,
    pub clear_colour: [f64; 4],
    pub shadow_map: ShadowMapSettings,
}

impl Context {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let projection = Projection::new(width, height, cgmath::Deg(75.0), 0.1, 1000.0);
        Self {
            width,
            height,
            pixel_ratio: clamp_pixel_ratio(device_pixel_ratio),
            projection,
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            shadow_map: ShadowMapSettings::default(),
        }
    }

    /// Updates the logical canvas size. Zero sized windows (minimised) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        self.projection.resize(width, height);
        true
    }

    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        self.pixel_ratio = clamp_pixel_ratio(device_pixel_ratio);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn aspect(&self) -> f32 {
        self.projection.aspect()
    }

    /// Size of the drawing buffer in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.pixel_ratio).round() as u32,
            (self.height as f64 * self.pixel_ratio).round() as u32,
        )
    }
}

fn clamp_pixel_ratio(device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(MAX_PIXEL_RATIO)
    } else {
        log::warn!(
            "Ignoring invalid device pixel ratio {}, falling back to 1.",
            device_pixel_ratio
        );
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_recomputes_derived_sizes() {
        let mut ctx = Context::new(800, 600, 3.0);
        assert_eq!(ctx.pixel_ratio(), 2.0);
        assert_eq!(ctx.physical_size(), (1600, 1200));

        assert!(ctx.resize(1000, 500));
        assert_eq!(ctx.aspect(), 2.0);
        assert_eq!(ctx.physical_size(), (2000, 1000));

        ctx.set_device_pixel_ratio(1.25);
        assert_eq!(ctx.physical_size(), (1250, 625));
    }

    #[test]
    fn minimised_window_keeps_last_size() {
        let mut ctx = Context::new(800, 600, 1.0);
        assert!(!ctx.resize(0, 0));
        assert_eq!(ctx.size(), (800, 600));
        assert!((ctx.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn projection_matches_the_scene_camera() {
        let ctx = Context::new(640, 480, 1.0);
        let fovy: cgmath::Rad<f32> = cgmath::Deg(75.0).into();
        assert_eq!(ctx.projection.fovy(), fovy);
        assert_eq!(ctx.projection.near(), 0.1);
        assert_eq!(ctx.projection.far(), 1000.0);
    }
}
