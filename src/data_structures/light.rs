//! Static light descriptions stored as scene graph payloads.

/// Orthographic shadow camera of a directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowParams {
    pub map_size: [u32; 2],
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            map_size: [512, 512],
            near: 0.5,
            far: 500.0,
            left: -5.0,
            right: 5.0,
            top: 5.0,
            bottom: -5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Shines from the node's world position towards the origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        shadow: Option<ShadowParams>,
    },
}

impl Light {
    pub fn color(&self) -> [f32; 3] {
        match self {
            Light::Ambient { color, .. } | Light::Directional { color, .. } => *color,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity, .. } | Light::Directional { intensity, .. } => *intensity,
        }
    }

    pub fn casts_shadow(&self) -> bool {
        matches!(self, Light::Directional { shadow: Some(_), .. })
    }
}

/// Converts a packed `0xRRGGBB` colour into float components.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
