//! Node transforms and their raw, renderer-facing representation.
//!
//! Every scene node carries a local [`Instance`]. World transforms are plain
//! matrices composed parent-first by the scene graph and handed to renderers as
//! [`InstanceRaw`], which is `Pod` so it can be uploaded to a vertex buffer as-is.

use cgmath::{Euler, Matrix, Rad, SquareMatrix};

/// Local transformation of a node: position, rotation (XYZ euler) and non-uniform scale.
///
/// Rotation is stored as euler angles rather than a quaternion so that per-axis
/// spins (e.g. `rotation.y += dt`) accumulate exactly without drifting into the
/// other axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: Euler<Rad<f32>>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: Euler::new(Rad(0.0), Rad(0.0), Rad(0.0)),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_position(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: cgmath::Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the same scale factor on all three axes.
    pub fn set_uniform_scale(&mut self, factor: f32) {
        self.scale = cgmath::Vector3::new(factor, factor, factor);
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(cgmath::Quaternion::from(self.rotation))
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is what a renderer uploads per draw: the world matrix, the
 * matching normal matrix and the handedness of the world transform (mirrored
 * scales flip triangle winding).
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
    pub handedness: f32,
}

impl InstanceRaw {
    pub fn from_world(world: &cgmath::Matrix4<f32>) -> Self {
        let linear = cgmath::Matrix3::from_cols(
            world.x.truncate(),
            world.y.truncate(),
            world.z.truncate(),
        );
        // Non-uniform scales need the inverse transpose, otherwise normals skew.
        let normal = linear
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(cgmath::Matrix3::identity);
        InstanceRaw {
            model: (*world).into(),
            normal: normal.into(),
            handedness: world.determinant().signum(),
        }
    }
}

impl From<&Instance> for InstanceRaw {
    fn from(instance: &Instance) -> Self {
        Self::from_world(&instance.to_matrix())
    }
}
