//! CPU-side geometry and material descriptions.
//!
//! A [`Geometry`] is an indexed triangle list. Geometries are immutable once built
//! and shared between nodes through `Arc`, e.g. all text lines of a group share
//! one [`Material`] and every heart instance shares the decoded mesh.

use std::sync::Arc;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::data_structures::texture::TextureAsset;

/// Axis aligned bounding box of a set of positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// An upright plane in the xy-plane centered on the origin, facing +z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (w, h) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![[-w, h, 0.0], [w, h, 0.0], [-w, -h, 0.0], [w, -h, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tex_coords: vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut positions = self.positions.iter().map(|&p| Vector3::from(p));
        let first = positions.next()?;
        let (min, max) = positions.fold((first, first), |(min, max), p| {
            (
                Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });
        Some(BoundingBox { min, max })
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        for position in self.positions.iter_mut() {
            *position = (Vector3::from(*position) + offset).into();
        }
    }

    /// Moves the geometry so that its bounding box is centered on the origin.
    ///
    /// Returns the offset that was applied. Empty geometries are left untouched.
    pub fn center(&mut self) -> Vector3<f32> {
        match self.bounding_box() {
            Some(bounds) => {
                let offset = -bounds.center();
                self.translate(offset);
                offset
            }
            None => Vector3::zero(),
        }
    }

    /// Area weighted smooth normals from the triangle list.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3::zero(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vector3::from(self.positions[a]);
            let pb = Vector3::from(self.positions[b]);
            let pc = Vector3::from(self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n: Vector3<f32>| {
                if n.magnitude2() > 0.0 {
                    n.normalize().into()
                } else {
                    [0.0, 0.0, 1.0]
                }
            })
            .collect();
    }

    /// Appends `other`, rebasing its indices onto the current vertex count.
    pub fn merge(&mut self, other: &Geometry) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.tex_coords.extend_from_slice(&other.tex_coords);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

/// Shading description of a mesh. Renderers decide how to realise each variant.
#[derive(Clone, Debug)]
pub enum Material {
    /// Lit material decoded from a model file.
    Standard { base_color: [f32; 4] },
    /// Unlit, textured material.
    Basic {
        map: Arc<TextureAsset>,
        transparent: bool,
        alpha_test: f32,
        double_sided: bool,
    },
    /// Matcap shading; `matcap` names the image source the renderer samples from.
    Matcap { matcap: String },
}

impl Default for Material {
    fn default() -> Self {
        Material::Standard {
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// One drawable primitive of a mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_moves_bounding_box_to_origin() {
        let mut geometry = Geometry {
            positions: vec![[1.0, 2.0, 3.0], [3.0, 6.0, 4.0]],
            ..Default::default()
        };
        let offset = geometry.center();
        assert_eq!(offset, Vector3::new(-2.0, -4.0, -3.5));
        let bounds = geometry.bounding_box().unwrap();
        assert_eq!(bounds.center(), Vector3::zero());
        assert_eq!(bounds.size(), Vector3::new(2.0, 4.0, 1.0));
    }

    #[test]
    fn empty_geometry_has_no_bounds() {
        let mut geometry = Geometry::default();
        assert!(geometry.bounding_box().is_none());
        assert_eq!(geometry.center(), Vector3::zero());
    }

    #[test]
    fn plane_normals_face_the_viewer() {
        let mut plane = Geometry::plane(5.0, 5.0);
        plane.compute_vertex_normals();
        assert!(plane.normals.iter().all(|n| n[2] > 0.99));
        assert_eq!(plane.triangle_count(), 2);
    }
}
