use std::{path::Path, sync::Arc};

use cgmath::{Euler, Quaternion, Vector3};

use crate::{
    data_structures::{
        instance::Instance,
        model::{Geometry, Material, Mesh},
        scene_graph::{Payload, SceneNode},
    },
    resources::{LoadError, load_binary, sibling},
};

/// A decoded model: the node tree of the file's default scene.
///
/// Geometry and materials are behind `Arc`s, so [`MeshAsset::instantiate`] is cheap
/// and every instance shares the decoded buffers.
#[derive(Clone, Debug)]
pub struct MeshAsset {
    pub name: String,
    pub root: SceneNode,
}

impl MeshAsset {
    pub fn new(name: impl Into<String>, root: SceneNode) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    /// A fresh, detached copy of the model's node tree.
    pub fn instantiate(&self) -> SceneNode {
        self.root.clone()
    }

    /// Number of drawable primitives in the model.
    pub fn mesh_count(&self) -> usize {
        fn count(node: &SceneNode) -> usize {
            let own = usize::from(matches!(node.payload, Payload::Mesh(_)));
            own + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

/// Parses a `.glb`/`.gltf` file, fetching external buffers next to `source`.
pub async fn load_gltf(root: &Path, source: &str, bytes: &[u8]) -> Result<MeshAsset, LoadError> {
    let gltf_error = |error| LoadError::Gltf {
        path: source.to_string(),
        error,
    };
    let gltf = gltf::Gltf::from_slice(bytes).map_err(gltf_error)?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => return Err(gltf_error(gltf::Error::MissingBlob)),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(gltf_error(gltf::Error::UnsupportedScheme));
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(root, &sibling(source, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    Ok(decode(&gltf.document, &buffer_data, source))
}

/// Builds the node tree of the default scene (or the first scene) of `document`.
pub fn decode(document: &gltf::Document, buffers: &[Vec<u8>], name: &str) -> MeshAsset {
    let mut root = SceneNode::group(name);
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                root.add_child(to_scene_node(node, buffers));
            }
        }
        None => log::warn!("{} contains no scene, the model will be empty", name),
    }
    MeshAsset::new(name, root)
}

fn to_scene_node(node: gltf::Node<'_>, buffers: &[Vec<u8>]) -> SceneNode {
    let (translation, [x, y, z, w], scale) = node.transform().decomposed();
    let transform = Instance {
        position: Vector3::from(translation),
        rotation: Euler::from(Quaternion::new(w, x, y, z)),
        scale: Vector3::from(scale),
    };
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node-{}", node.index()));
    let mut scene_node = SceneNode::group(name.clone()).with_transform(transform);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(mesh) = read_primitive(&primitive, buffers, &name) {
                scene_node.add_child(SceneNode::mesh(
                    format!("{}-primitive-{}", name, primitive.index()),
                    mesh,
                ));
            }
        }
    }
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers));
    }
    scene_node
}

fn read_primitive(primitive: &gltf::Primitive<'_>, buffers: &[Vec<u8>], name: &str) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Skipping primitive {} of {}: only triangle lists are supported, got {:?}",
            primitive.index(),
            name,
            primitive.mode()
        );
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = match reader.read_positions() {
        Some(positions) => positions.collect(),
        None => {
            log::warn!("Primitive {} of {} has no positions", primitive.index(), name);
            return None;
        }
    };
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = reader
        .read_indices()
        .map(|indices| indices.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let mut geometry = Geometry {
        positions,
        normals,
        tex_coords,
        indices,
    };
    if geometry.normals.len() != geometry.positions.len() {
        geometry.compute_vertex_normals();
    }
    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    Some(Mesh {
        name: name.to_string(),
        geometry: Arc::new(geometry),
        material: Arc::new(Material::Standard { base_color }),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;

    use super::*;

    /// Packs a JSON document and a binary chunk into a `.glb` container.
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn triangle_glb() -> Vec<u8> {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"name": "Heart", "mesh": 0, "translation": [1.0, 2.0, 3.0]}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]}],
            "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}}],
            "buffers": [{"byteLength": 42}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ]
        }"#;
        let mut bin = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        glb(json, &bin)
    }

    #[tokio::test]
    async fn decodes_embedded_triangle() {
        let asset = load_gltf(Path::new("."), "/models/tri.glb", &triangle_glb())
            .await
            .unwrap();
        assert_eq!(asset.mesh_count(), 1);
        let node = &asset.root.children[0];
        assert_eq!(node.name, "Heart");
        assert_eq!(node.transform.position, Vector3::new(1.0, 2.0, 3.0));

        let Payload::Mesh(mesh) = &node.children[0].payload else {
            panic!("expected a mesh primitive");
        };
        assert_eq!(mesh.geometry.triangle_count(), 1);
        // missing normals are generated from the winding
        let normal = Vector3::from(mesh.geometry.normals[0]);
        assert!((normal - Vector3::unit_z()).magnitude() < 1e-6);
        assert!(matches!(
            *mesh.material,
            Material::Standard { base_color } if base_color == [1.0, 0.0, 0.0, 1.0]
        ));
    }

    #[tokio::test]
    async fn garbage_is_a_gltf_error() {
        let err = load_gltf(Path::new("."), "/models/x.glb", b"nope").await.unwrap_err();
        assert!(matches!(err, LoadError::Gltf { .. }));
    }
}
