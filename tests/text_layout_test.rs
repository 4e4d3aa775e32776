use std::sync::Arc;

use heart_flow::{
    data_structures::{model::Material, scene_graph::Payload},
    text::{TextGeometry, TextGeometryOptions, TextLayoutBuilder},
};

use crate::common::test_utils::block_font;

mod common;

fn matcap() -> Arc<Material> {
    Arc::new(Material::Matcap {
        matcap: "textures/matcaps/8.png".to_string(),
    })
}

#[test]
fn one_centered_line_per_string() {
    let font = block_font();
    let lines = ["a", "bb", "ccc", "dddd"];
    let group = TextLayoutBuilder::new(&font).build(&lines, matcap(), 2.0);
    assert!(group.is_group());
    assert_eq!(group.children.len(), 4);

    let mut shared = None;
    for (i, line) in group.children.iter().enumerate() {
        assert_eq!(line.transform.position.y, -(i as f32) * 2.0);
        assert_eq!(line.transform.position.x, 0.0);
        let Payload::Mesh(mesh) = &line.payload else {
            panic!("line {} is not a mesh", i);
        };
        let center = mesh.geometry.bounding_box().unwrap().center();
        assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5 && center.z.abs() < 1e-5);
        // every line points at the same material
        let material_ptr = Arc::as_ptr(&mesh.material);
        assert_eq!(*shared.get_or_insert(material_ptr), material_ptr);
    }
}

#[test]
fn the_greeting_is_stacked_one_and_a_half_apart() {
    let font = block_font();
    let lines = [
        "Maman",
        "Apsveicu",
        "Tevi",
        "Valentindiena",
        "PS: Maman ei Bezdet!!!",
        "Atbildot uz tavu jautajumu,",
        "Talab, kad gribu sutit BEZDET!!!",
    ];
    let group = TextLayoutBuilder::new(&font).build(&lines, matcap(), 1.5);
    let offsets: Vec<f32> = group
        .children
        .iter()
        .map(|line| line.transform.position.y)
        .collect();
    assert_eq!(offsets, [0.0, -1.5, -3.0, -4.5, -6.0, -7.5, -9.0]);
}

#[test]
fn longer_lines_are_wider_but_equally_deep() {
    let font = block_font();
    let options = TextGeometryOptions::default();
    let short = TextGeometry::new("??", &font, &options).bounding_box().unwrap();
    let long = TextGeometry::new("????", &font, &options).bounding_box().unwrap();
    assert!(long.size().x > short.size().x * 1.5);
    let depth = options.depth + 2.0 * options.bevel_thickness;
    assert!((short.size().z - depth).abs() < 1e-5);
    assert!((long.size().z - depth).abs() < 1e-5);
}

#[test]
fn glyph_holes_are_not_filled() {
    let font = block_font();
    let options = TextGeometryOptions {
        bevel_enabled: false,
        ..Default::default()
    };
    let solid = TextGeometry::new("?", &font, &options);
    let ring = TextGeometry::new("o", &font, &options);
    // a ring needs more triangles for its caps and an extra set of side walls
    assert!(ring.triangle_count() > solid.triangle_count());
    // nothing is drawn over the middle of the hole on the front cap
    let front_z = options.depth / 2.0;
    let covers_center = ring.indices.chunks_exact(3).any(|tri| {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| ring.positions[i as usize]);
        let on_cap = [a, b, c].iter().all(|p| (p[2] - front_z).abs() < 1e-5);
        on_cap && contains([a, b, c], [0.0, 0.0])
    });
    assert!(!covers_center);
}

fn contains(tri: [[f32; 3]; 3], p: [f32; 2]) -> bool {
    let cross = |o: [f32; 3], a: [f32; 3]| (a[0] - o[0]) * (p[1] - o[1]) - (a[1] - o[1]) * (p[0] - o[0]);
    let d = [cross(tri[0], tri[1]), cross(tri[1], tri[2]), cross(tri[2], tri[0])];
    d.iter().all(|v| *v > 0.0) || d.iter().all(|v| *v < 0.0)
}

#[test]
fn empty_lines_still_get_a_node() {
    let font = block_font();
    let group = TextLayoutBuilder::new(&font).build(&["", "?"], matcap(), 1.5);
    assert_eq!(group.children.len(), 2);
    let Payload::Mesh(mesh) = &group.children[0].payload else {
        panic!("empty line is still a mesh node");
    };
    assert_eq!(mesh.geometry.vertex_count(), 0);
}
