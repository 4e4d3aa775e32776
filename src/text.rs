//! Extruded 3D text.
//!
//! [`TextGeometry`] turns a string into a solid mesh: glyph outlines are flattened by
//! the font, every shape is extruded along +z with an optional rounded bevel on
//! both faces, and the caps are triangulated with holes. [`TextLayoutBuilder`] stacks
//! one centered line of text per input string under a single group node.

use std::{f32::consts::FRAC_PI_2, sync::Arc};

use cgmath::{InnerSpace, Vector2, Vector3};

use crate::{
    data_structures::{
        instance::Instance,
        model::{Geometry, Material, Mesh},
        scene_graph::SceneNode,
    },
    resources::font::{Shape, TypefaceFont, signed_area},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextGeometryOptions {
    pub size: f32,
    /// Extrusion depth along +z, not counting the bevel.
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextGeometryOptions {
    fn default() -> Self {
        Self {
            size: 0.5,
            depth: 0.2,
            curve_segments: 12,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 5,
        }
    }
}

pub struct TextGeometry;

impl TextGeometry {
    /// Builds the extruded mesh of `text`, centered on its bounding box.
    pub fn new(text: &str, font: &TypefaceFont, options: &TextGeometryOptions) -> Geometry {
        let mut geometry = Geometry::default();
        for shape in font.generate_shapes(text, options.size, options.curve_segments) {
            geometry.merge(&extrude(&shape, options));
        }
        geometry.compute_vertex_normals();
        geometry.center();
        geometry.tex_coords = geometry.positions.iter().map(|p| [p[0], p[1]]).collect();
        geometry
    }
}

/// Builds a group of text lines, one child per line, top to bottom.
pub struct TextLayoutBuilder<'f> {
    font: &'f TypefaceFont,
    options: TextGeometryOptions,
    name: String,
}

impl<'f> TextLayoutBuilder<'f> {
    pub fn new(font: &'f TypefaceFont) -> Self {
        Self {
            font,
            options: TextGeometryOptions::default(),
            name: "text".to_string(),
        }
    }

    pub fn options(mut self, options: TextGeometryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Line `i` sits at `(0, -i * line_height, 0)` in the returned group. Every line
    /// shares `material`.
    pub fn build<S: AsRef<str>>(
        &self,
        lines: &[S],
        material: Arc<Material>,
        line_height: f32,
    ) -> SceneNode {
        let mut group = SceneNode::group(self.name.clone());
        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            let geometry = TextGeometry::new(line, self.font, &self.options);
            let mesh = Mesh {
                name: line.to_string(),
                geometry: Arc::new(geometry),
                material: material.clone(),
            };
            let position = Vector3::new(0.0, -(index as f32) * line_height, 0.0);
            group.add_child(
                SceneNode::mesh(format!("{}-line-{}", self.name, index), mesh)
                    .with_transform(Instance::from(position)),
            );
        }
        group
    }
}

fn extrude(shape: &Shape, options: &TextGeometryOptions) -> Geometry {
    let mut contour = shape.contour.clone();
    if signed_area(&contour) < 0.0 {
        contour.reverse();
    }
    let holes: Vec<Vec<Vector2<f32>>> = shape
        .holes
        .iter()
        .map(|hole| {
            let mut hole = hole.clone();
            if signed_area(&hole) > 0.0 {
                hole.reverse();
            }
            hole
        })
        .collect();

    let mut rings = vec![contour];
    rings.extend(holes);
    let points: Vec<Vector2<f32>> = rings.iter().flatten().copied().collect();
    let moves: Vec<Vector2<f32>> = rings.iter().flat_map(|ring| bevel_vectors(ring)).collect();
    let faces = triangulate(&rings);

    let segments = if options.bevel_enabled {
        options.bevel_segments.max(1)
    } else {
        0
    };
    let mut layers: Vec<(f32, f32)> = Vec::new();
    for b in 0..segments {
        let t = b as f32 / segments as f32;
        let z = options.bevel_thickness * (t * FRAC_PI_2).cos();
        let bs = options.bevel_size * (t * FRAC_PI_2).sin() + options.bevel_offset;
        layers.push((-z, bs));
    }
    let side_offset = if options.bevel_enabled {
        options.bevel_size + options.bevel_offset
    } else {
        0.0
    };
    layers.push((0.0, side_offset));
    layers.push((options.depth, side_offset));
    for b in (0..segments).rev() {
        let t = b as f32 / segments as f32;
        let z = options.bevel_thickness * (t * FRAC_PI_2).cos();
        let bs = options.bevel_size * (t * FRAC_PI_2).sin() + options.bevel_offset;
        layers.push((options.depth + z, bs));
    }

    let per_layer = points.len() as u32;
    let mut geometry = Geometry::default();
    for &(z, offset) in &layers {
        geometry.positions.extend(
            points
                .iter()
                .zip(&moves)
                .map(|(p, m)| [p.x + m.x * offset, p.y + m.y * offset, z]),
        );
    }

    // back cap faces -z, front cap faces +z
    let last = (layers.len() as u32 - 1) * per_layer;
    for [a, b, c] in &faces {
        geometry.indices.extend([*c as u32, *b as u32, *a as u32]);
    }
    for [a, b, c] in &faces {
        geometry
            .indices
            .extend([last + *a as u32, last + *b as u32, last + *c as u32]);
    }

    let mut ring_start = 0u32;
    for ring in &rings {
        let len = ring.len() as u32;
        for j in 0..len {
            let k = (j + 1) % len;
            for layer in 0..layers.len() as u32 - 1 {
                let lower = layer * per_layer + ring_start;
                let upper = lower + per_layer;
                let (a, b, c, d) = (lower + j, lower + k, upper + k, upper + j);
                geometry.indices.extend([a, b, c, a, c, d]);
            }
        }
        ring_start += len;
    }
    geometry
}

/// Outward miter direction of every vertex of a closed ring.
///
/// For counter-clockwise contours this points away from the filled area, for
/// clockwise holes into the hole; in both cases scaling by a positive offset grows
/// the glyph.
fn bevel_vectors(ring: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let current = ring[i];
            let next = ring[(i + 1) % n];
            let right = |d: Vector2<f32>| {
                let len = d.magnitude();
                if len > f32::EPSILON {
                    Vector2::new(d.y, -d.x) / len
                } else {
                    Vector2::new(0.0, 0.0)
                }
            };
            let n1 = right(current - prev);
            let n2 = right(next - current);
            let sum = n1 + n2;
            if sum.magnitude2() < 1e-12 {
                return n1;
            }
            let miter = sum.normalize();
            // keep sharp corners from shooting off
            miter / miter.dot(n1).max(0.25)
        })
        .collect()
}

fn cross(o: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_in_triangle(p: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

fn segments_cross(p1: Vector2<f32>, p2: Vector2<f32>, q1: Vector2<f32>, q2: Vector2<f32>) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Ear-clipping triangulation of `rings[0]` (counter-clockwise) minus `rings[1..]`
/// (clockwise holes).
///
/// Holes are first bridged into the outer polygon, which yields a single weakly simple
/// polygon. The returned triangles index into the concatenation of all rings and are
/// counter-clockwise.
fn triangulate(rings: &[Vec<Vector2<f32>>]) -> Vec<[usize; 3]> {
    let points: Vec<Vector2<f32>> = rings.iter().flatten().copied().collect();
    let mut starts = Vec::with_capacity(rings.len());
    let mut offset = 0;
    for ring in rings {
        starts.push(offset);
        offset += ring.len();
    }

    let mut polygon: Vec<usize> = (0..rings[0].len()).collect();

    // rightmost holes first, so later bridges can't cut through earlier ones
    let mut order: Vec<usize> = (1..rings.len()).collect();
    let rightmost = |r: usize| {
        (0..rings[r].len())
            .max_by(|&a, &b| rings[r][a].x.total_cmp(&rings[r][b].x))
            .unwrap_or(0)
    };
    order.sort_by(|&a, &b| {
        rings[b][rightmost(b)].x.total_cmp(&rings[a][rightmost(a)].x)
    });

    for hole in order {
        let ring = &rings[hole];
        let hole_start = starts[hole];
        let from = rightmost(hole);
        let anchor = points[hole_start + from];

        let edges_crossed = |target: Vector2<f32>| {
            let mut all_edges = polygon
                .iter()
                .zip(polygon.iter().cycle().skip(1))
                .map(|(&a, &b)| (points[a], points[b]))
                .chain((0..rings.len()).skip(1).flat_map(|r| {
                    let n = rings[r].len();
                    (0..n).map(move |i| (rings[r][i], rings[r][(i + 1) % n]))
                }));
            all_edges.any(|(a, b)| segments_cross(anchor, target, a, b))
        };
        let bridge = (0..polygon.len())
            .filter(|&i| !edges_crossed(points[polygon[i]]))
            .min_by(|&a, &b| {
                let da = (points[polygon[a]] - anchor).magnitude2();
                let db = (points[polygon[b]] - anchor).magnitude2();
                da.total_cmp(&db)
            })
            .or_else(|| {
                (0..polygon.len()).min_by(|&a, &b| {
                    let da = (points[polygon[a]] - anchor).magnitude2();
                    let db = (points[polygon[b]] - anchor).magnitude2();
                    da.total_cmp(&db)
                })
            });
        let Some(bridge) = bridge else { continue };

        let mut spliced = Vec::with_capacity(polygon.len() + ring.len() + 2);
        spliced.extend_from_slice(&polygon[..=bridge]);
        spliced.extend((0..=ring.len()).map(|i| hole_start + (from + i) % ring.len()));
        spliced.extend_from_slice(&polygon[bridge..]);
        polygon = spliced;
    }

    ear_clip(&points, polygon)
}

fn ear_clip(points: &[Vector2<f32>], mut polygon: Vec<usize>) -> Vec<[usize; 3]> {
    let mut triangles = Vec::with_capacity(polygon.len().saturating_sub(2));
    let mut misses = 0;
    let mut i = 0;
    while polygon.len() > 3 {
        let n = polygon.len();
        let (ia, ib, ic) = (polygon[(i + n - 1) % n], polygon[i % n], polygon[(i + 1) % n]);
        let (a, b, c) = (points[ia], points[ib], points[ic]);
        let turn = cross(a, b, c);
        if turn.abs() <= 1e-12 {
            // collinear or a zero-width spike: dropping `b` keeps the outline
            polygon.remove(i % n);
            misses = 0;
            continue;
        }
        let convex = turn > 0.0;
        let is_ear = convex
            && !polygon.iter().any(|&other| {
                other != ia
                    && other != ib
                    && other != ic
                    && points[other] != a
                    && points[other] != b
                    && points[other] != c
                    && point_in_triangle(points[other], a, b, c)
            });
        if is_ear {
            triangles.push([ia, ib, ic]);
            polygon.remove(i % n);
            misses = 0;
            if i > 0 {
                i -= 1;
            }
        } else if misses > n {
            // no ear in a full pass: the outline crosses itself. Clip the first convex
            // corner, or drop a vertex when only reflex ones are left.
            let corner = (0..n).find(|&j| {
                let (a, b, c) = (polygon[(j + n - 1) % n], polygon[j], polygon[(j + 1) % n]);
                cross(points[a], points[b], points[c]) > 1e-12
            });
            match corner {
                Some(j) => {
                    triangles.push([polygon[(j + n - 1) % n], polygon[j], polygon[(j + 1) % n]]);
                    polygon.remove(j);
                }
                None => {
                    polygon.remove(i % n);
                }
            }
            misses = 0;
            i = 0;
        } else {
            misses += 1;
            i = (i + 1) % n;
        }
    }
    if polygon.len() == 3 && cross(points[polygon[0]], points[polygon[1]], points[polygon[2]]) > 0.0 {
        triangles.push([polygon[0], polygon[1], polygon[2]]);
    }
    triangles
}
