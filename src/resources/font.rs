//! Typeface fonts.
//!
//! Fonts come as "typeface" JSON: a map of glyphs, each with an advance (`ha`) and an
//! outline string (`o`) of drawing commands in font units:
//!
//! * `m x y` starts a new sub-path
//! * `l x y` draws a line
//! * `q x y cpx cpy` draws a quadratic curve ending in `x y`
//! * `b x y cp1x cp1y cp2x cp2y` draws a cubic curve ending in `x y`
//! * `z` closes the current sub-path
//!
//! [`TypefaceFont::generate_shapes`] turns a string into flattened, planar [`Shape`]s
//! that the text builder extrudes.

use std::collections::HashMap;

use cgmath::Vector2;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontBoundingBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

#[derive(Clone, Debug, Deserialize)]
struct RawGlyph {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypeface {
    glyphs: HashMap<String, RawGlyph>,
    resolution: f32,
    bounding_box: FontBoundingBox,
    #[serde(default)]
    underline_thickness: f32,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Vector2<f32>),
    LineTo(Vector2<f32>),
    QuadraticTo {
        control: Vector2<f32>,
        to: Vector2<f32>,
    },
    CubicTo {
        control1: Vector2<f32>,
        control2: Vector2<f32>,
        to: Vector2<f32>,
    },
    Close,
}

#[derive(Clone, Debug)]
pub struct Glyph {
    pub advance: f32,
    pub outline: Vec<PathCommand>,
}

/// A filled planar region: one outer contour and any number of holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub contour: Vec<Vector2<f32>>,
    pub holes: Vec<Vec<Vector2<f32>>>,
}

#[derive(Clone, Debug)]
pub struct TypefaceFont {
    pub family_name: String,
    pub resolution: f32,
    pub bounding_box: FontBoundingBox,
    pub underline_thickness: f32,
    glyphs: HashMap<char, Glyph>,
}

impl TypefaceFont {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawTypeface = serde_json::from_slice(bytes)?;
        let glyphs = raw
            .glyphs
            .into_iter()
            .filter_map(|(key, glyph)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((
                        c,
                        Glyph {
                            advance: glyph.ha,
                            outline: parse_outline(glyph.o.as_deref().unwrap_or("")),
                        },
                    )),
                    _ => {
                        log::warn!("Skipping glyph with multi-character key {:?}.", key);
                        None
                    }
                }
            })
            .collect();
        Ok(Self {
            family_name: raw.family_name.unwrap_or_else(|| "unknown".to_string()),
            resolution: raw.resolution,
            bounding_box: raw.bounding_box,
            underline_thickness: raw.underline_thickness,
            glyphs,
        })
    }

    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Distance between two baselines for text of the given size.
    pub fn line_height(&self, size: f32) -> f32 {
        let bb = &self.bounding_box;
        (bb.y_max - bb.y_min + self.underline_thickness) * size / self.resolution
    }

    /// Lays out `text` at `size` and flattens every glyph outline.
    ///
    /// Curves are split into `curve_segments` straight pieces. Characters without a
    /// glyph fall back to `?`; if that is missing as well they are skipped.
    pub fn generate_shapes(&self, text: &str, size: f32, curve_segments: u32) -> Vec<Shape> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);
        let mut shapes = Vec::new();
        let mut offset = Vector2::new(0.0, 0.0);

        for c in text.chars() {
            if c == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }
            let glyph = match self.glyph(c).or_else(|| self.glyph('?')) {
                Some(glyph) => glyph,
                None => {
                    log::error!(
                        "Character {:?} has no glyph in font {} and there is no '?' fallback.",
                        c,
                        self.family_name
                    );
                    continue;
                }
            };
            let paths = flatten(&glyph.outline, scale, offset, curve_segments.max(1));
            shapes.extend(to_shapes(paths));
            offset.x += glyph.advance * scale;
        }
        shapes
    }
}

fn parse_outline(outline: &str) -> Vec<PathCommand> {
    let tokens: Vec<&str> = outline.split_whitespace().collect();
    let mut commands = Vec::new();
    let mut i = 0;
    let read = |i: &mut usize, count: usize| -> Option<Vec<f32>> {
        let values = tokens
            .get(*i..*i + count)?
            .iter()
            .map(|v| v.parse::<f32>().ok())
            .collect::<Option<Vec<_>>>()?;
        *i += count;
        Some(values)
    };
    while i < tokens.len() {
        let action = tokens[i];
        i += 1;
        let command = match action {
            "m" => read(&mut i, 2).map(|v| PathCommand::MoveTo(Vector2::new(v[0], v[1]))),
            "l" => read(&mut i, 2).map(|v| PathCommand::LineTo(Vector2::new(v[0], v[1]))),
            "q" => read(&mut i, 4).map(|v| PathCommand::QuadraticTo {
                to: Vector2::new(v[0], v[1]),
                control: Vector2::new(v[2], v[3]),
            }),
            "b" => read(&mut i, 6).map(|v| PathCommand::CubicTo {
                to: Vector2::new(v[0], v[1]),
                control1: Vector2::new(v[2], v[3]),
                control2: Vector2::new(v[4], v[5]),
            }),
            "z" => Some(PathCommand::Close),
            other => {
                log::warn!("Unknown outline command {:?}, ignoring the rest of the glyph.", other);
                None
            }
        };
        match command {
            Some(command) => commands.push(command),
            None => break,
        }
    }
    commands
}

fn flatten(
    outline: &[PathCommand],
    scale: f32,
    offset: Vector2<f32>,
    segments: u32,
) -> Vec<Vec<Vector2<f32>>> {
    let mut paths: Vec<Vec<Vector2<f32>>> = Vec::new();
    let mut current: Vec<Vector2<f32>> = Vec::new();
    let place = |p: Vector2<f32>| p * scale + offset;
    let push = |current: &mut Vec<Vector2<f32>>, p: Vector2<f32>| {
        if current.last().map_or(true, |last| (*last - p).x.abs() > 1e-6 || (*last - p).y.abs() > 1e-6) {
            current.push(p);
        }
    };

    for command in outline {
        match *command {
            PathCommand::MoveTo(to) => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
                current.push(place(to));
            }
            PathCommand::LineTo(to) => push(&mut current, place(to)),
            PathCommand::QuadraticTo { control, to } => {
                let start = current.last().copied().unwrap_or(place(to));
                let (control, to) = (place(control), place(to));
                for s in 1..=segments {
                    let t = s as f32 / segments as f32;
                    let u = 1.0 - t;
                    push(&mut current, start * (u * u) + control * (2.0 * u * t) + to * (t * t));
                }
            }
            PathCommand::CubicTo {
                control1,
                control2,
                to,
            } => {
                let start = current.last().copied().unwrap_or(place(to));
                let (c1, c2, to) = (place(control1), place(control2), place(to));
                for s in 1..=segments {
                    let t = s as f32 / segments as f32;
                    let u = 1.0 - t;
                    push(
                        &mut current,
                        start * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + to * (t * t * t),
                    );
                }
            }
            PathCommand::Close => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }
    for path in paths.iter_mut() {
        // closing point duplicates the start
        if path.len() > 1 && path.first() == path.last() {
            path.pop();
        }
    }
    paths.retain(|path| path.len() >= 3);
    paths
}

/// Signed area of a closed polygon, positive for counter-clockwise winding.
pub fn signed_area(points: &[Vector2<f32>]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

pub fn contains_point(polygon: &[Vector2<f32>], p: Vector2<f32>) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Groups the sub-paths of one glyph into solids and holes.
///
/// The winding of the largest sub-path defines what a solid looks like; sub-paths
/// with the opposite winding become holes of the solid that contains them.
fn to_shapes(paths: Vec<Vec<Vector2<f32>>>) -> Vec<Shape> {
    let solid_sign = paths
        .iter()
        .map(|p| signed_area(p))
        .fold(0.0f32, |largest, area| if area.abs() > largest.abs() { area } else { largest })
        .signum();
    let (solids, holes): (Vec<_>, Vec<_>) = paths
        .into_iter()
        .partition(|p| signed_area(p).signum() == solid_sign);

    let mut shapes: Vec<Shape> = solids
        .into_iter()
        .map(|contour| Shape {
            contour,
            holes: Vec::new(),
        })
        .collect();
    for hole in holes {
        let owner = shapes
            .iter_mut()
            .rev()
            .find(|shape| contains_point(&shape.contour, hole[0]));
        match owner {
            Some(shape) => shape.holes.push(hole),
            None => log::warn!("Dropping a glyph hole that lies outside of every contour."),
        }
    }
    shapes
}
