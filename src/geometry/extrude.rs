//! Extrusion of closed 2D contours into bevelled solids.
//!
//! The contours of one shape are expected in the usual font convention: filled
//! regions counter-clockwise, holes clockwise (in a y-up coordinate system).
//! With that convention the right-hand normal of every edge points away from
//! the filled area, which is the direction the bevel grows towards.
//!
//! The solid is built from a stack of layers. Each layer is the full set of
//! contours pushed outwards by a bevel amount and placed at a depth:
//!
//! ```text
//!   front bevel        body        back bevel
//!  -thickness .. 0   0 .. depth   depth .. depth + thickness
//! ```
//!
//! Caps are tessellated with lyon using the non-zero fill rule so overlapping
//! and nested contours resolve the same way they do in font rasterizers.

use std::f32::consts::FRAC_PI_2;

use anyhow::anyhow;
use cgmath::{InnerSpace, Vector2, Vector3};
use lyon::{
    math::point,
    path::Path,
    tessellation::{
        BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
    },
};

use crate::geometry::MeshData;

/// A closed polyline. The last point connects back to the first.
pub type Contour = Vec<Vector2<f32>>;

// Longest miter allowed on sharp corners, relative to the bevel size.
const MAX_MITER: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrudeOptions {
    pub depth: f32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            bevel_enabled: true,
            bevel_thickness: 0.2,
            bevel_size: 0.1,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

impl ExtrudeOptions {
    /// `(z, outward offset)` of every layer from front cap to back cap.
    pub(crate) fn layers(&self) -> Vec<(f32, f32)> {
        let (segments, thickness, size, offset) = if self.bevel_enabled {
            (
                self.bevel_segments,
                self.bevel_thickness,
                self.bevel_size,
                self.bevel_offset,
            )
        } else {
            (0, 0.0, 0.0, 0.0)
        };
        let bevel = |b: u32| {
            let t = b as f32 / segments as f32;
            (
                thickness * (t * FRAC_PI_2).cos(),
                size * (t * FRAC_PI_2).sin() + offset,
            )
        };

        let mut layers = Vec::with_capacity(segments as usize * 2 + 2);
        for b in 0..segments {
            let (z, bs) = bevel(b);
            layers.push((-z, bs));
        }
        layers.push((0.0, size + offset));
        layers.push((self.depth, size + offset));
        for b in (0..segments).rev() {
            let (z, bs) = bevel(b);
            layers.push((self.depth + z, bs));
        }
        layers
    }
}

/// Extrude `contours` along +z.
///
/// Contours with fewer than three distinct points are dropped, so an empty
/// input yields empty geometry rather than an error.
pub fn extrude(contours: &[Contour], options: &ExtrudeOptions) -> anyhow::Result<MeshData> {
    let contours: Vec<Contour> = contours
        .iter()
        .map(|c| dedup_contour(c))
        .filter(|c| c.len() >= 3)
        .collect();
    let mut mesh = MeshData::new();
    if contours.is_empty() {
        return Ok(mesh);
    }

    let layers = options.layers();
    let miters: Vec<Vec<Vector2<f32>>> = contours.iter().map(|c| miter_vectors(c)).collect();

    let (front_z, front_bs) = layers[0];
    let (back_z, back_bs) = layers[layers.len() - 1];
    let front = offset_all(&contours, &miters, front_bs);
    let back = offset_all(&contours, &miters, back_bs);
    add_cap(&mut mesh, &front, front_z, false)?;
    add_cap(&mut mesh, &back, back_z, true)?;

    for (contour, miter) in contours.iter().zip(miters.iter()) {
        add_walls(&mut mesh, contour, miter, &layers);
    }
    Ok(mesh)
}

/// Signed area, positive for counter-clockwise contours.
pub fn signed_area(contour: &[Vector2<f32>]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let a = contour[i];
            let b = contour[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

fn dedup_contour(contour: &[Vector2<f32>]) -> Contour {
    let mut out: Contour = Vec::with_capacity(contour.len());
    for p in contour {
        if out.last().is_none_or(|last| (*last - *p).magnitude2() > f32::EPSILON) {
            out.push(*p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).magnitude2() <= f32::EPSILON {
        out.pop();
    }
    out
}

fn edge_normal(from: Vector2<f32>, to: Vector2<f32>) -> Vector2<f32> {
    let d = (to - from).normalize();
    Vector2::new(d.y, -d.x)
}

/// Per-vertex direction that moves both adjacent edges outwards by one unit.
fn miter_vectors(contour: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let prev = contour[(i + n - 1) % n];
            let cur = contour[i];
            let next = contour[(i + 1) % n];
            let n1 = edge_normal(prev, cur);
            let n2 = edge_normal(cur, next);
            let sum = n1 + n2;
            if sum.magnitude2() < 1e-8 {
                // The contour folds back on itself.
                return n1;
            }
            let dir = sum.normalize();
            let cos_half = dir.dot(n1).max(1.0 / MAX_MITER);
            dir / cos_half
        })
        .collect()
}

fn offset_all(contours: &[Contour], miters: &[Vec<Vector2<f32>>], amount: f32) -> Vec<Contour> {
    contours
        .iter()
        .zip(miters.iter())
        .map(|(c, m)| c.iter().zip(m.iter()).map(|(p, v)| *p + *v * amount).collect())
        .collect()
}

fn add_cap(mesh: &mut MeshData, contours: &[Contour], z: f32, facing_back: bool) -> anyhow::Result<()> {
    let mut builder = Path::builder();
    for contour in contours {
        builder.begin(point(contour[0].x, contour[0].y));
        for p in &contour[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::tolerance(0.0001).with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| anyhow!("failed to tessellate cap: {:?}", e))?;

    let normal = if facing_back { [0.0, 0.0, 1.0] } else { [0.0, 0.0, -1.0] };
    let base = mesh.vertex_count() as u32;
    for [x, y] in &buffers.vertices {
        mesh.push_vertex([*x, *y, z], normal, [*x, *y]);
    }
    for tri in buffers.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]];
        let pa = Vector2::from(buffers.vertices[a as usize]);
        let pb = Vector2::from(buffers.vertices[b as usize]);
        let pc = Vector2::from(buffers.vertices[c as usize]);
        let ccw = signed_area(&[pa, pb, pc]) > 0.0;
        // Back caps face +z and need counter-clockwise triangles, front caps the opposite.
        if ccw == facing_back {
            mesh.push_triangle(base + a, base + b, base + c);
        } else {
            mesh.push_triangle(base + a, base + c, base + b);
        }
    }
    Ok(())
}

fn add_walls(
    mesh: &mut MeshData,
    contour: &[Vector2<f32>],
    miter: &[Vector2<f32>],
    layers: &[(f32, f32)],
) {
    let n = contour.len();
    let at = |i: usize, (z, bs): (f32, f32)| {
        let p = contour[i] + miter[i] * bs;
        Vector3::new(p.x, p.y, z)
    };
    for pair in layers.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        for i in 0..n {
            let j = (i + 1) % n;
            let a = at(i, lower);
            let b = at(j, lower);
            let c = at(j, upper);
            let d = at(i, upper);
            let normal = (c - a).cross(d - b);
            if normal.magnitude2() < 1e-14 {
                continue;
            }
            let normal: [f32; 3] = normal.normalize().into();
            let u0 = i as f32 / n as f32;
            let u1 = (i + 1) as f32 / n as f32;
            let ia = mesh.push_vertex(a.into(), normal, [u0, lower.0]);
            let ib = mesh.push_vertex(b.into(), normal, [u1, lower.0]);
            let ic = mesh.push_vertex(c.into(), normal, [u1, upper.0]);
            let id = mesh.push_vertex(d.into(), normal, [u0, upper.0]);
            mesh.push_triangle(ia, ib, ic);
            mesh.push_triangle(ia, ic, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f32, max: f32) -> Contour {
        vec![
            Vector2::new(min, min),
            Vector2::new(max, min),
            Vector2::new(max, max),
            Vector2::new(min, max),
        ]
    }

    fn flat(depth: f32) -> ExtrudeOptions {
        ExtrudeOptions {
            depth,
            bevel_enabled: false,
            ..Default::default()
        }
    }

    #[test]
    fn should_extrude_square_without_bevel() {
        let mesh = extrude(&[square(0.0, 1.0)], &flat(0.5)).unwrap();
        let bbox = mesh.bounding_box().unwrap();
        assert_eq!(bbox.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Vector3::new(1.0, 1.0, 0.5));
        // two caps of two triangles each and four walls of two triangles
        assert_eq!(mesh.triangle_count(), 2 + 2 + 8);
    }

    #[test]
    fn should_grow_bevel_outwards() {
        let options = ExtrudeOptions {
            depth: 0.2,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 5,
        };
        let mesh = extrude(&[square(0.0, 1.0)], &options).unwrap();
        let bbox = mesh.bounding_box().unwrap();
        assert!((bbox.min.x + 0.02).abs() < 1e-5);
        assert!((bbox.max.y - 1.02).abs() < 1e-5);
        assert!((bbox.min.z + 0.03).abs() < 1e-5);
        assert!((bbox.max.z - 0.23).abs() < 1e-5);
    }

    #[test]
    fn should_build_symmetric_layers() {
        let options = ExtrudeOptions {
            depth: 1.0,
            bevel_enabled: true,
            bevel_thickness: 0.1,
            bevel_size: 0.05,
            bevel_offset: 0.0,
            bevel_segments: 4,
        };
        let layers = options.layers();
        assert_eq!(layers.len(), 10);
        assert_eq!(layers[0], (-0.1, 0.0));
        assert_eq!(layers[layers.len() - 1], (1.1, 0.0));
        assert!(layers.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn should_point_wall_normals_away_from_fill() {
        let mesh = extrude(&[square(0.0, 1.0)], &flat(1.0)).unwrap();
        for (p, n) in mesh.positions.iter().zip(mesh.normals.iter()) {
            if n[2].abs() > 0.5 {
                continue;
            }
            let to_center = Vector3::new(0.5 - p[0], 0.5 - p[1], 0.0);
            assert!(to_center.dot(Vector3::from(*n)) < 0.0);
        }
    }

    #[test]
    fn should_orient_caps_along_their_normals() {
        let mesh = extrude(&[square(0.0, 1.0), square(0.25, 0.75).into_iter().rev().collect()], &flat(1.0)).unwrap();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vector3::from(mesh.positions[i as usize]));
            let n = Vector3::from(mesh.normals[tri[0] as usize]);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn should_leave_hole_uncovered() {
        let outer = square(0.0, 1.0);
        let hole: Contour = square(0.25, 0.75).into_iter().rev().collect();
        let mesh = extrude(&[outer, hole], &flat(1.0)).unwrap();
        let cap_area: f32 = mesh
            .indices
            .chunks(3)
            .filter(|tri| mesh.normals[tri[0] as usize][2] > 0.5)
            .map(|tri| {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                    let p = mesh.positions[i as usize];
                    Vector2::new(p[0], p[1])
                });
                signed_area(&[a, b, c])
            })
            .sum();
        assert!((cap_area - 0.75).abs() < 1e-4);
    }

    #[test]
    fn should_accept_degenerate_input() {
        let line = vec![Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 0.0)];
        let mesh = extrude(&[line, Vec::new()], &ExtrudeOptions::default()).unwrap();
        assert!(mesh.is_empty());
        assert!(extrude(&[], &ExtrudeOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn should_measure_signed_area() {
        assert_eq!(signed_area(&square(0.0, 2.0)), 4.0);
        let cw: Contour = square(0.0, 2.0).into_iter().rev().collect();
        assert_eq!(signed_area(&cw), -4.0);
    }
}
