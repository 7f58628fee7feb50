use std::f32::consts::TAU;

use cgmath::{InnerSpace, Vector3};

use crate::geometry::MeshData;

/// Parameters of a closed torus lying in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorusOptions {
    /// Distance from the torus centre to the centre of the tube.
    pub radius: f32,
    /// Radius of the tube.
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusOptions {
    /// The donut used throughout the scene.
    fn default() -> Self {
        Self {
            radius: 0.3,
            tube: 0.2,
            radial_segments: 20,
            tubular_segments: 45,
        }
    }
}

pub fn torus(options: TorusOptions) -> MeshData {
    let radial = options.radial_segments.max(3);
    let tubular = options.tubular_segments.max(3);
    let mut mesh = MeshData::new();

    for j in 0..=radial {
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let v = j as f32 / radial as f32 * TAU;

            let ring = options.radius + options.tube * v.cos();
            let position = Vector3::new(ring * u.cos(), ring * u.sin(), options.tube * v.sin());
            let center = Vector3::new(options.radius * u.cos(), options.radius * u.sin(), 0.0);
            let normal = (position - center).normalize();

            mesh.push_vertex(
                position.into(),
                normal.into(),
                [i as f32 / tubular as f32, j as f32 / radial as f32],
            );
        }
    }

    // The seam vertices are duplicated so that uvs stay continuous.
    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.push_triangle(a, b, d);
            mesh.push_triangle(b, c, d);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_expected_topology() {
        let mesh = torus(TorusOptions::default());
        assert_eq!(mesh.vertex_count(), 21 * 46);
        assert_eq!(mesh.triangle_count(), 2 * 20 * 45);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn should_fit_inside_outer_radius() {
        let options = TorusOptions::default();
        let mesh = torus(options);
        let bbox = mesh.bounding_box().unwrap();
        let outer = options.radius + options.tube;
        assert!((bbox.max.x - outer).abs() < 1e-4);
        assert!((bbox.min.y + outer).abs() < 1e-2);
        assert!((bbox.max.z - options.tube).abs() < 1e-2);
    }

    #[test]
    fn should_point_normals_away_from_tube_center() {
        let mesh = torus(TorusOptions::default());
        for (p, n) in mesh.positions.iter().zip(mesh.normals.iter()) {
            let n = Vector3::from(*n);
            assert!((n.magnitude() - 1.0).abs() < 1e-4);
            let p = Vector3::from(*p);
            let planar = Vector3::new(p.x, p.y, 0.0);
            let center = planar.normalize() * 0.3;
            assert!((p - center).dot(n) > 0.0);
        }
    }

    #[test]
    fn should_wind_triangles_outwards() {
        let mesh = torus(TorusOptions::default());
        for tri in mesh.indices.chunks(3).take(200) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vector3::from(mesh.positions[i as usize]));
            let face = (b - a).cross(c - a);
            if face.magnitude2() < 1e-12 {
                continue;
            }
            let n = Vector3::from(mesh.normals[tri[0] as usize]);
            assert!(face.dot(n) > 0.0);
        }
    }
}
