//! CPU-side triangle geometry.
//!
//! Everything in here is plain data so that meshes can be generated, centred
//! and inspected without a GPU. Uploading happens later through
//! [`crate::data_structures::model::Mesh::from_data`].
//!
//! - `torus` generates the donut mesh
//! - `extrude` turns closed 2D contours into bevelled solids (used for text)

pub mod extrude;
pub mod torus;

use cgmath::Vector3;

use crate::data_structures::model::ModelVertex;

/// Axis aligned bounding box.
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

/// Indexed triangle list with per-vertex normals and texture coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Push a vertex and return its index.
    pub fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// `None` for geometry without vertices.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut positions = self.positions.iter().map(|p| Vector3::from(*p));
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
        for p in self.positions.iter_mut() {
            p[0] += offset.x;
            p[1] += offset.y;
            p[2] += offset.z;
        }
    }

    /// Translate the geometry so that its bounding box is centred at the origin.
    ///
    /// Returns the applied offset. Empty geometry is left untouched.
    pub fn center(&mut self) -> Vector3<f32> {
        match self.bounding_box() {
            Some(bbox) => {
                let offset = -bbox.center();
                self.translate(offset);
                offset
            }
            None => Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Append `other`, re-basing its indices.
    pub fn merge(&mut self, other: &MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Interleave into the layout the render pipeline expects.
    pub fn to_vertices(&self) -> Vec<ModelVertex> {
        self.positions
            .iter()
            .zip(self.normals.iter())
            .zip(self.uvs.iter())
            .map(|((position, normal), tex_coords)| ModelVertex {
                position: *position,
                tex_coords: *tex_coords,
                normal: *normal,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        let mut mesh = MeshData::new();
        let n = [0.0, 0.0, 1.0];
        let a = mesh.push_vertex([1.0, 1.0, 0.0], n, [0.0, 0.0]);
        let b = mesh.push_vertex([5.0, 1.0, 0.0], n, [1.0, 0.0]);
        let c = mesh.push_vertex([5.0, 3.0, 2.0], n, [1.0, 1.0]);
        let d = mesh.push_vertex([1.0, 3.0, 2.0], n, [0.0, 1.0]);
        mesh.push_triangle(a, b, c);
        mesh.push_triangle(a, c, d);
        mesh
    }

    #[test]
    fn should_center_on_bounding_box() {
        let mut mesh = quad();
        let offset = mesh.center();
        assert_eq!(offset, Vector3::new(-3.0, -2.0, -1.0));
        let bbox = mesh.bounding_box().unwrap();
        assert_eq!(bbox.min, Vector3::new(-2.0, -1.0, -1.0));
        assert_eq!(bbox.max, Vector3::new(2.0, 1.0, 1.0));
    }

    #[test]
    fn should_ignore_centering_empty_geometry() {
        let mut mesh = MeshData::new();
        assert!(mesh.bounding_box().is_none());
        assert_eq!(mesh.center(), Vector3::new(0.0, 0.0, 0.0));
        assert!(mesh.is_empty());
    }

    #[test]
    fn should_rebase_indices_on_merge() {
        let mut mesh = quad();
        mesh.merge(&quad());
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(mesh.to_vertices().len(), 8);
    }
}
