//! Per-instance transforms for GPU instancing.
//!
//! Every donut in the field is one [`Instance`]; the text mesh is drawn with a
//! single identity instance. The transforms are packed into [`InstanceRaw`]
//! and streamed to the vertex shader through a second vertex buffer.

use cgmath::{One, Rad, Rotation3};

use crate::data_structures::model;

/// Position, rotation (as quaternion) and scale of one drawn copy of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Build from Euler angles applied in X, Y, Z order and a uniform scale.
    pub fn from_euler(
        position: cgmath::Vector3<f32>,
        rotation: cgmath::Vector3<f32>,
        scale: f32,
    ) -> Self {
        let rotation = cgmath::Quaternion::from_angle_x(Rad(rotation.x))
            * cgmath::Quaternion::from_angle_y(Rad(rotation.y))
            * cgmath::Quaternion::from_angle_z(Rad(rotation.z));
        Self {
            position,
            rotation,
            scale: cgmath::Vector3::new(scale, scale, scale),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            // only valid for uniform scales, which is all this crate uses
            normal: cgmath::Matrix3::from(self.rotation).into(),
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // model matrix columns at 5-8, normal matrix columns at 9-11
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3
    ];
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
