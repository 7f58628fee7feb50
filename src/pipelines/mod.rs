//! Render pipelines owned by the [`crate::context::Context`].
//!
//! There is a single pipeline: everything in the scene shares the matcap
//! material, so the text and the donuts go through the same shader.

pub mod matcap;

#[derive(Debug)]
pub struct Pipelines {
    pub matcap: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        matcap_bind_group_layout: &wgpu::BindGroupLayout,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            matcap: matcap::mk_matcap_pipeline(
                device,
                color_format,
                matcap_bind_group_layout,
                camera_bind_group_layout,
            ),
        }
    }
}
