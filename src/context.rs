use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::{Camera, CameraResources, OrbitController, Projection},
    data_structures::{model, texture},
    pipelines::Pipelines,
    viewport,
};

pub const FOVY_DEGREES: f32 = 75.0;
pub const ZNEAR: f32 = 0.1;
pub const ZFAR: f32 = 100.0;

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub pipelines: Pipelines,
    pub matcap_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = viewport::render_target_size(window.inner_size(), window.scale_factor());

        log::info!("setting up wgpu for a {}x{} target", size.width, size.height);
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create the surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device and queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The matcap is uploaded as sRGB, so an sRGB surface keeps the
        // colours as painted. Other formats come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(FOVY_DEGREES),
            ZNEAR,
            ZFAR,
        );
        let camera = CameraResources::new(
            &device,
            Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0)),
            OrbitController::new(config.height),
            &projection,
        );

        let matcap_layout = model::matcap_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            config.format,
            &matcap_layout,
            &camera.bind_group_layout,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            pipelines,
            matcap_layout,
            clear_colour: wgpu::Color::BLACK,
            window,
            depth_texture,
        })
    }

    /// The size the surface should have for the window's current size and
    /// scale factor.
    pub fn render_target_size(&self) -> PhysicalSize<u32> {
        viewport::render_target_size(self.window.inner_size(), self.window.scale_factor())
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Push the camera state to its uniform buffer.
    pub fn write_camera(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }
}

/// The part of the [`Context`] that flow constructors get to see.
///
/// Device and queue are reference counted internally, so this is a cheap
/// clone that can be moved into an async constructor.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub matcap_layout: wgpu::BindGroupLayout,
    pub color_format: wgpu::TextureFormat,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            matcap_layout: ctx.matcap_layout.clone(),
            color_format: ctx.config.format,
        }
    }
}
