//! The event loop and the flows it drives.
//!
//! A flow is one self-contained part of the application. It reacts to input,
//! keeps its part of the shared state up to date and says what should be
//! drawn. [`App`] owns the GPU [`Context`], the shared state and the flows and
//! forwards winit events to them.
//!
//! Every frame:
//! 1. window events reach the camera controller and `on_window_events`
//! 2. `on_render` of every flow is collected into one list of draw items
//! 3. the items are drawn with the matcap pipeline and the frame is presented
//! 4. the camera is advanced and `on_update` runs
//!
//! Asynchronous work (asset loads) never blocks the loop. Its results come
//! back as custom events, drained from the tokio executor on native and sent
//! through the event loop proxy on the web, and are offered to the flows in
//! order until one of them consumes the event.

use std::{iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::{Context, InitContext},
    data_structures::{model::DrawModel, texture::Texture},
    render::Instanced,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub const WINDOW_TITLE: &str = "matcap donuts";

/// Work whose result is delivered to the flows as a custom event.
///
/// Native builds run it on a tokio worker, so it has to be `Send`.
#[cfg(not(target_arch = "wasm32"))]
pub type EventFuture<E> = Box<dyn Future<Output = E> + Send>;
#[cfg(target_arch = "wasm32")]
pub type EventFuture<E> = Box<dyn Future<Output = E>>;

/// What a lifecycle hook hands back to the event loop.
///
/// - `FutEvent` futures run on the platform's executor without blocking the
///   event loop. Each result is delivered to the flows as a custom event
///   once it is ready.
/// - `Configure` runs once against the mutable [`Context`], e.g. to change
///   the window title or the clear colour.
/// - `Empty` does nothing.
pub enum Out<E> {
    FutEvent(Vec<EventFuture<E>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<E> Default for Out<E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Verdict of a flow on an offscreen frame.
#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// A part of the application with its own update and render logic.
///
/// `S` is the state shared by all flows, `E` the custom event type.
pub trait GraphicsFlow<S, E> {
    /// Called once after the context exists and before the first frame.
    ///
    /// Configure the context here (clear colour, camera) and start loading
    /// assets.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<E>;

    /// Called after every presented frame with the time since the last one.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<E>;

    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<E>;

    /// Offered every custom event. Return it to pass it on to the next flow,
    /// `None` consumes it.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// What to draw this frame.
    fn on_render(&self) -> crate::render::Render<'_>;

    /// Inspect the offscreen frame. The app exits once every flow passed.
    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut S,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>;
}

/// Builds a flow once the GPU is available.
///
/// The constructor receives an [`InitContext`] so that it can upload meshes
/// and textures before the first frame.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    /// Context and flows finished building asynchronously (web only).
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    /// A finished event future (web only, native builds drain the executor).
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Custom(Event),
    /// All offscreen checks passed.
    #[cfg_attr(not(feature = "integration-tests"), allow(dead_code))]
    Exit,
}

/// Context, shared state and whether the surface can be drawn to yet.
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    surface_ready: bool,
}

impl<State: 'static + Default> AppState<State> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        Ok(Self {
            ctx: Context::new(window).await?,
            state: State::default(),
            surface_ready: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        // minimised windows report zero, keep the old surface until it is back
        if width == 0 || height == 0 {
            return;
        }
        log::debug!("surface is now {}x{}", width, height);
        let ctx = &mut self.ctx;
        ctx.config.width = width;
        ctx.config.height = height;
        ctx.surface.configure(&ctx.device, &ctx.config);
        ctx.projection.resize(width, height);
        ctx.depth_texture = Texture::create_depth_texture(&ctx.device, [width, height], "depth_texture");
        self.surface_ready = true;
    }

    fn resize_to_window(&mut self) {
        let size = self.ctx.render_target_size();
        self.resize(size.width, size.height);
    }

    fn render<Event: 'static>(
        &mut self,
        flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
        #[cfg(feature = "integration-tests")] outputs: &Outputs<State, Event>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();
        if !self.surface_ready {
            return Ok(());
        }

        let frame = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        #[cfg(not(feature = "integration-tests"))]
        let (color, depth) = (&frame_view, &self.ctx.depth_texture.view);

        #[cfg(feature = "integration-tests")]
        let capture = capture::Capture::new(&self.ctx);
        #[cfg(feature = "integration-tests")]
        let (color, depth) = (&capture.color, &capture.depth);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("matcap pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let mut items: Vec<Instanced> = Vec::new();
            flows
                .iter()
                .for_each(|flow| flow.on_render().collect(&mut items));

            pass.set_pipeline(&self.ctx.pipelines.matcap);
            for item in items {
                if item.amount == 0 {
                    log::warn!("skipping a draw without instances");
                    continue;
                }
                pass.set_vertex_buffer(1, item.instance.slice(..));
                pass.draw_model_instanced(
                    item.model,
                    item.material,
                    0..item.amount as u32,
                    &self.ctx.camera.bind_group,
                );
            }
        }

        #[cfg(feature = "integration-tests")]
        capture.copy_to_buffer(&mut encoder);

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        self.check_frame(flows, &capture, outputs);

        frame.present();
        Ok(())
    }

    #[cfg(feature = "integration-tests")]
    fn check_frame<Event: 'static>(
        &mut self,
        flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
        capture: &capture::Capture,
        outputs: &Outputs<State, Event>,
    ) {
        let mut img = match outputs.executor.runtime.block_on(capture.read(&self.ctx.device)) {
            Ok(img) => img,
            Err(e) => panic!("could not read back the frame: {:#}", e),
        };
        let mut passed = true;
        for flow in flows.iter_mut() {
            match flow.render_to_texture(&self.ctx, &mut self.state, &mut img) {
                Ok(ImageTestResult::Passed) => (),
                Ok(ImageTestResult::Waiting) => passed = false,
                Ok(ImageTestResult::Failed) => panic!("image check failed"),
                Err(e) => panic!("{:#}", e),
            }
        }
        if passed && outputs.proxy.send_event(FlowEvent::Exit).is_err() {
            panic!("all image checks passed but the event loop is gone");
        }
    }
}

/// Offscreen render targets standing in for the surface in image tests.
#[cfg(feature = "integration-tests")]
mod capture {
    use anyhow::anyhow;
    use instant::Duration;

    use crate::{context::Context, data_structures::texture::Texture};

    pub(super) struct Capture {
        pub(super) color: wgpu::TextureView,
        pub(super) depth: wgpu::TextureView,
        texture: wgpu::Texture,
        buffer: wgpu::Buffer,
        size: wgpu::Extent3d,
    }

    impl Capture {
        pub(super) fn new(ctx: &Context) -> Self {
            // buffer copies need rows aligned to 256 bytes
            let size = wgpu::Extent3d {
                width: ctx.config.width.div_ceil(256) * 256,
                height: ctx.config.height.div_ceil(256) * 256,
                depth_or_array_layers: 1,
            };
            let target = |label: &str, format: wgpu::TextureFormat| {
                ctx.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
            };
            let texture = target("capture colour", ctx.config.format);
            let depth = target("capture depth", Texture::DEPTH_FORMAT);
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("capture read back"),
                size: 4 * size.width as u64 * size.height as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            Self {
                color: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                depth: depth.create_view(&wgpu::TextureViewDescriptor::default()),
                texture,
                buffer,
                size,
            }
        }

        pub(super) fn copy_to_buffer(&self, encoder: &mut wgpu::CommandEncoder) {
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &self.buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(4 * self.size.width),
                        rows_per_image: Some(self.size.height),
                    },
                },
                self.size,
            );
        }

        pub(super) async fn read(
            &self,
            device: &wgpu::Device,
        ) -> anyhow::Result<image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>> {
            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let slice = self.buffer.slice(..);
            slice.map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
            device.poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })?;
            rx.receive()
                .await
                .ok_or_else(|| anyhow!("buffer mapping was cancelled"))??;
            image::ImageBuffer::from_raw(self.size.width, self.size.height, slice.get_mapped_range())
                .ok_or_else(|| anyhow!("read back buffer is smaller than the frame"))
        }
    }
}

/// Runs event futures on tokio workers and collects their results.
///
/// The event loop drains finished events with [`Executor::finished`] once
/// per iteration, nothing waits on a future that is still running.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) struct Executor<Event> {
    pub(crate) runtime: tokio::runtime::Runtime,
    sender: tokio::sync::mpsc::UnboundedSender<Event>,
    receiver: tokio::sync::mpsc::UnboundedReceiver<Event>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<Event: Send + 'static> Executor<Event> {
    pub(crate) fn new() -> anyhow::Result<Self> {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        Ok(Self {
            runtime: tokio::runtime::Runtime::new()?,
            sender,
            receiver,
        })
    }

    pub(crate) fn spawn(&self, futures: Vec<EventFuture<Event>>) {
        for future in futures {
            let sender = self.sender.clone();
            let future = Box::into_pin(future);
            self.runtime.spawn(async move {
                if sender.send(future.await).is_err() {
                    log::error!("Event loop closed before all events were delivered");
                }
            });
        }
    }

    pub(crate) fn finished(&mut self) -> Vec<Event> {
        iter::from_fn(|| self.receiver.try_recv().ok()).collect()
    }
}

/// Routes flow output: futures go to the executor, configuration runs
/// right away.
pub(crate) struct Outputs<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    executor: Executor<Event>,
    #[cfg_attr(
        all(not(target_arch = "wasm32"), not(feature = "integration-tests")),
        allow(dead_code)
    )]
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
}

impl<State: 'static, Event: 'static + wgpu::WasmNotSend> Outputs<State, Event> {
    fn handle(&self, ctx: &mut Context, out: Out<Event>) {
        match out {
            #[cfg(not(target_arch = "wasm32"))]
            Out::FutEvent(futures) => self.executor.spawn(futures),
            #[cfg(target_arch = "wasm32")]
            Out::FutEvent(futures) => {
                for future in futures {
                    let proxy = self.proxy.clone();
                    let future = Box::into_pin(future);
                    wasm_bindgen_futures::spawn_local(async move {
                        if proxy.send_event(FlowEvent::Custom(future.await)).is_err() {
                            log::error!("Event loop closed before all events were delivered");
                        }
                    });
                }
            }
            Out::Configure(configure) => configure(ctx),
            Out::Empty => (),
        }
    }
}

pub struct App<State: 'static, Event: 'static> {
    outputs: Outputs<State, Event>,
    state: Option<AppState<State>>,
    flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // taken on the first `resumed`
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    last_frame: Instant,
}

impl<State: 'static + Default, Event: 'static + wgpu::WasmNotSend> App<State, Event> {
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            outputs: Outputs {
                #[cfg(not(target_arch = "wasm32"))]
                executor: Executor::new()?,
                proxy: event_loop.create_proxy(),
            },
            state: None,
            flows: Vec::new(),
            constructors: Some(constructors),
            last_frame: Instant::now(),
        })
    }

    fn start(&mut self, mut app_state: AppState<State>, flows: Vec<Box<dyn GraphicsFlow<State, Event>>>) {
        app_state.resize_to_window();
        self.flows = flows;
        for flow in self.flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            self.outputs.handle(&mut app_state.ctx, out);
        }
        app_state.ctx.window.request_redraw();
        self.state = Some(app_state);
        self.last_frame = Instant::now();
    }

    /// Offer `event` to the flows in order until one consumes it.
    fn dispatch(&mut self, event: Event) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        let unhandled = self.flows.iter_mut().try_fold(event, |event, flow| {
            flow.on_custom_events(&app_state.ctx, &mut app_state.state, event)
        });
        if unhandled.is_some() {
            log::warn!("A custom event was not consumed by any flow");
        }
    }
}

impl<State: 'static + Default, Event: 'static + wgpu::WasmNotSend> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // mobile and web resume more than once, everything is built on the first
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut attributes = Window::default_attributes().with_title(WINDOW_TITLE);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID))
                .unwrap_throw();
            attributes = attributes.with_canvas(Some(canvas.unchecked_into()));
        }

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init = async move {
            let app_state = AppState::new(window).await?;
            // InitContext clones are cheap, device and queue are reference counted
            let pending = constructors
                .into_iter()
                .map(|constructor| constructor(InitContext::from(&app_state.ctx)));
            let flows = futures::future::join_all(pending).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.outputs.executor.runtime.block_on(init) {
                Ok((app_state, flows)) => self.start(app_state, flows),
                Err(e) => {
                    log::error!("Could not set up the GPU context: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.outputs.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init.await {
                    Ok((state, flows)) => {
                        if proxy.send_event(FlowEvent::Initialized { state, flows }).is_err() {
                            log::error!("Event loop closed before the context was ready");
                        }
                    }
                    Err(e) => log::error!("Could not set up the GPU context: {:#}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Custom(event) => self.dispatch(event),
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // every frame requests a redraw, so this runs at least once per frame
        #[cfg(not(target_arch = "wasm32"))]
        {
            if self.state.is_none() {
                return;
            }
            for event in self.outputs.executor.finished() {
                self.dispatch(event);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };

        app_state.ctx.camera.controller.handle_window_events(&event);
        for flow in self.flows.iter_mut() {
            let out = flow.on_window_events(&app_state.ctx, &mut app_state.state, &event);
            self.outputs.handle(&mut app_state.ctx, out);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                app_state.resize_to_window()
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_frame.elapsed();
                self.last_frame = Instant::now();

                let rendered = app_state.render(
                    &mut self.flows,
                    #[cfg(feature = "integration-tests")]
                    &self.outputs,
                );
                match rendered {
                    Ok(()) => {
                        let ctx = &mut app_state.ctx;
                        ctx.camera
                            .controller
                            .update(&mut ctx.camera.camera, &ctx.projection, dt);
                        ctx.write_camera();
                        for flow in self.flows.iter_mut() {
                            let out = flow.on_update(&app_state.ctx, &mut app_state.state, dt);
                            self.outputs.handle(&mut app_state.ctx, out);
                        }
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        app_state.resize_to_window()
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Dropped a frame: {}", e),
                }
            }
            _ => (),
        }
    }
}

/// Open a window and run `constructors` until the window is closed.
pub fn run<State: 'static + Default, Event: 'static + wgpu::WasmNotSend>(
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Could not initialise the logger: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialise the logger: {}", e).into());
        }
    }

    // tests run the event loop off the main thread
    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, constructors)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
