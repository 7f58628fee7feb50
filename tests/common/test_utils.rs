use matcap_donuts::{
    context::Context,
    data_structures::{batch::InstanceBatch, model::Material},
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

pub type Pixels = image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>;

#[derive(Default)]
pub struct FrameCounter(u32);

impl FrameCounter {
    pub fn frame(&self) -> u32 {
        self.0
    }

    pub fn progress(&mut self) {
        self.0 += 1;
    }
}

type Setup = Box<dyn Fn(&mut Context)>;
type Validate = Box<dyn Fn(&FrameCounter, &mut Pixels) -> anyhow::Result<ImageTestResult>>;

/// Draws `batches` with `material`, then hands every rendered frame to
/// `validate` until it stops waiting.
pub struct TestRender {
    pub batches: Vec<InstanceBatch>,
    pub material: Option<Material>,
    pub setup: Setup,
    pub validate: Validate,
}

impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<()> {
        (self.setup)(ctx);
        ctx.write_camera();
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, state: &mut FrameCounter, _: instant::Duration) -> Out<()> {
        state.progress();
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut FrameCounter, _: &winit::event::WindowEvent) -> Out<()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut FrameCounter, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        let Some(material) = &self.material else {
            return Render::None;
        };
        Render::Defaults(
            self.batches
                .iter()
                .filter_map(|batch| batch.instanced(material))
                .collect(),
        )
    }

    fn render_to_texture(
        &self,
        _: &Context,
        state: &mut FrameCounter,
        texture: &mut Pixels,
    ) -> anyhow::Result<ImageTestResult> {
        (self.validate)(state, texture)
    }
}

pub fn is_black(pixel: &image::Rgba<u8>) -> bool {
    pixel.0[..3].iter().all(|&c| c == 0)
}

#[macro_export]
macro_rules! golden_image_test {
    ($constructor:expr) => {{
        use matcap_donuts::flow::{FlowConstructor, GraphicsFlow};
        use $crate::common::test_utils::FrameCounter;

        let constructor: FlowConstructor<FrameCounter, ()> = Box::new(|ctx| {
            let flow: std::pin::Pin<
                Box<dyn std::future::Future<Output = Box<dyn GraphicsFlow<FrameCounter, ()>>>>,
            > = Box::pin(async move {
                let flow: Box<dyn GraphicsFlow<FrameCounter, ()>> =
                    Box::new(($constructor)(ctx).await);
                flow
            });
            flow
        });

        matcap_donuts::flow::run(vec![constructor])
            .expect("Failed to run flow for integration test.");
    }};
}
