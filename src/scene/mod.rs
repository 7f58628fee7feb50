//! The demo scene: centred matcap text surrounded by a field of donuts.
//!
//! [`SceneState`] owns everything that can be computed without a GPU. The
//! [`DonutScene`] flow mirrors it onto the GPU: whenever the state rebuilds
//! the donuts or the text it bumps a revision counter, and the flow
//! re-uploads whatever changed before the next frame is drawn.

pub mod config;
pub mod donuts;
pub mod panel;
pub mod text;

use std::pin::Pin;

use instant::Duration;
use rand::{SeedableRng, rngs::StdRng};
use winit::event::WindowEvent;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        batch::InstanceBatch,
        instance::Instance,
        model::{Material, Model},
        texture::Texture,
    },
    flow::{EventFuture, FlowConstructor, GraphicsFlow, Out, WINDOW_TITLE},
    geometry::torus::{TorusOptions, torus},
    render::Render,
    resources,
    typeface::Typeface,
};

use self::{
    config::{DemoConfig, SceneConfig},
    donuts::DonutInstance,
    panel::{ControlPanel, PanelInput},
    text::TextMesh,
};

/// Shared state of the scene.
#[derive(Debug)]
pub struct SceneState {
    pub config: SceneConfig,
    typeface: Option<Typeface>,
    donuts: Vec<DonutInstance>,
    text: Option<TextMesh>,
    rng: StdRng,
    donut_revision: u64,
    text_revision: u64,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(SceneConfig::default(), StdRng::from_entropy())
    }
}

impl SceneState {
    pub fn new(config: SceneConfig, rng: StdRng) -> Self {
        Self {
            config,
            typeface: None,
            donuts: Vec::new(),
            text: None,
            rng,
            donut_revision: 0,
            text_revision: 0,
        }
    }

    pub fn donuts(&self) -> &[DonutInstance] {
        &self.donuts
    }

    pub fn text(&self) -> Option<&TextMesh> {
        self.text.as_ref()
    }

    pub fn typeface(&self) -> Option<&Typeface> {
        self.typeface.as_ref()
    }

    pub fn donut_revision(&self) -> u64 {
        self.donut_revision
    }

    pub fn text_revision(&self) -> u64 {
        self.text_revision
    }

    /// Throw away the current donuts and place `config.donut_count` new ones.
    pub fn rebuild_donuts(&mut self) {
        self.donuts.clear();
        let count = self.config.donut_count as usize;
        self.donuts.extend(donuts::generate(count, &mut self.rng));
        self.donut_revision += 1;
        log::info!("placed {} donuts", self.donuts.len());
    }

    /// Rebuild the text for `config.text`.
    ///
    /// Without a typeface this does nothing; the text is built once the
    /// typeface arrives. A failed build keeps the previous text.
    pub fn rebuild_text(&mut self) {
        match text::rebuild(&self.config.text, self.typeface.as_ref()) {
            Ok(None) => log::debug!("no typeface yet, text {:?} is pending", self.config.text),
            Ok(Some(mesh)) => {
                log::info!(
                    "built text {:?} with {} triangles",
                    mesh.text,
                    mesh.geometry.triangle_count()
                );
                self.text = Some(mesh);
                self.text_revision += 1;
            }
            Err(e) => log::error!("Could not build text {:?}: {:#}", self.config.text, e),
        }
    }

    pub fn set_typeface(&mut self, typeface: Typeface) {
        self.typeface = Some(typeface);
        self.rebuild_text();
    }
}

#[derive(Debug)]
pub enum SceneEvent {
    TypefaceLoaded(Typeface),
    MatcapLoaded(image::DynamicImage),
    AssetFailed { path: String, error: String },
}

/// Text and donuts bound to the panel, drawn with one matcap material.
pub struct DonutScene {
    config: DemoConfig,
    material: Material,
    donuts: InstanceBatch,
    text: Option<InstanceBatch>,
    panel: ControlPanel<SceneState>,
    donut_revision: u64,
    text_revision: u64,
}

impl DonutScene {
    pub fn new(ctx: &InitContext, config: DemoConfig) -> Self {
        let placeholder = Texture::create_solid(1, 1, [255, 255, 255, 255], &ctx.device, &ctx.queue);
        let material = Material::new(&ctx.device, "matcap", placeholder, &ctx.matcap_layout);
        let donut_model = Model::from_data(&ctx.device, "donut", &torus(TorusOptions::default()));
        let donuts = InstanceBatch::new(&ctx.device, donut_model, Vec::new());
        let panel = mk_panel(&config);
        Self {
            config,
            material,
            donuts,
            text: None,
            panel,
            donut_revision: 0,
            text_revision: 0,
        }
    }

    /// Mirror new donut or text builds onto the GPU.
    fn sync(&mut self, ctx: &Context, state: &SceneState) {
        if state.donut_revision() != self.donut_revision {
            let instances = state.donuts().iter().map(DonutInstance::to_instance).collect();
            self.donuts.replace(&ctx.device, &ctx.queue, instances);
            self.donut_revision = state.donut_revision();
        }
        if state.text_revision() != self.text_revision {
            if let Some(old) = self.text.take() {
                old.destroy();
            }
            self.text = state.text().and_then(|mesh| {
                let model = Model::from_data(&ctx.device, "text", &mesh.geometry);
                (!model.is_empty())
                    .then(|| InstanceBatch::new(&ctx.device, model, vec![Instance::new()]))
            });
            self.text_revision = state.text_revision();
        }
    }

    fn title(&self, state: &SceneState) -> String {
        format!("{}  |  {}", WINDOW_TITLE, self.panel.summary(state))
    }
}

fn mk_panel(config: &DemoConfig) -> ControlPanel<SceneState> {
    let mut panel: ControlPanel<SceneState> = ControlPanel::new();
    panel
        .add_text(
            "Text",
            |s| s.config.text.as_str(),
            |s, v| s.config.text = v,
        )
        .on_change(SceneState::rebuild_text);
    panel
        .add_number(
            "Donuts",
            |s| s.config.donut_count,
            |s, v| s.config.donut_count = v,
            config.donut_count_range.clone(),
            1,
        )
        .on_change(SceneState::rebuild_donuts);
    panel
}

fn load_assets(config: &DemoConfig) -> Out<SceneEvent> {
    let typeface_path = config.typeface_path.clone();
    let matcap_path = config.matcap_path.clone();
    let typeface: EventFuture<SceneEvent> = Box::new(async move {
        match resources::load_typeface(&typeface_path).await {
            Ok(typeface) => SceneEvent::TypefaceLoaded(typeface),
            Err(e) => SceneEvent::AssetFailed {
                path: typeface_path,
                error: format!("{:#}", e),
            },
        }
    });
    let matcap: EventFuture<SceneEvent> = Box::new(async move {
        match resources::load_matcap_image(&matcap_path).await {
            Ok(img) => SceneEvent::MatcapLoaded(img),
            Err(e) => SceneEvent::AssetFailed {
                path: matcap_path,
                error: format!("{:#}", e),
            },
        }
    });
    Out::FutEvent(vec![typeface, matcap])
}

impl GraphicsFlow<SceneState, SceneEvent> for DonutScene {
    fn on_init(&mut self, ctx: &mut Context, state: &mut SceneState) -> Out<SceneEvent> {
        ctx.clear_colour = self.config.clear_colour;
        state.config = self.config.startup_scene();
        state.rebuild_donuts();
        self.sync(ctx, state);
        ctx.set_title(&self.title(state));
        load_assets(&self.config)
    }

    fn on_update(&mut self, ctx: &Context, state: &mut SceneState, _dt: Duration) -> Out<SceneEvent> {
        self.sync(ctx, state);
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        ctx: &Context,
        state: &mut SceneState,
        event: &WindowEvent,
    ) -> Out<SceneEvent> {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return Out::Empty;
        };
        let Some(input) = PanelInput::from_key_event(event) else {
            return Out::Empty;
        };
        let focus_moved = input == PanelInput::FocusNext;
        if !self.panel.handle(state, input) && !focus_moved {
            return Out::Empty;
        }
        // the callbacks already rebuilt on the CPU, upload before the next frame
        self.sync(ctx, state);
        let title = self.title(state);
        Out::Configure(Box::new(move |ctx: &mut Context| ctx.set_title(&title)))
    }

    fn on_custom_events(
        &mut self,
        ctx: &Context,
        state: &mut SceneState,
        event: SceneEvent,
    ) -> Option<SceneEvent> {
        match event {
            SceneEvent::TypefaceLoaded(typeface) => {
                state.set_typeface(typeface);
                self.sync(ctx, state);
            }
            SceneEvent::MatcapLoaded(img) => {
                let matcap = Texture::from_image(&ctx.device, &ctx.queue, &img, Some("matcap"), false);
                self.material.set_matcap(&ctx.device, matcap, &ctx.matcap_layout);
            }
            SceneEvent::AssetFailed { path, error } => {
                log::error!("Could not load {}: {}", path, error);
            }
        }
        None
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            self.donuts.instanced(&self.material).into(),
            self.text
                .as_ref()
                .and_then(|text| text.instanced(&self.material))
                .into(),
        ])
    }

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut SceneState,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<crate::flow::ImageTestResult, anyhow::Error> {
        Ok(crate::flow::ImageTestResult::Passed)
    }
}

/// Constructor for [`crate::flow::run`].
pub fn constructor(config: DemoConfig) -> FlowConstructor<SceneState, SceneEvent> {
    Box::new(move |ctx: InitContext| {
        let flow: Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<SceneState, SceneEvent>>>>> =
            Box::pin(async move {
                Box::new(DonutScene::new(&ctx, config)) as Box<dyn GraphicsFlow<SceneState, SceneEvent>>
            });
        flow
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPEFACE: &str = r#"{
        "glyphs": {
            "H": { "ha": 800, "x_min": 0, "x_max": 700, "o": "m 0 0 l 700 0 l 700 1000 l 0 1000 z" },
            "?": { "ha": 600, "x_min": 0, "x_max": 500, "o": "m 0 0 l 500 0 l 500 800 l 0 800 z" }
        },
        "familyName": "Test",
        "underlineThickness": 50,
        "boundingBox": { "xMin": 0, "xMax": 800, "yMin": -200, "yMax": 1000 },
        "resolution": 1000
    }"#;

    fn state(count: u32) -> SceneState {
        SceneState::new(
            SceneConfig {
                text: "HH".to_string(),
                donut_count: count,
            },
            StdRng::seed_from_u64(3),
        )
    }

    #[test]
    fn should_match_configured_count_after_rebuild() {
        let mut state = state(100);
        state.rebuild_donuts();
        assert_eq!(state.donuts().len(), 100);
        state.config.donut_count = 0;
        state.rebuild_donuts();
        assert!(state.donuts().is_empty());
        assert_eq!(state.donut_revision(), 2);
    }

    #[test]
    fn should_keep_only_the_latest_batch() {
        let mut state = state(12);
        state.rebuild_donuts();
        let first = state.donuts().to_vec();
        state.config.donut_count = 7;
        state.rebuild_donuts();
        assert_eq!(state.donuts().len(), 7);
        assert_ne!(state.donuts(), &first[..7]);
    }

    #[test]
    fn should_defer_text_until_typeface_arrives() {
        let mut state = state(0);
        state.rebuild_text();
        assert!(state.text().is_none());
        assert_eq!(state.text_revision(), 0);

        state.set_typeface(Typeface::from_json(TYPEFACE).unwrap());
        let text = state.text().unwrap();
        assert_eq!(text.text, "HH");
        assert!(!text.is_empty());
        assert_eq!(state.text_revision(), 1);
    }

    #[test]
    fn should_replace_text_and_survive_empty_strings() {
        let mut state = state(0);
        state.set_typeface(Typeface::from_json(TYPEFACE).unwrap());
        state.config.text = String::new();
        state.rebuild_text();
        assert!(state.text().unwrap().is_empty());
        state.config.text = "H?".to_string();
        state.rebuild_text();
        assert_eq!(state.text().unwrap().text, "H?");
        assert_eq!(state.text_revision(), 3);
    }

    #[test]
    fn should_keep_previous_text_when_rebuild_fails() {
        let broken = TYPEFACE.replace("l 700 0", "k 700 0");
        let mut state = state(0);
        state.set_typeface(Typeface::from_json(TYPEFACE).unwrap());
        let before = state.text().cloned();
        state.typeface = Some(Typeface::from_json(&broken).unwrap());
        state.config.text = "H".to_string();
        state.rebuild_text();
        assert_eq!(state.text().cloned(), before);
        assert_eq!(state.text_revision(), 1);
    }

    #[test]
    fn should_start_with_clamped_donut_field() {
        let config = DemoConfig::default().with_scene(SceneConfig {
            text: "H".to_string(),
            donut_count: 500,
        });
        let mut state = SceneState::new(config.startup_scene(), StdRng::seed_from_u64(5));
        state.rebuild_donuts();
        assert_eq!(state.donuts().len(), 200);
    }

    #[test]
    fn should_rebuild_through_panel_callbacks() {
        let config = DemoConfig::default();
        let mut panel = mk_panel(&config);
        let mut state = state(100);
        state.rebuild_donuts();
        state.set_typeface(Typeface::from_json(TYPEFACE).unwrap());

        panel.handle(&mut state, PanelInput::Backspace);
        assert_eq!(state.text().unwrap().text, "H");

        panel.handle(&mut state, PanelInput::FocusNext);
        for _ in 0..10 {
            panel.handle(&mut state, PanelInput::Increment(-10));
        }
        assert_eq!(state.config.donut_count, 0);
        assert!(state.donuts().is_empty());

        panel.handle(&mut state, PanelInput::Increment(1));
        assert_eq!(state.donuts().len(), 1);
    }
}
