use std::ops::RangeInclusive;

pub const DEFAULT_TEXT: &str = "Hello Three.js";
pub const DEFAULT_DONUT_COUNT: u32 = 100;
pub const DONUT_COUNT_RANGE: RangeInclusive<u32> = 0..=200;

/// The two values the control panel can change at runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    pub text: String,
    pub donut_count: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            donut_count: DEFAULT_DONUT_COUNT,
        }
    }
}

/// Startup settings of the demo.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    /// Relative to the asset root.
    pub typeface_path: String,
    pub matcap_path: String,
    pub scene: SceneConfig,
    pub donut_count_range: RangeInclusive<u32>,
    pub clear_colour: wgpu::Color,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            typeface_path: "fonts/blocky_regular.typeface.json".to_string(),
            matcap_path: "textures/matcaps/1.png".to_string(),
            scene: SceneConfig::default(),
            donut_count_range: DONUT_COUNT_RANGE,
            clear_colour: wgpu::Color::BLACK,
        }
    }
}

impl DemoConfig {
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_assets(mut self, typeface_path: &str, matcap_path: &str) -> Self {
        self.typeface_path = typeface_path.to_string();
        self.matcap_path = matcap_path.to_string();
        self
    }

    /// Clamp a requested donut count into the allowed range.
    pub fn clamp_count(&self, count: i64) -> u32 {
        count.clamp(
            *self.donut_count_range.start() as i64,
            *self.donut_count_range.end() as i64,
        ) as u32
    }

    /// The scene the demo starts with, its donut count clamped like panel input.
    pub fn startup_scene(&self) -> SceneConfig {
        SceneConfig {
            donut_count: self.clamp_count(self.scene.donut_count as i64),
            ..self.scene.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_with_hello_and_a_hundred_donuts() {
        let config = DemoConfig::default();
        assert_eq!(config.scene.text, "Hello Three.js");
        assert_eq!(config.scene.donut_count, 100);
        assert_eq!(config.clear_colour, wgpu::Color::BLACK);
    }

    #[test]
    fn should_clamp_counts_to_range() {
        let config = DemoConfig::default();
        assert_eq!(config.clamp_count(-5), 0);
        assert_eq!(config.clamp_count(57), 57);
        assert_eq!(config.clamp_count(201), 200);
    }

    #[test]
    fn should_clamp_startup_count_into_range() {
        let config = DemoConfig::default().with_scene(SceneConfig {
            text: "Donuts".to_string(),
            donut_count: 500,
        });
        let scene = config.startup_scene();
        assert_eq!(scene.donut_count, 200);
        assert_eq!(scene.text, "Donuts");

        let narrow = DemoConfig {
            donut_count_range: 10..=20,
            ..config.with_scene(SceneConfig {
                donut_count: 3,
                ..SceneConfig::default()
            })
        };
        assert_eq!(narrow.startup_scene().donut_count, 10);
    }

    #[test]
    fn should_swap_asset_paths() {
        let config = DemoConfig::default().with_assets("fonts/other.json", "textures/matcaps/2.png");
        assert_eq!(config.typeface_path, "fonts/other.json");
        assert_eq!(config.matcap_path, "textures/matcaps/2.png");
        assert_eq!(config.scene, SceneConfig::default());
    }
}
