//! Placement of the donut field around the text.
//!
//! Donuts sit on a golden-angle spiral, split into three layers by index.
//! Every layer draws its radius from its own band so that the layers form
//! rings of increasing size. Height follows a slow wave along the spiral and
//! far donuts are drawn a little larger.

use std::f32::consts::PI;

use cgmath::Vector3;
use rand::Rng;

use crate::data_structures::instance::Instance;

/// π(3 − √5), about 137.5°.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

pub const LAYER_COUNT: usize = 3;

/// Radius band `[start, end)` per layer. Bands are disjoint and all of them
/// stay outside the area taken by the text.
pub const LAYER_BANDS: [(f32, f32); LAYER_COUNT] = [(4.0, 7.0), (7.0, 11.0), (11.0, 16.0)];

const WAVE_AMPLITUDE: f32 = 2.0;
const WAVE_FREQUENCY: f32 = 3.0;
const HEIGHT_JITTER: f32 = 1.5;
const DEPTH_JITTER: f32 = 4.0;
const SCALE_RANGE: (f32, f32) = (0.3, 0.8);
const SCALE_PER_UNIT: f32 = 0.02;

#[derive(Clone, Debug, PartialEq)]
pub struct DonutInstance {
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied in X, Y, Z order.
    pub rotation: Vector3<f32>,
    pub scale: f32,
    pub layer: usize,
    /// Spiral angle in radians, not wrapped.
    pub angle: f32,
    pub radius: f32,
}

impl DonutInstance {
    pub fn to_instance(&self) -> Instance {
        Instance::from_euler(self.position, self.rotation, self.scale)
    }
}

/// Layer of donut `index` out of `count`. The first third goes to layer 0 and
/// so on. Counts that are not a multiple of three put the extra donuts in
/// the later layers.
pub fn layer_of(index: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    ((index * LAYER_COUNT) / count).min(LAYER_COUNT - 1)
}

pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<DonutInstance> {
    (0..count)
        .map(|i| {
            let layer = layer_of(i, count);
            let angle = i as f32 * GOLDEN_ANGLE;
            let (band_start, band_end) = LAYER_BANDS[layer];
            let radius = rng.gen_range(band_start..band_end);

            let height = (angle * WAVE_FREQUENCY).sin() * WAVE_AMPLITUDE
                + rng.gen_range(-HEIGHT_JITTER..=HEIGHT_JITTER);
            let x = angle.cos() * radius;
            let z = angle.sin() * radius + rng.gen_range(-DEPTH_JITTER..=DEPTH_JITTER);

            let rotation = Vector3::new(
                rng.gen_range(0.0..PI),
                rng.gen_range(0.0..PI),
                rng.gen_range(0.0..PI),
            );
            let scale = rng.gen_range(SCALE_RANGE.0..SCALE_RANGE.1) + x.hypot(z) * SCALE_PER_UNIT;

            DonutInstance {
                position: Vector3::new(x, height, z),
                rotation,
                scale,
                layer,
                angle,
                radius,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn should_match_golden_angle() {
        let expected = PI * (3.0 - 5f32.sqrt());
        assert!((GOLDEN_ANGLE - expected).abs() < 1e-6);
        assert!((GOLDEN_ANGLE.to_degrees() - 137.5077).abs() < 1e-3);
    }

    #[test]
    fn should_generate_exactly_count_instances() {
        let mut rng = rng();
        for count in [0, 1, 2, 3, 4, 10, 99, 100, 101, 200] {
            assert_eq!(generate(count, &mut rng).len(), count, "count {}", count);
        }
    }

    #[test]
    fn should_generate_nothing_for_zero() {
        assert!(generate(0, &mut rng()).is_empty());
    }

    #[test]
    fn should_keep_bands_ordered_and_disjoint() {
        for pair in LAYER_BANDS.windows(2) {
            assert!(pair[0].0 < pair[0].1);
            assert!(pair[0].1 <= pair[1].0);
        }
        // clear of the text around the origin
        assert!(LAYER_BANDS[0].0 > 2.0);
    }

    #[test]
    fn should_split_nine_into_three_layers() {
        let donuts = generate(9, &mut rng());
        let layers: Vec<_> = donuts.iter().map(|d| d.layer).collect();
        assert_eq!(layers, vec![0, 0, 0, 1, 1, 1, 2, 2, 2]);

        let expected_degrees = [0.0, 137.5077, 275.0155];
        for (donut, expected) in donuts.iter().zip(expected_degrees) {
            let degrees = donut.angle.to_degrees().rem_euclid(360.0);
            assert!((degrees - expected).abs() < 1e-2, "{} vs {}", degrees, expected);
        }

        for donut in &donuts {
            let (start, end) = LAYER_BANDS[donut.layer];
            assert!(donut.radius >= start && donut.radius < end);
        }
    }

    #[test]
    fn should_not_require_multiples_of_three() {
        for count in [1, 2, 4, 5, 7, 100] {
            let layers: Vec<_> = (0..count).map(|i| layer_of(i, count)).collect();
            assert!(layers.windows(2).all(|w| w[0] <= w[1]));
            assert!(layers.iter().all(|&l| l < LAYER_COUNT));
        }
        assert_eq!(layer_of(0, 1), 0);
        assert_eq!(layer_of(1, 2), 1);
        assert_eq!(layer_of(99, 100), 2);
    }

    #[test]
    fn should_place_donuts_from_angle_and_radius() {
        for donut in generate(60, &mut rng()) {
            assert!((donut.position.x - donut.angle.cos() * donut.radius).abs() < 1e-4);

            let depth_jitter = donut.position.z - donut.angle.sin() * donut.radius;
            assert!(depth_jitter.abs() <= DEPTH_JITTER + 1e-4);

            let wave = (donut.angle * WAVE_FREQUENCY).sin() * WAVE_AMPLITUDE;
            assert!((donut.position.y - wave).abs() <= HEIGHT_JITTER + 1e-4);
        }
    }

    #[test]
    fn should_rotate_within_half_turn_and_scale_with_distance() {
        for donut in generate(60, &mut rng()) {
            for axis in [donut.rotation.x, donut.rotation.y, donut.rotation.z] {
                assert!((0.0..PI).contains(&axis));
            }
            let base = donut.scale - donut.position.x.hypot(donut.position.z) * SCALE_PER_UNIT;
            assert!(base >= SCALE_RANGE.0 - 1e-4 && base < SCALE_RANGE.1 + 1e-4);
        }
    }

    #[test]
    fn should_be_reproducible_with_a_seeded_rng() {
        let a = generate(30, &mut StdRng::seed_from_u64(42));
        let b = generate(30, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn should_convert_to_scaled_instance() {
        let donut = &generate(1, &mut rng())[0];
        let instance = donut.to_instance();
        assert_eq!(instance.position, donut.position);
        assert_eq!(instance.scale, Vector3::new(donut.scale, donut.scale, donut.scale));
    }
}
