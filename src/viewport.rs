//! Render target sizing.
//!
//! The surface follows the window, but on very dense displays the pixel ratio
//! is capped at [`MAX_PIXEL_RATIO`] to keep the fill rate in check.

use winit::dpi::PhysicalSize;

pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// The effective pixel ratio after capping.
pub fn pixel_ratio(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// Size of the surface to render into for a window of `inner` physical pixels
/// shown at `scale_factor`.
pub fn render_target_size(inner: PhysicalSize<u32>, scale_factor: f64) -> PhysicalSize<u32> {
    let ratio = pixel_ratio(scale_factor);
    // also catches NaN
    if !(scale_factor > ratio) {
        return inner;
    }
    let shrink = ratio / scale_factor;
    let scale = |v: u32| {
        if v == 0 {
            0
        } else {
            ((v as f64 * shrink).round() as u32).max(1)
        }
    };
    PhysicalSize::new(scale(inner.width), scale(inner.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_size_up_to_the_cap() {
        let inner = PhysicalSize::new(1600, 900);
        assert_eq!(render_target_size(inner, 1.0), inner);
        assert_eq!(render_target_size(inner, 2.0), inner);
    }

    #[test]
    fn should_cap_dense_displays_at_two() {
        // 3x display: 1000x500 logical pixels
        let inner = PhysicalSize::new(3000, 1500);
        assert_eq!(render_target_size(inner, 3.0), PhysicalSize::new(2000, 1000));
        assert_eq!(pixel_ratio(3.0), 2.0);
    }

    #[test]
    fn should_preserve_minimised_windows() {
        let inner = PhysicalSize::new(0, 0);
        assert_eq!(render_target_size(inner, 4.0), inner);
    }

    #[test]
    fn should_fall_back_for_bogus_scale_factors() {
        assert_eq!(pixel_ratio(0.0), 1.0);
        assert_eq!(pixel_ratio(f64::NAN), 1.0);
        let inner = PhysicalSize::new(640, 480);
        assert_eq!(render_target_size(inner, f64::NAN), inner);
    }
}
