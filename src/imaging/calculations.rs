//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `(width, height)` so the longer edge is at most `max_edge`.
///
/// Aspect ratio is preserved and images already within bounds are returned
/// unchanged (never upscaled). Neither edge drops below one pixel.
///
/// # Examples
/// ```
/// # use love_diary::imaging::fit_within;
/// // 1200x900 landscape, 600 ceiling → 600x450
/// assert_eq!(fit_within((1200, 900), 600), (600, 450));
///
/// // Small images pass through
/// assert_eq!(fit_within((320, 240), 600), (320, 240));
/// ```
pub fn fit_within(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer = w.max(h);
    if longer <= max_edge || longer == 0 {
        return (w, h);
    }

    let ratio = max_edge as f64 / longer as f64;
    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).max(1);

    if w >= h {
        // Landscape or square: width pins to the ceiling
        (max_edge, scale(h))
    } else {
        (scale(w), max_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_width_pins_to_ceiling() {
        assert_eq!(fit_within((2000, 1500), 600), (600, 450));
    }

    #[test]
    fn portrait_height_pins_to_ceiling() {
        assert_eq!(fit_within((1500, 2000), 600), (450, 600));
    }

    #[test]
    fn square_scales_both_edges() {
        assert_eq!(fit_within((1000, 1000), 800), (800, 800));
    }

    #[test]
    fn never_upscales() {
        assert_eq!(fit_within((400, 300), 600), (400, 300));
        assert_eq!(fit_within((600, 600), 600), (600, 600));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within((10_000, 3), 600), (600, 1));
    }

    #[test]
    fn rounds_to_nearest_pixel() {
        // 1000x333 → ratio 0.6 → 199.8 → 200
        assert_eq!(fit_within((1000, 333), 600), (600, 200));
    }
}
