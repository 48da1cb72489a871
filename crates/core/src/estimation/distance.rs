//! Pinhole-camera distance arithmetic.
//!
//! For an object of physical width `W` at distance `D`, a camera with focal
//! length `f` (pixels) images it at pixel width `P = W * f / D`. The two
//! functions below are that relation solved for `D` and for `f`.

/// Distance (meters) of a face of known physical width imaged at
/// `pixel_width` pixels by a camera with the given focal length.
///
/// `distance = known_width * focal_length / pixel_width`
///
/// Callers must not pass a non-positive `pixel_width`; degenerate detector
/// boxes are filtered out as "no face" before this point.
pub fn estimate_distance(pixel_width: f64, focal_length: f64, known_width: f64) -> f64 {
    debug_assert!(pixel_width > 0.0);
    debug_assert!(focal_length > 0.0);
    debug_assert!(known_width > 0.0);
    (known_width * focal_length) / pixel_width
}

/// Focal length (pixels) derived from a face of known physical width
/// observed at `pixel_width` pixels from a known distance.
///
/// This is [`estimate_distance`] run backwards with ground truth:
/// `focal_length = pixel_width * known_distance / known_width`
pub fn derive_focal_length(pixel_width: f64, known_distance: f64, known_width: f64) -> f64 {
    debug_assert!(pixel_width > 0.0);
    debug_assert!(known_distance > 0.0);
    debug_assert!(known_width > 0.0);
    (pixel_width * known_distance) / known_width
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_estimate_known_values() {
        // 0.15m face at focal 540 imaged 100px wide → 0.81m
        assert_relative_eq!(estimate_distance(100.0, 540.0, 0.15), 0.81);
    }

    #[test]
    fn test_estimate_strictly_decreasing_in_pixel_width() {
        let mut prev = f64::INFINITY;
        for pw in [10.0, 50.0, 100.0, 200.0, 640.0] {
            let d = estimate_distance(pw, 540.0, 0.15);
            assert!(d < prev, "distance must shrink as the face grows");
            prev = d;
        }
    }

    #[rstest]
    #[case::focal(200.0, 400.0)]
    #[case::focal_large(540.0, 1080.0)]
    fn test_estimate_strictly_increasing_in_focal_length(#[case] f1: f64, #[case] f2: f64) {
        assert!(estimate_distance(100.0, f2, 0.15) > estimate_distance(100.0, f1, 0.15));
    }

    #[rstest]
    #[case::width(0.1, 0.2)]
    #[case::width_small(0.14, 0.16)]
    fn test_estimate_strictly_increasing_in_known_width(#[case] w1: f64, #[case] w2: f64) {
        assert!(estimate_distance(100.0, 540.0, w2) > estimate_distance(100.0, 540.0, w1));
    }

    #[test]
    fn test_derive_known_values() {
        // 180px face at 0.45m with 0.15m width → focal 540
        assert_relative_eq!(derive_focal_length(180.0, 0.45, 0.15), 540.0);
    }

    #[rstest]
    #[case(60.0, 0.45, 0.15)]
    #[case(180.0, 0.45, 0.15)]
    #[case(333.0, 1.2, 0.16)]
    fn test_calibrate_then_estimate_round_trips(
        #[case] pixel_width: f64,
        #[case] distance: f64,
        #[case] width: f64,
    ) {
        // Deriving focal length from a synthetic observation and estimating
        // with the same observation must reproduce the ground-truth distance.
        let focal = derive_focal_length(pixel_width, distance, width);
        assert_relative_eq!(
            estimate_distance(pixel_width, focal, width),
            distance,
            max_relative = 1e-12
        );
    }
}
