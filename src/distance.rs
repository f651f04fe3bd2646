// src/distance.rs

/// Monocular distance estimate from apparent size.
///
/// Assumes perspective projection of an upright subject of known real-world
/// height: distance is inversely proportional to the bounding box's pixel
/// height. Accuracy degrades for crouching or partially occluded subjects;
/// that is accepted approximation error, not something this estimator
/// compensates for.
#[derive(Debug, Clone, Copy)]
pub struct DistanceEstimator {
    k: f64,
}

impl DistanceEstimator {
    /// `pixel_height_ref` is the pixel height an object of `real_height_m`
    /// shows at the calibration distance.
    pub fn new(real_height_m: f64, pixel_height_ref: f64) -> Self {
        Self {
            k: real_height_m * pixel_height_ref,
        }
    }

    /// Estimated distance in meters, or `None` for a degenerate box height.
    pub fn estimate(&self, height_px: f32) -> Option<f64> {
        if height_px <= 0.0 {
            return None;
        }
        Some(self.k / height_px as f64)
    }
}
