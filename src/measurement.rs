//! Raw per-frame measurements derived from face geometry and a scale factor.

use crate::{calibration::Calibration, geometry::{distance, vertical_gap}, landmarks::FaceGeometry};
use serde::{Deserialize, Serialize};

/// One frame's raw values, all in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementSample {
    /// Pupil-to-pupil distance
    pub total_pd: f64,
    /// Image-left pupil to nose bridge share of the PD
    pub left_pd: f64,
    /// Image-right pupil to nose bridge share of the PD
    pub right_pd: f64,
    /// Image-left pupil to nose tip, vertically
    pub left_height: f64,
    /// Image-right pupil to nose tip, vertically
    pub right_height: f64,
}

impl MeasurementSample {
    /// Sample with every per-eye value derived from a symmetric face
    #[must_use]
    pub fn symmetric(total_pd: f64, height: f64) -> Self {
        Self {
            total_pd,
            left_pd: total_pd / 2.0,
            right_pd: total_pd / 2.0,
            left_height: height,
            right_height: height,
        }
    }

    /// Compute the sample for `face` at the calibrated scale
    #[must_use]
    pub fn from_face(face: &FaceGeometry, calibration: &Calibration) -> Self {
        let scale = calibration.mm_per_pixel;
        let total_pd = face.pupil_distance() * scale;

        let to_bridge_left = distance(&face.left_pupil, &face.nose_bridge);
        let to_bridge_right = distance(&face.right_pupil, &face.nose_bridge);
        let to_bridge = to_bridge_left + to_bridge_right;
        let left_share = if to_bridge > 0.0 { to_bridge_left / to_bridge } else { 0.5 };

        Self {
            total_pd,
            left_pd: total_pd * left_share,
            right_pd: total_pd * (1.0 - left_share),
            left_height: vertical_gap(&face.nose_tip, &face.left_pupil) * scale,
            right_height: vertical_gap(&face.nose_tip, &face.right_pupil) * scale,
        }
    }
}
