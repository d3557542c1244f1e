//! Pixel-to-millimeter calibration.
//!
//! The resolver always derives a scale from the iris, a biological constant
//! that is visible whenever a face is. A selected eyewear frame with known
//! dimensions adds up to three more independent ratios (width, lens height,
//! bridge). All contributed ratios are fused into a single `mm_per_pixel`.

use crate::{
    config::CalibrationConfig,
    constants::{BRIDGE_OFFSET_MM, DEFAULT_IRIS_WEIGHT, FRAME_ASPECT_RATIO, IRIS_DIAMETER_MM},
    geometry::{AlignmentBox, Point},
    landmarks::FaceGeometry,
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Real-world eyewear frame used as a calibration reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    width_mm: f64,
    bridge_mm: Option<f64>,
    lens_height_mm: Option<f64>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl ReferenceFrame {
    /// Create a reference from catalog dimensions
    ///
    /// Bridge and lens height values that are not positive are treated as unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if `width_mm` is not a finite positive number
    pub fn new(width_mm: f64, bridge_mm: Option<f64>, lens_height_mm: Option<f64>) -> Result<Self> {
        if !width_mm.is_finite() || width_mm <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Reference frame width must be positive, got {width_mm}"
            )));
        }
        Ok(Self {
            width_mm,
            bridge_mm: positive(bridge_mm),
            lens_height_mm: positive(lens_height_mm),
        })
    }

    /// Reference with only a user-typed total width
    ///
    /// # Errors
    ///
    /// Returns an error if `width_mm` is not a finite positive number
    pub fn manual(width_mm: f64) -> Result<Self> {
        Self::new(width_mm, None, None)
    }

    /// Total frame width in millimeters
    #[must_use]
    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    /// Bridge width in millimeters, if known
    #[must_use]
    pub fn bridge_mm(&self) -> Option<f64> {
        self.bridge_mm
    }

    /// Lens height in millimeters, if known
    #[must_use]
    pub fn lens_height_mm(&self) -> Option<f64> {
        self.lens_height_mm
    }
}

/// User slider adjustments applied to the on-screen alignment box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactors {
    /// Multiplier on the cheek-to-cheek width
    pub width_scale: f64,
    /// Multiplier on the derived box height
    pub height_scale: f64,
    /// Vertical box offset in pixels, positive moves down
    pub vertical_offset: f64,
}

impl AdjustmentFactors {
    /// Identity adjustment
    pub const IDENTITY: Self = Self {
        width_scale: 1.0,
        height_scale: 1.0,
        vertical_offset: 0.0,
    };
}

impl Default for AdjustmentFactors {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How contributed ratios are combined into one scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Plain mean of every contributed ratio
    EqualWeight,
    /// Iris ratio weighted against the mean of the frame-derived ratios
    IrisWeighted {
        /// Share of the iris ratio in `[0, 1]`
        iris_weight: f64,
    },
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self::EqualWeight
    }
}

impl FusionPolicy {
    /// Iris-weighted policy with the default weight
    #[must_use]
    pub fn iris_weighted() -> Self {
        Self::IrisWeighted {
            iris_weight: DEFAULT_IRIS_WEIGHT,
        }
    }

    /// Fuse the iris ratio with any frame-derived ratios
    fn fuse(self, iris: f64, frame_ratios: &[f64]) -> f64 {
        if frame_ratios.is_empty() {
            return iris;
        }
        match self {
            Self::EqualWeight => {
                let total = iris + frame_ratios.iter().sum::<f64>();
                total / (frame_ratios.len() + 1) as f64
            }
            Self::IrisWeighted { iris_weight } => {
                let frame_mean = frame_ratios.iter().sum::<f64>() / frame_ratios.len() as f64;
                iris_weight * iris + (1.0 - iris_weight) * frame_mean
            }
        }
    }
}

/// Which reference signal produced a ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSource {
    Iris,
    FrameWidth,
    FrameHeight,
    Bridge,
}

/// One independent mm/px estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleContribution {
    pub source: ScaleSource,
    pub mm_per_pixel: f64,
}

/// Result of calibrating a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Fused scale factor
    pub mm_per_pixel: f64,
    /// Every ratio that went into the fusion, iris first
    pub contributions: Vec<ScaleContribution>,
    /// Overlay box, present when a reference frame is selected
    pub alignment_box: Option<AlignmentBox>,
}

impl Calibration {
    /// Ratio contributed by `source`, if any
    #[must_use]
    pub fn contribution(&self, source: ScaleSource) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.source == source)
            .map(|c| c.mm_per_pixel)
    }
}

/// Converts a face plus optional reference into a pixel-to-millimeter scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResolver {
    policy: FusionPolicy,
    iris_diameter_mm: f64,
    frame_aspect_ratio: f64,
    bridge_offset_mm: f64,
}

impl Default for CalibrationResolver {
    fn default() -> Self {
        Self::new(FusionPolicy::EqualWeight)
    }
}

impl CalibrationResolver {
    /// Create a resolver with the standard anatomical constants
    #[must_use]
    pub fn new(policy: FusionPolicy) -> Self {
        Self {
            policy,
            iris_diameter_mm: IRIS_DIAMETER_MM,
            frame_aspect_ratio: FRAME_ASPECT_RATIO,
            bridge_offset_mm: BRIDGE_OFFSET_MM,
        }
    }

    /// Create a resolver from configuration
    #[must_use]
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self {
            policy: config.fusion,
            iris_diameter_mm: config.iris_diameter_mm,
            frame_aspect_ratio: config.frame_aspect_ratio,
            bridge_offset_mm: config.bridge_offset_mm,
        }
    }

    /// Fusion policy fixed at construction
    #[must_use]
    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    /// Calibrate one frame
    ///
    /// Returns `None` for a degenerate frame: the fused scale is zero,
    /// negative, or not finite.
    #[must_use]
    pub fn resolve(
        &self,
        face: &FaceGeometry,
        reference: Option<&ReferenceFrame>,
        adjustment: &AdjustmentFactors,
    ) -> Option<Calibration> {
        let iris = self.iris_diameter_mm / face.average_iris_diameter();
        let mut contributions = vec![ScaleContribution {
            source: ScaleSource::Iris,
            mm_per_pixel: iris,
        }];
        let mut alignment_box = None;

        if let Some(reference) = reference {
            let visual_width = face.face_width() * adjustment.width_scale;
            let box_height = visual_width * self.frame_aspect_ratio * adjustment.height_scale;

            contributions.push(ScaleContribution {
                source: ScaleSource::FrameWidth,
                mm_per_pixel: reference.width_mm / visual_width,
            });

            if let Some(lens_height) = reference.lens_height_mm {
                contributions.push(ScaleContribution {
                    source: ScaleSource::FrameHeight,
                    mm_per_pixel: lens_height / box_height,
                });
            }

            if let Some(bridge) = reference.bridge_mm {
                contributions.push(ScaleContribution {
                    source: ScaleSource::Bridge,
                    mm_per_pixel: (bridge + self.bridge_offset_mm) / face.inner_corner_distance(),
                });
            }

            let pupils = face.pupil_midpoint();
            let center = Point::new(pupils.x, pupils.y + adjustment.vertical_offset);
            alignment_box = Some(AlignmentBox::centered(center, visual_width, box_height));
        }

        let frame_ratios: Vec<f64> = contributions[1..].iter().map(|c| c.mm_per_pixel).collect();
        let mm_per_pixel = self.policy.fuse(iris, &frame_ratios);

        if !mm_per_pixel.is_finite() || mm_per_pixel <= 0.0 {
            debug!("Degenerate scale {mm_per_pixel} from {} contributions", contributions.len());
            return None;
        }

        Some(Calibration {
            mm_per_pixel,
            contributions,
            alignment_box,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::test_support::synthetic_face;

    fn face(iris_px: f64, face_px: f64) -> FaceGeometry {
        synthetic_face(120.0, iris_px, face_px).to_geometry(1000.0, 1000.0)
    }

    #[test]
    fn test_iris_only_scale() {
        let resolver = CalibrationResolver::default();
        let calibration = resolver
            .resolve(&face(20.0, 350.0), None, &AdjustmentFactors::IDENTITY)
            .unwrap();

        assert_eq!(calibration.mm_per_pixel, 11.7 / 20.0);
        assert_eq!(calibration.contributions.len(), 1);
        assert!(calibration.alignment_box.is_none());
    }

    #[test]
    fn test_iris_only_scale_ignores_policy() {
        let resolver = CalibrationResolver::new(FusionPolicy::iris_weighted());
        let calibration = resolver
            .resolve(&face(25.0, 350.0), None, &AdjustmentFactors::IDENTITY)
            .unwrap();
        assert_eq!(calibration.mm_per_pixel, 11.7 / 25.0);
    }

    #[test]
    fn test_width_reference_equal_weight() {
        let resolver = CalibrationResolver::default();
        let reference = ReferenceFrame::manual(140.0).unwrap();
        let iris_px = 11.7 / 0.39;
        let calibration = resolver
            .resolve(&face(iris_px, 350.0), Some(&reference), &AdjustmentFactors::IDENTITY)
            .unwrap();

        let width = calibration.contribution(ScaleSource::FrameWidth).unwrap();
        assert!((width - 0.4).abs() < 1e-12);
        assert!((calibration.mm_per_pixel - 0.395).abs() < 1e-9);
    }

    #[test]
    fn test_all_reference_signals() {
        let resolver = CalibrationResolver::default();
        let reference = ReferenceFrame::new(140.0, Some(16.0), Some(42.0)).unwrap();
        let adjustment = AdjustmentFactors {
            width_scale: 1.0,
            height_scale: 1.2,
            vertical_offset: 10.0,
        };
        let calibration = resolver
            .resolve(&face(20.0, 350.0), Some(&reference), &adjustment)
            .unwrap();

        let height = calibration.contribution(ScaleSource::FrameHeight).unwrap();
        assert!((height - 42.0 / (350.0 * 0.35 * 1.2)).abs() < 1e-12);
        let bridge = calibration.contribution(ScaleSource::Bridge).unwrap();
        assert!((bridge - 18.0 / 60.0).abs() < 1e-12);

        let expected = (11.7 / 20.0 + 0.4 + height + bridge) / 4.0;
        assert!((calibration.mm_per_pixel - expected).abs() < 1e-12);

        let rect = calibration.alignment_box.unwrap();
        assert!((rect.width - 350.0).abs() < 1e-9);
        assert!((rect.height - 350.0 * 0.35 * 1.2).abs() < 1e-9);
        assert!((rect.center_y - 410.0).abs() < 1e-9);
        assert!((rect.center_x - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_iris_weighted_blend() {
        let resolver = CalibrationResolver::new(FusionPolicy::IrisWeighted { iris_weight: 0.7 });
        let reference = ReferenceFrame::manual(140.0).unwrap();
        let calibration = resolver
            .resolve(&face(20.0, 350.0), Some(&reference), &AdjustmentFactors::IDENTITY)
            .unwrap();
        let expected = 0.7 * (11.7 / 20.0) + 0.3 * 0.4;
        assert!((calibration.mm_per_pixel - expected).abs() < 1e-12);
    }

    #[test]
    fn test_width_adjustment_changes_scale() {
        let resolver = CalibrationResolver::default();
        let reference = ReferenceFrame::manual(140.0).unwrap();
        let adjustment = AdjustmentFactors {
            width_scale: 1.1,
            ..AdjustmentFactors::IDENTITY
        };
        let calibration = resolver
            .resolve(&face(20.0, 350.0), Some(&reference), &adjustment)
            .unwrap();
        let width = calibration.contribution(ScaleSource::FrameWidth).unwrap();
        assert!((width - 140.0 / 385.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapsed_face_is_degenerate() {
        let resolver = CalibrationResolver::default();
        // All iris points collapse to one pixel: 11.7 / 0 is infinite
        let collapsed = face(0.0, 350.0);
        assert!(resolver.resolve(&collapsed, None, &AdjustmentFactors::IDENTITY).is_none());
    }

    #[test]
    fn test_reference_validation() {
        assert!(ReferenceFrame::manual(0.0).is_err());
        assert!(ReferenceFrame::manual(-5.0).is_err());
        assert!(ReferenceFrame::manual(f64::NAN).is_err());

        let reference = ReferenceFrame::new(138.0, Some(0.0), Some(f64::INFINITY)).unwrap();
        assert_eq!(reference.bridge_mm(), None);
        assert_eq!(reference.lens_height_mm(), None);
    }
}
