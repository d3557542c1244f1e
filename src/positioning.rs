//! Positioning feedback for the person being measured.
//!
//! Plain threshold checks on head tilt, face size relative to the frame, and
//! how steady the recent PD readings are. The first failing check decides the
//! message.

use crate::{config::PositioningConfig, geometry::vertical_gap, landmarks::FaceGeometry};
use serde::{Deserialize, Serialize};

/// Suggested corrective action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guidance {
    /// No face in the frame
    SearchingForFace,
    /// Eyes are not level
    LevelHead,
    /// Face too small in the frame
    MoveCloser,
    /// Face too large in the frame
    MoveBack,
    /// Window still filling up
    Measuring,
    /// Readings fluctuate too much
    HoldStill,
    /// Good to capture
    Ready,
}

impl Guidance {
    /// Human-readable status line
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::SearchingForFace => "Searching for face",
            Self::LevelHead => "Hold your head level",
            Self::MoveCloser => "Move closer",
            Self::MoveBack => "Move back",
            Self::Measuring => "Measuring...",
            Self::HoldStill => "Hold still",
            Self::Ready => "Perfect - capture now",
        }
    }

    /// True only when capturing is advisable
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Smoother-side inputs to the feedback decision
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilityInput {
    /// A smoothed result exists
    pub stable: bool,
    /// Standard deviation of PD over the window, if any samples
    pub pd_std_dev: Option<f64>,
}

/// Evaluates positioning feedback against configured thresholds
#[derive(Debug, Clone)]
pub struct PositionAdvisor {
    config: PositioningConfig,
}

impl Default for PositionAdvisor {
    fn default() -> Self {
        Self::new(PositioningConfig::default())
    }
}

impl PositionAdvisor {
    #[must_use]
    pub fn new(config: PositioningConfig) -> Self {
        Self { config }
    }

    /// Feedback for one frame; `face` is `None` when nothing was detected
    #[must_use]
    pub fn evaluate(&self, face: Option<&FaceGeometry>, stability: StabilityInput) -> Guidance {
        let Some(face) = face else {
            return Guidance::SearchingForFace;
        };

        if vertical_gap(&face.left_pupil, &face.right_pupil) > self.config.max_tilt_px {
            return Guidance::LevelHead;
        }

        let ratio = face.face_width() / face.frame_width;
        if ratio < self.config.min_face_ratio {
            return Guidance::MoveCloser;
        }
        if ratio > self.config.max_face_ratio {
            return Guidance::MoveBack;
        }

        if !stability.stable {
            return Guidance::Measuring;
        }
        if stability
            .pd_std_dev
            .is_some_and(|deviation| deviation > self.config.max_deviation_mm)
        {
            return Guidance::HoldStill;
        }

        Guidance::Ready
    }
}
