//! Configuration management for the measurement pipeline

use crate::{
    calibration::FusionPolicy,
    constants::{
        BRIDGE_OFFSET_MM, DEFAULT_FPS, DEFAULT_MAX_DEVIATION_MM, DEFAULT_MAX_FACE_RATIO, DEFAULT_MAX_TILT_PX,
        DEFAULT_MIN_FACE_RATIO, DEFAULT_PUBLISH_EVERY, DEFAULT_WINDOW_CAPACITY, FRAME_ASPECT_RATIO,
        IRIS_DIAMETER_MM, JUMP_THRESHOLD_MM, MIN_STABLE_SAMPLES, PD_MAX_MM, PD_MIN_MM,
    },
    smoothing::aggregate::create_aggregator,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scale resolution
    pub calibration: CalibrationConfig,

    /// Temporal smoothing
    pub smoothing: SmoothingConfig,

    /// Positioning feedback thresholds
    pub positioning: PositioningConfig,

    /// Frame loop timing and frame size
    pub display: DisplayConfig,

    /// Session behavior and catalog location
    pub session: SessionConfig,
}

/// Calibration constants and fusion policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Assumed iris diameter in millimeters
    pub iris_diameter_mm: f64,

    /// Frame height:width ratio used for the alignment box
    pub frame_aspect_ratio: f64,

    /// Added to the catalog bridge width before comparing with the inner-corner gap
    pub bridge_offset_mm: f64,

    /// How ratios are fused
    pub fusion: FusionPolicy,
}

/// Smoothing window parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Maximum number of samples kept
    pub window_capacity: usize,

    /// Samples required before a result is emitted
    pub min_samples: usize,

    /// Lower plausible PD bound (inclusive)
    pub pd_min_mm: f64,

    /// Upper plausible PD bound (inclusive)
    pub pd_max_mm: f64,

    /// Largest accepted deviation from the smoothed PD
    pub jump_threshold_mm: f64,

    /// Aggregation name, `mean` or `trimmed_mean[:trim[:min_window]]`
    pub aggregation: String,
}

/// Positioning feedback thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    /// Largest vertical pupil offset in pixels before asking to level the head
    pub max_tilt_px: f64,

    /// Face width / frame width below which the user should move closer
    pub min_face_ratio: f64,

    /// Face width / frame width above which the user should move back
    pub max_face_ratio: f64,

    /// PD standard deviation over the window above which the user should hold still
    pub max_deviation_mm: f64,
}

/// Frame loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Target tick rate of the frame loop
    pub target_fps: u32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Publish a snapshot at least every this many processed frames
    pub publish_every: usize,

    /// Frame catalog file
    pub catalog: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            iris_diameter_mm: IRIS_DIAMETER_MM,
            frame_aspect_ratio: FRAME_ASPECT_RATIO,
            bridge_offset_mm: BRIDGE_OFFSET_MM,
            fusion: FusionPolicy::EqualWeight,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            min_samples: MIN_STABLE_SAMPLES,
            pd_min_mm: PD_MIN_MM,
            pd_max_mm: PD_MAX_MM,
            jump_threshold_mm: JUMP_THRESHOLD_MM,
            aggregation: "trimmed_mean".to_string(),
        }
    }
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            max_tilt_px: DEFAULT_MAX_TILT_PX,
            min_face_ratio: DEFAULT_MIN_FACE_RATIO,
            max_face_ratio: DEFAULT_MAX_FACE_RATIO,
            max_deviation_mm: DEFAULT_MAX_DEVIATION_MM,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_FPS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            publish_every: DEFAULT_PUBLISH_EVERY,
            catalog: PathBuf::from("frames.yaml"),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint as [`Error::ConfigError`]
    pub fn validate(&self) -> Result<()> {
        let cal = &self.calibration;
        if !is_positive_finite(cal.iris_diameter_mm) || !is_positive_finite(cal.frame_aspect_ratio) {
            return Err(Error::ConfigError(
                "Iris diameter and frame aspect ratio must be positive".to_string(),
            ));
        }
        if !cal.bridge_offset_mm.is_finite() {
            return Err(Error::ConfigError("Bridge offset must be finite".to_string()));
        }
        if let FusionPolicy::IrisWeighted { iris_weight } = cal.fusion {
            if !(0.0..=1.0).contains(&iris_weight) {
                return Err(Error::ConfigError(
                    "Iris weight must be between 0.0 and 1.0".to_string(),
                ));
            }
        }

        let smoothing = &self.smoothing;
        if smoothing.window_capacity == 0 {
            return Err(Error::ConfigError(
                "Smoothing window capacity must be greater than 0".to_string(),
            ));
        }
        if smoothing.min_samples == 0 || smoothing.min_samples > smoothing.window_capacity {
            return Err(Error::ConfigError(format!(
                "Minimum samples must be between 1 and the window capacity ({})",
                smoothing.window_capacity
            )));
        }
        let pd_range_ok = smoothing.pd_min_mm > 0.0 && smoothing.pd_min_mm < smoothing.pd_max_mm;
        if !(pd_range_ok && smoothing.pd_max_mm.is_finite()) {
            return Err(Error::ConfigError(
                "PD range must satisfy 0 < min < max".to_string(),
            ));
        }
        if !is_positive_finite(smoothing.jump_threshold_mm) {
            return Err(Error::ConfigError("Jump threshold must be positive".to_string()));
        }
        create_aggregator(&smoothing.aggregation)
            .map_err(|e| Error::ConfigError(format!("Invalid aggregation: {e}")))?;

        let pos = &self.positioning;
        if !(pos.min_face_ratio > 0.0 && pos.min_face_ratio < pos.max_face_ratio) {
            return Err(Error::ConfigError(
                "Face ratio range must satisfy 0 < min < max".to_string(),
            ));
        }
        if pos.max_tilt_px < 0.0 || pos.max_deviation_mm < 0.0 {
            return Err(Error::ConfigError(
                "Tilt and deviation thresholds must be non-negative".to_string(),
            ));
        }

        if self.display.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }
        if self.session.publish_every == 0 {
            return Err(Error::ConfigError(
                "Snapshot interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pupillary Distance Measurement Configuration

# Scale resolution
calibration:
  iris_diameter_mm: 11.7
  frame_aspect_ratio: 0.35
  bridge_offset_mm: 2.0
  fusion:
    kind: equal_weight
  # fusion:
  #   kind: iris_weighted
  #   iris_weight: 0.7

# Temporal smoothing
smoothing:
  window_capacity: 15
  min_samples: 3
  pd_min_mm: 40.0
  pd_max_mm: 80.0
  jump_threshold_mm: 8.0
  aggregation: "trimmed_mean"

# Positioning feedback
positioning:
  max_tilt_px: 15.0
  min_face_ratio: 0.35
  max_face_ratio: 0.70
  max_deviation_mm: 0.6

# Frame loop
display:
  target_fps: 30

# Session
session:
  publish_every: 5
  catalog: "frames.yaml"
"#;
