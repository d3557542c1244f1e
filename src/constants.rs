//! Constants used throughout the measurement pipeline

/// Number of points produced by the refined face mesh (468 mesh + 10 iris)
pub const NUM_FACIAL_LANDMARKS: usize = 478;

/// Average horizontal visible iris diameter of an adult, in millimeters
pub const IRIS_DIAMETER_MM: f64 = 11.7;

/// Empirical height:width ratio of an eyewear frame front
pub const FRAME_ASPECT_RATIO: f64 = 0.35;

/// Offset between catalog bridge width and the visible inner-corner gap
pub const BRIDGE_OFFSET_MM: f64 = 2.0;

/// Default weight of the iris ratio under the iris-weighted fusion policy
pub const DEFAULT_IRIS_WEIGHT: f64 = 0.7;

/// Physiologically plausible adult PD range, in millimeters (inclusive)
pub const PD_MIN_MM: f64 = 40.0;
pub const PD_MAX_MM: f64 = 80.0;

/// Largest accepted deviation of a new PD reading from the smoothed PD
pub const JUMP_THRESHOLD_MM: f64 = 8.0;

/// Default smoothing window capacity
pub const DEFAULT_WINDOW_CAPACITY: usize = 15;

/// Samples required before a smoothed result is emitted
pub const MIN_STABLE_SAMPLES: usize = 3;

/// Trimmed mean drops this many samples from each end of the PD ordering
pub const DEFAULT_TRIM_COUNT: usize = 2;

/// Trimming only applies to windows holding more than this many samples
pub const DEFAULT_TRIM_MIN_WINDOW: usize = 6;

/// Positioning feedback defaults
pub const DEFAULT_MAX_TILT_PX: f64 = 15.0;
pub const DEFAULT_MIN_FACE_RATIO: f64 = 0.35;
pub const DEFAULT_MAX_FACE_RATIO: f64 = 0.70;
pub const DEFAULT_MAX_DEVIATION_MM: f64 = 0.6;

/// Default frames per second of the per-frame loop
pub const DEFAULT_FPS: u32 = 30;

/// Snapshots are published at least every this many processed frames
pub const DEFAULT_PUBLISH_EVERY: usize = 5;

/// Placeholder shown before any smoothed result exists
pub const PLACEHOLDER: &str = "--";
