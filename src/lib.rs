//! Pupillary distance and mounting height measurement from facial landmarks.
//!
//! This library turns per-frame face mesh landmarks into stable eyewear
//! measurements:
//! - Pixel-to-millimeter calibration from the iris diameter, optionally fused
//!   with a reference eyeglass frame of known size
//! - Raw per-frame PD, per-eye PD, and mounting heights
//! - Range and jump filtering plus windowed smoothing of the readings
//! - Positioning feedback and a capture step that freezes the result
//!
//! The measurement pipeline per frame is:
//! 1. Extract the named keypoints from the detector output
//! 2. Resolve a millimeters-per-pixel scale
//! 3. Derive a raw measurement sample
//! 4. Filter and smooth it into a displayable result
//!
//! # Examples
//!
//! ## Driving a Session
//!
//! ```no_run
//! use pupillary_distance::{config::Config, replay::RecordingSource, runner::FrameSource,
//!                          session::MeasurementSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = MeasurementSession::new(&Config::default())?;
//! let mut source = RecordingSource::open("session.jsonl")?;
//!
//! while let Some(frame) = source.next_frame()? {
//!     let report = session.process_frame(&frame.faces, frame.width, frame.height);
//!     println!("{:?}: {}", report.state, report.guidance.message());
//! }
//!
//! let captured = session.capture()?;
//! println!("PD: {} mm", captured.formatted.pd);
//! # Ok(())
//! # }
//! ```
//!
//! ## Smoothing Readings Directly
//!
//! ```
//! use pupillary_distance::{config::SmoothingConfig, measurement::MeasurementSample,
//!                          smoothing::Smoother};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut smoother = Smoother::new(&SmoothingConfig::default())?;
//! for pd in [62.0, 62.4, 61.8] {
//!     smoother.ingest(MeasurementSample::symmetric(pd, 21.0));
//! }
//!
//! assert_eq!(smoother.formatted().pd, "62.1");
//! # Ok(())
//! # }
//! ```
//!
//! ## Calibrating Against a Frame
//!
//! ```no_run
//! use pupillary_distance::{catalog::{FrameStore, YamlFrameStore}, config::Config,
//!                          session::MeasurementSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = YamlFrameStore::new("frames.yaml");
//! let reference = store.list()?.select("AV-01")?;
//!
//! let mut session = MeasurementSession::new(&Config::default())?;
//! session.select_reference_frame(Some(reference));
//! # Ok(())
//! # }
//! ```

/// Millimeters-per-pixel scale resolution
pub mod calibration;

/// Eyewear frame catalog and its persistence
pub mod catalog;

/// Configuration management
pub mod config;

/// Constants used throughout the library
pub mod constants;

/// Error types and result handling
pub mod error;

/// Point helpers and the frame alignment box
pub mod geometry;

/// Detector landmark input and keypoint extraction
pub mod landmarks;

/// Raw per-frame measurement derivation
pub mod measurement;

/// Positioning feedback for the person being measured
pub mod positioning;

/// JSON-lines recordings of detector output
pub mod replay;

/// Threaded frame loop with single in-flight detection
pub mod runner;

/// Per-session measurement state and capture
pub mod session;

/// Outlier filtering and windowed smoothing of measurements
pub mod smoothing;

pub use error::{Error, Result};
