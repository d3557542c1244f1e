//! Measurement session: the per-frame pipeline driver.
//!
//! A session owns all mutable measurement state (selected reference,
//! adjustments, smoothing window) and is driven one detector result at a
//! time: calibration, then raw measurement, then smoothing. UI consumers get
//! throttled [`SessionSnapshot`] copies instead of observing the hot state.

use crate::{
    calibration::{AdjustmentFactors, Calibration, CalibrationResolver, ReferenceFrame},
    config::Config,
    geometry::AlignmentBox,
    landmarks::LandmarkSet,
    measurement::MeasurementSample,
    positioning::{Guidance, PositionAdvisor, StabilityInput},
    smoothing::{FormattedResult, IngestOutcome, Rejection, SmoothedResult, Smoother},
    Error, Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::mem::{discriminant, Discriminant};

/// Camera facing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera, image is mirrored for display
    #[default]
    User,
    /// Back camera
    Environment,
}

impl Facing {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::User => Self::Environment,
            Self::Environment => Self::User,
        }
    }
}

/// Pipeline state derived from the smoothing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "samples", rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing accumulated since the last reset
    NoFace,
    /// Window filling, no smoothed result yet
    Accumulating(usize),
    /// Smoothed result available
    Stable(usize),
}

impl SessionState {
    #[must_use]
    pub fn is_stable(self) -> bool {
        matches!(self, Self::Stable(_))
    }
}

/// What happened to a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Session stopped, frame ignored
    Stopped,
    /// Detector found no face
    NoFace,
    /// Scale was zero, negative, or not finite
    DegenerateScale,
    /// Sample computed but filtered out
    Rejected(Rejection),
    /// Sample entered the smoothing window
    Accepted,
}

/// Per-frame result handed back to the caller
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub state: SessionState,
    /// Raw sample for this frame, when a scale could be resolved
    pub sample: Option<MeasurementSample>,
    pub calibration: Option<Calibration>,
    pub guidance: Guidance,
}

/// Copy of the session state for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub frame_index: u64,
    pub state: SessionState,
    pub result: Option<SmoothedResult>,
    pub formatted: FormattedResult,
    pub guidance: Guidance,
    pub status: String,
    pub alignment_box: Option<AlignmentBox>,
}

/// Frozen measurement returned by [`MeasurementSession::capture`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedMeasurement {
    pub result: SmoothedResult,
    pub formatted: FormattedResult,
    pub reference: Option<ReferenceFrame>,
    pub facing: Facing,
}

/// Decides when a snapshot is worth publishing
#[derive(Debug, Clone)]
pub struct SnapshotThrottle {
    every: usize,
    since_last: usize,
    last_state: Option<Discriminant<SessionState>>,
}

impl SnapshotThrottle {
    /// Publish every `every` frames, and whenever the state kind changes
    ///
    /// # Panics
    ///
    /// Panics if `every` is zero
    #[must_use]
    pub fn new(every: usize) -> Self {
        assert!(every > 0, "Snapshot interval must be greater than 0");
        Self {
            every,
            since_last: 0,
            last_state: None,
        }
    }

    /// Record one processed frame; true if a snapshot should go out
    pub fn tick(&mut self, state: SessionState) -> bool {
        self.since_last += 1;
        let kind = discriminant(&state);
        let changed = self.last_state != Some(kind);
        if changed || self.since_last >= self.every {
            self.since_last = 0;
            self.last_state = Some(kind);
            true
        } else {
            false
        }
    }
}

/// Owns the measurement state of one camera session
pub struct MeasurementSession {
    resolver: CalibrationResolver,
    smoother: Smoother,
    advisor: PositionAdvisor,
    throttle: SnapshotThrottle,
    reference: Option<ReferenceFrame>,
    adjustment: AdjustmentFactors,
    facing: Facing,
    running: bool,
    frame_index: u64,
    guidance: Guidance,
    alignment_box: Option<AlignmentBox>,
}

impl MeasurementSession {
    /// Create a session from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver: CalibrationResolver::from_config(&config.calibration),
            smoother: Smoother::new(&config.smoothing)?,
            advisor: PositionAdvisor::new(config.positioning.clone()),
            throttle: SnapshotThrottle::new(config.session.publish_every),
            reference: None,
            adjustment: AdjustmentFactors::IDENTITY,
            facing: Facing::default(),
            running: true,
            frame_index: 0,
            guidance: Guidance::SearchingForFace,
            alignment_box: None,
        })
    }

    /// Run one detector result through the pipeline.
    ///
    /// `faces` is the detector output for the frame; only the first face is
    /// measured. `width` and `height` are the frame size in pixels.
    pub fn process_frame(&mut self, faces: &[LandmarkSet], width: f64, height: f64) -> FrameReport {
        if !self.running {
            return self.report(FrameOutcome::Stopped, None, None);
        }
        self.frame_index += 1;

        let Some(landmarks) = faces.first() else {
            self.guidance = Guidance::SearchingForFace;
            self.alignment_box = None;
            return self.report(FrameOutcome::NoFace, None, None);
        };

        let face = landmarks.to_geometry(width, height);
        let calibration = self
            .resolver
            .resolve(&face, self.reference.as_ref(), &self.adjustment);

        let (outcome, sample) = match &calibration {
            None => (FrameOutcome::DegenerateScale, None),
            Some(calibration) => {
                let sample = MeasurementSample::from_face(&face, calibration);
                let outcome = match self.smoother.ingest(sample) {
                    IngestOutcome::Rejected(rejection) => FrameOutcome::Rejected(rejection),
                    IngestOutcome::Accumulating(_) | IngestOutcome::Updated(_) => FrameOutcome::Accepted,
                };
                (outcome, Some(sample))
            }
        };

        self.alignment_box = calibration.as_ref().and_then(|c| c.alignment_box);
        let stability = StabilityInput {
            stable: self.smoother.is_stable(),
            pd_std_dev: self.smoother.statistics().map(|s| s.std_dev),
        };
        self.guidance = self.advisor.evaluate(Some(&face), stability);

        self.report(outcome, sample, calibration)
    }

    fn report(
        &self,
        outcome: FrameOutcome,
        sample: Option<MeasurementSample>,
        calibration: Option<Calibration>,
    ) -> FrameReport {
        FrameReport {
            outcome,
            state: self.state(),
            sample,
            calibration,
            guidance: self.guidance,
        }
    }

    /// Current pipeline state
    #[must_use]
    pub fn state(&self) -> SessionState {
        let n = self.smoother.len();
        if self.smoother.is_stable() {
            SessionState::Stable(n)
        } else if n > 0 {
            SessionState::Accumulating(n)
        } else {
            SessionState::NoFace
        }
    }

    /// Copy of the current state, regardless of throttling
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame_index: self.frame_index,
            state: self.state(),
            result: self.smoother.result(),
            formatted: self.smoother.formatted(),
            guidance: self.guidance,
            status: self.guidance.message().to_string(),
            alignment_box: self.alignment_box,
        }
    }

    /// Snapshot if the throttle allows one after the latest frame
    pub fn poll_snapshot(&mut self) -> Option<SessionSnapshot> {
        let state = self.state();
        self.throttle.tick(state).then(|| self.snapshot())
    }

    /// Freeze the current smoothed result as the final measurement
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if the result never became stable
    pub fn capture(&self) -> Result<CapturedMeasurement> {
        let Some(result) = self.smoother.result() else {
            return Err(Error::InsufficientData {
                samples: self.smoother.len(),
                required: self.smoother.min_samples(),
            });
        };
        info!("Captured PD {:.1}mm from {} samples", result.value.total_pd, result.samples);
        Ok(CapturedMeasurement {
            result,
            formatted: result.formatted(),
            reference: self.reference,
            facing: self.facing,
        })
    }

    /// Select a new reference frame, or clear it with `None`.
    ///
    /// Adjustments return to identity and the window is cleared.
    pub fn select_reference_frame(&mut self, reference: Option<ReferenceFrame>) {
        match &reference {
            Some(r) => info!("Reference frame selected: {}mm wide", r.width_mm()),
            None => info!("Reference frame cleared, using iris scale"),
        }
        self.reference = reference;
        self.adjustment = AdjustmentFactors::IDENTITY;
        self.reset("reference frame changed");
    }

    /// Currently selected reference frame
    #[must_use]
    pub fn reference_frame(&self) -> Option<&ReferenceFrame> {
        self.reference.as_ref()
    }

    /// Replace the alignment adjustments
    pub fn set_adjustment(&mut self, adjustment: AdjustmentFactors) {
        debug!("Adjustment changed to {adjustment:?}");
        self.adjustment = adjustment;
    }

    #[must_use]
    pub fn adjustment(&self) -> AdjustmentFactors {
        self.adjustment
    }

    /// Switch between front and back camera; clears the window
    pub fn toggle_facing(&mut self) -> Facing {
        self.facing = self.facing.toggled();
        self.reset("camera facing toggled");
        self.facing
    }

    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Stop accepting frames
    pub fn stop(&mut self) {
        if self.running {
            info!("Measurement stopped");
            self.running = false;
        }
    }

    /// Accept frames again after [`stop`](Self::stop); clears the window
    pub fn resume(&mut self) {
        self.running = true;
        self.reset("measurement resumed");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current smoothed result, if any
    #[must_use]
    pub fn result(&self) -> Option<SmoothedResult> {
        self.smoother.result()
    }

    /// Latest positioning guidance
    #[must_use]
    pub fn guidance(&self) -> Guidance {
        self.guidance
    }

    fn reset(&mut self, reason: &str) {
        info!("Smoothing window cleared: {reason}");
        self.smoother.reset();
        self.guidance = Guidance::SearchingForFace;
        self.alignment_box = None;
    }
}
