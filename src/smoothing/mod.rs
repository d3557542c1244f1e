//! Temporal smoothing of per-frame measurements.
//!
//! Raw samples are noisy and occasionally wild. The [`Smoother`] rejects
//! implausible readings and sudden jumps, keeps a bounded FIFO window of
//! accepted samples, and emits a smoothed result once enough samples have
//! accumulated. How the window is reduced to one value is pluggable through
//! [`WindowAggregator`].

/// Mean and trimmed-mean window aggregation
pub mod aggregate;

use crate::{
    config::SmoothingConfig,
    constants::PLACEHOLDER,
    measurement::MeasurementSample,
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trait for reducing a smoothing window to a single sample
pub trait WindowAggregator: Send + Sync {
    /// Aggregate the window; `None` for an empty window
    fn aggregate(&self, window: &[MeasurementSample]) -> Option<MeasurementSample>;

    /// Get aggregator name
    fn name(&self) -> &str;
}

/// Why a sample was kept out of the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// A field is NaN or infinite, or the PD is not positive
    NonFinite,
    /// PD outside the plausible adult range
    OutOfRange { pd: f64 },
    /// PD too far from the current smoothed value
    Jump { pd: f64, smoothed: f64 },
}

/// What happened to an ingested sample
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Sample discarded, no state changed
    Rejected(Rejection),
    /// Sample stored, not enough samples for a result yet
    Accumulating(usize),
    /// Sample stored and the smoothed result recomputed
    Updated(SmoothedResult),
}

/// Current best estimate over the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedResult {
    /// Aggregated values in millimeters, unrounded
    pub value: MeasurementSample,
    /// Window population the value was computed from
    pub samples: usize,
}

impl SmoothedResult {
    /// Values formatted to one decimal millimeter for display
    #[must_use]
    pub fn formatted(&self) -> FormattedResult {
        let f = |v: f64| format!("{v:.1}");
        FormattedResult {
            pd: f(self.value.total_pd),
            left_pd: f(self.value.left_pd),
            right_pd: f(self.value.right_pd),
            left_height: f(self.value.left_height),
            right_height: f(self.value.right_height),
        }
    }
}

/// Display strings for a smoothed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub pd: String,
    pub left_pd: String,
    pub right_pd: String,
    pub left_height: String,
    pub right_height: String,
}

impl FormattedResult {
    /// Placeholder shown before the first stable result
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            pd: PLACEHOLDER.to_string(),
            left_pd: PLACEHOLDER.to_string(),
            right_pd: PLACEHOLDER.to_string(),
            left_height: PLACEHOLDER.to_string(),
            right_height: PLACEHOLDER.to_string(),
        }
    }
}

/// Statistical summary of the PD values in the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Mean PD
    pub mean: f64,
    /// Population standard deviation of the PD
    pub std_dev: f64,
    /// Minimum PD in the window
    pub min: f64,
    /// Maximum PD in the window
    pub max: f64,
    /// Range (max - min)
    pub range: f64,
}

/// Windowed smoother with plausibility and jump rejection
pub struct Smoother {
    capacity: usize,
    min_samples: usize,
    pd_min: f64,
    pd_max: f64,
    jump_threshold: f64,
    aggregator: Box<dyn WindowAggregator>,
    window: VecDeque<MeasurementSample>,
    result: Option<SmoothedResult>,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::with_aggregator(&SmoothingConfig::default(), Box::new(aggregate::TrimmedMeanAggregator::default()))
    }
}

impl Smoother {
    /// Create a smoother from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot hold the minimum population or
    /// the configured aggregator is unknown
    pub fn new(config: &SmoothingConfig) -> Result<Self> {
        if config.window_capacity == 0 {
            return Err(Error::ConfigError(
                "Smoothing window capacity must be greater than 0".to_string(),
            ));
        }
        if config.min_samples > config.window_capacity {
            return Err(Error::ConfigError(format!(
                "Window capacity {} cannot hold {} samples",
                config.window_capacity, config.min_samples
            )));
        }
        let aggregator = aggregate::create_aggregator(&config.aggregation)?;
        Ok(Self::with_aggregator(config, aggregator))
    }

    /// Create a smoother with an explicit aggregator
    ///
    /// # Panics
    ///
    /// Panics if the window capacity is zero or smaller than the minimum population
    #[must_use]
    pub fn with_aggregator(config: &SmoothingConfig, aggregator: Box<dyn WindowAggregator>) -> Self {
        assert!(config.window_capacity > 0, "Window size must be greater than 0");
        assert!(
            config.window_capacity >= config.min_samples,
            "Window capacity {} cannot hold {} samples",
            config.window_capacity,
            config.min_samples
        );
        Self {
            capacity: config.window_capacity,
            min_samples: config.min_samples,
            pd_min: config.pd_min_mm,
            pd_max: config.pd_max_mm,
            jump_threshold: config.jump_threshold_mm,
            aggregator,
            window: VecDeque::with_capacity(config.window_capacity),
            result: None,
        }
    }

    fn check(&self, sample: &MeasurementSample) -> Option<Rejection> {
        let fields = [
            sample.total_pd,
            sample.left_pd,
            sample.right_pd,
            sample.left_height,
            sample.right_height,
        ];
        if fields.iter().any(|v| !v.is_finite()) || sample.total_pd <= 0.0 {
            return Some(Rejection::NonFinite);
        }
        if sample.total_pd < self.pd_min || sample.total_pd > self.pd_max {
            return Some(Rejection::OutOfRange { pd: sample.total_pd });
        }
        if let Some(current) = self.result {
            let smoothed = current.value.total_pd;
            if (sample.total_pd - smoothed).abs() > self.jump_threshold {
                return Some(Rejection::Jump {
                    pd: sample.total_pd,
                    smoothed,
                });
            }
        }
        None
    }

    /// Feed one raw sample
    pub fn ingest(&mut self, sample: MeasurementSample) -> IngestOutcome {
        if let Some(rejection) = self.check(&sample) {
            debug!("Rejected sample: {rejection:?}");
            return IngestOutcome::Rejected(rejection);
        }

        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        let count = self.window.len();
        if count < self.min_samples {
            return IngestOutcome::Accumulating(count);
        }

        let window = self.window.make_contiguous();
        match self.aggregator.aggregate(window) {
            Some(value) => {
                let result = SmoothedResult { value, samples: count };
                self.result = Some(result);
                IngestOutcome::Updated(result)
            }
            None => IngestOutcome::Accumulating(count),
        }
    }

    /// Clear the window and forget the smoothed result
    pub fn reset(&mut self) {
        self.window.clear();
        self.result = None;
    }

    /// Current smoothed result, if the window has ever been populated enough
    #[must_use]
    pub fn result(&self) -> Option<SmoothedResult> {
        self.result
    }

    /// Display strings for the current result, or the placeholder
    #[must_use]
    pub fn formatted(&self) -> FormattedResult {
        self.result
            .as_ref()
            .map_or_else(FormattedResult::placeholder, SmoothedResult::formatted)
    }

    /// Number of samples in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// True when the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples required for a stable result
    #[must_use]
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// True once a smoothed result exists
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.result.is_some()
    }

    /// Name of the aggregation in use
    #[must_use]
    pub fn aggregator_name(&self) -> &str {
        self.aggregator.name()
    }

    /// PD statistics over the window, `None` when empty
    #[must_use]
    pub fn statistics(&self) -> Option<Statistics> {
        if self.window.is_empty() {
            return None;
        }

        let n = self.window.len() as f64;
        let mean = self.window.iter().map(|s| s.total_pd).sum::<f64>() / n;
        let variance = self
            .window
            .iter()
            .map(|s| (s.total_pd - mean).powi(2))
            .sum::<f64>()
            / n;

        let min = self.window.iter().map(|s| s.total_pd).fold(f64::INFINITY, f64::min);
        let max = self.window.iter().map(|s| s.total_pd).fold(f64::NEG_INFINITY, f64::max);

        Some(Statistics {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            range: max - min,
        })
    }
}
