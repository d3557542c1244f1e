use super::WindowAggregator;
use crate::{
    constants::{DEFAULT_TRIM_COUNT, DEFAULT_TRIM_MIN_WINDOW},
    measurement::MeasurementSample,
    Error, Result,
};

/// Field-wise mean of a set of samples.
///
/// Averages deviations from the first sample so a window of identical values
/// yields that value exactly.
pub(crate) fn mean_of<'a, I>(samples: I) -> Option<MeasurementSample>
where
    I: IntoIterator<Item = &'a MeasurementSample>,
{
    let mut iter = samples.into_iter();
    let pivot = *iter.next()?;
    let mut offset = MeasurementSample::default();
    let mut count = 1.0;

    for s in iter {
        offset.total_pd += s.total_pd - pivot.total_pd;
        offset.left_pd += s.left_pd - pivot.left_pd;
        offset.right_pd += s.right_pd - pivot.right_pd;
        offset.left_height += s.left_height - pivot.left_height;
        offset.right_height += s.right_height - pivot.right_height;
        count += 1.0;
    }

    Some(MeasurementSample {
        total_pd: pivot.total_pd + offset.total_pd / count,
        left_pd: pivot.left_pd + offset.left_pd / count,
        right_pd: pivot.right_pd + offset.right_pd / count,
        left_height: pivot.left_height + offset.left_height / count,
        right_height: pivot.right_height + offset.right_height / count,
    })
}

/// Plain arithmetic mean over the whole window
pub struct MeanAggregator;

impl WindowAggregator for MeanAggregator {
    fn aggregate(&self, window: &[MeasurementSample]) -> Option<MeasurementSample> {
        mean_of(window)
    }

    fn name(&self) -> &str {
        "MeanAggregator"
    }
}

/// Mean after discarding the extreme PD readings
pub struct TrimmedMeanAggregator {
    trim: usize,
    min_window: usize,
}

impl TrimmedMeanAggregator {
    /// Drop `trim` samples from each end once the window holds more than `min_window`
    ///
    /// # Panics
    ///
    /// Panics if trimming could empty the window, i.e. `min_window < 2 * trim`
    #[must_use]
    pub fn new(trim: usize, min_window: usize) -> Self {
        assert!(
            min_window >= 2 * trim,
            "Trim window must keep at least one sample, got trim {trim} with window {min_window}"
        );
        Self { trim, min_window }
    }
}

impl Default for TrimmedMeanAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TRIM_COUNT, DEFAULT_TRIM_MIN_WINDOW)
    }
}

impl WindowAggregator for TrimmedMeanAggregator {
    fn aggregate(&self, window: &[MeasurementSample]) -> Option<MeasurementSample> {
        if window.len() <= self.min_window {
            return mean_of(window);
        }

        let mut sorted = window.to_vec();
        sorted.sort_by(|a, b| a.total_pd.total_cmp(&b.total_pd));
        mean_of(&sorted[self.trim..sorted.len() - self.trim])
    }

    fn name(&self) -> &str {
        "TrimmedMeanAggregator"
    }
}

/// Create an aggregator by name.
///
/// Accepts `mean` and `trimmed_mean`, the latter optionally parameterized as
/// `trimmed_mean:<trim>` or `trimmed_mean:<trim>:<min_window>`.
///
/// # Errors
///
/// Returns an error for unknown names or malformed parameters
pub fn create_aggregator(spec: &str) -> Result<Box<dyn WindowAggregator>> {
    let mut parts = spec.split(':');
    let name = parts.next().unwrap_or_default().to_lowercase();
    let params = parts
        .map(|p| {
            p.trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidInput(format!("Invalid aggregator parameter '{p}' in '{spec}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    match (name.as_str(), params.as_slice()) {
        ("mean" | "average", []) => Ok(Box::new(MeanAggregator)),
        ("trimmed_mean" | "trimmedmean", []) => Ok(Box::new(TrimmedMeanAggregator::default())),
        ("trimmed_mean" | "trimmedmean", &[trim]) => {
            let min_window = DEFAULT_TRIM_MIN_WINDOW.max(2 * trim);
            Ok(Box::new(TrimmedMeanAggregator::new(trim, min_window)))
        }
        ("trimmed_mean" | "trimmedmean", &[trim, min_window]) => {
            if min_window < 2 * trim {
                return Err(Error::InvalidInput(format!(
                    "Trimmed mean window {min_window} too small for trim {trim}"
                )));
            }
            Ok(Box::new(TrimmedMeanAggregator::new(trim, min_window)))
        }
        _ => Err(Error::InvalidInput(format!("Unknown aggregator: {spec}"))),
    }
}
