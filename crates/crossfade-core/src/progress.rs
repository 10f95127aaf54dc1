//! Progress arithmetic for transfer runs.
//!
//! The backend reports a 0-100 figure for the single playlist currently
//! being transferred. [`global_percent`] folds that into a run-wide figure
//! weighted by playlist size, and [`LocalProgress`] makes sure a job's
//! figure never moves backwards.

/// Overall completion of a run, in percent.
///
/// * `sizes` - track count of every job in run order
/// * `completed` - number of jobs already finished (also the index of the active job)
/// * `local_percent` - backend progress of the active job, 0-100
///
/// When every size is zero the figure falls back to counting jobs.
#[must_use]
pub fn global_percent(sizes: &[u64], completed: usize, local_percent: f64) -> f64 {
    let jobs = sizes.len();
    if jobs == 0 || completed >= jobs {
        return 100.0;
    }

    let total: u64 = sizes.iter().sum();
    if total == 0 {
        return 100.0 * completed as f64 / jobs as f64;
    }

    let processed: u64 = sizes[..completed].iter().sum();
    let fraction = sizes[completed] as f64 * (clamp_percent(local_percent) / 100.0);
    100.0 * (processed as f64 + fraction) / total as f64
}

/// Clamp a percentage into 0..=100, mapping NaN to 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Monotonic filter for one job's backend progress samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProgress {
    accepted: Option<f64>,
}

impl LocalProgress {
    /// Start with nothing accepted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a sample; returns it if accepted.
    ///
    /// Samples below the last accepted one are discarded.
    pub fn accept(&mut self, sample: f64) -> Option<f64> {
        if !sample.is_finite() {
            return None;
        }
        let sample = clamp_percent(sample);
        match self.accepted {
            Some(last) if sample < last => {
                tracing::debug!("Discarding stale progress sample {sample:.1} < {last:.1}");
                None
            }
            _ => {
                self.accepted = Some(sample);
                Some(sample)
            }
        }
    }

    /// Last accepted sample, 0 if none.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.accepted.unwrap_or(0.0)
    }
}
