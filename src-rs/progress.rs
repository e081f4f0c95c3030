//! Progress reporting for pipeline runs.

/// Receives the completed fraction after each processed group.
///
/// Observational only; a sink cannot influence the run.
pub trait ProgressSink {
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> ProgressSink for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _fraction: f64) {}
}

/// Fraction for `completed` of `total` groups; exactly 1.0 on the last one.
pub fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 || completed >= total {
        return 1.0;
    }
    completed as f64 / total as f64
}
