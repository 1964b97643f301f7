//! Row-level progress reporting for long transforms.
//!
//! Reporting is best-effort: a failing sink is logged and ignored, it never
//! aborts the transform.

use std::io;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Rows between progress notifications unless the caller overrides it.
pub const DEFAULT_PROGRESS_STEP: usize = 500;

/// Minimum wall-clock gap between two notifications.
pub const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Progress of a row-by-row transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowProgress {
    /// Rows mapped so far.
    pub current: usize,
    /// Total data rows.
    pub total: usize,
    /// Completion as a fraction (0.0 to 1.0).
    pub fraction: f32,
}

impl RowProgress {
    #[must_use]
    pub fn new(current: usize, total: usize) -> Self {
        let fraction = if total > 0 {
            (current as f64 / total as f64) as f32
        } else {
            0.0
        };
        Self {
            current,
            total,
            fraction,
        }
    }

    /// Completion as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u8 {
        (self.fraction * 100.0).min(100.0) as u8
    }
}

/// Receiver of progress notifications.
pub trait ProgressSink {
    fn report(&mut self, progress: RowProgress) -> io::Result<()>;
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: RowProgress) -> io::Result<()> {
        Ok(())
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(RowProgress) -> io::Result<()>,
{
    fn report(&mut self, progress: RowProgress) -> io::Result<()> {
        self(progress)
    }
}

/// Debounces notifications by row step and elapsed time.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: usize,
    min_interval: Duration,
    last_row: usize,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    /// `step` of `None` or `0` falls back to [`DEFAULT_PROGRESS_STEP`].
    pub fn new(step: Option<usize>) -> Self {
        Self::with_interval(step, MIN_PROGRESS_INTERVAL)
    }

    pub fn with_interval(step: Option<usize>, min_interval: Duration) -> Self {
        Self {
            step: step.filter(|s| *s > 0).unwrap_or(DEFAULT_PROGRESS_STEP),
            min_interval,
            last_row: 0,
            last_emit: None,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether a notification for `row` should go out at `now`. Records the
    /// emission when it returns true.
    pub fn should_emit(&mut self, row: usize, now: Instant) -> bool {
        if row < self.last_row + self.step {
            return false;
        }
        if let Some(last) = self.last_emit
            && now.duration_since(last) < self.min_interval
        {
            return false;
        }
        self.last_row = row;
        self.last_emit = Some(now);
        true
    }
}

/// Throttled reporter that swallows sink failures.
pub struct ProgressReporter<'a> {
    sink: &'a mut dyn ProgressSink,
    throttle: ProgressThrottle,
    total: usize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, throttle: ProgressThrottle, total: usize) -> Self {
        Self {
            sink,
            throttle,
            total,
        }
    }

    /// Notifies the sink if the throttle allows it.
    pub fn row_done(&mut self, row: usize) {
        if self.throttle.should_emit(row, Instant::now()) {
            self.send(row);
        }
    }

    /// Sends a final notification regardless of the throttle.
    pub fn finish(&mut self) {
        self.send(self.total);
    }

    fn send(&mut self, row: usize) {
        if let Err(err) = self.sink.report(RowProgress::new(row, self.total)) {
            debug!(error = %err, row, "progress sink failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_fraction_and_percentage() {
        let progress = RowProgress::new(250, 1000);
        assert!((progress.fraction - 0.25).abs() < 0.001);
        assert_eq!(progress.percentage(), 25);
        assert_eq!(RowProgress::new(0, 0).percentage(), 0);
    }

    #[test]
    fn throttle_respects_step_and_interval() {
        let start = Instant::now();
        let mut throttle = ProgressThrottle::with_interval(Some(10), Duration::from_millis(100));

        assert!(!throttle.should_emit(9, start));
        assert!(throttle.should_emit(10, start));
        // Step reached but too soon after the last emission.
        assert!(!throttle.should_emit(20, start + Duration::from_millis(50)));
        assert!(throttle.should_emit(25, start + Duration::from_millis(150)));
        // Interval passed but step not reached since row 25.
        assert!(!throttle.should_emit(30, start + Duration::from_millis(400)));
        assert!(throttle.should_emit(35, start + Duration::from_millis(400)));
    }

    #[test]
    fn zero_step_uses_default() {
        assert_eq!(ProgressThrottle::new(Some(0)).step(), DEFAULT_PROGRESS_STEP);
        assert_eq!(ProgressThrottle::new(None).step(), DEFAULT_PROGRESS_STEP);
    }

    #[test]
    fn failing_sink_does_not_panic() {
        let mut calls = 0;
        let mut sink = |_: RowProgress| -> io::Result<()> {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        };
        let mut reporter = ProgressReporter::new(
            &mut sink,
            ProgressThrottle::with_interval(Some(1), Duration::ZERO),
            3,
        );
        reporter.row_done(1);
        reporter.row_done(2);
        reporter.finish();
        drop(reporter);
        assert_eq!(calls, 3);
    }
}
