//! Rolling tick timing.

use std::collections::VecDeque;
use std::time::Duration;

/// Samples kept by default (a bit over three seconds at 60 Hz).
pub const DEFAULT_WINDOW: usize = 200;

/// Rolling average over the most recent tick durations.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    samples: VecDeque<Duration>,
    window: usize,
    sum: Duration,
    max: Duration,
    recorded: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FrameTimer {
    /// Creates a timer averaging over `window` samples (at least one).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            sum: Duration::ZERO,
            max: Duration::ZERO,
            recorded: 0,
        }
    }

    /// Adds a sample, dropping the oldest once the window is full.
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;
        self.max = self.max.max(sample);
        self.recorded += 1;
    }

    /// Mean of the samples in the window.
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let count = u32::try_from(self.samples.len()).ok().filter(|&n| n > 0)?;
        Some(self.sum / count)
    }

    /// Average in milliseconds, 0 before the first sample.
    #[must_use]
    pub fn average_ms(&self) -> f64 {
        self.average().map_or(0.0, |d| d.as_secs_f64() * 1000.0)
    }

    /// Slowest sample ever recorded.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Samples recorded since creation.
    #[must_use]
    pub const fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Samples currently in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true before the first sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_window() {
        let mut timer = FrameTimer::new(3);
        assert_eq!(timer.average(), None);

        for ms in [10, 20, 30] {
            timer.record(Duration::from_millis(ms));
        }
        assert_eq!(timer.average(), Some(Duration::from_millis(20)));

        // 10 falls out of the window
        timer.record(Duration::from_millis(40));
        assert_eq!(timer.len(), 3);
        assert_eq!(timer.average(), Some(Duration::from_millis(30)));
        assert_eq!(timer.max(), Duration::from_millis(40));
        assert_eq!(timer.recorded(), 4);
    }

    #[test]
    fn test_zero_window_keeps_one_sample() {
        let mut timer = FrameTimer::new(0);
        timer.record(Duration::from_millis(5));
        timer.record(Duration::from_millis(7));
        assert_eq!(timer.average(), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_default_window() {
        let mut timer = FrameTimer::default();
        for _ in 0..250 {
            timer.record(Duration::from_micros(100));
        }
        assert_eq!(timer.len(), DEFAULT_WINDOW);
        assert!((timer.average_ms() - 0.1).abs() < 1e-9);
    }
}
