//! Rolling throughput of engine submissions.
//!
//! Reporting cadence is driven by the frame count alone, so the console lines
//! appear at frames N, 2N, 3N, ... no matter how long each frame took.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_WINDOW: usize = 30;

/// Wall time of one engine submission, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessingSample(pub f64);

impl From<Duration> for ProcessingSample {
    fn from(elapsed: Duration) -> Self {
        Self(elapsed.as_secs_f64() * 1000.0)
    }
}

/// The most recent samples plus their running sum.
#[derive(Debug)]
pub struct SlidingWindow {
    samples: VecDeque<f64>,
    running_sum: f64,
    capacity: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            running_sum: 0.0,
            capacity,
        }
    }

    pub fn push(&mut self, sample: ProcessingSample) {
        self.samples.push_back(sample.0);
        self.running_sum += sample.0;
        if self.samples.len() > self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                self.running_sum -= evicted;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sum(&self) -> f64 {
        self.running_sum
    }
}

/// One periodic console report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceReport {
    pub frame_index: u64,
    pub average_ms: f64,
    /// `None` when the average is zero.
    pub effective_fps: Option<f64>,
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Average processing time: {:.2} ms", self.average_ms)?;
        match self.effective_fps {
            Some(fps) => write!(f, "Effective FPS: {:.2}", fps),
            None => write!(f, "Effective FPS: n/a"),
        }
    }
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    window: SlidingWindow,
}

impl PerformanceMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            window: SlidingWindow::new(window),
        }
    }

    pub fn record(&mut self, sample: ProcessingSample) {
        self.window.push(sample);
    }

    pub fn should_report(&self, frame_index: u64) -> bool {
        frame_index > 0 && frame_index % self.window.capacity() as u64 == 0
    }

    pub fn average_ms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.sum() / self.window.len() as f64
    }

    /// Frames per second the engine could sustain at the current average.
    /// Infinite when the average is zero; see `report` for the guarded form.
    pub fn effective_fps(&self) -> f64 {
        1000.0 / self.average_ms()
    }

    pub fn report(&self, frame_index: u64) -> PerformanceReport {
        let average_ms = self.average_ms();
        PerformanceReport {
            frame_index,
            average_ms,
            effective_fps: (average_ms > 0.0).then(|| self.effective_fps()),
        }
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn average_reflects_only_the_last_window() {
        let mut monitor = PerformanceMonitor::new(30);
        let samples: Vec<f64> = (1..=100).map(|i| i as f64 * 0.5).collect();
        for (n, &ms) in samples.iter().enumerate() {
            monitor.record(ProcessingSample(ms));
            let seen = &samples[..=n];
            let tail = &seen[seen.len().saturating_sub(30)..];
            let mean = tail.iter().sum::<f64>() / tail.len() as f64;
            assert!(approx_eq(monitor.average_ms(), mean), "after {} samples", n + 1);
        }
        assert_eq!(monitor.window().len(), 30);
    }

    #[test]
    fn running_sum_matches_contents_after_eviction() {
        let mut window = SlidingWindow::new(3);
        for ms in [10.0, 20.0, 30.0, 40.0, 50.0] {
            window.push(ProcessingSample(ms));
        }
        assert_eq!(window.len(), 3);
        assert!(approx_eq(window.sum(), 120.0));
    }

    #[test]
    fn reports_fire_on_multiples_of_the_window_only() {
        let monitor = PerformanceMonitor::new(30);
        for idx in [30, 60, 90] {
            assert!(monitor.should_report(idx));
        }
        for idx in [0, 1, 15, 29, 31, 59] {
            assert!(!monitor.should_report(idx));
        }
    }

    #[test]
    fn window_of_one_reports_every_frame() {
        let monitor = PerformanceMonitor::new(1);
        assert!(!monitor.should_report(0));
        assert!(monitor.should_report(1));
        assert!(monitor.should_report(2));
    }

    #[test]
    fn effective_fps_inverts_the_average() {
        let mut monitor = PerformanceMonitor::new(4);
        for _ in 0..4 {
            monitor.record(ProcessingSample(25.0));
        }
        let report = monitor.report(4);
        assert!(approx_eq(report.average_ms, 25.0));
        assert!(approx_eq(report.effective_fps.unwrap(), 40.0));
        assert_eq!(
            report.to_string(),
            "Average processing time: 25.00 ms\nEffective FPS: 40.00"
        );
    }

    #[test]
    fn zero_average_has_no_fps() {
        let mut monitor = PerformanceMonitor::new(2);
        monitor.record(ProcessingSample(0.0));
        let report = monitor.report(2);
        assert_eq!(report.effective_fps, None);
        assert!(report.to_string().ends_with("n/a"));
    }

    #[test]
    fn samples_convert_from_durations() {
        let sample = ProcessingSample::from(Duration::from_micros(1_500));
        assert!(approx_eq(sample.0, 1.5));
    }
}
