use crate::timer::{CalibrationStats, Timer};
use std::time::Duration;
use tracing::debug;

/// Paces a loop at a fixed tick rate on top of a [`Timer`].
///
/// Deadlines are absolute (`origin + n * interval`), so a late tick does not
/// shift the ones after it. A tick that is already overdue returns
/// immediately.
#[derive(Debug, Clone)]
pub struct FixedRateClock<T: Timer<Timestamp = u64>> {
    timer: T,
    interval_ns: u64,
    origin: u64,
    ticks: u64,
    last: Option<u64>,
    late_ticks: u64,
}

impl<T: Timer<Timestamp = u64>> FixedRateClock<T> {
    pub fn new(timer: T, tick_rate: f32) -> Self {
        let interval_ns = (1e9 / f64::from(tick_rate.max(f32::EPSILON))).round() as u64;
        let origin = timer.now();
        Self {
            timer,
            interval_ns: interval_ns.max(1),
            origin,
            ticks: 0,
            last: None,
            late_ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn late_ticks(&self) -> u64 {
        self.late_ticks
    }

    /// Blocks until the next deadline and returns the timestamp of the tick.
    pub fn wait_next_tick(&mut self) -> u64 {
        self.ticks += 1;
        let deadline = self.origin + self.ticks * self.interval_ns;
        let now = self.timer.now();
        if now < deadline {
            self.timer.sleep(Duration::from_nanos(deadline - now));
        } else if now - deadline > self.interval_ns {
            self.late_ticks += 1;
            debug!(
                tick = self.ticks,
                late_ms = (now - deadline) as f64 / 1e6,
                "tick overran its budget"
            );
        }
        let at = self.timer.now();
        if let Some(prev) = self.last {
            self.timer
                .record_frame(Duration::from_nanos(at.saturating_sub(prev)));
        }
        self.last = Some(at);
        at
    }

    pub fn stats(&self) -> CalibrationStats {
        self.timer.calibration_stats()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
