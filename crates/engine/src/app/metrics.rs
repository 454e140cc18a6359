use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Loop throughput over the most recent reporting interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub tick_time_ms: f32,
    pub total_ticks: u64,
}

/// Shared view of the latest published snapshot. Clones observe the same value.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<Mutex<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    interval_ticks: u32,
    interval_tick_time: Duration,
    total_ticks: u64,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            interval_ticks: 0,
            interval_tick_time: Duration::ZERO,
            total_ticks: 0,
        }
    }

    pub(crate) fn record_tick(&mut self, tick_time: Duration) {
        self.interval_ticks = self.interval_ticks.saturating_add(1);
        self.interval_tick_time = self.interval_tick_time.saturating_add(tick_time);
        self.total_ticks = self.total_ticks.saturating_add(1);
    }

    pub(crate) fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Closes the interval once it has elapsed. The running total is never reset.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let tick_time_ms = match self.interval_ticks {
            0 => 0.0,
            ticks => self.interval_tick_time.as_secs_f32() * 1000.0 / ticks as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            tps: self.interval_ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            tick_time_ms,
            total_ticks: self.total_ticks,
        };

        self.interval_start = now;
        self.interval_ticks = 0;
        self.interval_tick_time = Duration::ZERO;
        Some(snapshot)
    }
}
