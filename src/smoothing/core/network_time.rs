use std::cell::Cell;
use std::time::Instant;

/// Source of timestamps in seconds.
///
/// Local time must be monotonic. Remote time only has to be non-decreasing and
/// stable across a session.
pub trait TimeSource {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start_instant: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> f64 {
        self.start_instant.elapsed().as_secs_f64()
    }
}

/// Clock driven by hand. Used by tests and by integrators replaying recorded timings.
#[derive(Debug, Default)]
pub struct ManualClock {
    time: Cell<f64>,
}

impl ManualClock {
    pub fn new(time: f64) -> Self {
        Self {
            time: Cell::new(time),
        }
    }

    pub fn set(&self, time: f64) {
        self.time.set(time);
    }

    pub fn advance(&self, delta_time: f64) {
        self.time.set(self.time.get() + delta_time);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRate {
    send_rate: u32,
}

impl TickRate {
    pub fn new(send_rate: u32) -> Self {
        Self {
            send_rate: send_rate.max(1),
        }
    }

    pub fn from_send_interval(send_interval: f64) -> Self {
        Self::new(send_rate_for_interval(send_interval))
    }

    pub fn send_rate(&self) -> u32 {
        self.send_rate
    }

    pub fn send_interval(&self) -> f64 {
        1.0 / self.send_rate as f64
    }

    // remote time of a tick, in seconds
    pub fn ticks_to_time(&self, tick: u64) -> f64 {
        tick as f64 * self.send_interval()
    }
}

pub fn send_rate_for_interval(send_interval: f64) -> u32 {
    if send_interval > 0.0 {
        ((1.0 / send_interval).round() as u32).max(1)
    } else {
        1
    }
}

/// Exponential moving average with running variance.
///
/// The smoothing factor is `alpha = 2 / (n + 1)`. The first sample is taken as is,
/// so there is no warm-up lag.
#[derive(Debug, Copy, Clone)]
pub struct ExponentialMovingAverage {
    alpha: f64,
    initialized: bool,
    pub value: f64,
    pub variance: f64,
    pub standard_deviation: f64,
}

impl ExponentialMovingAverage {
    pub fn new(n: u32) -> Self {
        Self {
            alpha: 2.0 / (n as f64 + 1.0),
            value: 0.0,
            variance: 0.0,
            standard_deviation: 0.0,
            initialized: false,
        }
    }

    pub fn add(&mut self, new_value: f64) {
        if self.initialized {
            let delta = new_value - self.value;
            self.value += self.alpha * delta;
            self.variance = (1.0 - self.alpha) * (self.variance + self.alpha * delta.powi(2));
            self.standard_deviation = self.variance.sqrt();
        } else {
            self.value = new_value;
            self.variance = 0.0;
            self.standard_deviation = 0.0;
            self.initialized = true;
        }
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.variance = 0.0;
        self.standard_deviation = 0.0;
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
