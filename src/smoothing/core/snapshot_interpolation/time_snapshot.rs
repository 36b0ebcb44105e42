use crate::smoothing::core::snapshot_interpolation::snapshot::Snapshot;

/// Timing-only snapshot driving the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeSnapshot {
    pub remote_time: f64,
    pub local_time: f64,
}

impl TimeSnapshot {
    pub fn new(remote_time: f64, local_time: f64) -> Self {
        Self {
            remote_time,
            local_time,
        }
    }
}

impl Snapshot for TimeSnapshot {
    fn local_time(&self) -> f64 {
        self.local_time
    }

    fn remote_time(&self) -> f64 {
        self.remote_time
    }
}

/// Snapshot carrying one payload value of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayloadSnapshot<V> {
    pub remote_time: f64,
    pub local_time: f64,
    pub value: V,
}

impl<V> PayloadSnapshot<V> {
    pub fn new(remote_time: f64, local_time: f64, value: V) -> Self {
        Self {
            remote_time,
            local_time,
            value,
        }
    }
}

impl<V: Clone> Snapshot for PayloadSnapshot<V> {
    fn local_time(&self) -> f64 {
        self.local_time
    }

    fn remote_time(&self) -> f64 {
        self.remote_time
    }
}
