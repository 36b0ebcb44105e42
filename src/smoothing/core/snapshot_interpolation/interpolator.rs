use crate::smoothing::core::connection_quality::{ConnectionQuality, ConnectionQualityHeuristics};
use crate::smoothing::core::network_time::{TickRate, TimeSource};
use crate::smoothing::core::snapshot_interpolation::interpolate::Interpolate;
use crate::smoothing::core::snapshot_interpolation::snapshot_buffer::SnapshotBuffer;
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation_settings::SnapshotInterpolationSettings;
use crate::smoothing::core::snapshot_interpolation::time_snapshot::{PayloadSnapshot, TimeSnapshot};
use crate::smoothing::core::snapshot_interpolation::timeline::Timeline;
use crate::{log_debug, log_info};
use serde::Serialize;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Typed reference to a payload channel of a [`SnapshotInterpolator`].
pub struct ChannelHandle<V> {
    index: usize,
    _marker: PhantomData<fn() -> V>,
}

impl<V> ChannelHandle<V> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<V> Clone for ChannelHandle<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ChannelHandle<V> {}

impl<V> Debug for ChannelHandle<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelHandle({})", self.index)
    }
}

/// Result of sampling one payload channel for a render step.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSample<V> {
    /// Bracketing pair, ratio and their blend. `from == to` with `t = 0` when the
    /// timeline is outside the buffered range.
    Interpolate { from: V, to: V, t: f64, value: V },
    // nothing buffered, keep the last applied value
    Hold(V),
    Empty,
}

impl<V> ChannelSample<V> {
    pub fn value(&self) -> Option<&V> {
        match self {
            ChannelSample::Interpolate { value, .. } => Some(value),
            ChannelSample::Hold(value) => Some(value),
            ChannelSample::Empty => None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            ChannelSample::Interpolate { value, .. } => Some(value),
            ChannelSample::Hold(value) => Some(value),
            ChannelSample::Empty => None,
        }
    }
}

/// Payload buffer sharing the interpolator's timeline.
#[derive(Debug, Clone)]
pub struct PayloadChannel<V: Interpolate> {
    name: String,
    snapshots: SnapshotBuffer<PayloadSnapshot<V>>,
    last_applied: Option<V>,
}

impl<V: Interpolate> PayloadChannel<V> {
    fn new(name: String, settings: &SnapshotInterpolationSettings) -> Self {
        Self {
            name,
            snapshots: SnapshotBuffer::with_policy(settings.buffer_limit, settings.overflow_policy),
            last_applied: None,
        }
    }

    pub fn snapshots(&self) -> &SnapshotBuffer<PayloadSnapshot<V>> {
        &self.snapshots
    }

    pub fn last_applied(&self) -> Option<&V> {
        self.last_applied.as_ref()
    }

    fn insert(&mut self, snapshot: PayloadSnapshot<V>) -> bool {
        let remote_time = snapshot.remote_time;
        let inserted = self.snapshots.insert_if_not_exists(snapshot);
        if !inserted && self.snapshots.is_full() {
            log_debug!(format!(
                "Payload snapshot {:.4}s dropped on channel '{}', buffer full ({})",
                remote_time,
                self.name,
                self.snapshots.limit()
            ));
        }
        inserted
    }

    fn sample(&mut self, local_timeline: f64) -> ChannelSample<V> {
        match self.snapshots.step_interpolation(local_timeline) {
            Some((from, to, t)) => {
                let value = from.value.interpolate(&to.value, t);
                self.last_applied = Some(value.clone());
                ChannelSample::Interpolate {
                    from: from.value,
                    to: to.value,
                    t,
                    value,
                }
            }
            None => match &self.last_applied {
                Some(value) => ChannelSample::Hold(value.clone()),
                None => ChannelSample::Empty,
            },
        }
    }
}

pub trait PayloadChannelTrait {
    fn name(&self) -> &str;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<V: Interpolate + 'static> PayloadChannelTrait for PayloadChannel<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.snapshots.len()
    }

    // clears buffered snapshots and the held value
    fn clear(&mut self) {
        self.snapshots.clear();
        self.last_applied = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Timeline state for debug overlays.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDiagnostics {
    pub local_timeline: f64,
    pub local_timescale: f64,
    pub buffer_time: f64,
    pub buffer_time_multiplier: f64,
    pub drift: f64,
    pub delivery_jitter: f64,
    pub time_snapshots: usize,
    pub channel_snapshots: Vec<(String, usize)>,
    pub connection_quality: ConnectionQuality,
}

impl TimelineDiagnostics {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Smooths one remote body: a time channel drives the timeline, any number of
/// payload channels are sampled at the shared local timeline.
///
/// Call [`add_time_snapshot`](Self::add_time_snapshot) plus one
/// [`insert_payload`](Self::insert_payload) per channel on every network tick,
/// then [`update`](Self::update) and [`sample`](Self::sample) every frame.
pub struct SnapshotInterpolator {
    timeline: Timeline,
    channels: Vec<Box<dyn PayloadChannelTrait>>,
}

impl SnapshotInterpolator {
    pub fn new(settings: SnapshotInterpolationSettings, send_interval: f64) -> Self {
        Self {
            timeline: Timeline::new(settings, send_interval),
            channels: Vec::new(),
        }
    }

    pub fn with_tick_rate(settings: SnapshotInterpolationSettings, tick_rate: TickRate) -> Self {
        Self::new(settings, tick_rate.send_interval())
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn local_timeline(&self) -> f64 {
        self.timeline.local_timeline()
    }

    pub fn local_timescale(&self) -> f64 {
        self.timeline.local_timescale()
    }

    pub fn buffer_time(&self) -> f64 {
        self.timeline.buffer_time()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn add_channel<V: Interpolate + 'static>(&mut self, name: &str) -> ChannelHandle<V> {
        let channel = PayloadChannel::<V>::new(name.to_string(), self.timeline.settings());
        self.channels.push(Box::new(channel));
        ChannelHandle {
            index: self.channels.len() - 1,
            _marker: PhantomData,
        }
    }

    pub fn channel<V: Interpolate + 'static>(&self, handle: ChannelHandle<V>) -> Option<&PayloadChannel<V>> {
        self.channels
            .get(handle.index)
            .and_then(|channel| channel.as_any().downcast_ref::<PayloadChannel<V>>())
    }

    fn channel_mut<V: Interpolate + 'static>(
        &mut self,
        handle: ChannelHandle<V>,
    ) -> Option<&mut PayloadChannel<V>> {
        self.channels
            .get_mut(handle.index)
            .and_then(|channel| channel.as_any_mut().downcast_mut::<PayloadChannel<V>>())
    }

    pub fn stamp(tick: u64, tick_rate: &TickRate, local_clock: &impl TimeSource) -> TimeSnapshot {
        TimeSnapshot::new(tick_rate.ticks_to_time(tick), local_clock.now())
    }

    // only the time channel drives drift and timescale
    pub fn add_time_snapshot(&mut self, snapshot: TimeSnapshot) -> bool {
        self.timeline.insert_and_adjust(snapshot)
    }

    pub fn insert_payload<V: Interpolate + 'static>(
        &mut self,
        handle: ChannelHandle<V>,
        stamp: TimeSnapshot,
        value: V,
    ) -> bool {
        match self.channel_mut(handle) {
            Some(channel) => {
                channel.insert(PayloadSnapshot::new(stamp.remote_time, stamp.local_time, value))
            }
            None => false,
        }
    }

    // nothing moves before the first time snapshot arrived
    pub fn update(&mut self, delta_time: f64) {
        if !self.timeline.is_empty() {
            self.timeline.step(delta_time);
        }
    }

    pub fn sample<V: Interpolate + 'static>(&mut self, handle: ChannelHandle<V>) -> ChannelSample<V> {
        let local_timeline = self.timeline.local_timeline();
        match self.channel_mut(handle) {
            Some(channel) => channel.sample(local_timeline),
            None => ChannelSample::Empty,
        }
    }

    pub fn sample_value<V: Interpolate + 'static>(&mut self, handle: ChannelHandle<V>) -> Option<V> {
        self.sample(handle).into_value()
    }

    pub fn reset(&mut self) {
        self.timeline.reset();
        for channel in self.channels.iter_mut() {
            channel.clear();
        }
        log_info!(format!(
            "Snapshot interpolator reset, {} payload channels cleared",
            self.channels.len()
        ));
    }

    pub fn diagnostics(&self) -> TimelineDiagnostics {
        let delivery_time_ema = self.timeline.delivery_time_ema();
        let jitter = if delivery_time_ema.is_initialized() {
            Some(delivery_time_ema.standard_deviation)
        } else {
            None
        };
        TimelineDiagnostics {
            local_timeline: self.timeline.local_timeline(),
            local_timescale: self.timeline.local_timescale(),
            buffer_time: self.timeline.buffer_time(),
            buffer_time_multiplier: self.timeline.buffer_time_multiplier(),
            drift: self.timeline.drift(),
            delivery_jitter: self.timeline.delivery_jitter(),
            time_snapshots: self.timeline.snapshots().len(),
            channel_snapshots: self
                .channels
                .iter()
                .map(|channel| (channel.name().to_string(), channel.len()))
                .collect(),
            connection_quality: ConnectionQualityHeuristics::from_delivery_jitter(
                self.timeline.send_interval(),
                jitter,
            ),
        }
    }
}
