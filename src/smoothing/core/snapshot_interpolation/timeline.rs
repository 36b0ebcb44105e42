use crate::smoothing::core::network_time::ExponentialMovingAverage;
use crate::smoothing::core::snapshot_interpolation::snapshot::Snapshot;
use crate::smoothing::core::snapshot_interpolation::snapshot_buffer::SnapshotBuffer;
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation::SnapshotInterpolation;
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation_settings::SnapshotInterpolationSettings;
use crate::smoothing::core::snapshot_interpolation::time_snapshot::TimeSnapshot;
use crate::{log_debug, log_warn};

/// Local virtual clock trailing the remote clock by `buffer_time`.
///
/// Every inserted time snapshot re-evaluates drift and picks a timescale of
/// `1 + catchup_speed`, `1 - slow_down_speed` or `1`. Rendering advances the clock
/// with [`Timeline::advance`]. Not thread safe: both calls must come from the same
/// update loop.
#[derive(Debug, Clone)]
pub struct Timeline {
    settings: SnapshotInterpolationSettings,
    send_interval: f64,
    snapshots: SnapshotBuffer<TimeSnapshot>,
    local_timeline: f64,
    local_timescale: f64,
    buffer_time_multiplier: f64,
    drift_ema: ExponentialMovingAverage,
    delivery_time_ema: ExponentialMovingAverage,
}

impl Timeline {
    pub fn new(settings: SnapshotInterpolationSettings, send_interval: f64) -> Self {
        let timeline = Self {
            snapshots: SnapshotBuffer::with_policy(settings.buffer_limit, settings.overflow_policy),
            send_interval,
            local_timeline: 0.0,
            local_timescale: 1.0,
            buffer_time_multiplier: settings.buffer_time_multiplier,
            drift_ema: ExponentialMovingAverage::new(settings.drift_ema_window(send_interval)),
            delivery_time_ema: ExponentialMovingAverage::new(
                settings.delivery_time_ema_window(send_interval),
            ),
            settings,
        };
        if timeline.buffer_time() <= 0.0 {
            log_warn!(format!(
                "Timeline created with non-positive buffer time {:.4}s, interpolation will have no lag",
                timeline.buffer_time()
            ));
        }
        timeline
    }

    pub fn settings(&self) -> &SnapshotInterpolationSettings {
        &self.settings
    }

    pub fn send_interval(&self) -> f64 {
        self.send_interval
    }

    pub fn local_timeline(&self) -> f64 {
        self.local_timeline
    }

    pub fn local_timescale(&self) -> f64 {
        self.local_timescale
    }

    pub fn buffer_time_multiplier(&self) -> f64 {
        self.buffer_time_multiplier
    }

    pub fn buffer_time(&self) -> f64 {
        self.send_interval * self.buffer_time_multiplier
    }

    pub fn drift_ema(&self) -> &ExponentialMovingAverage {
        &self.drift_ema
    }

    pub fn delivery_time_ema(&self) -> &ExponentialMovingAverage {
        &self.delivery_time_ema
    }

    pub fn drift(&self) -> f64 {
        self.drift_ema.value - self.buffer_time()
    }

    pub fn delivery_jitter(&self) -> f64 {
        self.delivery_time_ema.standard_deviation
    }

    pub fn snapshots(&self) -> &SnapshotBuffer<TimeSnapshot> {
        &self.snapshots
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Inserts a time snapshot and re-evaluates drift and timescale.
    ///
    /// Returns false when the snapshot was not added as a new entry (full buffer or
    /// already known remote time). In that case no adjustment happens.
    pub fn insert_and_adjust(&mut self, snapshot: TimeSnapshot) -> bool {
        // only affects this and future samples, buffered snapshots stay where they are
        if self.settings.dynamic_adjustment {
            self.buffer_time_multiplier = SnapshotInterpolation::dynamic_adjustment(
                self.send_interval,
                self.delivery_time_ema.standard_deviation,
                self.settings.dynamic_adjustment_tolerance,
            );
        }
        let buffer_time = self.buffer_time();

        // cold start: lag behind by exactly buffer time
        if self.snapshots.is_empty() {
            self.local_timeline = snapshot.remote_time() - buffer_time;
            log_debug!(format!(
                "Timeline cold start at remote {:.4}s, local timeline {:.4}s",
                snapshot.remote_time(),
                self.local_timeline
            ));
        }

        if !self.snapshots.insert_if_not_exists(snapshot) {
            if self.snapshots.is_full() {
                log_debug!(format!(
                    "Time snapshot {:.4}s dropped, buffer full ({})",
                    snapshot.remote_time(),
                    self.snapshots.limit()
                ));
            }
            return false;
        }

        if let Some(local_delivery_time) = self.snapshots.latest_delivery_interval() {
            self.delivery_time_ema.add(local_delivery_time);
        }

        let latest_remote_time = self
            .snapshots
            .latest_remote_time()
            .unwrap_or(snapshot.remote_time());
        self.local_timeline =
            SnapshotInterpolation::timeline_clamp(self.local_timeline, buffer_time, latest_remote_time);

        let time_diff = latest_remote_time - self.local_timeline;
        self.drift_ema.add(time_diff);

        let drift = self.drift_ema.value - buffer_time;
        let timescale = SnapshotInterpolation::timescale(
            drift,
            self.settings.catchup_speed,
            self.settings.slow_down_speed,
            self.send_interval * self.settings.catchup_negative_threshold,
            self.send_interval * self.settings.catchup_positive_threshold,
        );
        if timescale != self.local_timescale {
            log_debug!(format!(
                "Timescale {:.3} -> {:.3} (drift {:.4}s, buffer time {:.4}s)",
                self.local_timescale, timescale, drift, buffer_time
            ));
        }
        self.local_timescale = timescale;
        true
    }

    pub fn advance(&mut self, delta_time: f64) {
        SnapshotInterpolation::step_time(delta_time, &mut self.local_timeline, self.local_timescale);
    }

    // advance, then evict time snapshots the timeline moved past
    pub fn step(&mut self, delta_time: f64) -> Option<(TimeSnapshot, TimeSnapshot, f64)> {
        self.advance(delta_time);
        self.snapshots.step_interpolation(self.local_timeline)
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.local_timeline = 0.0;
        self.local_timescale = 1.0;
        self.buffer_time_multiplier = self.settings.buffer_time_multiplier;
        self.drift_ema.reset();
        self.delivery_time_ema.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SEND_INTERVAL: f64 = 1.0 / 30.0;

    fn approx(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() <= epsilon
    }

    fn fixed_settings() -> SnapshotInterpolationSettings {
        SnapshotInterpolationSettings {
            dynamic_adjustment: false,
            ..Default::default()
        }
    }

    fn tick(k: u32) -> TimeSnapshot {
        TimeSnapshot::new(k as f64 * SEND_INTERVAL, k as f64 * SEND_INTERVAL)
    }

    fn assert_clamped(timeline: &Timeline) {
        let latest = timeline.snapshots().latest_remote_time().unwrap();
        let buffer_time = timeline.buffer_time();
        let local = timeline.local_timeline();
        assert!(local >= latest - 2.0 * buffer_time - 1e-9, "{} below window of {}", local, latest);
        assert!(local <= latest + 1e-9, "{} above window of {}", local, latest);
    }

    #[test]
    fn test_cold_start() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        assert!(timeline.insert_and_adjust(TimeSnapshot::new(5.0, 0.2)));
        assert!(approx(timeline.local_timeline(), 5.0 - 2.0 * SEND_INTERVAL, 1e-12));
        assert_eq!(timeline.local_timescale(), 1.0);
        assert!(approx(timeline.drift_ema().value, timeline.buffer_time(), 1e-12));
    }

    #[test]
    fn test_cold_start_uses_dynamic_buffer_time() {
        let settings = SnapshotInterpolationSettings {
            dynamic_adjustment_tolerance: 0.5,
            ..Default::default()
        };
        let mut timeline = Timeline::new(settings, SEND_INTERVAL);
        timeline.insert_and_adjust(TimeSnapshot::new(1.0, 0.0));
        // no jitter measured yet: multiplier = 1 + tolerance
        assert!(approx(timeline.buffer_time_multiplier(), 1.5, 1e-12));
        assert!(approx(timeline.local_timeline(), 1.0 - 1.5 * SEND_INTERVAL, 1e-12));
    }

    #[test]
    fn test_steady_state() {
        let mut timeline = Timeline::new(SnapshotInterpolationSettings::default(), SEND_INTERVAL);
        for k in 0..300 {
            assert!(timeline.insert_and_adjust(tick(k)));
            assert_eq!(timeline.local_timescale(), 1.0);
            assert_clamped(&timeline);
            timeline.step(SEND_INTERVAL);
        }
        assert!(approx(timeline.buffer_time_multiplier(), 2.0, 1e-6));
        assert!(approx(timeline.drift_ema().value, timeline.buffer_time(), 1e-9));
        assert!(approx(timeline.drift(), 0.0, 1e-9));
        assert!(timeline.delivery_jitter() < 1e-9);
        // stepping keeps the time buffer small
        assert!(timeline.snapshots().len() <= 3);
    }

    #[test]
    fn test_pause_then_burst_clamps_and_catches_up() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        let buffer_time = timeline.buffer_time();

        for k in 0..60 {
            timeline.insert_and_adjust(tick(k));
            timeline.step(SEND_INTERVAL);
        }
        assert_eq!(timeline.local_timescale(), 1.0);

        // render loop stalls while a burst of snapshots arrives
        for k in 60..80 {
            assert!(timeline.insert_and_adjust(tick(k)));
            assert_clamped(&timeline);
        }
        let latest = 79.0 * SEND_INTERVAL;
        assert!(approx(timeline.local_timeline(), latest - 2.0 * buffer_time, 1e-9));
        assert!(timeline.local_timescale() > 1.0);

        let mut caught_up_at = None;
        for k in 80..680 {
            timeline.insert_and_adjust(tick(k));
            assert_clamped(&timeline);
            if timeline.local_timescale() == 1.0 && caught_up_at.is_none() {
                caught_up_at = Some(k);
            }
            if caught_up_at.is_none() {
                assert!(approx(timeline.local_timescale(), 1.02, 1e-12));
            }
            timeline.step(SEND_INTERVAL);
        }
        assert!(caught_up_at.is_some());
        assert_eq!(timeline.local_timescale(), 1.0);
        assert!(timeline.drift() <= SEND_INTERVAL * timeline.settings().catchup_positive_threshold);
        assert!(timeline.drift() >= SEND_INTERVAL * timeline.settings().catchup_negative_threshold);
    }

    #[test]
    fn test_two_second_gap_then_remote_time_jump() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        let buffer_time = timeline.buffer_time();

        for k in 0..60 {
            timeline.insert_and_adjust(tick(k));
            timeline.step(SEND_INTERVAL);
        }
        assert_eq!(timeline.local_timescale(), 1.0);

        // receiver suspended for two seconds: nothing arrives, nothing renders
        let gap_ticks = (2.0 / SEND_INTERVAL).round() as u32;
        let resume = 60 + gap_ticks;
        assert!(timeline.insert_and_adjust(tick(resume)));
        let latest = resume as f64 * SEND_INTERVAL;
        assert!(approx(timeline.local_timeline(), latest - 2.0 * buffer_time, 1e-9));

        let mut caught_up_at = None;
        let mut catchup_seen = false;
        for k in resume + 1..resume + 600 {
            timeline.step(SEND_INTERVAL);
            assert!(timeline.insert_and_adjust(tick(k)));
            assert_clamped(&timeline);
            if approx(timeline.local_timescale(), 1.02, 1e-12) {
                catchup_seen = true;
            } else if catchup_seen && caught_up_at.is_none() {
                caught_up_at = Some(k);
            }
        }
        assert!(catchup_seen);
        assert!(caught_up_at.is_some());
        assert_eq!(timeline.local_timescale(), 1.0);
        assert!(timeline.drift() <= SEND_INTERVAL * timeline.settings().catchup_positive_threshold);
        assert!(timeline.drift() >= SEND_INTERVAL * timeline.settings().catchup_negative_threshold);
    }

    #[test]
    fn test_out_of_order_delivery() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        for k in [0, 1, 2, 4] {
            assert!(timeline.insert_and_adjust(tick(k)));
        }
        // between tick 3 and tick 4, so a window anchored at tick 3 would move it
        let target = 3.5 * SEND_INTERVAL;
        timeline.advance((target - timeline.local_timeline()) / timeline.local_timescale());
        let local_before = timeline.local_timeline();
        assert!(local_before > 3.0 * SEND_INTERVAL && local_before < 4.0 * SEND_INTERVAL);

        let mut expected_delivery = *timeline.delivery_time_ema();
        let mut expected_drift = *timeline.drift_ema();

        // tick 3 shows up after tick 4
        let late = TimeSnapshot::new(3.0 * SEND_INTERVAL, 5.0 * SEND_INTERVAL);
        assert!(timeline.insert_and_adjust(late));
        assert_eq!(timeline.snapshots().len(), 5);

        // window stays anchored at the newest key
        let newest = 4.0 * SEND_INTERVAL;
        assert_eq!(timeline.snapshots().latest_remote_time(), Some(newest));
        assert_eq!(timeline.local_timeline(), local_before);
        assert_clamped(&timeline);
        expected_drift.add(newest - local_before);
        assert!(approx(timeline.drift_ema().value, expected_drift.value, 1e-12));

        // newest pair by remote time is (3, 4): its local times are reversed
        let interval = timeline.snapshots().latest_delivery_interval().unwrap();
        assert!(approx(interval, -SEND_INTERVAL, 1e-12));
        expected_delivery.add(interval);
        assert!(approx(timeline.delivery_time_ema().value, expected_delivery.value, 1e-12));
    }

    #[test]
    fn test_timeline_ahead_slows_down() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        // local render clock runs twice as fast as snapshots arrive
        for k in 0..100 {
            timeline.insert_and_adjust(tick(k));
            assert_clamped(&timeline);
            timeline.step(2.0 * SEND_INTERVAL);
        }
        // pinned to the newest remote time: lag 0, drift -buffer time
        assert!(approx(timeline.local_timescale(), 0.96, 1e-12));
        assert!(timeline.drift() < SEND_INTERVAL * timeline.settings().catchup_negative_threshold);
    }

    #[test]
    fn test_full_buffer_drops_without_adjusting() {
        let settings = SnapshotInterpolationSettings {
            buffer_limit: 4,
            ..fixed_settings()
        };
        let mut timeline = Timeline::new(settings, SEND_INTERVAL);
        for k in 0..4 {
            assert!(timeline.insert_and_adjust(tick(k)));
        }
        let local_timeline = timeline.local_timeline();
        let drift = timeline.drift_ema().value;
        assert!(!timeline.insert_and_adjust(tick(40)));
        assert_eq!(timeline.snapshots().len(), 4);
        assert_eq!(timeline.local_timeline(), local_timeline);
        assert_eq!(timeline.drift_ema().value, drift);
    }

    #[test]
    fn test_duplicate_remote_time_is_not_adjusted() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        assert!(timeline.insert_and_adjust(tick(0)));
        assert!(!timeline.insert_and_adjust(TimeSnapshot::new(0.0, 1.0)));
        assert_eq!(timeline.snapshots().len(), 1);
        assert!(!timeline.delivery_time_ema().is_initialized());
    }

    #[test]
    fn test_dynamic_adjustment_grows_with_jitter() {
        let mut timeline = Timeline::new(SnapshotInterpolationSettings::default(), SEND_INTERVAL);
        for k in 0..300 {
            let jitter = if k % 2 == 1 { 0.3 * SEND_INTERVAL } else { 0.0 };
            let remote_time = k as f64 * SEND_INTERVAL;
            timeline.insert_and_adjust(TimeSnapshot::new(remote_time, remote_time + jitter));
            timeline.step(SEND_INTERVAL);
        }
        assert!(timeline.delivery_jitter() > 0.25 * SEND_INTERVAL);
        assert!(timeline.buffer_time_multiplier() > 2.2);
        assert!(timeline.buffer_time() > 2.2 * SEND_INTERVAL);
    }

    #[test]
    fn test_reset() {
        let mut timeline = Timeline::new(SnapshotInterpolationSettings::default(), SEND_INTERVAL);
        for k in 0..10 {
            timeline.insert_and_adjust(tick(k));
            timeline.step(SEND_INTERVAL * 0.5);
        }
        timeline.reset();
        assert!(timeline.is_empty());
        assert_eq!(timeline.local_timeline(), 0.0);
        assert_eq!(timeline.local_timescale(), 1.0);
        assert_eq!(timeline.buffer_time_multiplier(), 2.0);
        assert!(!timeline.drift_ema().is_initialized());
        assert!(!timeline.delivery_time_ema().is_initialized());

        // behaves like a fresh instance
        let mut fresh = Timeline::new(SnapshotInterpolationSettings::default(), SEND_INTERVAL);
        timeline.insert_and_adjust(TimeSnapshot::new(100.0, 50.0));
        fresh.insert_and_adjust(TimeSnapshot::new(100.0, 50.0));
        assert_eq!(timeline.local_timeline(), fresh.local_timeline());
        assert_eq!(timeline.drift_ema().value, fresh.drift_ema().value);
    }

    #[test]
    fn test_empty_buffer_keeps_advancing() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        timeline.advance(0.5);
        assert_eq!(timeline.local_timeline(), 0.5);
        assert!(timeline.step(0.5).is_none());
        assert_eq!(timeline.local_timeline(), 1.0);
    }

    #[test]
    fn test_non_positive_buffer_time_is_accepted() {
        let settings = SnapshotInterpolationSettings {
            buffer_time_multiplier: 0.0,
            ..fixed_settings()
        };
        let mut timeline = Timeline::new(settings, SEND_INTERVAL);
        assert!(timeline.insert_and_adjust(tick(3)));
        assert_eq!(timeline.local_timeline(), tick(3).remote_time);
        timeline.step(SEND_INTERVAL);
        assert!(timeline.insert_and_adjust(tick(4)));
        assert_eq!(timeline.local_timeline(), tick(4).remote_time);
    }

    #[test]
    fn test_jitter_inside_dead_zone_keeps_unit_timescale() {
        let mut timeline = Timeline::new(fixed_settings(), SEND_INTERVAL);
        for k in 0..400 {
            timeline.insert_and_adjust(tick(k));
            assert_eq!(timeline.local_timescale(), 1.0);
            let delta_time = if k % 2 == 0 { 1.3 } else { 0.7 } * SEND_INTERVAL;
            timeline.step(delta_time);
        }
    }

    #[test]
    fn test_near_threshold_jitter_never_flips_directly() {
        let settings = fixed_settings();
        let catchup = 1.0 + settings.catchup_speed;
        let slowdown = 1.0 - settings.slow_down_speed;
        let mut timeline = Timeline::new(settings, SEND_INTERVAL);
        let mut rng = StdRng::seed_from_u64(7);

        let mut k = 0;
        let mut previous = 1.0;
        for _frame in 0..5000 {
            // 0..=2 arrivals per frame
            let arrivals = rng.gen_range(0..=2);
            for _ in 0..arrivals {
                timeline.insert_and_adjust(tick(k));
                k += 1;
                assert_clamped(&timeline);

                let timescale = timeline.local_timescale();
                assert!(timescale == 1.0 || timescale == catchup || timescale == slowdown);
                // the dead zone separates the two corrections
                assert!(!(previous == catchup && timescale == slowdown));
                assert!(!(previous == slowdown && timescale == catchup));
                previous = timescale;
            }
            timeline.step(rng.gen_range(0.5..1.5) * SEND_INTERVAL);
        }
        assert!(k > 0);
    }
}
