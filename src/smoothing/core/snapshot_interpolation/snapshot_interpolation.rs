pub struct SnapshotInterpolation;

impl SnapshotInterpolation {
    // calculate timescale for catch-up / slow-down.
    // thresholds are absolute, i.e. already multiplied by sendInterval.
    // the negative threshold is expected to be <= 0.
    pub fn timescale(
        drift: f64,                          // how far we are off from bufferTime
        catchup_speed: f64,                  // in % [0,1]
        slowdown_speed: f64,                 // in % [0,1]
        absolute_catchup_negative_threshold: f64, // in seconds (careful, we may run out of snapshots)
        absolute_catchup_positive_threshold: f64, // in seconds
    ) -> f64 {
        // local timeline lags the target too far: speed up
        if drift > absolute_catchup_positive_threshold {
            return 1.0 + catchup_speed;
        }

        // local timeline is ahead of the target: slow down
        if drift < absolute_catchup_negative_threshold {
            return 1.0 - slowdown_speed;
        }

        // dead zone between the thresholds keeps a constant timescale
        1.0
    }

    // buffer time multiplier that covers the observed delivery jitter.
    pub fn dynamic_adjustment(
        send_interval: f64,
        jitter_standard_deviation: f64,
        dynamic_adjustment_tolerance: f64,
    ) -> f64 {
        // delivery time is 'sendInterval + jitter'. the average is dampened by the
        // constant sendInterval, the standard deviation is the jitter we care about.
        let interval_with_jitter = send_interval + jitter_standard_deviation;

        // how many multiples of sendInterval is that?
        let multiples = interval_with_jitter / send_interval;

        multiples + dynamic_adjustment_tolerance
    }

    pub fn timeline_clamp(local_timeline: f64, buffer_time: f64, latest_remote_time: f64) -> f64 {
        // we want local timeline to always be 'bufferTime' behind remote.
        let target_time = latest_remote_time - buffer_time;

        // a boundary of 'bufferTime' around the target time.
        // catchup / slowdown happens inside, outside we clamp.
        let lower_bound = target_time - buffer_time; // how far behind we can get
        let upper_bound = target_time + buffer_time; // how far ahead we can get

        // max/min instead of clamp: a negative buffer time must not panic
        local_timeline.max(lower_bound).min(upper_bound)
    }

    pub fn step_time(delta_time: f64, local_timeline: &mut f64, local_timescale: f64) {
        *local_timeline += delta_time * local_timescale;
    }

    // ratio of 'value' between 'a' and 'b', clamped to [0,1]
    pub fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
        if a == b {
            return 0.0;
        }
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    }
}
