use crate::log_debug;
use crate::smoothing::core::network_time::{TickRate, TimeSource};
use crate::smoothing::core::snapshot_interpolation::interpolate::Angle2D;
use crate::smoothing::core::snapshot_interpolation::interpolator::{
    ChannelHandle, SnapshotInterpolator,
};
use crate::smoothing::core::snapshot_interpolation::snapshot_interpolation_settings::SnapshotInterpolationSettings;
use nalgebra::{Vector2, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualPose {
    pub position: Vector3<f32>,
    pub rotation: Angle2D,
}

/// Visual smoothing for a remote 2D physics body.
///
/// The simulated body moves in network ticks; its visual follows the
/// interpolated position and rotation, offset by the distance between the two
/// captured in [`cache_visual_offset`](Self::cache_visual_offset).
pub struct NetworkRigidbody2D {
    interpolator: SnapshotInterpolator,
    tick_rate: TickRate,
    position_channel: ChannelHandle<Vector2<f32>>,
    rotation_channel: ChannelHandle<Angle2D>,
    visual_world_offset: Vector2<f32>,
    visual_z_offset: f32,
    body_z: f32,
    visual_pose: VisualPose,
}

impl NetworkRigidbody2D {
    pub const COMPONENT_TAG: &'static str = "NetworkRigidbody2D";

    pub fn new(settings: SnapshotInterpolationSettings, tick_rate: TickRate) -> Self {
        let mut interpolator = SnapshotInterpolator::with_tick_rate(settings, tick_rate);
        let position_channel = interpolator.add_channel::<Vector2<f32>>("position");
        let rotation_channel = interpolator.add_channel::<Angle2D>("rotation");
        Self {
            interpolator,
            tick_rate,
            position_channel,
            rotation_channel,
            visual_world_offset: Vector2::zeros(),
            visual_z_offset: 0.0,
            body_z: 0.0,
            visual_pose: VisualPose {
                position: Vector3::zeros(),
                rotation: Angle2D::default(),
            },
        }
    }

    pub fn interpolator(&self) -> &SnapshotInterpolator {
        &self.interpolator
    }

    pub fn visual_pose(&self) -> VisualPose {
        self.visual_pose
    }

    pub fn cache_visual_offset(&mut self, body_position: Vector3<f32>, visual_position: Vector3<f32>) {
        self.visual_world_offset = Vector2::new(
            visual_position.x - body_position.x,
            visual_position.y - body_position.y,
        );
        self.visual_z_offset = visual_position.z - body_position.z;
        self.body_z = body_position.z;
    }

    pub fn on_tick(
        &mut self,
        tick: u64,
        local_clock: &impl TimeSource,
        position: Vector2<f32>,
        rotation: Angle2D,
    ) -> bool {
        let stamp = SnapshotInterpolator::stamp(tick, &self.tick_rate, local_clock);
        let inserted = self.interpolator.add_time_snapshot(stamp);
        self.interpolator
            .insert_payload(self.position_channel, stamp, position);
        self.interpolator
            .insert_payload(self.rotation_channel, stamp, rotation);
        inserted
    }

    // without buffered state the visual follows the body itself
    pub fn update(
        &mut self,
        delta_time: f64,
        body_position: Vector2<f32>,
        body_rotation: Angle2D,
    ) -> VisualPose {
        self.interpolator.update(delta_time);

        let position = self
            .interpolator
            .sample_value(self.position_channel)
            .unwrap_or(body_position);
        let rotation = self
            .interpolator
            .sample_value(self.rotation_channel)
            .unwrap_or(body_rotation);
        self.apply_visual(position, rotation)
    }

    /// Snaps to `position` without smoothing and forgets all buffered state.
    pub fn teleport(&mut self, position: Vector2<f32>, rotation: Angle2D) -> VisualPose {
        log_debug!(format!(
            "{} teleport to ({:.3}, {:.3})",
            Self::COMPONENT_TAG,
            position.x,
            position.y
        ));
        self.interpolator.reset();
        self.apply_visual(position, rotation)
    }

    fn apply_visual(&mut self, world_position: Vector2<f32>, rotation: Angle2D) -> VisualPose {
        self.visual_pose = VisualPose {
            position: Vector3::new(
                world_position.x + self.visual_world_offset.x,
                world_position.y + self.visual_world_offset.y,
                self.body_z + self.visual_z_offset,
            ),
            rotation,
        };
        self.visual_pose
    }
}
