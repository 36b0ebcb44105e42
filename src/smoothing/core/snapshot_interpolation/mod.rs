pub mod interpolate;
pub mod interpolator;
pub mod snapshot;
pub mod snapshot_buffer;
pub mod snapshot_interpolation;
pub mod snapshot_interpolation_settings;
pub mod time_snapshot;
pub mod timeline;
