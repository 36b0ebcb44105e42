pub mod connection_quality;
pub mod network_time;
pub mod snapshot_interpolation;
pub mod tools;
