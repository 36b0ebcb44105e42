pub mod network_rigidbody_2d;
