/// A timestamped piece of authoritative state.
///
/// `remote_time` is the sort key inside a buffer. `local_time` is only used to
/// measure how fast snapshots really arrive.
pub trait Snapshot: Clone {
    fn local_time(&self) -> f64;
    fn remote_time(&self) -> f64;
}
