//! Progress reporting for cache builds

use rdm_core::Split;

/// Receives progress of a cache build
///
/// Handed to the cache builder at construction in place of a global console.
pub trait BuildObserver: Send + Sync {
    fn split_started(&self, split: Split, total: usize);

    fn frame_cached(&self, split: Split, index: usize, total: usize);

    fn split_finished(&self, split: Split, total: usize);
}

/// Reports build progress through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn split_started(&self, split: Split, total: usize) {
        tracing::info!("Caching / undistorting {} {} images", total, split);
    }

    fn frame_cached(&self, split: Split, index: usize, total: usize) {
        tracing::trace!(%split, index, total, "frame rectified");
    }

    fn split_finished(&self, split: Split, total: usize) {
        tracing::debug!(%split, total, "split cached");
    }
}
