//! Cache builder: rectifies a whole split up front and places the frames

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use rdm_core::{Frame, RdmError, Rectified, Result, Split, rectify_frame};
use rdm_io::Dataset;

use crate::config::CachePolicy;
use crate::device::Device;
use crate::observer::BuildObserver;

/// Largest train split still cached in accelerator memory
pub const MAX_DEVICE_CACHED_TRAIN_FRAMES: usize = 500;

/// Policy actually used for the train split
///
/// Train splits above [`MAX_DEVICE_CACHED_TRAIN_FRAMES`] fall back from
/// accelerator to host memory.
pub fn effective_policy(policy: CachePolicy, train_len: usize) -> CachePolicy {
    if policy == CachePolicy::Gpu && train_len > MAX_DEVICE_CACHED_TRAIN_FRAMES {
        tracing::warn!(
            "Too many train images ({} > {}) to cache on the accelerator, caching on the host instead",
            train_len,
            MAX_DEVICE_CACHED_TRAIN_FRAMES
        );
        CachePolicy::Cpu
    } else {
        policy
    }
}

/// Rectified frames of one split, index-aligned with its cameras
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    frames: Vec<Frame>,
    policy: CachePolicy,
}

impl FrameCache {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Policy the frames were placed with
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub(crate) fn push(&mut self, frame: Frame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }
}

/// Builds [`FrameCache`]s for a placement policy on one device
#[derive(Clone)]
pub struct CacheBuilder {
    policy: CachePolicy,
    device: Arc<dyn Device>,
    observer: Arc<dyn BuildObserver>,
}

impl fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("policy", &self.policy)
            .field("device", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl CacheBuilder {
    pub fn new(
        policy: CachePolicy,
        device: Arc<dyn Device>,
        observer: Arc<dyn BuildObserver>,
    ) -> Self {
        Self {
            policy,
            device,
            observer,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Same device and observer with another placement policy
    pub fn with_policy(&self, policy: CachePolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Rectify every frame of `dataset` and place it per the policy
    ///
    /// Updated cameras are written back into the dataset by index. Any
    /// failing frame aborts the build and leaves the cameras untouched.
    pub fn build<D: Dataset + ?Sized>(&self, split: Split, dataset: &mut D) -> Result<FrameCache> {
        let total = dataset.len();
        if dataset.cameras().len() != total {
            return Err(RdmError::Misaligned {
                split,
                cameras: dataset.cameras().len(),
                frames: total,
            });
        }
        self.observer.split_started(split, total);

        let rectified = {
            let source: &D = dataset;
            (0..total)
                .into_par_iter()
                .map(|index| {
                    let frame = source.get_data(index)?;
                    let camera = source.cameras().slice(index)?;
                    let rectified = rectify_frame(frame, &camera)?;
                    self.observer.frame_cached(split, index, total);
                    Ok(rectified)
                })
                .collect::<Result<Vec<Rectified>>>()?
        };

        let mut frames = Vec::with_capacity(total);
        for (index, Rectified { mut frame, camera }) in rectified.into_iter().enumerate() {
            dataset.cameras_mut().replace(index, camera)?;
            self.place(&mut frame)?;
            frames.push(frame);
        }

        self.observer.split_finished(split, total);
        Ok(FrameCache {
            frames,
            policy: self.policy,
        })
    }

    /// Put a frame where this builder's policy keeps frames
    pub fn place(&self, frame: &mut Frame) -> Result<()> {
        match self.policy {
            CachePolicy::Gpu => self.device.to_device(frame),
            CachePolicy::Cpu | CachePolicy::NoCache => self.device.pin_memory(frame),
        }
    }
}
