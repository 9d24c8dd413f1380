//! Datasets serving frames and cameras of one split

use rdm_core::{CameraRecord, Cameras, Frame, Result};

use crate::dataparser::{DataparserOutputs, FrameSource};
use crate::error::IoError;
use crate::image::{resize_depth, resize_image, resize_mask};

/// Frames and cameras of one split, as seen by the data manager
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the raw frame at `index`
    fn get_data(&self, index: usize) -> Result<Frame>;

    fn cameras(&self) -> &Cameras;

    fn cameras_mut(&mut self) -> &mut Cameras;

    /// Append a frame captured at runtime together with its camera
    fn add_image(&mut self, frame: Frame, camera: CameraRecord) -> Result<()>;
}

#[derive(Debug, Clone)]
struct Entry {
    source: FrameSource,
    /// Whether the resolution scale factor still applies to this source
    rescale: bool,
}

/// Dataset over dataparser outputs with a resolution scale factor
///
/// Cameras are rescaled once at construction; frames are resized whenever
/// they are read.
#[derive(Debug, Clone)]
pub struct InputDataset {
    entries: Vec<Entry>,
    cameras: Cameras,
    scale_factor: f64,
}

impl InputDataset {
    pub fn new(outputs: DataparserOutputs, scale_factor: f64) -> Self {
        let (sources, cameras) = outputs.into_parts();
        let cameras = if scale_factor == 1.0 {
            cameras
        } else {
            cameras.rescaled(scale_factor)
        };
        Self {
            entries: sources
                .into_iter()
                .map(|source| Entry {
                    source,
                    rescale: true,
                })
                .collect(),
            cameras,
            scale_factor,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    fn scale(&self, frame: Frame) -> Result<Frame> {
        let (width, height) = frame.size();
        let new_width = (width as f64 * self.scale_factor) as usize;
        let new_height = (height as f64 * self.scale_factor) as usize;
        if (new_width, new_height) == (width, height) {
            return Ok(frame);
        }

        Ok(Frame {
            image: resize_image(&frame.image, new_width, new_height)?,
            mask: frame
                .mask
                .as_ref()
                .map(|m| resize_mask(m, new_width, new_height))
                .transpose()?,
            depth: frame
                .depth
                .as_ref()
                .map(|d| resize_depth(d, new_width, new_height))
                .transpose()?,
            residency: frame.residency,
        })
    }
}

impl Dataset for InputDataset {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get_data(&self, index: usize) -> Result<Frame> {
        let entry = self.entries.get(index).ok_or(IoError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;
        let frame = entry.source.load()?;
        if entry.rescale {
            self.scale(frame)
        } else {
            Ok(frame)
        }
    }

    fn cameras(&self) -> &Cameras {
        &self.cameras
    }

    fn cameras_mut(&mut self) -> &mut Cameras {
        &mut self.cameras
    }

    /// Runtime frames are already at output resolution and are never rescaled
    fn add_image(&mut self, frame: Frame, camera: CameraRecord) -> Result<()> {
        self.entries.push(Entry {
            source: FrameSource::Memory(frame),
            rescale: false,
        });
        self.cameras.push(camera);
        Ok(())
    }
}
