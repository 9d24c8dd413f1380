//! Dataparser outputs: per-split frame sources and cameras

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rdm_core::{CameraRecord, Cameras, Frame, RdmError, Result, Split};

use crate::image::Image;

/// Default multiplier turning raw 16-bit depth values into metres
pub const DEFAULT_DEPTH_UNIT_SCALE: f32 = 1e-3;

/// Where a frame's pixels come from
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// Already decoded frame
    Memory(Frame),
    /// Image files decoded on demand
    Files {
        image: PathBuf,
        mask: Option<PathBuf>,
        depth: Option<PathBuf>,
        depth_unit_scale: f32,
    },
}

impl FrameSource {
    /// Image file without mask or depth
    pub fn image_file(path: impl Into<PathBuf>) -> Self {
        FrameSource::Files {
            image: path.into(),
            mask: None,
            depth: None,
            depth_unit_scale: DEFAULT_DEPTH_UNIT_SCALE,
        }
    }

    /// Decode the frame
    pub fn load(&self) -> Result<Frame> {
        match self {
            FrameSource::Memory(frame) => Ok(frame.clone()),
            FrameSource::Files {
                image,
                mask,
                depth,
                depth_unit_scale,
            } => {
                let mut frame = Frame::new(Image::open(image)?.read_f32()?);
                if let Some(path) = mask {
                    frame = frame.with_mask(Image::open(path)?.read_mask()?)?;
                }
                if let Some(path) = depth {
                    frame = frame.with_depth(Image::open(path)?.read_depth(*depth_unit_scale)?)?;
                }
                Ok(frame)
            }
        }
    }
}

/// Frames and cameras of one split, index-aligned
#[derive(Debug, Clone, Default)]
pub struct DataparserOutputs {
    frames: Vec<FrameSource>,
    cameras: Cameras,
}

impl DataparserOutputs {
    pub fn new(frames: Vec<FrameSource>, cameras: Cameras) -> Result<Self> {
        if frames.len() != cameras.len() {
            return Err(RdmError::InvalidInput(format!(
                "{} frames but {} cameras",
                frames.len(),
                cameras.len()
            )));
        }
        Ok(Self { frames, cameras })
    }

    /// Build from in-memory frames paired with their cameras
    pub fn from_frames(pairs: impl IntoIterator<Item = (Frame, CameraRecord)>) -> Self {
        let (frames, cameras): (Vec<_>, Vec<_>) = pairs
            .into_iter()
            .map(|(frame, camera)| (FrameSource::Memory(frame), camera))
            .unzip();
        Self {
            frames,
            cameras: Cameras::new(cameras),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cameras(&self) -> &Cameras {
        &self.cameras
    }

    pub fn into_parts(self) -> (Vec<FrameSource>, Cameras) {
        (self.frames, self.cameras)
    }
}

/// Source of per-split dataparser outputs
pub trait DataParser {
    fn outputs(&self, split: Split) -> Result<DataparserOutputs>;

    /// Root directory the data was parsed from, if any
    fn data_path(&self) -> Option<&Path> {
        None
    }
}

/// Dataparser serving outputs that were assembled in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataParser {
    splits: HashMap<Split, DataparserOutputs>,
    data_path: Option<PathBuf>,
}

impl InMemoryDataParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split(mut self, split: Split, outputs: DataparserOutputs) -> Self {
        self.splits.insert(split, outputs);
        self
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }
}

impl DataParser for InMemoryDataParser {
    /// Missing splits are served as empty outputs
    fn outputs(&self, split: Split) -> Result<DataparserOutputs> {
        Ok(self.splits.get(&split).cloned().unwrap_or_default())
    }

    fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rdm_core::CameraType;

    fn camera() -> CameraRecord {
        CameraRecord::new(CameraType::Perspective, 10.0, 10.0, 4.0, 4.0, 8, 8)
    }

    #[test]
    fn test_outputs_require_alignment() {
        let result = DataparserOutputs::new(
            vec![FrameSource::Memory(Frame::new(Array3::zeros((8, 8, 3))))],
            Cameras::new(vec![camera(), camera()]),
        );
        assert!(matches!(result, Err(RdmError::InvalidInput(_))));
    }

    #[test]
    fn test_in_memory_parser_splits() {
        let outputs = DataparserOutputs::from_frames(
            (0..3).map(|_| (Frame::new(Array3::zeros((8, 8, 3))), camera())),
        );
        let parser = InMemoryDataParser::new()
            .with_split(Split::Train, outputs)
            .with_data_path("/data/scene");

        assert_eq!(parser.outputs(Split::Train).unwrap().len(), 3);
        assert!(parser.outputs(Split::Val).unwrap().is_empty());
        assert_eq!(parser.data_path(), Some(Path::new("/data/scene")));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = FrameSource::image_file("/nonexistent/frame_0001.png");
        assert!(matches!(source.load(), Err(RdmError::Io(_))));
    }
}
