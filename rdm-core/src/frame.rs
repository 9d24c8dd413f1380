use ndarray::{Array2, Array3, s};
use serde::{Deserialize, Serialize};

use crate::error::{RdmError, Result};
use crate::undistort::Roi;

/// Where a frame's pixel buffers currently live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Residency {
    /// Ordinary pageable host memory
    #[default]
    Host,
    /// Page-locked host memory, ready for fast transfer
    Pinned,
    /// Accelerator memory
    Device,
}

/// One frame of a split: image plus optional mask and depth channels
///
/// The image has shape `[height, width, channels]`; mask and depth are
/// `[height, width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub image: Array3<f32>,
    pub mask: Option<Array2<u8>>,
    pub depth: Option<Array2<f32>>,
    pub residency: Residency,
}

impl Frame {
    pub fn new(image: Array3<f32>) -> Self {
        Self {
            image,
            mask: None,
            depth: None,
            residency: Residency::Host,
        }
    }

    pub fn with_mask(mut self, mask: Array2<u8>) -> Result<Self> {
        self.check_channel_shape("mask", mask.dim())?;
        self.mask = Some(mask);
        Ok(self)
    }

    pub fn with_depth(mut self, depth: Array2<f32>) -> Result<Self> {
        self.check_channel_shape("depth", depth.dim())?;
        self.depth = Some(depth);
        Ok(self)
    }

    pub fn width(&self) -> usize {
        self.image.dim().1
    }

    pub fn height(&self) -> usize {
        self.image.dim().0
    }

    pub fn channels(&self) -> usize {
        self.image.dim().2
    }

    /// Get image dimensions (width, height)
    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Crop every channel to `roi`
    pub fn crop(self, roi: &Roi) -> Result<Self> {
        if roi.x + roi.width > self.width() || roi.y + roi.height > self.height() {
            return Err(RdmError::InvalidInput(format!(
                "crop {:?} exceeds {}x{} frame",
                roi,
                self.width(),
                self.height()
            )));
        }

        let rows = roi.y..roi.y + roi.height;
        let cols = roi.x..roi.x + roi.width;

        Ok(Self {
            image: self.image.slice(s![rows.clone(), cols.clone(), ..]).to_owned(),
            mask: self
                .mask
                .map(|m| m.slice(s![rows.clone(), cols.clone()]).to_owned()),
            depth: self.depth.map(|d| d.slice(s![rows, cols]).to_owned()),
            residency: self.residency,
        })
    }

    fn check_channel_shape(&self, name: &str, dim: (usize, usize)) -> Result<()> {
        if dim != (self.height(), self.width()) {
            return Err(RdmError::InvalidInput(format!(
                "{} shape {:?} does not match image {}x{}",
                name,
                dim,
                self.height(),
                self.width()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_frame(width: usize, height: usize) -> Frame {
        let image = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            (y * width + x) as f32 + c as f32 * 0.1
        });
        let mask = Array2::from_shape_fn((height, width), |(y, x)| ((x + y) % 2) as u8);
        let depth = Array2::from_shape_fn((height, width), |(y, x)| (y * 100 + x) as f32);
        Frame::new(image)
            .with_mask(mask)
            .unwrap()
            .with_depth(depth)
            .unwrap()
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = ramp_frame(8, 5);
        assert_eq!(frame.size(), (8, 5));
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.residency, Residency::Host);
    }

    #[test]
    fn test_crop_applies_to_all_channels() {
        let frame = ramp_frame(8, 5);
        let roi = Roi {
            x: 2,
            y: 1,
            width: 4,
            height: 3,
        };
        let cropped = frame.crop(&roi).unwrap();

        assert_eq!(cropped.size(), (4, 3));
        assert_eq!(cropped.image[[0, 0, 0]], (8 + 2) as f32);
        assert_eq!(cropped.mask.as_ref().unwrap().dim(), (3, 4));
        assert_eq!(cropped.mask.as_ref().unwrap()[[0, 0]], 1);
        assert_eq!(cropped.depth.as_ref().unwrap()[[2, 3]], (3 * 100 + 5) as f32);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let frame = ramp_frame(8, 5);
        let roi = Roi {
            x: 6,
            y: 0,
            width: 4,
            height: 5,
        };
        assert!(matches!(frame.crop(&roi), Err(RdmError::InvalidInput(_))));
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let frame = Frame::new(Array3::zeros((4, 4, 3)));
        let result = frame.with_mask(Array2::zeros((3, 4)));
        assert!(result.is_err());
    }
}
