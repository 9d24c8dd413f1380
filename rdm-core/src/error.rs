use thiserror::Error;

use crate::camera::{CameraType, DistortionError};
use crate::split::Split;

/// Common errors across the data pipeline
#[derive(Error, Debug)]
pub enum RdmError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Distortion error: {0}")]
    Distortion(#[from] DistortionError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device error: {0}")]
    Device(String),

    /// Sampling was requested from a split that holds no frames.
    #[error("No frames in {0} split")]
    EmptySplit(Split),

    /// Cameras and cached frames of a split disagree in length.
    #[error("{split} split misaligned: {cameras} cameras vs {frames} cached frames")]
    Misaligned {
        split: Split,
        cameras: usize,
        frames: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Unsupported camera model: {0} (only perspective and fisheye cameras are supported)")]
    UnsupportedModel(CameraType),

    #[error("Invalid intrinsics: {0}")]
    InvalidIntrinsics(String),

    #[error("Undistorted region of interest is empty")]
    EmptyRoi,

    #[error("Camera index {index} out of range for {len} cameras")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, RdmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_display() {
        let err = CameraError::UnsupportedModel(CameraType::Equirectangular);
        assert_eq!(
            err.to_string(),
            "Unsupported camera model: equirectangular (only perspective and fisheye cameras are supported)"
        );

        let err = CameraError::EmptyRoi;
        assert_eq!(err.to_string(), "Undistorted region of interest is empty");

        let err = CameraError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(err.to_string(), "Camera index 7 out of range for 3 cameras");
    }

    #[test]
    fn test_rdm_error_from_camera_error() {
        let cam_err = CameraError::UnsupportedModel(CameraType::Fisheye624);
        let err: RdmError = cam_err.into();
        assert!(matches!(err, RdmError::Camera(CameraError::UnsupportedModel(_))));
    }

    #[test]
    fn test_rdm_error_from_distortion_error() {
        let err: RdmError = DistortionError::NonConvergent.into();
        assert!(matches!(err, RdmError::Distortion(_)));
    }

    #[test]
    fn test_empty_split_display() {
        let err = RdmError::EmptySplit(Split::Val);
        assert_eq!(err.to_string(), "No frames in val split");
    }

    #[test]
    fn test_misaligned_display() {
        let err = RdmError::Misaligned {
            split: Split::Train,
            cameras: 4,
            frames: 3,
        };
        assert_eq!(
            err.to_string(),
            "train split misaligned: 4 cameras vs 3 cached frames"
        );
    }
}
