use rdm_core::RdmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Image read error: {0}")]
    ImageRead(#[from] image::ImageError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid image dimensions")]
    InvalidDimensions,

    #[error("Frame index {index} out of range for {len} frames")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl From<IoError> for RdmError {
    fn from(err: IoError) -> Self {
        RdmError::Io(err.to_string())
    }
}
