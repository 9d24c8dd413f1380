//! Frame decoding, dataparser outputs and datasets

pub mod dataparser;
pub mod dataset;
pub mod error;
pub mod image;

pub use dataparser::{DataParser, DataparserOutputs, FrameSource, InMemoryDataParser};
pub use dataset::{Dataset, InputDataset};
pub use error::IoError;
pub use crate::image::Image;
