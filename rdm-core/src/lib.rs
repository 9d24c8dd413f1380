pub mod camera;
pub mod error;
pub mod frame;
pub mod rectify;
pub mod remap;
pub mod split;
pub mod undistort;

pub use camera::{CameraModel, CameraRecord, CameraType, Cameras, FisheyeCamera, MetadataValue, PinholeCamera};
pub use error::{CameraError, RdmError, Result};
pub use frame::{Frame, Residency};
pub use rectify::{Rectified, apply_undistortion, rectify_frame};
pub use remap::RemapTable;
pub use split::Split;
pub use undistort::{Roi, Undistortion};
