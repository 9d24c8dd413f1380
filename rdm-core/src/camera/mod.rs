//! Camera models, camera records and projections

mod distortion;
mod fisheye;
mod pinhole;
mod record;

pub use distortion::DistortionError;
pub use fisheye::FisheyeCamera;
pub use pinhole::PinholeCamera;
pub use record::{CAMERA_INDEX_KEY, CameraRecord, CameraType, Cameras, MetadataValue};

use nalgebra::{Matrix3, Vector3};

/// Generic CameraModel
pub trait CameraModel {
    /// Map normalized (undistorted) coordinates to pixel coordinates,
    /// applying the lens distortion
    fn normalized_to_pixel(&self, x_norm: f64, y_norm: f64) -> (f64, f64);

    /// Map pixel coordinates to normalized undistorted coordinates
    fn pixel_to_normalized(&self, pixel: (f64, f64)) -> Result<(f64, f64), DistortionError>;

    /// Intrinsic matrix K
    fn intrinsics(&self) -> Matrix3<f64>;

    /// Get image dimensions this camera is calibrated for
    fn image_size(&self) -> (usize, usize);

    /// Project 3D point in camera frame to image coordinates
    /// Returns None if point is behind camera
    fn project(&self, point_camera: &Vector3<f64>) -> Option<(f64, f64)> {
        if point_camera.z <= 0.0 {
            return None;
        }

        let x_norm = point_camera.x / point_camera.z;
        let y_norm = point_camera.y / point_camera.z;

        Some(self.normalized_to_pixel(x_norm, y_norm))
    }

    /// Unproject image coordinates to unit ray in camera frame
    fn unproject(&self, pixel: (f64, f64)) -> Result<Vector3<f64>, DistortionError> {
        let (x_norm, y_norm) = self.pixel_to_normalized(pixel)?;
        Ok(Vector3::new(x_norm, y_norm, 1.0).normalize())
    }
}
