use super::{CameraModel, DistortionError, distortion::DistortionModel};
use nalgebra::Matrix3;

/// Pinhole camera model with rational radial-tangential distortion
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    width: usize,
    height: usize,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    distortion: DistortionModel,
}

impl PinholeCamera {
    /// Create a new pinhole camera from the 8-term coefficient layout
    /// `[k1, k2, p1, p2, k3, k4, k5, k6]`
    pub fn new_rational(
        width: usize,
        height: usize,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        coeffs: [f64; 8],
    ) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            distortion: DistortionModel::rational(coeffs),
        }
    }

    /// Create a new pinhole camera with no distortion
    pub fn new_ideal(width: usize, height: usize, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self::new_rational(width, height, fx, fy, cx, cy, [0.0; 8])
    }

    /// Get focal lengths
    pub fn focal_length(&self) -> (f64, f64) {
        (self.fx, self.fy)
    }

    /// Get principal point
    pub fn principal_point(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }
}

impl CameraModel for PinholeCamera {
    fn normalized_to_pixel(&self, x_norm: f64, y_norm: f64) -> (f64, f64) {
        let (x_dist, y_dist) = self.distortion.distort(x_norm, y_norm);
        (self.fx * x_dist + self.cx, self.fy * y_dist + self.cy)
    }

    fn pixel_to_normalized(&self, pixel: (f64, f64)) -> Result<(f64, f64), DistortionError> {
        let x_dist = (pixel.0 - self.cx) / self.fx;
        let y_dist = (pixel.1 - self.cy) / self.fy;
        self.distortion.undistort(x_dist, y_dist)
    }

    fn intrinsics(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    fn image_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
