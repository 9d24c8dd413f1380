use super::{CameraModel, DistortionError, distortion::DistortionModel};
use nalgebra::Matrix3;

/// Fisheye camera model
#[derive(Debug, Clone)]
pub struct FisheyeCamera {
    width: usize,
    height: usize,
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    distortion: DistortionModel,
}

impl FisheyeCamera {
    /// Create a new fisheye camera
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: usize,
        height: usize,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        k1: f64,
        k2: f64,
        k3: f64,
        k4: f64,
    ) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
            distortion: DistortionModel::Fisheye { k1, k2, k3, k4 },
        }
    }
}

impl CameraModel for FisheyeCamera {
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

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_fisheye_center_projection() {
        let camera = FisheyeCamera::new(640, 480, 300.0, 300.0, 320.0, 240.0, 0.1, 0.01, 0.0, 0.0);
        let pixel = camera.project(&Vector3::new(0.0, 0.0, 2.0)).unwrap();
        assert!((pixel.0 - 320.0).abs() < 1e-9);
        assert!((pixel.1 - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisheye_roundtrip() {
        let camera = FisheyeCamera::new(640, 480, 300.0, 300.0, 320.0, 240.0, 0.05, -0.01, 0.002, 0.0);
        let point = Vector3::new(0.8, -0.4, 1.0);
        let pixel = camera.project(&point).unwrap();
        let ray = camera.unproject(pixel).unwrap();
        assert!((ray.dot(&point.normalize()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisheye_compresses_wide_angles() {
        let camera = FisheyeCamera::new(640, 480, 300.0, 300.0, 320.0, 240.0, 0.0, 0.0, 0.0, 0.0);
        // 45 degrees off-axis lands at f * pi/4 from the center, not f * tan(pi/4)
        let (u, _) = camera.project(&Vector3::new(1.0, 0.0, 1.0)).unwrap();
        assert!((u - (320.0 + 300.0 * std::f64::consts::FRAC_PI_4)).abs() < 1e-9);
    }
}
