//! Camera model adapter: new intrinsics, valid-pixel region and remap tables
//! for rectifying perspective and fisheye frames

use nalgebra::{Matrix3, Vector2};

use crate::camera::{CameraModel, CameraRecord, CameraType, FisheyeCamera, PinholeCamera};
use crate::error::{CameraError, RdmError, Result};
use crate::remap::RemapTable;

/// Samples per image edge when searching for the valid-pixel rectangle
const GRID_SAMPLES: usize = 9;

/// Slack allowed when snapping rectangle edges onto whole pixels
const PIXEL_EPS: f64 = 1e-6;

/// Region of interest in pixels: `width` x `height` pixels starting at `(x, y)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Output of the camera model adapter for one frame
#[derive(Debug, Clone)]
pub enum Undistortion {
    /// Perspective lens: rectify then crop to `roi`
    Pinhole {
        new_k: Matrix3<f64>,
        roi: Roi,
        map: RemapTable,
    },
    /// Fisheye lens: rectify at the original size
    Fisheye { new_k: Matrix3<f64>, map: RemapTable },
}

impl Undistortion {
    /// Compute the rectification of a `size = (width, height)` frame taken by `camera`
    pub fn for_camera(camera: &CameraRecord, size: (usize, usize)) -> Result<Self> {
        let (width, height) = size;
        if width < 2 || height < 2 {
            return Err(RdmError::InvalidInput(format!(
                "cannot rectify a {width}x{height} frame"
            )));
        }

        let model = lens_model(camera, size)?;
        if camera.camera_type() == CameraType::Fisheye {
            let new_k = fisheye_new_camera_matrix(model.as_ref(), 0.0)?;
            let map = RemapTable::undistort(model.as_ref(), &new_k, size)?;
            Ok(Undistortion::Fisheye { new_k, map })
        } else {
            let (new_k, roi) = optimal_new_camera_matrix(model.as_ref())?;
            let map = RemapTable::undistort(model.as_ref(), &new_k, size)?;
            Ok(Undistortion::Pinhole { new_k, roi, map })
        }
    }

    /// Map taking a rectified, uncropped frame back onto the distorted pixel
    /// grid of `camera`
    pub fn redistortion_map(&self, camera: &CameraRecord, size: (usize, usize)) -> Result<RemapTable> {
        let model = lens_model(camera, size)?;
        RemapTable::redistort(model.as_ref(), self.new_intrinsics(), size)
    }

    pub fn new_intrinsics(&self) -> &Matrix3<f64> {
        match self {
            Undistortion::Pinhole { new_k, .. } | Undistortion::Fisheye { new_k, .. } => new_k,
        }
    }

    pub fn map(&self) -> &RemapTable {
        match self {
            Undistortion::Pinhole { map, .. } | Undistortion::Fisheye { map, .. } => map,
        }
    }

    /// Crop applied after remapping, if any
    pub fn roi(&self) -> Option<Roi> {
        match self {
            Undistortion::Pinhole { roi, .. } => Some(*roi),
            Undistortion::Fisheye { .. } => None,
        }
    }
}

/// Lens model of `camera` for a `size = (width, height)` image
fn lens_model(camera: &CameraRecord, size: (usize, usize)) -> Result<Box<dyn CameraModel>> {
    let (width, height) = size;
    let params = camera.distortion_params();
    match camera.camera_type() {
        CameraType::Perspective => Ok(Box::new(PinholeCamera::new_rational(
            width,
            height,
            camera.fx(),
            camera.fy(),
            camera.cx(),
            camera.cy(),
            perspective_coefficients(params),
        ))),
        CameraType::Fisheye => {
            let [k1, k2, k3, k4] = fisheye_coefficients(params);
            Ok(Box::new(FisheyeCamera::new(
                width,
                height,
                camera.fx(),
                camera.fy(),
                camera.cx(),
                camera.cy(),
                k1,
                k2,
                k3,
                k4,
            )))
        }
        other => Err(CameraError::UnsupportedModel(other).into()),
    }
}

/// Reorder `[k1, k2, k3, k4, p1, p2]` into the rational layout
/// `[k1, k2, p1, p2, k3, k4, k5, k6]` with `k5 = k6 = 0`.
pub fn perspective_coefficients(params: &[f64; 6]) -> [f64; 8] {
    [
        params[0], params[1], params[4], params[5], params[2], params[3], 0.0, 0.0,
    ]
}

/// Kannala-Brandt coefficients `[k1, k2, k3, k4]`
pub fn fisheye_coefficients(params: &[f64; 6]) -> [f64; 4] {
    [params[0], params[1], params[2], params[3]]
}

/// Axis-aligned rectangle with float edges
#[derive(Debug, Clone, Copy)]
struct EdgeRect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Largest rectangle inscribed in the undistorted image border, sampled on a
/// `GRID_SAMPLES` x `GRID_SAMPLES` grid. Coordinates are normalized when
/// `new_k` is `None`, otherwise pixels of `new_k`.
fn inscribed_rect<M: CameraModel + ?Sized>(model: &M, new_k: Option<&Matrix3<f64>>) -> Result<EdgeRect> {
    let (width, height) = model.image_size();
    let last = (GRID_SAMPLES - 1) as f64;

    let mut rect = EdgeRect {
        x0: f64::MIN,
        y0: f64::MIN,
        x1: f64::MAX,
        y1: f64::MAX,
    };

    for gy in 0..GRID_SAMPLES {
        for gx in 0..GRID_SAMPLES {
            let px = gx as f64 * (width - 1) as f64 / last;
            let py = gy as f64 * (height - 1) as f64 / last;
            let (xn, yn) = model.pixel_to_normalized((px, py))?;
            let (x, y) = match new_k {
                Some(k) => (k[(0, 0)] * xn + k[(0, 2)], k[(1, 1)] * yn + k[(1, 2)]),
                None => (xn, yn),
            };

            if gx == 0 {
                rect.x0 = rect.x0.max(x);
            }
            if gx == GRID_SAMPLES - 1 {
                rect.x1 = rect.x1.min(x);
            }
            if gy == 0 {
                rect.y0 = rect.y0.max(y);
            }
            if gy == GRID_SAMPLES - 1 {
                rect.y1 = rect.y1.min(y);
            }
        }
    }

    if rect.x1 - rect.x0 <= 0.0 || rect.y1 - rect.y0 <= 0.0 {
        return Err(CameraError::EmptyRoi.into());
    }
    Ok(rect)
}

/// New camera matrix keeping only valid pixels (no black border), plus the
/// valid-pixel region of the rectified image
pub fn optimal_new_camera_matrix<M: CameraModel + ?Sized>(model: &M) -> Result<(Matrix3<f64>, Roi)> {
    let (width, height) = model.image_size();
    let inner = inscribed_rect(model, None)?;

    // Map the inscribed rectangle onto the full viewport
    let fx = (width - 1) as f64 / (inner.x1 - inner.x0);
    let fy = (height - 1) as f64 / (inner.y1 - inner.y0);
    let cx = -fx * inner.x0;
    let cy = -fy * inner.y0;
    let new_k = Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);

    let valid = inscribed_rect(model, Some(&new_k))?;
    let x0 = (valid.x0 - PIXEL_EPS).ceil().max(0.0);
    let y0 = (valid.y0 - PIXEL_EPS).ceil().max(0.0);
    let x1 = (valid.x1 + PIXEL_EPS).floor().min((width - 1) as f64);
    let y1 = (valid.y1 + PIXEL_EPS).floor().min((height - 1) as f64);
    if x1 < x0 || y1 < y0 {
        return Err(CameraError::EmptyRoi.into());
    }

    let roi = Roi {
        x: x0 as usize,
        y: y0 as usize,
        width: (x1 - x0) as usize + 1,
        height: (y1 - y0) as usize + 1,
    };
    Ok((new_k, roi))
}

/// New camera matrix for fisheye rectification with identity rotation
///
/// `balance` blends between the largest focal length that leaves no black
/// border (0.0) and the smallest one that keeps the whole field of view (1.0).
pub fn fisheye_new_camera_matrix<M: CameraModel + ?Sized>(model: &M, balance: f64) -> Result<Matrix3<f64>> {
    let balance = balance.clamp(0.0, 1.0);
    let (width, height) = model.image_size();
    let (w, h) = (width as f64, height as f64);
    let k = model.intrinsics();
    let aspect = k[(0, 0)] / k[(1, 1)];

    let edges = [(w / 2.0, 0.0), (w, h / 2.0), (w / 2.0, h), (0.0, h / 2.0)];
    let mut points = Vec::with_capacity(edges.len());
    for pixel in edges {
        let (x, y) = model.pixel_to_normalized(pixel)?;
        points.push(Vector2::new(x, y * aspect));
    }

    let center = points.iter().sum::<Vector2<f64>>() / points.len() as f64;
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in &points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let candidates = [
        w * 0.5 / (center.x - min_x),
        w * 0.5 / (max_x - center.x),
        h * 0.5 * aspect / (center.y - min_y),
        h * 0.5 * aspect / (max_y - center.y),
    ];
    if candidates.iter().any(|f| !f.is_finite() || *f <= 0.0) {
        return Err(CameraError::InvalidIntrinsics("degenerate fisheye field of view".to_string()).into());
    }

    let f_min = candidates.iter().copied().fold(f64::MAX, f64::min);
    let f_max = candidates.iter().copied().fold(f64::MIN, f64::max);
    let f = balance * f_min + (1.0 - balance) * f_max;

    let new_cx = -center.x * f + w * 0.5;
    let new_cy = (-center.y * f + h * aspect * 0.5) / aspect;

    Ok(Matrix3::new(f, 0.0, new_cx, 0.0, f / aspect, new_cy, 0.0, 0.0, 1.0))
}
