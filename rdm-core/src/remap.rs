//! Pixel remap tables and resampling

use nalgebra::Matrix3;
use ndarray::{Array2, Array3};

use crate::camera::CameraModel;
use crate::error::{CameraError, Result};

/// Per-pixel source coordinates for a destination image
///
/// `map_x[[row, col]]`, `map_y[[row, col]]` give the source pixel sampled for
/// destination pixel `(col, row)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemapTable {
    pub map_x: Array2<f32>,
    pub map_y: Array2<f32>,
}

impl RemapTable {
    /// Build the undistort-rectify map: destination pixels live in the
    /// rectified camera `new_k`, sources in the distorted `model`.
    pub fn undistort<M: CameraModel + ?Sized>(
        model: &M,
        new_k: &Matrix3<f64>,
        size: (usize, usize),
    ) -> Result<Self> {
        let (width, height) = size;
        let (nfx, nfy, ncx, ncy) = unpack_intrinsics(new_k)?;

        let mut map_x = Array2::<f32>::zeros((height, width));
        let mut map_y = Array2::<f32>::zeros((height, width));

        for row in 0..height {
            let y_norm = (row as f64 - ncy) / nfy;
            for col in 0..width {
                let x_norm = (col as f64 - ncx) / nfx;
                let (u, v) = model.normalized_to_pixel(x_norm, y_norm);
                map_x[[row, col]] = u as f32;
                map_y[[row, col]] = v as f32;
            }
        }

        Ok(Self { map_x, map_y })
    }

    /// Build the inverse map: destination pixels live in the distorted `model`,
    /// sources in the rectified camera `new_k`.
    ///
    /// Pixels whose distortion cannot be inverted map outside every image.
    pub fn redistort<M: CameraModel + ?Sized>(
        model: &M,
        new_k: &Matrix3<f64>,
        size: (usize, usize),
    ) -> Result<Self> {
        let (width, height) = size;
        let (nfx, nfy, ncx, ncy) = unpack_intrinsics(new_k)?;

        let mut map_x = Array2::<f32>::from_elem((height, width), -1.0);
        let mut map_y = Array2::<f32>::from_elem((height, width), -1.0);

        for row in 0..height {
            for col in 0..width {
                if let Ok((x_norm, y_norm)) = model.pixel_to_normalized((col as f64, row as f64)) {
                    map_x[[row, col]] = (nfx * x_norm + ncx) as f32;
                    map_y[[row, col]] = (nfy * y_norm + ncy) as f32;
                }
            }
        }

        Ok(Self { map_x, map_y })
    }

    /// Destination size (width, height)
    pub fn size(&self) -> (usize, usize) {
        let (height, width) = self.map_x.dim();
        (width, height)
    }

    /// Bilinear remap of a multi-channel image, zero outside the source
    pub fn remap_image(&self, src: &Array3<f32>) -> Array3<f32> {
        let (src_h, src_w, channels) = src.dim();
        let (width, height) = self.size();
        let mut out = Array3::<f32>::zeros((height, width, channels));

        for row in 0..height {
            for col in 0..width {
                let taps = bilinear_taps(self.map_x[[row, col]], self.map_y[[row, col]], src_w, src_h);
                for c in 0..channels {
                    out[[row, col, c]] = taps
                        .iter()
                        .flatten()
                        .map(|&(y, x, w)| src[[y, x, c]] * w)
                        .sum();
                }
            }
        }

        out
    }

    /// Bilinear remap of a byte mask, rounded back to bytes
    pub fn remap_mask(&self, src: &Array2<u8>) -> Array2<u8> {
        let (src_h, src_w) = src.dim();
        Array2::from_shape_fn(self.map_x.dim(), |(row, col)| {
            let taps = bilinear_taps(self.map_x[[row, col]], self.map_y[[row, col]], src_w, src_h);
            let value: f32 = taps
                .iter()
                .flatten()
                .map(|&(y, x, w)| src[[y, x]] as f32 * w)
                .sum();
            value.round().clamp(0.0, 255.0) as u8
        })
    }

    /// Nearest-neighbour remap of a scalar channel, zero outside the source
    pub fn remap_nearest(&self, src: &Array2<f32>) -> Array2<f32> {
        let (src_h, src_w) = src.dim();
        Array2::from_shape_fn(self.map_x.dim(), |(row, col)| {
            let x = self.map_x[[row, col]].round();
            let y = self.map_y[[row, col]].round();
            if x < 0.0 || y < 0.0 || x >= src_w as f32 || y >= src_h as f32 {
                0.0
            } else {
                src[[y as usize, x as usize]]
            }
        })
    }
}

fn unpack_intrinsics(k: &Matrix3<f64>) -> Result<(f64, f64, f64, f64)> {
    let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
    if !fx.is_finite() || !fy.is_finite() || fx.abs() < f64::EPSILON || fy.abs() < f64::EPSILON {
        return Err(CameraError::InvalidIntrinsics(format!("focal lengths ({fx}, {fy})")).into());
    }
    Ok((fx, fy, k[(0, 2)], k[(1, 2)]))
}

/// The four bilinear neighbours of `(x, y)` with their weights; taps outside
/// the source are `None` and contribute the zero border value.
fn bilinear_taps(x: f32, y: f32, width: usize, height: usize) -> [Option<(usize, usize, f32)>; 4] {
    if !x.is_finite() || !y.is_finite() {
        return [None; 4];
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let tap = |xi: f32, yi: f32, w: f32| {
        if w == 0.0 || xi < 0.0 || yi < 0.0 || xi >= width as f32 || yi >= height as f32 {
            None
        } else {
            Some((yi as usize, xi as usize, w))
        }
    };

    [
        tap(x0, y0, (1.0 - fx) * (1.0 - fy)),
        tap(x0 + 1.0, y0, fx * (1.0 - fy)),
        tap(x0, y0 + 1.0, (1.0 - fx) * fy),
        tap(x0 + 1.0, y0 + 1.0, fx * fy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FisheyeCamera, PinholeCamera};
    use approx::assert_abs_diff_eq;

    fn identity_table(width: usize, height: usize) -> RemapTable {
        RemapTable {
            map_x: Array2::from_shape_fn((height, width), |(_, x)| x as f32),
            map_y: Array2::from_shape_fn((height, width), |(y, _)| y as f32),
        }
    }

    #[test]
    fn identity_remap_preserves_image() {
        let src = Array3::from_shape_fn((4, 5, 2), |(y, x, c)| (y * 10 + x + c) as f32);
        let out = identity_table(5, 4).remap_image(&src);
        assert_eq!(out, src);
    }

    #[test]
    fn half_pixel_shift_interpolates() {
        let src = Array3::from_shape_fn((1, 3, 1), |(_, x, _)| x as f32 * 2.0);
        let table = RemapTable {
            map_x: Array2::from_shape_vec((1, 2), vec![0.5, 1.5]).unwrap(),
            map_y: Array2::zeros((1, 2)),
        };
        let out = table.remap_image(&src);
        assert_abs_diff_eq!(out[[0, 0, 0]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 1, 0]], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn outside_source_is_zero() {
        let src = Array3::from_elem((2, 2, 1), 7.0);
        let table = RemapTable {
            map_x: Array2::from_elem((1, 1), 10.0),
            map_y: Array2::from_elem((1, 1), 10.0),
        };
        assert_eq!(table.remap_image(&src)[[0, 0, 0]], 0.0);

        let depth = Array2::from_elem((2, 2), 3.0);
        assert_eq!(table.remap_nearest(&depth)[[0, 0]], 0.0);
    }

    #[test]
    fn mask_is_rounded() {
        let mask = Array2::from_shape_vec((1, 2), vec![0u8, 255]).unwrap();
        let table = RemapTable {
            map_x: Array2::from_shape_vec((1, 3), vec![0.0, 0.6, 1.0]).unwrap(),
            map_y: Array2::zeros((1, 3)),
        };
        let out = table.remap_mask(&mask);
        assert_eq!(out[[0, 0]], 0);
        assert_eq!(out[[0, 1]], 153);
        assert_eq!(out[[0, 2]], 255);
    }

    #[test]
    fn ideal_pinhole_undistort_map_is_identity() {
        let camera = PinholeCamera::new_ideal(16, 12, 20.0, 20.0, 7.5, 5.5);
        let table = RemapTable::undistort(&camera, &camera.intrinsics(), (16, 12)).unwrap();
        assert_eq!(table.size(), (16, 12));
        for ((row, col), &u) in table.map_x.indexed_iter() {
            assert_abs_diff_eq!(u, col as f32, epsilon = 1e-5);
            assert_abs_diff_eq!(table.map_y[[row, col]], row as f32, epsilon = 1e-5);
        }
    }

    #[test]
    fn redistort_inverts_undistort() {
        let camera = FisheyeCamera::new(40, 30, 30.0, 30.0, 20.0, 15.0, 0.05, 0.01, 0.0, 0.0);
        let new_k = Matrix3::new(25.0, 0.0, 20.0, 0.0, 25.0, 15.0, 0.0, 0.0, 1.0);
        let forward = RemapTable::undistort(&camera, &new_k, (40, 30)).unwrap();
        let inverse = RemapTable::redistort(&camera, &new_k, (40, 30)).unwrap();

        // Following the inverse map from a distorted pixel and then the forward
        // map must land back on the same distorted pixel.
        let (col, row) = (27usize, 9usize);
        let rx = inverse.map_x[[row, col]];
        let ry = inverse.map_y[[row, col]];
        let (rc, rr) = (rx.round() as usize, ry.round() as usize);
        assert_abs_diff_eq!(forward.map_x[[rr, rc]], col as f32, epsilon = 1.5);
        assert_abs_diff_eq!(forward.map_y[[rr, rc]], row as f32, epsilon = 1.5);
    }

    #[test]
    fn degenerate_new_matrix_is_rejected() {
        let camera = PinholeCamera::new_ideal(4, 4, 2.0, 2.0, 2.0, 2.0);
        let result = RemapTable::undistort(&camera, &Matrix3::zeros(), (4, 4));
        assert!(result.is_err());
    }
}
