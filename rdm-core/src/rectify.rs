//! Frame rectifier: removes lens distortion from a frame and derives the
//! camera record that describes the result

use crate::camera::CameraRecord;
use crate::error::Result;
use crate::frame::Frame;
use crate::undistort::Undistortion;

/// A rectified frame together with the camera that now describes it
#[derive(Debug, Clone)]
pub struct Rectified {
    pub frame: Frame,
    pub camera: CameraRecord,
}

/// Rectify `frame` as captured by `camera`
///
/// The input record is left untouched; the returned record carries the new
/// intrinsics and image size and must be written back by the caller.
pub fn rectify_frame(frame: Frame, camera: &CameraRecord) -> Result<Rectified> {
    let undistortion = Undistortion::for_camera(camera, frame.size())?;
    apply_undistortion(frame, camera, &undistortion)
}

/// Apply a precomputed [`Undistortion`] to every channel of `frame`
pub fn apply_undistortion(
    frame: Frame,
    camera: &CameraRecord,
    undistortion: &Undistortion,
) -> Result<Rectified> {
    let map = undistortion.map();
    let remapped = Frame {
        image: map.remap_image(&frame.image),
        mask: frame.mask.as_ref().map(|m| map.remap_mask(m)),
        depth: frame.depth.as_ref().map(|d| map.remap_nearest(d)),
        residency: frame.residency,
    };

    let mut new_k = *undistortion.new_intrinsics();
    match undistortion.roi() {
        Some(roi) => {
            let frame = remapped.crop(&roi)?;
            // Principal point follows the crop origin
            new_k[(0, 2)] -= roi.x as f64;
            new_k[(1, 2)] -= roi.y as f64;
            Ok(Rectified {
                frame,
                camera: camera.with_intrinsics(&new_k, roi.width, roi.height),
            })
        }
        None => Ok(Rectified {
            frame: remapped,
            camera: camera.with_intrinsics(&new_k, camera.width(), camera.height()),
        }),
    }
}
