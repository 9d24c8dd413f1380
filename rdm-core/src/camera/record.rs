use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CameraError, Result};

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraType {
    Perspective,
    Fisheye,
    Equirectangular,
    Fisheye624,
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CameraType::Perspective => "perspective",
            CameraType::Fisheye => "fisheye",
            CameraType::Equirectangular => "equirectangular",
            CameraType::Fisheye624 => "fisheye624",
        };
        f.write_str(name)
    }
}

/// Value stored in a camera's metadata map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Metadata key carrying the index a camera was sampled at
pub const CAMERA_INDEX_KEY: &str = "cam_idx";

/// Intrinsics, lens distortion and image size of one frame's camera
///
/// Distortion parameters use the `[k1, k2, k3, k4, p1, p2]` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
    width: usize,
    height: usize,
    distortion_params: [f64; 6],
    camera_type: CameraType,
    #[serde(default)]
    metadata: BTreeMap<String, MetadataValue>,
}

impl CameraRecord {
    /// Create an undistorted camera record
    pub fn new(
        camera_type: CameraType,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
            distortion_params: [0.0; 6],
            camera_type,
            metadata: BTreeMap::new(),
        }
    }

    /// Replace the distortion parameters (`[k1, k2, k3, k4, p1, p2]`)
    pub fn with_distortion(mut self, params: [f64; 6]) -> Self {
        self.distortion_params = params;
        self
    }

    /// Return a copy carrying the intrinsics of `k` and the given image size
    pub fn with_intrinsics(&self, k: &Matrix3<f64>, width: usize, height: usize) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            width,
            height,
            ..self.clone()
        }
    }

    /// Return a copy with a metadata entry set
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Return a copy whose output resolution is scaled by `factor`
    ///
    /// Width and height are truncated to whole pixels.
    pub fn rescaled(&self, factor: f64) -> Self {
        Self {
            fx: self.fx * factor,
            fy: self.fy * factor,
            cx: self.cx * factor,
            cy: self.cy * factor,
            width: (self.width as f64 * factor) as usize,
            height: (self.height as f64 * factor) as usize,
            ..self.clone()
        }
    }

    pub fn intrinsics_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    pub fn fx(&self) -> f64 {
        self.fx
    }

    pub fn fy(&self) -> f64 {
        self.fy
    }

    pub fn cx(&self) -> f64 {
        self.cx
    }

    pub fn cy(&self) -> f64 {
        self.cy
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn distortion_params(&self) -> &[f64; 6] {
        &self.distortion_params
    }

    pub fn camera_type(&self) -> CameraType {
        self.camera_type
    }

    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    /// Index this camera was sampled at, if it has been served by a sampler
    pub fn camera_index(&self) -> Option<usize> {
        match self.metadata.get(CAMERA_INDEX_KEY) {
            Some(MetadataValue::Int(idx)) => usize::try_from(*idx).ok(),
            _ => None,
        }
    }
}

/// Ordered camera collection, index-aligned with a split's frames
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cameras {
    records: Vec<CameraRecord>,
}

impl Cameras {
    pub fn new(records: Vec<CameraRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CameraRecord> {
        self.records.get(index)
    }

    /// Single-camera slice at `index`
    pub fn slice(&self, index: usize) -> Result<CameraRecord> {
        self.records.get(index).cloned().ok_or_else(|| {
            CameraError::IndexOutOfRange {
                index,
                len: self.records.len(),
            }
            .into()
        })
    }

    /// Replace the record at `index`, returning the previous one
    pub fn replace(&mut self, index: usize, record: CameraRecord) -> Result<CameraRecord> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(CameraError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, record))
    }

    pub fn push(&mut self, record: CameraRecord) {
        self.records.push(record);
    }

    /// Return a copy with every record rescaled by `factor`
    pub fn rescaled(&self, factor: f64) -> Self {
        Self {
            records: self.records.iter().map(|r| r.rescaled(factor)).collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CameraRecord> {
        self.records.iter()
    }
}

impl FromIterator<CameraRecord> for Cameras {
    fn from_iter<I: IntoIterator<Item = CameraRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RdmError;

    fn sample_camera() -> CameraRecord {
        CameraRecord::new(CameraType::Perspective, 500.0, 510.0, 320.0, 240.0, 640, 480)
    }

    #[test]
    fn test_with_intrinsics_returns_new_record() {
        let camera = sample_camera().with_distortion([0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let k = Matrix3::new(400.0, 0.0, 300.0, 0.0, 410.0, 200.0, 0.0, 0.0, 1.0);
        let updated = camera.with_intrinsics(&k, 600, 400);

        assert_eq!(updated.fx(), 400.0);
        assert_eq!(updated.fy(), 410.0);
        assert_eq!(updated.cx(), 300.0);
        assert_eq!(updated.cy(), 200.0);
        assert_eq!((updated.width(), updated.height()), (600, 400));
        assert_eq!(updated.distortion_params(), camera.distortion_params());
        // Source record is untouched
        assert_eq!(camera.fx(), 500.0);
        assert_eq!(camera.width(), 640);
    }

    #[test]
    fn test_rescaled_truncates_size() {
        let camera = sample_camera().rescaled(0.3);
        assert!((camera.fx() - 150.0).abs() < 1e-9);
        assert!((camera.cy() - 72.0).abs() < 1e-9);
        assert_eq!(camera.width(), 192);
        assert_eq!(camera.height(), 144);
    }

    #[test]
    fn test_camera_index_metadata() {
        let camera = sample_camera();
        assert_eq!(camera.camera_index(), None);
        let camera = camera.with_metadata(CAMERA_INDEX_KEY, MetadataValue::Int(4));
        assert_eq!(camera.camera_index(), Some(4));
    }

    #[test]
    fn test_cameras_replace_and_slice() {
        let mut cameras: Cameras = (0..3).map(|_| sample_camera()).collect();
        let k = Matrix3::new(1.0, 0.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 1.0);
        let previous = cameras
            .replace(1, sample_camera().with_intrinsics(&k, 10, 20))
            .unwrap();

        assert_eq!(previous.fx(), 500.0);
        assert_eq!(cameras.slice(1).unwrap().fx(), 1.0);
        assert_eq!(cameras.slice(0).unwrap().fx(), 500.0);
        assert_eq!(cameras.len(), 3);
    }

    #[test]
    fn test_cameras_out_of_range() {
        let mut cameras = Cameras::new(vec![sample_camera()]);
        let err = cameras.replace(3, sample_camera()).unwrap_err();
        assert!(matches!(
            err,
            RdmError::Camera(CameraError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(cameras.slice(1).is_err());
    }

    #[test]
    fn test_camera_type_display() {
        assert_eq!(CameraType::Perspective.to_string(), "perspective");
        assert_eq!(CameraType::Fisheye624.to_string(), "fisheye624");
    }
}
