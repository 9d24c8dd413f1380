//! Data manager configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use rdm_core::{RdmError, Result, Split};

/// Where rectified frames are kept between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    #[serde(rename = "no-cache")]
    NoCache,
    /// Host memory, pinned for fast transfer
    #[default]
    #[serde(rename = "cpu")]
    Cpu,
    /// Accelerator memory
    #[serde(rename = "gpu")]
    Gpu,
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CachePolicy::NoCache => "no-cache",
            CachePolicy::Cpu => "cpu",
            CachePolicy::Gpu => "gpu",
        };
        f.write_str(name)
    }
}

/// Purpose the data manager is set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    Test,
    #[default]
    Val,
    Inference,
}

impl TestMode {
    /// Split evaluated against in this mode
    pub fn eval_split(self) -> Split {
        match self {
            TestMode::Test | TestMode::Inference => Split::Test,
            TestMode::Val => Split::Val,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataManagerConfig {
    /// Dataset root; overrides the dataparser's own path when set
    pub data: Option<PathBuf>,
    /// Scale applied to images, masks and camera intrinsics
    pub camera_res_scale_factor: f64,
    /// Ray-sampling eval setting, -1 or positive. Validated and kept for
    /// config compatibility; full-image eval always covers the whole split.
    pub eval_num_images_to_sample_from: i64,
    /// Ray-sampling eval setting, -1 or positive. Validated and kept for
    /// config compatibility; has no effect on full-image eval.
    pub eval_num_times_to_repeat_images: i64,
    /// Ray-sampling eval index selection. Kept for config compatibility;
    /// full-image eval ignores it and serves every eval frame.
    pub eval_image_indices: Option<Vec<usize>>,
    pub cache_images: CachePolicy,
    /// Seed for eval sampling; drawn from the OS when absent
    pub eval_seed: Option<u64>,
}

impl Default for DataManagerConfig {
    fn default() -> Self {
        Self {
            data: None,
            camera_res_scale_factor: 1.0,
            eval_num_images_to_sample_from: -1,
            eval_num_times_to_repeat_images: -1,
            eval_image_indices: Some(vec![0]),
            cache_images: CachePolicy::Cpu,
            eval_seed: None,
        }
    }
}

impl DataManagerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RdmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RdmError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RdmError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.camera_res_scale_factor.is_finite() || self.camera_res_scale_factor <= 0.0 {
            return Err(RdmError::Config(format!(
                "camera_res_scale_factor must be positive, got {}",
                self.camera_res_scale_factor
            )));
        }
        for (name, value) in [
            ("eval_num_images_to_sample_from", self.eval_num_images_to_sample_from),
            ("eval_num_times_to_repeat_images", self.eval_num_times_to_repeat_images),
        ] {
            if value != -1 && value <= 0 {
                return Err(RdmError::Config(format!(
                    "{name} must be -1 or positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}
