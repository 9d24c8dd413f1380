use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::{Array2, Array3, Axis};
use std::path::Path;

use crate::error::{IoError, Result};

/// Decoded image file
pub struct Image {
    image: DynamicImage,
    width: usize,
    height: usize,
    band_count: usize,
}

impl Image {
    /// Open and decode an image from file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)?;
        tracing::debug!(path = %path.display(), "decoded image");
        Ok(Self::from_dynamic(image))
    }

    /// Wrap an already decoded image
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let band_count = if image.color().has_alpha() { 4 } else { 3 };
        Self {
            image,
            width,
            height,
            band_count,
        }
    }

    /// Get image dimensions (width, height)
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of colour bands served by [`Image::read_f32`]: RGB, or RGBA if
    /// the file carries alpha
    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Read full image as f32 array in [0, 1] (shape: [height, width, bands])
    pub fn read_f32(&self) -> Result<Array3<f32>> {
        let raw = if self.band_count == 4 {
            self.image.to_rgba32f().into_raw()
        } else {
            self.image.to_rgb32f().into_raw()
        };
        Ok(Array3::from_shape_vec((self.height, self.width, self.band_count), raw)?)
    }

    /// Read image as a byte mask, non-zero luma meaning valid
    pub fn read_mask(&self) -> Result<Array2<u8>> {
        let raw = self.image.to_luma8().into_raw();
        let mask = Array2::from_shape_vec((self.height, self.width), raw)?;
        Ok(mask.mapv(|v| u8::from(v > 0)))
    }

    /// Read a 16-bit depth image, multiplying raw values by `unit_scale`
    pub fn read_depth(&self, unit_scale: f32) -> Result<Array2<f32>> {
        let raw = self.image.to_luma16().into_raw();
        let depth = Array2::from_shape_vec((self.height, self.width), raw)?;
        Ok(depth.mapv(|v| v as f32 * unit_scale))
    }
}

/// Resize every band of `src` to `width` x `height` with bilinear filtering
pub fn resize_image(src: &Array3<f32>, width: usize, height: usize) -> Result<Array3<f32>> {
    let (src_h, src_w, bands) = src.dim();
    if width == 0 || height == 0 {
        return Err(IoError::InvalidDimensions);
    }
    if (src_w, src_h) == (width, height) {
        return Ok(src.clone());
    }

    let mut out = Array3::<f32>::zeros((height, width, bands));
    for (band, mut dst) in out.axis_iter_mut(Axis(2)).enumerate() {
        let plane: Vec<f32> = src.index_axis(Axis(2), band).iter().copied().collect();
        let buffer = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(src_w as u32, src_h as u32, plane)
            .ok_or(IoError::InvalidDimensions)?;
        let resized = imageops::resize(&buffer, width as u32, height as u32, FilterType::Triangle);
        let resized = Array2::from_shape_vec((height, width), resized.into_raw())?;
        dst.assign(&resized);
    }
    Ok(out)
}

/// Resize a byte mask with nearest-neighbour sampling
pub fn resize_mask(src: &Array2<u8>, width: usize, height: usize) -> Result<Array2<u8>> {
    let (src_h, src_w) = src.dim();
    if width == 0 || height == 0 {
        return Err(IoError::InvalidDimensions);
    }
    let plane: Vec<u8> = src.iter().copied().collect();
    let buffer = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(src_w as u32, src_h as u32, plane)
        .ok_or(IoError::InvalidDimensions)?;
    let resized = imageops::resize(&buffer, width as u32, height as u32, FilterType::Nearest);
    Ok(Array2::from_shape_vec((height, width), resized.into_raw())?)
}

/// Resize a depth map with nearest-neighbour sampling so no depths are blended
pub fn resize_depth(src: &Array2<f32>, width: usize, height: usize) -> Result<Array2<f32>> {
    let (src_h, src_w) = src.dim();
    if width == 0 || height == 0 {
        return Err(IoError::InvalidDimensions);
    }
    let sx = src_w as f64 / width as f64;
    let sy = src_h as f64 / height as f64;
    Ok(Array2::from_shape_fn((height, width), |(y, x)| {
        let src_x = (((x as f64 + 0.5) * sx) as usize).min(src_w - 1);
        let src_y = (((y as f64 + 0.5) * sy) as usize).min(src_h - 1);
        src[[src_y, src_x]]
    }))
}
