// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Contrast enhancement for handwriting images
//!
//! Produces the binarized variant tried alongside the original image:
//! 1. Convert to single-channel intensity
//! 2. Smooth with a small (3x3) Gaussian kernel
//! 3. Equalize the histogram
//! 4. Binarize against a Gaussian-weighted local mean (window 15, bias 3)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::gaussian_blur_f32;
use thiserror::Error;
use tracing::{debug, warn};

/// Suffix appended to the input path for the enhanced copy
pub const PREPROCESSED_SUFFIX: &str = ".proc.png";

/// Kernel size of the smoothing pass
pub const SMOOTHING_KERNEL_SIZE: u32 = 3;

/// Window size of the adaptive threshold
pub const ADAPTIVE_BLOCK_SIZE: u32 = 15;

/// Constant subtracted from the local mean before comparing
pub const ADAPTIVE_BIAS: i16 = 3;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to write preprocessed image {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Gaussian sigma matching a square kernel of `ksize` taps
///
/// Same derivation OpenCV uses when sigma is left at zero.
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Path of the enhanced copy for `image_path` (`<image_path>.proc.png`)
pub fn preprocessed_path(image_path: &Path) -> PathBuf {
    let mut name = OsString::from(image_path.as_os_str());
    name.push(PREPROCESSED_SUFFIX);
    PathBuf::from(name)
}

/// Run the full enhancement pipeline on a decoded image
pub fn enhance_for_ocr(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let smoothed = gaussian_blur_f32(&gray, sigma_for_kernel(SMOOTHING_KERNEL_SIZE));
    let equalized = equalize_histogram(&smoothed);
    adaptive_gaussian_threshold(&equalized, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_BIAS)
}

/// Binarize against a Gaussian-weighted neighbourhood mean
///
/// A pixel becomes white (255) when it is brighter than its local mean
/// minus `bias`, black (0) otherwise.
pub fn adaptive_gaussian_threshold(image: &GrayImage, block_size: u32, bias: i16) -> GrayImage {
    let local_mean = gaussian_blur_f32(image, sigma_for_kernel(block_size));

    let mut output = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - bias;
        let value = if pixel[0] as i16 > threshold { 255 } else { 0 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Decode `source`, enhance it and write the result to `target` as PNG
pub fn write_enhanced(source: &Path, target: &Path) -> Result<(), PreprocessError> {
    let image = image::open(source).map_err(|e| PreprocessError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;

    let enhanced = enhance_for_ocr(&image);
    debug!(
        "Enhanced {}x{} image -> {}",
        enhanced.width(),
        enhanced.height(),
        target.display()
    );

    enhanced
        .save_with_format(target, ImageFormat::Png)
        .map_err(|e| PreprocessError::Write {
            path: target.to_path_buf(),
            source: e,
        })
}

/// Removes a temporary file when dropped
///
/// Created before the file is written so that a partially written file is
/// cleaned up as well.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove temporary file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
