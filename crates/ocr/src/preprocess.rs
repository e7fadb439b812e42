use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::filters;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

#[derive(Debug, Error, PartialEq)]
#[error("Invalid conditioning parameter `{name}`: {reason}")]
pub struct InvalidParam {
    pub name: &'static str,
    pub reason: String,
}

/// Tuning knobs of the conditioning pipeline. Defaults are the values the
/// heuristics were tuned with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConditionParams {
    /// Resampling factor applied first; `1.0` skips the step.
    pub upscale_factor: f32,
    pub clahe_clip_limit: f32,
    /// Tiles per side for CLAHE.
    pub clahe_tile_grid: u32,
    pub median_kernel: u32,
    pub threshold_block_size: u32,
    /// Subtracted from the local mean before comparing.
    pub threshold_offset: f32,
    pub nlm_strength: f32,
    pub nlm_template_window: u32,
    pub nlm_search_window: u32,
}

impl Default for ConditionParams {
    fn default() -> Self {
        Self {
            upscale_factor: 2.0,
            clahe_clip_limit: 2.0,
            clahe_tile_grid: 8,
            median_kernel: 3,
            threshold_block_size: 31,
            threshold_offset: 10.0,
            nlm_strength: 30.0,
            nlm_template_window: 7,
            nlm_search_window: 21,
        }
    }
}

impl ConditionParams {
    pub fn validate(&self) -> Result<(), InvalidParam> {
        positive("upscale_factor", self.upscale_factor)?;
        positive("clahe_clip_limit", self.clahe_clip_limit)?;
        positive("nlm_strength", self.nlm_strength)?;
        if self.clahe_tile_grid == 0 {
            return Err(InvalidParam { name: "clahe_tile_grid", reason: "must be at least 1".into() });
        }
        odd_window("median_kernel", self.median_kernel)?;
        odd_window("threshold_block_size", self.threshold_block_size)?;
        odd_window("nlm_template_window", self.nlm_template_window)?;
        odd_window("nlm_search_window", self.nlm_search_window)?;
        if !self.threshold_offset.is_finite() {
            return Err(InvalidParam { name: "threshold_offset", reason: "must be finite".into() });
        }
        Ok(())
    }
}

fn positive(name: &'static str, v: f32) -> Result<(), InvalidParam> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(InvalidParam { name, reason: format!("must be a positive number, got {v}") })
    }
}

fn odd_window(name: &'static str, v: u32) -> Result<(), InvalidParam> {
    if v >= 3 && v % 2 == 1 {
        Ok(())
    } else {
        Err(InvalidParam { name, reason: format!("must be an odd size of at least 3, got {v}") })
    }
}

/// Load an image file, condition it, and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(path: &Path, params: &ConditionParams) -> Result<Vec<u8>, PreprocessError> {
    let img = image::open(path)?;
    encode_as_png(&condition(img, params))
}

/// Same as [`prepare_for_ocr`] for an already-read file.
pub fn prepare_for_ocr_from_bytes(
    data: &[u8],
    params: &ConditionParams,
) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(&condition(img, params))
}

/// Upscale → grayscale → CLAHE → median → adaptive threshold → NL-means.
///
/// The output is a single-channel, essentially black/white page.
pub fn condition(img: DynamicImage, params: &ConditionParams) -> GrayImage {
    let img = upscale(img, params.upscale_factor);
    let gray = img.to_luma8();
    let gray = filters::clahe(&gray, params.clahe_clip_limit, params.clahe_tile_grid);
    let radius = params.median_kernel / 2;
    let gray = imageproc::filter::median_filter(&gray, radius, radius);
    let binary = filters::adaptive_gaussian_threshold(
        &gray,
        params.threshold_block_size,
        params.threshold_offset,
    );
    filters::nl_means_denoise(
        &binary,
        params.nlm_strength,
        params.nlm_template_window,
        params.nlm_search_window,
    )
}

/// Cubic resample by `factor`. Small scans lose stroke detail at threshold
/// time without this.
fn upscale(img: DynamicImage, factor: f32) -> DynamicImage {
    if factor == 1.0 {
        return img;
    }
    let scaled = |dim: u32| ((dim as f32 * factor).round() as u32).max(1);
    let (w, h) = (scaled(img.width()), scaled(img.height()));
    img.resize_exact(w, h, FilterType::CatmullRom)
}

pub fn encode_as_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
