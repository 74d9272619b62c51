//! Pipeline configuration.

use std::{fmt, str::FromStr};

use anyhow::{bail, Context};

use crate::landmark::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::preprocess::CLASSIFIER_INPUT_SIZE;
use crate::rect::HAND_RECT_MARGIN;

/// Order of the first two preprocessing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreprocessOrder {
    /// Restrict the image to the hand region, then convert to black and white.
    #[default]
    MaskThenGrayscale,
    /// Convert the whole image to black and white, then restrict it to the hand region.
    GrayscaleThenMask,
}

impl FromStr for PreprocessOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mask-first" => Self::MaskThenGrayscale,
            "grayscale-first" => Self::GrayscaleThenMask,
            _ => bail!(
                "invalid preprocessing order '{}' (expected 'mask-first' or 'grayscale-first')",
                s
            ),
        })
    }
}

impl fmt::Display for PreprocessOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MaskThenGrayscale => "mask-first",
            Self::GrayscaleThenMask => "grayscale-first",
        })
    }
}

/// How the image is restricted to the hand region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    /// Cut the hand region out of the image.
    #[default]
    Crop,
    /// Keep the image size and clear everything outside the hand region.
    Clear,
}

impl FromStr for MaskMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "crop" => Self::Crop,
            "clear" => Self::Clear,
            _ => bail!("invalid mask mode '{}' (expected 'crop' or 'clear')", s),
        })
    }
}

/// Pixel layout of the classifier input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// One byte of luminance per pixel.
    #[default]
    Gray8,
    /// Four bytes per pixel, in A, R, G, B order.
    Argb32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Argb32 => 4,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gray8" => Self::Gray8,
            "argb32" => Self::Argb32,
            _ => bail!("invalid pixel format '{}' (expected 'gray8' or 'argb32')", s),
        })
    }
}

/// Tunable parameters of the hand pose pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub confidence_threshold: f32,
    pub rect_margin: f32,
    pub input_size: u32,
    pub order: PreprocessOrder,
    pub mask_mode: MaskMode,
    pub pixel_format: PixelFormat,
    /// Mirror still photos horizontally before cropping the hand region out of them.
    pub mirror_photos: bool,
    /// Run the classifier on every live frame, not just on still photos.
    pub classify_frames: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            rect_margin: HAND_RECT_MARGIN,
            input_size: CLASSIFIER_INPUT_SIZE,
            order: PreprocessOrder::default(),
            mask_mode: MaskMode::default(),
            pixel_format: PixelFormat::default(),
            mirror_photos: false,
            classify_frames: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_confidence_threshold(self, confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            ..self
        }
    }

    pub fn with_rect_margin(self, rect_margin: f32) -> Self {
        Self {
            rect_margin,
            ..self
        }
    }

    pub fn with_input_size(self, input_size: u32) -> Self {
        Self { input_size, ..self }
    }

    pub fn with_order(self, order: PreprocessOrder) -> Self {
        Self { order, ..self }
    }

    pub fn with_mask_mode(self, mask_mode: MaskMode) -> Self {
        Self { mask_mode, ..self }
    }

    pub fn with_pixel_format(self, pixel_format: PixelFormat) -> Self {
        Self {
            pixel_format,
            ..self
        }
    }

    pub fn with_mirror_photos(self, mirror_photos: bool) -> Self {
        Self {
            mirror_photos,
            ..self
        }
    }

    pub fn with_classify_frames(self, classify_frames: bool) -> Self {
        Self {
            classify_frames,
            ..self
        }
    }

    /// Loads the default configuration, overridden by any `HANDPOSE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the default configuration, overridden by the values `lookup` returns for the
    /// `HANDPOSE_*` variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "HANDPOSE_CONFIDENCE_THRESHOLD")? {
            config.confidence_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_RECT_MARGIN")? {
            config.rect_margin = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_INPUT_SIZE")? {
            config.input_size = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_PREPROCESS_ORDER")? {
            config.order = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_MASK_MODE")? {
            config.mask_mode = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_PIXEL_FORMAT")? {
            config.pixel_format = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_MIRROR_PHOTOS")? {
            config.mirror_photos = v;
        }
        if let Some(v) = parse_var(&lookup, "HANDPOSE_CLASSIFY_FRAMES")? {
            config.classify_frames = v;
        }

        config.validate()?;
        log::debug!("pipeline config: {:?}", config);
        Ok(config)
    }

    /// Checks that all values are in range.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            bail!(
                "confidence threshold must be in 0.0..=1.0, got {}",
                self.confidence_threshold
            );
        }
        if !self.rect_margin.is_finite() || self.rect_margin < 0.0 {
            bail!(
                "rectangle margin must be a non-negative number, got {}",
                self.rect_margin
            );
        }
        if self.input_size == 0 {
            bail!("classifier input size must not be 0");
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value '{}' for {}", value, key)),
    }
}
