//! Conversion of a hand region into classifier input.

use std::fmt;

use crate::config::{MaskMode, PipelineConfig, PixelFormat, PreprocessOrder};
use crate::image::{Color, Image};
use crate::rect::Rect;
use crate::resolution::Resolution;

/// Length of the shorter side of the gesture classifier's input image.
pub const CLASSIFIER_INPUT_SIZE: u32 = 299;

/// Raw pixel data handed to a classifier.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Converts `image` to the given pixel format.
    ///
    /// [`PixelFormat::Gray8`] stores the red channel of each pixel, so `image` is expected to be
    /// black and white already.
    pub fn from_image(image: &Image, format: PixelFormat) -> Self {
        let rgba = image.data();
        let data = match format {
            PixelFormat::Gray8 => rgba.chunks_exact(4).map(|px| px[0]).collect(),
            PixelFormat::Argb32 => rgba
                .chunks_exact(4)
                .flat_map(|px| [px[3], px[0], px[1], px[2]])
                .collect(),
        };

        Self {
            width: image.width(),
            height: image.height(),
            format,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the pixel data, row by row without padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Converts the buffer back into an [`Image`], for inspection.
    pub fn to_image(&self) -> Image {
        let mut image = Image::new(self.width, self.height);
        let bpp = self.format.bytes_per_pixel();
        for (i, px) in self.data.chunks_exact(bpp).enumerate() {
            let color = match self.format {
                PixelFormat::Gray8 => Color::from_rgb8(px[0], px[0], px[0]),
                PixelFormat::Argb32 => Color::from_rgb8(px[1], px[2], px[3]).with_alpha(px[0]),
            };
            let i = i as u32;
            image.set(i % self.width, i / self.width, color);
        }
        image
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?} PixelBuffer", self.width, self.height, self.format)
    }
}

/// Turns a frame and a hand rectangle into classifier input.
///
/// The steps are: restrict the image to the rectangle, convert it to black and white, scale it so
/// that its shorter side matches the classifier input size, and convert it to the configured
/// [`PixelFormat`]. [`PreprocessOrder`] decides whether the first two steps are swapped.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    order: PreprocessOrder,
    mask_mode: MaskMode,
    input_size: u32,
    pixel_format: PixelFormat,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            order: config.order,
            mask_mode: config.mask_mode,
            input_size: config.input_size,
            pixel_format: config.pixel_format,
        }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Runs all preprocessing steps.
    ///
    /// `rect` is in pixel coordinates of `image`. Returns `None` if any step fails, for example
    /// when `rect` lies entirely outside of `image`.
    pub fn process(&self, image: &Image, rect: Rect) -> Option<PixelBuffer> {
        let restricted = match self.order {
            PreprocessOrder::MaskThenGrayscale => {
                self.restrict(image, rect)?.to_black_and_white()
            }
            PreprocessOrder::GrayscaleThenMask => {
                self.restrict(&image.to_black_and_white(), rect)?
            }
        };

        let resized = match restricted.resize_shorter_side(self.input_size) {
            Some(resized) => resized,
            None => {
                log::trace!("cannot resize {:?}", restricted);
                return None;
            }
        };

        Some(PixelBuffer::from_image(&resized, self.pixel_format))
    }

    fn restrict(&self, image: &Image, rect: Rect) -> Option<Image> {
        let restricted = match self.mask_mode {
            MaskMode::Crop => image.crop(rect),
            MaskMode::Clear => image.mask(rect),
        };
        if restricted.is_none() {
            log::trace!("{:?} does not overlap {:?}", rect, image);
        }
        restricted
    }
}
