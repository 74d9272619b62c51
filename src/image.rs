//! Image manipulation.
//!
//! This module provides the [`Image`] type, an owned RGBA image, together with the handful of
//! operations the gesture preprocessing needs: cropping and masking to a hand region, conversion
//! to black and white, and aspect-preserving resizing.


use std::{fmt, path::Path};

use anyhow::Context;
use image::{imageops::FilterType, ImageBuffer, Rgba, RgbaImage};

use crate::rect::Rect;
use crate::resolution::Resolution;

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            _ => anyhow::bail!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            ),
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone)]
pub struct Image {
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_path(path)?;
        let data =
            std::fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        let buf = image::load_from_memory_with_format(&data, format.to_image_format())
            .with_context(|| format!("failed to decode '{}'", path.display()))?
            .to_rgba8();
        Ok(Self { buf })
    }

    /// Decodes an encoded JPEG or PNG image, such as the data of a captured still photo.
    pub fn decode(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory(data)
            .context("failed to decode image data")?
            .to_rgba8();
        Ok(Self { buf })
    }

    /// Creates an image from raw RGBA8 pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `buf` does not contain exactly `4 * width * height` bytes.
    pub fn from_rgba8(res: Resolution, buf: &[u8]) -> Self {
        let expected_size = res.width() as usize * res.height() as usize * 4;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} image (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_vec(res.width(), res.height(), buf.to_vec())
                .expect("buffer size does not match image resolution"),
        }
    }

    /// Saves an image to the file system.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        self.save_impl(path.as_ref())
    }

    fn save_impl(&self, path: &Path) -> anyhow::Result<()> {
        match ImageFormat::from_path(path)? {
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(self.buf.clone())
                .to_rgb8()
                .save(path),
            ImageFormat::Png => self.buf.save(path),
        }
        .with_context(|| format!("failed to save '{}'", path.display()))
    }

    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    pub fn flip_horizontal(&self) -> Image {
        Image {
            buf: image::imageops::flip_horizontal(&self.buf),
        }
    }

    /// Computes the whole pixels covered by `rect`, clipped to the image.
    ///
    /// Partially covered pixels are included. Returns `None` if `rect` does not overlap the image.
    fn pixel_bounds(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        if !rect.x().is_finite() || !rect.y().is_finite() {
            return None;
        }
        let clipped = rect.intersection(&self.rect())?;
        let x0 = clipped.x().floor() as u32;
        let y0 = clipped.y().floor() as u32;
        let x1 = (clipped.x_max().ceil() as u32).min(self.width());
        let y1 = (clipped.y_max().ceil() as u32).min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }

    /// Copies the area inside `rect` into a new image.
    ///
    /// Parts of `rect` outside of the image are cut off. Returns `None` if `rect` does not
    /// overlap the image at all.
    pub fn crop(&self, rect: Rect) -> Option<Image> {
        let (x, y, w, h) = self.pixel_bounds(rect)?;
        Some(Image {
            buf: image::imageops::crop_imm(&self.buf, x, y, w, h).to_image(),
        })
    }

    /// Returns a copy of this image where everything outside of `rect` is cleared to
    /// [`Color::NULL`].
    ///
    /// The image keeps its size. Returns `None` if `rect` does not overlap the image at all.
    pub fn mask(&self, rect: Rect) -> Option<Image> {
        let (x0, y0, w, h) = self.pixel_bounds(rect)?;
        let mut masked = Image::new(self.width(), self.height());
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                masked.buf[(x, y)] = self.buf[(x, y)];
            }
        }
        Some(masked)
    }

    /// Converts the image to black and white, keeping the alpha channel.
    ///
    /// The gray value is the Rec. 709 luma of each pixel.
    pub fn to_black_and_white(&self) -> Image {
        let luma = image::imageops::grayscale(&self.buf);
        let buf = ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            let l = luma[(x, y)].0[0];
            let a = self.buf[(x, y)].0[3];
            Rgba([l, l, l, a])
        });
        Image { buf }
    }

    /// Resizes this image to exactly `res`, without regard for the aspect ratio.
    pub fn resize(&self, res: Resolution) -> Image {
        Image {
            buf: image::imageops::resize(
                &self.buf,
                res.width(),
                res.height(),
                FilterType::CatmullRom,
            ),
        }
    }

    /// Scales the image so that its shorter side is `target` pixels long, keeping the aspect
    /// ratio.
    ///
    /// Returns `None` for an image without pixels, or when `target` is 0.
    pub fn resize_shorter_side(&self, target: u32) -> Option<Image> {
        let shorter = self.width().min(self.height());
        if shorter == 0 || target == 0 {
            return None;
        }

        let scale = f64::from(target) / f64::from(shorter);
        let width = ((f64::from(self.width()) * scale).round() as u32).max(1);
        let height = ((f64::from(self.height()) * scale).round() as u32).max(1);
        let res = Resolution::new(width, height);
        log::trace!("resize {} -> {}", self.resolution(), res);
        Some(self.resize(res))
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// An 8-bit sRGB color with alpha channel.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);

    /// Fully transparent black.
    pub const NULL: Self = Self([0, 0, 0, 0]);

    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn with_alpha(self, a: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, a])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    pub fn a(&self) -> u8 {
        self.0[3]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}
