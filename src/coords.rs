//! Conversions between the coordinate spaces used by the pipeline.
//!
//! Landmark detectors report normalized points with the origin in the bottom left corner. Every
//! other consumer expects the origin in the top left corner, so landmarks are converted with
//! [`flip_y`] right after extraction. From there, a [`PointConverter`] maps them into the space
//! of whatever consumes them: a preview surface ([`PreviewLayer`]) or the captured frame's pixel
//! grid ([`FrameSpace`]).

use crate::rect::Rect;
use crate::resolution::Resolution;

/// A 2D point.
pub type Point = nalgebra::Point2<f32>;

/// Converts between bottom-left-origin and top-left-origin normalized coordinates (`y' = 1 - y`).
///
/// Applying this twice yields the original point.
#[inline]
pub fn flip_y(point: Point) -> Point {
    Point::new(point.x, 1.0 - point.y)
}

/// Maps normalized device points (top-left origin) into some other coordinate space.
pub trait PointConverter: Send {
    fn convert(&self, point: Point) -> Point;

    fn convert_all(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.convert(*p)).collect()
    }
}

impl<C: PointConverter + ?Sized> PointConverter for Box<C> {
    fn convert(&self, point: Point) -> Point {
        (**self).convert(point)
    }
}

/// A [`PointConverter`] that returns its input unchanged.
///
/// Used when the display layer performs its own mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PointConverter for Passthrough {
    #[inline]
    fn convert(&self, point: Point) -> Point {
        point
    }
}

/// Maps normalized device points onto the pixel grid of a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpace {
    resolution: Resolution,
}

impl FrameSpace {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl PointConverter for FrameSpace {
    fn convert(&self, point: Point) -> Point {
        Point::new(
            point.x * self.resolution.width() as f32,
            point.y * self.resolution.height() as f32,
        )
    }
}

/// How a video is laid out inside the bounds of a [`PreviewLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoGravity {
    /// Stretch the video to fill the layer, ignoring its aspect ratio.
    Resize,
    /// Fit the whole video inside the layer, adding letterbox or pillarbox bars.
    #[default]
    ResizeAspect,
    /// Fill the layer, cropping the parts of the video that stick out.
    ResizeAspectFill,
}

/// A surface showing the live camera feed.
///
/// Converts normalized device points into the layer's own coordinate system (and back), taking
/// the video's aspect ratio, the [`VideoGravity`] and mirroring into account.
#[derive(Debug, Clone, Copy)]
pub struct PreviewLayer {
    width: f32,
    height: f32,
    video: Resolution,
    gravity: VideoGravity,
    mirrored: bool,
}

impl PreviewLayer {
    /// Creates a `width x height` preview layer showing a video of resolution `video`.
    pub fn new(width: f32, height: f32, video: Resolution) -> Self {
        Self {
            width,
            height,
            video,
            gravity: VideoGravity::default(),
            mirrored: false,
        }
    }

    pub fn with_gravity(self, gravity: VideoGravity) -> Self {
        Self { gravity, ..self }
    }

    /// Mirrors the video horizontally, as is customary for front-facing cameras.
    pub fn mirrored(self, mirrored: bool) -> Self {
        Self { mirrored, ..self }
    }

    /// Returns the layer's bounds.
    pub fn bounds(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width, self.height)
    }

    /// Returns the area of the layer covered by the video.
    ///
    /// With [`VideoGravity::ResizeAspectFill`] this is larger than the layer itself. A video with
    /// no pixels covers nothing.
    pub fn video_rect(&self) -> Rect {
        let video_aspect = match self.video.aspect_ratio() {
            Some(ratio) => ratio.as_f32(),
            None => return Rect::ZERO,
        };
        if self.width <= 0.0 || self.height <= 0.0 {
            return Rect::ZERO;
        }

        let layer_aspect = self.width / self.height;
        let fit_width = match self.gravity {
            VideoGravity::Resize => return self.bounds(),
            // Video is wider than the layer: width is the limit when fitting.
            VideoGravity::ResizeAspect => video_aspect > layer_aspect,
            VideoGravity::ResizeAspectFill => video_aspect <= layer_aspect,
        };

        let (w, h) = if fit_width {
            (self.width, self.width / video_aspect)
        } else {
            (self.height * video_aspect, self.height)
        };
        Rect::from_center(self.width * 0.5, self.height * 0.5, w, h)
    }

    /// Converts a layer point back into normalized device space.
    pub fn device_point(&self, layer_point: Point) -> Option<Point> {
        let rect = self.video_rect();
        if rect.is_empty() {
            return None;
        }
        let x = (layer_point.x - rect.x()) / rect.width();
        let y = (layer_point.y - rect.y()) / rect.height();
        let x = if self.mirrored { 1.0 - x } else { x };
        Some(Point::new(x, y))
    }
}

impl PointConverter for PreviewLayer {
    fn convert(&self, point: Point) -> Point {
        let rect = self.video_rect();
        let x = if self.mirrored { 1.0 - point.x } else { point.x };
        Point::new(rect.x() + x * rect.width(), rect.y() + point.y * rect.height())
    }

    fn convert_all(&self, points: &[Point]) -> Vec<Point> {
        let rect = self.video_rect();
        log::trace!("converting {} points into video rect {:?}", points.len(), rect);
        points
            .iter()
            .map(|p| {
                let x = if self.mirrored { 1.0 - p.x } else { p.x };
                Point::new(rect.x() + x * rect.width(), rect.y() + p.y * rect.height())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn assert_rect_eq(actual: Rect, expected: Rect) {
        assert_relative_eq!(actual.x(), expected.x(), epsilon = 1e-3);
        assert_relative_eq!(actual.y(), expected.y(), epsilon = 1e-3);
        assert_relative_eq!(actual.width(), expected.width(), epsilon = 1e-3);
        assert_relative_eq!(actual.height(), expected.height(), epsilon = 1e-3);
    }

    #[test]
    fn flip_y_is_involutive() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..500 {
            let p = Point::new(rng.f32(), rng.f32());
            let back = flip_y(flip_y(p));
            assert_relative_eq!(back.x, p.x);
            assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
        }
        assert_eq!(flip_y(Point::new(0.25, 0.0)), Point::new(0.25, 1.0));
    }

    #[test]
    fn passthrough() {
        let points = [Point::new(0.1, 0.2), Point::new(0.9, 0.8)];
        assert_eq!(Passthrough.convert_all(&points), points);
    }

    #[test]
    fn frame_space() {
        let space = FrameSpace::new(Resolution::VGA);
        assert_eq!(space.convert(Point::new(0.5, 0.25)), Point::new(320.0, 120.0));
    }

    #[test]
    fn resize_aspect_letterbox() {
        // 4:3 video in a 300x400 portrait layer: full width, 225 high, centered vertically.
        let layer = PreviewLayer::new(300.0, 400.0, Resolution::VGA);
        assert_rect_eq(
            layer.video_rect(),
            Rect::from_top_left(0.0, 87.5, 300.0, 225.0),
        );
        let top_left = layer.convert(Point::new(0.0, 0.0));
        assert_relative_eq!(top_left.x, 0.0);
        assert_relative_eq!(top_left.y, 87.5, epsilon = 1e-3);
        let bottom_right = layer.convert(Point::new(1.0, 1.0));
        assert_relative_eq!(bottom_right.x, 300.0, epsilon = 1e-3);
        assert_relative_eq!(bottom_right.y, 312.5, epsilon = 1e-3);
    }

    #[test]
    fn resize_aspect_pillarbox() {
        // 4:3 video in a wide 800x300 layer: 400 wide, full height.
        let layer = PreviewLayer::new(800.0, 300.0, Resolution::VGA);
        assert_rect_eq(
            layer.video_rect(),
            Rect::from_top_left(200.0, 0.0, 400.0, 300.0),
        );
    }

    #[test]
    fn resize_aspect_fill_crops() {
        let layer = PreviewLayer::new(300.0, 400.0, Resolution::VGA)
            .with_gravity(VideoGravity::ResizeAspectFill);
        let rect = layer.video_rect();
        assert_relative_eq!(rect.height(), 400.0);
        assert_relative_eq!(rect.width(), 400.0 * 4.0 / 3.0, epsilon = 1e-3);
        assert!(rect.x() < 0.0);
    }

    #[test]
    fn resize_stretches() {
        let layer =
            PreviewLayer::new(100.0, 100.0, Resolution::VGA).with_gravity(VideoGravity::Resize);
        assert_eq!(layer.convert(Point::new(0.5, 0.5)), Point::new(50.0, 50.0));
    }

    #[test]
    fn layer_round_trip() {
        let mut rng = fastrand::Rng::with_seed(99);
        for gravity in [
            VideoGravity::Resize,
            VideoGravity::ResizeAspect,
            VideoGravity::ResizeAspectFill,
        ] {
            for mirrored in [false, true] {
                let layer = PreviewLayer::new(390.0, 520.0, Resolution::VGA)
                    .with_gravity(gravity)
                    .mirrored(mirrored);
                for _ in 0..100 {
                    let p = Point::new(rng.f32(), rng.f32());
                    let back = layer.device_point(layer.convert(p)).unwrap();
                    assert_relative_eq!(back.x, p.x, epsilon = 1e-4);
                    assert_relative_eq!(back.y, p.y, epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn mirrored_layer() {
        let layer = PreviewLayer::new(100.0, 100.0, Resolution::new(10, 10)).mirrored(true);
        assert_eq!(layer.convert(Point::new(0.0, 0.5)), Point::new(100.0, 50.0));
    }

    #[test]
    fn empty_video() {
        let layer = PreviewLayer::new(100.0, 100.0, Resolution::new(0, 0));
        assert_eq!(layer.video_rect(), Rect::ZERO);
        assert_eq!(layer.device_point(Point::new(1.0, 1.0)), None);
    }
}
