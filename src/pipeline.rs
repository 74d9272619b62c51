//! Per-frame and per-photo processing.
//!
//! A [`Pipeline`] runs the landmark detector on a frame, computes the hand rectangle twice (once
//! in display space for the on-screen overlay, once in frame pixels for cropping) and optionally
//! classifies the gesture. The frame rectangle is kept as a [`HandRegion`] so that a still photo
//! captured later, possibly at another resolution, can be cropped to the same hand.

use std::borrow::Cow;

use crate::config::PipelineConfig;
use crate::coords::{FrameSpace, Passthrough, Point, PointConverter};
use crate::hand::classification::{Classifier, GesturePredictor, Prediction};
use crate::hand::detection::{HandDetector, HandPoseDetector};
use crate::image::Image;
use crate::landmark::HandLandmarks;
use crate::rect::Rect;
use crate::resolution::Resolution;
use crate::timer::Timer;

/// What the display should draw on top of the camera preview.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    pub points: Vec<Point>,
    pub rect: Rect,
}

impl Overlay {
    /// An overlay showing nothing.
    pub fn cleared() -> Self {
        Self {
            points: Vec::new(),
            rect: Rect::ZERO,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.points.is_empty() && self.rect == Rect::ZERO
    }
}

/// A hand rectangle in pixel coordinates, along with the resolution of the frame it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRegion {
    pub rect: Rect,
    pub frame: Resolution,
}

impl HandRegion {
    /// Maps the region onto an image of resolution `res`.
    ///
    /// Returns `None` if the region was measured on a frame without pixels.
    pub fn for_image(&self, res: Resolution) -> Option<Rect> {
        if self.frame.num_pixels() == 0 {
            return None;
        }
        if res == self.frame {
            return Some(self.rect);
        }
        let sx = res.width() as f32 / self.frame.width() as f32;
        let sy = res.height() as f32 / self.frame.height() as f32;
        Some(self.rect.scale_axes(sx, sy))
    }
}

/// A frame in which a complete hand was found.
#[derive(Debug, Clone)]
pub struct HandFrame {
    /// Landmarks in device space.
    pub landmarks: HandLandmarks,
    /// Landmarks in display space.
    pub display_points: Vec<Point>,
    /// Hand rectangle in display space.
    pub display_rect: Rect,
    /// Hand rectangle in frame pixels.
    pub region: HandRegion,
    /// Gesture classification, if frames are classified and classification succeeded.
    pub prediction: Option<Prediction>,
}

impl HandFrame {
    pub fn overlay(&self) -> Overlay {
        Overlay {
            points: self.display_points.clone(),
            rect: self.display_rect,
        }
    }
}

/// Result of [`Pipeline::process_frame`].
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    NoHand,
    Hand(HandFrame),
}

impl FrameOutcome {
    pub fn hand(&self) -> Option<&HandFrame> {
        match self {
            FrameOutcome::NoHand => None,
            FrameOutcome::Hand(hand) => Some(hand),
        }
    }

    pub fn overlay(&self) -> Overlay {
        self.hand().map_or_else(Overlay::cleared, HandFrame::overlay)
    }

    pub fn region(&self) -> Option<HandRegion> {
        self.hand().map(|hand| hand.region)
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.hand().and_then(|hand| hand.prediction.as_ref())
    }
}

/// Hand detection, rectangle computation and gesture classification for frames and photos.
pub struct Pipeline {
    detector: HandDetector,
    predictor: GesturePredictor,
    display: Box<dyn PointConverter>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline whose display space is normalized device space.
    ///
    /// Use [`Pipeline::with_display`] to map the overlay onto a preview surface. Fails if `config`
    /// is out of range.
    pub fn new<D, C>(detector: D, classifier: C, config: PipelineConfig) -> anyhow::Result<Self>
    where
        D: HandPoseDetector + 'static,
        C: Classifier + 'static,
    {
        Ok(Self {
            detector: HandDetector::new(detector, &config)?,
            predictor: GesturePredictor::new(classifier, &config),
            display: Box::new(Passthrough),
            config,
        })
    }

    pub fn with_display<P: PointConverter + 'static>(self, display: P) -> Self {
        Self {
            display: Box::new(display),
            ..self
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        self.detector
            .timers()
            .into_iter()
            .chain(self.predictor.timers())
    }

    /// Processes a live frame.
    pub fn process_frame(&mut self, frame: &Image) -> FrameOutcome {
        let landmarks = match self.detector.detect(frame) {
            Some(landmarks) => landmarks,
            None => return FrameOutcome::NoHand,
        };

        let display_points = self.display.convert_all(landmarks.positions());
        let display_rect = self.detector.hand_rect(&display_points);

        let frame_points = FrameSpace::new(frame.resolution()).convert_all(landmarks.positions());
        let region = HandRegion {
            rect: self.detector.hand_rect(&frame_points),
            frame: frame.resolution(),
        };
        log::trace!("hand at {:?} in {}", region.rect, region.frame);

        let prediction = if self.config.classify_frames {
            self.predictor.predict(frame, region.rect)
        } else {
            None
        };

        FrameOutcome::Hand(HandFrame {
            landmarks,
            display_points,
            display_rect,
            region,
            prediction,
        })
    }

    /// Classifies the hand in a still photo, using a region found in an earlier frame.
    pub fn process_photo(&mut self, photo: &Image, region: HandRegion) -> Option<Prediction> {
        let photo = if self.config.mirror_photos {
            Cow::Owned(photo.flip_horizontal())
        } else {
            Cow::Borrowed(photo)
        };
        let rect = region.for_image(photo.resolution())?;
        log::debug!(
            "classifying {:?} with hand region {:?}",
            photo.as_ref(),
            rect
        );
        self.predictor.predict(&photo, rect)
    }
}
