//! Hand landmark detection.

use crate::config::PipelineConfig;
use crate::coords::Point;
use crate::image::Image;
use crate::landmark::{HandLandmarks, HandObservation, LandmarkFilter};
use crate::rect::{points_to_rect, Rect};
use crate::timer::Timer;

/// An external hand pose detector.
///
/// Implementations report the landmarks of at most one hand per image, in normalized coordinates
/// with the origin in the bottom left corner. Returning `Ok(None)` means no hand was found.
pub trait HandPoseDetector: Send {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>>;
}

impl<F> HandPoseDetector for F
where
    F: FnMut(&Image) -> anyhow::Result<Option<HandObservation>> + Send,
{
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>> {
        self(image)
    }
}

/// Runs a [`HandPoseDetector`] and filters its output down to complete, confident hands.
pub struct HandDetector {
    detector: Box<dyn HandPoseDetector>,
    filter: LandmarkFilter,
    margin: f32,
    t_detect: Timer,
}

impl HandDetector {
    /// Creates a detector using the threshold and margin of `config`.
    ///
    /// Fails if `config` does not pass [`PipelineConfig::validate`].
    pub fn new<D: HandPoseDetector + 'static>(
        detector: D,
        config: &PipelineConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: Box::new(detector),
            filter: LandmarkFilter::new(config.confidence_threshold),
            margin: config.rect_margin,
            t_detect: Timer::new("detect"),
        })
    }

    pub fn filter(&self) -> &LandmarkFilter {
        &self.filter
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn timers(&self) -> [&Timer; 1] {
        [&self.t_detect]
    }

    /// Detects a hand in `image` and returns its landmarks in device space.
    ///
    /// Returns `None` when the detector fails, finds no hand, or reports any landmark below the
    /// confidence threshold.
    pub fn detect(&mut self, image: &Image) -> Option<HandLandmarks> {
        let detector = &mut self.detector;
        let observation = match self.t_detect.time(|| detector.detect(image)) {
            Ok(Some(observation)) => observation,
            Ok(None) => {
                log::trace!("no hand in {:?}", image);
                return None;
            }
            Err(e) => {
                log::debug!("hand pose detection failed: {:#}", e);
                return None;
            }
        };

        let landmarks = self.filter.extract(&observation);
        if landmarks.is_none() {
            log::trace!(
                "rejected hand with {} recognized points",
                observation.len()
            );
        }
        landmarks
    }

    /// Computes the hand rectangle around `points` with the configured margin.
    pub fn hand_rect(&self, points: &[Point]) -> Rect {
        points_to_rect(points, self.margin)
    }
}
