//! Gesture classification of a preprocessed hand region.

use std::collections::HashMap;

use crate::config::PipelineConfig;
use crate::image::Image;
use crate::num::round_to;
use crate::preprocess::{PixelBuffer, Preprocessor};
use crate::rect::Rect;
use crate::timer::Timer;

/// Result of a gesture classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// The most likely label.
    pub label: String,
    /// Probability of every label the classifier knows about.
    pub probabilities: HashMap<String, f64>,
}

impl Prediction {
    pub fn new<L: Into<String>>(label: L, probabilities: HashMap<String, f64>) -> Self {
        Self {
            label: label.into(),
            probabilities,
        }
    }

    /// Creates a prediction from label probabilities, picking the most likely one as the label.
    ///
    /// Returns `None` if `probabilities` is empty.
    pub fn from_probabilities<I, L>(probabilities: I) -> Option<Self>
    where
        I: IntoIterator<Item = (L, f64)>,
        L: Into<String>,
    {
        let probabilities: HashMap<String, f64> = probabilities
            .into_iter()
            .map(|(label, p)| (label.into(), p))
            .collect();
        let label = probabilities
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))?
            .0
            .clone();
        Some(Self {
            label,
            probabilities,
        })
    }

    /// Returns the probability of `label`, if the classifier reported one.
    pub fn probability(&self, label: &str) -> Option<f64> {
        self.probabilities.get(label).copied()
    }

    /// Returns all labels with their probabilities, most likely first.
    ///
    /// Labels with equal probability are ordered by name.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<_> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Formats the probabilities as percentages, one `label : 12.346%` line per label, most
    /// likely first.
    pub fn format_probabilities(&self) -> String {
        self.ranked()
            .into_iter()
            .map(|(label, p)| format!("{} : {:?}%", label, round_to(p * 100.0, 3)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An external image classifier.
pub trait Classifier: Send {
    fn classify(&mut self, input: &PixelBuffer) -> anyhow::Result<Prediction>;
}

impl<F> Classifier for F
where
    F: FnMut(&PixelBuffer) -> anyhow::Result<Prediction> + Send,
{
    fn classify(&mut self, input: &PixelBuffer) -> anyhow::Result<Prediction> {
        self(input)
    }
}

/// Preprocesses hand regions and feeds them to a [`Classifier`].
pub struct GesturePredictor {
    classifier: Box<dyn Classifier>,
    preprocessor: Preprocessor,
    t_preprocess: Timer,
    t_classify: Timer,
}

impl GesturePredictor {
    pub fn new<C: Classifier + 'static>(classifier: C, config: &PipelineConfig) -> Self {
        Self {
            classifier: Box::new(classifier),
            preprocessor: Preprocessor::new(config),
            t_preprocess: Timer::new("preprocess"),
            t_classify: Timer::new("classify"),
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn timers(&self) -> [&Timer; 2] {
        [&self.t_preprocess, &self.t_classify]
    }

    /// Classifies the hand inside `rect`, given in pixel coordinates of `image`.
    ///
    /// Returns `None` if preprocessing or classification fails.
    pub fn predict(&mut self, image: &Image, rect: Rect) -> Option<Prediction> {
        let preprocessor = &self.preprocessor;
        let input = self
            .t_preprocess
            .time(|| preprocessor.process(image, rect))?;
        self.predict_input(&input)
    }

    /// Classifies already preprocessed input.
    pub fn predict_input(&mut self, input: &PixelBuffer) -> Option<Prediction> {
        let classifier = &mut self.classifier;
        match self.t_classify.time(|| classifier.classify(input)) {
            Ok(prediction) => {
                log::trace!("{:?} -> {}", input, prediction.label);
                Some(prediction)
            }
            Err(e) => {
                log::debug!("gesture classification failed: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{gradient_image, FailingClassifier, FixedClassifier};

    fn rps() -> Prediction {
        Prediction::from_probabilities([("rock", 0.1), ("paper", 0.85), ("scissors", 0.05)])
            .unwrap()
    }

    #[test]
    fn label_is_most_likely() {
        let prediction = rps();
        assert_eq!(prediction.label, "paper");
        assert_eq!(prediction.probability("rock"), Some(0.1));
        assert_eq!(prediction.probability("lizard"), None);
        assert!(Prediction::from_probabilities(Vec::<(String, f64)>::new()).is_none());
    }

    #[test]
    fn ranked() {
        let prediction = rps();
        let labels: Vec<_> = prediction.ranked().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["paper", "rock", "scissors"]);
    }

    #[test]
    fn format_probabilities() {
        let prediction = Prediction::from_probabilities([("rock", 0.123456), ("paper", 0.876544)])
            .unwrap();
        assert_eq!(
            prediction.format_probabilities(),
            "paper : 87.654%\nrock : 12.346%"
        );

        let prediction = Prediction::from_probabilities([("scissors", 1.0)]).unwrap();
        assert_eq!(prediction.format_probabilities(), "scissors : 100.0%");
    }

    #[test]
    fn predict_region() {
        let mut predictor = GesturePredictor::new(
            FixedClassifier::new(rps()),
            &PipelineConfig::default(),
        );
        let image = gradient_image(200, 100);
        let prediction = predictor
            .predict(&image, Rect::from_top_left(10.0, 10.0, 50.0, 50.0))
            .unwrap();
        assert_eq!(prediction.label, "paper");
    }

    #[test]
    fn classifier_sees_preprocessed_input() {
        let config = PipelineConfig::default();
        let mut predictor = GesturePredictor::new(
            |input: &PixelBuffer| -> anyhow::Result<Prediction> {
                assert_eq!(input.width().min(input.height()), 299);
                Ok(Prediction::new("rock", HashMap::new()))
            },
            &config,
        );
        let image = gradient_image(64, 48);
        assert!(predictor.predict(&image, image.rect()).is_some());
    }

    #[test]
    fn failures_yield_none() {
        let mut predictor = GesturePredictor::new(FailingClassifier, &PipelineConfig::default());
        let image = gradient_image(64, 64);
        assert_eq!(predictor.predict(&image, image.rect()), None);

        let mut predictor = GesturePredictor::new(
            FixedClassifier::new(rps()),
            &PipelineConfig::default(),
        );
        assert_eq!(
            predictor.predict(&image, Rect::from_top_left(500.0, 500.0, 10.0, 10.0)),
            None
        );
    }
}
