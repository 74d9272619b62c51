//! Recorded hand observations.
//!
//! Observations can be stored as text, one landmark per line:
//!
//! ```text
//! # joint x y confidence
//! thumb_tip 0.52 0.61 0.93
//! wrist 0.48 0.12 0.99
//! ```
//!
//! Coordinates are normalized, with the origin in the bottom left corner. Empty lines and lines
//! starting with `#` are ignored.

use std::{collections::VecDeque, path::Path};

use anyhow::{bail, Context};

use crate::hand::detection::HandPoseDetector;
use crate::image::Image;
use crate::landmark::{HandObservation, Joint, RecognizedPoint};

/// Parses an observation from its text form.
pub fn parse_observation(text: &str) -> anyhow::Result<HandObservation> {
    let mut observation = HandObservation::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        parse_line(line, &mut observation).with_context(|| format!("line {}", i + 1))?;
    }
    Ok(observation)
}

fn parse_line(line: &str, observation: &mut HandObservation) -> anyhow::Result<()> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [joint, x, y, confidence] = fields[..] else {
        bail!(
            "expected 'joint x y confidence', got {} fields",
            fields.len()
        );
    };

    let joint: Joint = joint.parse()?;
    if observation.get(joint).is_some() {
        bail!("duplicate joint '{}'", joint);
    }
    let x: f32 = x.parse().context("invalid x coordinate")?;
    let y: f32 = y.parse().context("invalid y coordinate")?;
    let confidence: f32 = confidence.parse().context("invalid confidence")?;
    observation.set(joint, RecognizedPoint::new(x, y, confidence));
    Ok(())
}

/// Loads an observation from a text file.
pub fn load_observation<P: AsRef<Path>>(path: P) -> anyhow::Result<HandObservation> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    parse_observation(&text).with_context(|| format!("invalid landmark file '{}'", path.display()))
}

/// A [`HandPoseDetector`] that reports the same observation for every image.
#[derive(Debug, Clone)]
pub struct StaticDetector {
    observation: HandObservation,
}

impl StaticDetector {
    pub fn new(observation: HandObservation) -> Self {
        Self { observation }
    }
}

impl HandPoseDetector for StaticDetector {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Option<HandObservation>> {
        Ok(Some(self.observation.clone()))
    }
}

/// A [`HandPoseDetector`] that replays a recorded sequence, one entry per image.
///
/// `None` entries replay frames without a hand. Once the sequence is exhausted, no more hands are
/// reported.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    observations: VecDeque<Option<HandObservation>>,
}

impl ReplayDetector {
    pub fn new<I: IntoIterator<Item = Option<HandObservation>>>(observations: I) -> Self {
        Self {
            observations: observations.into_iter().collect(),
        }
    }

    /// Returns the number of recorded frames left.
    pub fn remaining(&self) -> usize {
        self.observations.len()
    }
}

impl HandPoseDetector for ReplayDetector {
    fn detect(&mut self, _image: &Image) -> anyhow::Result<Option<HandObservation>> {
        Ok(self.observations.pop_front().flatten())
    }
}
