//! Hand landmarks: the 21 joints reported by a hand pose detector, and the confidence filter that
//! turns a raw detector observation into a usable point set.

use std::{fmt, str::FromStr};

use crate::coords::{flip_y, Point};
use crate::iter::zip_exact;

/// Number of landmarks of a hand.
pub const NUM_LANDMARKS: usize = 21;

/// Default minimum confidence a landmark must *exceed* to be accepted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Names for the hand pose landmarks, in the order they are stored in [`HandLandmarks`].
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MP** / **MCP**: [Metacarpophalangeal joint], the joint forming the knuckles.
/// - **IP**: the interphalangeal joint of the thumb.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: placed on the tip of the finger, above the DIP (or IP, for the thumb).
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    ThumbTip,
    ThumbIp,
    ThumbMp,
    ThumbCmc,
    IndexTip,
    IndexDip,
    IndexPip,
    IndexMcp,
    MiddleTip,
    MiddleDip,
    MiddlePip,
    MiddleMcp,
    RingTip,
    RingDip,
    RingPip,
    RingMcp,
    LittleTip,
    LittleDip,
    LittlePip,
    LittleMcp,
    Wrist,
}

impl Joint {
    /// All joints, in storage order.
    pub const ALL: [Joint; NUM_LANDMARKS] = {
        use Joint::*;
        [
            ThumbTip, ThumbIp, ThumbMp, ThumbCmc, //
            IndexTip, IndexDip, IndexPip, IndexMcp, //
            MiddleTip, MiddleDip, MiddlePip, MiddleMcp, //
            RingTip, RingDip, RingPip, RingMcp, //
            LittleTip, LittleDip, LittlePip, LittleMcp, //
            Wrist,
        ]
    };

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the snake case name of this joint, as used in landmark files.
    pub fn name(self) -> &'static str {
        use Joint::*;
        match self {
            ThumbTip => "thumb_tip",
            ThumbIp => "thumb_ip",
            ThumbMp => "thumb_mp",
            ThumbCmc => "thumb_cmc",
            IndexTip => "index_tip",
            IndexDip => "index_dip",
            IndexPip => "index_pip",
            IndexMcp => "index_mcp",
            MiddleTip => "middle_tip",
            MiddleDip => "middle_dip",
            MiddlePip => "middle_pip",
            MiddleMcp => "middle_mcp",
            RingTip => "ring_tip",
            RingDip => "ring_dip",
            RingPip => "ring_pip",
            RingMcp => "ring_mcp",
            LittleTip => "little_tip",
            LittleDip => "little_dip",
            LittlePip => "little_pip",
            LittleMcp => "little_mcp",
            Wrist => "wrist",
        }
    }

    /// Returns the hand region this joint belongs to.
    pub fn region(self) -> Region {
        match self.index() {
            0..=3 => Region::Thumb,
            4..=7 => Region::IndexFinger,
            8..=11 => Region::MiddleFinger,
            12..=15 => Region::RingFinger,
            16..=19 => Region::LittleFinger,
            _ => Region::Wrist,
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Joint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Joint::ALL
            .into_iter()
            .find(|joint| joint.name() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown hand joint '{}'", s))
    }
}

/// Groups of joints, one per finger plus the wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Thumb,
    IndexFinger,
    MiddleFinger,
    RingFinger,
    LittleFinger,
    Wrist,
}

/// A single landmark as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizedPoint {
    /// Normalized position, origin in the bottom left corner.
    pub location: Point,
    /// Detector confidence in `0.0..=1.0`.
    pub confidence: f32,
}

impl RecognizedPoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            location: Point::new(x, y),
            confidence,
        }
    }
}

/// Raw output of a hand pose detector for a single hand.
///
/// Any of the joints may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandObservation {
    points: [Option<RecognizedPoint>; NUM_LANDMARKS],
}

impl HandObservation {
    /// Creates an observation without any recognized points.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, joint: Joint, point: RecognizedPoint) {
        self.points[joint.index()] = Some(point);
    }

    pub fn with_point(mut self, joint: Joint, point: RecognizedPoint) -> Self {
        self.set(joint, point);
        self
    }

    pub fn remove(&mut self, joint: Joint) -> Option<RecognizedPoint> {
        self.points[joint.index()].take()
    }

    pub fn get(&self, joint: Joint) -> Option<RecognizedPoint> {
        self.points[joint.index()]
    }

    /// Returns the number of recognized joints.
    pub fn len(&self) -> usize {
        self.points.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the recognized points of one region of the hand.
    pub fn recognized_points(
        &self,
        region: Region,
    ) -> impl Iterator<Item = (Joint, RecognizedPoint)> + '_ {
        zip_exact(Joint::ALL, &self.points)
            .filter(move |(joint, _)| joint.region() == region)
            .filter_map(|(joint, point)| point.map(|p| (joint, p)))
    }
}

/// The 21 accepted landmarks of a hand, in normalized device space (origin in the top left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    positions: [Point; NUM_LANDMARKS],
}

impl HandLandmarks {
    /// Creates a landmark set from device space positions, in [`Joint::ALL`] order.
    pub fn new(positions: [Point; NUM_LANDMARKS]) -> Self {
        Self { positions }
    }

    pub fn get(&self, joint: Joint) -> Point {
        self.positions[joint.index()]
    }

    pub fn positions(&self) -> &[Point; NUM_LANDMARKS] {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, Point)> + '_ {
        zip_exact(Joint::ALL, self.positions.iter().copied())
    }

    /// Applies `f` to every position, for example to move the landmarks into another space.
    pub fn map_positions(&self, f: impl FnMut(Point) -> Point) -> Self {
        Self {
            positions: self.positions.map(f),
        }
    }
}

/// All-or-nothing confidence filter for [`HandObservation`]s.
#[derive(Debug, Clone, Copy)]
pub struct LandmarkFilter {
    threshold: f32,
}

impl Default for LandmarkFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl LandmarkFilter {
    /// Creates a filter that accepts landmarks with a confidence strictly above `threshold`.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Extracts the 21 landmarks from `observation`.
    ///
    /// Returns `None` if any joint is missing, if any joint's confidence does not exceed the
    /// threshold, or if any location lies outside of the normalized `0.0..=1.0` range. Accepted
    /// positions are converted to device space.
    pub fn extract(&self, observation: &HandObservation) -> Option<HandLandmarks> {
        let mut positions = [Point::origin(); NUM_LANDMARKS];
        for (joint, out) in zip_exact(Joint::ALL, &mut positions) {
            let point = match observation.get(joint) {
                Some(point) => point,
                None => {
                    log::trace!("landmark {} missing", joint);
                    return None;
                }
            };
            if !(point.confidence > self.threshold) {
                log::trace!(
                    "landmark {} confidence {} <= {}",
                    joint,
                    point.confidence,
                    self.threshold
                );
                return None;
            }
            let normalized = 0.0..=1.0;
            if !normalized.contains(&point.location.x) || !normalized.contains(&point.location.y) {
                log::trace!("landmark {} outside of the image at {:?}", joint, point.location);
                return None;
            }
            *out = flip_y(point.location);
        }

        Some(HandLandmarks { positions })
    }
}
