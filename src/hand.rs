//! Hand detection and gesture classification.
//!
//! Both the landmark detector and the gesture classifier are external components. This module
//! defines the traits they are consumed through ([`detection::HandPoseDetector`] and
//! [`classification::Classifier`]) and the wrappers that add filtering, preprocessing and logging
//! around them.

pub mod classification;
pub mod detection;
