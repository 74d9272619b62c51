//! Hand pose gesture recognition glue.
//!
//! This crate connects an external hand landmark detector and an external image classifier. The
//! logic it owns is small: extracting and confidence-filtering the 21 hand landmarks, computing a
//! padded bounding rectangle around them, converting between coordinate spaces, and preprocessing
//! the hand region into the fixed-size input expected by a gesture classifier.
//!
//! # Coordinate Spaces
//!
//! * *Detector space*: normalized to `0.0..=1.0`, origin in the bottom left corner. Landmark
//!   detectors report [`RecognizedPoint`]s in this space.
//! * *Device space*: normalized to `0.0..=1.0`, origin in the top left corner. [`HandLandmarks`]
//!   are stored in this space.
//! * *Display space*: points of the preview surface showing the camera feed. See
//!   [`coords::PreviewLayer`].
//! * *Frame space*: pixel coordinates of the captured image. See [`coords::FrameSpace`].
//!
//! # Environment Variables
//!
//! [`PipelineConfig::from_env`] reads the following variables, all of them optional:
//!
//! * `HANDPOSE_CONFIDENCE_THRESHOLD`: minimum landmark confidence (exclusive), default `0.3`.
//! * `HANDPOSE_RECT_MARGIN`: padding added around the landmark extent, default `20`.
//! * `HANDPOSE_INPUT_SIZE`: length of the shorter side of the classifier input, default `299`.
//! * `HANDPOSE_PREPROCESS_ORDER`: `mask-first` (default) or `grayscale-first`.
//! * `HANDPOSE_MASK_MODE`: `crop` (default) or `clear`.
//! * `HANDPOSE_PIXEL_FORMAT`: `gray8` (default) or `argb32`.
//! * `HANDPOSE_MIRROR_PHOTOS`: `true` to mirror still photos before cropping.
//! * `HANDPOSE_CLASSIFY_FRAMES`: `false` to only classify still photos.
//!
//! [`RecognizedPoint`]: landmark::RecognizedPoint
//! [`HandLandmarks`]: landmark::HandLandmarks

use log::LevelFilter;

pub mod config;
pub mod coords;
pub mod drop;
pub mod hand;
pub mod image;
pub mod iter;
pub mod landmark;
pub mod num;
pub mod pipeline;
pub mod preprocess;
pub mod rect;
pub mod replay;
pub mod resolution;
pub mod session;
pub mod timer;
pub mod worker;


pub use config::PipelineConfig;
pub use coords::Point;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this crate will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` can override both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
