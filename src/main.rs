//! Runs landmark filtering, hand rectangle computation and preprocessing on a single image.
//!
//! Usage:
//!   handpose --image hand.jpg --landmarks hand.txt
//!   handpose --image hand.jpg --landmarks hand.txt --out input.png --format argb32

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use handpose::config::{MaskMode, PixelFormat, PreprocessOrder};
use handpose::coords::{FrameSpace, PointConverter};
use handpose::hand::detection::HandDetector;
use handpose::image::Image;
use handpose::preprocess::Preprocessor;
use handpose::replay::{load_observation, StaticDetector};
use handpose::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "handpose", version, about = "Hand region extraction and preprocessing")]
struct Args {
    /// Input image (JPEG or PNG)
    #[arg(long)]
    image: PathBuf,

    /// Landmark file, one `joint x y confidence` line per joint
    #[arg(long)]
    landmarks: PathBuf,

    /// Write the classifier input to this image file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Preprocessing order: `mask-first` or `grayscale-first`
    #[arg(long)]
    order: Option<PreprocessOrder>,

    /// Classifier pixel format: `gray8` or `argb32`
    #[arg(long)]
    format: Option<PixelFormat>,

    /// How to restrict the image to the hand: `crop` or `clear`
    #[arg(long)]
    mask_mode: Option<MaskMode>,

    /// Minimum landmark confidence (exclusive)
    #[arg(long)]
    threshold: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    handpose::init_logger!();

    let args = Args::parse();
    let mut config = PipelineConfig::from_env()?;
    if let Some(order) = args.order {
        config.order = order;
    }
    if let Some(format) = args.format {
        config.pixel_format = format;
    }
    if let Some(mask_mode) = args.mask_mode {
        config.mask_mode = mask_mode;
    }
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    config.validate()?;

    let image = Image::load(&args.image)?;
    let observation = load_observation(&args.landmarks)?;
    log::debug!(
        "loaded {:?} and {} landmarks",
        image,
        observation.len()
    );

    let mut detector = HandDetector::new(StaticDetector::new(observation), &config)?;
    let landmarks = match detector.detect(&image) {
        Some(landmarks) => landmarks,
        None => {
            println!("no hand detected");
            return Ok(());
        }
    };

    let points = FrameSpace::new(image.resolution()).convert_all(landmarks.positions());
    let rect = detector.hand_rect(&points);
    println!(
        "hand rect: [{}, {}, {}, {}]",
        rect.x(),
        rect.y(),
        rect.width(),
        rect.height()
    );

    let input = Preprocessor::new(&config)
        .process(&image, rect)
        .context("hand region lies outside of the image")?;
    println!("classifier input: {:?}", input);

    if let Some(out) = &args.out {
        input.to_image().save(out)?;
        log::info!("wrote classifier input to '{}'", out.display());
    }

    Ok(())
}
