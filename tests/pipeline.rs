use std::collections::HashMap;

use approx::assert_relative_eq;
use handpose::coords::{FrameSpace, PointConverter};
use handpose::hand::classification::Prediction;
use handpose::hand::detection::HandDetector;
use handpose::image::{Color, Image};
use handpose::landmark::{HandObservation, Joint, RecognizedPoint};
use handpose::pipeline::{FrameOutcome, Overlay, Pipeline};
use handpose::preprocess::PixelBuffer;
use handpose::rect::Rect;
use handpose::replay::{load_observation, StaticDetector};
use handpose::session::{CaptureEvent, CaptureSource, Display, Session, SessionStats};
use handpose::PipelineConfig;

fn open_hand() -> HandObservation {
    load_observation(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/data/open_hand.txt"
    ))
    .unwrap()
}

fn frame() -> Image {
    let mut image = Image::new(640, 480);
    image.clear(Color::from_rgb8(200, 170, 150));
    image
}

fn rock_paper_scissors(input: &PixelBuffer) -> anyhow::Result<Prediction> {
    anyhow::ensure!(input.width().min(input.height()) == 299);
    Ok(Prediction::from_probabilities([
        ("rock", 0.7),
        ("paper", 0.2),
        ("scissors", 0.1),
    ])
    .unwrap())
}

fn assert_rect_eq(actual: Rect, expected: Rect) {
    assert_relative_eq!(actual.x(), expected.x(), epsilon = 1e-3);
    assert_relative_eq!(actual.y(), expected.y(), epsilon = 1e-3);
    assert_relative_eq!(actual.width(), expected.width(), epsilon = 1e-3);
    assert_relative_eq!(actual.height(), expected.height(), epsilon = 1e-3);
}

// Landmark extent in device space is x 0.30..0.66, y 0.25..0.80; on a 640x480 frame that is
// x 192..422.4, y 120..384.
const EXPECTED_FRAME_RECT: [f32; 4] = [172.0, 100.0, 270.4, 304.0];

fn expected_frame_rect() -> Rect {
    let [x, y, w, h] = EXPECTED_FRAME_RECT;
    Rect::from_top_left(x, y, w, h)
}

#[test]
fn landmarks_to_rect() {
    let image = frame();
    let config = PipelineConfig::default();
    let mut detector = HandDetector::new(StaticDetector::new(open_hand()), &config).unwrap();
    let landmarks = detector.detect(&image).unwrap();

    let wrist = landmarks.get(Joint::Wrist);
    assert_relative_eq!(wrist.x, 0.5, epsilon = 1e-6);
    assert_relative_eq!(wrist.y, 0.8, epsilon = 1e-6);

    let points = FrameSpace::new(image.resolution()).convert_all(landmarks.positions());
    assert_rect_eq(detector.hand_rect(&points), expected_frame_rect());
}

#[test]
fn single_weak_landmark_rejects_hand() {
    let mut observation = open_hand();
    let tip = observation.get(Joint::LittleTip).unwrap();
    observation.set(
        Joint::LittleTip,
        RecognizedPoint {
            confidence: 0.3,
            ..tip
        },
    );

    let mut pipeline = Pipeline::new(
        StaticDetector::new(observation),
        rock_paper_scissors,
        PipelineConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        pipeline.process_frame(&frame()),
        FrameOutcome::NoHand
    ));
}

#[test]
fn out_of_range_landmarks_reject_hand() {
    let mut observation = open_hand();
    let tip = observation.get(Joint::IndexTip).unwrap();
    observation.set(Joint::IndexTip, RecognizedPoint::new(1e38, tip.location.y, 0.95));

    let mut pipeline = Pipeline::new(
        StaticDetector::new(observation),
        rock_paper_scissors,
        PipelineConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        pipeline.process_frame(&frame()),
        FrameOutcome::NoHand
    ));
}

#[test]
fn frame_is_classified() {
    let mut pipeline = Pipeline::new(
        StaticDetector::new(open_hand()),
        rock_paper_scissors,
        PipelineConfig::default(),
    )
    .unwrap();
    let outcome = pipeline.process_frame(&frame());
    let hand = outcome.hand().unwrap();
    assert_rect_eq(hand.region.rect, expected_frame_rect());
    assert_eq!(outcome.prediction().unwrap().label, "rock");
}

struct Events(Vec<CaptureEvent>);

impl CaptureSource for Events {
    fn start(&mut self) -> anyhow::Result<()> {
        self.0.reverse();
        Ok(())
    }

    fn next_event(&mut self) -> anyhow::Result<Option<CaptureEvent>> {
        Ok(self.0.pop())
    }

    fn stop(&mut self) {}
}

#[derive(Default)]
struct Screen {
    overlay: Option<Overlay>,
    label: Option<String>,
    probabilities: Option<String>,
}

impl Display for Screen {
    fn show_overlay(&mut self, overlay: &Overlay) {
        self.overlay = Some(overlay.clone());
    }

    fn show_label(&mut self, label: Option<&str>) {
        self.label = label.map(String::from);
    }

    fn show_probabilities(&mut self, text: &str) {
        self.probabilities = Some(text.to_string());
    }

    fn show_error(&mut self, error: &anyhow::Error) {
        panic!("unexpected error: {:#}", error);
    }
}

fn encode_photo(width: u32, height: u32) -> Vec<u8> {
    let photo = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 170, 150, 255]));
    let mut data = Vec::new();
    image::DynamicImage::ImageRgba8(photo)
        .write_to(
            &mut std::io::Cursor::new(&mut data),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    data
}

#[test]
fn photo_after_frame() {
    let pipeline = Pipeline::new(
        StaticDetector::new(open_hand()),
        |input: &PixelBuffer| -> anyhow::Result<Prediction> {
            let mut probabilities = HashMap::new();
            probabilities.insert("scissors".to_string(), 0.6);
            probabilities.insert("paper".to_string(), 0.4);
            let label = if input.width() > input.height() {
                "paper"
            } else {
                "scissors"
            };
            Ok(Prediction::new(label, probabilities))
        },
        PipelineConfig::default(),
    )
    .unwrap();

    // The frame fills the empty queue, and the photo waits for it to be processed.
    let mut source = Events(vec![
        CaptureEvent::Frame(frame()),
        CaptureEvent::Photo(encode_photo(1280, 960)),
    ]);
    let mut screen = Screen::default();
    let stats = Session::new(pipeline).run(&mut source, &mut screen).unwrap();

    assert_eq!(
        stats,
        SessionStats {
            frames: 1,
            dropped: 0,
            photos: 1,
        }
    );
    let overlay = screen.overlay.unwrap();
    assert_eq!(overlay.points.len(), 21);
    // The hand region is taller than wide.
    assert_eq!(screen.label.as_deref(), Some("scissors"));
    assert_eq!(
        screen.probabilities.as_deref(),
        Some("scissors : 60.0%\npaper : 40.0%")
    );
}
