//! The capture session: feeds camera frames and photos through a [`Pipeline`] on a background
//! thread and routes the results to a [`Display`].

use crossbeam::channel::{Receiver, Sender};

use crate::image::Image;
use crate::pipeline::{FrameOutcome, HandRegion, Overlay, Pipeline};
use crate::timer::{FpsCounter, Timer};
use crate::worker::Worker;

/// An event produced by a [`CaptureSource`].
#[derive(Debug)]
pub enum CaptureEvent {
    /// A live video frame.
    Frame(Image),
    /// An encoded (JPEG or PNG) still photo.
    Photo(Vec<u8>),
}

/// A camera, or anything else producing frames and photos.
pub trait CaptureSource {
    /// Starts capturing. Called once before the first [`CaptureSource::next_event`].
    fn start(&mut self) -> anyhow::Result<()>;

    /// Blocks until the next event is available. Returns `Ok(None)` when the source is exhausted.
    fn next_event(&mut self) -> anyhow::Result<Option<CaptureEvent>>;

    fn stop(&mut self);
}

/// The user-facing surface that shows results.
///
/// All methods are called on the thread running [`Session::run`].
pub trait Display {
    fn show_overlay(&mut self, overlay: &Overlay);
    fn show_label(&mut self, label: Option<&str>);
    fn show_probabilities(&mut self, text: &str);
    fn show_error(&mut self, error: &anyhow::Error);
}

enum DisplayUpdate {
    Overlay(Overlay),
    Label(Option<String>),
    Probabilities(String),
}

impl DisplayUpdate {
    fn apply<D: Display + ?Sized>(self, display: &mut D) {
        match self {
            DisplayUpdate::Overlay(overlay) => display.show_overlay(&overlay),
            DisplayUpdate::Label(label) => display.show_label(label.as_deref()),
            DisplayUpdate::Probabilities(text) => display.show_probabilities(&text),
        }
    }
}

/// Counters collected by [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames produced by the source.
    pub frames: u64,
    /// Frames dropped because the worker was still busy.
    pub dropped: u64,
    /// Photos produced by the source.
    pub photos: u64,
}

/// Connects a [`CaptureSource`] to a [`Pipeline`] and a [`Display`].
pub struct Session {
    pipeline: Pipeline,
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Runs the session until `source` is exhausted or fails.
    ///
    /// Frames are processed one at a time on a background thread. While a frame is waiting to be
    /// processed, further frames are dropped. Photos are never dropped; they are classified using
    /// the hand region of the most recent frame that contained a hand, and ignored if there was
    /// none. Once the source is exhausted, pending work is finished before this returns.
    pub fn run<S, D>(self, source: &mut S, display: &mut D) -> anyhow::Result<SessionStats>
    where
        S: CaptureSource + ?Sized,
        D: Display + ?Sized,
    {
        if let Err(e) = source.start() {
            display.show_error(&e);
            return Err(e.context("failed to start capture session"));
        }

        let (updates, update_recv) = crossbeam::channel::unbounded();
        let mut handler = FrameHandler {
            pipeline: self.pipeline,
            updates,
            latest_region: None,
            fps: FpsCounter::new("hand pose"),
        };
        // A single slot: one frame may wait while another is processed, the rest are dropped.
        let mut worker = Worker::builder()
            .name("hand pose")
            .capacity(1)
            .spawn(move |event: CaptureEvent| handler.handle(event))?;

        let mut stats = SessionStats::default();
        let result = loop {
            let event = match source.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e.context("capture failed")),
            };

            match event {
                CaptureEvent::Frame(frame) => {
                    stats.frames += 1;
                    if worker.try_send(CaptureEvent::Frame(frame)).is_err() {
                        stats.dropped += 1;
                        log::trace!("worker busy, dropping frame");
                    }
                }
                CaptureEvent::Photo(data) => {
                    stats.photos += 1;
                    worker.send(CaptureEvent::Photo(data));
                }
            }

            apply_updates(&update_recv, display);
        };

        source.stop();
        drop(worker);
        apply_updates(&update_recv, display);

        log::debug!("session finished: {:?}", stats);
        result.map(|()| stats)
    }
}

fn apply_updates<D: Display + ?Sized>(recv: &Receiver<DisplayUpdate>, display: &mut D) {
    for update in recv.try_iter() {
        update.apply(display);
    }
}

/// State owned by the worker thread.
struct FrameHandler {
    pipeline: Pipeline,
    updates: Sender<DisplayUpdate>,
    latest_region: Option<HandRegion>,
    fps: FpsCounter,
}

impl FrameHandler {
    fn handle(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Frame(frame) => self.handle_frame(&frame),
            CaptureEvent::Photo(data) => self.handle_photo(&data),
        }
    }

    fn handle_frame(&mut self, frame: &Image) {
        let outcome = self.pipeline.process_frame(frame);
        self.send(DisplayUpdate::Overlay(outcome.overlay()));
        match &outcome {
            FrameOutcome::NoHand => self.send(DisplayUpdate::Label(None)),
            FrameOutcome::Hand(hand) => {
                self.latest_region = Some(hand.region);
                match &hand.prediction {
                    Some(prediction) => {
                        self.send(DisplayUpdate::Label(Some(prediction.label.clone())))
                    }
                    // Preprocessing or classification failed.
                    None if self.pipeline.config().classify_frames => {
                        self.send(DisplayUpdate::Label(None))
                    }
                    None => {}
                }
            }
        }

        let timers: Vec<&Timer> = self.pipeline.timers().collect();
        self.fps.tick_with(&timers);
    }

    fn handle_photo(&mut self, data: &[u8]) {
        let region = match self.latest_region {
            Some(region) => region,
            None => {
                log::debug!("no hand seen yet, ignoring photo");
                return;
            }
        };
        let photo = match Image::decode(data) {
            Ok(photo) => photo,
            Err(e) => {
                log::debug!("ignoring photo: {:#}", e);
                return;
            }
        };

        if let Some(prediction) = self.pipeline.process_photo(&photo, region) {
            self.send(DisplayUpdate::Label(Some(prediction.label.clone())));
            self.send(DisplayUpdate::Probabilities(
                prediction.format_probabilities(),
            ));
        }
    }

    fn send(&self, update: DisplayUpdate) {
        // The receiver outlives the worker; a failure means the session is already gone.
        self.updates.send(update).ok();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crossbeam::channel::{bounded, unbounded};

    use super::*;
    use crate::config::PipelineConfig;
    use crate::hand::classification::{Classifier, Prediction};
    use crate::hand::detection::HandPoseDetector;
    use crate::preprocess::PixelBuffer;
    use crate::landmark::HandObservation;
    use crate::replay::ReplayDetector;
    use crate::test::{encode_png, gradient_image, hand_observation, rps, FixedClassifier};

    enum Step {
        Event(CaptureEvent),
        Wait(Receiver<()>),
        Notify(Sender<()>),
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
        fail_start: bool,
        stopped: bool,
    }

    impl ScriptedSource {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                fail_start: false,
                stopped: false,
            }
        }
    }

    impl CaptureSource for ScriptedSource {
        fn start(&mut self) -> anyhow::Result<()> {
            if self.fail_start {
                anyhow::bail!("camera permission denied");
            }
            Ok(())
        }

        fn next_event(&mut self) -> anyhow::Result<Option<CaptureEvent>> {
            while let Some(step) = self.steps.pop_front() {
                match step {
                    Step::Event(event) => return Ok(Some(event)),
                    Step::Wait(recv) => recv.recv().unwrap(),
                    Step::Notify(send) => send.send(()).unwrap(),
                }
            }
            Ok(None)
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        overlays: Vec<Overlay>,
        labels: Vec<Option<String>>,
        probabilities: Vec<String>,
        errors: Vec<String>,
    }

    impl Display for RecordingDisplay {
        fn show_overlay(&mut self, overlay: &Overlay) {
            self.overlays.push(overlay.clone());
        }

        fn show_label(&mut self, label: Option<&str>) {
            self.labels.push(label.map(str::to_string));
        }

        fn show_probabilities(&mut self, text: &str) {
            self.probabilities.push(text.to_string());
        }

        fn show_error(&mut self, error: &anyhow::Error) {
            self.errors.push(error.to_string());
        }
    }

    /// A pipeline whose detector signals `processed` after every call.
    fn signalling_pipeline(
        observations: Vec<Option<HandObservation>>,
        processed: Sender<()>,
    ) -> Pipeline {
        signalling_pipeline_with(observations, processed, FixedClassifier::new(rps()))
    }

    fn signalling_pipeline_with<C: Classifier + 'static>(
        observations: Vec<Option<HandObservation>>,
        processed: Sender<()>,
        classifier: C,
    ) -> Pipeline {
        let mut replay = ReplayDetector::new(observations);
        Pipeline::new(
            move |image: &Image| -> anyhow::Result<Option<HandObservation>> {
                let result = replay.detect(image);
                processed.send(()).unwrap();
                result
            },
            classifier,
            PipelineConfig::default(),
        )
        .unwrap()
    }

    fn frame() -> CaptureEvent {
        CaptureEvent::Frame(gradient_image(64, 48))
    }

    #[test]
    fn start_failure_is_shown() {
        let mut source = ScriptedSource::new([]);
        source.fail_start = true;
        let mut display = RecordingDisplay::default();
        let (processed, _) = unbounded();
        let session = Session::new(signalling_pipeline(vec![], processed));

        let err = session.run(&mut source, &mut display).unwrap_err();
        assert_eq!(display.errors, ["camera permission denied"]);
        assert!(format!("{:#}", err).contains("camera permission denied"));
        assert!(!source.stopped);
    }

    #[test]
    fn frames_update_display() {
        let (processed, processed_recv) = unbounded();
        let mut source = ScriptedSource::new([
            Step::Event(frame()),
            Step::Wait(processed_recv.clone()),
            Step::Event(frame()),
            Step::Wait(processed_recv),
        ]);
        let mut display = RecordingDisplay::default();
        let session = Session::new(signalling_pipeline(
            vec![Some(hand_observation(0.9)), None],
            processed,
        ));

        let stats = session.run(&mut source, &mut display).unwrap();
        assert_eq!(
            stats,
            SessionStats {
                frames: 2,
                dropped: 0,
                photos: 0
            }
        );
        assert!(source.stopped);

        assert_eq!(display.overlays.len(), 2);
        assert_eq!(display.overlays[0].points.len(), 21);
        assert!(display.overlays[1].is_cleared());
        assert_eq!(display.labels, [Some("paper".to_string()), None]);
        assert!(display.errors.is_empty());
    }

    #[test]
    fn failed_classification_clears_label() {
        let (processed, processed_recv) = unbounded();
        let mut source = ScriptedSource::new([
            Step::Event(frame()),
            Step::Wait(processed_recv.clone()),
            Step::Event(frame()),
            Step::Wait(processed_recv),
        ]);
        let mut display = RecordingDisplay::default();
        let mut calls = 0;
        let classifier = move |_: &PixelBuffer| -> anyhow::Result<Prediction> {
            calls += 1;
            if calls > 1 {
                anyhow::bail!("model evaluation failed");
            }
            Ok(rps())
        };
        let session = Session::new(signalling_pipeline_with(
            vec![Some(hand_observation(0.9)), Some(hand_observation(0.9))],
            processed,
            classifier,
        ));

        session.run(&mut source, &mut display).unwrap();
        assert_eq!(display.overlays.len(), 2);
        assert_eq!(display.overlays[1].points.len(), 21);
        assert_eq!(display.labels, [Some("paper".to_string()), None]);
    }

    #[test]
    fn busy_worker_drops_frames() {
        let (entered, entered_recv) = bounded(0);
        let (release, release_recv) = bounded(0);
        let mut first = true;
        let pipeline = Pipeline::new(
            move |_: &Image| -> anyhow::Result<Option<HandObservation>> {
                if first {
                    first = false;
                    entered.send(()).unwrap();
                    release_recv.recv().unwrap();
                }
                Ok(None)
            },
            FixedClassifier::new(rps()),
            PipelineConfig::default(),
        )
        .unwrap();

        let mut source = ScriptedSource::new([
            Step::Event(frame()),
            Step::Wait(entered_recv),
            // Queued while the first frame is processed.
            Step::Event(frame()),
            // Dropped.
            Step::Event(frame()),
            Step::Notify(release),
        ]);
        let mut display = RecordingDisplay::default();
        let stats = Session::new(pipeline)
            .run(&mut source, &mut display)
            .unwrap();

        assert_eq!(
            stats,
            SessionStats {
                frames: 3,
                dropped: 1,
                photos: 0
            }
        );
        assert_eq!(display.overlays.len(), 2);
    }

    #[test]
    fn photo_uses_latest_region() {
        let (processed, processed_recv) = unbounded();
        let photo = encode_png(&gradient_image(128, 96));
        let mut source = ScriptedSource::new([
            Step::Event(frame()),
            Step::Wait(processed_recv.clone()),
            // No hand: the region of the first frame is kept.
            Step::Event(frame()),
            Step::Wait(processed_recv),
            Step::Event(CaptureEvent::Photo(photo)),
        ]);
        let mut display = RecordingDisplay::default();
        let session = Session::new(signalling_pipeline(
            vec![Some(hand_observation(0.9)), None],
            processed,
        ));

        let stats = session.run(&mut source, &mut display).unwrap();
        assert_eq!(stats.photos, 1);
        assert_eq!(
            display.labels,
            [Some("paper".to_string()), None, Some("paper".to_string())]
        );
        assert_eq!(display.probabilities.len(), 1);
        assert!(display.probabilities[0].starts_with("paper : 85.0%"));
    }

    #[test]
    fn photo_without_region_is_ignored() {
        let photo = encode_png(&gradient_image(32, 32));
        let mut source = ScriptedSource::new([
            Step::Event(CaptureEvent::Photo(photo)),
            Step::Event(CaptureEvent::Photo(b"garbage".to_vec())),
        ]);
        let mut display = RecordingDisplay::default();
        let (processed, _recv) = unbounded();
        let session = Session::new(signalling_pipeline(vec![], processed));

        let stats = session.run(&mut source, &mut display).unwrap();
        assert_eq!(stats.photos, 2);
        assert!(display.labels.is_empty());
        assert!(display.probabilities.is_empty());
    }
}
