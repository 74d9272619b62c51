//! Throughput measurement for the pipeline stages.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

/// Measures how long a pipeline stage takes, averaged over all runs since it was last displayed.
///
/// Displaying the timer with `{}` prints the average and starts a new measurement window.
pub struct Timer {
    name: &'static str,
    runs: Cell<u32>,
    total: Cell<Duration>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            runs: Cell::new(0),
            total: Cell::new(Duration::ZERO),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes `stage`, recording the time it takes.
    pub fn time<T>(&mut self, stage: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        stage()
    }

    /// Starts timing a stage. The time is recorded when the returned guard is dropped.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the number of runs recorded in the current window.
    pub fn runs(&self) -> u32 {
        self.runs.get()
    }

    fn record(&mut self, duration: Duration) {
        self.runs.set(self.runs.get().saturating_add(1));
        self.total.set(self.total.get() + duration);
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let runs = self.runs.replace(0);
        let total = self.total.replace(Duration::ZERO);
        if runs == 0 {
            write!(f, "{}: -", self.name)
        } else {
            let avg_ms = total.as_secs_f32() * 1000.0 / runs as f32;
            write!(f, "{}: {runs}x{avg_ms:.01}ms", self.name)
        }
    }
}

/// Guard returned by [`Timer::start`].
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs the number of processed frames once per second, along with the given timers.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Counts a frame.
    pub fn tick(&mut self) {
        self.tick_with(&[]);
    }

    /// Counts a frame, and logs the frame rate together with `timers` if a second has passed.
    pub fn tick_with(&mut self, timers: &[&Timer]) {
        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            if timers.is_empty() {
                log::debug!("{}: {} FPS", self.name, self.frames);
            } else {
                let timers = timers
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                log::debug!("{}: {} FPS ({})", self.name, self.frames, timers);
            }

            self.frames = 0;
            self.start = Instant::now();
        }
    }
}
