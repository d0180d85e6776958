//! Progress reporting and cooperative cancellation shared by every stage.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Result, SubgenError};

/// Receives overall progress (0-100) and an optional status line.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64, status: Option<&str>);
}

impl<F> ProgressSink for F
where
    F: Fn(f64, Option<&str>) + Send + Sync,
{
    fn report(&self, percent: f64, status: Option<&str>) {
        self(percent, status)
    }
}

/// Sink that discards every report.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: f64, _status: Option<&str>) {}
}

/// Pipeline phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ExtractAudio,
    LoadModel,
    Transcribe,
    Translate,
    Synthesize,
    Mux,
    Cleanup,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::ExtractAudio => "extract_audio",
            Self::LoadModel => "load_model",
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
            Self::Synthesize => "synthesize",
            Self::Mux => "mux",
            Self::Cleanup => "cleanup",
        }
    }

    /// Status line shown when the stage starts.
    pub fn status(self) -> &'static str {
        match self {
            Self::ExtractAudio => "Extracting audio...",
            Self::LoadModel => "Loading Whisper model...",
            Self::Transcribe => "Transcribing...",
            Self::Translate => "Translating...",
            Self::Synthesize => "Building subtitle data...",
            Self::Mux => "Burning subtitles into video...",
            Self::Cleanup => "Cleaning up...",
        }
    }

    /// Slice of the 0-100 scale owned by this stage. Transcription gives up
    /// its last 10 points when a post-translation pass follows.
    pub fn span(self, post_translate: bool) -> StageSpan {
        match self {
            Self::ExtractAudio => StageSpan::new(0.0, 10.0),
            Self::LoadModel => StageSpan::new(10.0, 25.0),
            Self::Transcribe if post_translate => StageSpan::new(25.0, 60.0),
            Self::Transcribe => StageSpan::new(25.0, 70.0),
            Self::Translate => StageSpan::new(60.0, 70.0),
            Self::Synthesize => StageSpan::new(70.0, 80.0),
            Self::Mux => StageSpan::new(80.0, 95.0),
            Self::Cleanup => StageSpan::new(95.0, 100.0),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSpan {
    start: f64,
    end: f64,
}

impl StageSpan {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Linear interpolation; `fraction` is clamped to [0, 1].
    pub fn at(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.start + (self.end - self.start) * fraction
    }
}

/// Forwards reports to a sink, never letting the value go down or past 100.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: f64,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, last: 0.0 }
    }

    pub fn report(&mut self, percent: f64, status: Option<&str>) {
        let percent = if percent.is_nan() {
            self.last
        } else {
            percent.clamp(self.last, 100.0)
        };
        self.last = percent;

        if let Some(status) = status {
            info!(progress = percent, "{}", status);
        }
        self.sink.report(percent, status);
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    /// Bind a stage-local reporter to `span`.
    pub fn stage(&mut self, span: StageSpan) -> StageProgress<'_, 'a> {
        StageProgress { tracker: self, span }
    }
}

/// Stage-local view of the tracker: reports fractions of its own span.
pub struct StageProgress<'t, 'a> {
    tracker: &'t mut ProgressTracker<'a>,
    span: StageSpan,
}

impl StageProgress<'_, '_> {
    pub fn begin(&mut self, status: &str) {
        self.tracker.report(self.span.start, Some(status));
    }

    pub fn advance(&mut self, fraction: f64) {
        self.tracker.report(self.span.at(fraction), None);
    }

    /// Report `done` out of `total` items; an empty batch counts as complete.
    pub fn items(&mut self, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        self.advance(fraction);
    }

    pub fn finish(&mut self) {
        self.tracker.report(self.span.end, None);
    }

    pub fn span(&self) -> StageSpan {
        self.span
    }
}

/// Cancellation checkpoint used between stages and inside per-item loops.
pub fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(SubgenError::Cancelled)
    } else {
        Ok(())
    }
}

/// Await `work`, abandoning it as soon as `cancel` fires. Collaborators that
/// spawn subprocesses use `kill_on_drop`, so dropping the future stops them.
pub async fn cancellable<T, F>(cancel: &CancellationToken, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SubgenError::Cancelled),
        result = work => result,
    }
}
