//! In-memory collaborators for exercising the workflow without external tools.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SubgenError};
use crate::media::{MediaProcessor, SubtitleStyle};
use crate::progress::ProgressSink;
use crate::transcribe::{ModelLoader, ModelSize, RecognitionMode, Recognizer};
use crate::translate::TextTranslator;
use crate::transcript::Transcript;

#[derive(Clone, Default)]
enum BurnBehaviour {
    #[default]
    Succeed,
    Fail,
    FailBeforeOutput,
    Cancel(CancellationToken),
}

/// Media processor that writes placeholder files and records what it saw.
#[derive(Clone, Default)]
pub struct StubMedia {
    calls: Arc<Mutex<Vec<String>>>,
    audio_paths: Arc<Mutex<Vec<PathBuf>>>,
    burn_saw_subtitle: Arc<Mutex<Option<bool>>>,
    fail_extract: bool,
    burn: BurnBehaviour,
}

impl StubMedia {
    pub fn failing_extract() -> Self {
        Self {
            fail_extract: true,
            ..Self::default()
        }
    }

    /// Writes a partial output, then reports a tool failure.
    pub fn failing_burn() -> Self {
        Self {
            burn: BurnBehaviour::Fail,
            ..Self::default()
        }
    }

    /// Fails the way a missing encoder does, before any output exists.
    pub fn failing_burn_without_output() -> Self {
        Self {
            burn: BurnBehaviour::FailBeforeOutput,
            ..Self::default()
        }
    }

    /// Writes a partial output, then fires `cancel` as a user would mid-mux.
    pub fn cancelling_burn(cancel: CancellationToken) -> Self {
        Self {
            burn: BurnBehaviour::Cancel(cancel),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn extracted_audio_paths(&self) -> Vec<PathBuf> {
        self.audio_paths.lock().unwrap().clone()
    }

    /// Whether the subtitle file existed when burning started
    pub fn burn_saw_subtitle(&self) -> Option<bool> {
        *self.burn_saw_subtitle.lock().unwrap()
    }
}

#[async_trait]
impl MediaProcessor for StubMedia {
    async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> Result<()> {
        self.calls.lock().unwrap().push("extract".to_string());
        self.audio_paths.lock().unwrap().push(audio_path.to_path_buf());
        if self.fail_extract {
            return Err(SubgenError::Media("stub has no audio track".to_string()));
        }
        tokio::fs::write(audio_path, b"RIFF").await?;
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        _video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        _style: &SubtitleStyle,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.calls.lock().unwrap().push("burn".to_string());
        *self.burn_saw_subtitle.lock().unwrap() = Some(subtitle_path.is_file());
        if let BurnBehaviour::FailBeforeOutput = self.burn {
            return Err(SubgenError::Mux("'ffmpeg' not found on PATH".to_string()));
        }
        tokio::fs::write(output_path, b"video").await?;

        match &self.burn {
            BurnBehaviour::Succeed | BurnBehaviour::FailBeforeOutput => Ok(()),
            BurnBehaviour::Fail => Err(SubgenError::Mux("stub encoder crashed".to_string())),
            BurnBehaviour::Cancel(token) => {
                token.cancel();
                Err(SubgenError::Cancelled)
            }
        }
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("stub".to_string())
    }
}

/// Loader handing out recognizers that return a fixed transcript.
#[derive(Clone)]
pub struct StubLoader {
    transcript: Transcript,
    modes: Arc<Mutex<Vec<RecognitionMode>>>,
    fail: bool,
}

impl StubLoader {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            modes: Arc::default(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Transcript::empty("en"))
        }
    }

    /// Modes passed to `transcribe`, in call order
    pub fn modes(&self) -> Vec<RecognitionMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self, size: ModelSize) -> Result<Box<dyn Recognizer>> {
        if self.fail {
            return Err(SubgenError::Model(format!("stub weights for {} are missing", size)));
        }
        Ok(Box::new(StubRecognizer {
            transcript: self.transcript.clone(),
            modes: Arc::clone(&self.modes),
        }))
    }
}

pub struct StubRecognizer {
    transcript: Transcript,
    modes: Arc<Mutex<Vec<RecognitionMode>>>,
}

#[async_trait]
impl Recognizer for StubRecognizer {
    async fn transcribe(&self, audio_path: &Path, mode: RecognitionMode) -> Result<Transcript> {
        if !audio_path.is_file() {
            return Err(SubgenError::Transcription(format!(
                "missing audio {}",
                audio_path.display()
            )));
        }
        self.modes.lock().unwrap().push(mode);
        Ok(self.transcript.clone())
    }
}

/// Translator answering `"<target>:<text>"`.
#[derive(Clone, Default)]
pub struct StubTranslator {
    calls: Arc<AtomicUsize>,
    pairs: Arc<Mutex<Vec<(String, String)>>>,
    cancel_at: Option<(usize, CancellationToken)>,
    fail_at: Option<usize>,
}

impl StubTranslator {
    /// Fires `cancel` while serving the `n`th request (1-based).
    pub fn cancelling_at(n: usize, cancel: CancellationToken) -> Self {
        Self {
            cancel_at: Some((n, cancel)),
            ..Self::default()
        }
    }

    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(source, target)` language pairs, one per request
    pub fn language_pairs(&self) -> Vec<(String, String)> {
        self.pairs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextTranslator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pairs
            .lock()
            .unwrap()
            .push((source_language.to_string(), target_language.to_string()));

        if self.fail_at == Some(n) {
            return Err(SubgenError::Translation("stub backend unavailable".to_string()));
        }
        if let Some((at, token)) = &self.cancel_at {
            if *at == n {
                token.cancel();
            }
        }
        Ok(format!("{}:{}", target_language, text))
    }
}

/// Sink keeping every report for later assertions.
#[derive(Default)]
pub struct RecordingProgress {
    reports: Mutex<Vec<(f64, Option<String>)>>,
}

impl RecordingProgress {
    pub fn values(&self) -> Vec<f64> {
        self.reports.lock().unwrap().iter().map(|(v, _)| *v).collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, s)| s.clone())
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, percent: f64, status: Option<&str>) {
        self.reports
            .lock()
            .unwrap()
            .push((percent, status.map(str::to_string)));
    }
}
