use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubgenError};
use crate::media::{MediaProcessor, MediaProcessorFactory};
use crate::progress::{cancellable, checkpoint, ProgressSink, ProgressTracker, Stage, StageProgress, StageSpan};
use crate::request::{is_supported_video, PipelineRequest};
use crate::subtitle::{render_srt, save_srt};
use crate::transcribe::{ModelLoader, WhisperCppLoader};
use crate::translate::{translate_transcript, OllamaTranslator, TextTranslator};

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Present only when the subtitle file was requested
    pub subtitle_path: Option<PathBuf>,
    /// Present only when the burned video was requested
    pub video_path: Option<PathBuf>,
    pub detected_language: String,
    pub segment_count: usize,
}

/// Result of a run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Stopped through the cancellation token. Not an error.
    Cancelled,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Directory for the temporary audio file; system temp when `None`
    pub temp_dir: Option<PathBuf>,
    /// Transcribe non-English targets to English first, then translate from English
    pub english_pivot: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            temp_dir: None,
            english_pivot: true,
        }
    }
}

impl WorkflowOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config.pipeline.temp_dir.clone(),
            english_pivot: config.translate.english_pivot,
        }
    }
}

/// Removes an output file on drop unless `keep` is called first.
///
/// Only files that did not exist when the guard was created are removed; an
/// earlier file at the same path is never deleted, only overwritten by the
/// writer.
pub struct ArtifactGuard {
    path: PathBuf,
    armed: bool,
}

impl ArtifactGuard {
    pub fn new(path: PathBuf) -> Self {
        let armed = !path.exists();
        if !armed {
            debug!("{} already exists and will not be removed on failure", path.display());
        }
        Self { path, armed }
    }

    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Per-run state. Dropping it deletes the temporary audio and any output
/// the run has not explicitly kept, so every exit path cleans up.
struct RunState<'a> {
    stage: Stage,
    post_translate: bool,
    tracker: ProgressTracker<'a>,
    audio: Option<TempPath>,
    subtitle: Option<ArtifactGuard>,
    video: Option<ArtifactGuard>,
}

impl<'a> RunState<'a> {
    fn new(sink: &'a dyn ProgressSink, post_translate: bool) -> Self {
        Self {
            stage: Stage::ExtractAudio,
            post_translate,
            tracker: ProgressTracker::new(sink),
            audio: None,
            subtitle: None,
            video: None,
        }
    }

    fn span(&self) -> StageSpan {
        self.stage.span(self.post_translate)
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        debug!(stage = %stage, "Entering stage");
        let span = self.span();
        self.tracker.stage(span).begin(stage.status());
    }

    fn progress(&mut self) -> StageProgress<'_, 'a> {
        let span = self.span();
        self.tracker.stage(span)
    }

    fn finish_stage(&mut self) {
        self.progress().finish();
    }

    /// Create a uniquely named temporary WAV path owned by this run.
    fn allocate_audio(&mut self, temp_dir: Option<&Path>) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("subgen-audio-").suffix(".wav");

        let file = match temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| SubgenError::Media(format!("Failed to create temporary audio file: {}", e)))?;

        let temp_path = file.into_temp_path();
        let audio_path = temp_path.to_path_buf();
        self.audio = Some(temp_path);
        Ok(audio_path)
    }

    fn release_audio(&mut self) {
        if let Some(audio) = self.audio.take() {
            if let Err(e) = audio.close() {
                warn!("Failed to remove temporary audio: {}", e);
            }
        }
    }
}

/// The subtitle pipeline: extraction, model load, transcription, optional
/// translation, SRT synthesis and optional burning, in that order.
pub struct Workflow {
    media: Box<dyn MediaProcessor>,
    models: Box<dyn ModelLoader>,
    translator: Box<dyn TextTranslator>,
    options: WorkflowOptions,
}

impl Workflow {
    /// Build a workflow wired to ffmpeg, whisper.cpp and Ollama.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_collaborators(
            MediaProcessorFactory::create_processor(config.media.clone()),
            Box::new(WhisperCppLoader::new(config.transcriber.clone())),
            Box::new(OllamaTranslator::new(config.translate.clone())?),
            WorkflowOptions::from_config(config),
        ))
    }

    pub fn with_collaborators(
        media: Box<dyn MediaProcessor>,
        models: Box<dyn ModelLoader>,
        translator: Box<dyn TextTranslator>,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            media,
            models,
            translator,
            options,
        }
    }

    pub fn media(&self) -> &dyn MediaProcessor {
        self.media.as_ref()
    }

    /// Run the pipeline once.
    ///
    /// Progress goes to `progress` as a non-decreasing 0-100 value ending at
    /// exactly 100 on success. Cancellation is observed between stages and
    /// per item inside them; a cancelled run returns `RunOutcome::Cancelled`.
    /// On cancellation or error nothing written by the run is left behind.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        info!(
            source = %request.source().display(),
            model = %request.model(),
            target = %request.target(),
            "Starting subtitle pipeline"
        );

        let post_translate = request.target().post_translation().is_some();
        let mut state = RunState::new(progress, post_translate);

        let result = self.execute(request, &mut state, cancel).await;
        let stage = state.stage;
        drop(state);

        match result {
            Ok(report) => {
                info!("Pipeline completed: {:?}", report);
                Ok(RunOutcome::Completed(report))
            }
            Err(SubgenError::Cancelled) => {
                info!(stage = %stage, "Pipeline cancelled");
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => {
                warn!(stage = %stage, "Pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        state: &mut RunState<'_>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        // Step 1: Extract audio into a run-owned temp file
        state.enter(Stage::ExtractAudio);
        let audio_path = state.allocate_audio(self.options.temp_dir.as_deref())?;
        cancellable(cancel, self.media.extract_audio(request.source(), &audio_path)).await?;
        state.finish_stage();
        checkpoint(cancel)?;

        // Step 2: Load the recognizer
        state.enter(Stage::LoadModel);
        let recognizer = cancellable(cancel, self.models.load(request.model())).await?;
        state.finish_stage();
        checkpoint(cancel)?;

        // Step 3: Transcribe
        state.enter(Stage::Transcribe);
        let mode = request.target().recognition_mode(self.options.english_pivot);
        let mut transcript = cancellable(cancel, recognizer.transcribe(&audio_path, mode))
            .await
            .map_err(|e| match e {
                SubgenError::Cancelled | SubgenError::Transcription(_) => e,
                other => SubgenError::Transcription(other.to_string()),
            })?;
        drop(recognizer);
        info!(
            segments = transcript.len(),
            language = transcript.detected_language(),
            "Transcription finished"
        );
        state.finish_stage();
        checkpoint(cancel)?;

        // Step 4: Post-translate for explicit non-English targets
        if let Some(target_language) = request.target().post_translation() {
            state.enter(Stage::Translate);
            let source_language = if self.options.english_pivot {
                "en".to_string()
            } else {
                transcript.detected_language().to_string()
            };
            translate_transcript(
                &mut transcript,
                self.translator.as_ref(),
                &source_language,
                target_language,
                &mut state.progress(),
                cancel,
            )
            .await?;
            state.finish_stage();
            checkpoint(cancel)?;
        }

        // Step 5: Synthesize the SRT. Always written, muxing reads it from disk.
        state.enter(Stage::Synthesize);
        let content = render_srt(&transcript, &mut state.progress(), cancel)?;
        checkpoint(cancel)?;
        let subtitle_path = request.subtitle_path().to_path_buf();
        state.subtitle = Some(ArtifactGuard::new(subtitle_path.clone()));
        save_srt(&content, &subtitle_path).await?;
        state.finish_stage();
        checkpoint(cancel)?;

        // Step 6: Burn
        if request.emit_burned_video() {
            state.enter(Stage::Mux);
            state.video = Some(ArtifactGuard::new(request.video_path().to_path_buf()));
            self.media
                .burn_subtitles(
                    request.source(),
                    &subtitle_path,
                    request.video_path(),
                    request.style(),
                    cancel,
                )
                .await?;
            state.finish_stage();
            checkpoint(cancel)?;
        }

        // Step 7: Cleanup
        state.enter(Stage::Cleanup);
        let subtitle_path = match state.subtitle.take() {
            Some(guard) if request.emit_subtitle_file() => {
                guard.keep();
                Some(subtitle_path)
            }
            // Only burning was requested; dropping the guard removes the file.
            _ => None,
        };
        let video_path = match state.video.take() {
            Some(guard) => {
                guard.keep();
                Some(request.video_path().to_path_buf())
            }
            None => None,
        };
        state.release_audio();
        state.tracker.report(100.0, Some("Complete!"));

        Ok(RunReport {
            subtitle_path,
            video_path,
            detected_language: transcript.detected_language().to_string(),
            segment_count: transcript.len(),
        })
    }
}

/// Recursively collect supported video files under `dir`, sorted by path.
pub fn find_videos<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(SubgenError::Config(format!("{} is not a directory", dir.display())));
    }

    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported_video(e.path()))
        .map(|e| e.into_path())
        .collect();
    videos.sort();

    info!("Found {} video files in {}", videos.len(), dir.display());
    Ok(videos)
}
