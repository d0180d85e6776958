//! Immutable description of one pipeline run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SubgenError};
use crate::media::SubtitleStyle;
use crate::transcribe::{ModelSize, RecognitionMode};

/// Extensions offered by default when looking for videos
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "avi", "mov", "flv"];

/// Suffix appended to the source stem for the burned video
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_subtitled";

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Language of the produced subtitles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLanguage {
    /// Keep the spoken language, no translation
    Source,
    /// English via the recognizer's built-in translation
    English,
    /// Any other language code, translated after transcription
    Other(String),
}

impl TargetLanguage {
    /// Recognition mode for this target. With `english_pivot`, explicit
    /// non-English targets are first transcribed straight to English.
    pub fn recognition_mode(&self, english_pivot: bool) -> RecognitionMode {
        match self {
            Self::Source => RecognitionMode::Recognize,
            Self::English => RecognitionMode::TranslateToEnglish,
            Self::Other(_) if english_pivot => RecognitionMode::TranslateToEnglish,
            Self::Other(_) => RecognitionMode::Recognize,
        }
    }

    /// Language code for the post-translation pass, if one is needed.
    pub fn post_translation(&self) -> Option<&str> {
        match self {
            Self::Other(code) => Some(code.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::English => f.write_str("en"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

impl FromStr for TargetLanguage {
    type Err = SubgenError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_lowercase();
        match code.as_str() {
            "source" | "original" => Ok(Self::Source),
            "en" | "english" => Ok(Self::English),
            _ if (2..=8).contains(&code.len())
                && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') =>
            {
                Ok(Self::Other(code))
            }
            _ => Err(SubgenError::Config(format!(
                "Invalid target language '{}': use 'source', 'en' or a language code such as 'fr'",
                s
            ))),
        }
    }
}

/// Default destinations derived from the source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub subtitle: PathBuf,
    pub video: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<stem>.srt` and `<dir>/<stem><suffix>.<ext>`, where `dir`
    /// defaults to the directory holding the video.
    pub fn resolve(video_path: &Path, output_dir: Option<&Path>, suffix: &str) -> Result<Self> {
        let stem = video_path
            .file_stem()
            .ok_or_else(|| SubgenError::Config(format!("Invalid video filename: {}", video_path.display())))?
            .to_string_lossy()
            .to_string();

        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => video_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        let video_name = match video_path.extension() {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, suffix),
        };

        Ok(Self {
            subtitle: dir.join(format!("{}.srt", stem)),
            video: dir.join(video_name),
        })
    }
}

/// Configuration for one run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    source: PathBuf,
    model: ModelSize,
    target: TargetLanguage,
    emit_subtitle_file: bool,
    emit_burned_video: bool,
    subtitle_path: PathBuf,
    video_path: PathBuf,
    style: SubtitleStyle,
}

impl PipelineRequest {
    pub fn builder(source: impl Into<PathBuf>) -> PipelineRequestBuilder {
        PipelineRequestBuilder::new(source.into())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn model(&self) -> ModelSize {
        self.model
    }

    pub fn target(&self) -> &TargetLanguage {
        &self.target
    }

    pub fn emit_subtitle_file(&self) -> bool {
        self.emit_subtitle_file
    }

    pub fn emit_burned_video(&self) -> bool {
        self.emit_burned_video
    }

    /// Where the SRT is written. Always written during a run; removed at the
    /// end when only the burned video was requested.
    pub fn subtitle_path(&self) -> &Path {
        &self.subtitle_path
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }
}

pub struct PipelineRequestBuilder {
    source: PathBuf,
    model: ModelSize,
    target: TargetLanguage,
    emit_subtitle_file: bool,
    emit_burned_video: bool,
    output_dir: Option<PathBuf>,
    output_suffix: String,
    subtitle_path: Option<PathBuf>,
    video_path: Option<PathBuf>,
    style: SubtitleStyle,
}

impl PipelineRequestBuilder {
    fn new(source: PathBuf) -> Self {
        Self {
            source,
            model: ModelSize::Base,
            target: TargetLanguage::English,
            emit_subtitle_file: true,
            emit_burned_video: false,
            output_dir: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            subtitle_path: None,
            video_path: None,
            style: SubtitleStyle::default(),
        }
    }

    pub fn model(mut self, model: ModelSize) -> Self {
        self.model = model;
        self
    }

    pub fn target(mut self, target: TargetLanguage) -> Self {
        self.target = target;
        self
    }

    pub fn subtitle_file(mut self, emit: bool) -> Self {
        self.emit_subtitle_file = emit;
        self
    }

    pub fn burned_video(mut self, emit: bool) -> Self {
        self.emit_burned_video = emit;
        self
    }

    pub fn output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Explicit SRT destination, overriding the derived one
    pub fn subtitle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.subtitle_path = Some(path.into());
        self
    }

    /// Explicit burned-video destination, overriding the derived one
    pub fn video_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.video_path = Some(path.into());
        self
    }

    pub fn style(mut self, style: SubtitleStyle) -> Self {
        self.style = style;
        self
    }

    pub fn build(self) -> Result<PipelineRequest> {
        if !self.emit_subtitle_file && !self.emit_burned_video {
            return Err(SubgenError::Config(
                "Select at least one output: subtitle file or burned video".to_string(),
            ));
        }

        let defaults = OutputPaths::resolve(&self.source, self.output_dir.as_deref(), &self.output_suffix)?;
        let subtitle_path = self.subtitle_path.unwrap_or(defaults.subtitle);
        let video_path = self.video_path.unwrap_or(defaults.video);

        if self.emit_burned_video && (video_path == self.source || video_path == subtitle_path) {
            return Err(SubgenError::Config(format!(
                "Burned video path {} would overwrite an input",
                video_path.display()
            )));
        }

        Ok(PipelineRequest {
            source: self.source,
            model: self.model,
            target: self.target,
            emit_subtitle_file: self.emit_subtitle_file,
            emit_burned_video: self.emit_burned_video,
            subtitle_path,
            video_path,
            style: self.style,
        })
    }
}
