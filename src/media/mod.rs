// Media processing
//
// - commands: ffmpeg command builders and process execution
// - processor: MediaProcessor implementation on top of ffmpeg
// - style: burn-in style parameters

pub mod commands;
pub mod processor;
pub mod style;

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub use commands::*;
pub use processor::*;
pub use style::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Extract the first audio track as 16 kHz mono WAV.
    /// Fails with `Media` when the source is unreadable or has no audio.
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Render `subtitle_path` into the picture of `video_path`, writing
    /// `output_path`. Fails with `Mux`; returns `Cancelled` when `cancel`
    /// fires while the tool runs.
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        style: &SubtitleStyle,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Check that the muxing tool can be run
    async fn check_availability(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessor> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
