use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::MediaConfig;
use crate::error::{Result, SubgenError};
use super::{CommandFailure, MediaCommandBuilder, MediaProcessor, SubtitleStyle};

/// ffmpeg messages meaning the input has nothing to extract
const NO_AUDIO_MARKERS: [&str; 3] = [
    "matches no streams",
    "does not contain any stream",
    "Output file is empty",
];

/// FFmpeg-backed media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    fn extraction_error(&self, video_path: &Path, failure: CommandFailure) -> SubgenError {
        match failure {
            CommandFailure::Exited { ref output, .. }
                if NO_AUDIO_MARKERS.iter().any(|m| output.contains(m)) =>
            {
                SubgenError::Media(format!("{} has no audio track", video_path.display()))
            }
            CommandFailure::Cancelled => SubgenError::Cancelled,
            other => SubgenError::Media(format!(
                "Audio extraction from {} failed: {} {}",
                video_path.display(),
                self.config.binary_path,
                other
            )),
        }
    }

    fn mux_error(&self, failure: CommandFailure) -> SubgenError {
        match failure {
            CommandFailure::Cancelled => SubgenError::Cancelled,
            CommandFailure::NotFound(binary) => SubgenError::Mux(format!(
                "'{}' not found on PATH; install ffmpeg or set media.binary_path",
                binary
            )),
            other => SubgenError::Mux(format!(
                "{} failed to burn subtitles: {}",
                self.config.binary_path, other
            )),
        }
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        if !video_path.is_file() {
            return Err(SubgenError::Media(format!(
                "Source video not found: {}",
                video_path.display()
            )));
        }

        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await
            .map_err(|f| self.extraction_error(video_path, f))?;

        info!("Audio extraction completed");
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        style: &SubtitleStyle,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!("Burning subtitles from {} into {} -> {}",
              subtitle_path.display(), video_path.display(), output_path.display());

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            style,
            &self.config.subtitle_options,
        );

        command
            .execute_streaming(cancel)
            .await
            .map_err(|f| self.mux_error(f))?;

        info!("Subtitles burned successfully");
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        let output = self
            .command_builder
            .version_check()
            .execute()
            .await
            .map_err(|f| self.mux_error(f))?;

        let version = output.lines().next().unwrap_or("unknown version").to_string();
        info!("Media processor is available: {}", version);
        Ok(version)
    }
}
