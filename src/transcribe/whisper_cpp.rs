use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubgenError};
use crate::transcript::{Segment, Transcript};
use super::{ModelLoader, ModelSize, RecognitionMode, Recognizer};

/// whisper.cpp JSON output (`-oj`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: WhisperCppResult,
    #[serde(default)]
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl From<WhisperCppOutput> for Transcript {
    fn from(output: WhisperCppOutput) -> Self {
        let segments = output
            .transcription
            .into_iter()
            .map(|seg| {
                Segment::new(
                    seg.offsets.from as f64 / 1000.0,
                    seg.offsets.to as f64 / 1000.0,
                    seg.text.trim(),
                )
            })
            .collect();

        Transcript::new(segments, output.result.language)
    }
}

/// Resolves model sizes to ggml weights under the configured models directory
pub struct WhisperCppLoader {
    config: TranscriberConfig,
}

impl WhisperCppLoader {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.config.models_dir.join(size.ggml_filename())
    }

    /// Make sure the whisper binary can be spawned at all.
    async fn check_binary(&self) -> Result<()> {
        let status = Command::new(&self.config.binary_path)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SubgenError::Model(format!(
                "Whisper binary '{}' not found on PATH",
                self.config.binary_path
            ))),
            Err(e) => Err(SubgenError::Model(format!(
                "Failed to start whisper binary '{}': {}",
                self.config.binary_path, e
            ))),
        }
    }
}

#[async_trait]
impl ModelLoader for WhisperCppLoader {
    async fn load(&self, size: ModelSize) -> Result<Box<dyn Recognizer>> {
        let model_path = self.model_path(size);
        if !model_path.is_file() {
            return Err(SubgenError::Model(format!(
                "Weights for model '{}' not found at {} (run `subgen models --download {}`)",
                size,
                model_path.display(),
                size
            )));
        }

        self.check_binary().await?;
        info!("Using whisper model {} ({})", size, model_path.display());

        Ok(Box::new(WhisperCppRecognizer::new(self.config.clone(), model_path)))
    }
}

/// Runs `whisper-cli` with a fixed model file
pub struct WhisperCppRecognizer {
    config: TranscriberConfig,
    model_path: PathBuf,
}

impl WhisperCppRecognizer {
    pub fn new(config: TranscriberConfig, model_path: PathBuf) -> Self {
        Self { config, model_path }
    }

    fn build_command(&self, audio_path: &Path, output_prefix: &Path, mode: RecognitionMode) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(&self.model_path)
            .arg("-f").arg(audio_path)
            .arg("-l").arg("auto")
            .arg("-bs").arg(self.config.beam_size.to_string())
            .arg("-oj")
            .arg("-of").arg(output_prefix)
            .arg("-np");

        if let Some(threads) = self.config.threads {
            cmd.arg("-t").arg(threads.to_string());
        }

        if mode == RecognitionMode::TranslateToEnglish {
            cmd.arg("-tr");
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Recognizer for WhisperCppRecognizer {
    async fn transcribe(&self, audio_path: &Path, mode: RecognitionMode) -> Result<Transcript> {
        info!("Transcribing {} ({:?})", audio_path.display(), mode);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubgenError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_prefix = temp_dir.path().join("transcript");

        let mut cmd = self.build_command(audio_path, &output_prefix, mode);
        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd.output().await
            .map_err(|e| SubgenError::Transcription(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubgenError::Transcription(format!("Whisper failed: {}", stderr.trim())));
        }

        let json_file = output_prefix.with_extension("json");
        let json_content = tokio::fs::read_to_string(&json_file).await
            .map_err(|e| SubgenError::Transcription(format!("Failed to read whisper output: {}", e)))?;

        parse_output(&json_content)
    }
}

/// Parse whisper.cpp JSON into a transcript
pub fn parse_output(json: &str) -> Result<Transcript> {
    let output: WhisperCppOutput = serde_json::from_str(json)
        .map_err(|e| SubgenError::Transcription(format!("Failed to parse whisper JSON: {}", e)))?;

    Ok(output.into())
}
