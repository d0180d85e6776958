use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SubgenError};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "subgen.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub media: MediaConfig,
    pub pipeline: PipelineConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path to the whisper.cpp binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Directory holding ggml model weights
    pub models_dir: PathBuf,
    /// Beam search width
    pub beam_size: u32,
    /// Worker threads; whisper's own default when unset
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// HTTP timeout per segment request
    pub timeout_secs: u64,
    /// Transcribe straight to English and translate from English, instead of
    /// translating from the detected spoken language
    pub english_pivot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for subtitle burning
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
    /// Appended to the source file stem to name the burned video
    pub output_suffix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where temporary audio is extracted; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

/// Default burn-in style, overridable per run from the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// `""` leaves the font to ffmpeg
    pub font_name: Option<String>,
    /// `#RRGGBB`; `""` leaves the colour to ffmpeg
    pub primary_color: Option<String>,
    pub background_box: bool,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-cli".to_string(),
            models_dir: PathBuf::from(".subgen").join("models"),
            beam_size: 5,
            threads: None,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_secs: 300,
            english_pivot: true,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            subtitle_options: vec![],
            output_suffix: "_subtitled".to_string(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_name: Some("Arial".to_string()),
            primary_color: Some("#FFFFFF".to_string()),
            background_box: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubgenError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubgenError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubgenError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubgenError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Explicit path, else `subgen.toml` in the working directory, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }
}
