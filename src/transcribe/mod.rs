// Speech recognition backends
//
// The pipeline only talks to two traits:
// - ModelLoader: resolves a model size into a ready recognizer
// - Recognizer: turns an audio file into a Transcript
//
// whisper_cpp provides the implementation backed by the whisper.cpp CLI.

pub mod whisper_cpp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SubgenError};
use crate::transcript::Transcript;

pub use whisper_cpp::{WhisperCppLoader, WhisperCppRecognizer};

/// Whisper model sizes, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    pub fn parameters(self) -> &'static str {
        match self {
            Self::Tiny => "39M",
            Self::Base => "74M",
            Self::Small => "244M",
            Self::Medium => "769M",
            Self::Large => "1550M",
        }
    }

    pub fn relative_speed(self) -> &'static str {
        match self {
            Self::Tiny => "Fastest",
            Self::Base => "Fast",
            Self::Small => "Moderate",
            Self::Medium => "Slow",
            Self::Large => "Slowest",
        }
    }

    /// Weights file name as published for whisper.cpp
    pub fn ggml_filename(self) -> &'static str {
        match self {
            Self::Tiny => "ggml-tiny.bin",
            Self::Base => "ggml-base.bin",
            Self::Small => "ggml-small.bin",
            Self::Medium => "ggml-medium.bin",
            Self::Large => "ggml-large-v3.bin",
        }
    }

    /// Approximate download size in megabytes
    pub fn size_mb(self) -> f64 {
        match self {
            Self::Tiny => 75.0,
            Self::Base => 142.0,
            Self::Small => 466.0,
            Self::Medium => 1500.0,
            Self::Large => 2900.0,
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelSize {
    type Err = SubgenError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ModelSize::ALL
            .into_iter()
            .find(|size| size.name() == wanted)
            .ok_or_else(|| {
                SubgenError::Model(format!(
                    "Unknown model size '{}' (expected one of: tiny, base, small, medium, large)",
                    s
                ))
            })
    }
}

/// What the recognizer should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Text in the spoken language
    Recognize,
    /// Text translated to English by the model itself
    TranslateToEnglish,
}

/// A loaded speech recognition backend
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe an audio file. An empty transcript is a valid result.
    async fn transcribe(&self, audio_path: &Path, mode: RecognitionMode) -> Result<Transcript>;
}

/// Produces recognizers for a model size
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, size: ModelSize) -> Result<Box<dyn Recognizer>>;
}
