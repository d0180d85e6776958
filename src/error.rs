use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubgenError {
    #[error("Media error: {0}")]
    Media(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mux error: {0}")]
    Mux(String),

    /// Raised by a stage when the run's cancellation token fired.
    /// `Workflow::run` turns it into `RunOutcome::Cancelled`.
    #[error("Run cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SubgenError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SubgenError>;
