// Machine translation
//
// - TextTranslator: one string in, one string out (the backend seam)
// - translate_transcript: the pipeline stage that rewrites segment text in place
// - ollama: TextTranslator backed by a local Ollama server

pub mod ollama;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, SubgenError};
use crate::progress::{checkpoint, StageProgress};
use crate::transcript::Transcript;

pub use ollama::OllamaTranslator;

/// Translation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;
}

/// Rewrite every segment's text into `target_language`.
///
/// Text is trimmed before submission and empty strings are still sent, so
/// segments and translations stay 1:1. Timings are never touched. The first
/// failing segment aborts the whole stage.
pub async fn translate_transcript(
    transcript: &mut Transcript,
    translator: &dyn TextTranslator,
    source_language: &str,
    target_language: &str,
    progress: &mut StageProgress<'_, '_>,
    cancel: &CancellationToken,
) -> Result<()> {
    let total = transcript.len();
    info!("Translating {} segments from {} to {}", total, source_language, target_language);

    for (idx, segment) in transcript.segments_mut().enumerate() {
        checkpoint(cancel)?;

        let source_text = segment.text().trim().to_string();
        let translated = translator
            .translate(&source_text, source_language, target_language)
            .await
            .map_err(|e| match e {
                SubgenError::Translation(_) | SubgenError::Cancelled => e,
                other => SubgenError::Translation(format!("segment {}: {}", idx + 1, other)),
            })?;

        debug!("Segment {}/{}: {:?} -> {:?}", idx + 1, total, source_text, translated);
        segment.set_text(translated);
        progress.items(idx + 1, total);
    }

    info!("Translation complete");
    Ok(())
}
