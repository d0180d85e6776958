use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{Result, SubgenError};
use super::TextTranslator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

/// Translator backed by Ollama's `/api/generate` endpoint
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn build_prompt(text: &str, source_language: &str, target_language: &str) -> String {
        format!(
            "Translate the following subtitle line from language code '{}' to language code '{}'.\n\
             Keep line breaks. Respond with JSON of the form {{\"text\": \"<translation>\"}} and nothing else.\n\n\
             {}",
            source_language, target_language, text
        )
    }

    /// Pull the translation out of the model's reply. Models sometimes ignore
    /// the JSON instruction; plain text is accepted as-is.
    fn extract_translation(raw: &str) -> Result<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SubgenError::Translation("Empty response from Ollama".to_string()));
        }

        match serde_json::from_str::<TranslationResult>(raw) {
            Ok(result) => Ok(result.text.trim().to_string()),
            Err(e) => {
                debug!("Response was not translation JSON ({}), using raw text", e);
                Ok(raw.to_string())
            }
        }
    }
}

#[async_trait]
impl TextTranslator for OllamaTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: Self::build_prompt(text, source_language, target_language),
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubgenError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubgenError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| SubgenError::Translation(format!("Failed to parse response: {}", e)))?;

        Self::extract_translation(&generated.response)
    }
}
