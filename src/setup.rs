use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{Result, SubgenError};
use crate::transcribe::ModelSize;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// One row of `subgen models`
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub size: ModelSize,
    pub filename: &'static str,
    pub url: String,
    pub size_mb: f64,
    pub downloaded: bool,
}

/// Local store of ggml whisper weights
pub struct ModelCatalog {
    client: Client,
    models_dir: PathBuf,
}

impl ModelCatalog {
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("subgen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            models_dir: models_dir.as_ref().to_path_buf(),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.models_dir.join(size.ggml_filename())
    }

    pub fn is_downloaded(&self, size: ModelSize) -> bool {
        self.model_path(size).is_file()
    }

    pub fn download_url(size: ModelSize) -> String {
        format!("{}/{}", MODEL_BASE_URL, size.ggml_filename())
    }

    pub fn list(&self) -> Vec<ModelInfo> {
        ModelSize::ALL
            .iter()
            .map(|&size| ModelInfo {
                size,
                filename: size.ggml_filename(),
                url: Self::download_url(size),
                size_mb: size.size_mb(),
                downloaded: self.is_downloaded(size),
            })
            .collect()
    }

    /// Download the weights for `size` unless already present.
    ///
    /// The body is streamed into `<file>.tmp` and renamed once complete, so
    /// an interrupted download never looks like a usable model.
    pub async fn download(&self, size: ModelSize) -> Result<PathBuf> {
        let local_path = self.model_path(size);
        if local_path.is_file() {
            info!("Model {} already exists at {}", size, local_path.display());
            return Ok(local_path);
        }

        async_fs::create_dir_all(&self.models_dir).await?;
        info!("Downloading {} model ({:.1} MB)...", size, size.size_mb());

        let url = Self::download_url(size);
        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SubgenError::Model(format!(
                "Failed to download model {}: HTTP {}",
                size,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((size.size_mb() * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let temp_path = local_path.with_extension("bin.tmp");
        let mut file = async_fs::File::create(&temp_path).await?;
        let mut downloaded = 0u64;

        let written: Result<()> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;
                pb.set_position(downloaded);
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = written {
            pb.abandon();
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(e);
        }

        async_fs::rename(&temp_path, &local_path).await?;
        pb.finish_with_message(format!("Downloaded {}", size));
        info!("Successfully downloaded {} to {}", size, local_path.display());

        Ok(local_path)
    }
}
