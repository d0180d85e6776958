use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use subgen::error::{Result, SubgenError};
use subgen::media::{MediaProcessor, SubtitleStyle};
use subgen::request::{PipelineRequest, TargetLanguage};
use subgen::transcribe::{ModelLoader, ModelSize, RecognitionMode, Recognizer};
use subgen::transcript::{Segment, Transcript};
use subgen::translate::TextTranslator;
use subgen::workflow::{Workflow, WorkflowOptions};

struct FakeMedia;

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn extract_audio(&self, _video: &Path, audio: &Path) -> Result<()> {
        tokio::fs::write(audio, b"RIFF").await?;
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        _video: &Path,
        subtitles: &Path,
        output: &Path,
        _style: &SubtitleStyle,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        let srt = tokio::fs::read_to_string(subtitles).await?;
        tokio::fs::write(output, format!("burned:{}", srt)).await?;
        Ok(())
    }

    async fn check_availability(&self) -> Result<String> {
        Ok("fake".to_string())
    }
}

struct FakeLoader;

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self, _size: ModelSize) -> Result<Box<dyn Recognizer>> {
        Ok(Box::new(FakeRecognizer))
    }
}

struct FakeRecognizer;

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn transcribe(&self, _audio: &Path, mode: RecognitionMode) -> Result<Transcript> {
        let (first, second) = match mode {
            RecognitionMode::Recognize => ("Bonjour", "Au revoir"),
            RecognitionMode::TranslateToEnglish => ("Hello", "Goodbye"),
        };
        Ok(Transcript::new(
            vec![
                Segment::new(4.0, 5.5, second),
                Segment::new(0.0, 1.25, first),
            ],
            "fr",
        ))
    }
}

/// Upper-cases text; fires `cancel_on_first` while serving the first request.
struct ShoutingTranslator {
    cancel_on_first: Option<CancellationToken>,
}

#[async_trait]
impl TextTranslator for ShoutingTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        if let Some(token) = &self.cancel_on_first {
            token.cancel();
        }
        Ok(text.to_uppercase())
    }
}

fn workflow(temp: &TempDir, cancel_on_first: Option<CancellationToken>) -> Workflow {
    Workflow::with_collaborators(
        Box::new(FakeMedia),
        Box::new(FakeLoader),
        Box::new(ShoutingTranslator { cancel_on_first }),
        WorkflowOptions {
            temp_dir: Some(temp.path().to_path_buf()),
            english_pivot: true,
        },
    )
}

#[tokio::test]
async fn generates_translated_subtitles_and_burned_video() {
    let temp = TempDir::new().unwrap();
    let video = temp.child("movie.mkv");
    video.write_binary(b"not really a video").unwrap();
    let out = temp.child("out");

    let request = PipelineRequest::builder(video.path())
        .target(TargetLanguage::Other("de".to_string()))
        .burned_video(true)
        .output_dir(Some(out.path().to_path_buf()))
        .build()
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |percent: f64, _status: Option<&str>| seen.lock().unwrap().push(percent)
    };

    let outcome = workflow(&temp, None)
        .run(&request, &sink, &CancellationToken::new())
        .await
        .unwrap();

    let report = outcome.report().unwrap();
    assert_eq!(report.detected_language, "fr");
    assert_eq!(report.segment_count, 2);

    let expected = "1\n00:00:00,000 --> 00:00:01,250\nHELLO\n\n2\n00:00:04,000 --> 00:00:05,500\nGOODBYE\n\n";
    out.child("movie.srt").assert(expected);
    out.child("movie_subtitled.mkv").assert(format!("burned:{}", expected));

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(seen.last().copied(), Some(100.0));

    let leftovers: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("subgen-audio-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn cancellation_leaves_no_files_behind() {
    let temp = TempDir::new().unwrap();
    let video = temp.child("movie.mp4");
    video.write_binary(b"not really a video").unwrap();

    let request = PipelineRequest::builder(video.path())
        .target(TargetLanguage::Other("de".to_string()))
        .burned_video(true)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let outcome = workflow(&temp, Some(cancel.clone()))
        .run(&request, &|_: f64, _: Option<&str>| {}, &cancel)
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    let remaining: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(remaining, vec!["movie.mp4".to_string()]);
}

#[tokio::test]
async fn source_language_keeps_spoken_text() {
    let temp = TempDir::new().unwrap();
    let video = temp.child("clip.mov");
    video.write_binary(b"x").unwrap();

    let request = PipelineRequest::builder(video.path())
        .target("source".parse().unwrap())
        .build()
        .unwrap();

    let outcome = workflow(&temp, None)
        .run(&request, &|_: f64, _: Option<&str>| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.report().unwrap().video_path.is_none());
    temp.child("clip.srt").assert(
        "1\n00:00:00,000 --> 00:00:01,250\nBonjour\n\n2\n00:00:04,000 --> 00:00:05,500\nAu revoir\n\n",
    );
    assert!(matches!(
        "??".parse::<TargetLanguage>(),
        Err(SubgenError::Config(_))
    ));
}
