use std::path::Path;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;
use crate::progress::{checkpoint, StageProgress};
use crate::transcript::Transcript;

/// Render a transcript as SubRip text.
///
/// Indices run 1..=N in transcript order. Segments left blank (for example
/// by a translator answering with nothing) get no cue, since an empty text
/// line would end the block early. A transcript without segments renders to
/// an empty string.
pub fn render_srt(
    transcript: &Transcript,
    progress: &mut StageProgress<'_, '_>,
    cancel: &CancellationToken,
) -> Result<String> {
    let total = transcript.len();
    info!("Processing segments... ({} segments)", total);

    let mut srt_content = String::new();
    let mut cue = 0;
    for (index, segment) in transcript.segments().iter().enumerate() {
        checkpoint(cancel)?;

        let text = segment.text().trim();
        if text.is_empty() {
            debug!("Skipping blank segment {} at {:.3}s", index + 1, segment.start());
        } else {
            cue += 1;
            srt_content.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                cue,
                format_srt_time(segment.start()),
                format_srt_time(segment.end()),
                text
            ));
        }
        progress.items(index + 1, total);
    }

    Ok(srt_content)
}

/// Write rendered SRT content as UTF-8, creating parent directories.
pub async fn save_srt<P: AsRef<Path>>(content: &str, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    fs::write(output_path, content).await?;
    info!("SRT file written: {}", output_path.display());
    Ok(())
}

/// Render and write in one step.
pub async fn write_srt<P: AsRef<Path>>(
    transcript: &Transcript,
    output_path: P,
    progress: &mut StageProgress<'_, '_>,
    cancel: &CancellationToken,
) -> Result<()> {
    let content = render_srt(transcript, progress, cancel)?;
    checkpoint(cancel)?;
    save_srt(&content, output_path).await
}

/// Format seconds as `HH:MM:SS,mmm`.
///
/// Milliseconds are rounded to the nearest integer (halves away from zero);
/// negative or NaN input is treated as zero. Hours do not wrap.
pub fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
