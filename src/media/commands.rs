use std::collections::VecDeque;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::style::SubtitleStyle;

/// Lines of output kept for error messages
const OUTPUT_TAIL_LINES: usize = 20;

/// Why a media command did not succeed
#[derive(Debug)]
pub enum CommandFailure {
    /// The binary could not be found on PATH
    NotFound(String),
    /// The process could not be started or waited on
    Spawn(std::io::Error),
    /// The process exited unsuccessfully
    Exited { code: Option<i32>, output: String },
    /// The cancellation token fired; the child has been killed
    Cancelled,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(binary) => write!(f, "'{}' not found on PATH", binary),
            Self::Spawn(e) => write!(f, "failed to run process: {}", e),
            Self::Exited { code: Some(code), output } => {
                write!(f, "exited with status {}: {}", code, output)
            }
            Self::Exited { code: None, output } => {
                write!(f, "terminated by signal: {}", output)
            }
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn hide_banner(self) -> Self {
        self.arg("-hide_banner")
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Select a stream by specifier
    pub fn map<S: Into<String>>(self, specifier: S) -> Self {
        self.arg("-map").arg(specifier)
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Emit machine-readable progress lines on stdout instead of the
    /// carriage-return status line
    pub fn line_progress(self) -> Self {
        self.arg("-progress").arg("pipe:1").arg("-nostats")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_failure(&self, e: std::io::Error) -> CommandFailure {
        if e.kind() == ErrorKind::NotFound {
            CommandFailure::NotFound(self.binary_path.clone())
        } else {
            CommandFailure::Spawn(e)
        }
    }

    /// Run to completion, collecting output.
    pub async fn execute(&self) -> Result<String, CommandFailure> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = self.command().output().await.map_err(|e| self.spawn_failure(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CommandFailure::Exited {
                code: output.status.code(),
                output: tail(stderr.lines()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run while reading stdout and stderr line by line, polling `cancel` on
    /// every line. A cancelled run kills the child before returning.
    pub async fn execute_streaming(&self, cancel: &CancellationToken) -> Result<(), CommandFailure> {
        debug!("Streaming media command: {} {:?}", self.binary_path, self.args);

        let mut child = self.command().spawn().map_err(|e| self.spawn_failure(e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let mut out_lines = stdout.map(|s| BufReader::new(s).lines());
        let mut err_lines = stderr.map(|s| BufReader::new(s).lines());
        let mut recent: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL_LINES);

        while out_lines.is_some() || err_lines.is_some() {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    kill(&mut child).await;
                    return Err(CommandFailure::Cancelled);
                }
                line = next_line(&mut out_lines), if out_lines.is_some() => line,
                line = next_line(&mut err_lines), if err_lines.is_some() => {
                    if let Some(line) = &line {
                        if recent.len() == OUTPUT_TAIL_LINES {
                            recent.pop_front();
                        }
                        recent.push_back(line.clone());
                    }
                    line
                }
            };

            if let Some(line) = line {
                if cancel.is_cancelled() {
                    kill(&mut child).await;
                    return Err(CommandFailure::Cancelled);
                }
                trace!("{}: {}", self.description, line);
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                kill(&mut child).await;
                return Err(CommandFailure::Cancelled);
            }
            status = child.wait() => status.map_err(CommandFailure::Spawn)?,
        };

        if !status.success() {
            return Err(CommandFailure::Exited {
                code: status.code(),
                output: recent.into_iter().collect::<Vec<_>>().join("\n"),
            });
        }

        Ok(())
    }
}

type LineReader<R> = tokio::io::Lines<BufReader<R>>;

/// Next line from an optional reader; a closed or failing stream is set to
/// `None` so the select loop stops polling it.
async fn next_line<R>(reader: &mut Option<LineReader<R>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let lines = reader.as_mut()?;
    match lines.next_line().await {
        Ok(Some(line)) => Some(line),
        Ok(None) | Err(_) => {
            *reader = None;
            None
        }
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill child process: {}", e);
    }
}

fn tail<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let lines: Vec<&str> = lines.collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

/// Escape a path for use inside ffmpeg's `subtitles='...'` filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(':', "\\:")
}

/// Builder for the commands the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build subtitle burning command
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        style: &SubtitleStyle,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut filter = format!("subtitles='{}'", escape_filter_path(subtitle_path.as_ref()));
        if let Some(force_style) = style.force_style() {
            filter.push_str(&format!(":force_style='{}'", force_style));
        }

        MediaCommand::new(&self.binary_path, "Subtitle burning")
            .hide_banner()
            .overwrite()
            .input(&video_path)
            .video_filter(filter)
            .copy_audio()
            .args(additional_options.iter().cloned())
            .line_progress()
            .output(output_path)
    }

    /// Build audio extraction command: first audio stream, 16 kHz mono PCM
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .hide_banner()
            .input(video_path)
            .map("0:a:0")
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\videos\\clip.srt")),
            "C\\:/videos/clip.srt"
        );
        assert_eq!(escape_filter_path(Path::new("/tmp/a.srt")), "/tmp/a.srt");
    }

    #[test]
    fn test_burn_command_without_style() {
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles(
            Path::new("in.mp4"),
            Path::new("in.srt"),
            Path::new("out.mp4"),
            &SubtitleStyle::default(),
            &[],
        );

        assert_eq!(cmd.binary_path, "ffmpeg");
        let vf = cmd.args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(cmd.args[vf + 1], "subtitles='in.srt'");
        assert_eq!(cmd.args.last().unwrap(), "out.mp4");
        assert!(cmd.args.windows(2).any(|w| w == ["-c:a", "copy"]));
    }

    #[test]
    fn test_burn_command_with_style_and_options() {
        let style = SubtitleStyle {
            font_name: Some("Arial".to_string()),
            primary_color: None,
            background_box: true,
        };
        let options = vec!["-crf".to_string(), "23".to_string()];
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles(
            Path::new("in.mkv"),
            Path::new("in.srt"),
            Path::new("out.mkv"),
            &style,
            &options,
        );

        let vf = cmd.args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(
            cmd.args[vf + 1],
            "subtitles='in.srt':force_style='FontName=Arial,BorderStyle=3,BackColour=&H80000000'"
        );
        assert!(cmd.args.windows(2).any(|w| w == ["-crf", "23"]));
    }

    #[test]
    fn test_extract_command_requires_audio_stream() {
        let cmd = MediaCommandBuilder::new("ffmpeg").extract_audio(Path::new("in.mp4"), Path::new("a.wav"));
        assert!(cmd.args.windows(2).any(|w| w == ["-map", "0:a:0"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-ar", "16000"]));
        assert!(cmd.args.windows(2).any(|w| w == ["-ac", "1"]));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let cmd = MediaCommand::new("subgen-definitely-missing-binary", "version check").arg("-version");
        assert!(matches!(cmd.execute().await, Err(CommandFailure::NotFound(_))));
        assert!(matches!(
            cmd.execute_streaming(&CancellationToken::new()).await,
            Err(CommandFailure::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_reports_exit_code() {
        let cmd = MediaCommand::new("sh", "failing script")
            .arg("-c")
            .arg("echo progress; echo boom >&2; exit 3");
        match cmd.execute_streaming(&CancellationToken::new()).await {
            Err(CommandFailure::Exited { code, output }) => {
                assert_eq!(code, Some(3));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streaming_cancel_kills_child() {
        let cancel = CancellationToken::new();
        let cmd = MediaCommand::new("sh", "endless").arg("-c").arg("while true; do echo tick; sleep 0.05; done");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), cmd.execute_streaming(&cancel))
            .await
            .expect("cancellation should stop the command");
        assert!(matches!(result, Err(CommandFailure::Cancelled)));
    }
}
