use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::media::SubtitleStyle;
use crate::request::{PipelineRequest, TargetLanguage};
use crate::transcribe::ModelSize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (defaults to ./subgen.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate subtitles for a single video file
    Generate {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Generate subtitles for every video file in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List whisper models and their download status
    Models {
        /// Download the given model, or every missing model with --all
        #[arg(long)]
        download: Option<ModelSize>,

        /// Download all missing models
        #[arg(long, conflicts_with = "download")]
        all: bool,
    },

    /// Extract audio from video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Burn an existing SRT file into a video
    Burn {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a configuration file with every default filled in
    Init {
        #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `generate` and `batch`
#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Whisper model size
    #[arg(short, long, default_value = "base")]
    pub model: ModelSize,

    /// Subtitle language: "source", "en", or a language code such as "fr"
    #[arg(short, long, default_value = "en")]
    pub target: TargetLanguage,

    /// Output directory for generated files (defaults to the video's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Do not keep the .srt file
    #[arg(long)]
    pub no_srt: bool,

    /// Burn the subtitles into a copy of the video
    #[arg(long)]
    pub burn: bool,

    #[command(flatten)]
    pub style: StyleArgs,
}

/// Burn-in look; unset values come from the `[style]` config section
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Subtitle font name
    #[arg(long)]
    pub font: Option<String>,

    /// Subtitle colour as #RRGGBB
    #[arg(long)]
    pub color: Option<String>,

    /// Draw an opaque box behind the subtitles
    #[arg(long)]
    pub background_box: bool,
}

impl StyleArgs {
    pub fn resolve(&self, config: &Config) -> Result<SubtitleStyle> {
        let font = self.font.as_deref().or(config.style.font_name.as_deref());
        let color = self.color.as_deref().or(config.style.primary_color.as_deref());
        SubtitleStyle::from_user(font, color, self.background_box || config.style.background_box)
    }
}

impl RunArgs {
    pub fn to_request(&self, source: &Path, config: &Config) -> Result<PipelineRequest> {
        PipelineRequest::builder(source)
            .model(self.model)
            .target(self.target.clone())
            .subtitle_file(!self.no_srt)
            .burned_video(self.burn)
            .output_dir(self.output_dir.clone())
            .output_suffix(config.media.output_suffix.as_str())
            .style(self.style.resolve(config)?)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubgenError;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("subgen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_generate_defaults() {
        let args = parse(&["generate", "-i", "talk.mp4"]);
        let Commands::Generate { input, run } = args.command else {
            panic!("expected generate");
        };
        assert_eq!(input, PathBuf::from("talk.mp4"));

        let request = run.to_request(&input, &Config::default()).unwrap();
        assert_eq!(request.model(), ModelSize::Base);
        assert_eq!(request.target(), &TargetLanguage::English);
        assert!(request.emit_subtitle_file());
        assert!(!request.emit_burned_video());
        assert_eq!(request.style().font_name.as_deref(), Some("Arial"));
        assert_eq!(request.style().primary_color.as_deref(), Some("&H00FFFFFF"));
    }

    #[test]
    fn test_burn_only_with_style_overrides() {
        let args = parse(&[
            "generate", "-i", "talk.mkv", "--no-srt", "--burn", "-t", "fr", "-m", "small",
            "--color", "#FF8000", "--background-box",
        ]);
        let Commands::Generate { input, run } = args.command else {
            panic!("expected generate");
        };

        let request = run.to_request(&input, &Config::default()).unwrap();
        assert!(!request.emit_subtitle_file());
        assert!(request.emit_burned_video());
        assert_eq!(request.model(), ModelSize::Small);
        assert_eq!(request.target(), &TargetLanguage::Other("fr".to_string()));
        assert_eq!(request.style().primary_color.as_deref(), Some("&H000080FF"));
        assert!(request.style().background_box);
        assert_eq!(request.video_path(), Path::new("talk_subtitled.mkv"));
    }

    #[test]
    fn test_blank_style_in_config_falls_back_to_tool_default() {
        let mut config = Config::default();
        config.style.font_name = Some(String::new());
        config.style.primary_color = Some(String::new());

        let args = parse(&["generate", "-i", "talk.mp4", "--burn"]);
        let Commands::Generate { input, run } = args.command else {
            panic!("expected generate");
        };
        let request = run.to_request(&input, &config).unwrap();
        assert_eq!(request.style().font_name, None);
        assert_eq!(request.style().primary_color, None);
        assert_eq!(request.style().force_style(), None);
    }

    #[test]
    fn test_no_outputs_is_rejected() {
        let args = parse(&["generate", "-i", "talk.mp4", "--no-srt"]);
        let Commands::Generate { input, run } = args.command else {
            panic!("expected generate");
        };
        assert!(matches!(run.to_request(&input, &Config::default()), Err(SubgenError::Config(_))));
    }

    #[test]
    fn test_invalid_values_fail_parsing() {
        let cli = |a: &[&str]| Args::try_parse_from(std::iter::once("subgen").chain(a.iter().copied()));
        assert!(cli(&["generate", "-i", "a.mp4", "-m", "huge"]).is_err());
        assert!(cli(&["generate", "-i", "a.mp4", "-t", "not a code"]).is_err());
        assert!(cli(&["models", "--download", "base", "--all"]).is_err());
    }
}
