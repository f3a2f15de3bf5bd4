use clap::Parser;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::policy::{AUDIO_BITRATE_KBPS_DEFAULT, X264_CRF_COMPRESS};
use shared_utils::{report_error, EncoderPreset, ErrorCategory, Interrupt, VideoPolicy};
use std::path::PathBuf;
use std::time::Duration;
use vid_shrink::{
    install_guidance, run_video_batch, FfmpegEncoder, VidShrinkError, VideoRunConfig,
    DEFAULT_TIMEOUT,
};

#[derive(Parser)]
#[command(name = "vid-shrink")]
#[command(version, about = "Re-encode MP4/MOV files with H.264/AAC, keeping timestamped backups", long_about = None)]
struct Cli {
    /// Directory searched recursively for videos
    #[arg(short, long, default_value = "videos")]
    dir: PathBuf,

    /// Where the videos_backup_<timestamp> directory is created
    #[arg(long, default_value = ".")]
    backup_root: PathBuf,

    /// x264 constant rate factor (0-51, higher = smaller)
    #[arg(long, default_value_t = X264_CRF_COMPRESS)]
    crf: u8,

    /// x264 preset (ultrafast ... veryslow)
    #[arg(long, default_value_t = EncoderPreset::Medium)]
    preset: EncoderPreset,

    /// AAC bitrate in kbit/s
    #[arg(long, default_value_t = AUDIO_BITRATE_KBPS_DEFAULT)]
    audio_bitrate: u32,

    /// Kill an encode that runs longer than this; 0 disables the limit
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// ffmpeg binary to use
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Where log files go (default: the system temp directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn policy(&self) -> VideoPolicy {
        VideoPolicy {
            crf: self.crf,
            preset: self.preset,
            audio_bitrate_kbps: self.audio_bitrate,
            ..VideoPolicy::default()
        }
    }

    fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    fn log_config(&self) -> LogConfig {
        let config = LogConfig::default().verbose(self.verbose);
        match &self.log_dir {
            Some(dir) => config.with_log_dir(dir),
            None => config,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _ = init_logging("vid_shrink", cli.log_config());

    let interrupt = Interrupt::install()?;
    let encoder = FfmpegEncoder::new(&cli.ffmpeg).with_timeout(cli.timeout());

    let config = VideoRunConfig {
        dir: cli.dir.clone(),
        backup_root: cli.backup_root.clone(),
        policy: cli.policy(),
    };

    match run_video_batch(&config, &encoder, &interrupt) {
        Ok(_) => Ok(()),
        Err(err @ VidShrinkError::ToolNotFound { .. }) => {
            report_error(&err);
            if let VidShrinkError::ToolNotFound { detail, .. } = &err {
                eprintln!("   {}", detail);
            }
            eprintln!();
            eprintln!("{}", install_guidance());
            std::process::exit(1);
        }
        Err(err) if err.category() == ErrorCategory::Fatal => {
            report_error(&err);
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_profile() {
        let cli = Cli::parse_from(["vid-shrink"]);
        assert_eq!(cli.policy(), VideoPolicy::default());
        assert_eq!(cli.dir, PathBuf::from("videos"));
        assert_eq!(cli.backup_root, PathBuf::from("."));
        assert_eq!(cli.timeout(), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "vid-shrink",
            "--crf",
            "23",
            "--preset",
            "SLOW",
            "--audio-bitrate",
            "96",
            "--timeout-secs",
            "0",
        ]);
        let policy = cli.policy();
        assert_eq!(policy.crf, 23);
        assert_eq!(policy.preset, EncoderPreset::Slow);
        assert_eq!(policy.audio_bitrate_kbps, 96);
        assert!(policy.faststart);
        assert_eq!(cli.timeout(), None);
    }

    #[test]
    fn test_log_dir_flag() {
        let cli = Cli::parse_from(["vid-shrink", "--log-dir", "logs"]);
        assert_eq!(cli.log_config().log_dir, PathBuf::from("logs"));
        assert_eq!(
            Cli::parse_from(["vid-shrink"]).log_config().log_dir,
            std::env::temp_dir()
        );
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        assert!(Cli::try_parse_from(["vid-shrink", "--preset", "warp"]).is_err());
    }
}
