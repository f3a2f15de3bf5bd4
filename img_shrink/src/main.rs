use clap::{Parser, ValueEnum};
use img_shrink::{run_image_batch, ImageRunConfig};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{report_error, ErrorCategory, ImagePolicy, Interrupt};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// 1200 px wide, JPEG quality 82
    Standard,
    /// 900 px wide, JPEG quality 60
    Ultra,
}

impl Preset {
    fn policy(self) -> ImagePolicy {
        match self {
            Preset::Standard => ImagePolicy::standard(),
            Preset::Ultra => ImagePolicy::ultra(),
        }
    }
}

#[derive(Parser)]
#[command(name = "img-shrink")]
#[command(version, about = "Downsize and recompress the JPEG/PNG files of a directory in place", long_about = None)]
struct Cli {
    /// Directory whose images are rewritten (not recursive)
    #[arg(short, long, default_value = "photography")]
    dir: PathBuf,

    #[arg(short, long, value_enum, default_value = "standard")]
    preset: Preset,

    /// Override the preset's maximum width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Override the preset's JPEG quality (1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Use default PNG compression instead of best + adaptive filtering
    #[arg(long)]
    no_png_optimize: bool,

    /// Process images on all cores
    #[arg(long)]
    parallel: bool,

    /// Where log files go (default: the system temp directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn policy(&self) -> ImagePolicy {
        let mut policy = self.preset.policy();
        if let Some(width) = self.max_width {
            policy.max_width = width;
        }
        if let Some(quality) = self.jpeg_quality {
            policy.jpeg_quality = quality;
        }
        if self.no_png_optimize {
            policy.png_optimize = false;
        }
        policy
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

    let _ = init_logging("img_shrink", cli.log_config());

    let interrupt = Interrupt::install()?;
    let mut config = ImageRunConfig::new(&cli.dir, cli.policy());
    config.parallel = cli.parallel;

    if cli.verbose {
        eprintln!("📷 Policy: {}", config.policy);
    }

    match run_image_batch(&config, &interrupt) {
        Ok(_) => Ok(()),
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
    fn test_overrides_apply_on_top_of_preset() {
        let cli = Cli::parse_from([
            "img-shrink",
            "--preset",
            "ultra",
            "--jpeg-quality",
            "70",
            "--no-png-optimize",
        ]);
        let policy = cli.policy();
        assert_eq!(policy.max_width, 900);
        assert_eq!(policy.jpeg_quality, 70);
        assert!(!policy.png_optimize);
        assert_eq!(cli.dir, PathBuf::from("photography"));
    }

    #[test]
    fn test_defaults_are_standard_preset() {
        let cli = Cli::parse_from(["img-shrink"]);
        assert_eq!(cli.policy(), ImagePolicy::standard());
        assert!(!cli.parallel);
        assert_eq!(cli.log_config().log_dir, std::env::temp_dir());
    }

    #[test]
    fn test_log_dir_flag() {
        let cli = Cli::parse_from(["img-shrink", "--log-dir", "/var/tmp/shrink-logs", "-v"]);
        let config = cli.log_config();
        assert_eq!(config.log_dir, PathBuf::from("/var/tmp/shrink-logs"));
        assert_eq!(config.level, tracing::Level::DEBUG);
    }
}
