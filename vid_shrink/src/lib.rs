pub mod backup;
pub mod encoder;
pub mod pipeline;

pub use backup::{backup_dir_name, BackupDir, BACKUP_DIR_PREFIX};
pub use encoder::{install_guidance, EncodeStatus, FfmpegEncoder, VideoEncoder, DEFAULT_TIMEOUT};
pub use pipeline::{
    is_video_candidate, original_for_temp, process_video, run_video_batch, temp_output_path,
    VideoRunConfig, VideoRunReport,
};

pub use shared_utils::errors::{Result, VidShrinkError};
