pub mod compressor;
pub mod pipeline;

pub use compressor::{compress_image, normalize_color, target_dimensions, OutputFormat};
pub use pipeline::{run_image_batch, ImageRunConfig};

pub use shared_utils::img_errors::{ImgShrinkError, Result};
